//! Light/dark theme state.
//!
//! There is no global instance: create a [`ThemeSwitcher`], hand it to
//! whoever toggles it and let chart or style hooks subscribe.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::observer::{Subscribers, SubscriptionId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Value for a `data-theme` style attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

type Callback = Box<dyn FnMut(Theme)>;

/// Holds the active theme and notifies subscribers when it changes.
pub struct ThemeSwitcher {
    current: Theme,
    subscribers: Subscribers<Callback>,
}

impl fmt::Debug for ThemeSwitcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeSwitcher")
            .field("current", &self.current)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for ThemeSwitcher {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl ThemeSwitcher {
    pub fn new(initial: Theme) -> Self {
        Self {
            current: initial,
            subscribers: Subscribers::default(),
        }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Sets the theme; subscribers run only if it actually changed.
    pub fn set(&mut self, theme: Theme) {
        if self.current == theme {
            return;
        }
        self.current = theme;

        #[cfg(feature = "tracing")]
        tracing::debug!("theme switched to {}", theme);

        for callback in self.subscribers.iter_mut() {
            callback(theme);
        }
    }

    pub fn toggle(&mut self) -> Theme {
        self.set(self.current.toggled());
        self.current
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(Theme) + 'static,
    {
        self.subscribers.insert(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}
