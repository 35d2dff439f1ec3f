//! `pagekit` bundles small front-end helpers that run natively and on WASM.
//!
//! - [`fetch_with_retry`] / [`RetryingFetcher`]: HTTP requests that retry
//!   `401` responses and network failures with linear backoff
//! - [`MultiSelect`]: headless searchable multiselect dropdown state
//! - [`ThemeSwitcher`]: light/dark theme holder with change subscribers

mod error;
mod fetch;
mod multiselect;
mod observer;
mod options;
mod theme;

pub use error::FetchError;
pub use fetch::{fetch_with_retry, FetchEvent, RetryReason, RetryingFetcher};
pub use multiselect::{
    ClickTarget, MultiSelect, MultiSelectEvent, Propagation, SelectOption, Summary,
    DEFAULT_PLACEHOLDER,
};
pub use observer::SubscriptionId;
pub use options::{Body, Credentials, FetchOptions, RetryPolicy};
pub use theme::{Theme, ThemeSwitcher};

pub type Result<T> = std::result::Result<T, FetchError>;
