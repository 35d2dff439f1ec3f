//! Headless multiselect dropdown state.
//!
//! The model owns open/closed state, the selection set and the search
//! filter. Rendering is left to the caller; see `demos/gui.rs`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observer::{Subscribers, SubscriptionId};

/// Placeholder shown when nothing is selected.
pub const DEFAULT_PLACEHOLDER: &str = "—";

/// A single selectable entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Form field name the value is submitted under.
    #[serde(default)]
    pub name: String,
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Human-readable rendering of the current selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    Placeholder(String),
    Single(String),
    /// More than one option selected: count plus the first selected label.
    Badge { count: usize, first_label: String },
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder(text) | Self::Single(text) => f.write_str(text),
            Self::Badge { count, first_label } => write!(f, "{count} {first_label}"),
        }
    }
}

/// Where a pointer click landed, as reported by the rendering layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickTarget {
    Trigger,
    SearchInput,
    SelectAll,
    /// The checkbox of the option with this value.
    Option(String),
    /// Any other point inside the widget's bounding element.
    Inside,
    Outside,
}

/// Whether a click continues to the document-level handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Notifications delivered to [`MultiSelect::subscribe`] callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultiSelectEvent {
    Opened,
    Closed,
    /// Selection changed; `values` are in option order.
    Changed { values: Vec<String>, summary: Summary },
}

#[derive(Clone, Debug)]
struct Entry {
    option: SelectOption,
    selected: bool,
    visible: bool,
}

impl Entry {
    fn new(option: SelectOption) -> Self {
        Self {
            option,
            selected: false,
            visible: true,
        }
    }
}

type Callback = Box<dyn FnMut(&MultiSelectEvent)>;

/// Dropdown with a searchable, multi-valued selection.
///
/// Selection is stored on the option entries themselves, so it can never
/// reference a value that is not among the options.
pub struct MultiSelect {
    entries: Vec<Entry>,
    is_open: bool,
    search_term: String,
    placeholder: String,
    summary: Summary,
    /// Selection last reported through [`MultiSelectEvent::Changed`].
    notified_values: Vec<String>,
    focus_requested: bool,
    subscribers: Subscribers<Callback>,
}

impl fmt::Debug for MultiSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiSelect")
            .field("is_open", &self.is_open)
            .field("options", &self.entries.len())
            .field("selected", &self.values())
            .field("search_term", &self.search_term)
            .field("summary", &self.summary)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for MultiSelect {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MultiSelect {
    /// Creates a closed widget with nothing selected.
    pub fn new(options: impl IntoIterator<Item = SelectOption>) -> Self {
        Self {
            entries: options.into_iter().map(Entry::new).collect(),
            is_open: false,
            search_term: String::new(),
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            summary: Summary::Placeholder(DEFAULT_PLACEHOLDER.to_owned()),
            notified_values: Vec::new(),
            focus_requested: false,
            subscribers: Subscribers::default(),
        }
    }

    /// Parses the option list from JSON (`[{"name", "value", "label"}, ...]`).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let options: Vec<SelectOption> = serde_json::from_str(json)?;
        Ok(Self::new(options))
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self.summary = self.compute_summary();
        self
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn options(&self) -> impl Iterator<Item = &SelectOption> {
        self.entries.iter().map(|entry| &entry.option)
    }

    /// Options matching the current filter, with their selection flag.
    pub fn visible_options(&self) -> impl Iterator<Item = (&SelectOption, bool)> {
        self.entries
            .iter()
            .filter(|entry| entry.visible)
            .map(|entry| (&entry.option, entry.selected))
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.selected && entry.option.value == value)
    }

    /// Opens the dropdown, clears the filter and requests search focus.
    pub fn open(&mut self) {
        self.clear_filter();
        self.focus_requested = true;
        if !self.is_open {
            self.is_open = true;
            self.emit(&MultiSelectEvent::Opened);
        }
    }

    pub fn close(&mut self) {
        if self.is_open {
            self.is_open = false;
            self.emit(&MultiSelectEvent::Closed);
        }
    }

    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Returns `true` once after [`MultiSelect::open`], for the renderer to
    /// move keyboard focus into the search input.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    /// Selects every visible option, or deselects them if all already are.
    ///
    /// Filtered-out options keep their state.
    pub fn toggle_select_all(&mut self) {
        let mut visible = self.entries.iter().filter(|entry| entry.visible).peekable();
        if visible.peek().is_none() {
            return;
        }
        let select = !visible.all(|entry| entry.selected);

        for entry in self.entries.iter_mut().filter(|entry| entry.visible) {
            entry.selected = select;
        }
        self.update_value();
    }

    /// Hides options whose label does not contain `term` (case-insensitive).
    pub fn filter_options(&mut self, term: &str) {
        self.search_term = term.to_owned();
        let needle = term.to_lowercase();
        for entry in &mut self.entries {
            entry.visible = entry.option.label.to_lowercase().contains(&needle);
        }
    }

    /// Flips one option. Unknown values are ignored.
    pub fn toggle_option(&mut self, value: &str) {
        let mut changed = false;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.option.value == value)
        {
            entry.selected = !entry.selected;
            changed = true;
        }
        if changed {
            self.update_value();
        }
    }

    /// Recomputes the summary and notifies subscribers if the selection or
    /// summary differs from what they last saw.
    ///
    /// Every mutator calls this.
    pub fn update_value(&mut self) -> &Summary {
        let summary = self.compute_summary();
        let values = self.values();
        if summary == self.summary && values == self.notified_values {
            return &self.summary;
        }
        self.summary = summary;
        self.notified_values = values.clone();
        let event = MultiSelectEvent::Changed {
            values,
            summary: self.summary.clone(),
        };
        self.emit(&event);
        &self.summary
    }

    /// Selects exactly `values`; values with no matching option are ignored.
    pub fn set_values<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: Vec<S> = values.into_iter().collect();
        for entry in &mut self.entries {
            entry.selected = wanted
                .iter()
                .any(|value| value.as_ref() == entry.option.value);
        }
        self.update_value();
    }

    /// Selected values in option declaration order.
    pub fn values(&self) -> Vec<String> {
        self.selected_options()
            .into_iter()
            .map(|option| option.value.clone())
            .collect()
    }

    /// First selected option for each distinct value, in option order.
    fn selected_options(&self) -> Vec<&SelectOption> {
        let mut selected: Vec<&SelectOption> = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.selected) {
            if !selected
                .iter()
                .any(|option| option.value == entry.option.value)
            {
                selected.push(&entry.option);
            }
        }
        selected
    }

    /// Replaces all options; selection and filter are reset.
    pub fn set_options(&mut self, options: impl IntoIterator<Item = SelectOption>) {
        self.entries = options.into_iter().map(Entry::new).collect();
        self.search_term.clear();
        self.update_value();
    }

    /// Deselects every option, visible or not.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
        self.update_value();
    }

    /// Routes a click: element handler first, then the document handler
    /// unless propagation was stopped.
    pub fn click(&mut self, target: ClickTarget) -> Propagation {
        let propagation = match &target {
            ClickTarget::Trigger => {
                self.toggle();
                Propagation::Continue
            }
            ClickTarget::SearchInput => Propagation::Stop,
            ClickTarget::SelectAll => {
                self.toggle_select_all();
                Propagation::Stop
            }
            ClickTarget::Option(value) => {
                self.toggle_option(value);
                Propagation::Continue
            }
            ClickTarget::Inside | ClickTarget::Outside => Propagation::Continue,
        };

        if propagation == Propagation::Continue {
            self.on_document_click(&target);
        }
        propagation
    }

    fn on_document_click(&mut self, target: &ClickTarget) {
        if *target == ClickTarget::Outside {
            self.close();
        }
    }

    /// Registers a callback for [`MultiSelectEvent`]s.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&MultiSelectEvent) + 'static,
    {
        self.subscribers.insert(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    fn clear_filter(&mut self) {
        self.search_term.clear();
        for entry in &mut self.entries {
            entry.visible = true;
        }
    }

    fn compute_summary(&self) -> Summary {
        let selected = self.selected_options();
        match selected.as_slice() {
            [] => Summary::Placeholder(self.placeholder.clone()),
            [only] => Summary::Single(only.label.clone()),
            [first, ..] => Summary::Badge {
                count: selected.len(),
                first_label: first.label.clone(),
            },
        }
    }

    fn emit(&mut self, event: &MultiSelectEvent) {
        for callback in self.subscribers.iter_mut() {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::{
        ClickTarget, MultiSelect, MultiSelectEvent, Propagation, SelectOption, Summary,
        DEFAULT_PLACEHOLDER,
    };

    fn abc() -> MultiSelect {
        MultiSelect::new([
            SelectOption::new("letters", "a", "Alpha"),
            SelectOption::new("letters", "b", "Bravo"),
            SelectOption::new("letters", "c", "Charlie"),
        ])
    }

    fn cities() -> MultiSelect {
        MultiSelect::new([
            SelectOption::new("city", "msk", "Moscow"),
            SelectOption::new("city", "spb", "Saint Petersburg"),
            SelectOption::new("city", "kzn", "Kazan"),
            SelectOption::new("city", "nsk", "Novosibirsk"),
        ])
    }

    #[test]
    fn starts_closed_with_placeholder() {
        let select = abc();
        assert!(!select.is_open());
        assert_eq!(select.summary(), &Summary::Placeholder(DEFAULT_PLACEHOLDER.to_owned()));
        assert!(select.values().is_empty());
    }

    #[test]
    fn set_values_returns_declared_order() {
        let mut select = abc();
        select.set_values(["c", "a"]);
        assert_eq!(select.values(), vec!["a".to_owned(), "c".to_owned()]);
    }

    #[test]
    fn set_values_ignores_unknown_values() {
        let mut select = abc();
        select.set_values(["b", "zzz"]);
        assert_eq!(select.values(), vec!["b".to_owned()]);
        select.set_values(Vec::<String>::new());
        assert!(select.values().is_empty());
    }

    #[test]
    fn summary_formats() {
        let mut select = cities();
        assert_eq!(select.summary().to_string(), DEFAULT_PLACEHOLDER);

        select.set_values(["msk"]);
        assert_eq!(select.summary().to_string(), "Moscow");

        select.set_values(["msk", "kzn", "nsk"]);
        assert_eq!(select.summary().to_string(), "3 Moscow");
        assert_eq!(
            select.summary(),
            &Summary::Badge {
                count: 3,
                first_label: "Moscow".to_owned()
            }
        );
    }

    #[test]
    fn badge_uses_first_selected_in_option_order() {
        let mut select = cities();
        select.set_values(["nsk", "spb"]);
        assert_eq!(select.summary().to_string(), "2 Saint Petersburg");
    }

    #[test]
    fn custom_placeholder() {
        let select = abc().with_placeholder("Any");
        assert_eq!(select.summary().to_string(), "Any");
    }

    #[test]
    fn filter_is_case_insensitive_and_keeps_hidden_selection() {
        let mut select = cities();
        select.set_values(["kzn"]);
        select.filter_options("MOS");

        let visible: Vec<&str> = select
            .visible_options()
            .map(|(option, _)| option.value.as_str())
            .collect();
        assert_eq!(visible, vec!["msk"]);
        assert!(select.is_selected("kzn"));
    }

    #[test]
    fn select_all_only_touches_visible_options() {
        let mut select = MultiSelect::new([
            SelectOption::new("f", "1", "xray"),
            SelectOption::new("f", "2", "yankee"),
            SelectOption::new("f", "3", "box"),
            SelectOption::new("f", "4", "zulu"),
        ]);
        select.set_values(["4"]);
        select.filter_options("x");

        select.toggle_select_all();
        assert_eq!(select.values(), vec!["1", "3", "4"]);
        assert!(!select.is_selected("2"));

        select.toggle_select_all();
        assert_eq!(select.values(), vec!["4"]);
    }

    #[test]
    fn select_all_with_nothing_visible_is_noop() {
        let mut select = abc();
        select.set_values(["a"]);
        select.filter_options("nomatch");
        select.toggle_select_all();
        assert_eq!(select.values(), vec!["a"]);
    }

    #[test]
    fn open_resets_filter_and_requests_focus() {
        let mut select = abc();
        select.filter_options("alp");
        assert_eq!(select.visible_options().count(), 1);

        select.open();
        assert!(select.is_open());
        assert_eq!(select.search_term(), "");
        assert_eq!(select.visible_options().count(), 3);
        assert!(select.take_focus_request());
        assert!(!select.take_focus_request());
    }

    #[test]
    fn toggle_switches_state_without_touching_selection() {
        let mut select = abc();
        select.set_values(["b"]);
        select.toggle();
        assert!(select.is_open());
        select.toggle();
        assert!(!select.is_open());
        assert_eq!(select.values(), vec!["b"]);
    }

    #[test]
    fn set_options_resets_selection() {
        let mut select = abc();
        select.set_values(["a", "b"]);
        select.filter_options("a");
        select.set_options([SelectOption::new("n", "a", "Again")]);
        assert!(select.values().is_empty());
        assert_eq!(select.search_term(), "");
        assert_eq!(select.options().count(), 1);
    }

    #[test]
    fn clear_ignores_visibility() {
        let mut select = abc();
        select.set_values(["a", "b", "c"]);
        select.filter_options("alpha");
        select.clear();
        assert!(select.values().is_empty());
    }

    #[test]
    fn search_input_click_does_not_close() {
        let mut select = abc();
        select.open();
        assert_eq!(select.click(ClickTarget::SearchInput), Propagation::Stop);
        assert!(select.is_open());
    }

    #[test]
    fn select_all_click_stops_propagation() {
        let mut select = abc();
        select.open();
        assert_eq!(select.click(ClickTarget::SelectAll), Propagation::Stop);
        assert!(select.is_open());
        assert_eq!(select.values().len(), 3);
    }

    #[test]
    fn outside_click_closes_open_widget_only() {
        let mut select = abc();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        select.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        select.click(ClickTarget::Outside);
        assert!(events.borrow().is_empty());

        select.click(ClickTarget::Trigger);
        select.click(ClickTarget::Inside);
        assert!(select.is_open());
        select.click(ClickTarget::Outside);
        assert!(!select.is_open());

        assert_eq!(
            *events.borrow(),
            vec![MultiSelectEvent::Opened, MultiSelectEvent::Closed]
        );
    }

    #[test]
    fn option_click_toggles_and_notifies() {
        let mut select = cities();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let id = select.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        select.open();
        select.click(ClickTarget::Option("spb".to_owned()));
        assert!(select.is_open());
        assert_eq!(
            events.borrow().last(),
            Some(&MultiSelectEvent::Changed {
                values: vec!["spb".to_owned()],
                summary: Summary::Single("Saint Petersburg".to_owned()),
            })
        );

        assert!(select.unsubscribe(id));
        select.click(ClickTarget::Option("spb".to_owned()));
        assert!(select.values().is_empty());
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn shared_values_count_once_in_summary() {
        let mut select = MultiSelect::new([
            SelectOption::new("dup", "a", "Alpha"),
            SelectOption::new("dup", "a", "Alpha again"),
            SelectOption::new("dup", "b", "Bravo"),
        ]);
        select.set_values(["a"]);
        assert_eq!(select.values(), vec!["a"]);
        assert_eq!(select.summary(), &Summary::Single("Alpha".to_owned()));

        select.set_values(["a", "b"]);
        assert_eq!(select.summary().to_string(), "2 Alpha");
    }

    #[test]
    fn unchanged_selection_does_not_notify() {
        let mut select = abc();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        select.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        select.clear();
        select.set_values(["zzz"]);
        assert!(events.borrow().is_empty());

        select.set_values(["b"]);
        select.set_values(["b"]);
        select.update_value();
        assert_eq!(events.borrow().len(), 1);

        select.clear();
        select.clear();
        assert_eq!(
            events.borrow().last(),
            Some(&MultiSelectEvent::Changed {
                values: Vec::new(),
                summary: Summary::Placeholder(DEFAULT_PLACEHOLDER.to_owned()),
            })
        );
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn options_parse_from_json() {
        let select = MultiSelect::from_json(
            r#"[{"name":"city","value":"msk","label":"Moscow"},{"value":"kzn","label":"Kazan"}]"#,
        )
        .expect("option json must parse");
        let labels: Vec<&str> = select.options().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Moscow", "Kazan"]);
        assert_eq!(select.options().nth(1).map(|o| o.name.as_str()), Some(""));
    }
}
