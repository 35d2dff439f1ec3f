//! Callback registration shared by the fetcher, the widget and the theme switcher.

/// Handle returned by `subscribe`; pass it back to `unsubscribe`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

/// Ordered callback list with stable ids.
pub(crate) struct Subscribers<C> {
    next_id: u64,
    entries: Vec<(SubscriptionId, C)>,
}

impl<C> Default for Subscribers<C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<C> Subscribers<C> {
    pub(crate) fn insert(&mut self, callback: C) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Callbacks in registration order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut C> {
        self.entries.iter_mut().map(|(_, callback)| callback)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &C> {
        self.entries.iter().map(|(_, callback)| callback)
    }
}
