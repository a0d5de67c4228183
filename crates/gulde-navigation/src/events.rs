//! Destination events and the observer list that delivers them.

use gulde_common::Cell;

/// Something that happened to a pathfinder's destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathEvent {
    /// A new destination was requested. Fired before any path search.
    DestinationChanged(Cell),
    /// The entity arrived, was already there, or gave up because no path exists.
    DestinationReached(Cell),
}

impl PathEvent {
    /// The cell the event refers to.
    pub fn cell(&self) -> Cell {
        match self {
            PathEvent::DestinationChanged(cell) | PathEvent::DestinationReached(cell) => *cell,
        }
    }
}

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&PathEvent) + Send>;

/// Ordered list of event callbacks.
///
/// Callbacks run synchronously on the notifying thread, in subscription order.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback)>,
}

impl Observers {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback at the end of the delivery order.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&PathEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(subscribed, _)| *subscribed != id);
        self.callbacks.len() != before
    }

    /// Delivers `event` to every callback.
    pub fn notify(&mut self, event: &PathEvent) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// Number of subscribed callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callback is subscribed.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.callbacks.len())
            .finish()
    }
}
