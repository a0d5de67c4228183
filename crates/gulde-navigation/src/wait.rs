//! Passive progress waiters.
//!
//! A waiter is a predicate over a pathfinder's published [`TravelProgress`].
//! Control flow that needs to suspend until an entity has arrived (fully or
//! partly) creates a waiter and polls it once per tick. Waiters never touch
//! the pathfinder itself and can be polled from another task.

#![warn(missing_docs)]

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default)]
struct Route {
    remaining: usize,
    total: usize,
}

impl Route {
    fn travel_percentage(self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.remaining as f32 / self.total as f32
    }
}

/// Progress record a pathfinder publishes for its waiters.
///
/// Remaining and total waypoints are always read and written together, so a
/// waiter on another thread never sees one route's remaining count against
/// another route's total.
#[derive(Debug, Default)]
pub struct TravelProgress {
    route: RwLock<Route>,
    arrivals: AtomicU64,
}

impl TravelProgress {
    /// Waypoints left in the queue.
    pub fn remaining(&self) -> usize {
        self.route.read().remaining
    }

    /// Waypoints of the last computed path.
    pub fn total(&self) -> usize {
        self.route.read().total
    }

    /// How many `DestinationReached` events have fired so far.
    pub fn arrivals(&self) -> u64 {
        self.arrivals.load(Ordering::Acquire)
    }

    /// `remaining / total`: 1 right after a path was installed, 0 when done.
    /// Zero while no path was ever installed.
    pub fn travel_percentage(&self) -> f32 {
        self.route.read().travel_percentage()
    }

    /// Share of the route already covered: 0 right after a path was
    /// installed, 1 once idle.
    pub fn travelled_fraction(&self) -> f32 {
        let route = *self.route.read();
        if route.remaining == 0 {
            return 1.0;
        }
        1.0 - route.travel_percentage()
    }

    pub(crate) fn start_route(&self, total: usize) {
        *self.route.write() = Route {
            remaining: total,
            total,
        };
    }

    pub(crate) fn set_remaining(&self, remaining: usize) {
        self.route.write().remaining = remaining;
    }

    pub(crate) fn record_arrival(&self) {
        self.arrivals.fetch_add(1, Ordering::AcqRel);
    }
}

/// Cooperative cancellation flag shared between a waiter and whoever may
/// abandon the wait.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every waiter holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`CancellationToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Result of polling a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Keep waiting.
    Pending,
    /// The condition holds.
    Ready,
    /// The token was cancelled. Takes precedence over `Ready`.
    Cancelled,
}

/// Common polling interface of the waiters.
pub trait Wait {
    /// Re-evaluates the condition.
    fn poll(&self) -> WaitStatus;

    /// Whether the condition holds and the wait was not cancelled.
    fn is_ready(&self) -> bool {
        self.poll() == WaitStatus::Ready
    }
}

fn cancelled(token: &Option<CancellationToken>) -> bool {
    token.as_ref().is_some_and(CancellationToken::is_cancelled)
}

/// Waits until the destination is reached.
///
/// Satisfied once a `DestinationReached` event fired after the waiter was
/// created, or as soon as the waypoint queue is empty, which covers an
/// arrival that happened before the waiter started observing.
#[derive(Debug, Clone)]
pub struct DestinationReachedWait {
    progress: Arc<TravelProgress>,
    arrivals_at_start: u64,
    token: Option<CancellationToken>,
}

impl DestinationReachedWait {
    /// Starts observing `progress`.
    pub fn new(progress: Arc<TravelProgress>) -> Self {
        let arrivals_at_start = progress.arrivals();
        Self {
            progress,
            arrivals_at_start,
            token: None,
        }
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }
}

impl Wait for DestinationReachedWait {
    fn poll(&self) -> WaitStatus {
        if cancelled(&self.token) {
            return WaitStatus::Cancelled;
        }
        if self.progress.arrivals() != self.arrivals_at_start || self.progress.remaining() == 0 {
            WaitStatus::Ready
        } else {
            WaitStatus::Pending
        }
    }
}

/// Waits until a share of the route has been travelled.
#[derive(Debug, Clone)]
pub struct DestinationReachedPartlyWait {
    progress: Arc<TravelProgress>,
    threshold: f32,
    token: Option<CancellationToken>,
}

impl DestinationReachedPartlyWait {
    /// Starts observing `progress`. `threshold` is clamped to `[0, 1]`; 0 is
    /// satisfied immediately, 1 only once the entity is idle.
    pub fn new(progress: Arc<TravelProgress>, threshold: f32) -> Self {
        let threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self {
            progress,
            threshold,
            token: None,
        }
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// The clamped threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Wait for DestinationReachedPartlyWait {
    fn poll(&self) -> WaitStatus {
        if cancelled(&self.token) {
            return WaitStatus::Cancelled;
        }
        if self.progress.travelled_fraction() >= self.threshold {
            WaitStatus::Ready
        } else {
            WaitStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving(total: usize, remaining: usize) -> Arc<TravelProgress> {
        let progress = Arc::new(TravelProgress::default());
        progress.start_route(total);
        progress.set_remaining(remaining);
        progress
    }

    #[test]
    fn test_percentages() {
        let progress = moving(4, 3);
        assert_eq!(progress.travel_percentage(), 0.75);
        assert_eq!(progress.travelled_fraction(), 0.25);

        progress.set_remaining(0);
        assert_eq!(progress.travel_percentage(), 0.0);
        assert_eq!(progress.travelled_fraction(), 1.0);

        let idle = TravelProgress::default();
        assert_eq!(idle.travel_percentage(), 0.0);
        assert_eq!(idle.travelled_fraction(), 1.0);
    }

    #[test]
    fn test_full_wait_ready_when_already_idle() {
        let progress = Arc::new(TravelProgress::default());
        let wait = DestinationReachedWait::new(progress);
        assert_eq!(wait.poll(), WaitStatus::Ready);
    }

    #[test]
    fn test_full_wait_ready_after_arrival() {
        let progress = moving(3, 3);
        let wait = DestinationReachedWait::new(Arc::clone(&progress));
        assert_eq!(wait.poll(), WaitStatus::Pending);

        progress.set_remaining(1);
        assert_eq!(wait.poll(), WaitStatus::Pending);

        // A new route started right after the arrival still counts as arrived
        progress.set_remaining(0);
        progress.record_arrival();
        progress.start_route(5);
        assert!(wait.is_ready());
    }

    #[test]
    fn test_full_wait_ignores_arrivals_before_creation() {
        let progress = moving(2, 2);
        progress.record_arrival();
        let wait = DestinationReachedWait::new(Arc::clone(&progress));
        assert_eq!(wait.poll(), WaitStatus::Pending);
    }

    #[test]
    fn test_partial_wait_thresholds() {
        let progress = moving(4, 4);
        let none = DestinationReachedPartlyWait::new(Arc::clone(&progress), 0.0);
        let half = DestinationReachedPartlyWait::new(Arc::clone(&progress), 0.5);
        let full = DestinationReachedPartlyWait::new(Arc::clone(&progress), 1.0);

        assert!(none.is_ready());
        assert!(!half.is_ready());
        assert!(!full.is_ready());

        progress.set_remaining(2);
        assert!(half.is_ready());
        assert!(!full.is_ready());

        progress.set_remaining(1);
        assert!(!full.is_ready());

        progress.set_remaining(0);
        assert!(full.is_ready());
    }

    #[test]
    fn test_partial_wait_clamps_threshold() {
        let progress = moving(2, 2);
        assert_eq!(
            DestinationReachedPartlyWait::new(Arc::clone(&progress), 3.0).threshold(),
            1.0
        );
        assert_eq!(
            DestinationReachedPartlyWait::new(Arc::clone(&progress), -1.0).threshold(),
            0.0
        );
        assert_eq!(
            DestinationReachedPartlyWait::new(progress, f32::NAN).threshold(),
            0.0
        );
    }

    #[test]
    fn test_cancellation_wins() {
        let progress = Arc::new(TravelProgress::default());
        let token = CancellationToken::new();
        let full = DestinationReachedWait::new(Arc::clone(&progress)).with_cancellation(token.clone());
        let partial =
            DestinationReachedPartlyWait::new(progress, 0.0).with_cancellation(token.clone());

        assert!(full.is_ready());
        token.cancel();
        assert_eq!(full.poll(), WaitStatus::Cancelled);
        assert_eq!(partial.poll(), WaitStatus::Cancelled);
        assert!(!partial.is_ready());
    }
}
