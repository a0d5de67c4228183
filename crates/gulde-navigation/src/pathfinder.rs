//! Waypoint-following movement for a single entity.
//!
//! A [`Pathfinder`] owns the waypoint queue of one mobile entity. Setting a
//! destination runs the path search on the entity's grid and installs the
//! result; every simulation tick then moves the entity's shared position
//! along the queue by `speed * time_scale * dt`.
//!
//! ```text
//!            set_destination (path found)
//!   Idle ───────────────────────────────────▶ Moving
//!    ▲                                          │
//!    └──────────── last waypoint dequeued ──────┘
//! ```
//!
//! Reaching the destination, already standing on it, and failing to find a
//! path all end in a `DestinationReached` event.

use std::collections::VecDeque;
use std::sync::Arc;

use gulde_common::{Cell, CellExt, Position, PositionExt};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::events::{Observers, PathEvent, SubscriptionId};
use crate::map::{Grid, GridMap};
use crate::path::find_path_detailed;
use crate::wait::{DestinationReachedPartlyWait, DestinationReachedWait, TravelProgress};

/// A grid shared between its owner and the pathfinders planning on it.
pub type SharedGrid<G = GridMap> = Arc<RwLock<G>>;

/// The continuous position of an entity. The entity owns it; the pathfinder moves it.
pub type SharedPosition = Arc<RwLock<Position>>;

/// Whether the pathfinder has waypoints left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    /// Empty waypoint queue.
    Idle,
    /// Travelling along the waypoint queue.
    Moving,
}

/// What [`Pathfinder::set_destination`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationOutcome {
    /// No grid is attached; nothing changed.
    NoGrid,
    /// The entity already stands on the destination; arrival was signaled.
    AlreadyThere,
    /// No path exists; arrival was signaled anyway.
    NoPath,
    /// A path was installed.
    Moving {
        /// Number of waypoints on the path.
        waypoints: usize,
    },
}

/// Moves one entity along grid paths.
pub struct Pathfinder<G: ?Sized = GridMap> {
    speed: f32,
    waypoints: VecDeque<Cell>,
    total_waypoints: usize,
    position: SharedPosition,
    grid: Option<SharedGrid<G>>,
    observers: Observers,
    progress: Arc<TravelProgress>,
}

impl<G: Grid + ?Sized> Pathfinder<G> {
    /// Creates an idle pathfinder.
    ///
    /// # Arguments
    /// * `position` - The entity's position, moved by [`Pathfinder::advance`]
    /// * `grid` - The map the entity is registered in, if any
    /// * `speed` - Travel speed in cells per second
    pub fn new(position: SharedPosition, grid: Option<SharedGrid<G>>, speed: f32) -> Self {
        debug!(position = %*position.read(), speed, has_grid = grid.is_some(), "Pathfinding initializing");
        Self {
            speed,
            waypoints: VecDeque::new(),
            total_waypoints: 0,
            position,
            grid,
            observers: Observers::new(),
            progress: Arc::new(TravelProgress::default()),
        }
    }

    /// Registers the entity in a map.
    pub fn attach_grid(&mut self, grid: SharedGrid<G>) {
        self.grid = Some(grid);
    }

    /// Unregisters the entity from its map. Queued waypoints are kept.
    pub fn detach_grid(&mut self) -> Option<SharedGrid<G>> {
        self.grid.take()
    }

    /// Whether a grid is attached.
    pub fn has_grid(&self) -> bool {
        self.grid.is_some()
    }

    /// Travel speed in cells per second.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Changes the travel speed. Takes effect on the next tick.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Adds an event callback.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&PathEvent) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Removes an event callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Sends the entity to `destination`.
    ///
    /// Without a grid this only logs a warning. Otherwise the queue is
    /// cleared, `DestinationChanged` fires, and either a new path is
    /// installed or `DestinationReached` fires right away (already there, or
    /// no path).
    pub fn set_destination(&mut self, destination: Cell) -> DestinationOutcome {
        let Some(grid) = self.grid.clone() else {
            warn!(%destination, "Pathfinding can not find path without being registered in a map");
            return DestinationOutcome::NoGrid;
        };

        // Progress keeps describing the old route until the outcome is known
        self.waypoints.clear();
        self.emit(PathEvent::DestinationChanged(destination));

        debug!(%destination, "Pathfinding sending entity");

        let current = self.cell_position();
        if current == destination {
            debug!(%destination, "Pathfinding entity was already at destination");
            self.progress.set_remaining(0);
            self.arrive(destination);
            return DestinationOutcome::AlreadyThere;
        }

        let result = find_path_detailed(&*grid.read(), current, destination);
        debug!(%current, %destination, %result, "Pathfinding search finished");

        match result.into_path() {
            Some(path) if !path.is_empty() => {
                let waypoints = path.len();
                self.waypoints = path.into();
                self.total_waypoints = waypoints;
                self.progress.start_route(waypoints);
                DestinationOutcome::Moving { waypoints }
            }
            _ => {
                warn!(%current, %destination, "Pathfinding couldn't find a path!");
                self.progress.set_remaining(0);
                self.arrive(destination);
                DestinationOutcome::NoPath
            }
        }
    }

    /// Advances by one fixed timestep: `speed * time_scale * dt` cells of travel.
    pub fn fixed_update(&mut self, time_scale: f32, dt: f32) {
        if !self.is_moving() {
            return;
        }
        let distance = self.speed * time_scale * dt;
        trace!(
            distance,
            speed = self.speed,
            time_scale,
            dt,
            "Pathfinding will travel"
        );
        self.advance(distance);
    }

    /// Moves the entity up to `distance` cells along the queue.
    ///
    /// Reached waypoints are snapped to exactly and dequeued; leftover
    /// distance carries over to the next waypoint. The entity never moves past
    /// the last waypoint.
    pub fn advance(&mut self, mut distance: f32) {
        while distance > 0.0 {
            let Some(&waypoint) = self.waypoints.front() else {
                return;
            };
            let target = waypoint.to_position();

            let mut position = self.position.write();
            let distance_to_waypoint = position.distance_to(&target);

            if distance_to_waypoint > distance {
                let direction = position.direction_to(&target);
                *position += direction * distance;
                return;
            }

            *position = target;
            drop(position);

            trace!(%waypoint, "Pathfinding reached waypoint");
            self.waypoints.pop_front();
            self.progress.set_remaining(self.waypoints.len());

            if self.waypoints.is_empty() {
                debug!(destination = %waypoint, "Pathfinding reached destination");
                self.arrive(waypoint);
                return;
            }

            distance -= distance_to_waypoint;
        }
    }

    /// Idle or moving.
    pub fn state(&self) -> MovementState {
        if self.waypoints.is_empty() {
            MovementState::Idle
        } else {
            MovementState::Moving
        }
    }

    /// Whether waypoints are left.
    pub fn is_moving(&self) -> bool {
        !self.waypoints.is_empty()
    }

    /// Remaining waypoints, next one first.
    pub fn waypoints(&self) -> &VecDeque<Cell> {
        &self.waypoints
    }

    /// Number of remaining waypoints.
    pub fn remaining_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    /// Number of waypoints of the last installed path.
    pub fn total_waypoints(&self) -> usize {
        self.total_waypoints
    }

    /// `remaining / total`: 1 when a path was just installed, 0 when done.
    pub fn travel_percentage(&self) -> f32 {
        self.progress.travel_percentage()
    }

    /// The final waypoint, while moving.
    pub fn destination(&self) -> Option<Cell> {
        self.waypoints.back().copied()
    }

    /// The entity's current position.
    pub fn position(&self) -> Position {
        *self.position.read()
    }

    /// The cell the entity stands on.
    pub fn cell_position(&self) -> Cell {
        self.position.read().to_cell()
    }

    /// Progress record observed by waiters.
    pub fn progress(&self) -> Arc<TravelProgress> {
        Arc::clone(&self.progress)
    }

    /// A waiter satisfied once the current (or next) destination is reached.
    pub fn wait_for_destination_reached(&self) -> DestinationReachedWait {
        DestinationReachedWait::new(self.progress())
    }

    /// A waiter satisfied once `threshold` of the route has been travelled.
    pub fn wait_for_destination_reached_partly(
        &self,
        threshold: f32,
    ) -> DestinationReachedPartlyWait {
        DestinationReachedPartlyWait::new(self.progress(), threshold)
    }

    fn arrive(&mut self, cell: Cell) {
        self.progress.record_arrival();
        self.emit(PathEvent::DestinationReached(cell));
    }

    fn emit(&mut self, event: PathEvent) {
        self.observers.notify(&event);
    }
}

impl<G: ?Sized> std::fmt::Debug for Pathfinder<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pathfinder")
            .field("speed", &self.speed)
            .field("waypoints", &self.waypoints)
            .field("total_waypoints", &self.total_waypoints)
            .field("has_grid", &self.grid.is_some())
            .field("observers", &self.observers)
            .finish()
    }
}
