//! Grid pathfinding and waypoint-following movement for city entities.
//!
//! - [`map`]: the walkability grid and the [`Grid`] trait the search runs on
//! - [`path`]: A* shortest path search
//! - [`pathfinder`]: per-entity waypoint queue advanced once per simulation tick
//! - [`events`]: destination events and their observers
//! - [`wait`]: passive waiters for full or partial arrival
//!
//! ```
//! use std::sync::Arc;
//! use gulde_common::{Cell, CellExt};
//! use gulde_navigation::{GridMap, Pathfinder};
//! use parking_lot::RwLock;
//!
//! let grid = Arc::new(RwLock::new(GridMap::new(5, 5, Cell::new(0, 0)).unwrap()));
//! let position = Arc::new(RwLock::new(Cell::new(0, 0).to_position()));
//! let mut walker = Pathfinder::new(position, Some(grid), 1.0);
//!
//! walker.set_destination(Cell::new(0, 3));
//! assert_eq!(walker.remaining_waypoints(), 3);
//!
//! walker.fixed_update(1.0, 3.0);
//! assert_eq!(walker.cell_position(), Cell::new(0, 3));
//! ```

pub mod error;
pub mod events;
pub mod map;
pub mod path;
pub mod pathfinder;
pub mod wait;

pub use error::NavigationError;
pub use events::{Observers, PathEvent, SubscriptionId};
pub use map::{Bounds, CellKind, Connectivity, Grid, GridMap};
pub use path::{PathResult, find_path, find_path_detailed};
pub use pathfinder::{
    DestinationOutcome, MovementState, Pathfinder, SharedGrid, SharedPosition,
};
pub use wait::{
    CancellationToken, DestinationReachedPartlyWait, DestinationReachedWait, TravelProgress,
    Wait, WaitStatus,
};
