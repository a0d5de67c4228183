//! Map-related functionality for navigation.
//!
//! This module provides the grid abstraction consumed by the path search and
//! a concrete open/blocked grid implementation.

pub mod grid;

pub use grid::{Bounds, CellKind, Connectivity, Grid, GridMap};
