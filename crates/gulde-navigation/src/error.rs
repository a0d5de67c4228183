//! This module defines the error types used by the `gulde-navigation` crate.

#![warn(missing_docs)]

use gulde_common::Cell;
use thiserror::Error;

/// Error type for navigation operations.
///
/// Only construction and editing of maps can fail. Failing to reach a
/// destination is not an error: the pathfinder reports it through
/// [`DestinationOutcome`](crate::pathfinder::DestinationOutcome) and a warning.
#[derive(Debug, Error, PartialEq)]
pub enum NavigationError {
    /// Map width or height is zero, or the cell count overflows.
    #[error("Invalid map dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// A cell outside the map was addressed.
    #[error("Map access out of bounds: {0}")]
    OutOfBounds(Cell),
    /// A text layout could not be parsed into a map.
    #[error("Invalid map layout at row {row}: {reason}")]
    InvalidLayout {
        /// Zero-based row index in the layout, counted from the top.
        row: usize,
        /// What was wrong with the row.
        reason: String,
    },
}
