//! Core geometric types shared by the navigation crate and the simulation host.
//!
//! Two frames are used throughout:
//!
//! - **Cell frame**: discrete integer grid coordinates. Cells may be negative;
//!   maps are usually centred on the origin.
//! - **Continuous frame**: the entity position, in cell units. The integer point
//!   `(x, y)` is the anchor of cell `(x, y)`, so a cell maps to its lower-left
//!   corner and a position maps back to a cell by flooring each axis.
//!
//! The types are thin aliases over nalgebra points so that arithmetic between
//! positions and directions stays in nalgebra.

#![warn(missing_docs)]

use nalgebra::{Point2, Vector2};

/// An integer grid coordinate `(x, y)`.
pub type Cell = Point2<i32>;

/// A continuous 2D position measured in cell units.
pub type Position = Point2<f32>;

/// A 2D displacement. Returned normalised by [`PositionExt::direction_to`].
pub type Direction = Vector2<f32>;

/// Extension trait for continuous positions.
pub trait PositionExt {
    /// Returns the cell containing this position (floor of each axis).
    ///
    /// # Examples
    ///
    /// ```
    /// use gulde_common::{Cell, Position, PositionExt};
    ///
    /// assert_eq!(Position::new(1.9, 0.2).to_cell(), Cell::new(1, 0));
    /// assert_eq!(Position::new(-0.5, 2.0).to_cell(), Cell::new(-1, 2));
    /// ```
    fn to_cell(&self) -> Cell;

    /// Straight-line distance to `other`.
    fn distance_to(&self, other: &Position) -> f32;

    /// Unit vector pointing at `other`, or the zero vector when both positions coincide.
    fn direction_to(&self, other: &Position) -> Direction;
}

impl PositionExt for Position {
    fn to_cell(&self) -> Cell {
        Cell::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    fn distance_to(&self, other: &Position) -> f32 {
        (*other - *self).norm()
    }

    fn direction_to(&self, other: &Position) -> Direction {
        (*other - *self)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Direction::zeros)
    }
}

/// Extension trait for grid cells.
pub trait CellExt {
    /// The continuous position anchoring this cell.
    fn to_position(&self) -> Position;

    /// The cell displaced by `(dx, dy)`.
    fn offset(&self, dx: i32, dy: i32) -> Cell;

    /// The cell displaced by `(dx, dy)`, or `None` if a coordinate leaves the `i32` range.
    fn checked_offset(&self, dx: i32, dy: i32) -> Option<Cell>;

    /// Sum of absolute axis differences.
    fn manhattan_distance(&self, other: &Cell) -> u32;

    /// Largest absolute axis difference.
    fn chebyshev_distance(&self, other: &Cell) -> u32;

    /// Whether `other` is one step away. Diagonal steps count only when `diagonal` is set.
    fn is_adjacent(&self, other: &Cell, diagonal: bool) -> bool;
}

impl CellExt for Cell {
    fn to_position(&self) -> Position {
        Position::new(self.x as f32, self.y as f32)
    }

    fn offset(&self, dx: i32, dy: i32) -> Cell {
        Cell::new(self.x + dx, self.y + dy)
    }

    fn checked_offset(&self, dx: i32, dy: i32) -> Option<Cell> {
        Some(Cell::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    fn manhattan_distance(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    fn chebyshev_distance(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    fn is_adjacent(&self, other: &Cell, diagonal: bool) -> bool {
        if diagonal {
            self.chebyshev_distance(other) == 1
        } else {
            self.manhattan_distance(other) == 1
        }
    }
}

/// Conversions between cell lists and plain coordinate pairs, as used by
/// configuration files and log output.
pub mod convert {
    use super::Cell;

    /// Builds a cell from an `[x, y]` pair.
    pub fn cell_from_pair(pair: [i32; 2]) -> Cell {
        Cell::new(pair[0], pair[1])
    }

    /// Converts a list of `[x, y]` pairs into cells, preserving order.
    pub fn cells_from_pairs(pairs: &[[i32; 2]]) -> Vec<Cell> {
        pairs.iter().copied().map(cell_from_pair).collect()
    }

    /// Converts cells back into `(x, y)` tuples.
    pub fn cells_to_tuples(cells: &[Cell]) -> Vec<(i32, i32)> {
        cells.iter().map(|cell| (cell.x, cell.y)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell_floors_each_axis() {
        assert_eq!(Position::new(0.0, 0.0).to_cell(), Cell::new(0, 0));
        assert_eq!(Position::new(2.999, 3.0).to_cell(), Cell::new(2, 3));
        assert_eq!(Position::new(-0.01, -1.0).to_cell(), Cell::new(-1, -1));
    }

    #[test]
    fn test_cell_position_round_trip() {
        let cell = Cell::new(-4, 7);
        assert_eq!(cell.to_position(), Position::new(-4.0, 7.0));
        assert_eq!(cell.to_position().to_cell(), cell);
    }

    #[test]
    fn test_distance_and_direction() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);

        let dir = a.direction_to(&b);
        assert!((dir.x - 0.6).abs() < 1e-6);
        assert!((dir.y - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_direction_to_self_is_zero() {
        let p = Position::new(1.5, -2.5);
        assert_eq!(p.direction_to(&p), Direction::zeros());
        assert_eq!(p.distance_to(&p), 0.0);
    }

    #[test]
    fn test_cell_metrics() {
        let a = Cell::new(0, 0);
        let b = Cell::new(3, -4);
        assert_eq!(a.manhattan_distance(&b), 7);
        assert_eq!(a.chebyshev_distance(&b), 4);
        assert_eq!(a.offset(3, -4), b);
        assert_eq!(a.checked_offset(3, -4), Some(b));
    }

    #[test]
    fn test_checked_offset_at_range_edges() {
        let max = Cell::new(i32::MAX, 0);
        assert_eq!(max.checked_offset(1, 0), None);
        assert_eq!(max.checked_offset(-1, 1), Some(Cell::new(i32::MAX - 1, 1)));
        assert_eq!(Cell::new(0, i32::MIN).checked_offset(0, -1), None);
    }

    #[test]
    fn test_adjacency() {
        let origin = Cell::new(2, 2);
        assert!(origin.is_adjacent(&Cell::new(2, 3), false));
        assert!(!origin.is_adjacent(&Cell::new(3, 3), false));
        assert!(origin.is_adjacent(&Cell::new(3, 3), true));
        assert!(!origin.is_adjacent(&origin, true));
        assert!(!origin.is_adjacent(&Cell::new(4, 2), true));
    }

    #[test]
    fn test_pair_conversions() {
        let cells = convert::cells_from_pairs(&[[0, 1], [-2, 5]]);
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(-2, 5)]);
        assert_eq!(convert::cells_to_tuples(&cells), vec![(0, 1), (-2, 5)]);
    }
}
