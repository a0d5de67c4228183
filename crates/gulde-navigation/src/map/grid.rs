//! Walkability grid used for path planning.
//!
//! This module provides the [`Grid`] trait consumed by the path search and the
//! pathfinder, and [`GridMap`], a fixed-size 2D grid of open and blocked cells
//! with an integer origin so that maps can extend into negative coordinates.

#![warn(missing_docs)]

use crate::error::NavigationError;
use gulde_common::{Cell, CellExt};

/// Neighbor relation of a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Connectivity {
    /// Up, left, right, down.
    #[default]
    Four,
    /// The four orthogonal steps plus diagonals. A diagonal step is only
    /// allowed when both orthogonal cells it passes are walkable.
    Eight,
}

impl Connectivity {
    /// Lower bound on the number of steps between two cells under this relation.
    pub fn step_estimate(self, from: &Cell, to: &Cell) -> u32 {
        match self {
            Connectivity::Four => from.manhattan_distance(to),
            Connectivity::Eight => from.chebyshev_distance(to),
        }
    }
}

/// State of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    /// Entities may walk through this cell.
    #[default]
    Open,
    /// Buildings, water or anything else that cannot be crossed.
    Blocked,
}

impl CellKind {
    /// Layout character for this kind (`.` open, `#` blocked).
    pub fn as_char(self) -> char {
        match self {
            CellKind::Open => '.',
            CellKind::Blocked => '#',
        }
    }

    /// Parses a layout character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(CellKind::Open),
            '#' => Some(CellKind::Blocked),
            _ => None,
        }
    }
}

/// Axis-aligned extent of a grid: `width × height` cells starting at `origin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Lowest cell of the grid.
    pub origin: Cell,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Bounds {
    /// Creates bounds of `width × height` cells anchored at `origin`.
    pub const fn new(origin: Cell, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Whether `cell` lies inside the bounds.
    pub fn contains(&self, cell: &Cell) -> bool {
        let dx = i64::from(cell.x) - i64::from(self.origin.x);
        let dy = i64::from(cell.y) - i64::from(self.origin.y);
        dx >= 0 && dy >= 0 && dx < i64::from(self.width) && dy < i64::from(self.height)
    }

    /// Highest cell inside the bounds (inclusive).
    pub fn max(&self) -> Cell {
        self.origin
            .offset(self.width as i32 - 1, self.height as i32 - 1)
    }

    /// Total number of cells.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Iterates every cell, row by row from the lowest `y`.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32).flat_map(move |dy| {
            (0..self.width as i32).map(move |dx| self.origin.offset(dx, dy))
        })
    }
}

/// What the path search and the pathfinder need from a map.
pub trait Grid {
    /// Extent of the grid.
    fn bounds(&self) -> Bounds;

    /// Whether `cell` is inside the grid and can be walked through.
    fn is_walkable(&self, cell: &Cell) -> bool;

    /// Walkable cells one step away from `cell`, in a fixed enumeration order.
    fn neighbors(&self, cell: &Cell) -> Vec<Cell>;

    /// Neighbor relation used by [`Grid::neighbors`]. The path search picks
    /// its distance estimate from this, so it must match `neighbors`.
    fn connectivity(&self) -> Connectivity;
}

// Up, Left, Right, Down
const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// A fixed-size 2D grid of open and blocked cells.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridMap {
    bounds: Bounds,
    connectivity: Connectivity,
    /// Row-major cell storage, lowest `y` first.
    data: Vec<CellKind>,
}

impl GridMap {
    /// Creates a fully open map.
    ///
    /// # Arguments
    /// * `width` - Number of columns
    /// * `height` - Number of rows
    /// * `origin` - The lowest cell of the map
    ///
    /// # Returns
    /// * `Result<Self, NavigationError>` - The map, or an error when a dimension is zero
    pub fn new(width: u32, height: u32, origin: Cell) -> Result<Self, NavigationError> {
        if width == 0 || height == 0 {
            return Err(NavigationError::InvalidDimensions(
                "Width and height must be non-zero",
            ));
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(NavigationError::InvalidDimensions(
                "Map dimensions must fit the cell coordinate range",
            ));
        }
        let fits =
            |start: i32, len: u32| i64::from(start) + i64::from(len) - 1 <= i64::from(i32::MAX);
        if !fits(origin.x, width) || !fits(origin.y, height) {
            return Err(NavigationError::InvalidDimensions(
                "Map extends past the cell coordinate range",
            ));
        }
        let total_cells = (width as usize)
            .checked_mul(height as usize)
            .ok_or(NavigationError::InvalidDimensions(
                "Map dimensions too large, would cause overflow",
            ))?;

        Ok(Self {
            bounds: Bounds::new(origin, width, height),
            connectivity: Connectivity::Four,
            data: vec![CellKind::Open; total_cells],
        })
    }

    /// Builds a map from text rows, `.` for open and `#` for blocked cells.
    ///
    /// The first row is the top of the map (highest `y`), so the layout reads
    /// the way it is drawn. All rows must have the same length.
    pub fn from_layout<S: AsRef<str>>(rows: &[S], origin: Cell) -> Result<Self, NavigationError> {
        let height = u32::try_from(rows.len()).map_err(|_| {
            NavigationError::InvalidDimensions("Layout has too many rows")
        })?;
        let width = rows
            .first()
            .map(|row| row.as_ref().chars().count())
            .unwrap_or(0);
        let width = u32::try_from(width).map_err(|_| {
            NavigationError::InvalidDimensions("Layout rows are too long")
        })?;

        let mut map = Self::new(width, height, origin)?;

        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let row_width = row.chars().count();
            if row_width != width as usize {
                return Err(NavigationError::InvalidLayout {
                    row: row_index,
                    reason: format!("expected {} cells, found {}", width, row_width),
                });
            }

            let dy = height as i32 - 1 - row_index as i32;
            for (dx, c) in row.chars().enumerate() {
                let kind = CellKind::from_char(c).ok_or_else(|| NavigationError::InvalidLayout {
                    row: row_index,
                    reason: format!("unexpected character {:?}", c),
                })?;
                map.set(&origin.offset(dx as i32, dy), kind)?;
            }
        }

        Ok(map)
    }

    /// Returns the map with the given neighbor relation.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Index in the data vector for an in-bounds cell.
    fn index(&self, cell: &Cell) -> Option<usize> {
        if !self.bounds.contains(cell) {
            return None;
        }
        let dx = (cell.x - self.bounds.origin.x) as usize;
        let dy = (cell.y - self.bounds.origin.y) as usize;
        Some(dy * self.bounds.width as usize + dx)
    }

    /// Gets the kind of a cell.
    pub fn get(&self, cell: &Cell) -> Result<CellKind, NavigationError> {
        self.index(cell)
            .map(|index| self.data[index])
            .ok_or(NavigationError::OutOfBounds(*cell))
    }

    /// Sets the kind of a cell.
    pub fn set(&mut self, cell: &Cell, kind: CellKind) -> Result<(), NavigationError> {
        let index = self
            .index(cell)
            .ok_or(NavigationError::OutOfBounds(*cell))?;
        self.data[index] = kind;
        Ok(())
    }

    /// Marks a cell as blocked.
    pub fn block(&mut self, cell: &Cell) -> Result<(), NavigationError> {
        self.set(cell, CellKind::Blocked)
    }

    /// Marks a cell as open.
    pub fn open(&mut self, cell: &Cell) -> Result<(), NavigationError> {
        self.set(cell, CellKind::Open)
    }

    /// Opens every cell.
    pub fn clear(&mut self) {
        self.data.fill(CellKind::Open);
    }

    /// Number of blocked cells.
    pub fn blocked_count(&self) -> usize {
        self.data
            .iter()
            .filter(|kind| **kind == CellKind::Blocked)
            .count()
    }
}

impl Grid for GridMap {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn is_walkable(&self, cell: &Cell) -> bool {
        matches!(self.get(cell), Ok(CellKind::Open))
    }

    fn neighbors(&self, cell: &Cell) -> Vec<Cell> {
        let mut neighbors = Vec::with_capacity(8);
        // Steps leaving the i32 range are outside any map
        let walkable = |dx: i32, dy: i32| {
            cell.checked_offset(dx, dy).filter(|neighbor| self.is_walkable(neighbor))
        };

        for (dx, dy) in ORTHOGONAL {
            if let Some(neighbor) = walkable(dx, dy) {
                neighbors.push(neighbor);
            }
        }

        if self.connectivity == Connectivity::Eight {
            for (dx, dy) in DIAGONAL {
                // No corner cutting
                if walkable(dx, 0).is_none() || walkable(0, dy).is_none() {
                    continue;
                }
                if let Some(neighbor) = walkable(dx, dy) {
                    neighbors.push(neighbor);
                }
            }
        }

        neighbors
    }

    fn connectivity(&self) -> Connectivity {
        self.connectivity
    }
}

impl std::fmt::Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "GridMap ({}x{}, origin: ({}, {}), {:?}-connected)",
            self.bounds.width,
            self.bounds.height,
            self.bounds.origin.x,
            self.bounds.origin.y,
            self.connectivity
        )?;

        // Top row first
        for dy in (0..self.bounds.height as i32).rev() {
            for dx in 0..self.bounds.width as i32 {
                let cell = self.bounds.origin.offset(dx, dy);
                if let Ok(kind) = self.get(&cell) {
                    write!(f, "{}", kind.as_char())?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gridmap_creation() {
        let map = GridMap::new(10, 4, Cell::new(-5, -2)).unwrap();
        let bounds = map.bounds();
        assert_eq!(bounds.width, 10);
        assert_eq!(bounds.height, 4);
        assert_eq!(bounds.origin, Cell::new(-5, -2));
        assert_eq!(bounds.max(), Cell::new(4, 1));
        assert_eq!(bounds.area(), 40);
        assert_eq!(map.blocked_count(), 0);
        assert_eq!(map.connectivity(), Connectivity::Four);
    }

    #[test]
    fn test_invalid_creation() {
        assert!(matches!(
            GridMap::new(0, 10, Cell::new(0, 0)),
            Err(NavigationError::InvalidDimensions(_))
        ));
        assert!(matches!(
            GridMap::new(10, 0, Cell::new(0, 0)),
            Err(NavigationError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_map_must_fit_coordinate_range() {
        assert!(matches!(
            GridMap::new(3, 1, Cell::new(i32::MAX - 1, 0)),
            Err(NavigationError::InvalidDimensions(_))
        ));
        assert!(matches!(
            GridMap::new(1, 2, Cell::new(0, i32::MAX)),
            Err(NavigationError::InvalidDimensions(_))
        ));

        let map = GridMap::new(2, 2, Cell::new(i32::MAX - 1, i32::MAX - 1)).unwrap();
        assert_eq!(map.bounds().max(), Cell::new(i32::MAX, i32::MAX));
        assert_eq!(map.bounds().cells().count(), 4);

        let low = GridMap::new(2, 2, Cell::new(i32::MIN, i32::MIN)).unwrap();
        assert_eq!(low.bounds().max(), Cell::new(i32::MIN + 1, i32::MIN + 1));
    }

    #[test]
    fn test_neighbors_at_coordinate_range_edge() {
        let map = GridMap::new(2, 2, Cell::new(i32::MAX - 1, i32::MAX - 1))
            .unwrap()
            .with_connectivity(Connectivity::Eight);
        let corner = Cell::new(i32::MAX, i32::MAX);
        assert_eq!(
            map.neighbors(&corner),
            vec![
                Cell::new(i32::MAX, i32::MAX - 1),
                Cell::new(i32::MAX - 1, i32::MAX),
                Cell::new(i32::MAX - 1, i32::MAX - 1),
            ]
        );

        let low = GridMap::new(2, 2, Cell::new(i32::MIN, i32::MIN)).unwrap();
        assert_eq!(low.neighbors(&Cell::new(i32::MIN, i32::MIN)).len(), 2);
    }

    #[test]
    fn test_cell_operations() {
        let mut map = GridMap::new(5, 5, Cell::new(0, 0)).unwrap();
        let cell = Cell::new(2, 2);

        map.block(&cell).unwrap();
        assert_eq!(map.get(&cell).unwrap(), CellKind::Blocked);
        assert!(!map.is_walkable(&cell));

        map.open(&cell).unwrap();
        assert!(map.is_walkable(&cell));

        assert_eq!(
            map.block(&Cell::new(5, 2)),
            Err(NavigationError::OutOfBounds(Cell::new(5, 2)))
        );
        assert_eq!(
            map.get(&Cell::new(2, -1)),
            Err(NavigationError::OutOfBounds(Cell::new(2, -1)))
        );
        assert!(!map.is_walkable(&Cell::new(-1, 0)));
    }

    #[test]
    fn test_bounds_cells_enumeration() {
        let bounds = Bounds::new(Cell::new(-1, 3), 2, 2);
        let cells: Vec<Cell> = bounds.cells().collect();
        assert_eq!(
            cells,
            vec![
                Cell::new(-1, 3),
                Cell::new(0, 3),
                Cell::new(-1, 4),
                Cell::new(0, 4)
            ]
        );
        assert!(cells.iter().all(|cell| bounds.contains(cell)));
        assert!(!bounds.contains(&Cell::new(1, 3)));
    }

    #[test]
    fn test_from_layout_top_row_is_highest_y() {
        let map = GridMap::from_layout(&["#..", "...", "..#"], Cell::new(0, 0)).unwrap();
        assert_eq!(map.bounds().width, 3);
        assert_eq!(map.bounds().height, 3);
        assert_eq!(map.get(&Cell::new(0, 2)).unwrap(), CellKind::Blocked);
        assert_eq!(map.get(&Cell::new(2, 0)).unwrap(), CellKind::Blocked);
        assert_eq!(map.blocked_count(), 2);
    }

    #[test]
    fn test_from_layout_rejects_ragged_rows() {
        let result = GridMap::from_layout(&["...", ".."], Cell::new(0, 0));
        assert!(matches!(
            result,
            Err(NavigationError::InvalidLayout { row: 1, .. })
        ));
    }

    #[test]
    fn test_from_layout_rejects_unknown_characters() {
        let result = GridMap::from_layout(&["..x"], Cell::new(0, 0));
        assert!(matches!(
            result,
            Err(NavigationError::InvalidLayout { row: 0, .. })
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            GridMap::from_layout(&empty, Cell::new(0, 0)),
            Err(NavigationError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_four_neighbors_order_and_filtering() {
        let mut map = GridMap::new(3, 3, Cell::new(0, 0)).unwrap();
        let center = Cell::new(1, 1);
        assert_eq!(
            map.neighbors(&center),
            vec![
                Cell::new(1, 0),
                Cell::new(0, 1),
                Cell::new(2, 1),
                Cell::new(1, 2)
            ]
        );

        map.block(&Cell::new(0, 1)).unwrap();
        assert_eq!(map.neighbors(&center).len(), 3);

        // Corner cell only has in-bounds neighbors
        assert_eq!(
            map.neighbors(&Cell::new(0, 0)),
            vec![Cell::new(1, 0)]
        );
    }

    #[test]
    fn test_eight_neighbors_do_not_cut_corners() {
        let mut map = GridMap::new(3, 3, Cell::new(0, 0))
            .unwrap()
            .with_connectivity(Connectivity::Eight);
        assert_eq!(map.neighbors(&Cell::new(1, 1)).len(), 8);

        map.block(&Cell::new(1, 0)).unwrap();
        let neighbors = map.neighbors(&Cell::new(1, 1));
        assert!(!neighbors.contains(&Cell::new(0, 0)));
        assert!(!neighbors.contains(&Cell::new(2, 0)));
        assert!(neighbors.contains(&Cell::new(2, 2)));
    }

    #[test]
    fn test_step_estimate() {
        let a = Cell::new(0, 0);
        let b = Cell::new(2, 3);
        assert_eq!(Connectivity::Four.step_estimate(&a, &b), 5);
        assert_eq!(Connectivity::Eight.step_estimate(&a, &b), 3);
    }

    #[test]
    fn test_display() {
        let map = GridMap::from_layout(&[".#", ".."], Cell::new(0, 0)).unwrap();
        let display_str = format!("{}", map);
        assert!(display_str.contains("GridMap (2x2"));
        assert!(display_str.contains(".#\n..\n"));
    }
}
