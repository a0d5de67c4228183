/*

Shortest walkable path on a grid, A* with unit step cost.

    f(n) = g(n) + h(n)

    g(n) = steps taken from start to n
    h(n) = lower bound on steps from n to goal (Manhattan for 4-connected
           grids, Chebyshev for 8-connected ones; both consistent)

Because every step costs 1 and h is consistent, the first time the goal is
popped its g is minimal, i.e. this is a uniform-cost search that looks
toward the goal first.

*/

use crate::map::Grid;
use gulde_common::Cell;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents the result of a path search with metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathResult {
    /// The waypoints after the start through the goal, if a path was found.
    pub path: Option<Vec<Cell>>,
    /// The number of steps of the path.
    pub total_cost: Option<usize>,
    /// The number of nodes expanded during the search.
    pub nodes_explored: usize,
    /// The length of the path (number of waypoints).
    pub path_length: usize,
}

impl PathResult {
    /// Creates a new PathResult for a successful search.
    pub fn success(path: Vec<Cell>, total_cost: usize, nodes_explored: usize) -> Self {
        let path_length = path.len();
        Self {
            path: Some(path),
            total_cost: Some(total_cost),
            nodes_explored,
            path_length,
        }
    }

    /// Creates a new PathResult for a failed search.
    pub fn failure(nodes_explored: usize) -> Self {
        Self {
            path: None,
            total_cost: None,
            nodes_explored,
            path_length: 0,
        }
    }

    /// Returns true if a path was found.
    pub fn is_success(&self) -> bool {
        self.path.is_some()
    }

    /// Returns the path if one was found.
    pub fn into_path(self) -> Option<Vec<Cell>> {
        self.path
    }
}

impl fmt::Display for PathResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(_) => write!(
                f,
                "PathResult {{ success: true, path_length: {}, total_cost: {}, nodes_explored: {} }}",
                self.path_length,
                self.total_cost.unwrap_or(0),
                self.nodes_explored
            ),
            None => write!(
                f,
                "PathResult {{ success: false, nodes_explored: {} }}",
                self.nodes_explored
            ),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct State {
    cost: usize,
    position: Cell,
}

// BinaryHeap is a max-heap: the greatest State is the lowest f, then lowest x, then lowest y.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.position.x.cmp(&self.position.x))
            .then_with(|| other.position.y.cmp(&self.position.y))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Walks `came_from` links back from `current`. The start cell has no link and
/// is therefore not part of the result.
fn reconstruct_path(came_from: &HashMap<Cell, Cell>, mut current: Cell) -> Vec<Cell> {
    let mut path = Vec::new();
    while let Some(&previous) = came_from.get(&current) {
        path.push(current);
        current = previous;
    }
    path.reverse();
    path
}

/// Finds the shortest walkable path from `start` to `goal`.
///
/// # Arguments
/// * `grid` - The grid to plan in.
/// * `start` - Cell the entity stands on.
/// * `goal` - Destination cell.
///
/// # Returns
/// * `Some(path)` - The cells after `start` through `goal`; empty when `start == goal`.
/// * `None` - `start` or `goal` is out of bounds or blocked, or the goal is unreachable.
pub fn find_path<G: Grid + ?Sized>(grid: &G, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    find_path_detailed(grid, start, goal).into_path()
}

/// Same as [`find_path`], also reporting search statistics.
pub fn find_path_detailed<G: Grid + ?Sized>(grid: &G, start: Cell, goal: Cell) -> PathResult {
    let mut nodes_explored = 0;

    if !grid.is_walkable(&start) || !grid.is_walkable(&goal) {
        return PathResult::failure(nodes_explored);
    }

    let connectivity = grid.connectivity();
    let heuristic = |cell: &Cell| connectivity.step_estimate(cell, &goal) as usize;

    let mut open_set = BinaryHeap::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, usize> = HashMap::new();
    g_score.insert(start, 0);

    open_set.push(State {
        cost: heuristic(&start),
        position: start,
    });

    while let Some(State {
        position: current, ..
    }) = open_set.pop()
    {
        // Stale heap entry
        if !closed.insert(current) {
            continue;
        }
        nodes_explored += 1;

        let current_g = g_score.get(&current).copied().unwrap_or(0);

        if current == goal {
            let path = reconstruct_path(&came_from, current);
            return PathResult::success(path, current_g, nodes_explored);
        }

        for neighbor in grid.neighbors(&current) {
            if closed.contains(&neighbor) {
                continue;
            }
            let tentative_g_score = current_g + 1;

            if tentative_g_score < g_score.get(&neighbor).copied().unwrap_or(usize::MAX) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g_score);
                open_set.push(State {
                    cost: tentative_g_score + heuristic(&neighbor),
                    position: neighbor,
                });
            }
        }
    }

    PathResult::failure(nodes_explored)
}
