use gulde_common::Cell;
use gulde_navigation::{Connectivity, Grid, GridMap, find_path_detailed};
use std::collections::HashSet;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // '.' = walkable
    // '#' = blocked
    // First row is the top of the map
    let layout = [
        "..........",
        ".##....##.",
        ".....#....",
        "..####.#..",
        ".....#.#..",
        ".###.#.##.",
        "...#......",
        ".#.#.###..",
        ".#......#.",
        "...###....",
    ];

    // City maps are centred on the origin
    let grid = GridMap::from_layout(&layout, Cell::new(-5, -5))?;
    let start = Cell::new(-5, -5);
    let goal = Cell::new(4, 4);

    println!("{}", grid);
    println!("Start: ({}, {}), Goal: ({}, {})", start.x, start.y, goal.x, goal.y);

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let grid = grid.clone().with_connectivity(connectivity);
        let result = find_path_detailed(&grid, start, goal);

        println!("\n{:?}-connected: {}", connectivity, result);

        match &result.path {
            Some(path) => {
                let on_path: HashSet<Cell> = path.iter().copied().collect();
                print_with_path(&grid, start, goal, &on_path);
            }
            None => println!("No path found."),
        }
    }

    Ok(())
}

fn print_with_path(grid: &GridMap, start: Cell, goal: Cell, on_path: &HashSet<Cell>) {
    let bounds = grid.bounds();
    let max = bounds.max();
    for y in (bounds.origin.y..=max.y).rev() {
        for x in bounds.origin.x..=max.x {
            let cell = Cell::new(x, y);
            if cell == start {
                print!("S ");
            } else if cell == goal {
                print!("G ");
            } else if on_path.contains(&cell) {
                print!("* ");
            } else if grid.is_walkable(&cell) {
                print!(". ");
            } else {
                print!("X ");
            }
        }
        println!();
    }
}
