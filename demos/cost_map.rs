use terrain_pathfinding::map_io::{load_grid, save_cost_file};

// Loads the demo map and writes the cost of reaching every cell from
// waypoint 'a' to a csv file, one x,y,cost record per reachable cell.
fn main() {
    env_logger::init();
    let grid = load_grid("maps/demo_maze.txt").expect("failed to load demo map");
    let start = grid.waypoint('a').expect("map has no waypoint 'a'");
    let costs = grid.get_cost_map(start);
    save_cost_file(&costs, "costs.csv").expect("failed to write cost table");
    println!("Wrote {} records to costs.csv", costs.len());
}
