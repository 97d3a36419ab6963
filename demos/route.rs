use terrain_pathfinding::map_io::{load_grid, render_route};

// Loads the demo map, routes between waypoints 'a' and 'e' and prints the
// path drawn over the map.
fn main() {
    env_logger::init();
    let grid = load_grid("maps/demo_maze.txt").expect("failed to load demo map");
    let start = grid.waypoint('a').expect("map has no waypoint 'a'");
    let goal = grid.waypoint('e').expect("map has no waypoint 'e'");
    match grid.get_path_single_goal(start, goal) {
        Some(path) => {
            println!("A path has been found:");
            print!("{}", render_route(&grid, &path));
        }
        None => println!("No path possible!"),
    }
}
