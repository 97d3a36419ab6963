//! Reading, rendering and persisting terrain maps.
//!
//! A map file holds one character per cell, rows top to bottom (`y`),
//! columns left to right (`x`): `X` is a wall, a space is ground with
//! weight 1, the digits `1`..`9` are ground with that weight, and a
//! lowercase letter is a waypoint on weight-1 ground. Lines may end early;
//! cells past the end of a line are walls.

use crate::dijkstra::FxIndexMap;
use crate::terrain_grid::{GridError, TerrainGrid};
use core::fmt;
use fxhash::FxHashMap;
use grid_util::point::Point;
use log::info;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when reading or writing map files.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown tile '{tile}' at ({x}, {y})")]
    UnknownTile { tile: char, x: i32, y: i32 },

    #[error("waypoint '{0}' appears more than once")]
    DuplicateWaypoint(char),

    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type MapResult<T> = Result<T, MapError>;

/// Parses a character map into a [TerrainGrid].
pub fn parse_grid(text: &str) -> MapResult<TerrainGrid> {
    let mut spaces: FxHashMap<Point, f64> = FxHashMap::default();
    let mut waypoints: FxHashMap<char, Point> = FxHashMap::default();
    for (y, line) in text.lines().enumerate() {
        for (x, tile) in line.chars().enumerate() {
            let position = Point::new(x as i32, y as i32);
            match tile {
                'X' => {}
                ' ' => {
                    spaces.insert(position, 1.0);
                }
                '1'..='9' => {
                    spaces.insert(position, f64::from(tile as u8 - b'0'));
                }
                'a'..='z' => {
                    if waypoints.insert(tile, position).is_some() {
                        return Err(MapError::DuplicateWaypoint(tile));
                    }
                    spaces.insert(position, 1.0);
                }
                _ => {
                    return Err(MapError::UnknownTile {
                        tile,
                        x: position.x,
                        y: position.y,
                    })
                }
            }
        }
    }
    Ok(TerrainGrid::new(spaces, waypoints)?)
}

/// Loads a [TerrainGrid] from a map file.
pub fn load_grid<P: AsRef<Path>>(path: P) -> MapResult<TerrainGrid> {
    let text = fs::read_to_string(path)?;
    let grid = parse_grid(&text)?;
    info!("Loaded map with {} traversable cells", grid.traversable_count());
    Ok(grid)
}

impl FromStr for TerrainGrid {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_grid(s)
    }
}

fn tile_at(grid: &TerrainGrid, position: &Point) -> char {
    // Waypoint labels stay visible on top of the ground they mark.
    if let Some((label, _)) = grid.waypoints().find(|(_, w)| w == position) {
        return label;
    }
    match grid.weight(position) {
        None => 'X',
        Some(weight) if weight == 1.0 => ' ',
        Some(weight) => char::from_digit(weight as u32, 10).unwrap_or('?'),
    }
}

/// Renders the map with a path drawn over it as `*`. Waypoints win over the
/// path so that route endpoints remain identifiable. Cells outside the
/// bounding box of the traversable area are omitted.
pub fn render_route(grid: &TerrainGrid, path: &[Point]) -> String {
    let Some((min, max)) = grid.bounds() else {
        return String::new();
    };
    let mut out = String::new();
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            let position = Point::new(x, y);
            if path.contains(&position) && grid.waypoints().all(|(_, w)| w != position) {
                out.push('*');
            } else {
                out.push(tile_at(grid, &position));
            }
        }
        out.push('\n');
    }
    out
}

impl fmt::Display for TerrainGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&render_route(self, &[]))
    }
}

/// Writes one `x,y,cost` record per reached cell, rows sorted top to bottom
/// and left to right so the output is stable.
pub fn save_cost_table<W: Write>(costs: &FxIndexMap<Point, f64>, writer: &mut W) -> MapResult<()> {
    let mut records: Vec<(&Point, &f64)> = costs.iter().collect();
    records.sort_by_key(|(position, _)| (position.y, position.x));
    for (position, cost) in records {
        writeln!(writer, "{},{},{}", position.x, position.y, cost)?;
    }
    Ok(())
}

/// Saves a cost table produced by [TerrainGrid::get_cost_map] to a file.
pub fn save_cost_file<P: AsRef<Path>>(costs: &FxIndexMap<Point, f64>, path: P) -> MapResult<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    save_cost_table(costs, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = "\
XXXXX
Xa2bX
X X X
XXXXX";

    #[test]
    fn parses_walls_weights_and_waypoints() {
        let grid = parse_grid(MAP).unwrap();
        assert_eq!(grid.waypoint('a'), Some(Point::new(1, 1)));
        assert_eq!(grid.waypoint('b'), Some(Point::new(3, 1)));
        assert_eq!(grid.weight(&Point::new(2, 1)), Some(2.0));
        assert_eq!(grid.weight(&Point::new(1, 1)), Some(1.0));
        assert!(!grid.is_traversable(&Point::new(0, 0)));
        assert!(!grid.is_traversable(&Point::new(2, 2)));
        assert_eq!(grid.traversable_count(), 5);
    }

    #[test]
    fn short_lines_end_in_walls() {
        let grid = parse_grid("ab\n ").unwrap();
        assert!(grid.is_traversable(&Point::new(1, 0)));
        assert!(!grid.is_traversable(&Point::new(1, 1)));
    }

    #[test]
    fn rejects_unknown_tiles() {
        assert!(matches!(
            parse_grid("a?b"),
            Err(MapError::UnknownTile { tile: '?', x: 1, y: 0 })
        ));
    }

    #[test]
    fn rejects_duplicate_waypoints() {
        assert!(matches!(
            parse_grid("aa"),
            Err(MapError::DuplicateWaypoint('a'))
        ));
    }

    #[test]
    fn from_str_round_trips_the_interior() {
        let grid: TerrainGrid = MAP.parse().unwrap();
        // The outer wall ring is implicit and not part of the rendered
        // bounding box; the interior must survive a render/parse cycle.
        assert_eq!(format!("{grid}"), "a2b\n X \n");
    }

    #[test]
    fn renders_route_overlay() {
        let grid = parse_grid(MAP).unwrap();
        let path = vec![Point::new(1, 1), Point::new(2, 1), Point::new(3, 1)];
        // Waypoints a and b stay on top of the path ends.
        assert_eq!(render_route(&grid, &path), "a*b\n X \n");
    }

    #[test]
    fn cost_table_is_sorted_and_complete() {
        let grid = parse_grid(MAP).unwrap();
        let costs = grid.get_cost_map(grid.waypoint('a').unwrap());
        let mut out = Vec::new();
        save_cost_table(&costs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "1,1,0");
        assert_eq!(lines[1], "2,1,1.5");
        assert_eq!(lines[2], "3,1,3");
        assert_eq!(lines[3], "1,2,1");
        assert!(lines[4].starts_with("3,2,"));
    }
}
