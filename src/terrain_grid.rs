use crate::dijkstra::{dijkstra, dijkstra_map, FxIndexMap};
use crate::{euclidean_distance, N_SMALLVEC_SIZE};
use fxhash::FxHashMap;
use grid_util::point::Point;
use log::{info, warn};
use ordered_float::OrderedFloat;
use petgraph::unionfind::UnionFind;
use smallvec::SmallVec;
use thiserror::Error;

/// Offsets of the Moore neighbourhood, axis-aligned moves first. The
/// enumeration order decides which of several equal-cost frontier entries
/// is relaxed first, not which costs are minimal.
const MOORE_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Violations of the grid construction invariants.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("cell {position} has non-positive weight {weight}")]
    NonPositiveWeight { position: Point, weight: f64 },

    #[error("waypoint '{label}' at {position} is not on traversable ground")]
    WaypointOffGround { label: char, position: Point },
}

/// [TerrainGrid] maps every traversable cell to its movement weight; cells
/// absent from the mapping are walls. Waypoints name cells of interest by a
/// single character. The grid is immutable once constructed and pre-computes
/// [connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
/// with a [UnionFind] structure to avoid flood-filling behaviour if no path
/// exists.
#[derive(Clone, Debug)]
pub struct TerrainGrid {
    spaces: FxHashMap<Point, f64>,
    waypoints: FxHashMap<char, Point>,
    cell_ix: FxHashMap<Point, usize>,
    components: UnionFind<usize>,
}

impl TerrainGrid {
    /// Builds a grid from per-cell weights and waypoint labels. Weights must
    /// be positive and finite, and every waypoint must sit on traversable
    /// ground.
    pub fn new(
        spaces: FxHashMap<Point, f64>,
        waypoints: FxHashMap<char, Point>,
    ) -> Result<TerrainGrid, GridError> {
        for (&position, &weight) in &spaces {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(GridError::NonPositiveWeight { position, weight });
            }
        }
        for (&label, &position) in &waypoints {
            if !spaces.contains_key(&position) {
                return Err(GridError::WaypointOffGround { label, position });
            }
        }
        let mut grid = TerrainGrid {
            cell_ix: spaces.keys().enumerate().map(|(ix, &p)| (p, ix)).collect(),
            spaces,
            waypoints,
            components: UnionFind::new(0),
        };
        grid.generate_components();
        Ok(grid)
    }

    /// Generates a new [UnionFind] structure and links up traversable
    /// neighbours to the same components.
    fn generate_components(&mut self) {
        info!(
            "Generating connected components for {} traversable cells",
            self.spaces.len()
        );
        self.components = UnionFind::new(self.spaces.len());
        for (point, &ix) in &self.cell_ix {
            // Half of the neighbourhood suffices: the mirrored offsets are
            // covered from the other endpoint.
            for (dx, dy) in [(1, 0), (0, 1), (1, 1), (1, -1)] {
                let neighbour = Point::new(point.x + dx, point.y + dy);
                if let Some(&neighbour_ix) = self.cell_ix.get(&neighbour) {
                    self.components.union(ix, neighbour_ix);
                }
            }
        }
    }

    /// Movement weight of a cell, if it is traversable.
    pub fn weight(&self, pos: &Point) -> Option<f64> {
        self.spaces.get(pos).copied()
    }

    pub fn is_traversable(&self, pos: &Point) -> bool {
        self.spaces.contains_key(pos)
    }

    pub fn traversable_count(&self) -> usize {
        self.spaces.len()
    }

    pub fn traversable_cells(&self) -> impl Iterator<Item = (Point, f64)> + '_ {
        self.spaces.iter().map(|(&pos, &weight)| (pos, weight))
    }

    /// The cell a waypoint label marks.
    pub fn waypoint(&self, label: char) -> Option<Point> {
        self.waypoints.get(&label).copied()
    }

    pub fn waypoints(&self) -> impl Iterator<Item = (char, Point)> + '_ {
        self.waypoints.iter().map(|(&label, &pos)| (label, pos))
    }

    /// Bounding box of the traversable cells as `(min, max)`, both
    /// inclusive, or [None] for a grid without any traversable cell.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut cells = self.spaces.keys();
        let first = cells.next()?;
        let (mut min, mut max) = (*first, *first);
        for p in cells {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some((min, max))
    }

    /// Cost of stepping between two traversable cells: each endpoint
    /// contributes half its weight, scaled by the straight-line distance
    /// covered by the step. [None] if either endpoint is a wall.
    pub fn edge_cost(&self, from: &Point, to: &Point) -> Option<f64> {
        let from_weight = self.weight(from)?;
        let to_weight = self.weight(to)?;
        Some(euclidean_distance(from, to) * (0.5 * from_weight + 0.5 * to_weight))
    }

    /// Traversable Moore neighbours of `pos` with their edge costs, in the
    /// fixed offset enumeration order. A cell without traversable
    /// neighbours yields an empty list.
    pub fn neighbour_costs(&self, pos: &Point) -> SmallVec<[(Point, f64); N_SMALLVEC_SIZE]> {
        MOORE_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| {
                let neighbour = Point::new(pos.x + dx, pos.y + dy);
                let cost = self.edge_cost(pos, &neighbour)?;
                Some((neighbour, cost))
            })
            .collect()
    }

    fn get_ix(&self, point: &Point) -> Option<usize> {
        self.cell_ix.get(point).copied()
    }

    /// Retrieves the component id a given [Point] belongs to, if it is
    /// traversable.
    pub fn get_component(&self, point: &Point) -> Option<usize> {
        self.get_ix(point).map(|ix| self.components.find(ix))
    }

    /// Checks if start and goal are on the same component.
    pub fn reachable(&self, start: &Point, goal: &Point) -> bool {
        !self.unreachable(start, goal)
    }

    /// Checks if start and goal are not on the same component. Cells outside
    /// the traversable set are unreachable from everywhere.
    pub fn unreachable(&self, start: &Point, goal: &Point) -> bool {
        match (self.get_ix(start), self.get_ix(goal)) {
            (Some(start_ix), Some(goal_ix)) => !self.components.equiv(start_ix, goal_ix),
            _ => true,
        }
    }

    /// Computes a cost-minimal path from start to goal, both included.
    /// Returns [None] if the goal is not reachable from the start.
    pub fn get_path_single_goal(&self, start: Point, goal: Point) -> Option<Vec<Point>> {
        self.get_path_with_cost(start, goal).map(|(path, _)| path)
    }

    /// Like [get_path_single_goal](Self::get_path_single_goal), but also
    /// returns the total cost of the path.
    pub fn get_path_with_cost(&self, start: Point, goal: Point) -> Option<(Vec<Point>, f64)> {
        if self.unreachable(&start, &goal) {
            info!("{} is not reachable from {}", goal, start);
            return None;
        }
        info!("{} is reachable from {}, computing path", goal, start);
        let result = dijkstra(
            &start,
            |node| {
                self.neighbour_costs(node)
                    .into_iter()
                    .map(|(neighbour, cost)| (neighbour, OrderedFloat(cost)))
            },
            |node| *node == goal,
        );
        if result.is_none() {
            warn!("Reachable goal could not be pathed to, is the component structure correct?");
        }
        result.map(|(path, cost)| (path, cost.into_inner()))
    }

    /// Cost of the cheapest path to every cell reachable from start. Cells
    /// outside the start's component are absent from the result, as is
    /// everything when the start itself is a wall.
    pub fn get_cost_map(&self, start: Point) -> FxIndexMap<Point, f64> {
        if !self.is_traversable(&start) {
            info!("{} is not traversable, cost map is empty", start);
            return FxIndexMap::default();
        }
        dijkstra_map(&start, |node| {
            self.neighbour_costs(node)
                .into_iter()
                .map(|(neighbour, cost)| (neighbour, OrderedFloat(cost)))
        })
        .into_iter()
        .map(|(node, cost)| (node, cost.into_inner()))
        .collect()
    }
}
