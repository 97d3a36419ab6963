use fxhash::FxBuildHasher;
/// This module implements a variant of
/// [pathfinding's dijkstra function](https://docs.rs/pathfinding/latest/pathfinding/directed/dijkstra/index.html)
/// with the stopping condition injected as a predicate, so that the
/// single-goal search and the exhaustive cost-map computation share one
/// relaxation loop.
use indexmap::map::Entry::{Occupied, Vacant};
use indexmap::IndexMap;
use num_traits::Zero;

pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use std::hash::Hash;

struct SmallestCostHolder<K> {
    cost: K,
    index: usize,
}

impl<K: PartialEq> Eq for SmallestCostHolder<K> {}

impl<K: PartialEq> PartialEq for SmallestCostHolder<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cost.eq(&other.cost)
    }
}

impl<K: Ord> PartialOrd for SmallestCostHolder<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for SmallestCostHolder<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed cost ordering turns the max-heap into a min-heap;
        // equal costs fall back to insertion order of the nodes.
        match other.cost.cmp(&self.cost) {
            Ordering::Equal => other.index.cmp(&self.index),
            s => s,
        }
    }
}

fn reverse_path<N, V, F>(parents: &FxIndexMap<N, V>, mut parent: F, start: usize) -> Vec<N>
where
    N: Eq + Hash + Clone,
    F: FnMut(&V) -> usize,
{
    let mut path: Vec<N> = itertools::unfold(start, |i| {
        parents.get_index(*i).map(|(node, value)| {
            *i = parent(value);
            node.clone()
        })
    })
    .collect();
    path.reverse();
    path
}

/// The shared relaxation loop. Nodes are interned in the `parents` map in
/// discovery order and addressed by index from the frontier. Returns the map
/// together with the index and cost of the node that satisfied `success`, if
/// any entry did before the frontier ran dry.
fn run_search<N, C, FN, IN, FS>(
    start: &N,
    mut successors: FN,
    mut success: FS,
) -> (FxIndexMap<N, (usize, C)>, Option<(usize, C)>)
where
    N: Eq + Hash + Clone,
    C: Zero + Ord + Copy,
    FN: FnMut(&N) -> IN,
    IN: IntoIterator<Item = (N, C)>,
    FS: FnMut(&N) -> bool,
{
    let mut to_see = BinaryHeap::new();
    to_see.push(SmallestCostHolder {
        cost: Zero::zero(),
        index: 0,
    });
    let mut parents: FxIndexMap<N, (usize, C)> = FxIndexMap::default();
    parents.insert(start.clone(), (usize::MAX, Zero::zero()));
    while let Some(SmallestCostHolder { cost, index }) = to_see.pop() {
        let successors = {
            let (node, &(_, c)) = parents.get_index(index).unwrap();
            if success(node) {
                return (parents, Some((index, cost)));
            }
            // We may have inserted a node several time into the binary heap if we found
            // a better way to access it. Ensure that we are currently dealing with the
            // best path and discard the others.
            if cost > c {
                continue;
            }
            successors(node)
        };
        for (successor, move_cost) in successors {
            let new_cost = cost + move_cost;
            let n; // index for successor
            match parents.entry(successor) {
                Vacant(e) => {
                    n = e.index();
                    e.insert((index, new_cost));
                }
                Occupied(mut e) => {
                    if e.get().1 > new_cost {
                        n = e.index();
                        e.insert((index, new_cost));
                    } else {
                        continue;
                    }
                }
            }

            to_see.push(SmallestCostHolder {
                cost: new_cost,
                index: n,
            });
        }
    }
    (parents, None)
}

/// Computes a cheapest path from `start` to the first node satisfying
/// `success`, together with its cost. The first time a node is popped from
/// the frontier its cost is minimal, so the search stops right there.
/// Returns [None] if the frontier is exhausted first.
pub fn dijkstra<N, C, FN, IN, FS>(start: &N, successors: FN, success: FS) -> Option<(Vec<N>, C)>
where
    N: Eq + Hash + Clone,
    C: Zero + Ord + Copy,
    FN: FnMut(&N) -> IN,
    IN: IntoIterator<Item = (N, C)>,
    FS: FnMut(&N) -> bool,
{
    let (parents, target) = run_search(start, successors, success);
    target.map(|(index, cost)| (reverse_path(&parents, |&(p, _)| p, index), cost))
}

/// Runs the relaxation loop to exhaustion and returns the cheapest cost to
/// every node reachable from `start`. Unreached nodes are absent from the
/// result rather than carrying a sentinel cost.
pub fn dijkstra_map<N, C, FN, IN>(start: &N, successors: FN) -> FxIndexMap<N, C>
where
    N: Eq + Hash + Clone,
    C: Zero + Ord + Copy,
    FN: FnMut(&N) -> IN,
    IN: IntoIterator<Item = (N, C)>,
{
    let (parents, _) = run_search(start, successors, |_: &N| false);
    parents
        .into_iter()
        .map(|(node, (_, cost))| (node, cost))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordered_float::OrderedFloat;

    type Graph = Vec<Vec<(usize, f64)>>;

    fn successors(graph: &Graph) -> impl FnMut(&usize) -> Vec<(usize, OrderedFloat<f64>)> + '_ {
        |&node| {
            graph[node]
                .iter()
                .map(|&(next, cost)| (next, OrderedFloat(cost)))
                .collect()
        }
    }

    /// A diamond where the direct edge is more expensive than the detour.
    fn diamond() -> Graph {
        vec![
            vec![(1, 1.0), (3, 10.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(1, 1.0), (3, 1.0)],
            vec![(0, 10.0), (2, 1.0)],
        ]
    }

    #[test]
    fn finds_cheapest_path() {
        let graph = diamond();
        let (path, cost) = dijkstra(&0, successors(&graph), |&n| n == 3).unwrap();
        assert_eq!(path, vec![0, 1, 2, 3]);
        assert_eq!(cost.into_inner(), 3.0);
    }

    #[test]
    fn start_is_goal() {
        let graph = diamond();
        let (path, cost) = dijkstra(&2, successors(&graph), |&n| n == 2).unwrap();
        assert_eq!(path, vec![2]);
        assert_eq!(cost.into_inner(), 0.0);
    }

    #[test]
    fn exhausted_frontier_is_not_found() {
        // Node 2 has no incoming edges from the component of 0.
        let graph: Graph = vec![vec![(1, 1.0)], vec![(0, 1.0)], vec![]];
        assert!(dijkstra(&0, successors(&graph), |&n| n == 2).is_none());
    }

    /// Node 1 is first seen through the expensive direct edge and later
    /// improved through node 2, leaving a stale frontier entry that pops
    /// before the goal is reached and must be skipped.
    #[test]
    fn stale_frontier_entries_are_discarded() {
        let graph: Graph = vec![
            vec![(1, 5.0), (2, 1.0)],
            vec![(3, 1.0)],
            vec![(1, 1.0)],
            vec![(4, 3.0)],
            vec![],
        ];
        let (path, cost) = dijkstra(&0, successors(&graph), |&n| n == 4).unwrap();
        assert_eq!(path, vec![0, 2, 1, 3, 4]);
        assert_eq!(cost.into_inner(), 6.0);
    }

    #[test]
    fn map_covers_reachable_component_only() {
        let graph = diamond();
        let costs = dijkstra_map(&0, successors(&graph));
        assert_eq!(costs.len(), 4);
        assert_eq!(costs[&0].into_inner(), 0.0);
        assert_eq!(costs[&1].into_inner(), 1.0);
        assert_eq!(costs[&2].into_inner(), 2.0);
        assert_eq!(costs[&3].into_inner(), 3.0);

        let split: Graph = vec![vec![(1, 1.0)], vec![(0, 1.0)], vec![]];
        let costs = dijkstra_map(&0, successors(&split));
        assert_eq!(costs.len(), 2);
        assert!(!costs.contains_key(&2));
    }
}
