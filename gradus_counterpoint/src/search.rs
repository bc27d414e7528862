// Generic best-first search. The counterpoint solver uses a specialized
// loop of its own; this primitive serves smaller exact searches and keeps
// the algorithm testable in isolation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;

use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};

pub trait SearchNode: Sized {
    /// Identifies a state; two nodes with equal keys are the same state.
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
    fn is_goal(&self) -> bool;
    fn neighbors(&self) -> Vec<(Self, f64)>;
    /// Admissible estimate of the remaining cost; zero degrades to Dijkstra.
    fn heuristic(&self) -> f64 {
        0.0
    }
}

pub struct SearchResult<N> {
    /// Start node first, goal last.
    pub path: Vec<N>,
    pub cost: f64,
}

struct OpenEntry<N> {
    f: OrderedFloat<f64>,
    seq: u64,
    node: N,
}

impl<N> PartialEq for OpenEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl<N> Eq for OpenEntry<N> {}

impl<N> Ord for OpenEntry<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f, then oldest entry.
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<N> PartialOrd for OpenEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over `start`'s state graph. Returns the cheapest path to a goal, or
/// `None` when the reachable graph holds no goal.
pub fn best_first<N: SearchNode + Clone>(start: N) -> Option<SearchResult<N>> {
    let mut open = BinaryHeap::new();
    let mut closed: FxHashSet<N::Key> = FxHashSet::default();
    let mut g_score: FxHashMap<N::Key, f64> = FxHashMap::default();
    let mut came_from: FxHashMap<N::Key, N> = FxHashMap::default();
    let mut seq = 0u64;

    g_score.insert(start.key(), 0.0);
    open.push(OpenEntry { f: OrderedFloat(start.heuristic()), seq, node: start });

    while let Some(OpenEntry { node: current, .. }) = open.pop() {
        let key = current.key();
        let Some(&current_g) = g_score.get(&key) else { continue };

        if current.is_goal() {
            let path = reconstruct(&came_from, current);
            return Some(SearchResult { path, cost: current_g });
        }
        if !closed.insert(key) {
            // A cheaper copy was expanded earlier.
            continue;
        }

        for (neighbor, cost) in current.neighbors() {
            let nkey = neighbor.key();
            if closed.contains(&nkey) {
                continue;
            }
            let tentative = current_g + cost;
            if g_score.get(&nkey).is_none_or(|&g| tentative < g) {
                g_score.insert(nkey.clone(), tentative);
                came_from.insert(nkey, current.clone());
                seq += 1;
                open.push(OpenEntry {
                    f: OrderedFloat(tentative + neighbor.heuristic()),
                    seq,
                    node: neighbor,
                });
            }
        }
    }
    None
}

fn reconstruct<N: SearchNode + Clone>(came_from: &FxHashMap<N::Key, N>, goal: N) -> Vec<N> {
    let mut path = vec![goal];
    loop {
        let key = path[path.len() - 1].key();
        let Some(parent) = came_from.get(&key) else { break };
        path.push(parent.clone());
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct GridNode {
        pos: (i32, i32),
        goal: (i32, i32),
        walls: &'static [(i32, i32)],
    }

    impl SearchNode for GridNode {
        type Key = (i32, i32);

        fn key(&self) -> (i32, i32) {
            self.pos
        }

        fn is_goal(&self) -> bool {
            self.pos == self.goal
        }

        fn neighbors(&self) -> Vec<(GridNode, f64)> {
            [(1, 0), (-1, 0), (0, 1), (0, -1)]
                .iter()
                .filter_map(|&(dx, dy)| {
                    let pos = (self.pos.0 + dx, self.pos.1 + dy);
                    let open = (0..5).contains(&pos.0)
                        && (0..5).contains(&pos.1)
                        && !self.walls.contains(&pos);
                    open.then(|| (GridNode { pos, ..self.clone() }, 1.0))
                })
                .collect()
        }

        fn heuristic(&self) -> f64 {
            ((self.goal.0 - self.pos.0).abs() + (self.goal.1 - self.pos.1).abs()) as f64
        }
    }

    fn grid(goal: (i32, i32), walls: &'static [(i32, i32)]) -> GridNode {
        GridNode { pos: (0, 0), goal, walls }
    }

    #[test]
    fn test_straight_line() {
        let r = best_first(grid((3, 0), &[])).unwrap();
        assert_eq!(r.cost, 3.0);
        assert_eq!(r.path.len(), 4);
        assert_eq!(r.path[0].pos, (0, 0));
        assert_eq!(r.path[3].pos, (3, 0));
    }

    #[test]
    fn test_detour_around_wall() {
        // Column x = 2 is blocked except at the top.
        let walls = &[(2, 0), (2, 1), (2, 2), (2, 3)];
        let r = best_first(grid((4, 0), walls)).unwrap();
        assert_eq!(r.cost, 12.0);
        assert!(r.path.iter().all(|n| !walls.contains(&n.pos)));
    }

    #[test]
    fn test_unreachable_goal() {
        let walls = &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)];
        assert!(best_first(grid((4, 0), walls)).is_none());
    }
}
