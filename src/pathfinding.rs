//! Weighted A* over the warehouse graph.
//!
//! Highway tiles cost 1 to enter, everything else costs 10 — this steers
//! traffic onto the structured one-way loop and keeps non-highway tiles as
//! start/end segments only. The goal tile is always entered at cost 1, and a
//! `blocked` set may exclude candidate nodes from expansion, except the goal
//! itself, which A* never excludes even if the caller lists it.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{Graph, Pos, TileMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f_score: i64,
    // Monotonic insertion counter: makes the heap a stable priority queue,
    // breaking ties in `f` by arrival order (mirrors a `heapq` tuple key).
    counter: u64,
    node: Pos,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest (f, counter) pops first.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(node: Pos, goal: Pos) -> i64 {
    node.manhattan(goal) as i64
}

fn edge_cost(neighbor: Pos, goal: Pos, tiles: Option<&TileMap>) -> i64 {
    if neighbor == goal {
        return 1;
    }
    match tiles {
        Some(tiles) => match tiles.get(&neighbor) {
            Some(tile) if tile.kind.is_highway() => 1,
            _ => 10,
        },
        None => 1,
    }
}

/// Find a path from `start` to `goal`, or `None` if no path exists.
///
/// `blocked` excludes interior nodes from expansion (the goal is exempt even
/// if present in the set). `tiles`, when supplied, drives highway-weighted
/// edge costs; without it every edge costs 1.
pub fn astar(
    graph: &Graph,
    start: Pos,
    goal: Pos,
    blocked: Option<&HashSet<Pos>>,
    tiles: Option<&TileMap>,
) -> Option<Vec<Pos>> {
    if !graph.contains(start) || !graph.contains(goal) {
        return None;
    }

    let mut counter: u64 = 0;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        f_score: heuristic(start, goal),
        counter,
        node: start,
    });

    let mut came_from: HashMap<Pos, Pos> = HashMap::new();
    let mut g_score: HashMap<Pos, i64> = HashMap::new();
    g_score.insert(start, 0);

    while let Some(OpenEntry { node: current, .. }) = open.pop() {
        if current == goal {
            let mut path = vec![current];
            let mut node = current;
            while let Some(&prev) = came_from.get(&node) {
                path.push(prev);
                node = prev;
            }
            path.reverse();
            return Some(path);
        }

        for neighbor in graph.neighbors(current) {
            if let Some(blocked) = blocked {
                if neighbor != goal && blocked.contains(&neighbor) {
                    continue;
                }
            }
            let tentative_g = g_score[&current] + edge_cost(neighbor, goal, tiles);
            let better = match g_score.get(&neighbor) {
                Some(&existing) => tentative_g < existing,
                None => true,
            };
            if better {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g);
                counter += 1;
                open.push(OpenEntry {
                    f_score: tentative_g + heuristic(neighbor, goal),
                    counter,
                    node: neighbor,
                });
            }
        }
    }

    None
}
