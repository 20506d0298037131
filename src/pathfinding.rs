use log::trace;
use priority_queue::PriorityQueue;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::cmp::Reverse;

use crate::grid::CostGrid;

/// Total path costs must fit in a `Cost`; longer paths count as unreachable.
pub type Cost = u32;

#[derive(Serialize, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Copy, Clone)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }

    pub fn manhattan_distance(&self, other: &Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Shortest path from `steps[0]` to the last step. `cost` is the sum of the
/// entry costs of every step except the first one.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Path {
    pub steps: Vec<Pos>,
    pub cost: Cost,
}

impl Path {
    pub fn start(&self) -> Pos {
        self.steps[0]
    }

    pub fn goal(&self) -> Pos {
        self.steps[self.steps.len() - 1]
    }
}

type CameFrom = FxHashMap<Pos, Pos>;
type CostSoFar = FxHashMap<Pos, Cost>;
pub type Targets = FxHashSet<Pos>;

/// Dijkstra search from a single source towards a set of targets.
///
/// Yields one [`Path`] each time a pending target is finalized, so results
/// come out by ascending cost. Targets that can't be reached are never
/// yielded. The search stops expanding as soon as no target is pending.
pub struct TargetPaths<'a, G: CostGrid + ?Sized> {
    grid: &'a G,
    source: Pos,
    pending: Targets,

    came_from: CameFrom,
    cost_so_far: CostSoFar,
    finalized: FxHashSet<Pos>,
    frontier: PriorityQueue<Pos, Reverse<Cost>>,
}

impl<'a, G: CostGrid + ?Sized> TargetPaths<'a, G> {
    pub fn new<I>(grid: &'a G, source: Pos, targets: I) -> Self
    where I: IntoIterator<Item=Pos> {
        let mut frontier = PriorityQueue::new();
        frontier.push(source, Reverse(0));
        let mut cost_so_far = CostSoFar::default();
        cost_so_far.insert(source, 0);
        TargetPaths {
            grid,
            source,
            pending: targets.into_iter().collect(),
            came_from: CameFrom::default(),
            cost_so_far,
            finalized: FxHashSet::default(),
            frontier,
        }
    }

    /// Targets not yielded yet.
    pub fn pending(&self) -> &Targets {
        &self.pending
    }

    /// Final cost to `pos`, if the search already settled it.
    pub fn finalized_cost(&self, pos: &Pos) -> Option<Cost> {
        if self.finalized.contains(pos) {
            self.cost_so_far.get(pos).copied()
        } else {
            None
        }
    }

    pub fn is_discovered(&self, pos: &Pos) -> bool {
        self.cost_so_far.contains_key(pos)
    }

    fn reconstruct_path(&self, goal: Pos, cost: Cost) -> Path {
        let mut steps = vec![goal];
        let mut current = goal;
        while current != self.source {
            current = self.came_from[&current];
            steps.push(current);
        }
        steps.reverse();
        Path { steps, cost }
    }

    fn relax_neighbors(&mut self, current: Pos, cost: Cost) {
        for next in self.grid.neighbors(current) {
            if self.finalized.contains(&next) {
                continue;
            }
            // Paths whose cost doesn't fit in a Cost are never taken.
            let Some(new_cost) = cost.checked_add(self.grid.cost_at(&next)) else {
                continue;
            };
            let old_cost = self.cost_so_far.get(&next).copied();
            if old_cost.map_or(true, |old| new_cost < old) {
                self.cost_so_far.insert(next, new_cost);
                self.came_from.insert(next, current);
                // Updates the priority if `next` is already queued.
                self.frontier.push(next, Reverse(new_cost));
            }
        }
    }
}

impl<'a, G: CostGrid + ?Sized> Iterator for TargetPaths<'a, G> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while !self.pending.is_empty() {
            let (current, Reverse(cost)) = self.frontier.pop()?;
            self.finalized.insert(current);
            self.relax_neighbors(current, cost);
            if self.pending.remove(&current) {
                trace!("Reached target {current:?} from {:?} (cost {cost})",
                       self.source);
                return Some(self.reconstruct_path(current, cost));
            }
        }
        None
    }
}

/// Shortest path queries over a borrowed grid. Every query runs a fresh
/// search, nothing is kept between calls.
pub struct Pathfinder<'a, G: CostGrid + ?Sized> {
    pub grid: &'a G,
}

impl<'a, G: CostGrid + ?Sized> Pathfinder<'a, G> {
    pub fn new(grid: &'a G) -> Self {
        Pathfinder { grid }
    }

    /// Lazily yields paths to each reachable target, cheapest first.
    pub fn paths<I>(&self, start: Pos, targets: I) -> TargetPaths<'a, G>
    where I: IntoIterator<Item=Pos> {
        TargetPaths::new(self.grid, start, targets)
    }

    pub fn path_to_closest(&self, start: Pos, targets: &Targets) -> Option<Path> {
        self.paths(start, targets.iter().copied()).next()
    }

    pub fn shortest_path(&self, start: Pos, target: Pos) -> Option<Path> {
        self.paths(start, [target]).next()
    }

    pub fn distance(&self, start: Pos, target: Pos) -> Option<Cost> {
        self.shortest_path(start, target).map(|path| path.cost)
    }

    pub fn paths_to_all_targets(
        &self, start: Pos, targets: &Targets
        ) -> FxHashMap<Pos, Path> {
        self.paths(start, targets.iter().copied())
            .map(|path| (path.goal(), path))
            .collect()
    }

    // Used for debugging purposes and tests.
    pub fn verify_path(&self, path: &Path) {
        assert!(!path.steps.is_empty(), "Empty path");
        let mut cost: Cost = 0;
        for pair in path.steps.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            assert!(from.manhattan_distance(&to) == 1,
                    "Non-adjacent steps {:?}->{:?}", from, to);
            assert!(self.grid.in_bounds(&to) && !self.grid.is_blocked(&to),
                    "Walking into a wall {:?}->{:?}", from, to);
            cost += self.grid.cost_at(&to);
        }
        assert!(cost == path.cost, "Path would cost {}, but claims {}",
                cost, path.cost);
    }
}
