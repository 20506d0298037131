// Exhaustive search over the orders in which targets can be collected.
//
// Every partial route is a state (where we are, what we spent, how many
// targets we hold, which ones are left). States are never modified: expanding
// one pushes a child per affordable, reachable, unvisited target. Children
// keep the index of their parent in the arena so the winning route can be
// walked back once the stack runs dry.
//
// Nothing is cut except routes over budget, so this is exponential in the
// number of targets and only meant for small target sets.

use log::{debug, warn};

use crate::graph::{Graph, VertexId, START};
use crate::pathfinding::Cost;

/// Unvisited targets are tracked as bits of a u64.
pub const MAX_TARGETS: usize = 64;

type TargetMask = u64;

#[derive(Debug, Copy, Clone)]
struct RouteState {
    vertex: VertexId,
    cost: Cost,
    score: u32,
    unvisited: TargetMask,
    parent: Option<usize>,
}

impl RouteState {
    fn root(num_targets: usize) -> Self {
        let unvisited = if num_targets == MAX_TARGETS {
            TargetMask::MAX
        } else {
            (1 << num_targets) - 1
        };
        RouteState { vertex: START, cost: 0, score: 0, unvisited, parent: None }
    }

    /// `None` if the total cost doesn't fit in a `Cost`.
    fn move_to(&self, index: usize, target: VertexId, edge_cost: Cost) -> Option<Self> {
        Some(RouteState {
            vertex: target,
            cost: self.cost.checked_add(edge_cost)?,
            score: self.score + 1,
            unvisited: self.unvisited & !target_bit(target),
            parent: Some(index),
        })
    }
}

#[inline]
fn target_bit(target: VertexId) -> TargetMask {
    1 << (target - 1)
}

/// Best route found by [`best_route`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Visited vertices, starting with [`START`].
    pub vertices: Vec<VertexId>,
    pub cost: Cost,
    /// Number of states popped and expanded.
    pub expansions: usize,
    /// False when `max_expansions` stopped the search early.
    pub exhausted: bool,
}

impl SearchOutcome {
    pub fn score(&self) -> usize {
        self.vertices.len() - 1
    }
}

/// Depth-first search for the visiting order that collects the most targets
/// of `graph` without spending more than `energy`. Ties go to the first route
/// found.
pub fn best_route(
    graph: &Graph, energy: Cost, max_expansions: Option<usize>
    ) -> SearchOutcome {
    let num_targets = graph.num_targets();
    assert!(num_targets <= MAX_TARGETS,
            "Too many targets for the exhaustive search: {num_targets}");

    let mut states = vec![RouteState::root(num_targets)];
    let mut stack = vec![0usize];
    let mut best = 0usize;
    let mut expansions = 0usize;
    let mut exhausted = true;

    while let Some(index) = stack.pop() {
        let state = states[index];
        if state.cost > energy {
            continue;
        }
        if state.score > states[best].score {
            best = index;
            if best_possible(state.score, num_targets) {
                debug!("Every target collected, stopping early.");
                break;
            }
        }
        if max_expansions.map_or(false, |max| expansions >= max) {
            warn!("Exhaustive search hit its cap of {expansions} expansions, \
                   keeping the best route so far.");
            exhausted = false;
            break;
        }
        expansions += 1;

        for target in graph.targets() {
            if state.unvisited & target_bit(target) == 0 {
                continue;
            }
            let Some(edge_cost) = graph.cost(state.vertex, target) else {
                continue;  // Unreachable from here.
            };
            match state.move_to(index, target, edge_cost) {
                Some(child) if child.cost <= energy => {
                    states.push(child);
                    stack.push(states.len() - 1);
                },
                _ => {},
            }
        }
    }

    debug!("Explored {} route states ({} expanded)", states.len(), expansions);
    SearchOutcome {
        vertices: walk_back(&states, best),
        cost: states[best].cost,
        expansions,
        exhausted,
    }
}

fn best_possible(score: u32, num_targets: usize) -> bool {
    score as usize == num_targets
}

fn walk_back(states: &[RouteState], last: usize) -> Vec<VertexId> {
    let mut vertices = Vec::new();
    let mut current = Some(last);
    while let Some(index) = current {
        vertices.push(states[index].vertex);
        current = states[index].parent;
    }
    vertices.reverse();
    vertices
}

#[cfg(test)]
mod tests {
    use crate::grid::{Cell, Grid};
    use crate::pathfinding::Pos;
    use super::*;

    #[test]
    fn test_no_targets() {
        let grid = Grid::open(3, 3, 1);
        let graph = Graph::new(&grid, Pos::new(0, 0), &[]);
        let outcome = best_route(&graph, 10, None);
        assert_eq!(outcome.vertices, vec![START]);
        assert_eq!(outcome.score(), 0);
        assert_eq!(outcome.cost, 0);
        assert!(outcome.exhausted);
    }

    #[test]
    fn test_order_matters() {
        // Start in the middle of a corridor: going right first then back left
        // costs 2 + 6 = 8, going left first costs 4 + 6 = 10.
        let grid = Grid::open(7, 1, 1);
        let targets = [Pos::new(0, 0), Pos::new(6, 0)];
        let graph = Graph::new(&grid, Pos::new(4, 0), &targets);
        let outcome = best_route(&graph, 8, None);
        assert_eq!(outcome.vertices, vec![START, 2, 1]);
        assert_eq!(outcome.cost, 8);

        let outcome = best_route(&graph, 7, None);
        assert_eq!(outcome.score(), 1);
    }

    #[test]
    fn test_skips_unreachable() {
        let mut grid = Grid::open(5, 5, 1);
        grid.set_wall(&Pos::new(3, 4));
        grid.set_wall(&Pos::new(4, 3));
        let targets = [Pos::new(4, 4), Pos::new(2, 2), Pos::new(0, 4)];
        let graph = Graph::new(&grid, Pos::new(0, 0), &targets);
        let outcome = best_route(&graph, 100, None);
        assert_eq!(outcome.score(), 2);
        assert!(!outcome.vertices.contains(&1));
    }

    #[test]
    fn test_overflowing_routes_are_skipped() {
        let huge = Cost::MAX - 1;
        let grid = Grid::from_rows(vec![vec![Cell::Open(1), Cell::Open(huge), Cell::Open(huge)]]);
        let targets = [Pos::new(1, 0), Pos::new(2, 0)];
        let graph = Graph::new(&grid, Pos::new(0, 0), &targets);
        assert_eq!(graph.cost(START, 2), None);
        assert_eq!(graph.cost(1, 2), Some(huge));
        let outcome = best_route(&graph, Cost::MAX, None);
        assert_eq!(outcome.vertices, vec![START, 1]);
        assert_eq!(outcome.cost, huge);
    }

    #[test]
    fn test_expansion_cap() {
        let grid = Grid::open(6, 6, 1);
        let targets: Vec<Pos> = (0..6).map(|i| Pos::new(i, 5 - i)).collect();
        let graph = Graph::new(&grid, Pos::new(0, 0), &targets);
        // Every target is 5 away from the start.
        let outcome = best_route(&graph, 5, Some(1));
        assert!(!outcome.exhausted);
        assert_eq!(outcome.expansions, 1);
        assert_eq!(outcome.score(), 1);
        assert_eq!(outcome.cost, 5);
    }
}
