// Planner implementations that pick which targets to collect, and in which
// order, under an energy budget.
//
// Planner     | Collects the most targets? | Cost
// --------------------------------------------------------------------
// Greedy      | No, nearest-first only     | one search per target
// Exhaustive  | Yes                        | exponential in # targets

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;

use crate::exhaustive::{best_route, MAX_TARGETS};
use crate::graph::Graph;
use crate::grid::CostGrid;
use crate::pathfinding::{Cost, Pathfinder, Pos, Targets};
use crate::route::{Route, StitchError};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("start {0:?} is outside the map")]
    StartOutOfBounds(Pos),
    #[error("start {0:?} is on a wall")]
    StartBlocked(Pos),
    #[error("target {0:?} is outside the map")]
    TargetOutOfBounds(Pos),
    #[error("{count} targets, the exhaustive planner handles at most {max}")]
    TooManyTargets { count: usize, max: usize },
    #[error("planned segments don't connect")]
    Stitch(#[from] StitchError),
}

/// Tunables, loadable from a JSON settings file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerSettings {
    /// How many targets the greedy planner must collect. All of them if unset.
    pub max_targets: Option<usize>,
    /// Cap on states the exhaustive planner expands. Unbounded if unset.
    pub max_expansions: Option<usize>,
}

pub trait Planner {
    // Name to display for this planner.
    fn name(&self) -> &str;

    // Implementation of the planner. Inputs have already been validated.
    // Ok(None) means no feasible route was found.
    fn do_plan(
        &mut self, grid: &dyn CostGrid, start: Pos, targets: &[Pos], energy: Cost
        ) -> Result<Option<Route>, PlanError>;

    // Wrapper to do_plan, to validate inputs and log timing and outcome.
    fn plan(
        &mut self, grid: &dyn CostGrid, start: Pos, targets: &[Pos], energy: Cost
        ) -> Result<Option<Route>, PlanError> {
        validate(grid, start, targets)?;
        let targets: Vec<Pos> = targets.iter().copied().unique().collect();
        let start_time = Instant::now();
        let route = self.do_plan(grid, start, &targets, energy)?;
        info!("Planner {} took {:?}", self.name(), start_time.elapsed());
        match &route {
            Some(route) => info!(
                "Planner {} collects {}/{} targets for {} energy (budget {})",
                self.name(), route.score(), targets.len(), route.cost, energy),
            None => warn!("Planner {} did NOT find a route.", self.name()),
        };
        Ok(route)
    }
}

fn validate(grid: &dyn CostGrid, start: Pos, targets: &[Pos]) -> Result<(), PlanError> {
    if !grid.in_bounds(&start) {
        return Err(PlanError::StartOutOfBounds(start));
    }
    if grid.is_blocked(&start) {
        return Err(PlanError::StartBlocked(start));
    }
    match targets.iter().find(|target| !grid.in_bounds(target)) {
        Some(&target) => Err(PlanError::TargetOutOfBounds(target)),
        None => Ok(()),
    }
}

// Repeatedly walks to the cheapest target not collected yet. Either the goal
// of `max_targets` is met within budget, or the whole plan fails: a partial
// collection is never returned.
pub struct GreedyPlanner {
    pub max_targets: Option<usize>,
}

// Tries every order of every subset of targets and keeps the one collecting
// the most targets within budget. Only viable for a handful of targets.
pub struct ExhaustivePlanner {
    pub max_expansions: Option<usize>,
}

impl GreedyPlanner {
    pub fn new(max_targets: Option<usize>) -> Self {
        GreedyPlanner { max_targets }
    }
}

impl Planner for GreedyPlanner {
    fn name(&self) -> &str {
        "greedy"
    }

    fn do_plan(
        &mut self, grid: &dyn CostGrid, start: Pos, targets: &[Pos], energy: Cost
        ) -> Result<Option<Route>, PlanError> {
        let mut remaining = Targets::from_iter(targets.iter().copied());
        if remaining.is_empty() {
            return Ok(Some(Route::empty()));
        }
        let goal = self.max_targets.unwrap_or(remaining.len());
        let pathfinder = Pathfinder::new(grid);
        let mut energy = energy;
        let mut current = start;
        let mut paths = Vec::with_capacity(goal.min(remaining.len()));

        for collected in 0..goal {
            let path = match pathfinder.path_to_closest(current, &remaining) {
                Some(path) => path,
                None => {
                    debug!("No target reachable from {current:?} after {collected} \
                            collected, giving up.");
                    return Ok(None);
                },
            };
            energy = match energy.checked_sub(path.cost) {
                Some(energy) => energy,
                None => {
                    debug!("Out of energy: {:?} costs {}, {} left.",
                           path.goal(), path.cost, energy);
                    return Ok(None);
                },
            };
            current = path.goal();
            remaining.remove(&current);
            paths.push(path);
        }
        Ok(Some(Route::from_paths(&paths)?))
    }
}

impl ExhaustivePlanner {
    pub fn new(max_expansions: Option<usize>) -> Self {
        ExhaustivePlanner { max_expansions }
    }
}

impl Planner for ExhaustivePlanner {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn do_plan(
        &mut self, grid: &dyn CostGrid, start: Pos, targets: &[Pos], energy: Cost
        ) -> Result<Option<Route>, PlanError> {
        if targets.len() > MAX_TARGETS {
            return Err(PlanError::TooManyTargets {
                count: targets.len(), max: MAX_TARGETS });
        }
        let graph = Graph::new(grid, start, targets);
        let outcome = best_route(&graph, energy, self.max_expansions);
        debug!("Exhaustive search expanded {} states (exhausted: {}), visiting {:?}",
               outcome.expansions, outcome.exhausted,
               outcome.vertices.iter().map(|&v| graph.pos(v)).collect_vec());
        let paths = outcome.vertices.iter().tuple_windows()
            .filter_map(|(&from, &to)| graph.path(from, to).cloned())
            .collect_vec();
        Ok(Some(Route::from_paths(&paths)?))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use crate::grid::{Cell, Grid};
    use super::*;

    fn all_planners() -> Vec<Box<dyn Planner>> {
        vec![
            Box::new(GreedyPlanner::new(None)),
            Box::new(ExhaustivePlanner::new(None)),
        ]
    }

    fn route_cost(grid: &Grid, route: &Route) -> Cost {
        route.steps.iter().skip(1).map(|pos| grid.cost_at(pos)).sum()
    }

    fn check_route(grid: &Grid, start: Pos, route: &Route, energy: Cost) {
        if route.is_empty() {
            return;
        }
        assert_eq!(route.steps[0], start);
        assert!(route.cost <= energy, "Route over budget: {} > {}", route.cost, energy);
        assert_eq!(route_cost(grid, route), route.cost);
        for target in &route.collected {
            assert!(route.steps.contains(target));
        }
        route.directions().expect("Route should be a contiguous walk");
    }

    #[test]
    fn test_single_target_open_grid() {
        let grid = Grid::open(5, 5, 1);
        let start = Pos::new(0, 0);
        let targets = [Pos::new(4, 4)];
        for mut planner in all_planners() {
            let route = planner.plan(&grid, start, &targets, 100).unwrap().unwrap();
            assert_eq!(route.steps.len(), 9, "{}", planner.name());
            assert_eq!(route.cost, 8, "{}", planner.name());
            assert_eq!(route.collected, vec![Pos::new(4, 4)]);
            check_route(&grid, start, &route, 100);
        }
    }

    #[test]
    fn test_target_on_start() {
        let grid = Grid::open(5, 5, 1);
        let start = Pos::new(0, 0);
        for mut planner in all_planners() {
            let route = planner.plan(&grid, start, &[start], 100).unwrap().unwrap();
            assert_eq!(route.steps, vec![start]);
            assert_eq!(route.cost, 0);
            assert_eq!(route.score(), 1);
        }
    }

    #[test]
    fn test_no_targets() {
        let grid = Grid::open(3, 3, 1);
        let start = Pos::new(1, 1);
        let greedy = GreedyPlanner::new(Some(3)).plan(&grid, start, &[], 0).unwrap();
        let exhaustive = ExhaustivePlanner::new(None).plan(&grid, start, &[], 0).unwrap();
        for route in [greedy, exhaustive] {
            let route = route.unwrap();
            assert!(route.is_empty());
            assert_eq!(route.cost, 0);
            assert_eq!(route.score(), 0);
        }
    }

    #[test]
    fn test_budget_for_one_of_two() {
        let grid = Grid::open(5, 5, 1);
        let start = Pos::new(0, 0);
        let near = Pos::new(2, 0);
        let far = Pos::new(4, 4);
        let targets = [far, near];
        let route = GreedyPlanner::new(Some(1))
            .plan(&grid, start, &targets, 5).unwrap().unwrap();
        assert_eq!(route.collected, vec![near]);
        assert_eq!(route.cost, 2);

        let route = ExhaustivePlanner::new(None)
            .plan(&grid, start, &targets, 5).unwrap().unwrap();
        assert_eq!(route.score(), 1);
        check_route(&grid, start, &route, 5);
    }

    #[test]
    fn test_greedy_is_all_or_nothing() {
        let grid = Grid::open(5, 5, 1);
        let start = Pos::new(0, 0);
        let targets = [Pos::new(2, 0), Pos::new(4, 4)];
        // Enough for the first target only.
        let route = GreedyPlanner::new(None).plan(&grid, start, &targets, 5).unwrap();
        assert_eq!(route, None);
        // Asking for more targets than exist can't succeed either.
        let route = GreedyPlanner::new(Some(3)).plan(&grid, start, &targets, 100).unwrap();
        assert_eq!(route, None);
        let route = GreedyPlanner::new(None).plan(&grid, start, &targets, 8).unwrap();
        assert_eq!(route.map(|r| r.score()), Some(2));
    }

    #[test]
    fn test_greedy_huge_goal_is_infeasible() {
        let grid = Grid::open(3, 1, 1);
        let mut planner = GreedyPlanner::new(Some(usize::MAX / 2));
        let route = planner.plan(&grid, Pos::new(0, 0), &[Pos::new(2, 0)], 10).unwrap();
        assert_eq!(route, None);
    }

    #[test]
    fn test_greedy_fails_on_unreachable() {
        let mut grid = Grid::open(5, 5, 1);
        grid.set_wall(&Pos::new(3, 4));
        grid.set_wall(&Pos::new(4, 3));
        let start = Pos::new(0, 0);
        let targets = [Pos::new(4, 4), Pos::new(1, 1)];
        let route = GreedyPlanner::new(None).plan(&grid, start, &targets, 100).unwrap();
        assert_eq!(route, None);

        let route = ExhaustivePlanner::new(None)
            .plan(&grid, start, &targets, 100).unwrap().unwrap();
        assert_eq!(route.collected, vec![Pos::new(1, 1)]);
    }

    #[test]
    fn test_greedy_is_not_optimal() {
        // Nearest-first walks left to the lone target, then can't afford the
        // two targets on the right. Going right first collects two.
        let grid = Grid::open(9, 1, 1);
        let start = Pos::new(3, 0);
        let targets = [Pos::new(1, 0), Pos::new(6, 0), Pos::new(7, 0)];
        let greedy = GreedyPlanner::new(Some(2)).plan(&grid, start, &targets, 6).unwrap();
        assert_eq!(greedy, None);
        let route = ExhaustivePlanner::new(None)
            .plan(&grid, start, &targets, 6).unwrap().unwrap();
        let mut collected = route.collected.clone();
        collected.sort();
        assert_eq!(collected, vec![Pos::new(6, 0), Pos::new(7, 0)]);
        check_route(&grid, start, &route, 6);
    }

    #[test]
    fn test_invalid_input() {
        let mut grid = Grid::open(3, 3, 1);
        grid.set_wall(&Pos::new(1, 1));
        let mut planner = GreedyPlanner::new(None);
        assert_eq!(planner.plan(&grid, Pos::new(3, 0), &[], 10),
                   Err(PlanError::StartOutOfBounds(Pos::new(3, 0))));
        assert_eq!(planner.plan(&grid, Pos::new(1, 1), &[], 10),
                   Err(PlanError::StartBlocked(Pos::new(1, 1))));
        assert_eq!(planner.plan(&grid, Pos::new(0, 0), &[Pos::new(0, -1)], 10),
                   Err(PlanError::TargetOutOfBounds(Pos::new(0, -1))));

        let grid = Grid::open(13, 13, 1);
        let targets: Vec<Pos> = (0..13).cartesian_product(0..6)
            .map(|(x, y)| Pos::new(x, y)).collect();
        let result = ExhaustivePlanner::new(None).plan(&grid, Pos::new(0, 12), &targets, 10);
        assert_eq!(result, Err(PlanError::TooManyTargets { count: 78, max: 64 }));
    }

    #[test]
    fn test_duplicate_targets_count_once() {
        let grid = Grid::open(4, 1, 1);
        let targets = [Pos::new(3, 0), Pos::new(3, 0)];
        let route = GreedyPlanner::new(None)
            .plan(&grid, Pos::new(0, 0), &targets, 3).unwrap().unwrap();
        assert_eq!(route.score(), 1);
    }

    #[test]
    fn test_exhaustive_dominates_greedy() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..40 {
            let width = rng.gen_range(3..7);
            let height = rng.gen_range(3..7);
            let mut grid = Grid::open(width, height, 1);
            for y in 0..height as i32 {
                for x in 0..width as i32 {
                    let cell = if rng.gen_bool(0.2) {
                        Cell::Wall
                    } else {
                        Cell::Open(rng.gen_range(1..5))
                    };
                    grid.set(&Pos::new(x, y), cell);
                }
            }
            let start = Pos::new(0, 0);
            grid.set(&start, Cell::Open(1));
            let targets: Vec<Pos> = (0..rng.gen_range(1..6))
                .map(|_| Pos::new(rng.gen_range(0..width as i32),
                                  rng.gen_range(0..height as i32)))
                .collect();
            let energy = rng.gen_range(0..30);

            let exhaustive = ExhaustivePlanner::new(None)
                .plan(&grid, start, &targets, energy).unwrap().unwrap();
            check_route(&grid, start, &exhaustive, energy);
            for goal in 1..=targets.len() {
                if let Some(greedy) = GreedyPlanner::new(Some(goal))
                    .plan(&grid, start, &targets, energy).unwrap() {
                    check_route(&grid, start, &greedy, energy);
                    assert!(exhaustive.score() >= greedy.score(),
                            "greedy {} > exhaustive {}\n{}",
                            greedy.score(), exhaustive.score(), grid);
                }
            }
        }
    }

    #[test]
    fn test_settings_from_json() {
        let settings: PlannerSettings =
            serde_json::from_str(r#"{"max_expansions": 1000}"#).unwrap();
        assert_eq!(settings.max_expansions, Some(1000));
        assert_eq!(settings.max_targets, None);
    }
}
