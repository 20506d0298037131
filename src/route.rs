use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::pathfinding::{Cost, Path, Pos};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StitchError {
    #[error("segment {index} is empty")]
    EmptySegment { index: usize },
    #[error("segment {index} starts at {start:?}, but the route so far ends at {end:?}")]
    Discontinuous { index: usize, end: Pos, start: Pos },
    #[error("steps {from:?}->{to:?} are not one unit move apart")]
    NotAdjacent { from: Pos, to: Pos },
}

#[derive(Serialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

fn get_direction(from: Pos, to: Pos) -> Option<Direction> {
    match (to.x - from.x, to.y - from.y) {
        (0, -1) => Some(Direction::Up),
        (0, 1) => Some(Direction::Down),
        (-1, 0) => Some(Direction::Left),
        (1, 0) => Some(Direction::Right),
        _ => None,
    }
}

/// Moves needed to walk `steps` in order.
pub fn directions(steps: &[Pos]) -> Result<Vec<Direction>, StitchError> {
    steps.iter().tuple_windows()
        .map(|(&from, &to)| get_direction(from, to)
             .ok_or(StitchError::NotAdjacent { from, to }))
        .collect()
}

/// Joins consecutive path segments into one walk. Every segment after the
/// first must start where the previous one ended; its first step is dropped.
pub fn stitch<'a, I>(segments: I) -> Result<Vec<Pos>, StitchError>
where I: IntoIterator<Item=&'a Path> {
    let mut steps: Vec<Pos> = Vec::new();
    for (index, segment) in segments.into_iter().enumerate() {
        let Some(&start) = segment.steps.first() else {
            return Err(StitchError::EmptySegment { index });
        };
        match steps.last() {
            None => steps.push(start),
            Some(&end) if end == start => {},
            Some(&end) => {
                return Err(StitchError::Discontinuous { index, end, start });
            },
        }
        steps.extend_from_slice(&segment.steps[1..]);
    }
    Ok(steps)
}

/// A planned walk from the start through the collected targets.
///
/// `steps` begins at the start position. A route that collects nothing has no
/// steps at all.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub steps: Vec<Pos>,
    pub cost: Cost,
    /// Targets in the order they get collected.
    pub collected: Vec<Pos>,
}

impl Route {
    pub fn empty() -> Self {
        Route::default()
    }

    pub fn from_paths(paths: &[Path]) -> Result<Self, StitchError> {
        Ok(Route {
            steps: stitch(paths)?,
            cost: paths.iter().map(|path| path.cost).sum(),
            collected: paths.iter().map(Path::goal).collect(),
        })
    }

    pub fn score(&self) -> usize {
        self.collected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn directions(&self) -> Result<Vec<Direction>, StitchError> {
        directions(&self.steps)
    }
}
