// Text map format:
//
//   energy: 40
//   goal: 3
//   // comment
//   S1119
//   1#1T1
//   11#11
//   T1119
//
// Header lines come before the grid, in any order, all optional. In the grid,
// digits are cell costs, '#' is a wall, 'S' the start and 'T' a target
// ('S', 'T' and '.' cost 1 to enter).

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::path::Path as FilePath;
use std::str::FromStr;
use thiserror::Error;

use crate::grid::{Cell, CostGrid, Grid};
use crate::pathfinding::{Cost, Pos};

#[derive(Error, Debug)]
pub enum MapError {
    #[error("failed reading the map file")]
    ReadError(#[from] std::io::Error),
    #[error("line {line}: unknown header '{key}'")]
    UnknownHeader { line: usize, key: String },
    #[error("line {line}: value for '{key}' is too large")]
    HeaderOverflow { line: usize, key: String },
    #[error("line {line}, column {column}: unexpected character '{found}'")]
    UnexpectedChar { line: usize, column: usize, found: char },
    #[error("line {line}: row is {found} cells wide, expected {expected}")]
    RaggedRow { line: usize, found: usize, expected: usize },
    #[error("line {line}: second start, the first one is at {first:?}")]
    DuplicateStart { line: usize, first: Pos },
    #[error("map has no start ('S')")]
    MissingStart,
    #[error("map has no rows")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapFile {
    pub grid: Grid,
    pub start: Pos,
    /// In reading order, top to bottom then left to right.
    pub targets: Vec<Pos>,
    pub energy: Option<Cost>,
    /// How many targets must be collected.
    pub goal: Option<usize>,
}

impl MapFile {
    pub fn load<P: AsRef<FilePath>>(path: P) -> Result<Self, MapError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let map: MapFile = data.parse()?;
        debug!("Loaded {}x{} map with {} targets from {}",
               map.grid.width(), map.grid.height(), map.targets.len(),
               path.as_ref().display());
        Ok(map)
    }
}

fn parse_cell(c: char) -> Option<Cell> {
    match c {
        '#' => Some(Cell::Wall),
        'S' | 'T' | '.' => Some(Cell::Open(1)),
        _ => c.to_digit(10).map(Cell::Open),
    }
}

impl FromStr for MapFile {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, MapError> {
        lazy_static! {
            static ref HEADER: Regex = Regex::new(r"^(\w+)\s*:\s*(\d+)$").unwrap();
        }
        let mut energy = None;
        let mut goal = None;
        let mut start: Option<Pos> = None;
        let mut targets = Vec::new();
        let mut rows: Vec<Vec<Cell>> = Vec::new();

        for (idx, raw) in s.lines().enumerate() {
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with("//") {
                continue;
            }
            if rows.is_empty() {
                if let Some(caps) = HEADER.captures(text) {
                    let key = &caps[1];
                    let value = &caps[2];
                    let overflow = |_| MapError::HeaderOverflow { line, key: key.to_string() };
                    match key {
                        "energy" => energy = Some(value.parse().map_err(overflow)?),
                        "goal" => goal = Some(value.parse().map_err(overflow)?),
                        _ => return Err(MapError::UnknownHeader { line, key: key.to_string() }),
                    }
                    continue;
                }
            }

            let y = rows.len() as i32;
            let mut row = Vec::with_capacity(text.len());
            for (x, c) in text.chars().enumerate() {
                let cell = parse_cell(c).ok_or(MapError::UnexpectedChar {
                    line, column: x + 1, found: c })?;
                let pos = Pos::new(x as i32, y);
                match c {
                    'S' => match start {
                        Some(first) => return Err(MapError::DuplicateStart { line, first }),
                        None => start = Some(pos),
                    },
                    'T' => targets.push(pos),
                    _ => {},
                }
                row.push(cell);
            }
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(MapError::RaggedRow {
                        line, found: row.len(), expected: first.len() });
                }
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(MapError::Empty);
        }
        let start = start.ok_or(MapError::MissingStart)?;
        Ok(MapFile { grid: Grid::from_rows(rows), start, targets, energy, goal })
    }
}
