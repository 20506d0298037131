use arrayvec::ArrayVec;
use itertools::Itertools;
use std::fmt;

use crate::pathfinding::{Cost, Pos};

pub type Neighbors = ArrayVec<Pos, 4>;

// Up, down, right, left. No diagonals.
const DELTAS: [(i32, i32); 4] = [(0, -1), (0, 1), (1, 0), (-1, 0)];

/// Read-only view of a weighted map, as consumed by the pathfinder and the
/// planners.
pub trait CostGrid {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Whether `pos` can't be entered. Only called on in-bounds positions.
    fn is_blocked(&self, pos: &Pos) -> bool;

    /// Cost paid to step onto `pos`. Only called on in-bounds, open positions.
    fn cost_at(&self, pos: &Pos) -> Cost;

    fn in_bounds(&self, pos: &Pos) -> bool {
        pos.x >= 0 && pos.y >= 0
            && (pos.x as usize) < self.width()
            && (pos.y as usize) < self.height()
    }

    /// In-bounds, open positions one unit step away from `pos`.
    fn neighbors(&self, pos: Pos) -> Neighbors {
        DELTAS.iter()
            .map(|&(dx, dy)| Pos { x: pos.x + dx, y: pos.y + dy })
            .filter(|n| self.in_bounds(n) && !self.is_blocked(n))
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Cell {
    Wall,
    Open(Cost),
}

/// Row-major grid of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    // cells[y * width + x]
    cells: Vec<Cell>,
}

impl Grid {
    /// Grid where every cell is open with the same cost.
    pub fn open(width: usize, height: usize, cost: Cost) -> Self {
        Grid { width, height, cells: vec![Cell::Open(cost); width * height] }
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        assert!(rows.iter().all(|row| row.len() == width),
                "Grid rows must all have the same width ({width})");
        Grid { width, height, cells: rows.into_iter().flatten().collect() }
    }

    pub fn cell(&self, pos: &Pos) -> Cell {
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: &Pos, cell: Cell) {
        assert!(self.in_bounds(pos), "Setting out of bounds cell {pos:?}");
        let idx = self.index(pos);
        self.cells[idx] = cell;
    }

    pub fn set_wall(&mut self, pos: &Pos) {
        self.set(pos, Cell::Wall);
    }

    #[inline]
    fn index(&self, pos: &Pos) -> usize {
        pos.y as usize * self.width + pos.x as usize
    }
}

impl CostGrid for Grid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_blocked(&self, pos: &Pos) -> bool {
        self.cell(pos) == Cell::Wall
    }

    fn cost_at(&self, pos: &Pos) -> Cost {
        match self.cell(pos) {
            Cell::Open(cost) => cost,
            Cell::Wall => Cost::MAX,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows = self.cells.chunks(self.width.max(1)).map(|row| {
            row.iter().map(|cell| match cell {
                Cell::Wall => '#',
                Cell::Open(cost) if *cost < 10 => {
                    char::from_digit(*cost, 10).unwrap_or('?')
                },
                Cell::Open(_) => '+',
            }).collect::<String>()
        });
        write!(f, "{}", rows.join("\n"))
    }
}
