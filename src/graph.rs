use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::grid::CostGrid;
use crate::pathfinding::{Cost, Path, Pathfinder, Pos};

pub type VertexId = usize;

/// Vertex of the route start. Targets are vertices `1..=num_targets`.
pub const START: VertexId = 0;

/// Shortest paths between every pair of points of interest (the start and
/// each target), computed with one search per origin.
#[derive(Clone)]
pub struct Graph {
    // paths[from][to], None when `to` can't be reached from `from`.
    paths: Vec<Vec<Option<Path>>>,
    pub points: Vec<Pos>,
}

impl Graph {
    /// `targets` are expected to be distinct. A target may sit on `start`.
    pub fn new<G: CostGrid + ?Sized>(grid: &G, start: Pos, targets: &[Pos]) -> Self {
        let mut points = Vec::with_capacity(targets.len() + 1);
        points.push(start);
        points.extend_from_slice(targets);

        let pathfinder = Pathfinder::new(grid);
        let mut paths = vec![vec![None; points.len()]; points.len()];
        for (from, &origin) in points.iter().enumerate() {
            let others = points.iter().enumerate()
                .filter(|&(to, _)| to != from)
                .map(|(_, &pos)| pos);
            let found = pathfinder.paths(origin, others)
                .map(|path| (path.goal(), path))
                .collect::<FxHashMap<_, _>>();
            debug!("{} of {} points reachable from {:?}",
                   found.len(), points.len() - 1, origin);
            for (to, pos) in points.iter().enumerate() {
                if to != from {
                    paths[from][to] = found.get(pos).cloned();
                }
                // For from == to (diagonal), leave None.
            }
        }

        info!("Graph created: {} vertices", points.len());
        Graph { paths, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn num_targets(&self) -> usize {
        self.points.len() - 1
    }

    pub fn targets(&self) -> impl Iterator<Item=VertexId> {
        1..self.points.len()
    }

    pub fn path(&self, from: VertexId, to: VertexId) -> Option<&Path> {
        self.paths[from][to].as_ref()
    }

    pub fn cost(&self, from: VertexId, to: VertexId) -> Option<Cost> {
        self.path(from, to).map(|path| path.cost)
    }

    pub fn pos(&self, vertex: VertexId) -> Pos {
        self.points[vertex]
    }

    /// First vertex at `pos`. The start wins if a target shares its position.
    pub fn vertex_id(&self, pos: &Pos) -> Option<VertexId> {
        self.points.iter().position(|p| p == pos)
    }
}
