pub mod exhaustive;
pub mod graph;
pub mod grid;
pub mod map_file;
pub mod pathfinding;
pub mod route;
pub mod solvers;
