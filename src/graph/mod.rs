mod builder;
mod graph;

pub use builder::{forward_fill, AdjacencyBuilder, AdjacencyRow, FilledRow, IdentifierKey, RegionFilter, Symmetry};
pub use graph::AdjacencyGraph;
