pub mod conflict_graph;

pub use conflict_graph::ConflictGraph;
