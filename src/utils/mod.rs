pub mod cancel;
pub mod duration_fetch;
pub mod duration_graph;
pub mod graph_builder;
