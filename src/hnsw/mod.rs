//! Hierarchical Navigable Small World graph engine.
//!
//! See the module-level docs on [`graph::Graph`] for the algorithm; this
//! file only wires the submodules together.

pub mod graph;
pub mod node;
pub mod params;

pub(crate) mod ordered_float;

pub use graph::Graph;
pub use node::GraphNode;
pub use params::HnswParams;
