//! The execution graph (spec §4.7): typed nodes wired by labeled
//! channels, owned by an [`ExecutionTree`].

pub mod node;
pub mod result_node;
pub mod tree;

pub use node::{ErasedNode, Node, NodeProgress, OutputPublishers};
pub use result_node::ResultNode;
pub use tree::ExecutionTree;
