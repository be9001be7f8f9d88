//! Core graph data structures

mod edge;
mod knowledge;
mod node;

pub use edge::{Edge, Relationship};
pub use knowledge::{GraphMetadata, KnowledgeGraph};
pub use node::{Node, NodeId, NodeType, Properties, PropertyValue, UNKNOWN_KEY};
