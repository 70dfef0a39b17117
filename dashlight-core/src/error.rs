//! Error types for document tree writes

use crate::dom::NodeId;

/// A structural write against the document tree could not be applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} does not belong to this document")]
    UnknownNode(NodeId),

    #[error("node {0} is detached from the tree")]
    Detached(NodeId),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("node {0} cannot hold children")]
    NotAContainer(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} does not hold character data")]
    NotCharacterData(NodeId),

    #[error("node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}
