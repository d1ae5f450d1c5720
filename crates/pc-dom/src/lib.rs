//! PC DOM - Document Object Model
//!
//! Arena-backed DOM tree with selector queries and native event dispatch.
//! This is the substrate the delegated event dispatcher is built on.

mod classlist;
mod document;
mod event;
mod listeners;
mod node;
mod selector;
mod tree;

pub use classlist::DOMTokenList;
pub use document::{Document, Element, WeakElement};
pub use event::{Event, EventInit, EventPhase, FieldValue, Hydration, READ_ONLY_FIELDS};
pub use listeners::{ListenerId, NativeListener};
pub use node::{ElementData, Node, NodeData};
pub use selector::{SelectorError, SelectorList};
pub use tree::DomTree;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),

    #[error("Hierarchy request error")]
    HierarchyRequest,

    #[error("Invalid node type for this operation")]
    InvalidNodeType,

    #[error("Node is not a child of the given parent")]
    NotAChild,

    #[error("Nodes belong to different documents")]
    WrongDocument,

    #[error(transparent)]
    Selector(#[from] SelectorError),
}
