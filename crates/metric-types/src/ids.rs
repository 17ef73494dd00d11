//! Identifier newtypes.
//!
//! Objects and pages are addressed by small integers. Nodes never hold
//! references to each other, only `NodeId`s resolved through a page store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an object in a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Position of this object in a dense relation.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Relations hold at most `u32::MAX + 1` objects.
///
/// # Panics
/// Panics if `index` does not fit in a `u32`.
impl From<usize> for ObjectId {
    fn from(index: usize) -> Self {
        Self(u32::try_from(index).expect("object index exceeds u32"))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a page holding one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}
