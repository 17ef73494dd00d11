//! Node entries.
//!
//! An entry either points at a data object (leaf entry) or at a child
//! subtree (directory entry). Every entry records its distance to the
//! routing object of the node holding it; that field is the only part of
//! an entry that changes after creation, and it is rewritten on every split.

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, ObjectId};

/// A single slot of a tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    /// Data object stored in a leaf
    Leaf {
        object: ObjectId,
        parent_distance: f64,
    },
    /// Child subtree with its routing object and covering radius
    Directory {
        routing_object: ObjectId,
        parent_distance: f64,
        covering_radius: f64,
        child: NodeId,
    },
}

impl Entry {
    pub fn leaf(object: ObjectId, parent_distance: f64) -> Self {
        Entry::Leaf {
            object,
            parent_distance,
        }
    }

    pub fn directory(
        routing_object: ObjectId,
        parent_distance: f64,
        covering_radius: f64,
        child: NodeId,
    ) -> Self {
        Entry::Directory {
            routing_object,
            parent_distance,
            covering_radius,
            child,
        }
    }

    /// Object id used for distance computations on this entry.
    pub fn routing_object(&self) -> ObjectId {
        match self {
            Entry::Leaf { object, .. } => *object,
            Entry::Directory { routing_object, .. } => *routing_object,
        }
    }

    /// Covering radius of the subtree, 0 for data objects.
    pub fn covering_radius(&self) -> f64 {
        match self {
            Entry::Leaf { .. } => 0.0,
            Entry::Directory {
                covering_radius, ..
            } => *covering_radius,
        }
    }

    pub fn parent_distance(&self) -> f64 {
        match self {
            Entry::Leaf {
                parent_distance, ..
            }
            | Entry::Directory {
                parent_distance, ..
            } => *parent_distance,
        }
    }

    pub fn set_parent_distance(&mut self, distance: f64) {
        match self {
            Entry::Leaf {
                parent_distance, ..
            }
            | Entry::Directory {
                parent_distance, ..
            } => *parent_distance = distance,
        }
    }

    /// Child page of a directory entry.
    pub fn child(&self) -> Option<NodeId> {
        match self {
            Entry::Leaf { .. } => None,
            Entry::Directory { child, .. } => Some(*child),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Entry::Leaf { .. })
    }
}
