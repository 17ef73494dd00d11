//! Tree nodes.
//!
//! A node is an ordered collection of entries sharing one parent link.
//! Leaf nodes hold only leaf entries and directory nodes only directory
//! entries; mixing them is a programming error and panics.

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::ids::NodeId;

/// Node level kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Leaf,
    Directory,
}

/// A page of the metric tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Page id, `None` until the node is first written
    pub page_id: Option<NodeId>,
    pub kind: NodeKind,
    entries: Vec<Entry>,
}

impl Node {
    pub fn new_leaf() -> Self {
        Self {
            page_id: None,
            kind: NodeKind::Leaf,
            entries: Vec::new(),
        }
    }

    pub fn new_directory() -> Self {
        Self {
            page_id: None,
            kind: NodeKind::Directory,
            entries: Vec::new(),
        }
    }

    /// Build a node of the given kind from entries.
    ///
    /// # Panics
    /// Panics if an entry does not match the node kind.
    pub fn with_entries(kind: NodeKind, entries: Vec<Entry>) -> Self {
        let mut node = Self {
            page_id: None,
            kind,
            entries: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            node.add_entry(entry);
        }
        node
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }

    /// Append an entry.
    ///
    /// # Panics
    /// Panics if the entry kind does not match the node kind.
    pub fn add_entry(&mut self, entry: Entry) {
        assert_eq!(
            entry.is_leaf(),
            self.is_leaf(),
            "entry kind does not match {:?} node",
            self.kind
        );
        self.entries.push(entry);
    }

    /// Replace an existing entry in place.
    pub fn replace_entry(&mut self, index: usize, entry: Entry) {
        assert_eq!(
            entry.is_leaf(),
            self.is_leaf(),
            "entry kind does not match {:?} node",
            self.kind
        );
        self.entries[index] = entry;
    }

    /// Covering radius implied by the current entries, relative to the
    /// routing object the parent distances were measured against.
    pub fn covering_radius(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.parent_distance() + e.covering_radius())
            .fold(0.0, f64::max)
    }

    /// Consume the node, yielding its entries.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}
