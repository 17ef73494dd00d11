//! Result of a node split.

use metric_types::{Entry, Node, NodeKind, ObjectId};

/// An entry together with its distance to the routing object of the group
/// it was assigned to, and its position in the node that was split.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceEntry {
    pub entry: Entry,
    pub distance: f64,
    pub index: usize,
}

impl DistanceEntry {
    pub fn new(entry: Entry, distance: f64, index: usize) -> Self {
        Self {
            entry,
            distance,
            index,
        }
    }
}

/// Two routing objects and the entries assigned to each.
///
/// Each routing object's own entry is the first element of its group, at
/// distance 0. Every entry of the split node is in exactly one group and the
/// group sizes differ by at most one.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub id1: ObjectId,
    pub id2: ObjectId,
    first: Vec<DistanceEntry>,
    second: Vec<DistanceEntry>,
    is_leaf: bool,
}

impl Assignment {
    pub(crate) fn new(
        id1: ObjectId,
        id2: ObjectId,
        first: Vec<DistanceEntry>,
        second: Vec<DistanceEntry>,
        is_leaf: bool,
    ) -> Self {
        Self {
            id1,
            id2,
            first,
            second,
            is_leaf,
        }
    }

    pub fn first(&self) -> &[DistanceEntry] {
        &self.first
    }

    pub fn second(&self) -> &[DistanceEntry] {
        &self.second
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn first_covering_radius(&self) -> f64 {
        covering_radius(&self.first, self.is_leaf)
    }

    pub fn second_covering_radius(&self) -> f64 {
        covering_radius(&self.second, self.is_leaf)
    }

    /// Build the two replacement nodes, with every entry's parent distance
    /// rewritten to its distance from the new routing object.
    pub fn into_nodes(self) -> (Node, Node) {
        let kind = if self.is_leaf {
            NodeKind::Leaf
        } else {
            NodeKind::Directory
        };
        (to_node(kind, self.first), to_node(kind, self.second))
    }
}

fn covering_radius(group: &[DistanceEntry], is_leaf: bool) -> f64 {
    group
        .iter()
        .map(|de| {
            if is_leaf {
                de.distance
            } else {
                de.distance + de.entry.covering_radius()
            }
        })
        .fold(0.0, f64::max)
}

fn to_node(kind: NodeKind, group: Vec<DistanceEntry>) -> Node {
    let entries = group
        .into_iter()
        .map(|mut de| {
            de.entry.set_parent_distance(de.distance);
            de.entry
        })
        .collect();
    Node::with_entries(kind, entries)
}
