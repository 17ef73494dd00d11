//! The M-tree.
//!
//! Nodes live in a `PageStore` and reference each other only by `NodeId`.
//! Every entry stores its distance to the routing object of the node that
//! holds it; entries of the root store 0. Directory entries additionally
//! store a covering radius bounding the distance from their routing object
//! to every object below them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use metric_storage::{CachedPageStore, MemoryPageStore, PageStore};
use metric_types::{
    Distance, DistanceKind, Entry, MetricError, Node, NodeId, NodeKind, ObjectId, Relation,
    TreeSettings,
};
use tracing::{debug, info};

use crate::error::TreeError;
use crate::split::{strategy_from_settings, SplitStrategy};

/// Slack allowed when comparing stored and recomputed distances.
const TOLERANCE: f64 = 1e-9;

/// Tree statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Objects inserted
    pub objects: usize,
    /// Pages in use
    pub nodes: usize,
    /// Levels, 1 for a tree that is a single leaf
    pub height: usize,
    /// Distance evaluations by inserts, splits and searches
    pub distance_computations: u64,
}

/// One level of an insertion path, root first.
struct PathStep {
    node: Node,
    /// Index of the entry pointing at this node in its parent
    parent_index: Option<usize>,
}

/// Metric tree over the objects of a relation.
pub struct MTree<R, D, S> {
    relation: R,
    distance: D,
    store: S,
    settings: TreeSettings,
    splitter: Box<dyn SplitStrategy>,
    root: NodeId,
    height: usize,
    size: usize,
    nodes: usize,
    distance_computations: AtomicU64,
}

impl<R, D> MTree<R, D, CachedPageStore<MemoryPageStore>>
where
    R: Relation,
    D: Distance<R::Object>,
{
    /// Tree on an in-memory page arena behind an LRU cache of
    /// `settings.page_cache_size` pages.
    pub fn in_memory(relation: R, distance: D, settings: TreeSettings) -> Result<Self, TreeError> {
        settings.validate()?;
        let store = CachedPageStore::new(MemoryPageStore::new(), settings.page_cache_size);
        Self::new(relation, distance, store, settings)
    }
}

impl<R, D, S> MTree<R, D, S>
where
    R: Relation,
    D: Distance<R::Object>,
    S: PageStore,
{
    /// Create an empty tree, writing its root leaf to `store`.
    pub fn new(relation: R, distance: D, store: S, settings: TreeSettings) -> Result<Self, TreeError> {
        settings.validate()?;
        if distance.is_squared() {
            return Err(MetricError::InvalidInput(format!(
                "{:?} does not satisfy the triangle inequality",
                distance.kind()
            ))
            .into());
        }

        let mut root = Node::new_leaf();
        let root_id = store.write_node(&mut root)?;
        let splitter = strategy_from_settings(&settings.split);
        info!(
            leaf_capacity = settings.leaf_capacity,
            directory_capacity = settings.directory_capacity,
            split = splitter.name(),
            root = %root_id,
            "Created metric tree"
        );

        Ok(Self {
            relation,
            distance,
            store,
            settings,
            splitter,
            root: root_id,
            height: 1,
            size: 0,
            nodes: 1,
            distance_computations: AtomicU64::new(0),
        })
    }

    pub fn relation(&self) -> &R {
        &self.relation
    }

    pub fn distance(&self) -> &D {
        &self.distance
    }

    pub fn distance_kind(&self) -> DistanceKind {
        self.distance.kind()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of inserted objects.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            objects: self.size,
            nodes: self.nodes,
            height: self.height,
            distance_computations: self.distance_computations.load(Ordering::Relaxed),
        }
    }

    /// Look up an object of the relation.
    pub(crate) fn object(&self, id: ObjectId) -> Result<&R::Object, TreeError> {
        self.relation.get(id).ok_or(TreeError::UnknownObject(id))
    }

    /// Counted distance evaluation.
    pub(crate) fn measure(&self, a: &R::Object, b: &R::Object) -> f64 {
        self.distance_computations.fetch_add(1, Ordering::Relaxed);
        self.distance.distance(a, b)
    }

    pub(crate) fn read_node(&self, page: NodeId) -> Result<Node, metric_storage::StorageError> {
        self.store.read_node(page)
    }

    fn capacity(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Leaf => self.settings.leaf_capacity,
            NodeKind::Directory => self.settings.directory_capacity,
        }
    }

    /// Insert one object of the relation.
    pub fn insert(&mut self, id: ObjectId) -> Result<(), TreeError> {
        let (path, parent_distance) = {
            let object = self.object(id)?;
            self.choose_path(object)?
        };
        self.adjust(path, Entry::leaf(id, parent_distance))?;
        self.size += 1;

        if self.settings.integrity_checks {
            self.integrity_check()?;
        }
        Ok(())
    }

    /// Insert several objects, returning how many were inserted.
    pub fn insert_all<I>(&mut self, ids: I) -> Result<usize, TreeError>
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let mut count = 0;
        for id in ids {
            self.insert(id)?;
            count += 1;
        }
        info!(
            inserted = count,
            objects = self.size,
            height = self.height,
            nodes = self.nodes,
            "Bulk insert complete"
        );
        Ok(count)
    }

    /// Descend from the root to the leaf that should receive `object`.
    ///
    /// Returns the path and the distance from `object` to the routing
    /// object of that leaf (0 if the leaf is the root).
    fn choose_path(&self, object: &R::Object) -> Result<(Vec<PathStep>, f64), TreeError> {
        let mut path = Vec::with_capacity(self.height);
        let mut node = self.store.read_node(self.root)?;
        let mut parent_index = None;
        let mut parent_distance = 0.0;

        while !node.is_leaf() {
            let (index, distance) = self.choose_subtree(&node, object)?;
            let child = node.entry(index).child().ok_or_else(|| {
                TreeError::Integrity(format!("directory entry {} has no child", index))
            })?;
            path.push(PathStep { node, parent_index });
            node = self.store.read_node(child)?;
            parent_index = Some(index);
            parent_distance = distance;
        }
        path.push(PathStep { node, parent_index });
        Ok((path, parent_distance))
    }

    /// Pick the entry of a directory node to descend into.
    ///
    /// Entries whose covering radius already contains the object win, the
    /// closest first. Otherwise the entry needing the smallest radius
    /// enlargement is taken.
    fn choose_subtree(&self, node: &Node, object: &R::Object) -> Result<(usize, f64), TreeError> {
        let mut covered: Option<(usize, f64)> = None;
        let mut enlarged: Option<(usize, f64, f64)> = None;

        for (i, entry) in node.entries().iter().enumerate() {
            let routing = self.object(entry.routing_object())?;
            let d = self.measure(object, routing);
            let radius = entry.covering_radius();
            if d <= radius {
                if covered.map_or(true, |(_, best)| d < best) {
                    covered = Some((i, d));
                }
            } else if covered.is_none() {
                let enlargement = d - radius;
                if enlarged.map_or(true, |(_, best, _)| enlargement < best) {
                    enlarged = Some((i, enlargement, d));
                }
            }
        }

        covered
            .or(enlarged.map(|(i, _, d)| (i, d)))
            .ok_or_else(|| TreeError::Integrity("empty directory node".to_string()))
    }

    /// Add `entry` to the leaf at the end of `path` and fix the tree
    /// bottom-up: split overflowing nodes, update parent entries and
    /// covering radii, and grow a new root if the old one split.
    fn adjust(&mut self, mut path: Vec<PathStep>, entry: Entry) -> Result<(), TreeError> {
        let mut step = path
            .pop()
            .ok_or_else(|| TreeError::Integrity("empty insertion path".to_string()))?;
        step.node.add_entry(entry);

        loop {
            if step.node.len() > self.capacity(step.node.kind) {
                let (mut first, mut second) = self.split_node(step.node)?;
                let Some(mut parent) = path.pop() else {
                    return self.grow_root(first, second);
                };

                // Parent distances are relative to the parent's own routing
                // object, which the root does not have.
                if let Some(routing) = routing_object(&path, &parent) {
                    let center = self.object(routing)?;
                    let d1 = self.measure(center, self.object(first.routing_object())?);
                    let d2 = self.measure(center, self.object(second.routing_object())?);
                    first.set_parent_distance(d1);
                    second.set_parent_distance(d2);
                }

                let index = step.parent_index.ok_or_else(|| {
                    TreeError::Integrity("split node has no parent entry".to_string())
                })?;
                parent.node.replace_entry(index, first);
                parent.node.add_entry(second);
                step = parent;
            } else {
                let page = self.store.write_node(&mut step.node)?;
                let Some(mut parent) = path.pop() else {
                    return Ok(());
                };

                let index = step.parent_index.ok_or_else(|| {
                    TreeError::Integrity("child node has no parent entry".to_string())
                })?;
                let old = parent.node.entry(index);
                let updated = Entry::directory(
                    old.routing_object(),
                    old.parent_distance(),
                    step.node.covering_radius(),
                    page,
                );
                parent.node.replace_entry(index, updated);
                step = parent;
            }
        }
    }

    /// Split an overflowing node into two pages.
    ///
    /// The first half keeps the original page. Returns the two directory
    /// entries describing the halves, with parent distance 0.
    fn split_node(&mut self, node: Node) -> Result<(Entry, Entry), TreeError> {
        let page = node.page_id;
        let is_leaf = node.is_leaf();
        let assignment = {
            let objects = resolve(&self.relation, node.entries())?;
            let metric = &self.distance;
            let counter = &self.distance_computations;
            let distance = |a: ObjectId, b: ObjectId| {
                counter.fetch_add(1, Ordering::Relaxed);
                metric.distance(objects[&a], objects[&b])
            };
            self.splitter.split(node.entries(), is_leaf, &distance)
        };

        let (id1, id2) = (assignment.id1, assignment.id2);
        let (r1, r2) = (
            assignment.first_covering_radius(),
            assignment.second_covering_radius(),
        );
        let (mut left, mut right) = assignment.into_nodes();
        left.page_id = page;
        let left_page = self.store.write_node(&mut left)?;
        let right_page = self.store.write_node(&mut right)?;
        self.nodes += 1;

        debug!(
            leaf = is_leaf,
            left = %left_page,
            right = %right_page,
            left_size = left.len(),
            right_size = right.len(),
            left_radius = r1,
            right_radius = r2,
            "Split node"
        );

        Ok((
            Entry::directory(id1, 0.0, r1, left_page),
            Entry::directory(id2, 0.0, r2, right_page),
        ))
    }

    fn grow_root(&mut self, first: Entry, second: Entry) -> Result<(), TreeError> {
        let mut root = Node::with_entries(NodeKind::Directory, vec![first, second]);
        let page = self.store.write_node(&mut root)?;
        self.root = page;
        self.height += 1;
        self.nodes += 1;
        info!(root = %page, height = self.height, "Root split, tree grew");
        Ok(())
    }

    /// Verify the structural invariants of the whole tree.
    ///
    /// Checks stored parent distances, that every object below a directory
    /// entry lies within its covering radius, node capacities, that all
    /// leaves sit at the same depth, and the object count.
    pub fn integrity_check(&self) -> Result<(), TreeError> {
        let mut leaf_depth = None;
        let objects = self.check_node(self.root, None, 1, &mut leaf_depth)?;
        if objects.len() != self.size {
            return Err(TreeError::Integrity(format!(
                "tree holds {} objects, {} were inserted",
                objects.len(),
                self.size
            )));
        }
        if let Some(depth) = leaf_depth {
            if depth != self.height {
                return Err(TreeError::Integrity(format!(
                    "leaves at depth {}, height is {}",
                    depth, self.height
                )));
            }
        }
        debug!(objects = objects.len(), height = self.height, "Integrity check passed");
        Ok(())
    }

    fn check_node(
        &self,
        page: NodeId,
        routing: Option<ObjectId>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> Result<Vec<ObjectId>, TreeError> {
        let node = self.store.read_node(page)?;
        if node.len() > self.capacity(node.kind) {
            return Err(TreeError::Integrity(format!(
                "{} holds {} entries, capacity {}",
                page,
                node.len(),
                self.capacity(node.kind)
            )));
        }
        if routing.is_some() && node.is_empty() {
            return Err(TreeError::Integrity(format!("{} is empty", page)));
        }

        let center = routing.map(|id| self.object(id)).transpose()?;
        let mut objects = Vec::new();
        for entry in node.entries() {
            let object = self.object(entry.routing_object())?;
            let expected = center.map_or(0.0, |c| self.distance.distance(c, object));
            if !within(entry.parent_distance(), expected) {
                return Err(TreeError::Integrity(format!(
                    "{} entry {} stores parent distance {}, actual {}",
                    page,
                    entry.routing_object(),
                    entry.parent_distance(),
                    expected
                )));
            }

            match entry.child() {
                None => objects.push(entry.routing_object()),
                Some(child) => {
                    let below =
                        self.check_node(child, Some(entry.routing_object()), depth + 1, leaf_depth)?;
                    for id in &below {
                        let d = self.distance.distance(object, self.object(*id)?);
                        if d > entry.covering_radius() + TOLERANCE * (1.0 + d) {
                            return Err(TreeError::Integrity(format!(
                                "{} lies at {} from {}, covering radius {}",
                                id,
                                d,
                                entry.routing_object(),
                                entry.covering_radius()
                            )));
                        }
                    }
                    objects.extend(below);
                }
            }
        }

        if node.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(TreeError::Integrity(format!(
                        "leaf {} at depth {}, others at {}",
                        page, depth, expected
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(objects)
    }
}

/// Routing object of the node in `step`, given its ancestors.
fn routing_object(ancestors: &[PathStep], step: &PathStep) -> Option<ObjectId> {
    let parent = ancestors.last()?;
    let index = step.parent_index?;
    Some(parent.node.entry(index).routing_object())
}

/// Resolve the routing objects of `entries` up front, so a split never
/// meets a missing object halfway through.
fn resolve<'r, R: Relation>(
    relation: &'r R,
    entries: &[Entry],
) -> Result<HashMap<ObjectId, &'r R::Object>, TreeError> {
    entries
        .iter()
        .map(|e| {
            let id = e.routing_object();
            relation
                .get(id)
                .map(|o| (id, o))
                .ok_or(TreeError::UnknownObject(id))
        })
        .collect()
}

fn within(stored: f64, expected: f64) -> bool {
    (stored - expected).abs() <= TOLERANCE * (1.0 + expected.abs())
}
