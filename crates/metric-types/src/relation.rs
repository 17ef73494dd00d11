//! Relations: the mapping from object id to object value.
//!
//! Ids in a relation are dense, `0..len()`.

use std::sync::Arc;

use crate::ids::ObjectId;

fn object_at(index: usize) -> ObjectId {
    ObjectId::from(index)
}

/// Read access to a collection of objects addressed by `ObjectId`.
pub trait Relation {
    type Object;

    /// Look up the value of `id`.
    fn get(&self, id: ObjectId) -> Option<&Self::Object>;

    /// Number of objects.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All ids, in ascending order.
    fn ids(&self) -> std::iter::Map<std::ops::Range<usize>, fn(usize) -> ObjectId> {
        (0..self.len()).map(object_at as fn(usize) -> ObjectId)
    }
}

impl<R: Relation + ?Sized> Relation for &R {
    type Object = R::Object;

    fn get(&self, id: ObjectId) -> Option<&Self::Object> {
        (**self).get(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<R: Relation + ?Sized> Relation for Arc<R> {
    type Object = R::Object;

    fn get(&self, id: ObjectId) -> Option<&Self::Object> {
        (**self).get(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// In-memory relation backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct VecRelation<O> {
    objects: Vec<O>,
}

impl<O> VecRelation<O> {
    /// Wrap `objects`; object `i` gets id `i`.
    ///
    /// Ids are `u32`, so at most `u32::MAX + 1` objects are addressable;
    /// looking up ids beyond that panics in `ObjectId::from`.
    pub fn new(objects: Vec<O>) -> Self {
        Self { objects }
    }

    /// Append an object, returning its id.
    pub fn push(&mut self, object: O) -> ObjectId {
        self.objects.push(object);
        ObjectId::from(self.objects.len() - 1)
    }

    pub fn objects(&self) -> &[O] {
        &self.objects
    }
}

impl<O> From<Vec<O>> for VecRelation<O> {
    fn from(objects: Vec<O>) -> Self {
        Self::new(objects)
    }
}

impl<O> Relation for VecRelation<O> {
    type Object = O;

    fn get(&self, id: ObjectId) -> Option<&O> {
        self.objects.get(id.index())
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}
