use std::collections::HashSet;
use std::hash::Hash;

use crate::convert::{Converter, ConverterIeee, ConverterNoOp};
use crate::spatial::math;
use crate::tree::types::PhTree;

/// A multi-map built as core-of-buckets: the underlying tree maps each key
/// to a hash set of values, and the wrapper keeps the total value count.
///
/// Values must be `Eq + Hash`. A (key, value) pair is stored at most once.
pub struct PhTreeMultiMap<T: Eq + Hash, const DIM: usize, C: Converter<DIM> = ConverterNoOp> {
    tree: PhTree<HashSet<T>, DIM, C>,
    num_values: usize,
}

/// Multi-map over `f64` point keys.
pub type PhTreeMultiMapD<T, const DIM: usize> = PhTreeMultiMap<T, DIM, ConverterIeee>;

impl<T: Eq + Hash, const DIM: usize, C: Converter<DIM> + Default> PhTreeMultiMap<T, DIM, C> {
    pub fn new() -> Self {
        Self::with_converter(C::default())
    }
}

impl<T: Eq + Hash, const DIM: usize, C: Converter<DIM> + Default> Default
    for PhTreeMultiMap<T, DIM, C>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash, const DIM: usize, C: Converter<DIM>> PhTreeMultiMap<T, DIM, C> {
    pub fn with_converter(converter: C) -> Self {
        Self {
            tree: PhTree::with_converter(converter),
            num_values: 0,
        }
    }

    /// Adds the value to the key's bucket. Returns with true unless the
    /// (key, value) pair was already present.
    pub fn insert(&mut self, key: &C::KeyExternal, value: T) -> bool {
        let bucket = self.tree.get_or_insert_default(key);
        let added = bucket.insert(value);
        self.num_values += added as usize;
        added
    }

    /// Removes one value from the key's bucket; an emptied bucket is erased
    /// from the underlying tree. Returns with the number of removed values.
    pub fn remove(&mut self, key: &C::KeyExternal, value: &T) -> usize {
        let Some(bucket) = self.tree.get_mut(key) else {
            return 0;
        };
        if !bucket.remove(value) {
            return 0;
        }
        self.num_values -= 1;
        let emptied = bucket.is_empty();
        if emptied {
            self.tree.erase(key);
        }
        1
    }

    /// Removes the whole bucket of the key. Returns with the number of
    /// removed values.
    pub fn erase_key(&mut self, key: &C::KeyExternal) -> usize {
        let removed = self.tree.get(key).map_or(0, HashSet::len);
        if removed > 0 {
            self.tree.erase(key);
            self.num_values -= removed;
        }
        removed
    }

    pub fn contains(&self, key: &C::KeyExternal, value: &T) -> bool {
        self.tree
            .get(key)
            .map_or(false, |bucket| bucket.contains(value))
    }

    /// Number of values stored under the key.
    pub fn count(&self, key: &C::KeyExternal) -> usize {
        self.tree.get(key).map_or(0, HashSet::len)
    }

    /// Total number of stored values across all keys.
    pub fn len(&self) -> usize {
        self.num_values
    }

    pub fn is_empty(&self) -> bool {
        self.num_values == 0
    }

    /// Calls the callback for every stored (key, value) pair, in z-order of
    /// the keys; bucket order is unspecified.
    pub fn for_each(&self, mut callback: impl FnMut(&C::KeyExternal, &T)) {
        self.tree.for_each(|key, bucket| {
            for value in bucket {
                callback(&key, value);
            }
        });
    }

    /// Calls the callback for every stored pair whose key matches the query
    /// window.
    pub fn for_each_in(
        &self,
        query: &C::QueryExternal,
        mut callback: impl FnMut(&C::KeyExternal, &T),
    ) {
        self.tree.for_each_in(query, |key, bucket| {
            for value in bucket {
                callback(&key, value);
            }
        });
    }

    /// Moves one value from the bucket of `old_key` to the bucket of
    /// `new_key`. Returns with 1 if the value was present under `old_key`.
    /// The value is removed from its source even when the destination bucket
    /// already contains an equal value; in that case the duplicate collapses
    /// and the total count shrinks by one.
    pub fn relocate(&mut self, old_key: &C::KeyExternal, new_key: &C::KeyExternal, value: &T) -> usize {
        let old_native = self.tree.converter().pre(old_key);
        let new_native = self.tree.converter().pre(new_key);
        if math::diverging_bits(&old_native, &new_native) == 0 {
            return self.contains(old_key, value) as usize;
        }
        let Some(bucket) = self.tree.get_mut(old_key) else {
            return 0;
        };
        let Some(moved) = bucket.take(value) else {
            return 0;
        };
        let emptied = bucket.is_empty();
        if emptied {
            self.tree.erase(old_key);
        }
        let destination = self.tree.get_or_insert_default(new_key);
        if !destination.insert(moved) {
            self.num_values -= 1;
        }
        1
    }

    /// Structural statistics of the underlying tree.
    pub fn stats(&self) -> crate::tree::debug::TreeStats {
        self.tree.stats()
    }
}
