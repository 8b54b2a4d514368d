pub mod debug;
pub(crate) mod entry;
pub mod filter;
pub mod multimap;
pub(crate) mod node;
pub mod query;
pub mod types;

pub use types::{PhTree, PhTreeBoxD, PhTreeD};

use crate::convert::{Converter, PointConverter};
use crate::spatial::distance::DistanceFn;
use crate::spatial::math::{self, MAX_BIT_WIDTH};
use crate::spatial::{PhBox, PhPoint};
use crate::tree::entry::Entry;
use crate::tree::filter::{FilterNoOp, QueryFilter};
use crate::tree::node::{EmplaceStep, Node};
use crate::tree::query::full::IterFull;
use crate::tree::query::knn::IterKnn;
use crate::tree::query::window::IterWindow;
use crate::tree::query::IterFind;

impl<T, const DIM: usize, C: Converter<DIM> + Default> PhTree<T, DIM, C> {
    /// Creates an empty tree with the converter's default instance.
    pub fn new() -> Self {
        Self::with_converter(C::default())
    }
}

impl<T, const DIM: usize, C: Converter<DIM> + Default> Default for PhTree<T, DIM, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const DIM: usize, C: Converter<DIM>> PhTree<T, DIM, C> {
    const DIM_IN_RANGE: () = assert!(
        DIM >= 1 && DIM <= 63,
        "the PH-Tree supports between 1 and 63 dimensions"
    );

    /// Creates an empty tree with an explicit converter instance.
    pub fn with_converter(converter: C) -> Self {
        let () = Self::DIM_IN_RANGE;
        Self {
            num_entries: 0,
            root: Self::fresh_root(),
            converter,
        }
    }

    /// The root entry always holds a node addressing the top-most bit, so
    /// the rest of the code can assume every descent starts at a node.
    fn fresh_root() -> Entry<T, DIM> {
        Entry::new_node([0; DIM], Box::new(Node::new(0, MAX_BIT_WIDTH - 1)))
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    //####################################################################################
    // Insertion
    //####################################################################################

    /// Attempts to insert the value under the given key. The tree is a map:
    /// if the key is already present the stored value is kept and returned
    /// with `false`; otherwise the new value is moved in and returned with
    /// `true`.
    pub fn try_emplace(&mut self, key: &C::KeyExternal, value: T) -> (&mut T, bool) {
        let native = self.converter.pre(key);
        self.emplace_native(native, value)
    }

    /// See [`PhTree::try_emplace`].
    pub fn insert(&mut self, key: &C::KeyExternal, value: T) -> (&mut T, bool) {
        self.try_emplace(key, value)
    }

    /// Returns with the value stored under `key`, inserting a default
    /// constructed one first if the key is absent.
    pub fn get_or_insert_default(&mut self, key: &C::KeyExternal) -> &mut T
    where
        T: Default,
    {
        self.try_emplace(key, T::default()).0
    }

    pub(in crate::tree) fn emplace_native(
        &mut self,
        key: PhPoint<DIM>,
        value: T,
    ) -> (&mut T, bool) {
        let mut pending = value;
        let mut entry = &mut self.root;
        let (leaf, inserted) = loop {
            let Entry::Node { node, .. } = entry else {
                unreachable!("descent only visits node entries")
            };
            match node.emplace(&key, pending) {
                EmplaceStep::Inserted(fresh) => break (fresh, true),
                EmplaceStep::Existing(existing) => break (existing, false),
                EmplaceStep::Descend(child, value) => {
                    entry = child;
                    pending = value;
                }
            }
        };
        self.num_entries += inserted as usize;
        (leaf.value_mut(), inserted)
    }

    //####################################################################################
    // Lookup
    //####################################################################################

    /// Returns with 1 if a value is stored under the key, otherwise 0.
    pub fn count(&self, key: &C::KeyExternal) -> usize {
        let native = self.converter.pre(key);
        self.find_native(&native).is_some() as usize
    }

    pub fn get(&self, key: &C::KeyExternal) -> Option<&T> {
        let native = self.converter.pre(key);
        self.find_native(&native).map(Entry::value)
    }

    pub fn get_mut(&mut self, key: &C::KeyExternal) -> Option<&mut T> {
        let native = self.converter.pre(key);
        self.find_native_mut(&native).map(Entry::value_mut)
    }

    /// Single-entry iterator over the key, empty if the key is absent.
    pub fn find(&self, key: &C::KeyExternal) -> IterFind<'_, T, C, DIM> {
        let native = self.converter.pre(key);
        IterFind::new(self.find_native(&native), &self.converter)
    }

    fn find_native(&self, key: &PhPoint<DIM>) -> Option<&Entry<T, DIM>> {
        let mut entry = &self.root;
        loop {
            match entry {
                Entry::Node { node, .. } => match node.find(key) {
                    Some(child) => entry = child,
                    None => return None,
                },
                Entry::Leaf { .. } => return Some(entry),
            }
        }
    }

    fn find_native_mut(&mut self, key: &PhPoint<DIM>) -> Option<&mut Entry<T, DIM>> {
        let mut entry = &mut self.root;
        while entry.is_node() {
            if entry.node().find(key).is_none() {
                return None;
            }
            let Entry::Node { node, .. } = entry else {
                unreachable!("checked above")
            };
            entry = match node.find_mut(key) {
                Some(child) => child,
                None => return None,
            };
        }
        Some(entry)
    }

    //####################################################################################
    // Removal
    //####################################################################################

    /// Removes the value stored under the key. Returns with the number of
    /// removed values (0 or 1).
    pub fn erase(&mut self, key: &C::KeyExternal) -> usize {
        let native = self.converter.pre(key);
        self.erase_native(&native).is_some() as usize
    }

    pub(in crate::tree) fn erase_native(&mut self, key: &PhPoint<DIM>) -> Option<T> {
        let removed = node::erase_below(&mut self.root, key);
        self.num_entries -= removed.is_some() as usize;
        removed
    }

    /// Removes every entry. The root node persists as structural anchor.
    pub fn clear(&mut self) {
        self.num_entries = 0;
        self.root = Self::fresh_root();
    }

    //####################################################################################
    // Relocation
    //####################################################################################

    /// Moves the value stored under `old_key` to `new_key`. Returns with 1
    /// on success; 0 if `old_key` is absent or `new_key` already occupied.
    pub fn relocate(&mut self, old_key: &C::KeyExternal, new_key: &C::KeyExternal) -> usize {
        self.relocate_if(old_key, new_key, |_| true)
    }

    /// Like [`PhTree::relocate`], but the move only happens if the predicate
    /// accepts the currently stored value.
    pub fn relocate_if(
        &mut self,
        old_key: &C::KeyExternal,
        new_key: &C::KeyExternal,
        predicate: impl FnOnce(&T) -> bool,
    ) -> usize {
        let old_native = self.converter.pre(old_key);
        let new_native = self.converter.pre(new_key);
        let diverging = math::diverging_bits(&old_native, &new_native);

        // Walk to the old entry, remembering its node's postfix length.
        let mut node_postfix_len = 0;
        {
            let mut entry = &self.root;
            let old_value = loop {
                match entry {
                    Entry::Node { node, .. } => {
                        node_postfix_len = node.postfix_len();
                        match node.find(&old_native) {
                            Some(child) => entry = child,
                            None => return 0,
                        }
                    }
                    Entry::Leaf { value, .. } => break value,
                }
            };
            if !predicate(old_value) {
                return 0;
            }
        }

        if node_postfix_len >= diverging {
            // Old and new key share node and quadrant (bit-identical keys
            // included); rewriting the stored key is the whole move.
            if let Some(entry) = self.find_native_mut(&old_native) {
                entry.set_key(new_native);
            }
            return 1;
        }
        if self.find_native(&new_native).is_some() {
            return 0; // destination occupied, map semantics forbid overwrite
        }
        match self.erase_native(&old_native) {
            Some(value) => {
                self.emplace_native(new_native, value);
                1
            }
            None => 0,
        }
    }

    //####################################################################################
    // Traversal
    //####################################################################################

    /// Calls the callback for every entry, in z-order.
    pub fn for_each(&self, mut callback: impl FnMut(C::KeyExternal, &T)) {
        query::full::traverse(&self.root, &self.converter, &FilterNoOp, &mut callback);
    }

    /// [`PhTree::for_each`] with a filter applied to entries and sub-trees.
    pub fn for_each_with<F: QueryFilter<T, DIM>>(
        &self,
        filter: F,
        mut callback: impl FnMut(C::KeyExternal, &T),
    ) {
        query::full::traverse(&self.root, &self.converter, &filter, &mut callback);
    }

    /// Mutable variant of [`PhTree::for_each`].
    pub fn for_each_mut(&mut self, mut callback: impl FnMut(C::KeyExternal, &mut T)) {
        query::full::traverse_mut(&mut self.root, &self.converter, &FilterNoOp, &mut callback);
    }

    /// Calls the callback for every entry matching the query window.
    pub fn for_each_in(
        &self,
        query: &C::QueryExternal,
        mut callback: impl FnMut(C::KeyExternal, &T),
    ) {
        self.for_each_in_with(query, FilterNoOp, &mut callback);
    }

    /// [`PhTree::for_each_in`] with a filter applied on top of the window.
    pub fn for_each_in_with<F: QueryFilter<T, DIM>>(
        &self,
        query: &C::QueryExternal,
        filter: F,
        mut callback: impl FnMut(C::KeyExternal, &T),
    ) {
        let window = self.converter.pre_query(query);
        let start = self.find_starting_node(&window);
        query::window::traverse(start, &window, &self.converter, &filter, &mut callback);
    }

    /// Mutable variant of [`PhTree::for_each_in`].
    pub fn for_each_in_mut(
        &mut self,
        query: &C::QueryExternal,
        mut callback: impl FnMut(C::KeyExternal, &mut T),
    ) {
        let window = self.converter.pre_query(query);
        query::window::traverse_mut(
            &mut self.root,
            &window,
            &self.converter,
            &FilterNoOp,
            &mut callback,
        );
    }

    /// Iterates over all entries in z-order.
    pub fn iter(&self) -> IterFull<'_, T, C, FilterNoOp, DIM> {
        IterFull::new(&self.root, &self.converter, FilterNoOp)
    }

    /// [`PhTree::iter`] with a filter applied to entries and sub-trees.
    pub fn iter_with<F: QueryFilter<T, DIM>>(&self, filter: F) -> IterFull<'_, T, C, F, DIM> {
        IterFull::new(&self.root, &self.converter, filter)
    }

    /// Window query: iterates every entry inside the query box, in z-order.
    pub fn query(&self, query: &C::QueryExternal) -> IterWindow<'_, T, C, FilterNoOp, DIM> {
        self.query_with(query, FilterNoOp)
    }

    /// [`PhTree::query`] with a filter applied on top of the window.
    pub fn query_with<F: QueryFilter<T, DIM>>(
        &self,
        query: &C::QueryExternal,
        filter: F,
    ) -> IterWindow<'_, T, C, F, DIM> {
        let window = self.converter.pre_query(query);
        let start = self.find_starting_node(&window);
        IterWindow::new(start, window, &self.converter, filter)
    }

    /// k nearest neighbors: iterates entries by non-decreasing distance from
    /// `center` until `min_results` entries were emitted or the tree is
    /// exhausted. Only offered for point keys.
    pub fn knn<D>(
        &self,
        min_results: usize,
        center: &C::KeyExternal,
        distance_fn: D,
    ) -> IterKnn<'_, T, C, D, FilterNoOp, DIM>
    where
        C: PointConverter<DIM>,
        D: DistanceFn<C::KeyExternal>,
    {
        self.knn_with(min_results, center, distance_fn, FilterNoOp)
    }

    /// [`PhTree::knn`] with a filter excluding entries and sub-trees before
    /// their distance is computed.
    pub fn knn_with<D, F>(
        &self,
        min_results: usize,
        center: &C::KeyExternal,
        distance_fn: D,
        filter: F,
    ) -> IterKnn<'_, T, C, D, F, DIM>
    where
        C: PointConverter<DIM>,
        D: DistanceFn<C::KeyExternal>,
        F: QueryFilter<T, DIM>,
    {
        IterKnn::new(
            &self.root,
            min_results,
            center,
            &self.converter,
            distance_fn,
            filter,
        )
    }

    /// Point lookups are cheaper than window steps, so a window query first
    /// descends along the shared prefix of the two box corners and starts
    /// traversal at the smallest node enclosing the whole box. Boxes without
    /// a shared prefix (e.g. box-key intersection queries spanning the
    /// signed range) start at the root.
    fn find_starting_node(&self, window: &PhBox<DIM>) -> &Entry<T, DIM> {
        let diverging = math::diverging_bits(&window.min, &window.max);
        let mut entry = &self.root;
        if diverging > entry.node_postfix_len() {
            return entry;
        }
        loop {
            match entry.node().find(&window.min) {
                Some(child) if child.is_node() && child.node_postfix_len() >= diverging => {
                    entry = child;
                }
                _ => return entry,
            }
        }
    }

    //####################################################################################
    // Size
    //####################################################################################

    /// Number of stored key/value pairs.
    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }
}
