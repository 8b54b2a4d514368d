use crate::containers::EntryMap;
use crate::spatial::math::{self, HcPos, MAX_BIT_WIDTH};
use crate::spatial::PhPoint;
use crate::tree::entry::{self, Entry};

/// A set of up to 2^DIM entries sharing a common key prefix.
///
/// `postfix_len` is the index of the addressing bit of this node: all keys
/// below agree on every bit above it, and the hypercube address of an entry
/// is formed from exactly this bit of each dimension. `infix_len` counts the
/// prefix bits this node contributes beyond its parent's addressing bit;
/// for every child node the relation
/// `parent.postfix_len == child.postfix_len + 1 + child.infix_len` holds.
///
/// Every node except the root holds at least two entries. None of the
/// functions here recurse into child nodes on their own; descent is driven
/// one step at a time (see [`EmplaceStep`]).
#[derive(Debug)]
pub(crate) struct Node<T, const DIM: usize> {
    postfix_len: u32,
    infix_len: u32,
    entries: EntryMap<Entry<T, DIM>>,
}

/// Outcome of one non-recursive emplace step on a node.
pub(crate) enum EmplaceStep<'a, T, const DIM: usize> {
    /// A fresh leaf was created; the reference points at it.
    Inserted(&'a mut Entry<T, DIM>),
    /// The exact key is already present; no value was written.
    Existing(&'a mut Entry<T, DIM>),
    /// The key belongs below the returned child entry; the value travels
    /// back to the caller for the next step.
    Descend(&'a mut Entry<T, DIM>, T),
}

impl<T, const DIM: usize> Node<T, DIM> {
    pub(crate) fn new(infix_len: u32, postfix_len: u32) -> Self {
        debug_assert!(postfix_len < MAX_BIT_WIDTH);
        debug_assert!(infix_len <= MAX_BIT_WIDTH - 2);
        Self {
            postfix_len,
            infix_len,
            entries: EntryMap::for_dim(DIM),
        }
    }

    pub(crate) fn postfix_len(&self) -> u32 {
        self.postfix_len
    }

    pub(crate) fn infix_len(&self) -> u32 {
        self.infix_len
    }

    pub(crate) fn set_infix_len(&mut self, infix_len: u32) {
        debug_assert!(infix_len <= MAX_BIT_WIDTH - 2);
        self.infix_len = infix_len;
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &EntryMap<Entry<T, DIM>> {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut EntryMap<Entry<T, DIM>> {
        &mut self.entries
    }

    /// One step of insertion, analogous to a map's `try_emplace`: succeeds
    /// immediately on a free quadrant, reports an existing identical key
    /// without overwriting, splits when the key diverges from an occupant's
    /// prefix above its resolution, and otherwise hands back the child to
    /// descend into.
    pub(crate) fn emplace<'a>(
        &'a mut self,
        key: &PhPoint<DIM>,
        value: T,
    ) -> EmplaceStep<'a, T, DIM> {
        let parent_postfix_len = self.postfix_len;
        let pos = math::hc_address(key, parent_postfix_len);
        if self.entries.find(pos).is_none() {
            let (fresh, _) = self
                .entries
                .try_emplace_with(pos, move || Entry::new_leaf(*key, value));
            return EmplaceStep::Inserted(fresh);
        }
        let Some(occupant) = self.entries.find_mut(pos) else {
            unreachable!("occupancy checked above");
        };
        Self::handle_collision(occupant, parent_postfix_len, key, value)
    }

    /// Resolves an emplace landing on an occupied quadrant.
    fn handle_collision<'a>(
        occupant: &'a mut Entry<T, DIM>,
        parent_postfix_len: u32,
        key: &PhPoint<DIM>,
        value: T,
    ) -> EmplaceStep<'a, T, DIM> {
        if occupant.is_node() {
            if occupant.node().infix_len() > 0 {
                let diverging = math::diverging_bits(key, occupant.key());
                if diverging > occupant.node_postfix_len() + 1 {
                    // The key leaves the child's compressed prefix above the
                    // child's level: split the prefix.
                    return EmplaceStep::Inserted(Self::insert_split(
                        occupant,
                        parent_postfix_len,
                        key,
                        value,
                        diverging,
                    ));
                }
            }
            EmplaceStep::Descend(occupant, value)
        } else {
            let diverging = math::diverging_bits(key, occupant.key());
            if diverging == 0 {
                // Exact key match; map semantics keep the stored value.
                return EmplaceStep::Existing(occupant);
            }
            EmplaceStep::Inserted(Self::insert_split(
                occupant,
                parent_postfix_len,
                key,
                value,
                diverging,
            ))
        }
    }

    /// Replaces `occupant` with a new intermediate node holding both the
    /// previous occupant (an entire subtree if it was a node entry) and a
    /// fresh leaf for `key`. Both land in distinct quadrants of the new node
    /// because their keys diverge exactly at bit `diverging - 1`.
    fn insert_split<'a>(
        occupant: &'a mut Entry<T, DIM>,
        parent_postfix_len: u32,
        key: &PhPoint<DIM>,
        value: T,
        diverging: u32,
    ) -> &'a mut Entry<T, DIM> {
        let new_postfix_len = diverging - 1;
        let new_infix_len = parent_postfix_len - diverging;
        let pos_new = math::hc_address(key, new_postfix_len);
        let pos_old = math::hc_address(occupant.key(), new_postfix_len);
        debug_assert!(pos_new != pos_old);

        let split_node = Box::new(Node::new(new_infix_len, new_postfix_len));
        let previous = std::mem::replace(occupant, Entry::new_node(*key, split_node));
        let node = occupant.node_mut();
        node.write_entry(pos_old, previous);
        node.write_leaf(pos_new, key, value)
    }

    /// Moves an existing entry into this node. A migrated subtree gains a
    /// new parent level, so its infix is recomputed against this node.
    fn write_entry(&mut self, pos: HcPos, mut entry: Entry<T, DIM>) {
        if let Entry::Node { node, postfix_len, .. } = &mut entry {
            let infix = self.postfix_len - *postfix_len - 1;
            node.set_infix_len(infix);
        }
        let (_, inserted) = self.entries.try_emplace_with(pos, move || entry);
        debug_assert!(inserted);
    }

    fn write_leaf<'a>(&'a mut self, pos: HcPos, key: &PhPoint<DIM>, value: T) -> &'a mut Entry<T, DIM> {
        let (fresh, inserted) = self
            .entries
            .try_emplace_with(pos, move || Entry::new_leaf(*key, value));
        debug_assert!(inserted);
        fresh
    }

    /// Non-recursive lookup: returns the entry selected by `key`, if its
    /// stored key matches at the relevant resolution.
    pub(crate) fn find(&self, key: &PhPoint<DIM>) -> Option<&Entry<T, DIM>> {
        let pos = math::hc_address(key, self.postfix_len);
        self.entries.find(pos).filter(|entry| entry.matches_key(key))
    }

    pub(crate) fn find_mut(&mut self, key: &PhPoint<DIM>) -> Option<&mut Entry<T, DIM>> {
        let pos = math::hc_address(key, self.postfix_len);
        self.entries
            .find_mut(pos)
            .filter(|entry| entry.matches_key(key))
    }
}

/// Erases `key` below `node_entry` (which must be a node entry) and returns
/// the removed value.
///
/// Recursion is bounded by the key width: every level consumes at least one
/// prefix bit. When a removal leaves a non-root node with a single entry,
/// the parent invocation collapses that node via [`entry::merge_into`]; the
/// entry passed in at the top level is never collapsed itself, which keeps
/// the root node alive across arbitrary removals.
pub(crate) fn erase_below<T, const DIM: usize>(
    node_entry: &mut Entry<T, DIM>,
    key: &PhPoint<DIM>,
) -> Option<T> {
    let node = node_entry.node_mut();
    let pos = math::hc_address(key, node.postfix_len());
    let (matched, is_node) = match node.entries().find(pos) {
        Some(entry) => (entry.matches_key(key), entry.is_node()),
        None => (false, false),
    };
    if !matched {
        return None;
    }
    if is_node {
        let Some(child) = node.entries_mut().find_mut(pos) else {
            unreachable!("occupancy checked above");
        };
        let removed = erase_below(child, key);
        if removed.is_some() && child.node().entry_count() == 1 {
            entry::merge_into(child);
        }
        removed
    } else {
        node.entries_mut().erase(pos).map(Entry::into_value)
    }
}
