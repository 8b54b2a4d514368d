use crate::convert::Converter;
use crate::spatial::math;
use crate::tree::entry::Entry;
use crate::tree::types::PhTree;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Aggregate statistics over the tree's structure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct TreeStats {
    /// Number of nodes, including the root node.
    pub n_nodes: usize,
    /// Number of stored key/value pairs.
    pub n_values: usize,
    /// Number of entries summed over all nodes.
    pub n_total_children: usize,
    /// Longest node chain from the root, in nodes.
    pub max_depth: usize,
}

impl<T, const DIM: usize, C: Converter<DIM>> PhTree<T, DIM, C> {
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        collect_stats(&self.root, 1, &mut stats);
        stats
    }

    /// Walks the whole tree and asserts every structural invariant: entry
    /// counts, the postfix/infix arithmetic between parent and child, the
    /// cached postfix length on node entries and the address under which
    /// each entry is stored. Returns with the number of stored values,
    /// which must equal `len()`.
    pub fn check_consistency(&self) -> usize {
        let counted = check_node(&self.root, true);
        assert!(counted == self.num_entries);
        counted
    }
}

fn collect_stats<T, const DIM: usize>(entry: &Entry<T, DIM>, depth: usize, stats: &mut TreeStats) {
    let node = entry.node();
    stats.n_nodes += 1;
    stats.n_total_children += node.entry_count();
    stats.max_depth = stats.max_depth.max(depth);
    for (_, child) in node.entries().iter() {
        if child.is_node() {
            collect_stats(child, depth + 1, stats);
        } else {
            stats.n_values += 1;
        }
    }
}

fn check_node<T, const DIM: usize>(entry: &Entry<T, DIM>, is_root: bool) -> usize {
    let node = entry.node();
    assert!(entry.node_postfix_len() == node.postfix_len());
    assert!(node.entry_count() >= 2 || is_root);
    let mut count = 0;
    for (pos, child) in node.entries().iter() {
        assert!(math::hc_address(child.key(), node.postfix_len()) == pos);
        if child.is_node() {
            let sub = child.node();
            assert!(sub.postfix_len() + 1 + sub.infix_len() == node.postfix_len());
            count += check_node(child, false);
        } else {
            count += 1;
        }
    }
    count
}
