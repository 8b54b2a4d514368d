use crate::convert::{Converter, ConverterBoxIeee, ConverterIeee, ConverterNoOp};
use crate::tree::entry::Entry;

/// The PH-Tree: an ordered index over an n-dimensional space where each
/// dimension is indexed by a signed 64 bit integer. Iteration follows
/// z-order (Morton order); the index is a map, so each key is associated
/// with at most one value.
///
/// `C` translates between the external key representation and the native
/// integer tuples, see the `convert` module. The plain instantiation uses
/// native keys directly:
///
/// ```
/// use phtree_rs::tree::PhTree;
///
/// let mut tree: PhTree<u32, 3> = PhTree::new();
/// tree.try_emplace(&[1, 2, 3], 100);
/// assert_eq!(tree.get(&[1, 2, 3]), Some(&100));
/// ```
pub struct PhTree<T, const DIM: usize, C: Converter<DIM> = ConverterNoOp> {
    pub(in crate::tree) num_entries: usize,
    pub(in crate::tree) root: Entry<T, DIM>,
    pub(in crate::tree) converter: C,
}

/// PH-Tree over `f64` point keys, converted through the IEEE-754 sortable
/// integer mapping.
pub type PhTreeD<T, const DIM: usize> = PhTree<T, DIM, ConverterIeee>;

/// PH-Tree over `f64` axis aligned box keys. A box with `BOX_DIM` dimensions
/// is encoded as a point with `DIM == 2 * BOX_DIM` dimensions, so e.g. a
/// 3 dimensional box tree is written `PhTreeBoxD<V, 6, 3>`. Window queries
/// return every stored box intersecting the query box.
pub type PhTreeBoxD<T, const DIM: usize, const BOX_DIM: usize> =
    PhTree<T, DIM, ConverterBoxIeee<BOX_DIM>>;
