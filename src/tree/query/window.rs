use crate::convert::Converter;
use crate::spatial::math::{self, HcPos, MAX_BIT_WIDTH};
use crate::spatial::{PhBox, PhPoint};
use crate::tree::entry::Entry;
use crate::tree::filter::QueryFilter;

/// Computes the quadrant masks of a node against a query window.
///
/// Each mask carries one bit per dimension, dimension 0 on top, mirroring
/// the hypercube address layout. In the lower mask a set bit means the lower
/// half of that dimension need not be searched; in the upper mask a set bit
/// means the upper half must be searched. An address `pos` then overlaps the
/// window iff `(pos | mask_lower) & mask_upper == pos`.
///
/// At the top-most level the addressing bit is the sign bit, which inverts
/// the ordering: there, a set address bit means *smaller* values, so the
/// masks are derived from the signs of the window corners instead of the
/// node's bisection.
pub(crate) fn calc_limits<const DIM: usize>(
    postfix_len: u32,
    prefix: &PhPoint<DIM>,
    range_min: &PhPoint<DIM>,
    range_max: &PhPoint<DIM>,
) -> (HcPos, HcPos) {
    debug_assert!(postfix_len < MAX_BIT_WIDTH);
    let mut mask_lower: HcPos = 0;
    let mut mask_upper: HcPos = 0;
    if postfix_len < MAX_BIT_WIDTH - 1 {
        let hc_bit = 1u64 << postfix_len;
        let value_mask = u64::MAX << postfix_len;
        for dim in 0..DIM {
            mask_lower <<= 1;
            mask_upper <<= 1;
            let bisection = ((prefix[dim] as u64 | hc_bit) & value_mask) as i64;
            if range_min[dim] >= bisection {
                mask_lower |= 1;
            }
            if range_max[dim] >= bisection {
                mask_upper |= 1;
            }
        }
    } else {
        for dim in 0..DIM {
            mask_lower <<= 1;
            mask_upper <<= 1;
            if range_min[dim] < 0 {
                // the negative partition must be searched
                mask_upper |= 1;
            }
            if range_max[dim] < 0 {
                // the non-negative partition need not be searched
                mask_lower |= 1;
            }
        }
    }
    (mask_lower, mask_upper)
}

pub(crate) fn is_pos_valid(pos: HcPos, mask_lower: HcPos, mask_upper: HcPos) -> bool {
    (pos | mask_lower) & mask_upper == pos
}

/// Checks an entry in a mask-approved quadrant against the actual window.
/// Leaves check their full key. Node entries check their compressed prefix:
/// with an infix of zero the quadrant test was already exact, otherwise the
/// prefix (masked down to the child's resolution) must overlap the window.
pub(crate) fn entry_in_window<T, const DIM: usize>(
    candidate: &Entry<T, DIM>,
    range_min: &PhPoint<DIM>,
    range_max: &PhPoint<DIM>,
) -> bool {
    match candidate {
        Entry::Leaf { key, .. } => math::in_range(key, range_min, range_max),
        Entry::Node {
            key,
            node,
            postfix_len,
        } => {
            if node.infix_len() == 0 {
                return true;
            }
            let mask = math::high_bits_mask(postfix_len + 1);
            for dim in 0..DIM {
                let masked_prefix = (key[dim] as u64 & mask) as i64;
                let masked_min = (range_min[dim] as u64 & mask) as i64;
                if masked_prefix > range_max[dim] || masked_prefix < masked_min {
                    return false;
                }
            }
            true
        }
    }
}

struct Frame<'a, T, const DIM: usize> {
    entry: &'a Entry<T, DIM>,
    cursor: HcPos,
    mask_lower: HcPos,
    mask_upper: HcPos,
}

/// Window query iterator: depth-first z-order traversal restricted to
/// quadrants overlapping the query box, with an explicit stack bounded by
/// the key width.
pub struct IterWindow<'a, T, C: Converter<DIM>, F: QueryFilter<T, DIM>, const DIM: usize> {
    stack: Vec<Frame<'a, T, DIM>>,
    range_min: PhPoint<DIM>,
    range_max: PhPoint<DIM>,
    converter: &'a C,
    filter: F,
}

impl<'a, T, C: Converter<DIM>, F: QueryFilter<T, DIM>, const DIM: usize>
    IterWindow<'a, T, C, F, DIM>
{
    pub(in crate::tree) fn new(
        start: &'a Entry<T, DIM>,
        window: PhBox<DIM>,
        converter: &'a C,
        filter: F,
    ) -> Self {
        let mut iter = Self {
            stack: Vec::with_capacity(MAX_BIT_WIDTH as usize),
            range_min: window.min,
            range_max: window.max,
            converter,
            filter,
        };
        iter.push_frame(start);
        iter
    }

    fn push_frame(&mut self, entry: &'a Entry<T, DIM>) {
        let (mask_lower, mask_upper) = calc_limits(
            entry.node_postfix_len(),
            entry.key(),
            &self.range_min,
            &self.range_max,
        );
        self.stack.push(Frame {
            entry,
            cursor: mask_lower,
            mask_lower,
            mask_upper,
        });
    }
}

impl<'a, T, C: Converter<DIM>, F: QueryFilter<T, DIM>, const DIM: usize> Iterator
    for IterWindow<'a, T, C, F, DIM>
{
    type Item = (C::KeyExternal, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let entry: &'a Entry<T, DIM> = frame.entry;
            let (mask_lower, mask_upper) = (frame.mask_lower, frame.mask_upper);
            match entry.node().entries().lower_bound(frame.cursor) {
                Some((pos, child)) if pos <= mask_upper => {
                    frame.cursor = pos + 1;
                    if !is_pos_valid(pos, mask_lower, mask_upper) {
                        continue;
                    }
                    if !entry_in_window(child, &self.range_min, &self.range_max) {
                        continue;
                    }
                    if child.is_node() {
                        if self
                            .filter
                            .is_node_valid(child.key(), child.node_postfix_len() + 1)
                        {
                            self.push_frame(child);
                        }
                    } else if self.filter.is_entry_valid(child.key(), child.value()) {
                        return Some((self.converter.post(child.key()), child.value()));
                    }
                }
                _ => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Recursive window traversal driving a callback; recursion depth is
/// bounded by the key width.
pub(crate) fn traverse<'a, T, C, F, CB, const DIM: usize>(
    entry: &'a Entry<T, DIM>,
    window: &PhBox<DIM>,
    converter: &C,
    filter: &F,
    callback: &mut CB,
) where
    C: Converter<DIM>,
    F: QueryFilter<T, DIM>,
    CB: FnMut(C::KeyExternal, &'a T),
{
    let (mask_lower, mask_upper) =
        calc_limits(entry.node_postfix_len(), entry.key(), &window.min, &window.max);
    let mut cursor = mask_lower;
    while let Some((pos, child)) = entry.node().entries().lower_bound(cursor) {
        if pos > mask_upper {
            break;
        }
        cursor = pos + 1;
        if !is_pos_valid(pos, mask_lower, mask_upper) {
            continue;
        }
        if !entry_in_window(child, &window.min, &window.max) {
            continue;
        }
        if child.is_node() {
            if filter.is_node_valid(child.key(), child.node_postfix_len() + 1) {
                traverse(child, window, converter, filter, callback);
            }
        } else if filter.is_entry_valid(child.key(), child.value()) {
            callback(converter.post(child.key()), child.value());
        }
    }
}

/// Mutable variant of [`traverse`].
pub(crate) fn traverse_mut<T, C, F, CB, const DIM: usize>(
    entry: &mut Entry<T, DIM>,
    window: &PhBox<DIM>,
    converter: &C,
    filter: &F,
    callback: &mut CB,
) where
    C: Converter<DIM>,
    F: QueryFilter<T, DIM>,
    CB: FnMut(C::KeyExternal, &mut T),
{
    let (mask_lower, mask_upper) =
        calc_limits(entry.node_postfix_len(), entry.key(), &window.min, &window.max);
    for (pos, child) in entry.node_mut().entries_mut().iter_mut() {
        if pos > mask_upper {
            break;
        }
        if !is_pos_valid(pos, mask_lower, mask_upper) {
            continue;
        }
        if !entry_in_window(child, &window.min, &window.max) {
            continue;
        }
        if child.is_node() {
            if filter.is_node_valid(child.key(), child.node_postfix_len() + 1) {
                traverse_mut(child, window, converter, filter, callback);
            }
        } else {
            let key = *child.key();
            if filter.is_entry_valid(&key, child.value()) {
                callback(converter.post(&key), child.value_mut());
            }
        }
    }
}
