use crate::convert::Converter;
use crate::spatial::math::{HcPos, MAX_BIT_WIDTH};
use crate::tree::entry::Entry;
use crate::tree::filter::QueryFilter;

/// Depth-first iterator over the whole tree in z-order.
///
/// The traversal keeps an explicit stack of (node entry, next address)
/// pairs; its depth is bounded by the key width, since every level resolves
/// at least one prefix bit.
pub struct IterFull<'a, T, C: Converter<DIM>, F: QueryFilter<T, DIM>, const DIM: usize> {
    stack: Vec<(&'a Entry<T, DIM>, HcPos)>,
    converter: &'a C,
    filter: F,
}

impl<'a, T, C: Converter<DIM>, F: QueryFilter<T, DIM>, const DIM: usize>
    IterFull<'a, T, C, F, DIM>
{
    pub(in crate::tree) fn new(root: &'a Entry<T, DIM>, converter: &'a C, filter: F) -> Self {
        let mut stack = Vec::with_capacity(MAX_BIT_WIDTH as usize);
        stack.push((root, 0));
        Self {
            stack,
            converter,
            filter,
        }
    }
}

impl<'a, T, C: Converter<DIM>, F: QueryFilter<T, DIM>, const DIM: usize> Iterator
    for IterFull<'a, T, C, F, DIM>
{
    type Item = (C::KeyExternal, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let entry: &'a Entry<T, DIM> = frame.0;
            match entry.node().entries().lower_bound(frame.1) {
                None => {
                    self.stack.pop();
                }
                Some((pos, child)) => {
                    frame.1 = pos + 1;
                    if child.is_node() {
                        if self
                            .filter
                            .is_node_valid(child.key(), child.node_postfix_len() + 1)
                        {
                            self.stack.push((child, 0));
                        }
                    } else if self.filter.is_entry_valid(child.key(), child.value()) {
                        return Some((self.converter.post(child.key()), child.value()));
                    }
                }
            }
        }
    }
}

/// Recursive z-order traversal driving a callback; recursion depth is
/// bounded by the key width.
pub(crate) fn traverse<'a, T, C, F, CB, const DIM: usize>(
    entry: &'a Entry<T, DIM>,
    converter: &C,
    filter: &F,
    callback: &mut CB,
) where
    C: Converter<DIM>,
    F: QueryFilter<T, DIM>,
    CB: FnMut(C::KeyExternal, &'a T),
{
    for (_, child) in entry.node().entries().iter() {
        if child.is_node() {
            if filter.is_node_valid(child.key(), child.node_postfix_len() + 1) {
                traverse(child, converter, filter, callback);
            }
        } else if filter.is_entry_valid(child.key(), child.value()) {
            callback(converter.post(child.key()), child.value());
        }
    }
}

/// Mutable variant of [`traverse`].
pub(crate) fn traverse_mut<T, C, F, CB, const DIM: usize>(
    entry: &mut Entry<T, DIM>,
    converter: &C,
    filter: &F,
    callback: &mut CB,
) where
    C: Converter<DIM>,
    F: QueryFilter<T, DIM>,
    CB: FnMut(C::KeyExternal, &mut T),
{
    for (_, child) in entry.node_mut().entries_mut().iter_mut() {
        if child.is_node() {
            if filter.is_node_valid(child.key(), child.node_postfix_len() + 1) {
                traverse_mut(child, converter, filter, callback);
            }
        } else {
            let key = *child.key();
            if filter.is_entry_valid(&key, child.value()) {
                callback(converter.post(&key), child.value_mut());
            }
        }
    }
}
