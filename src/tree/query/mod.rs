pub mod full;
pub mod knn;
pub mod window;

use crate::convert::Converter;
use crate::tree::entry::Entry;

/// Result handle of a point lookup: an iterator over at most one entry.
pub struct IterFind<'a, T, C: Converter<DIM>, const DIM: usize> {
    result: Option<&'a Entry<T, DIM>>,
    converter: &'a C,
}

impl<'a, T, C: Converter<DIM>, const DIM: usize> IterFind<'a, T, C, DIM> {
    pub(in crate::tree) fn new(result: Option<&'a Entry<T, DIM>>, converter: &'a C) -> Self {
        Self { result, converter }
    }

    /// Returns with true if the lookup found nothing (or the iterator is
    /// exhausted).
    pub fn is_end(&self) -> bool {
        self.result.is_none()
    }

    /// The found key, converted back to the external representation.
    pub fn key(&self) -> Option<C::KeyExternal> {
        self.result.map(|entry| self.converter.post(entry.key()))
    }

    pub fn value(&self) -> Option<&'a T> {
        self.result.map(Entry::value)
    }
}

impl<'a, T, C: Converter<DIM>, const DIM: usize> Iterator for IterFind<'a, T, C, DIM> {
    type Item = (C::KeyExternal, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.result.take()?;
        Some((self.converter.post(entry.key()), entry.value()))
    }
}
