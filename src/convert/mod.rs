mod tests;

use crate::spatial::{PhBox, PhBoxD, PhPoint, PhPointD};

/// Translates between an external key representation and the tree's native
/// signed integer points. `pre` must be order preserving per dimension and
/// `post` must be its inverse; `pre_query` maps a query window into native
/// coordinates.
pub trait Converter<const DIM: usize> {
    /// External key type, e.g. a floating point tuple or a box.
    type KeyExternal;
    /// External query window type accepted by the window queries.
    type QueryExternal;

    fn pre(&self, key: &Self::KeyExternal) -> PhPoint<DIM>;
    fn post(&self, key: &PhPoint<DIM>) -> Self::KeyExternal;
    fn pre_query(&self, query: &Self::QueryExternal) -> PhBox<DIM>;
}

/// Marker for converters whose external keys are points. The k-NN query is
/// only offered for these; box keys have no meaningful point distance.
pub trait PointConverter<const DIM: usize>: Converter<DIM> {}

//####################################################################################
// IEEE-754 sortable integer mapping
//####################################################################################

/// Maps a double to a signed 64 bit integer so that integer ordering equals
/// floating point ordering. The raw IEEE-754 bit pattern already sorts
/// correctly for non-negative values; negative values sort inverted, so all
/// their non-sign bits are flipped.
pub fn to_sortable_long(value: f64) -> i64 {
    let r = value.to_bits() as i64;
    if r >= 0 {
        r
    } else {
        r ^ 0x7FFF_FFFF_FFFF_FFFF
    }
}

/// Inverse of [`to_sortable_long`].
pub fn to_double(value: i64) -> f64 {
    let v = if value >= 0 {
        value
    } else {
        value ^ 0x7FFF_FFFF_FFFF_FFFF
    };
    f64::from_bits(v as u64)
}

//####################################################################################
// Converters
//####################################################################################

/// Pass-through converter for keys that already are native integer tuples.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConverterNoOp;

impl<const DIM: usize> Converter<DIM> for ConverterNoOp {
    type KeyExternal = PhPoint<DIM>;
    type QueryExternal = PhBox<DIM>;

    fn pre(&self, key: &PhPoint<DIM>) -> PhPoint<DIM> {
        *key
    }

    fn post(&self, key: &PhPoint<DIM>) -> PhPoint<DIM> {
        *key
    }

    fn pre_query(&self, query: &PhBox<DIM>) -> PhBox<DIM> {
        *query
    }
}

impl<const DIM: usize> PointConverter<DIM> for ConverterNoOp {}

/// Converter for `f64` point keys using the IEEE-754 sortable mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConverterIeee;

impl<const DIM: usize> Converter<DIM> for ConverterIeee {
    type KeyExternal = PhPointD<DIM>;
    type QueryExternal = PhBoxD<DIM>;

    fn pre(&self, key: &PhPointD<DIM>) -> PhPoint<DIM> {
        let mut out = [0i64; DIM];
        for dim in 0..DIM {
            out[dim] = to_sortable_long(key[dim]);
        }
        out
    }

    fn post(&self, key: &PhPoint<DIM>) -> PhPointD<DIM> {
        let mut out = [0f64; DIM];
        for dim in 0..DIM {
            out[dim] = to_double(key[dim]);
        }
        out
    }

    fn pre_query(&self, query: &PhBoxD<DIM>) -> PhBox<DIM> {
        PhBox::new(self.pre(&query.min), self.pre(&query.max))
    }
}

impl<const DIM: usize> PointConverter<DIM> for ConverterIeee {}

/// Converter for `f64` box keys. A BOX_DIM dimensional box is encoded as a
/// 2*BOX_DIM dimensional point: low corner coordinates first, high corner
/// coordinates second. The tree must therefore be instantiated with
/// `DIM == 2 * BOX_DIM`.
///
/// `pre_query` produces an intersection window: a stored box matches iff its
/// low corner lies below the query maximum and its high corner above the
/// query minimum, so the native window constrains the low-corner half by
/// `[-inf, query.max]` and the high-corner half by `[query.min, +inf]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConverterBoxIeee<const BOX_DIM: usize>;

impl<const DIM: usize, const BOX_DIM: usize> Converter<DIM> for ConverterBoxIeee<BOX_DIM> {
    type KeyExternal = PhBoxD<BOX_DIM>;
    type QueryExternal = PhBoxD<BOX_DIM>;

    fn pre(&self, key: &PhBoxD<BOX_DIM>) -> PhPoint<DIM> {
        debug_assert!(DIM == 2 * BOX_DIM);
        let mut out = [0i64; DIM];
        for dim in 0..BOX_DIM {
            out[dim] = to_sortable_long(key.min[dim]);
            out[dim + BOX_DIM] = to_sortable_long(key.max[dim]);
        }
        out
    }

    fn post(&self, key: &PhPoint<DIM>) -> PhBoxD<BOX_DIM> {
        debug_assert!(DIM == 2 * BOX_DIM);
        let mut out = PhBoxD::new([0.; BOX_DIM], [0.; BOX_DIM]);
        for dim in 0..BOX_DIM {
            out.min[dim] = to_double(key[dim]);
            out.max[dim] = to_double(key[dim + BOX_DIM]);
        }
        out
    }

    fn pre_query(&self, query: &PhBoxD<BOX_DIM>) -> PhBox<DIM> {
        debug_assert!(DIM == 2 * BOX_DIM);
        let mut min = [i64::MIN; DIM];
        let mut max = [i64::MAX; DIM];
        for dim in 0..BOX_DIM {
            max[dim] = to_sortable_long(query.max[dim]);
            min[dim + BOX_DIM] = to_sortable_long(query.min[dim]);
        }
        PhBox::new(min, max)
    }
}
