use crate::spatial::distance::{DistanceEuclidean, DistanceFn};
use crate::spatial::math::{self, MAX_BIT_WIDTH};
use crate::spatial::PhPoint;

/// Filters applied by queries and traversals, on native keys.
///
/// `is_entry_valid` runs before a leaf is emitted. `is_node_valid` runs
/// before a sub-tree is descended into; `bits_to_ignore` names the number of
/// low prefix bits that are undetermined inside that sub-tree, so the test
/// must conservatively accept any node whose bounding cube might contain a
/// match. A rejected node suppresses its entire sub-tree.
pub trait QueryFilter<T, const DIM: usize> {
    fn is_entry_valid(&self, key: &PhPoint<DIM>, value: &T) -> bool;
    fn is_node_valid(&self, prefix: &PhPoint<DIM>, bits_to_ignore: u32) -> bool;
}

/// The default filter: accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterNoOp;

impl<T, const DIM: usize> QueryFilter<T, DIM> for FilterNoOp {
    fn is_entry_valid(&self, _key: &PhPoint<DIM>, _value: &T) -> bool {
        true
    }

    fn is_node_valid(&self, _prefix: &PhPoint<DIM>, _bits_to_ignore: u32) -> bool {
        true
    }
}

/// Axis aligned box filter over native keys.
#[derive(Debug, Clone, Copy)]
pub struct FilterAabb<const DIM: usize> {
    min: PhPoint<DIM>,
    max: PhPoint<DIM>,
}

impl<const DIM: usize> FilterAabb<DIM> {
    pub fn new(min: PhPoint<DIM>, max: PhPoint<DIM>) -> Self {
        Self { min, max }
    }
}

impl<T, const DIM: usize> QueryFilter<T, DIM> for FilterAabb<DIM> {
    fn is_entry_valid(&self, key: &PhPoint<DIM>, _value: &T) -> bool {
        math::in_range(key, &self.min, &self.max)
    }

    fn is_node_valid(&self, prefix: &PhPoint<DIM>, bits_to_ignore: u32) -> bool {
        // the root level is always traversed
        if bits_to_ignore >= MAX_BIT_WIDTH - 1 {
            return true;
        }
        let mask_min = u64::MAX << bits_to_ignore;
        let mask_max = !mask_min;
        for dim in 0..DIM {
            let node_lo = (prefix[dim] as u64 & mask_min) as i64;
            let node_hi = (prefix[dim] as u64 | mask_max) as i64;
            if node_hi < self.min[dim] || node_lo > self.max[dim] {
                return false;
            }
        }
        true
    }
}

/// Sphere filter over native keys. The node test clamps the center into the
/// node's bounding cube and accepts the node if that closest point is within
/// the radius, which conservatively over-approximates the sphere.
#[derive(Debug, Clone, Copy)]
pub struct FilterSphere<const DIM: usize, D = DistanceEuclidean> {
    center: PhPoint<DIM>,
    radius: f64,
    distance_fn: D,
}

impl<const DIM: usize> FilterSphere<DIM, DistanceEuclidean> {
    pub fn new(center: PhPoint<DIM>, radius: f64) -> Self {
        Self::with_distance(center, radius, DistanceEuclidean)
    }
}

impl<const DIM: usize, D: DistanceFn<PhPoint<DIM>>> FilterSphere<DIM, D> {
    pub fn with_distance(center: PhPoint<DIM>, radius: f64, distance_fn: D) -> Self {
        Self {
            center,
            radius,
            distance_fn,
        }
    }
}

impl<T, const DIM: usize, D: DistanceFn<PhPoint<DIM>>> QueryFilter<T, DIM>
    for FilterSphere<DIM, D>
{
    fn is_entry_valid(&self, key: &PhPoint<DIM>, _value: &T) -> bool {
        self.distance_fn.distance(&self.center, key) <= self.radius
    }

    fn is_node_valid(&self, prefix: &PhPoint<DIM>, bits_to_ignore: u32) -> bool {
        if bits_to_ignore >= MAX_BIT_WIDTH - 1 {
            return true;
        }
        let mask_min = u64::MAX << bits_to_ignore;
        let mask_max = !mask_min;
        let mut closest = [0i64; DIM];
        for dim in 0..DIM {
            let node_lo = (prefix[dim] as u64 & mask_min) as i64;
            let node_hi = (prefix[dim] as u64 | mask_max) as i64;
            closest[dim] = self.center[dim].clamp(node_lo, node_hi);
        }
        self.distance_fn.distance(&self.center, &closest) <= self.radius
    }
}
