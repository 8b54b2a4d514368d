use std::collections::HashMap;

use proptest::prelude::*;

use crate::spatial::math;
use crate::spatial::PhBox;
use crate::tree::PhTree;

/// Model-checked mutations: every action runs against the tree and a plain
/// hash map, and the observable behavior must agree.
#[derive(Debug, Clone)]
enum Action {
    Insert([i64; 3], u64),
    Erase([i64; 3]),
    Relocate([i64; 3], [i64; 3]),
}

fn key_strategy() -> impl Strategy<Value = [i64; 3]> {
    prop_oneof![
        // a dense cluster, to force collisions, splits and merges
        prop::array::uniform3(-8i64..8),
        // full-range values, to exercise the sign level
        prop::array::uniform3(any::<i64>()),
    ]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (key_strategy(), any::<u64>()).prop_map(|(key, value)| Action::Insert(key, value)),
        key_strategy().prop_map(Action::Erase),
        (key_strategy(), key_strategy()).prop_map(|(old, new)| Action::Relocate(old, new)),
    ]
}

proptest! {
    #[test]
    fn prop_map_law(actions in prop::collection::vec(action_strategy(), 1..200)) {
        let mut tree: PhTree<u64, 3> = PhTree::new();
        let mut model: HashMap<[i64; 3], u64> = HashMap::new();
        for action in actions {
            match action {
                Action::Insert(key, value) => {
                    let inserted = tree.try_emplace(&key, value).1;
                    prop_assert!(inserted == !model.contains_key(&key));
                    model.entry(key).or_insert(value);
                }
                Action::Erase(key) => {
                    prop_assert!(tree.erase(&key) == model.remove(&key).is_some() as usize);
                }
                Action::Relocate(old, new) => {
                    let moved = tree.relocate(&old, &new);
                    if old == new {
                        prop_assert!(moved == model.contains_key(&old) as usize);
                    } else {
                        let expected = model.contains_key(&old) && !model.contains_key(&new);
                        prop_assert!(moved == expected as usize);
                        if moved == 1 {
                            let value = model.remove(&old).unwrap();
                            model.insert(new, value);
                        }
                    }
                }
            }
            prop_assert!(tree.len() == model.len());
        }
        prop_assert!(tree.check_consistency() == model.len());
        for (key, value) in &model {
            prop_assert!(tree.get(key) == Some(value));
        }
    }

    #[test]
    fn prop_full_iteration_complete_and_z_ordered(
        keys in prop::collection::hash_set(key_strategy(), 0..100),
    ) {
        let mut tree: PhTree<u32, 3> = PhTree::new();
        for key in &keys {
            tree.try_emplace(key, 0);
        }
        let emitted: Vec<_> = tree.iter().map(|(key, _)| key).collect();
        prop_assert!(emitted.len() == keys.len());
        for key in &emitted {
            prop_assert!(keys.contains(key));
        }
        // consecutive keys must ascend in hypercube-address order at their
        // diverging level
        for pair in emitted.windows(2) {
            let diverging = math::diverging_bits(&pair[0], &pair[1]);
            prop_assert!(diverging > 0);
            prop_assert!(
                math::hc_address(&pair[0], diverging - 1)
                    < math::hc_address(&pair[1], diverging - 1)
            );
        }
    }

    #[test]
    fn prop_window_query_equals_ground_truth(
        keys in prop::collection::hash_set(prop::array::uniform3(-32i64..32), 0..150),
        corner_a in prop::array::uniform3(-40i64..40),
        corner_b in prop::array::uniform3(-40i64..40),
    ) {
        let mut tree: PhTree<u32, 3> = PhTree::new();
        for key in &keys {
            tree.try_emplace(key, 0);
        }
        let mut min = [0i64; 3];
        let mut max = [0i64; 3];
        for dim in 0..3 {
            min[dim] = corner_a[dim].min(corner_b[dim]);
            max[dim] = corner_a[dim].max(corner_b[dim]);
        }
        let mut expected: Vec<_> = keys
            .iter()
            .copied()
            .filter(|key| math::in_range(key, &min, &max))
            .collect();
        expected.sort();
        let mut actual: Vec<_> = tree
            .query(&PhBox::new(min, max))
            .map(|(key, _)| key)
            .collect();
        actual.sort();
        prop_assert!(actual == expected);
    }

    #[test]
    fn prop_knn_emits_minimal_results(
        keys in prop::collection::hash_set(prop::array::uniform2(-1000i64..1000), 1..80),
        center in prop::array::uniform2(-1000i64..1000),
        k in 1usize..12,
    ) {
        use crate::spatial::distance::{DistanceEuclidean, DistanceFn};

        let mut tree: PhTree<u32, 2> = PhTree::new();
        for key in &keys {
            tree.try_emplace(key, 0);
        }
        let dist = DistanceEuclidean;
        let results: Vec<_> = tree
            .knn(k, &center, DistanceEuclidean)
            .map(|(key, _)| key)
            .collect();
        prop_assert!(results.len() == k.min(keys.len()));
        let mut brute: Vec<f64> = keys.iter().map(|key| dist.distance(&center, key)).collect();
        brute.sort_by(f64::total_cmp);
        for (rank, key) in results.iter().enumerate() {
            prop_assert!(dist.distance(&center, key) == brute[rank]);
        }
    }
}
