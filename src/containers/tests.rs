#[cfg(test)]
mod entry_map_tests {
    use crate::containers::EntryMap;

    #[test]
    fn test_variant_selection_by_dim() {
        assert!(matches!(EntryMap::<u32>::for_dim(1), EntryMap::Array(_)));
        assert!(matches!(EntryMap::<u32>::for_dim(3), EntryMap::Array(_)));
        assert!(matches!(EntryMap::<u32>::for_dim(4), EntryMap::Sparse(_)));
        assert!(matches!(EntryMap::<u32>::for_dim(8), EntryMap::Sparse(_)));
        assert!(matches!(EntryMap::<u32>::for_dim(9), EntryMap::Tree(_)));
        assert!(matches!(EntryMap::<u32>::for_dim(20), EntryMap::Tree(_)));
    }

    fn exercise_contract(mut map: EntryMap<u32>) {
        assert!(map.is_empty());

        let (value, inserted) = map.try_emplace_with(5, || 50);
        assert!(inserted && *value == 50);
        let (value, inserted) = map.try_emplace_with(5, || 99);
        assert!(!inserted && *value == 50);
        map.try_emplace_with(1, || 10);
        map.try_emplace_with(7, || 70);
        assert!(map.len() == 3);

        assert!(map.find(1) == Some(&10));
        assert!(map.find(2).is_none());
        *map.find_mut(1).unwrap() = 11;
        assert!(map.find(1) == Some(&11));

        // ordered iteration and lower_bound
        let collected: Vec<_> = map.iter().map(|(pos, value)| (pos, *value)).collect();
        assert!(collected == vec![(1, 11), (5, 50), (7, 70)]);
        assert!(map.lower_bound(0) == Some((1, &11)));
        assert!(map.lower_bound(2) == Some((5, &50)));
        assert!(map.lower_bound(6) == Some((7, &70)));
        assert!(map.lower_bound(8).is_none());

        assert!(map.erase(5) == Some(50));
        assert!(map.erase(5).is_none());
        assert!(map.len() == 2);
        assert!(map.erase(1) == Some(11));
        assert!(map.len() == 1);
        assert!(map.take_sole() == 70);
        assert!(map.is_empty());
    }

    #[test]
    fn test_contract_array() {
        exercise_contract(EntryMap::for_dim(3));
    }

    #[test]
    fn test_contract_sparse() {
        exercise_contract(EntryMap::for_dim(5));
    }

    #[test]
    fn test_contract_tree() {
        exercise_contract(EntryMap::for_dim(10));
    }

    #[test]
    fn test_iter_mut() {
        let mut map = EntryMap::<u32>::for_dim(5);
        map.try_emplace_with(2, || 2);
        map.try_emplace_with(4, || 4);
        for (pos, value) in map.iter_mut() {
            *value += pos as u32 * 10;
        }
        assert!(map.find(2) == Some(&22));
        assert!(map.find(4) == Some(&44));
    }

    #[test]
    fn test_high_addresses_in_tree_variant() {
        // DIM = 20 produces addresses far beyond the flat ranges.
        let mut map = EntryMap::<u32>::for_dim(20);
        let high = (1u64 << 20) - 1;
        map.try_emplace_with(high, || 1);
        map.try_emplace_with(0, || 0);
        assert!(map.lower_bound(1).map(|(pos, _)| pos) == Some(high));
        let order: Vec<_> = map.iter().map(|(pos, _)| pos).collect();
        assert!(order == vec![0, high]);
    }
}

#[cfg(test)]
mod array_map_tests {
    use crate::containers::ArrayMap;

    #[test]
    fn test_occupancy_scan() {
        let mut map = ArrayMap::<i32>::new();
        map.try_emplace_with(0, || 0);
        map.try_emplace_with(3, || 3);
        map.try_emplace_with(7, || 7);
        assert!(map.len() == 3);
        let order: Vec<_> = map.iter().map(|(pos, _)| pos).collect();
        assert!(order == vec![0, 3, 7]);
        assert!(map.lower_bound(4) == Some((7, &7)));
        assert!(map.lower_bound(8).is_none());
    }

    #[test]
    fn test_erase_clears_occupancy() {
        let mut map = ArrayMap::<i32>::new();
        map.try_emplace_with(2, || 2);
        assert!(map.erase(2) == Some(2));
        assert!(map.len() == 0);
        assert!(map.lower_bound(0).is_none());
    }
}
