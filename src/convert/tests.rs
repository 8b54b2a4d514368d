#[cfg(test)]
mod sortable_long_tests {
    use crate::convert::{to_double, to_sortable_long};

    #[test]
    fn test_round_trip() {
        for value in [
            0.0, -0.0, 1.0, -1.0, 0.5, -0.5, 1e300, -1e300, 1e-300, -1e-300,
            f64::MAX, f64::MIN, f64::INFINITY, f64::NEG_INFINITY,
        ] {
            let converted = to_double(to_sortable_long(value));
            assert!(converted == value || (value == 0.0 && converted == 0.0));
            assert!(converted.to_bits() == value.to_bits());
        }
    }

    #[test]
    fn test_order_preservation() {
        let samples = [
            f64::NEG_INFINITY,
            -1e300,
            -1.0,
            -1e-300,
            -0.0,
            0.0,
            1e-300,
            1.0,
            1e300,
            f64::INFINITY,
        ];
        for window in samples.windows(2) {
            assert!(to_sortable_long(window[0]) <= to_sortable_long(window[1]));
        }
        // strictness away from the +/-0 pair
        assert!(to_sortable_long(-1.0) < to_sortable_long(1.0));
        assert!(to_sortable_long(-1e-300) < to_sortable_long(0.0));
    }
}

#[cfg(test)]
mod converter_tests {
    use crate::convert::{Converter, ConverterBoxIeee, ConverterIeee, ConverterNoOp};
    use crate::spatial::{PhBox, PhBoxD};

    #[test]
    fn test_noop_is_identity() {
        let c = ConverterNoOp;
        let key = [1i64, -2, 3];
        assert!(c.pre(&key) == key);
        assert!(c.post(&key) == key);
        let query = PhBox::new([0, 0, 0], [5, 5, 5]);
        assert!(c.pre_query(&query) == query);
    }

    #[test]
    fn test_ieee_round_trip() {
        let c = ConverterIeee;
        let key = [1.5f64, -2.25, 0.0];
        let internal = Converter::<3>::pre(&c, &key);
        assert!(Converter::<3>::post(&c, &internal) == key);
    }

    #[test]
    fn test_ieee_preserves_order_per_dimension() {
        let c = ConverterIeee;
        let low = Converter::<2>::pre(&c, &[-5.0, 1.0]);
        let high = Converter::<2>::pre(&c, &[-4.5, 2.0]);
        assert!(low[0] < high[0] && low[1] < high[1]);
    }

    #[test]
    fn test_box_encoding_layout() {
        let c = ConverterBoxIeee::<2>;
        let key = PhBoxD::new([1.0, 3.0], [9.0, 8.0]);
        let encoded = Converter::<4>::pre(&c, &key);
        let decoded: PhBoxD<2> = Converter::<4>::post(&c, &encoded);
        assert!(decoded == key);
        // low corner occupies the first half of the encoded point
        let lone = Converter::<4>::pre(&c, &PhBoxD::new([1.0, 3.0], [1.0, 3.0]));
        assert!(encoded[0] == lone[0] && encoded[1] == lone[1]);
    }

    #[test]
    fn test_box_intersection_window() {
        let c = ConverterBoxIeee::<2>;
        let query = Converter::<4>::pre_query(&c, &PhBoxD::new([2.0, 4.0], [12.0, 10.0]));
        // low-corner half: unconstrained below, bounded by query max above
        assert!(query.min[0] == i64::MIN && query.min[1] == i64::MIN);
        assert!(query.max[0] == crate::convert::to_sortable_long(12.0));
        assert!(query.max[1] == crate::convert::to_sortable_long(10.0));
        // high-corner half: bounded by query min below, unconstrained above
        assert!(query.min[2] == crate::convert::to_sortable_long(2.0));
        assert!(query.min[3] == crate::convert::to_sortable_long(4.0));
        assert!(query.max[2] == i64::MAX && query.max[3] == i64::MAX);
    }
}
