#![allow(non_snake_case)]

use proptest::prelude::*;
use roll_under::{
    Multiplier,
    SCALE,
    build_table,
    outcome::TableError,
    slip::BetSlip,
    win_multiplier,
};

prop_compose! {
    fn die_and_threshold()(side_count in 2u32..=1_000)(
        side_count in Just(side_count),
        threshold in 1..side_count,
    ) -> (u32, u32) {
        (side_count, threshold)
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn build_table__wins_exactly_below_threshold((side_count, threshold) in die_and_threshold()) {
        let table = build_table(threshold, side_count).unwrap();
        let multiplier = table.win_multiplier().scaled();

        prop_assert_eq!(table.len(), side_count as usize);
        prop_assert!(multiplier > 0);
        for (i, entry) in table.entries().iter().enumerate() {
            if (i as u32) < threshold {
                prop_assert_eq!(*entry, multiplier);
            } else {
                prop_assert_eq!(*entry, 0);
            }
        }
    }

    #[test]
    fn build_table__total_never_exceeds_fair_value((side_count, threshold) in die_and_threshold()) {
        let table = build_table(threshold, side_count).unwrap();
        let fair = u64::from(side_count) * SCALE;

        prop_assert!(table.total() <= fair);
        prop_assert!(table.total() > fair - u64::from(threshold));
        prop_assert!(table.total() > fair - u64::from(side_count));
        prop_assert!(table.expected_value() <= 1.0);
    }

    #[test]
    fn win_multiplier__matches_floor_division((side_count, threshold) in die_and_threshold()) {
        let expected = u64::from(side_count) * SCALE / u64::from(threshold);

        prop_assert_eq!(
            win_multiplier(threshold, side_count),
            Ok(Multiplier::from_scaled(expected))
        );
    }

    #[test]
    fn build_table__out_of_range_threshold__rejected(side_count in 2u32..=1_000, extra in 0u32..50) {
        let zero = build_table(0, side_count);
        let too_high = build_table(side_count + extra, side_count);

        prop_assert_eq!(
            zero,
            Err(TableError::InvalidThreshold { threshold: 0, side_count })
        );
        prop_assert_eq!(
            too_high,
            Err(TableError::InvalidThreshold { threshold: side_count + extra, side_count })
        );
    }

    #[test]
    fn set_threshold__any_raw_value__lands_inside_slider(raw in any::<i64>()) {
        let mut slip = BetSlip::new(100, 95, 50, 1_000, None).unwrap();

        slip.set_threshold(raw).unwrap();

        prop_assert!((1..=95).contains(&slip.threshold()));
        prop_assert_eq!(slip.table().threshold(), slip.threshold());
    }
}

#[test]
fn build_table__hundred_sided_reference_points() {
    assert_eq!(build_table(50, 100).unwrap().win_multiplier().scaled(), 20_000);
    assert_eq!(build_table(1, 100).unwrap().win_multiplier().scaled(), 1_000_000);
    assert_eq!(build_table(99, 100).unwrap().win_multiplier().scaled(), 10_101);
    assert_eq!(build_table(3, 100).unwrap().win_multiplier().to_string(), "33.33x");
}
