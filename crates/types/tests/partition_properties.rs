use proptest::prelude::*;
use skiload_types::{partition_skiers, TriggerFraction};

// Every id in [1, total] must land in exactly one worker range.

proptest! {
    #[test]
    fn partition_covers_population_exactly_once(
        threads in 1usize..=256,
        extra in 0u32..=50_000,
    ) {
        let total = threads as u32 + extra;
        let ranges = partition_skiers(total, threads).unwrap();

        prop_assert_eq!(ranges.len(), threads);
        prop_assert_eq!(*ranges[0].start(), 1);
        prop_assert_eq!(*ranges[threads - 1].end(), total);

        for window in ranges.windows(2) {
            prop_assert_eq!(*window[0].end() + 1, *window[1].start());
        }

        let covered: u64 = ranges
            .iter()
            .map(|range| (*range.end() - *range.start() + 1) as u64)
            .sum();
        prop_assert_eq!(covered, total as u64);
    }
}

proptest! {
    #[test]
    fn non_final_ranges_have_equal_width(
        threads in 2usize..=64,
        total in 64u32..=50_000,
    ) {
        let ranges = partition_skiers(total, threads).unwrap();
        let width = total / threads as u32;
        for range in &ranges[..threads - 1] {
            prop_assert_eq!(*range.end() - *range.start() + 1, width);
        }
    }
}

proptest! {
    #[test]
    fn trigger_count_is_ceiling_of_a_tenth(threads in 1usize..=10_000) {
        let count = TriggerFraction::ONE_TENTH.trigger_count(threads);
        prop_assert!(count >= 1);
        prop_assert!(count * 10 >= threads);
        prop_assert!((count - 1) * 10 < threads);
    }
}
