use eco_topology::allocator::{AllocationError, PriorityBandAllocator};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn prop_ith_call_returns_band_plus_i_minus_one(
        band in 1u32..40_000,
        calls in 1usize..200,
    ) {
        let mut alloc = PriorityBandAllocator::default();
        for i in 1..=calls {
            let priority = alloc.next_priority(band).unwrap();
            prop_assert_eq!(priority, band + u32::try_from(i).unwrap() - 1);
        }
        prop_assert_eq!(alloc.last_issued(band), Some(band + u32::try_from(calls).unwrap() - 1));
    }

    #[test]
    fn prop_distinct_bands_are_independent(
        b1 in 1u32..20_000,
        offset in 200u32..20_000,
        schedule in proptest::collection::vec(any::<bool>(), 1..100),
    ) {
        // Bands at least 200 apart so that neither sequence can reach the other
        let b2 = b1 + offset;
        let mut alloc = PriorityBandAllocator::default();
        let mut first = Vec::new();
        let mut second = Vec::new();

        for pick_first in schedule {
            if pick_first {
                first.push(alloc.next_priority(b1).unwrap());
            } else {
                second.push(alloc.next_priority(b2).unwrap());
            }
        }

        // Each sequence is exactly what it would be on its own
        let expected_first: Vec<u32> = (0..first.len()).map(|i| b1 + u32::try_from(i).unwrap()).collect();
        let expected_second: Vec<u32> = (0..second.len()).map(|i| b2 + u32::try_from(i).unwrap()).collect();
        prop_assert_eq!(&first, &expected_first);
        prop_assert_eq!(&second, &expected_second);

        let a: HashSet<u32> = first.into_iter().collect();
        let b: HashSet<u32> = second.into_iter().collect();
        prop_assert!(a.is_disjoint(&b));
    }

    #[test]
    fn prop_capacity_bounds_each_band(capacity in 1u32..50, band in 1u32..1_000) {
        let mut alloc = PriorityBandAllocator::new(capacity, 50_000);
        for _ in 0..capacity {
            alloc.next_priority(band).unwrap();
        }
        prop_assert_eq!(
            alloc.next_priority(band),
            Err(AllocationError::BandExhausted { band_start: band, capacity })
        );
        prop_assert_eq!(alloc.last_issued(band), Some(band + capacity - 1));
    }
}

#[test]
fn fresh_allocators_do_not_share_state() {
    let mut first_run = PriorityBandAllocator::default();
    first_run.next_priority(100).unwrap();
    first_run.next_priority(100).unwrap();

    let mut second_run = PriorityBandAllocator::default();
    assert_eq!(second_run.next_priority(100), Ok(100));
}

#[test]
fn state_lists_bands_in_order() {
    let mut alloc = PriorityBandAllocator::default();
    alloc.next_priority(300).unwrap();
    alloc.next_priority(100).unwrap();
    alloc.next_priority(100).unwrap();

    let bands: Vec<(u32, u32)> = alloc.state().bands().collect();
    assert_eq!(bands, vec![(100, 101), (300, 300)]);
}
