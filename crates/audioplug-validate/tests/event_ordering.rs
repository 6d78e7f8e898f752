mod common;

use audioplug_sdk::{Event, ProcessSetup};
use audioplug_validate::{Category, ContractChecker, FindingLog};
use common::synth_layout;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const BLOCK: usize = 512;

fn checker() -> (FindingLog, ContractChecker) {
    let log = FindingLog::new();
    let mut checker = ContractChecker::new(log.clone(), synth_layout());
    checker.configure(ProcessSetup::new(44_100.0, BLOCK));
    (log, checker)
}

/// Strictly increasing offsets inside the block.
fn offsets() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::btree_set(0..BLOCK as i32, 2..64)
        .prop_map(|set| set.into_iter().collect())
}

fn notes(offsets: &[i32]) -> Vec<Event> {
    offsets
        .iter()
        .enumerate()
        .map(|(index, &offset)| Event::note_on(offset, (index % 16) as i16, 60, 0.8))
        .collect()
}

proptest! {
    #[test]
    fn increasing_offsets_are_clean(offsets in offsets()) {
        let (log, mut checker) = checker();
        checker.check_events(&notes(&offsets), BLOCK);
        prop_assert!(log.is_empty(), "{:?}", log.findings());
    }

    #[test]
    fn one_adjacent_swap_is_one_finding(
        (offsets, swap) in offsets().prop_flat_map(|offsets| {
            let pairs = offsets.len() - 1;
            (Just(offsets), 0..pairs)
        })
    ) {
        let (log, mut checker) = checker();
        let mut events = notes(&offsets);
        events.swap(swap, swap + 1);
        checker.check_events(&events, BLOCK);
        prop_assert_eq!(log.len(), 1);
        prop_assert_eq!(log.count(Category::EventOutOfOrder), 1);
    }
}

#[test]
fn equal_offsets_keep_their_order() {
    let (log, mut checker) = checker();
    let events = [
        Event::note_on(10, 0, 60, 1.0),
        Event::note_off(10, 0, 60),
        Event::note_on(10, 0, 64, 1.0),
    ];
    checker.check_events(&events, BLOCK);
    assert_eq!(log.len(), 0);
}
