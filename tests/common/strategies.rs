use proptest::prelude::*;

/// Event counts, including the empty request
pub fn event_count_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(0usize), 1usize..=20_000]
}

/// Batch capacities from a single event up to a few thousand
pub fn capacity_strategy() -> impl Strategy<Value = usize> {
    1usize..=4_096
}

/// Payload sizes that fit a 1 MiB batch at least once
pub fn payload_size_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1000usize), Just(1_048_576usize), 16usize..=65_536]
}

/// Sets of zero-based positions that should fail within a group of `len`
pub fn failing_positions_strategy(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(0..len.max(1), 0..=len)
        .prop_map(|set| set.into_iter().collect())
}
