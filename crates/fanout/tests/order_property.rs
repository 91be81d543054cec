// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property: with arbitrary per-element delays (so arbitrary completion
//! order), every concurrent operation produces exactly the sequential result.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use fanout::{sequential, FanOut};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_time()
        .build()
        .unwrap()
}

fn delayed(input: &[(u32, u8)]) -> Vec<(u32, Duration)> {
    input
        .iter()
        .map(|&(value, delay)| (value, Duration::from_millis(u64::from(delay))))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_map_equals_sequential_map(
        input in prop::collection::vec((any::<u32>(), 0u8..8), 0..24)
    ) {
        let input = delayed(&input);
        let rt = runtime();
        let (concurrent, expected) = rt.block_on(async {
            let concurrent = FanOut::new()
                .map(input.clone(), |(value, delay)| async move {
                    tokio::time::sleep(delay).await;
                    u64::from(value) * 3
                })
                .await;
            let expected = sequential::map(input.clone(), |(value, _)| async move {
                u64::from(value) * 3
            })
            .await;
            (concurrent, expected)
        });
        prop_assert_eq!(concurrent, expected);
    }

    #[test]
    fn concurrent_compact_map_equals_sequential(
        input in prop::collection::vec((any::<u32>(), 0u8..8), 0..24)
    ) {
        let input = delayed(&input);
        let rt = runtime();
        let (concurrent, expected) = rt.block_on(async {
            let concurrent = FanOut::new()
                .compact_map(input.clone(), |(value, delay)| async move {
                    tokio::time::sleep(delay).await;
                    (value % 3 != 0).then_some(value)
                })
                .await;
            let expected = sequential::compact_map(input.clone(), |(value, _)| async move {
                (value % 3 != 0).then_some(value)
            })
            .await;
            (concurrent, expected)
        });
        prop_assert_eq!(concurrent, expected);
    }

    #[test]
    fn concurrent_flat_map_equals_sequential(
        input in prop::collection::vec((0u32..5, 0u8..8), 0..16)
    ) {
        let input = delayed(&input);
        let rt = runtime();
        let (concurrent, expected) = rt.block_on(async {
            let concurrent = FanOut::new()
                .flat_map(input.clone(), |(value, delay)| async move {
                    tokio::time::sleep(delay).await;
                    0..value
                })
                .await;
            let expected =
                sequential::flat_map(input.clone(), |(value, _)| async move { 0..value }).await;
            (concurrent, expected)
        });
        prop_assert_eq!(concurrent, expected);
    }
}
