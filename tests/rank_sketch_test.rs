// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use exact_quantiles::common::RandomSource;
use exact_quantiles::common::XorShift64;
use exact_quantiles::error::ErrorKind;
use exact_quantiles::rank::DEFAULT_K;
use exact_quantiles::rank::MIN_K;
use exact_quantiles::rank::RankSketch;
use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;

fn uniform_values(count: usize, seed: u64) -> Vec<f64> {
    let mut rng = XorShift64::seeded(seed);
    (0..count).map(|_| (rng.next_u64() >> 11) as f64).collect()
}

fn true_rank(sorted: &[f64], value: f64) -> u64 {
    sorted.partition_point(|v| *v < value) as u64
}

#[test]
fn test_k_limits() {
    let _min = RankSketch::<f64>::new(MIN_K);
    let _default = RankSketch::<f64>::new(DEFAULT_K);
}

#[test]
#[should_panic(expected = "k must be in")]
fn test_k_too_small_panics() {
    RankSketch::<f64>::new(MIN_K - 1);
}

#[test]
fn test_empty() {
    let sketch = RankSketch::<f64>::new(DEFAULT_K);
    assert!(sketch.is_empty());
    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.n(), 0);
    assert_eq!(sketch.num_retained(), 0);
    assert!(sketch.min_item().is_none());
    assert!(sketch.max_item().is_none());
    assert!(sketch.bounds_for_rank(0).is_none());
}

#[test]
fn test_one_item() {
    let mut sketch = RankSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    assert!(!sketch.is_empty());
    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.n(), 1);
    assert_eq!(sketch.num_retained(), 1);
    assert_eq!(sketch.min_item().copied(), Some(1.0));
    assert_eq!(sketch.max_item().copied(), Some(1.0));
    assert_eq!(sketch.estimate_rank(&1.0), 0);
    assert_eq!(sketch.estimate_rank(&2.0), 1);
    assert_eq!(sketch.bounds_for_rank(0), Some((1.0, 1.0)));
}

#[test]
fn test_exact_mode_ranks() {
    let mut sketch = RankSketch::<f64>::new(DEFAULT_K);
    let n = DEFAULT_K as usize;
    for i in 0..n {
        sketch.update(i as f64);
    }
    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.num_retained(), n);
    for i in (0..n).step_by(10) {
        assert_eq!(sketch.estimate_rank(&(i as f64)), i as u64);
        let (lo, hi) = sketch.rank_bounds(&(i as f64));
        assert_eq!(lo, i as u64);
        assert_eq!(hi, i as u64);
    }
}

#[test]
fn test_estimation_mode_rank_error() {
    let values = uniform_values(100_000, 11);
    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    let mut sketch = RankSketch::<f64>::seeded(DEFAULT_K, 17);
    for value in &values {
        sketch.update(*value);
    }
    assert!(sketch.is_estimation_mode());
    assert_eq!(sketch.n(), values.len() as u64);

    let eps = sketch.normalized_rank_error();
    let tolerance = 2.0 * eps * values.len() as f64;
    for i in (0..sorted.len()).step_by(1000) {
        let estimate = sketch.estimate_rank(&sorted[i]) as f64;
        let truth = true_rank(&sorted, sorted[i]) as f64;
        assert_that!(estimate, near(truth, tolerance));
    }
}

#[test]
fn test_rank_bounds_contain_true_rank() {
    let values = uniform_values(50_000, 23);
    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    let mut sketch = RankSketch::<f64>::seeded(512, 29);
    for value in &values {
        sketch.update(*value);
    }

    for i in (0..sorted.len()).step_by(5000) {
        let truth = true_rank(&sorted, sorted[i]);
        let (lo, hi) = sketch.rank_bounds(&sorted[i]);
        assert_that!(truth, ge(lo));
        assert_that!(truth, le(hi));
    }
}

#[test]
fn test_bounds_for_rank_contain_true_value() {
    let values = uniform_values(50_000, 31);
    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    let mut sketch = RankSketch::<f64>::seeded(512, 37);
    for value in &values {
        sketch.update(*value);
    }

    for rank in (0..sorted.len() as u64).step_by(5000) {
        let (low, high) = sketch.bounds_for_rank(rank).unwrap();
        let truth = sorted[rank as usize];
        assert!(
            low <= truth && truth <= high,
            "rank {rank}: {truth} outside [{low}, {high}]"
        );
    }
}

#[test]
fn test_min_max_survive_compaction() {
    let values = uniform_values(200_000, 41);
    let mut sketch = RankSketch::<f64>::seeded(128, 43);
    for value in &values {
        sketch.update(*value);
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(sketch.min_item().copied(), Some(min));
    assert_eq!(sketch.max_item().copied(), Some(max));
}

#[test]
fn test_merge_combines_streams() {
    let mut sketch1 = RankSketch::<f64>::seeded(DEFAULT_K, 47);
    let mut sketch2 = RankSketch::<f64>::seeded(DEFAULT_K, 53);
    let n = 10_000;
    for i in 0..n {
        sketch1.update(i as f64);
        sketch2.update((2 * n - i - 1) as f64);
    }

    sketch1.merge(&sketch2);

    assert_eq!(sketch1.n(), (2 * n) as u64);
    assert_eq!(sketch1.min_item().copied(), Some(0.0));
    assert_eq!(sketch1.max_item().copied(), Some((2 * n - 1) as f64));

    let eps = sketch1.normalized_rank_error();
    let total = (2 * n) as f64;
    let estimate = sketch1.estimate_rank(&(n as f64)) as f64;
    assert_that!(estimate, near(n as f64, 3.0 * eps * total));
}

#[test]
fn test_merge_is_commutative_within_tolerance() {
    let left_values = uniform_values(30_000, 59);
    let right_values = uniform_values(30_000, 61);

    let build = |values: &[f64], seed: u64| {
        let mut sketch = RankSketch::<f64>::seeded(DEFAULT_K, seed);
        for value in values {
            sketch.update(*value);
        }
        sketch
    };

    let mut ab = build(&left_values, 67);
    ab.merge(&build(&right_values, 71));
    let mut ba = build(&right_values, 71);
    ba.merge(&build(&left_values, 67));

    assert_eq!(ab.n(), ba.n());
    let eps = ab.normalized_rank_error();
    let tolerance = 3.0 * eps * ab.n() as f64;
    let mut probe = XorShift64::seeded(73);
    for _ in 0..50 {
        let value = (probe.next_u64() >> 11) as f64;
        let rank_ab = ab.estimate_rank(&value) as f64;
        let rank_ba = ba.estimate_rank(&value) as f64;
        assert_that!(rank_ab, near(rank_ba, tolerance));
    }
}

#[test]
fn test_merge_is_associative_within_tolerance() {
    let chunks: Vec<Vec<f64>> = (0..3).map(|i| uniform_values(20_000, 79 + i)).collect();
    let build = |values: &[f64], seed: u64| {
        let mut sketch = RankSketch::<f64>::seeded(DEFAULT_K, seed);
        for value in values {
            sketch.update(*value);
        }
        sketch
    };

    // (a + b) + c
    let mut left = build(&chunks[0], 83);
    left.merge(&build(&chunks[1], 89));
    left.merge(&build(&chunks[2], 97));

    // a + (b + c)
    let mut tail = build(&chunks[1], 89);
    tail.merge(&build(&chunks[2], 97));
    let mut right = build(&chunks[0], 83);
    right.merge(&tail);

    assert_eq!(left.n(), right.n());
    let tolerance = 3.0 * left.normalized_rank_error() * left.n() as f64;
    let mut probe = XorShift64::seeded(101);
    for _ in 0..50 {
        let value = (probe.next_u64() >> 11) as f64;
        assert_that!(
            left.estimate_rank(&value) as f64,
            near(right.estimate_rank(&value) as f64, tolerance)
        );
    }
}

#[test]
fn test_merge_empty_is_identity() {
    let mut sketch = RankSketch::<f64>::seeded(DEFAULT_K, 103);
    for i in 0..1000 {
        sketch.update(i as f64);
    }
    let before = sketch.estimate_rank(&500.0);
    sketch.merge(&RankSketch::<f64>::new(DEFAULT_K));
    assert_eq!(sketch.n(), 1000);
    assert_eq!(sketch.estimate_rank(&500.0), before);
}

#[test]
fn test_serialization_round_trip() {
    let mut sketch = RankSketch::<i64>::seeded(64, 107);
    for i in 0..50_000i64 {
        sketch.update(i * 3 - 1000);
    }

    let bytes = sketch.serialize();
    let restored = RankSketch::<i64>::deserialize(&bytes).unwrap();

    assert_eq!(restored.k(), sketch.k());
    assert_eq!(restored.n(), sketch.n());
    assert_eq!(restored.num_retained(), sketch.num_retained());
    assert_eq!(restored.min_item(), sketch.min_item());
    assert_eq!(restored.max_item(), sketch.max_item());
    for probe in [-1000i64, 0, 5000, 75_000, 150_000] {
        assert_eq!(restored.estimate_rank(&probe), sketch.estimate_rank(&probe));
    }
}

#[test]
fn test_serialization_round_trip_empty() {
    let sketch = RankSketch::<f64>::new(DEFAULT_K);
    let bytes = sketch.serialize();
    let restored = RankSketch::<f64>::deserialize(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.k(), DEFAULT_K);
}

#[test]
fn test_deserialize_rejects_truncated_input() {
    let mut sketch = RankSketch::<f64>::seeded(64, 109);
    for i in 0..10_000 {
        sketch.update(i as f64);
    }
    let bytes = sketch.serialize();
    let err = RankSketch::<f64>::deserialize(&bytes[..bytes.len() / 2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}

#[test]
fn test_deserialize_rejects_wrong_family() {
    let mut sketch = RankSketch::<f64>::new(64);
    sketch.update(1.0);
    let mut bytes = sketch.serialize();
    bytes[1] = 0xff;
    let err = RankSketch::<f64>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}

#[test]
fn test_deserialize_rejects_item_size_mismatch() {
    let mut sketch = RankSketch::<f64>::new(64);
    sketch.update(1.0);
    let bytes = sketch.serialize();
    let err = RankSketch::<f32>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}
