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

use sketches::error::ErrorKind;
use sketches::quantiles::DEFAULT_K;
use sketches::quantiles::QuantilesSketch;

fn assert_approx_eq(actual: f64, expected: f64, tolerance: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}

fn weight_total(sketch: &QuantilesSketch<f64>) -> u64 {
    sketch.iter().map(|(_, weight)| weight).sum()
}

#[test]
fn test_merge_disjoint_ranges() {
    let mut sketch1 = QuantilesSketch::<f64>::new(DEFAULT_K).unwrap();
    let mut sketch2 = QuantilesSketch::<f64>::new(DEFAULT_K).unwrap();
    let n = 10_000;
    for i in 0..n {
        sketch1.update(i as f64);
        sketch2.update((2 * n - i - 1) as f64);
    }

    sketch1.merge(&sketch2).unwrap();

    assert_eq!(sketch1.n(), (2 * n) as u64);
    assert_eq!(sketch1.min_value().unwrap(), &0.0);
    assert_eq!(sketch1.max_value().unwrap(), &((2 * n - 1) as f64));
    assert_eq!(weight_total(&sketch1), (2 * n) as u64);

    let rank_eps = sketch1.normalized_rank_error(false);
    let median = sketch1.quantile(0.5, true).unwrap();
    assert_approx_eq(median, n as f64, 2.0 * n as f64 * rank_eps);
}

#[test]
fn test_merge_empty_source_is_noop() {
    let mut sketch1 = QuantilesSketch::<f64>::new(DEFAULT_K).unwrap();
    for i in 0..100 {
        sketch1.update(i as f64);
    }
    let sketch2 = QuantilesSketch::<f64>::new(DEFAULT_K).unwrap();
    let before: Vec<(f64, u64)> = sketch1.iter().collect();

    sketch1.merge(&sketch2).unwrap();

    assert_eq!(sketch1.n(), 100);
    let after: Vec<(f64, u64)> = sketch1.iter().collect();
    assert_eq!(before, after);
}

#[test]
fn test_merge_into_empty_target() {
    let mut sketch1 = QuantilesSketch::<f64>::new(8).unwrap();
    let mut sketch2 = QuantilesSketch::<f64>::new(8).unwrap();
    for i in 0..100 {
        sketch2.update(i as f64);
    }

    sketch1.merge(&sketch2).unwrap();

    assert_eq!(sketch1.n(), 100);
    assert_eq!(sketch1.min_value().unwrap(), &0.0);
    assert_eq!(sketch1.max_value().unwrap(), &99.0);
    assert_eq!(weight_total(&sketch1), 100);
    // bit pattern invariant: retained = n mod 2k + k * popcount(n / 2k)
    let expected_retained = 100 % 16 + 8 * (100u64 / 16).count_ones() as usize;
    assert_eq!(sketch1.num_retained(), expected_retained);
}

#[test]
fn test_merge_exact_mode_sketches() {
    let mut sketch1 = QuantilesSketch::<f64>::new(8).unwrap();
    let mut sketch2 = QuantilesSketch::<f64>::new(8).unwrap();
    for i in 0..5 {
        sketch1.update(i as f64);
    }
    for i in 5..12 {
        sketch2.update(i as f64);
    }

    sketch1.merge(&sketch2).unwrap();

    assert_eq!(sketch1.n(), 12);
    assert_eq!(sketch1.num_retained(), 12);
    assert_eq!(sketch1.rank(&5.0, true), 6.0 / 12.0);
    assert_eq!(sketch1.quantile(0.0, true).unwrap(), 0.0);
    assert_eq!(sketch1.quantile(1.0, true).unwrap(), 11.0);
}

#[test]
fn test_merge_min_max_come_from_levels() {
    // the source's extremes live in its levels, not its base buffer, so the
    // merge must take them from the tracked min/max
    let mut sketch1 = QuantilesSketch::<f64>::new(8).unwrap();
    sketch1.update(500.0);
    let mut sketch2 = QuantilesSketch::<f64>::new(8).unwrap();
    for i in 0..64 {
        sketch2.update(i as f64);
    }

    sketch1.merge(&sketch2).unwrap();

    assert_eq!(sketch1.n(), 65);
    assert_eq!(sketch1.min_value().unwrap(), &0.0);
    assert_eq!(sketch1.max_value().unwrap(), &500.0);
}

#[test]
fn test_merge_preserves_invariants_across_sizes() {
    let k = 8u16;
    let two_k = 2 * k as u64;
    for n1 in [0u64, 3, 16, 40, 100] {
        for n2 in [0u64, 7, 16, 33, 250] {
            let mut sketch1 = QuantilesSketch::<f64>::new(k).unwrap();
            let mut sketch2 = QuantilesSketch::<f64>::new(k).unwrap();
            for i in 0..n1 {
                sketch1.update(i as f64);
            }
            for i in 0..n2 {
                sketch2.update((1000 + i) as f64);
            }

            sketch1.merge(&sketch2).unwrap();

            let n = n1 + n2;
            assert_eq!(sketch1.n(), n, "n1 = {n1}, n2 = {n2}");
            assert_eq!(weight_total(&sketch1), n, "n1 = {n1}, n2 = {n2}");
            let expected_retained = (n % two_k) + k as u64 * (n / two_k).count_ones() as u64;
            assert_eq!(
                sketch1.num_retained() as u64,
                expected_retained,
                "n1 = {n1}, n2 = {n2}"
            );
        }
    }
}

#[test]
fn test_merge_downsamples_higher_resolution_source() {
    let mut sketch1 = QuantilesSketch::<f64>::new(64).unwrap();
    let mut sketch2 = QuantilesSketch::<f64>::new(256).unwrap();
    let n = 10_000;
    for i in 0..n {
        sketch1.update(i as f64);
        sketch2.update((2 * n - i - 1) as f64);
    }

    sketch1.merge(&sketch2).unwrap();

    assert_eq!(sketch1.k(), 64);
    assert_eq!(sketch1.n(), (2 * n) as u64);
    assert_eq!(weight_total(&sketch1), (2 * n) as u64);
    assert_eq!(sketch1.min_value().unwrap(), &0.0);
    assert_eq!(sketch1.max_value().unwrap(), &((2 * n - 1) as f64));

    let rank_eps = sketch1.normalized_rank_error(false);
    let median = sketch1.quantile(0.5, true).unwrap();
    assert_approx_eq(median, n as f64, 2.0 * n as f64 * rank_eps);
}

#[test]
fn test_merge_incompatible_k() {
    let coarse = {
        let mut sketch = QuantilesSketch::<f64>::new(64).unwrap();
        sketch.update(1.0);
        sketch
    };
    let odd_ratio = {
        let mut sketch = QuantilesSketch::<f64>::new(192).unwrap();
        sketch.update(1.0);
        sketch
    };

    // a coarser source cannot be raised to a finer resolution
    let mut fine = QuantilesSketch::<f64>::new(128).unwrap();
    fine.update(2.0);
    let err = fine.merge(&coarse).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // a non-power-of-two ratio cannot be strided down
    let mut target = QuantilesSketch::<f64>::new(64).unwrap();
    target.update(2.0);
    let err = target.merge(&odd_ratio).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(target.n(), 1, "a failed merge must leave the target unchanged");
}

#[test]
fn test_repeated_merges_accumulate() {
    let mut target = QuantilesSketch::<f64>::new(32).unwrap();
    for chunk in 0..10 {
        let mut source = QuantilesSketch::<f64>::new(32).unwrap();
        for i in 0..1000 {
            source.update((chunk * 1000 + i) as f64);
        }
        target.merge(&source).unwrap();
    }

    assert_eq!(target.n(), 10_000);
    assert_eq!(weight_total(&target), 10_000);
    assert_eq!(target.min_value().unwrap(), &0.0);
    assert_eq!(target.max_value().unwrap(), &9999.0);

    let rank_eps = target.normalized_rank_error(false);
    assert_approx_eq(target.rank(&5000.0, false), 0.5, 2.0 * rank_eps);
}
