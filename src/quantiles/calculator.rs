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

use super::sketch::QuantilesItem;

/// Weighted sorted view over the retained items, used to answer quantile
/// lookups.
///
/// Built in three steps: collect `(item, weight)` pairs from the base buffer
/// and the occupied levels, sort by item, then replace each weight with a
/// running sum. The inclusive variant stores the sum through the entry
/// itself; the exclusive variant stores the sum of the entries strictly
/// before it, which places the mass of a tie on the first tied item instead
/// of the last.
pub(crate) struct QuantileCalculator<T> {
    entries: Vec<(T, u64)>,
    total_weight: u64,
    inclusive: bool,
}

impl<T: QuantilesItem> QuantileCalculator<T> {
    pub fn new(num_retained: usize) -> Self {
        Self {
            entries: Vec::with_capacity(num_retained),
            total_weight: 0,
            inclusive: true,
        }
    }

    pub fn add(&mut self, items: &[T], weight: u64) {
        for item in items {
            self.entries.push((item.clone(), weight));
        }
    }

    pub fn convert_to_cumulative(&mut self, inclusive: bool) {
        self.entries.sort_by(|a, b| T::cmp(&a.0, &b.0));
        let mut subtotal = 0u64;
        for entry in &mut self.entries {
            let new_subtotal = subtotal + entry.1;
            entry.1 = if inclusive { new_subtotal } else { subtotal };
            subtotal = new_subtotal;
        }
        self.total_weight = subtotal;
        self.inclusive = inclusive;
    }

    /// Looks up the quantile for a normalized rank in [0, 1].
    ///
    /// Callers must have fed at least one item and converted to cumulative
    /// weights.
    pub fn quantile(&self, rank: f64) -> &T {
        debug_assert!(!self.entries.is_empty(), "calculator has no entries");
        let target = rank * self.total_weight as f64;
        let idx = if self.inclusive {
            // smallest entry whose cumulative weight reaches the target
            self.lower_bound_by_weight(target)
        } else {
            // largest entry whose preceding weight does not exceed the target
            self.upper_bound_by_weight(target).saturating_sub(1)
        };
        let idx = idx.min(self.entries.len() - 1);
        &self.entries[idx].0
    }

    fn lower_bound_by_weight(&self, target: f64) -> usize {
        let mut left = 0usize;
        let mut right = self.entries.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if (self.entries[mid].1 as f64) < target {
                left = mid + 1;
            } else {
                right = mid;
            }
        }
        left
    }

    fn upper_bound_by_weight(&self, target: f64) -> usize {
        let mut left = 0usize;
        let mut right = self.entries.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if (self.entries[mid].1 as f64) > target {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        left
    }
}
