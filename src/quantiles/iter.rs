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

use std::cell::Ref;

/// Iterator over the retained items of a quantiles sketch.
///
/// Yields `(item, weight)` pairs: the base buffer first at weight 1, then
/// each occupied level in order at weight `2^(level + 1)`. Unoccupied levels
/// are skipped but still double the weight. The iterator borrows the sketch,
/// so the sketch cannot be mutated while an iterator is alive.
pub struct QuantilesSketchIter<'a, T> {
    pub(super) base_buffer: Ref<'a, Vec<T>>,
    pub(super) levels: &'a [Vec<T>],
    pub(super) level: Option<usize>,
    pub(super) index: usize,
    pub(super) weight: u64,
}

impl<T: Clone> Iterator for QuantilesSketchIter<'_, T> {
    type Item = (T, u64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.level {
                None => {
                    if self.index < self.base_buffer.len() {
                        let item = self.base_buffer[self.index].clone();
                        self.index += 1;
                        return Some((item, self.weight));
                    }
                    self.level = Some(0);
                    self.index = 0;
                    self.weight *= 2;
                }
                Some(level) => {
                    if level >= self.levels.len() {
                        return None;
                    }
                    if self.index < self.levels[level].len() {
                        let item = self.levels[level][self.index].clone();
                        self.index += 1;
                        return Some((item, self.weight));
                    }
                    self.level = Some(level + 1);
                    self.index = 0;
                    self.weight *= 2;
                }
            }
        }
    }
}
