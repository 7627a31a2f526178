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

use std::cell::RefCell;
use std::cmp::Ordering;
use std::io::Read;
use std::io::Write;

use super::DEFAULT_K;
use super::MAX_K;
use super::MIN_K;
use super::calculator::QuantileCalculator;
use super::helper::compute_base_buffer_items;
use super::helper::compute_bit_pattern;
use super::helper::compute_levels_needed;
use super::helper::compute_retained_items;
use super::helper::lowest_zero_bit_starting_at;
use super::iter::QuantilesSketchIter;
use super::serde::ItemSerde;
use super::serialization::DATA_START;
use super::serialization::EMPTY_SIZE_BYTES;
use super::serialization::FLAG_IS_COMPACT;
use super::serialization::FLAG_IS_EMPTY;
use super::serialization::FLAG_IS_SORTED;
use super::serialization::PREAMBLE_LONGS_FULL;
use super::serialization::PREAMBLE_LONGS_SHORT;
use super::serialization::SERIAL_VERSION;
use super::serialization::check_header_validity;
use super::serialization::check_serial_version;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::common::random::random_bit;
use crate::common::random::random_stride_offset;
use crate::error::Error;

/// Capability trait for item types stored in a [`QuantilesSketch`]: a total
/// order plus the validity predicate applied on update.
pub trait QuantilesItem: Clone {
    /// Compare two items.
    fn cmp(a: &Self, b: &Self) -> Ordering;

    /// Returns true if the item is NaN. Such items are silently dropped on
    /// update.
    fn is_nan(_value: &Self) -> bool {
        false
    }
}

/// Classic quantiles sketch for estimating quantiles and ranks.
///
/// See the [quantiles module level documentation](crate::quantiles) for more.
#[derive(Debug, Clone)]
pub struct QuantilesSketch<T: QuantilesItem> {
    k: u16,
    n: u64,
    bit_pattern: u64,
    // RefCell so quantile queries can sort the base buffer lazily behind a
    // shared reference; the sorted flag is not flipped by that sort.
    base_buffer: RefCell<Vec<T>>,
    levels: Vec<Vec<T>>,
    min_value: Option<T>,
    max_value: Option<T>,
    is_sorted: bool,
}

/// Sorted buffer carried into a level during ripple-carry propagation.
enum CarryBuf<T> {
    /// 2k items, halved into the target level by [`zip_buffer`].
    Zip(Vec<T>),
    /// k items, moved into the target level as-is.
    Move(Vec<T>),
}

impl<T: QuantilesItem> Default for QuantilesSketch<T> {
    fn default() -> Self {
        Self::new(DEFAULT_K).expect("DEFAULT_K is in range")
    }
}

impl<T: QuantilesItem> QuantilesSketch<T> {
    /// Creates a new sketch with the given value of k.
    ///
    /// Fails with `InvalidArgument` when k is outside [MIN_K, MAX_K]. k
    /// should be a power of two for the published error bounds to hold.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sketches::quantiles::QuantilesSketch;
    /// let sketch = QuantilesSketch::<f64>::new(128).unwrap();
    /// assert_eq!(sketch.k(), 128);
    /// ```
    pub fn new(k: u16) -> Result<Self, Error> {
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::invalid_argument(format!(
                "k must be in [{MIN_K}, {MAX_K}], got {k}"
            )));
        }
        Ok(Self {
            k,
            n: 0,
            bit_pattern: 0,
            base_buffer: RefCell::new(Vec::with_capacity(2 * MIN_K.min(k) as usize)),
            levels: Vec::new(),
            min_value: None,
            max_value: None,
            is_sorted: true,
        })
    }

    /// Returns parameter k used to configure this sketch.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns the length of the input stream so far.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns true if the sketch has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true if the sketch is in estimation mode, i.e. at least one
    /// level has been filled.
    pub fn is_estimation_mode(&self) -> bool {
        self.bit_pattern != 0
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        compute_retained_items(self.k, self.n) as usize
    }

    /// Returns the minimum item seen by the sketch, or `EmptySketch`.
    pub fn min_value(&self) -> Result<&T, Error> {
        self.min_value
            .as_ref()
            .ok_or_else(|| Error::empty_sketch("the sketch has seen no data"))
    }

    /// Returns the maximum item seen by the sketch, or `EmptySketch`.
    pub fn max_value(&self) -> Result<&T, Error> {
        self.max_value
            .as_ref()
            .ok_or_else(|| Error::empty_sketch("the sketch has seen no data"))
    }

    /// Returns the normalized rank error bound for this sketch, as a
    /// fraction of n.
    ///
    /// The `pmf` variant bounds the error of [`Self::pmf`] buckets; the
    /// other bounds single rank and quantile queries.
    pub fn normalized_rank_error(&self, pmf: bool) -> f64 {
        Self::normalized_rank_error_for_k(self.k, pmf)
    }

    /// Returns the normalized rank error bound for a given k.
    pub fn normalized_rank_error_for_k(k: u16, pmf: bool) -> f64 {
        let k = k as f64;
        if pmf {
            1.854 / k.powf(0.9657)
        } else {
            1.576 / k.powf(0.9726)
        }
    }

    /// Updates the sketch with a new item.
    ///
    /// NaN values are ignored for floating-point item types.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sketches::quantiles::QuantilesSketch;
    /// let mut sketch = QuantilesSketch::<f64>::new(128).unwrap();
    /// sketch.update(1.0);
    /// sketch.update(2.0);
    /// assert_eq!(sketch.n(), 2);
    /// ```
    pub fn update(&mut self, item: T) {
        if T::is_nan(&item) {
            return;
        }
        self.update_min_max(&item);
        self.grow_base_buffer_if_needed();
        let base_buffer = self.base_buffer.get_mut();
        base_buffer.push(item);
        self.n += 1;
        if base_buffer.len() > 1 {
            self.is_sorted = false;
        }
        let is_full = base_buffer.len() == 2 * self.k as usize;
        if is_full {
            self.process_full_base_buffer();
        }
    }

    /// Merges another sketch into this one.
    ///
    /// The source must have the same k, or a larger k that is a power-of-two
    /// multiple of this one (its levels are then strided down before the
    /// carry). Anything else fails with `InvalidArgument`.
    pub fn merge(&mut self, other: &QuantilesSketch<T>) -> Result<(), Error> {
        if other.is_empty() {
            return Ok(());
        }
        if self.k == other.k {
            self.merge_same_resolution(other);
            return Ok(());
        }
        if other.k > self.k && other.k % self.k == 0 && (other.k / self.k).is_power_of_two() {
            self.merge_higher_resolution(other);
            return Ok(());
        }
        Err(Error::invalid_argument(format!(
            "incompatible k for merge: target {} cannot absorb source {}",
            self.k, other.k
        )))
    }

    /// Returns the quantile for a normalized rank in [0, 1].
    ///
    /// Rank 0 returns the minimum item and rank 1 the maximum, exactly.
    /// May sort the base buffer in place as a side effect.
    pub fn quantile(&self, rank: f64, inclusive: bool) -> Result<T, Error> {
        let (min_value, max_value) = self.min_max()?;
        if rank == 0.0 {
            return Ok(min_value.clone());
        }
        if rank == 1.0 {
            return Ok(max_value.clone());
        }
        if !(0.0..=1.0).contains(&rank) {
            return Err(Error::invalid_argument(
                "rank cannot be less than zero or greater than 1.0",
            ));
        }
        Ok(self.quantile_calculator(inclusive).quantile(rank).clone())
    }

    /// Returns the quantiles for a set of normalized ranks, building the
    /// internal calculator at most once.
    ///
    /// An empty sketch yields an empty vector.
    pub fn quantiles(&self, ranks: &[f64], inclusive: bool) -> Result<Vec<T>, Error> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let (min_value, max_value) = self.min_max()?;
        let mut calculator: Option<QuantileCalculator<T>> = None;
        let mut quantiles = Vec::with_capacity(ranks.len());
        for &rank in ranks {
            if !(0.0..=1.0).contains(&rank) {
                return Err(Error::invalid_argument(
                    "rank cannot be less than zero or greater than 1.0",
                ));
            }
            if rank == 0.0 {
                quantiles.push(min_value.clone());
            } else if rank == 1.0 {
                quantiles.push(max_value.clone());
            } else {
                let calculator =
                    calculator.get_or_insert_with(|| self.quantile_calculator(inclusive));
                quantiles.push(calculator.quantile(rank).clone());
            }
        }
        Ok(quantiles)
    }

    /// Returns `num` quantiles at evenly spaced ranks from 0 to 1.
    ///
    /// An empty sketch yields an empty vector; `num == 0` fails with
    /// `InvalidArgument`.
    pub fn evenly_spaced_quantiles(&self, num: u32, inclusive: bool) -> Result<Vec<T>, Error> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if num == 0 {
            return Err(Error::invalid_argument("number of quantiles must be > 0"));
        }
        let mut fractions = vec![0.0f64; num as usize];
        for (i, fraction) in fractions.iter_mut().enumerate().skip(1) {
            *fraction = i as f64 / (num - 1) as f64;
        }
        if num > 1 {
            fractions[num as usize - 1] = 1.0;
        }
        self.quantiles(&fractions, inclusive)
    }

    /// Returns the normalized rank of the given value, or NaN on an empty
    /// sketch.
    ///
    /// Does not sort the base buffer.
    pub fn rank(&self, value: &T, inclusive: bool) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let mut total = 0u64;
        let mut weight = 1u64;
        for item in self.base_buffer.borrow().iter() {
            if counts_toward_rank(item, value, inclusive) {
                total += weight;
            }
        }
        weight *= 2;
        for level in &self.levels {
            if !level.is_empty() {
                for item in level {
                    if counts_toward_rank(item, value, inclusive) {
                        total += weight;
                    } else {
                        break; // levels are sorted, no point comparing further
                    }
                }
            }
            weight *= 2;
        }
        total as f64 / self.n as f64
    }

    /// Returns the approximate CDF at the given split points.
    ///
    /// Split points must be unique, strictly increasing and non-NaN. The
    /// result has one more entry than `split_points` and always ends at 1.0.
    pub fn cdf(&self, split_points: &[T], inclusive: bool) -> Result<Vec<f64>, Error> {
        check_split_points(split_points)?;
        let mut buckets = Vec::with_capacity(split_points.len() + 1);
        for point in split_points {
            buckets.push(self.rank(point, inclusive));
        }
        buckets.push(1.0);
        Ok(buckets)
    }

    /// Returns the approximate PMF between the given split points.
    pub fn pmf(&self, split_points: &[T], inclusive: bool) -> Result<Vec<f64>, Error> {
        let mut buckets = self.cdf(split_points, inclusive)?;
        for i in (1..buckets.len()).rev() {
            buckets[i] -= buckets[i - 1];
        }
        Ok(buckets)
    }

    /// Returns an iterator over the retained items and their weights.
    pub fn iter(&self) -> QuantilesSketchIter<'_, T> {
        QuantilesSketchIter {
            base_buffer: self.base_buffer.borrow(),
            levels: &self.levels,
            level: None,
            index: 0,
            weight: 1,
        }
    }

    /// Returns the number of bytes [`Self::serialize_with`] will produce.
    pub fn serialized_size_bytes_with<S: ItemSerde<T>>(&self, serde: &S) -> usize {
        if self.is_empty() {
            return EMPTY_SIZE_BYTES;
        }
        if let Some(item_size) = serde.fixed_size() {
            return DATA_START + (self.num_retained() + 2) * item_size;
        }
        let mut size = DATA_START;
        if let Some(min_value) = &self.min_value {
            size += serde.size_of_item(min_value);
        }
        if let Some(max_value) = &self.max_value {
            size += serde.size_of_item(max_value);
        }
        for (item, _weight) in self.iter() {
            size += serde.size_of_item(&item);
        }
        size
    }

    /// Serializes the sketch to bytes using the provided item serializer.
    pub fn serialize_with<S: ItemSerde<T>>(&self, serde: &S) -> Vec<u8> {
        let size = self.serialized_size_bytes_with(serde);
        let mut bytes = SketchBytes::with_capacity(size);

        let preamble_longs = if self.is_empty() {
            PREAMBLE_LONGS_SHORT
        } else {
            PREAMBLE_LONGS_FULL
        };
        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::QUANTILES.id);
        // empty, sorted, compact are the valid flags; writes are always compact
        let flags = (if self.is_empty() { FLAG_IS_EMPTY } else { 0 })
            | (if self.is_sorted { FLAG_IS_SORTED } else { 0 })
            | FLAG_IS_COMPACT;
        bytes.write_u8(flags);
        bytes.write_u16_le(self.k);
        bytes.write_u16_le(0);

        if self.is_empty() {
            return bytes.into_bytes();
        }

        bytes.write_u64_le(self.n);
        if let Some(min_value) = &self.min_value {
            bytes.write(&serde.serialize_items(std::slice::from_ref(min_value)));
        }
        if let Some(max_value) = &self.max_value {
            bytes.write(&serde.serialize_items(std::slice::from_ref(max_value)));
        }
        let base_buffer = self.base_buffer.borrow();
        if !base_buffer.is_empty() {
            bytes.write(&serde.serialize_items(&base_buffer[..]));
        }
        for level in &self.levels {
            if !level.is_empty() {
                bytes.write(&serde.serialize_items(level));
            }
        }

        debug_assert_eq!(bytes.len(), size, "size estimate out of sync with payload");
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes using the provided item serializer.
    ///
    /// Accepts serialization versions 1, 2 and 3; trailing bytes past the
    /// payload the header implies are ignored.
    pub fn deserialize_with<S: ItemSerde<T>>(bytes: &[u8], serde: &S) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);

        let preamble_longs = cursor.read_u8().map_err(make_error("preamble_longs"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let k = cursor.read_u16_le().map_err(make_error("k"))?;
        let _unused = cursor.read_u16_le().map_err(make_error("unused"))?;

        check_serial_version(serial_version)?;
        Family::QUANTILES.validate_id(family_id)?;
        check_header_validity(preamble_longs, flags, serial_version)?;
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::deserial(format!("k out of range: {k}")));
        }

        let is_empty = flags & FLAG_IS_EMPTY != 0;
        if is_empty {
            return Self::new(k);
        }

        let n = cursor.read_u64_le().map_err(make_error("n"))?;
        let is_compact = flags & FLAG_IS_COMPACT != 0;
        let is_sorted = flags & FLAG_IS_SORTED != 0;

        let min_value = read_items(&mut cursor, serde, 1)?.remove(0);
        let max_value = read_items(&mut cursor, serde, 1)?.remove(0);

        // non-compact layouts store the full 2k base-buffer slots; only the
        // first n mod 2k of them are live
        let bb_count = compute_base_buffer_items(k, n) as usize;
        let items_to_read = if is_compact { bb_count } else { 2 * k as usize };
        let mut base_buffer = read_items(&mut cursor, serde, items_to_read)?;
        base_buffer.truncate(bb_count);

        let bit_pattern = compute_bit_pattern(k, n);
        let levels_needed = compute_levels_needed(k, n) as usize;
        let mut levels = Vec::with_capacity(levels_needed);
        let mut working_pattern = bit_pattern;
        for _ in 0..levels_needed {
            if working_pattern & 1 == 1 {
                levels.push(read_items(&mut cursor, serde, k as usize)?);
            } else {
                levels.push(Vec::with_capacity(k as usize));
            }
            working_pattern >>= 1;
        }

        Ok(Self {
            k,
            n,
            bit_pattern,
            base_buffer: RefCell::new(base_buffer),
            levels,
            min_value: Some(min_value),
            max_value: Some(max_value),
            is_sorted,
        })
    }

    /// Serializes the sketch into a caller-provided sink.
    pub fn serialize_into<S: ItemSerde<T>>(
        &self,
        writer: &mut dyn Write,
        serde: &S,
    ) -> Result<(), Error> {
        let bytes = self.serialize_with(serde);
        writer
            .write_all(&bytes)
            .map_err(|err| Error::io("failed to write serialized sketch", err))
    }

    /// Deserializes a sketch from a caller-provided source.
    pub fn deserialize_from_reader<S: ItemSerde<T>>(
        reader: &mut dyn Read,
        serde: &S,
    ) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|err| Error::io("failed to read serialized sketch", err))?;
        Self::deserialize_with(&bytes, serde)
    }

    fn min_max(&self) -> Result<(&T, &T), Error> {
        match (&self.min_value, &self.max_value) {
            (Some(min_value), Some(max_value)) => Ok((min_value, max_value)),
            _ => Err(Error::empty_sketch("the sketch has seen no data")),
        }
    }

    fn update_min_max(&mut self, item: &T) {
        match self.min_value.as_ref() {
            None => {
                self.min_value = Some(item.clone());
                self.max_value = Some(item.clone());
            }
            Some(min_value) => {
                if T::cmp(item, min_value) == Ordering::Less {
                    self.min_value = Some(item.clone());
                }
                if let Some(max_value) = &self.max_value {
                    if T::cmp(max_value, item) == Ordering::Less {
                        self.max_value = Some(item.clone());
                    }
                }
            }
        }
    }

    fn update_min_max_from_other(&mut self, other: &QuantilesSketch<T>) {
        match (&self.min_value, &self.max_value) {
            (Some(min_value), Some(max_value)) => {
                if let Some(other_min) = &other.min_value {
                    if T::cmp(other_min, min_value) == Ordering::Less {
                        self.min_value = Some(other_min.clone());
                    }
                }
                if let Some(other_max) = &other.max_value {
                    if T::cmp(max_value, other_max) == Ordering::Less {
                        self.max_value = Some(other_max.clone());
                    }
                }
            }
            _ => {
                self.min_value = other.min_value.clone();
                self.max_value = other.max_value.clone();
            }
        }
    }

    fn grow_base_buffer_if_needed(&mut self) {
        let max_capacity = 2 * self.k as usize;
        let base_buffer = self.base_buffer.get_mut();
        if base_buffer.len() + 1 <= base_buffer.capacity() {
            return;
        }
        let target = (2 * base_buffer.capacity()).clamp(1, max_capacity);
        base_buffer.reserve_exact(target - base_buffer.len());
    }

    /// Compacts the full base buffer into the level stack.
    ///
    /// Must be called right after n was incremented, so `n / 2k` is the
    /// post-carry bit pattern.
    fn process_full_base_buffer(&mut self) {
        self.grow_levels_if_needed(self.n);
        let two_k = 2 * self.k as usize;
        let mut buf_2k = std::mem::take(self.base_buffer.get_mut());
        debug_assert_eq!(buf_2k.len(), two_k);
        buf_2k.sort_by(T::cmp);
        self.in_place_propagate_carry(0, CarryBuf::Zip(buf_2k));
        *self.base_buffer.get_mut() = Vec::with_capacity(two_k);
        self.is_sorted = true;
        debug_assert_eq!(self.bit_pattern, compute_bit_pattern(self.k, self.n));
    }

    fn grow_levels_if_needed(&mut self, n: u64) {
        let levels_needed = compute_levels_needed(self.k, n) as usize;
        if levels_needed == 0 {
            // nothing past the base buffer yet, possible during merges
            return;
        }
        while self.levels.len() < levels_needed {
            self.levels.push(Vec::with_capacity(self.k as usize));
        }
    }

    /// Carries a full buffer up through the contiguous occupied levels,
    /// terminating at the lowest unoccupied one.
    fn in_place_propagate_carry(&mut self, starting_level: usize, carry: CarryBuf<T>) {
        let k = self.k as usize;
        let ending_level =
            lowest_zero_bit_starting_at(self.bit_pattern, starting_level as u8) as usize;
        debug_assert!(
            ending_level < self.levels.len(),
            "levels were not grown before the carry"
        );

        self.levels[ending_level] = match carry {
            CarryBuf::Zip(buf_2k) => zip_buffer(buf_2k),
            CarryBuf::Move(buf_k) => buf_k,
        };

        for level in starting_level..ending_level {
            debug_assert!(self.bit_pattern & (1u64 << level) != 0);
            let lower = std::mem::replace(&mut self.levels[level], Vec::with_capacity(k));
            let upper = std::mem::take(&mut self.levels[ending_level]);
            let merged = merge_two_size_k_buffers(lower, upper);
            self.levels[ending_level] = zip_buffer(merged);
        }

        // binary-arithmetic ripple carry
        self.bit_pattern += 1u64 << starting_level;
    }

    fn merge_same_resolution(&mut self, other: &QuantilesSketch<T>) {
        let final_n = self.n + other.n;
        self.update_min_max_from_other(other);
        for item in other.base_buffer.borrow().iter() {
            self.update(item.clone());
        }
        self.grow_levels_if_needed(final_n);

        let mut src_pattern = other.bit_pattern;
        let mut level = 0usize;
        while src_pattern != 0 {
            if src_pattern & 1 == 1 {
                self.in_place_propagate_carry(level, CarryBuf::Move(other.levels[level].clone()));
            }
            level += 1;
            src_pattern >>= 1;
        }

        self.n = final_n;
        debug_assert_eq!(self.bit_pattern, compute_bit_pattern(self.k, self.n));
    }

    /// Merges a sketch with a power-of-two larger k by striding its levels
    /// down to this resolution before the carry.
    fn merge_higher_resolution(&mut self, other: &QuantilesSketch<T>) {
        let stride = (other.k / self.k) as usize;
        let lg_stride = stride.trailing_zeros() as usize;
        let final_n = self.n + other.n;
        self.update_min_max_from_other(other);
        for item in other.base_buffer.borrow().iter() {
            self.update(item.clone());
        }
        self.grow_levels_if_needed(final_n);

        let mut src_pattern = other.bit_pattern;
        let mut level = 0usize;
        while src_pattern != 0 {
            if src_pattern & 1 == 1 {
                let down = zip_buffer_with_stride(&other.levels[level], stride);
                debug_assert_eq!(down.len(), self.k as usize);
                self.in_place_propagate_carry(level + lg_stride, CarryBuf::Move(down));
            }
            level += 1;
            src_pattern >>= 1;
        }

        self.n = final_n;
        debug_assert_eq!(self.bit_pattern, compute_bit_pattern(self.k, self.n));
    }

    fn quantile_calculator(&self, inclusive: bool) -> QuantileCalculator<T> {
        // Lazy sort of the base buffer, routed through the RefCell so the
        // query surface stays shared. The sorted flag stays untouched.
        if !self.is_sorted {
            self.base_buffer.borrow_mut().sort_by(T::cmp);
        }
        let mut calculator = QuantileCalculator::new(self.num_retained());
        calculator.add(&self.base_buffer.borrow()[..], 1);
        let mut weight = 2u64;
        for level in &self.levels {
            if !level.is_empty() {
                calculator.add(level, weight);
            }
            weight *= 2;
        }
        calculator.convert_to_cumulative(inclusive);
        calculator
    }
}

fn counts_toward_rank<T: QuantilesItem>(item: &T, value: &T, inclusive: bool) -> bool {
    if inclusive {
        T::cmp(value, item) != Ordering::Less
    } else {
        T::cmp(item, value) == Ordering::Less
    }
}

fn check_split_points<T: QuantilesItem>(split_points: &[T]) -> Result<(), Error> {
    for (i, point) in split_points.iter().enumerate() {
        if T::is_nan(point) {
            return Err(Error::invalid_argument(
                "split points must not contain NaN values",
            ));
        }
        if i > 0 && T::cmp(&split_points[i - 1], point) != Ordering::Less {
            return Err(Error::invalid_argument(
                "split points must be unique and monotonically increasing",
            ));
        }
    }
    Ok(())
}

/// Halves a sorted 2k buffer by keeping every other item, starting at a
/// random offset so neither parity class is favored.
fn zip_buffer<T>(buf_2k: Vec<T>) -> Vec<T> {
    debug_assert_eq!(buf_2k.len() % 2, 0);
    let offset = random_bit() as usize;
    buf_2k.into_iter().skip(offset).step_by(2).collect()
}

/// Keeps every stride-th item of a sorted buffer, starting at a random
/// offset in [0, stride).
fn zip_buffer_with_stride<T: Clone>(src: &[T], stride: usize) -> Vec<T> {
    let offset = random_stride_offset(stride as u32) as usize;
    src.iter().skip(offset).step_by(stride).cloned().collect()
}

/// Sorted-merge of two size-k sorted buffers; ties go to the first input.
fn merge_two_size_k_buffers<T: QuantilesItem>(left: Vec<T>, right: Vec<T>) -> Vec<T> {
    debug_assert_eq!(left.len(), right.len());
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    while let (Some(l), Some(r)) = (left_iter.peek(), right_iter.peek()) {
        if T::cmp(r, l) == Ordering::Less {
            merged.push(right_iter.next().unwrap());
        } else {
            merged.push(left_iter.next().unwrap());
        }
    }
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}

fn read_items<T, S: ItemSerde<T>>(
    cursor: &mut SketchSlice<'_>,
    serde: &S,
    num_items: usize,
) -> Result<Vec<T>, Error> {
    let remaining = cursor.remaining();
    let (items, consumed) = serde.deserialize_items(remaining, num_items)?;
    if items.len() != num_items {
        return Err(Error::deserial("item count mismatch during deserialization"));
    }
    if consumed > remaining.len() {
        return Err(Error::deserial("item serde consumed more bytes than available"));
    }
    cursor.advance(consumed);
    Ok(items)
}

impl QuantilesItem for f32 {
    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
    }

    fn is_nan(value: &Self) -> bool {
        value.is_nan()
    }
}

impl QuantilesItem for f64 {
    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
    }

    fn is_nan(value: &Self) -> bool {
        value.is_nan()
    }
}

impl QuantilesItem for i64 {
    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }
}

impl QuantilesItem for String {
    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }
}
