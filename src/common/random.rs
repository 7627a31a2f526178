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

//! Shared random utilities for sketches.

#[cfg(not(feature = "zip-validation"))]
use std::time::SystemTime;
#[cfg(not(feature = "zip-validation"))]
use std::time::UNIX_EPOCH;

/// Random number source for sketches.
pub trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;
}

/// Xorshift-based random generator for sketch operations.
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new generator using the provided seed.
    pub fn seeded(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }
}

#[cfg(not(feature = "zip-validation"))]
impl Default for XorShift64 {
    fn default() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut seed = nanos as u64 ^ (std::process::id() as u64);
        if seed == 0 {
            seed = 0x9e3779b97f4a7c15;
        }
        Self::seeded(seed)
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Returns one fair random bit.
///
/// With the `zip-validation` feature the stream degenerates to a
/// deterministic 0/1 toggle so compaction outcomes are reproducible.
#[cfg(not(feature = "zip-validation"))]
pub(crate) fn random_bit() -> u32 {
    use std::cell::Cell;

    thread_local! {
        static RNG_STATE: Cell<XorShift64> = Cell::new(XorShift64::default());
    }

    RNG_STATE.with(|state| {
        let mut rng = state.get();
        let bit = (rng.next_u64() & 1) as u32;
        state.set(rng);
        bit
    })
}

#[cfg(feature = "zip-validation")]
pub(crate) fn random_bit() -> u32 {
    use std::cell::Cell;

    thread_local! {
        static NEXT_BIT: Cell<u32> = const { Cell::new(0) };
    }

    NEXT_BIT.with(|bit| {
        let value = bit.get();
        bit.set(1 - value);
        value
    })
}

/// Returns a uniform offset in `[0, stride)` for a power-of-two stride,
/// composed from single random bits so the validation toggle covers it too.
pub(crate) fn random_stride_offset(stride: u32) -> u32 {
    debug_assert!(stride.is_power_of_two(), "stride must be a power of two");
    let mut offset = 0;
    for _ in 0..stride.trailing_zeros() {
        offset = (offset << 1) | random_bit();
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generator_is_deterministic() {
        let mut a = XorShift64::seeded(42);
        let mut b = XorShift64::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_zero_seed_is_remapped() {
        let mut rng = XorShift64::seeded(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn test_random_bit_is_binary() {
        for _ in 0..100 {
            assert!(random_bit() <= 1);
        }
    }

    #[test]
    fn test_stride_offset_in_range() {
        for _ in 0..100 {
            assert!(random_stride_offset(4) < 4);
        }
        assert_eq!(random_stride_offset(1), 0);
    }
}
