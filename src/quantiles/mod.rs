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

//! Classic quantiles sketch for estimating quantiles and ranks.
//!
//! This is the mergeable quantiles sketch of Agarwal, Cormode, Mitzenmacher,
//! Thaler and Wang: newly ingested items land in an unsorted base buffer of
//! capacity 2k, and each time it fills, a randomized halving carries the
//! batch into a stack of sorted size-k levels where level i represents
//! 2^(i+1) stream items. A 64-bit occupancy mask equal to `n / 2k` tracks
//! which levels hold data.
//!
//! This implementation follows Apache DataSketches semantics (Java
//! DoublesSketch / ItemsSketch, C++ quantiles_sketch) and uses the same
//! binary serialization format as those implementations.
//!
//! # Usage
//!
//! ```rust
//! # use sketches::quantiles::QuantilesSketch;
//! let mut sketch = QuantilesSketch::<f64>::new(128).unwrap();
//! for i in 1..=1000 {
//!     sketch.update(i as f64);
//! }
//! let median = sketch.quantile(0.5, true).unwrap();
//! assert!(median >= 400.0 && median <= 600.0);
//! ```

mod calculator;
mod helper;
mod iter;
mod serde;
mod serialization;
mod sketch;

pub use self::iter::QuantilesSketchIter;
pub use self::serde::F32Serde;
pub use self::serde::F64Serde;
pub use self::serde::I64Serde;
pub use self::serde::ItemSerde;
pub use self::serde::StringSerde;
pub use self::sketch::QuantilesItem;
pub use self::sketch::QuantilesSketch;

/// Default value of parameter k.
pub const DEFAULT_K: u16 = 128;
/// Minimum value of parameter k.
pub const MIN_K: u16 = 2;
/// Maximum value of parameter k.
pub const MAX_K: u16 = 32768;
