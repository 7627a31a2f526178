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

//! Binary serialization format constants for classic quantiles sketches.
//!
//! Naming and layout follow the Apache DataSketches Java implementation
//! (`PreambleUtil` in the quantiles package) and the C++ `quantiles_sketch`
//! serialization format.

use crate::error::Error;

/// Serialization version written by this implementation.
pub const SERIAL_VERSION: u8 = 3;
/// Legacy serialization version 1, readable only.
pub const SERIAL_VERSION_1: u8 = 1;
/// Legacy serialization version 2, readable only.
pub const SERIAL_VERSION_2: u8 = 2;

/// Preamble longs for an empty sketch.
pub const PREAMBLE_LONGS_SHORT: u8 = 1;
/// Preamble longs for a non-empty sketch.
pub const PREAMBLE_LONGS_FULL: u8 = 2;

/// Flag indicating the sketch is empty.
pub const FLAG_IS_EMPTY: u8 = 1 << 0;
/// Flag indicating the base buffer is sorted.
pub const FLAG_IS_SORTED: u8 = 1 << 1;
/// Flag indicating the payload holds only valid items.
pub const FLAG_IS_COMPACT: u8 = 1 << 2;

/// Serialized size for an empty sketch in bytes.
pub const EMPTY_SIZE_BYTES: usize = 8;
/// Offset where item data starts for a non-empty sketch.
pub const DATA_START: usize = 16;

pub(super) fn check_serial_version(serial_version: u8) -> Result<(), Error> {
    match serial_version {
        SERIAL_VERSION | SERIAL_VERSION_1 | SERIAL_VERSION_2 => Ok(()),
        _ => Err(Error::deserial(format!(
            "unrecognized serialization version: {serial_version}"
        ))),
    }
}

/// Rejects any header combination a known writer could not have produced.
pub(super) fn check_header_validity(
    preamble_longs: u8,
    flags: u8,
    serial_version: u8,
) -> Result<(), Error> {
    let empty = flags & FLAG_IS_EMPTY != 0;
    let compact = flags & FLAG_IS_COMPACT != 0;

    // exhaustive list of all valid cases
    let valid = matches!(
        (preamble_longs, empty, serial_version, compact),
        (1, true, 1, false)     // v1 empty, always stored as not compact
            | (5, false, 1, false)  // v1 non-empty, always stored as not compact
            | (1, true, 2, true)    // v2 empty, always stored as compact
            | (2, false, 2, true)   // v2 non-empty, always stored as compact
            | (1, true, 3, _)
            | (2, true, 3, _)
            | (2, false, 3, _)
    );

    if valid {
        Ok(())
    } else {
        Err(Error::deserial(format!(
            "inconsistent header state: preamble_longs = {preamble_longs}, empty = {empty}, \
             serialization_version = {serial_version}, compact = {compact}"
        )))
    }
}
