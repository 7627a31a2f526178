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

//! Serialization helpers for the items stored in a quantiles sketch.

use std::str;

use crate::error::Error;

/// Serializer/deserializer for the items retained by a quantiles sketch.
///
/// The sketch owns the wire preamble; an `ItemSerde` only encodes runs of
/// items. Implementations for new item types must keep `size_of_item`
/// consistent with the bytes `serialize_items` actually emits.
pub trait ItemSerde<T> {
    /// Serialized size in bytes of a single item.
    fn size_of_item(&self, item: &T) -> usize;

    /// Per-item size when every item serializes to the same number of bytes.
    ///
    /// Returning `Some` lets size computations skip the per-item calls.
    fn fixed_size(&self) -> Option<usize> {
        None
    }

    /// Serializes a slice of items to a byte buffer.
    fn serialize_items(&self, items: &[T]) -> Vec<u8>;

    /// Deserializes `num_items` from bytes, returning items and bytes consumed.
    fn deserialize_items(&self, bytes: &[u8], num_items: usize) -> Result<(Vec<T>, usize), Error>;
}

macro_rules! fixed_width_serde {
    ($name:ident, $type:ty, $width:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl ItemSerde<$type> for $name {
            fn size_of_item(&self, _item: &$type) -> usize {
                $width
            }

            fn fixed_size(&self) -> Option<usize> {
                Some($width)
            }

            fn serialize_items(&self, items: &[$type]) -> Vec<u8> {
                let mut out = Vec::with_capacity(items.len() * $width);
                for item in items {
                    out.extend_from_slice(&item.to_le_bytes());
                }
                out
            }

            fn deserialize_items(
                &self,
                bytes: &[u8],
                num_items: usize,
            ) -> Result<(Vec<$type>, usize), Error> {
                let needed = num_items
                    .checked_mul($width)
                    .ok_or_else(|| Error::deserial("items size overflow"))?;
                if bytes.len() < needed {
                    return Err(Error::insufficient_data(stringify!($type)));
                }
                let mut items = Vec::with_capacity(num_items);
                for chunk in bytes[..needed].chunks_exact($width) {
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(chunk);
                    items.push(<$type>::from_le_bytes(buf));
                }
                Ok((items, needed))
            }
        }
    };
}

fixed_width_serde!(F32Serde, f32, 4, "Serializer for f32 items.");
fixed_width_serde!(F64Serde, f64, 8, "Serializer for f64 items.");
fixed_width_serde!(I64Serde, i64, 8, "Serializer for i64 items compatible with ArrayOfLongsSerDe in Java.");

/// Serializer for UTF-8 strings compatible with ArrayOfStringsSerDe in Java.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringSerde;

impl ItemSerde<String> for StringSerde {
    fn size_of_item(&self, item: &String) -> usize {
        4 + item.len()
    }

    fn serialize_items(&self, items: &[String]) -> Vec<u8> {
        let mut out = Vec::new();
        for item in items {
            let bytes = item.as_bytes();
            let len = bytes.len() as u32;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(bytes);
        }
        out
    }

    fn deserialize_items(
        &self,
        bytes: &[u8],
        num_items: usize,
    ) -> Result<(Vec<String>, usize), Error> {
        let mut items = Vec::with_capacity(num_items);
        let mut offset = 0usize;
        for _ in 0..num_items {
            if offset + 4 > bytes.len() {
                return Err(Error::insufficient_data("string_len"));
            }
            let len = u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]) as usize;
            offset += 4;
            if offset + len > bytes.len() {
                return Err(Error::insufficient_data("string_bytes"));
            }
            let slice = &bytes[offset..offset + len];
            let value = match str::from_utf8(slice) {
                Ok(s) => s.to_string(),
                Err(_) => return Err(Error::deserial("invalid UTF-8 string payload")),
            };
            items.push(value);
            offset += len;
        }
        Ok((items, offset))
    }
}
