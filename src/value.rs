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

//! Column value types supported by the quantile engine.
//!
//! The engine works on any numeric column type with a total order. Floating
//! point types use the IEEE 754 total order, so NaN values occupy fixed rank
//! positions instead of poisoning comparisons; exactness is defined over that
//! order.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// A numeric column value with a total order.
///
/// Beyond comparison, the interval-narrowing protocol needs two pieces of
/// order arithmetic: the successor of a value (to turn an inclusive upper
/// bound into an exclusive one) and a midpoint (for the binary-search
/// fallback when a sketch-derived candidate makes no progress). Both are
/// defined over the value's order-preserving integer key, so they are exact
/// for every representable value.
///
/// The serialization hooks reference crate-private codec types, so this
/// trait is effectively sealed to the bundled numeric implementations.
pub trait ColumnValue: Copy + Debug + 'static {
    /// Bytes one retained item occupies in the memory budget.
    const SIZE_BYTES: usize;

    /// Compare two values in total order.
    fn total_cmp(a: &Self, b: &Self) -> Ordering;

    /// Returns the smallest value strictly greater than `self`, or `None`
    /// if `self` is the maximum of the domain.
    fn next_up(self) -> Option<Self>;

    /// Returns a value `m` with `self <= m < other` in total order.
    ///
    /// Callers must guarantee `self < other`.
    fn midpoint(self, other: Self) -> Self;

    /// Lossy conversion used for diagnostics and progress records.
    fn as_f64(self) -> f64;

    /// Serialize a single value into the buffer.
    fn serialize(value: &Self, bytes: &mut SketchBytes);

    /// Deserialize a single value from the input.
    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error>;
}

// Order-preserving u64 key for f64: flip all bits of negatives, set the sign
// bit of non-negatives. Adjacent keys are adjacent values in total order.
fn f64_key(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits >> 63 == 1 { !bits } else { bits | (1 << 63) }
}

fn f64_from_key(key: u64) -> f64 {
    let bits = if key >> 63 == 1 {
        key ^ (1 << 63)
    } else {
        !key
    };
    f64::from_bits(bits)
}

fn f32_key(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits >> 31 == 1 { !bits } else { bits | (1 << 31) }
}

fn f32_from_key(key: u32) -> f32 {
    let bits = if key >> 31 == 1 {
        key ^ (1 << 31)
    } else {
        !key
    };
    f32::from_bits(bits)
}

impl ColumnValue for f64 {
    const SIZE_BYTES: usize = 8;

    fn total_cmp(a: &Self, b: &Self) -> Ordering {
        a.total_cmp(b)
    }

    fn next_up(self) -> Option<Self> {
        let key = f64_key(self);
        key.checked_add(1).map(f64_from_key)
    }

    fn midpoint(self, other: Self) -> Self {
        let lo = f64_key(self);
        let hi = f64_key(other);
        f64_from_key(lo + (hi - lo) / 2)
    }

    fn as_f64(self) -> f64 {
        self
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_f64_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_f64_le()
            .map_err(|_| Error::insufficient_data("f64"))
    }
}

impl ColumnValue for f32 {
    const SIZE_BYTES: usize = 4;

    fn total_cmp(a: &Self, b: &Self) -> Ordering {
        a.total_cmp(b)
    }

    fn next_up(self) -> Option<Self> {
        let key = f32_key(self);
        key.checked_add(1).map(f32_from_key)
    }

    fn midpoint(self, other: Self) -> Self {
        let lo = f32_key(self);
        let hi = f32_key(other);
        f32_from_key(lo + (hi - lo) / 2)
    }

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_f32_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_f32_le()
            .map_err(|_| Error::insufficient_data("f32"))
    }
}

impl ColumnValue for i64 {
    const SIZE_BYTES: usize = 8;

    fn total_cmp(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }

    fn next_up(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn midpoint(self, other: Self) -> Self {
        // widened to avoid overflow near the domain extremes
        ((self as i128 + other as i128) >> 1) as i64
    }

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_i64_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_i64_le()
            .map_err(|_| Error::insufficient_data("i64"))
    }
}

impl ColumnValue for i32 {
    const SIZE_BYTES: usize = 4;

    fn total_cmp(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }

    fn next_up(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn midpoint(self, other: Self) -> Self {
        ((self as i64 + other as i64) >> 1) as i32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_i32_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_i32_le()
            .map_err(|_| Error::insufficient_data("i32"))
    }
}
