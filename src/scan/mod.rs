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

//! Scan source: the storage-layer collaborator the engine reads from.
//!
//! The engine owns no storage. Each narrowing iteration asks a [`ScanSource`]
//! for the raw values of a time range, optionally pre-filtered to a value
//! interval, and consumes them in one linear pass. The source may perform
//! blocking I/O; the engine treats every scan as a long-latency operation and
//! keeps no sketch state alive across scans.
//!
//! [`MemoryColumn`] is the bundled in-memory implementation, used by tests
//! and by embedders whose data already lives in memory.

mod memory;

pub use self::memory::MemoryColumn;

use std::cmp::Ordering;

use crate::error::Error;
use crate::value::ColumnValue;

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive start timestamp.
    pub start: i64,
    /// Exclusive end timestamp.
    pub end: i64,
}

impl TimeRange {
    /// Creates a time range covering `[start, end)`.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Returns the range covering all representable timestamps.
    pub fn all() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }

    /// Returns true if the timestamp falls inside the range.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

/// Half-open value interval `[lower, upper)` used to pre-filter a scan.
///
/// `None` bounds are unbounded on that side.
#[derive(Debug, Clone, Copy)]
pub struct ValueBounds<T> {
    /// Inclusive lower bound.
    pub lower: Option<T>,
    /// Exclusive upper bound.
    pub upper: Option<T>,
}

impl<T: ColumnValue> ValueBounds<T> {
    /// Bounds accepting every value.
    pub fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Returns true if neither side is bounded.
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Returns true if the value falls inside the bounds.
    pub fn accepts(&self, value: &T) -> bool {
        if let Some(lower) = &self.lower {
            if T::total_cmp(value, lower) == Ordering::Less {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if T::total_cmp(value, upper) != Ordering::Less {
                return false;
            }
        }
        true
    }
}

/// Lazy, fallible stream of raw column values produced by a scan.
pub type RowStream<'a, T> = Box<dyn Iterator<Item = Result<T, Error>> + 'a>;

/// Storage-layer collaborator supplying range-filtered raw values.
///
/// Implementations must yield every row of the time range whose value falls
/// inside the bounds, in any order, exactly once per scan. Errors abort the
/// query; the engine never resumes a failed stream.
pub trait ScanSource<T: ColumnValue> {
    /// Returns the values of `range` whose value lies inside `bounds`.
    fn scan(
        &self,
        range: &TimeRange,
        bounds: Option<&ValueBounds<T>>,
    ) -> Result<RowStream<'_, T>, Error>;

    /// Returns the exact number of rows in `range`, from range metadata.
    fn row_count(&self, range: &TimeRange) -> Result<u64, Error>;
}
