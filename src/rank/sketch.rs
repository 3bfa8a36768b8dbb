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

use std::cmp::Ordering;

use super::LEVEL_CAPACITY_FLOOR;
use super::MAX_K;
use super::MIN_K;
use super::serialization::DATA_START;
use super::serialization::FLAG_EMPTY;
use super::serialization::FLAG_LEVEL_ZERO_SORTED;
use super::serialization::HEADER_SIZE_BYTES;
use super::serialization::RANK_FAMILY_ID;
use super::serialization::SERIAL_VERSION;
use super::view::WeightedView;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;
use crate::value::ColumnValue;

/// Mergeable rank sketch over a numeric column type.
///
/// See the [rank module level documentation](crate::rank) for more.
#[derive(Debug, Clone)]
pub struct RankSketch<T: ColumnValue, R: RandomSource = XorShift64> {
    k: u16,
    n: u64,
    // levels[i] holds items of weight 2^i; levels above zero stay sorted
    levels: Vec<Vec<T>>,
    min_item: Option<T>,
    max_item: Option<T>,
    level_zero_sorted: bool,
    rng: R,
}

impl<T: ColumnValue> RankSketch<T> {
    /// Creates a new sketch with the given value of k.
    ///
    /// # Panics
    ///
    /// Panics if k is not in [MIN_K, MAX_K].
    ///
    /// # Examples
    ///
    /// ```
    /// # use exact_quantiles::rank::RankSketch;
    /// let sketch = RankSketch::<f64>::new(200);
    /// assert_eq!(sketch.k(), 200);
    /// ```
    pub fn new(k: u16) -> Self {
        Self::with_rng(k, XorShift64::default())
    }

    /// Creates a new sketch whose compaction tie-breaks follow a seeded
    /// generator, making its behavior reproducible.
    pub fn seeded(k: u16, seed: u64) -> Self {
        Self::with_rng(k, XorShift64::seeded(seed))
    }
}

impl<T: ColumnValue, R: RandomSource> RankSketch<T, R> {
    /// Creates a new sketch using the provided random source for compaction
    /// tie-breaks.
    ///
    /// # Panics
    ///
    /// Panics if k is not in [MIN_K, MAX_K].
    pub fn with_rng(k: u16, rng: R) -> Self {
        assert!(
            (MIN_K..=MAX_K).contains(&k),
            "k must be in [{MIN_K}, {MAX_K}], got {k}"
        );
        Self {
            k,
            n: 0,
            levels: vec![Vec::new()],
            min_item: None,
            max_item: None,
            level_zero_sorted: true,
            rng,
        }
    }

    /// Returns parameter k used to configure this sketch.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns total weight of the stream.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns true if the sketch has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        self.levels.iter().map(|level| level.len()).sum()
    }

    /// Returns true if the sketch has compacted and answers are estimates.
    pub fn is_estimation_mode(&self) -> bool {
        self.levels.len() > 1
    }

    /// Returns the minimum item seen by the sketch.
    pub fn min_item(&self) -> Option<&T> {
        self.min_item.as_ref()
    }

    /// Returns the maximum item seen by the sketch.
    pub fn max_item(&self) -> Option<&T> {
        self.max_item.as_ref()
    }

    /// Returns the normalized single-sided rank error for this sketch.
    ///
    /// The absolute rank error bound is this value times `n`.
    pub fn normalized_rank_error(&self) -> f64 {
        normalized_rank_error(self.k)
    }

    /// Updates the sketch with a new item.
    pub fn update(&mut self, item: T) {
        self.update_min_max(&item);
        if self.num_retained() >= self.capacity() {
            self.compact_level(self.find_level_to_compact());
        }
        self.n += 1;
        self.levels[0].push(item);
        self.level_zero_sorted = self.levels[0].len() < 2;
        debug_assert!(self.num_retained() <= self.capacity());
    }

    /// Merges another sketch into this one.
    ///
    /// Merging is commutative and associative up to the documented rank
    /// error bound.
    pub fn merge(&mut self, other: &RankSketch<T, R>) {
        if other.is_empty() {
            return;
        }
        self.merge_min_max(other);
        self.n += other.n;

        if other.levels.len() > self.levels.len() {
            self.levels.resize_with(other.levels.len(), Vec::new);
        }
        if !other.levels[0].is_empty() {
            self.levels[0].extend_from_slice(&other.levels[0]);
            self.level_zero_sorted = self.levels[0].len() < 2;
        }
        for (level, items) in other.levels.iter().enumerate().skip(1) {
            if items.is_empty() {
                continue;
            }
            let ours = std::mem::take(&mut self.levels[level]);
            self.levels[level] = merge_sorted(ours, items.clone());
        }

        while self.num_retained() > self.capacity() {
            let level = self.find_level_to_compact();
            if self.levels[level].len() < 2 {
                break;
            }
            self.compact_level(level);
        }

        debug_assert_eq!(self.total_weight(), self.n, "total weight does not match n");
    }

    /// Returns the estimated number of items strictly less than `item`.
    pub fn estimate_rank(&self, item: &T) -> u64 {
        self.view().weight_below(item)
    }

    /// Returns lower and upper bounds on the rank of `item`, clamped to
    /// `[0, n]`.
    pub fn rank_bounds(&self, item: &T) -> (u64, u64) {
        let estimate = self.estimate_rank(item);
        let pad = self.rank_pad();
        (estimate.saturating_sub(pad), (estimate + pad).min(self.n))
    }

    /// Returns a value interval `[low, high]` wide enough to contain the
    /// item of the given rank, derived from the weighted order statistics
    /// of the retained items padded by the rank error bound.
    ///
    /// Returns `None` if the sketch is empty.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= n`.
    pub fn bounds_for_rank(&self, rank: u64) -> Option<(T, T)> {
        if self.is_empty() {
            return None;
        }
        assert!(rank < self.n, "rank {rank} out of range for n {}", self.n);
        let pad = self.rank_pad();
        let view = self.view();
        let low = *view
            .item_at_weight(rank.saturating_sub(pad))
            .expect("non-empty sketch has a non-empty view");
        let high = *view
            .item_at_weight((rank + pad).min(self.n - 1))
            .expect("non-empty sketch has a non-empty view");
        Some((low, high))
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let retained = self.num_retained();
        let size = DATA_START + 4 * self.levels.len() + (2 + retained) * T::SIZE_BYTES;
        let mut bytes = SketchBytes::with_capacity(size);

        let is_empty = self.is_empty();
        let flags = (if is_empty { FLAG_EMPTY } else { 0 })
            | (if self.level_zero_sorted {
                FLAG_LEVEL_ZERO_SORTED
            } else {
                0
            });

        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(RANK_FAMILY_ID);
        bytes.write_u8(flags);
        bytes.write_u8(T::SIZE_BYTES as u8);
        bytes.write_u16_le(self.k);
        bytes.write_u16_le(0);

        if is_empty {
            return bytes.into_bytes();
        }

        bytes.write_u64_le(self.n);
        bytes.write_u8(self.levels.len() as u8);
        bytes.write_u8(0);
        bytes.write_u16_le(0);
        for level in &self.levels {
            bytes.write_u32_le(level.len() as u32);
        }
        if let Some(min_item) = &self.min_item {
            T::serialize(min_item, &mut bytes);
        }
        if let Some(max_item) = &self.max_item {
            T::serialize(max_item, &mut bytes);
        }
        for level in &self.levels {
            for item in level {
                T::serialize(item, &mut bytes);
            }
        }

        bytes.into_bytes()
    }
}

impl<T: ColumnValue> RankSketch<T> {
    /// Deserializes a sketch from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<RankSketch<T>, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);

        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let item_size = cursor.read_u8().map_err(make_error("item_size"))?;
        let k = cursor.read_u16_le().map_err(make_error("k"))?;
        let _unused = cursor.read_u16_le().map_err(make_error("unused"))?;

        if serial_version != SERIAL_VERSION {
            return Err(Error::deserial(format!(
                "invalid serial version: {serial_version}"
            )));
        }
        if family_id != RANK_FAMILY_ID {
            return Err(Error::invalid_family(RANK_FAMILY_ID, family_id));
        }
        if item_size as usize != T::SIZE_BYTES {
            return Err(Error::deserial(format!(
                "item size mismatch: expected {}, got {item_size}",
                T::SIZE_BYTES
            )));
        }
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::deserial(format!("k out of range: {k}")));
        }

        let is_empty = (flags & FLAG_EMPTY) != 0;
        let level_zero_sorted = (flags & FLAG_LEVEL_ZERO_SORTED) != 0;

        let mut sketch = RankSketch::<T>::new(k);
        if is_empty {
            if bytes.len() != HEADER_SIZE_BYTES {
                return Err(Error::deserial("trailing bytes after empty sketch"));
            }
            return Ok(sketch);
        }

        let n = cursor.read_u64_le().map_err(make_error("n"))?;
        let num_levels = cursor.read_u8().map_err(make_error("num_levels"))? as usize;
        let _pad8 = cursor.read_u8().map_err(make_error("pad"))?;
        let _pad16 = cursor.read_u16_le().map_err(make_error("pad"))?;
        if num_levels == 0 {
            return Err(Error::deserial("num_levels must be > 0"));
        }

        let mut level_sizes = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let size = cursor.read_u32_le().map_err(make_error("level_sizes"))?;
            level_sizes.push(size as usize);
        }
        let retained: usize = level_sizes.iter().sum();
        if retained as u32 > total_capacity(k, num_levels) {
            return Err(Error::deserial("retained items exceed capacity"));
        }

        let min_item = T::deserialize(&mut cursor)?;
        let max_item = T::deserialize(&mut cursor)?;

        let mut levels = Vec::with_capacity(num_levels);
        for size in &level_sizes {
            let mut items = Vec::with_capacity(*size);
            for _ in 0..*size {
                items.push(T::deserialize(&mut cursor)?);
            }
            levels.push(items);
        }

        let total: u64 = level_sizes
            .iter()
            .enumerate()
            .map(|(level, size)| (*size as u64) << level)
            .sum();
        if total != n {
            return Err(Error::deserial("level weights do not sum to n"));
        }

        sketch.n = n;
        sketch.levels = levels;
        sketch.min_item = Some(min_item);
        sketch.max_item = Some(max_item);
        sketch.level_zero_sorted = level_zero_sorted;
        Ok(sketch)
    }
}

impl<T: ColumnValue, R: RandomSource> RankSketch<T, R> {
    fn view(&self) -> WeightedView<T> {
        WeightedView::build(&self.levels)
    }

    fn rank_pad(&self) -> u64 {
        if !self.is_estimation_mode() {
            return 0;
        }
        (self.normalized_rank_error() * self.n as f64).ceil() as u64
    }

    fn capacity(&self) -> usize {
        total_capacity(self.k, self.levels.len()) as usize
    }

    fn update_min_max(&mut self, item: &T) {
        match (&self.min_item, &self.max_item) {
            (None, _) => {
                self.min_item = Some(*item);
                self.max_item = Some(*item);
            }
            (Some(min), Some(max)) => {
                if T::total_cmp(item, min) == Ordering::Less {
                    self.min_item = Some(*item);
                }
                if T::total_cmp(max, item) == Ordering::Less {
                    self.max_item = Some(*item);
                }
            }
            _ => unreachable!("min and max are set together"),
        }
    }

    fn merge_min_max(&mut self, other: &RankSketch<T, R>) {
        if let Some(other_min) = other.min_item {
            self.update_min_max(&other_min);
        }
        if let Some(other_max) = other.max_item {
            self.update_min_max(&other_max);
        }
    }

    fn find_level_to_compact(&self) -> usize {
        let num_levels = self.levels.len();
        for level in 0..num_levels {
            let pop = self.levels[level].len() as u32;
            if pop >= level_capacity(self.k, num_levels, level) {
                return level;
            }
        }
        // after a merge every level can sit below its own cap while the
        // total is over budget; compact the fullest one
        self.levels
            .iter()
            .enumerate()
            .max_by_key(|(_, level)| level.len())
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    // Sorts the level, promotes every other element with doubled weight and
    // merges the promotion into the level above. Tie-break rule: when the
    // generator's next bit is set the elements at odd offsets of the sorted
    // buffer are promoted, otherwise the even offsets. An odd-sized buffer
    // keeps its largest element in place.
    fn compact_level(&mut self, level: usize) {
        if level + 1 == self.levels.len() {
            self.levels.push(Vec::new());
        }

        let mut current = std::mem::take(&mut self.levels[level]);
        if level == 0 && !self.level_zero_sorted {
            current.sort_by(T::total_cmp);
        }

        let mut leftover = None;
        if current.len() % 2 == 1 {
            leftover = current.pop();
        }

        let start = usize::from(self.rng.next_bool());
        let promoted: Vec<T> = current.into_iter().skip(start).step_by(2).collect();

        let above = std::mem::take(&mut self.levels[level + 1]);
        self.levels[level + 1] = if above.is_empty() {
            promoted
        } else {
            merge_sorted(promoted, above)
        };

        self.levels[level] = leftover.into_iter().collect();
        if level == 0 {
            self.level_zero_sorted = true;
        }
    }

    fn total_weight(&self) -> u64 {
        self.levels
            .iter()
            .enumerate()
            .map(|(level, items)| (items.len() as u64) << level)
            .sum()
    }
}

fn normalized_rank_error(k: u16) -> f64 {
    2.296 / (k as f64).powf(0.9723)
}

pub(crate) fn level_capacity(k: u16, num_levels: usize, level: usize) -> u32 {
    debug_assert!(level < num_levels, "level must be < num_levels");
    let depth = (num_levels - 1 - level) as i32;
    let cap = (k as f64 * (2.0f64 / 3.0).powi(depth)).ceil() as u32;
    cap.max(LEVEL_CAPACITY_FLOOR)
}

pub(crate) fn total_capacity(k: u16, num_levels: usize) -> u32 {
    (0..num_levels)
        .map(|level| level_capacity(k, num_levels, level))
        .sum()
}

fn merge_sorted<T: ColumnValue>(left: Vec<T>, right: Vec<T>) -> Vec<T> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    while let (Some(l), Some(r)) = (left_iter.peek(), right_iter.peek()) {
        if T::total_cmp(l, r) == Ordering::Greater {
            merged.push(right_iter.next().expect("peeked right"));
        } else {
            merged.push(left_iter.next().expect("peeked left"));
        }
    }
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}
