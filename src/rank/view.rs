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

use crate::value::ColumnValue;

/// Sorted view over a sketch's retained items with cumulative weights.
#[derive(Debug, Clone)]
pub(crate) struct WeightedView<T> {
    // sorted ascending; weight holds the running total up to and including
    // the entry
    entries: Vec<Entry<T>>,
    total_weight: u64,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    weight: u64,
}

impl<T: ColumnValue> WeightedView<T> {
    pub fn build(levels: &[Vec<T>]) -> Self {
        let num_retained: usize = levels.iter().map(|level| level.len()).sum();
        let mut entries = Vec::with_capacity(num_retained);

        for (level, items) in levels.iter().enumerate() {
            let weight = 1u64 << level;
            for item in items {
                entries.push(Entry {
                    item: *item,
                    weight,
                });
            }
        }

        entries.sort_by(|a, b| T::total_cmp(&a.item, &b.item));
        let mut total_weight = 0u64;
        for entry in &mut entries {
            total_weight += entry.weight;
            entry.weight = total_weight;
        }
        Self {
            entries,
            total_weight,
        }
    }

    /// Returns the total weight of items strictly less than `item`.
    pub fn weight_below(&self, item: &T) -> u64 {
        let idx = self
            .entries
            .partition_point(|entry| T::total_cmp(&entry.item, item) == Ordering::Less);
        if idx == 0 {
            return 0;
        }
        self.entries[idx - 1].weight
    }

    /// Returns the item whose cumulative weight range covers `target`,
    /// clamping past-the-end targets to the last item.
    ///
    /// Returns `None` for an empty view.
    pub fn item_at_weight(&self, target: u64) -> Option<&T> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.entries.partition_point(|entry| entry.weight <= target);
        let idx = idx.min(self.entries.len() - 1);
        Some(&self.entries[idx].item)
    }

    #[cfg(test)]
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_of(levels: &[Vec<i64>]) -> WeightedView<i64> {
        WeightedView::build(levels)
    }

    #[test]
    fn test_empty_view() {
        let view = view_of(&[Vec::new()]);
        assert_eq!(view.total_weight(), 0);
        assert_eq!(view.weight_below(&5), 0);
        assert!(view.item_at_weight(0).is_none());
    }

    #[test]
    fn test_single_level_weights() {
        let view = view_of(&[vec![3, 1, 2]]);
        assert_eq!(view.total_weight(), 3);
        assert_eq!(view.weight_below(&1), 0);
        assert_eq!(view.weight_below(&2), 1);
        assert_eq!(view.weight_below(&10), 3);
        assert_eq!(view.item_at_weight(0), Some(&1));
        assert_eq!(view.item_at_weight(2), Some(&3));
        // past-the-end targets clamp to the maximum
        assert_eq!(view.item_at_weight(99), Some(&3));
    }

    #[test]
    fn test_level_weights_double() {
        // level 1 items count twice
        let view = view_of(&[vec![5], vec![1, 9]]);
        assert_eq!(view.total_weight(), 5);
        assert_eq!(view.weight_below(&5), 2);
        assert_eq!(view.weight_below(&9), 3);
        assert_eq!(view.item_at_weight(1), Some(&1));
        assert_eq!(view.item_at_weight(2), Some(&5));
        assert_eq!(view.item_at_weight(3), Some(&9));
    }
}
