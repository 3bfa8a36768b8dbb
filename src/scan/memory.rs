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

use super::RowStream;
use super::ScanSource;
use super::TimeRange;
use super::ValueBounds;
use crate::error::Error;
use crate::value::ColumnValue;

/// In-memory time-ordered column.
///
/// # Examples
///
/// ```
/// # use exact_quantiles::scan::{MemoryColumn, ScanSource, TimeRange};
/// let column = MemoryColumn::from_values(vec![5.0f64, 1.0, 4.0]);
/// assert_eq!(column.row_count(&TimeRange::all()).unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryColumn<T> {
    // sorted by timestamp
    rows: Vec<(i64, T)>,
}

impl<T: ColumnValue> MemoryColumn<T> {
    /// Creates a column from timestamped rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows are not sorted by timestamp.
    pub fn new(rows: Vec<(i64, T)>) -> Self {
        assert!(
            rows.windows(2).all(|pair| pair[0].0 <= pair[1].0),
            "rows must be sorted by timestamp"
        );
        Self { rows }
    }

    /// Creates a column from bare values, assigning timestamps `0..len`.
    pub fn from_values(values: Vec<T>) -> Self {
        Self {
            rows: values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (i as i64, value))
                .collect(),
        }
    }

    /// Returns the number of rows in the column.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the column holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn range_slice(&self, range: &TimeRange) -> &[(i64, T)] {
        let start = self.rows.partition_point(|(t, _)| *t < range.start);
        let end = self.rows.partition_point(|(t, _)| *t < range.end);
        &self.rows[start..end]
    }
}

impl<T: ColumnValue> ScanSource<T> for MemoryColumn<T> {
    fn scan(
        &self,
        range: &TimeRange,
        bounds: Option<&ValueBounds<T>>,
    ) -> Result<RowStream<'_, T>, Error> {
        let bounds = bounds.copied().unwrap_or_else(ValueBounds::unbounded);
        let iter = self
            .range_slice(range)
            .iter()
            .filter(move |(_, value)| bounds.accepts(value))
            .map(|(_, value)| Ok(*value));
        Ok(Box::new(iter))
    }

    fn row_count(&self, range: &TimeRange) -> Result<u64, Error> {
        Ok(self.range_slice(range).len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_filters_by_time_and_value() {
        let column = MemoryColumn::new(vec![(0, 10i64), (1, 20), (2, 30), (3, 40)]);
        let bounds = ValueBounds {
            lower: Some(20),
            upper: Some(40),
        };
        let values: Vec<i64> = column
            .scan(&TimeRange::new(1, 4), Some(&bounds))
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        assert_eq!(values, vec![20, 30]);
    }

    #[test]
    fn test_row_count_ignores_value_bounds() {
        let column = MemoryColumn::from_values(vec![1.0f64, 2.0, 3.0]);
        assert_eq!(column.row_count(&TimeRange::new(0, 2)).unwrap(), 2);
    }

    #[test]
    #[should_panic(expected = "rows must be sorted by timestamp")]
    fn test_unsorted_rows_panic() {
        let _ = MemoryColumn::new(vec![(2, 1i64), (1, 2)]);
    }
}
