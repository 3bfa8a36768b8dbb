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

use crate::scan::ValueBounds;
use crate::value::ColumnValue;

/// Half-open value range `[lower, upper)` known to contain a target rank,
/// together with the exact number of rows of the queried range that lie
/// strictly below `lower`.
///
/// Across iterations of one target the interval only shrinks: `lower` never
/// decreases and `upper` never increases. `count_below_lower` is always an
/// exact count, never an estimate; it anchors the target's absolute rank to
/// a rank local to the interval.
#[derive(Debug, Clone, Copy)]
pub struct Interval<T> {
    /// Inclusive lower bound; `None` is unbounded.
    pub lower: Option<T>,
    /// Exclusive upper bound; `None` is unbounded.
    pub upper: Option<T>,
    /// Exact count of rows strictly below `lower`.
    pub count_below_lower: u64,
}

impl<T: ColumnValue> Interval<T> {
    /// The interval covering the whole value domain.
    pub fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
            count_below_lower: 0,
        }
    }

    /// Returns the interval as scan filter bounds.
    pub fn bounds(&self) -> ValueBounds<T> {
        ValueBounds {
            lower: self.lower,
            upper: self.upper,
        }
    }

    /// Returns true if the value falls inside the interval.
    pub fn contains(&self, value: &T) -> bool {
        self.bounds().accepts(value)
    }

    /// Numeric width of the interval, when both sides are bounded.
    pub fn width(&self) -> Option<f64> {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => Some(upper.as_f64() - lower.as_f64()),
            _ => None,
        }
    }
}

pub(crate) fn bound_eq<T: ColumnValue>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => T::total_cmp(a, b) == Ordering::Equal,
        _ => false,
    }
}

/// Picks the lower of two optional lower bounds (`None` is unbounded below).
pub(crate) fn min_lower<T: ColumnValue>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if T::total_cmp(&a, &b) == Ordering::Less {
                Some(a)
            } else {
                Some(b)
            }
        }
        _ => None,
    }
}

/// Picks the higher of two optional upper bounds (`None` is unbounded above).
pub(crate) fn max_upper<T: ColumnValue>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if T::total_cmp(&a, &b) == Ordering::Less {
                Some(b)
            } else {
                Some(a)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_contains_everything() {
        let interval = Interval::<f64>::unbounded();
        assert!(interval.contains(&f64::NEG_INFINITY));
        assert!(interval.contains(&0.0));
        assert!(interval.contains(&f64::NAN));
        assert_eq!(interval.width(), None);
    }

    #[test]
    fn test_half_open_membership() {
        let interval = Interval {
            lower: Some(1i64),
            upper: Some(4i64),
            count_below_lower: 7,
        };
        assert!(interval.contains(&1));
        assert!(interval.contains(&3));
        assert!(!interval.contains(&4));
        assert!(!interval.contains(&0));
        assert_eq!(interval.width(), Some(3.0));
    }

    #[test]
    fn test_hull_helpers() {
        assert_eq!(min_lower(Some(1i64), Some(2i64)), Some(1));
        assert_eq!(min_lower(Some(1i64), None), None);
        assert_eq!(max_upper(Some(1i64), Some(2i64)), Some(2));
        assert_eq!(max_upper(None, Some(2i64)), None);
    }
}
