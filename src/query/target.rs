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

use super::interval::Interval;
use crate::scan::ValueBounds;
use crate::value::ColumnValue;

/// One requested rank and the progress made toward resolving it.
#[derive(Debug, Clone)]
pub struct QuantileTarget<T> {
    rank: u64,
    state: TargetState<T>,
    records: Vec<IterationRecord>,
}

/// Per-target resolution state.
#[derive(Debug, Clone)]
pub enum TargetState<T> {
    /// Still narrowing; holds the current interval and the candidate
    /// sub-range the next pass will probe.
    Searching(SearchState<T>),
    /// The exact value at the target rank.
    Resolved(T),
}

/// Interval and candidate carried between passes of an unresolved target.
#[derive(Debug, Clone)]
pub struct SearchState<T> {
    pub(crate) interval: Interval<T>,
    pub(crate) candidate: ValueBounds<T>,
}

/// Cost record appended after each pass over a target's interval.
#[derive(Debug, Clone, Copy)]
pub struct IterationRecord {
    /// Zero-based pass index within the query.
    pub iteration: u32,
    /// Numeric width of the interval scanned by this pass, when bounded.
    pub interval_width: Option<f64>,
    /// Rows of this pass that fell inside the target's interval.
    pub rows_scanned: u64,
}

impl<T: ColumnValue> QuantileTarget<T> {
    /// Creates an unresolved target for an absolute 0-based rank.
    pub fn new(rank: u64) -> Self {
        let interval = Interval::unbounded();
        Self {
            rank,
            state: TargetState::Searching(SearchState {
                candidate: interval.bounds(),
                interval,
            }),
            records: Vec::new(),
        }
    }

    /// The absolute 0-based rank this target resolves.
    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Returns the resolved value, if the target has converged.
    pub fn value(&self) -> Option<T> {
        match &self.state {
            TargetState::Resolved(value) => Some(*value),
            TargetState::Searching(_) => None,
        }
    }

    /// Returns true once the exact value is known.
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, TargetState::Resolved(_))
    }

    /// Number of narrowing passes this target consumed.
    pub fn iterations(&self) -> u32 {
        self.records.len() as u32
    }

    /// Per-pass cost records, oldest first.
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub(crate) fn search_state(&self) -> Option<&SearchState<T>> {
        match &self.state {
            TargetState::Searching(search) => Some(search),
            TargetState::Resolved(_) => None,
        }
    }

    pub(crate) fn resolve(&mut self, value: T) {
        self.state = TargetState::Resolved(value);
    }

    pub(crate) fn continue_with(&mut self, search: SearchState<T>) {
        self.state = TargetState::Searching(search);
    }

    pub(crate) fn push_record(&mut self, record: IterationRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_target_is_unresolved() {
        let target = QuantileTarget::<i64>::new(3);
        assert_eq!(target.rank(), 3);
        assert!(!target.is_resolved());
        assert_eq!(target.value(), None);
        assert_eq!(target.iterations(), 0);
    }

    #[test]
    fn test_resolve_transitions_state() {
        let mut target = QuantileTarget::<i64>::new(0);
        target.resolve(42);
        assert!(target.is_resolved());
        assert_eq!(target.value(), Some(42));
        assert!(target.search_state().is_none());
    }
}
