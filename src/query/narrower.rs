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

use super::interval::Interval;
use super::interval::bound_eq;
use super::target::SearchState;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::rank::RankSketch;
use crate::scan::ValueBounds;
use crate::value::ColumnValue;

/// Per-target accumulator for one pass over the target's interval.
///
/// A pass classifies every row of the interval against the candidate
/// sub-range with exact counts, tracks the exact min/max inside the
/// candidate, and buffers candidate rows until the buffer cap is hit; only
/// then does it fall back to sketching. Concluding the pass either resolves
/// the target or yields a strictly smaller interval:
///
/// - the exact counts prove which side of the candidate holds the target,
///   so a sketch-derived candidate that missed routes to a flank instead of
///   invalidating the run;
/// - a candidate that held the target resolves by exact selection over the
///   buffer, collapses on duplicates, or narrows again through a fresh
///   sketch built only over the candidate's rows.
pub(crate) struct CandidateNarrower<T: ColumnValue> {
    interval: Interval<T>,
    candidate: ValueBounds<T>,
    local_rank: u64,
    below: u64,
    inside: u64,
    above: u64,
    min_inside: Option<T>,
    max_inside: Option<T>,
    buffer: Option<Vec<T>>,
    buffer_cap: usize,
    sketch: Option<RankSketch<T>>,
    sketch_k: u16,
    sketch_seed: u64,
}

/// Outcome of one concluded pass.
#[derive(Debug)]
pub(crate) enum NarrowStep<T> {
    Resolved(T),
    Narrowed(SearchState<T>),
}

impl<T: ColumnValue> CandidateNarrower<T> {
    pub fn new(
        search: &SearchState<T>,
        rank: u64,
        sketch_k: u16,
        buffer_cap: usize,
        sketch_seed: u64,
    ) -> Self {
        debug_assert!(rank >= search.interval.count_below_lower);
        Self {
            interval: search.interval,
            candidate: search.candidate,
            local_rank: rank - search.interval.count_below_lower,
            below: 0,
            inside: 0,
            above: 0,
            min_inside: None,
            max_inside: None,
            buffer: Some(Vec::new()),
            buffer_cap,
            sketch: None,
            sketch_k,
            sketch_seed,
        }
    }

    /// Classifies one scanned row. Rows outside the interval were either
    /// counted by an earlier iteration or belong to another target sharing
    /// the pass.
    pub fn observe(&mut self, value: T) {
        if !self.interval.contains(&value) {
            return;
        }
        if let Some(lower) = &self.candidate.lower {
            if T::total_cmp(&value, lower) == Ordering::Less {
                self.below += 1;
                return;
            }
        }
        if let Some(upper) = &self.candidate.upper {
            if T::total_cmp(&value, upper) != Ordering::Less {
                self.above += 1;
                return;
            }
        }

        self.inside += 1;
        match &self.min_inside {
            Some(min) if T::total_cmp(&value, min) != Ordering::Less => {}
            _ => self.min_inside = Some(value),
        }
        match &self.max_inside {
            Some(max) if T::total_cmp(&value, max) != Ordering::Greater => {}
            _ => self.max_inside = Some(value),
        }

        match &mut self.buffer {
            Some(buffer) => {
                if buffer.len() < self.buffer_cap {
                    buffer.push(value);
                } else {
                    // buffer is full: from here on this candidate is
                    // summarized, not held exactly
                    let mut sketch = RankSketch::seeded(self.sketch_k, self.sketch_seed);
                    for item in buffer.drain(..) {
                        sketch.update(item);
                    }
                    sketch.update(value);
                    self.sketch = Some(sketch);
                    self.buffer = None;
                }
            }
            None => {
                self.sketch
                    .as_mut()
                    .expect("sketch exists once the buffer overflows")
                    .update(value);
            }
        }
    }

    /// Rows of this pass that fell inside the target's interval.
    pub fn rows_in_interval(&self) -> u64 {
        self.below + self.inside + self.above
    }

    /// Width of the interval this pass scanned.
    pub fn interval_width(&self) -> Option<f64> {
        self.interval.width()
    }

    /// Concludes the pass: resolve the target or derive the next interval.
    pub fn conclude(self) -> Result<NarrowStep<T>, Error> {
        if self.rows_in_interval() == 0 {
            // exact counts from the previous pass proved the interval
            // non-empty, so the source contradicted itself
            return Err(Error::new(
                ErrorKind::ScanFailure,
                "scan returned no rows for a non-empty interval",
            )
            .with_context("count_below_lower", self.interval.count_below_lower));
        }

        let rank = self.local_rank;
        if rank < self.below {
            return Ok(self.route_to_lower_flank());
        }
        if rank - self.below >= self.inside {
            return Ok(self.route_to_upper_flank());
        }

        let rank_in_candidate = rank - self.below;
        let interval = Interval {
            lower: self.candidate.lower,
            upper: self.candidate.upper,
            count_below_lower: self.interval.count_below_lower + self.below,
        };

        // the candidate held fewer rows than the buffer cap: select exactly
        if let Some(mut buffer) = self.buffer {
            debug_assert_eq!(buffer.len() as u64, self.inside);
            let index = rank_in_candidate as usize;
            let (_, value, _) = buffer.select_nth_unstable_by(index, T::total_cmp);
            return Ok(NarrowStep::Resolved(*value));
        }

        let min_inside = self.min_inside.expect("candidate held at least one row");
        let max_inside = self.max_inside.expect("candidate held at least one row");

        // first and last local ranks reduce to the exact extremes
        if rank_in_candidate == 0 {
            return Ok(NarrowStep::Resolved(min_inside));
        }
        if rank_in_candidate == self.inside - 1 {
            return Ok(NarrowStep::Resolved(max_inside));
        }
        // duplicates collapsing the candidate resolve every covered rank
        if T::total_cmp(&min_inside, &max_inside) == Ordering::Equal {
            return Ok(NarrowStep::Resolved(min_inside));
        }

        let sketch = self
            .sketch
            .as_ref()
            .expect("unbuffered candidate has a sketch");
        let (low, high) = sketch
            .bounds_for_rank(rank_in_candidate)
            .expect("sketch saw every candidate row");

        let mut cand_lower = match &interval.lower {
            Some(bound) if T::total_cmp(&low, bound) == Ordering::Less => Some(*bound),
            _ => Some(low),
        };
        let mut cand_upper = match (high.next_up(), &interval.upper) {
            (Some(excl), Some(bound)) => {
                if T::total_cmp(bound, &excl) == Ordering::Less {
                    Some(*bound)
                } else {
                    Some(excl)
                }
            }
            (Some(excl), None) => Some(excl),
            (None, bound) => *bound,
        };

        // the sketch made no progress: split the candidate at the midpoint
        // and let the next pass route on exact counts
        if bound_eq(&cand_lower, &self.candidate.lower) && bound_eq(&cand_upper, &self.candidate.upper)
        {
            let mut mid = T::midpoint(min_inside, max_inside);
            if T::total_cmp(&mid, &min_inside) != Ordering::Greater {
                mid = min_inside
                    .next_up()
                    .expect("distinct min and max leave room above min");
            }
            cand_lower = interval.lower;
            cand_upper = Some(mid);
            log::trace!(
                "rank {rank}: midpoint fallback over {} rows",
                self.inside
            );
        } else {
            log::trace!(
                "rank {rank}: sketch narrowed {} rows to a sub-candidate",
                self.inside
            );
        }

        Ok(NarrowStep::Narrowed(SearchState {
            interval,
            candidate: ValueBounds {
                lower: cand_lower,
                upper: cand_upper,
            },
        }))
    }

    fn route_to_lower_flank(self) -> NarrowStep<T> {
        let interval = Interval {
            lower: self.interval.lower,
            upper: self.candidate.lower,
            count_below_lower: self.interval.count_below_lower,
        };
        log::trace!(
            "rank {}: candidate missed low, routing to flank of {} rows",
            self.local_rank,
            self.below
        );
        NarrowStep::Narrowed(SearchState {
            candidate: interval.bounds(),
            interval,
        })
    }

    fn route_to_upper_flank(self) -> NarrowStep<T> {
        let interval = Interval {
            lower: self.candidate.upper,
            upper: self.interval.upper,
            count_below_lower: self.interval.count_below_lower + self.below + self.inside,
        };
        log::trace!(
            "rank {}: candidate missed high, routing to flank of {} rows",
            self.local_rank,
            self.above
        );
        NarrowStep::Narrowed(SearchState {
            candidate: interval.bounds(),
            interval,
        })
    }
}
