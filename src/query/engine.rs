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

use super::QueryContext;
use super::interval::max_upper;
use super::interval::min_lower;
use super::narrower::CandidateNarrower;
use super::narrower::NarrowStep;
use super::target::IterationRecord;
use super::target::QuantileTarget;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::rank::items_for_budget;
use crate::rank::k_for_budget;
use crate::scan::ScanSource;
use crate::scan::ValueBounds;
use crate::value::ColumnValue;

// rows between cancellation polls during a pass
const CANCEL_POLL_INTERVAL: u64 = 4096;

/// Drives the iterate-narrow-rescan loop for one or more targets.
///
/// Each iteration performs exactly one pass over the hull of the unresolved
/// targets' intervals; the scanned subset strictly shrinks per target every
/// iteration. Reaching the iteration cap with an unresolved target surfaces
/// [`ErrorKind::BudgetExceeded`] instead of an approximate answer.
///
/// # Examples
///
/// ```
/// # use exact_quantiles::query::{QuantileEngine, QueryContext};
/// # use exact_quantiles::scan::{MemoryColumn, TimeRange};
/// let column = MemoryColumn::from_values(vec![5.0f64, 1.0, 4.0, 2.0, 3.0]);
/// let ctx = QueryContext::new(TimeRange::all());
/// let engine = QuantileEngine::new(&column, &ctx);
/// let target = engine.resolve_quantile(0.5).unwrap().unwrap();
/// assert_eq!(target.value(), Some(3.0));
/// ```
pub struct QuantileEngine<'a, S: ?Sized> {
    source: &'a S,
    ctx: &'a QueryContext,
}

impl<'a, S: ?Sized> QuantileEngine<'a, S> {
    /// Creates an engine bound to one scan source and one query context.
    pub fn new(source: &'a S, ctx: &'a QueryContext) -> Self {
        Self { source, ctx }
    }

    /// Resolves the value at a fractional rank in `[0, 1]`.
    ///
    /// Returns `None` when the queried range holds no rows.
    pub fn resolve_quantile<T>(&self, fraction: f64) -> Result<Option<QuantileTarget<T>>, Error>
    where
        T: ColumnValue,
        S: ScanSource<T>,
    {
        if fraction.is_nan() || !(0.0..=1.0).contains(&fraction) {
            return Err(Error::invalid_rank(format!(
                "quantile fraction must be in [0, 1], got {fraction}"
            )));
        }
        let rows = self.source.row_count(&self.ctx.time_range)?;
        if rows == 0 {
            return Ok(None);
        }
        self.resolve_checked_rank(fraction_to_rank(fraction, rows))
    }

    /// Resolves the value at an absolute 0-based rank.
    ///
    /// Returns `None` when the queried range holds no rows.
    pub fn resolve_rank<T>(&self, rank: u64) -> Result<Option<QuantileTarget<T>>, Error>
    where
        T: ColumnValue,
        S: ScanSource<T>,
    {
        let rows = self.source.row_count(&self.ctx.time_range)?;
        if rows == 0 {
            return Ok(None);
        }
        if rank >= rows {
            return Err(Error::invalid_rank(format!(
                "rank {rank} out of range for {rows} rows"
            )));
        }
        self.resolve_checked_rank(rank)
    }

    fn resolve_checked_rank<T>(&self, rank: u64) -> Result<Option<QuantileTarget<T>>, Error>
    where
        T: ColumnValue,
        S: ScanSource<T>,
    {
        let mut targets = vec![QuantileTarget::new(rank)];
        self.drive(&mut targets)?;
        Ok(targets.pop())
    }

    /// Runs shared passes until every target resolves or the iteration
    /// budget runs out.
    pub(crate) fn drive<T>(&self, targets: &mut [QuantileTarget<T>]) -> Result<(), Error>
    where
        T: ColumnValue,
        S: ScanSource<T>,
    {
        if targets.iter().all(QuantileTarget::is_resolved) {
            return Ok(());
        }
        // fail on a non-viable budget before touching any data
        let _ = self.sketch_budget::<T>(targets.len())?;

        let mut seed_stream = XorShift64::seeded(self.ctx.sketch_seed);
        for iteration in 0..self.ctx.max_iterations {
            self.ctx.check_cancelled()?;

            let live = targets.iter().filter(|t| !t.is_resolved()).count();
            let (sketch_k, buffer_cap) = self.sketch_budget::<T>(live)?;

            let mut hull: Option<ValueBounds<T>> = None;
            let mut narrowers: Vec<(usize, CandidateNarrower<T>)> = Vec::with_capacity(live);
            for (index, target) in targets.iter().enumerate() {
                let Some(search) = target.search_state() else {
                    continue;
                };
                hull = Some(match hull {
                    None => search.interval.bounds(),
                    Some(h) => ValueBounds {
                        lower: min_lower(h.lower, search.interval.lower),
                        upper: max_upper(h.upper, search.interval.upper),
                    },
                });
                narrowers.push((
                    index,
                    CandidateNarrower::new(
                        search,
                        target.rank(),
                        sketch_k,
                        buffer_cap,
                        seed_stream.next_u64(),
                    ),
                ));
            }

            let filter = hull.filter(|bounds| !bounds.is_unbounded());
            let stream = self.source.scan(&self.ctx.time_range, filter.as_ref())?;

            let mut seen = 0u64;
            for row in stream {
                let value = row?;
                for (_, narrower) in narrowers.iter_mut() {
                    narrower.observe(value);
                }
                seen += 1;
                if seen % CANCEL_POLL_INTERVAL == 0 {
                    self.ctx.check_cancelled()?;
                }
            }

            let mut resolved_this_pass = 0usize;
            for (index, narrower) in narrowers {
                let record = IterationRecord {
                    iteration,
                    interval_width: narrower.interval_width(),
                    rows_scanned: narrower.rows_in_interval(),
                };
                let step = narrower.conclude()?;
                let target = &mut targets[index];
                target.push_record(record);
                match step {
                    NarrowStep::Resolved(value) => {
                        target.resolve(value);
                        resolved_this_pass += 1;
                    }
                    NarrowStep::Narrowed(search) => target.continue_with(search),
                }
            }

            log::debug!(
                "pass {iteration}: {seen} rows scanned, {live} live targets, {resolved_this_pass} resolved"
            );

            if targets.iter().all(QuantileTarget::is_resolved) {
                return Ok(());
            }
        }

        let unresolved = targets.iter().filter(|t| !t.is_resolved()).count();
        Err(Error::new(
            ErrorKind::BudgetExceeded,
            "iteration cap reached before every target converged",
        )
        .with_context("max_iterations", self.ctx.max_iterations)
        .with_context("unresolved_targets", unresolved))
    }

    // Splits the per-query byte budget across live targets, half to the
    // exact-selection buffer and half to the sketch, so one pass never
    // holds more than the configured budget.
    fn sketch_budget<T: ColumnValue>(&self, live: usize) -> Result<(u16, usize), Error> {
        let share = self.ctx.memory_budget_bytes / live.max(1) / 2;
        let sketch_k = k_for_budget(share, T::SIZE_BYTES)?;
        Ok((sketch_k, items_for_budget(share, T::SIZE_BYTES)))
    }
}

pub(crate) fn fraction_to_rank(fraction: f64, rows: u64) -> u64 {
    let scaled = ((rows - 1) as f64 * fraction).round() as u64;
    scaled.min(rows - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_to_rank_endpoints() {
        assert_eq!(fraction_to_rank(0.0, 5), 0);
        assert_eq!(fraction_to_rank(1.0, 5), 4);
        assert_eq!(fraction_to_rank(0.5, 5), 2);
    }

    #[test]
    fn test_fraction_to_rank_single_row() {
        assert_eq!(fraction_to_rank(0.0, 1), 0);
        assert_eq!(fraction_to_rank(1.0, 1), 0);
    }
}
