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
use super::engine::QuantileEngine;
use super::target::QuantileTarget;
use crate::error::Error;
use crate::scan::ScanSource;
use crate::value::ColumnValue;

/// Resolves several target ranks from shared physical passes.
///
/// Every pass classifies each scanned row against all unresolved targets at
/// once, so the total scan cost of `m` simultaneous quantiles is bounded by
/// the passes of the slowest target, not by `m` independent runs. Targets
/// retire independently; scanning continues while any remains unresolved.
///
/// # Examples
///
/// ```
/// # use exact_quantiles::query::{MultiQuantileCoordinator, QueryContext};
/// # use exact_quantiles::scan::{MemoryColumn, TimeRange};
/// let column = MemoryColumn::from_values(vec![5i64, 1, 4, 2, 3]);
/// let ctx = QueryContext::new(TimeRange::all());
/// let coordinator = MultiQuantileCoordinator::new(&column, &ctx);
/// let targets = coordinator.resolve_evenly_spaced(5).unwrap().unwrap();
/// let values: Vec<i64> = targets.iter().map(|t| t.value().unwrap()).collect();
/// assert_eq!(values, vec![1, 2, 3, 4, 5]);
/// ```
pub struct MultiQuantileCoordinator<'a, S: ?Sized> {
    source: &'a S,
    ctx: &'a QueryContext,
}

impl<'a, S: ?Sized> MultiQuantileCoordinator<'a, S> {
    /// Creates a coordinator bound to one scan source and query context.
    pub fn new(source: &'a S, ctx: &'a QueryContext) -> Self {
        Self { source, ctx }
    }

    /// Resolves `count` evenly spaced quantiles over the queried range.
    ///
    /// Target ranks are `ceil(i * rows / count)` for `i in 0..count`,
    /// clamped to the last rank. Returns one resolved target per requested
    /// position, in rank order, or `None` when the range holds no rows.
    pub fn resolve_evenly_spaced<T>(
        &self,
        count: u32,
    ) -> Result<Option<Vec<QuantileTarget<T>>>, Error>
    where
        T: ColumnValue,
        S: ScanSource<T>,
    {
        if count == 0 {
            return Err(Error::invalid_rank("multi-quantile count must be positive"));
        }
        let rows = self.source.row_count(&self.ctx.time_range)?;
        if rows == 0 {
            return Ok(None);
        }
        let ranks: Vec<u64> = (0..count as u64)
            .map(|i| evenly_spaced_rank(i, rows, count as u64))
            .collect();
        self.resolve_ranks(&ranks).map(Some)
    }

    /// Resolves an explicit set of absolute 0-based ranks.
    ///
    /// Duplicate ranks share one resolution. Results come back in the order
    /// the ranks were given.
    pub fn resolve_ranks<T>(&self, ranks: &[u64]) -> Result<Vec<QuantileTarget<T>>, Error>
    where
        T: ColumnValue,
        S: ScanSource<T>,
    {
        let rows = self.source.row_count(&self.ctx.time_range)?;
        for rank in ranks {
            if *rank >= rows {
                return Err(Error::invalid_rank(format!(
                    "rank {rank} out of range for {rows} rows"
                )));
            }
        }

        let mut unique: Vec<u64> = ranks.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut targets: Vec<QuantileTarget<T>> =
            unique.iter().map(|rank| QuantileTarget::new(*rank)).collect();
        QuantileEngine::new(self.source, self.ctx).drive(&mut targets)?;

        let resolved = ranks
            .iter()
            .map(|rank| {
                let index = unique.binary_search(rank).expect("rank was inserted");
                targets[index].clone()
            })
            .collect();
        Ok(resolved)
    }
}

fn evenly_spaced_rank(index: u64, rows: u64, count: u64) -> u64 {
    let rank = (index as u128 * rows as u128).div_ceil(count as u128) as u64;
    rank.min(rows - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evenly_spaced_ranks_cover_the_range() {
        // five targets over five rows hit every rank
        let ranks: Vec<u64> = (0..5).map(|i| evenly_spaced_rank(i, 5, 5)).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_evenly_spaced_ranks_clamp() {
        let ranks: Vec<u64> = (0..5).map(|i| evenly_spaced_rank(i, 3, 5)).collect();
        assert_eq!(ranks, vec![0, 1, 2, 2, 2]);
    }
}
