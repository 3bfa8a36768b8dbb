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

//! Exact quantile resolution by iterative interval narrowing.
//!
//! A query starts from a sketch-derived candidate interval and alternates
//! approximate and exact information: each iteration rescans only the rows
//! whose value lies in the shrinking interval, keeps exact counts, and
//! either resolves the target or derives a provably smaller interval. The
//! answer is always the exact order statistic; the sketch only steers where
//! the next pass looks.
//!
//! # Usage
//!
//! ```rust
//! use exact_quantiles::query;
//! use exact_quantiles::query::QueryContext;
//! use exact_quantiles::query::QueryOptions;
//! use exact_quantiles::query::QueryReply;
//! use exact_quantiles::scan::MemoryColumn;
//! use exact_quantiles::scan::TimeRange;
//!
//! let column = MemoryColumn::from_values(vec![5i64, 1, 4, 2, 3]);
//! let options = QueryOptions::parse([("quantile", "0.5")]).unwrap();
//! let ctx = QueryContext::new(TimeRange::all()).with_options(&options);
//! let reply = query::execute(&column, &ctx, &options.request).unwrap();
//! assert_eq!(reply, QueryReply::Values(vec![3]));
//! ```

mod coordinator;
mod engine;
mod interval;
mod narrower;
mod options;
mod target;

pub use self::coordinator::MultiQuantileCoordinator;
pub use self::engine::QuantileEngine;
pub use self::interval::Interval;
pub use self::options::DEFAULT_MEMORY_BUDGET_BYTES;
pub use self::options::QuantileRequest;
pub use self::options::QueryOptions;
pub use self::options::ReturnMode;
pub use self::target::IterationRecord;
pub use self::target::QuantileTarget;
pub use self::target::SearchState;
pub use self::target::TargetState;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::error::Error;
use crate::scan::ScanSource;
use crate::scan::TimeRange;
use crate::value::ColumnValue;

/// Default cap on narrowing iterations per query.
pub const DEFAULT_MAX_ITERATIONS: u32 = 32;

/// Shared handle used to abort a running query.
///
/// The engine polls the token between scan batches and between iterations;
/// a tripped token aborts with [`crate::error::ErrorKind::Cancelled`] and
/// drops all partial state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every query holding this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Immutable per-query execution parameters.
///
/// Owned exclusively by the engine or coordinator executing the query; the
/// memory budget is enforced per query, never pooled across queries.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub(crate) time_range: TimeRange,
    pub(crate) memory_budget_bytes: usize,
    pub(crate) max_iterations: u32,
    pub(crate) return_mode: ReturnMode,
    pub(crate) sketch_seed: u64,
    cancel: CancelToken,
}

impl QueryContext {
    /// Creates a context for a time range with default budget, iteration
    /// cap, and return mode.
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            return_mode: ReturnMode::default(),
            sketch_seed: 0,
            cancel: CancelToken::new(),
        }
    }

    /// Applies parsed query options to this context.
    pub fn with_options(mut self, options: &QueryOptions) -> Self {
        self.memory_budget_bytes = options.memory_budget_bytes;
        self.return_mode = options.return_mode;
        self
    }

    /// Sets the hard memory budget in bytes.
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    /// Sets the cap on narrowing iterations.
    pub fn with_max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Sets what a resolved query reports back.
    pub fn with_return_mode(mut self, mode: ReturnMode) -> Self {
        self.return_mode = mode;
        self
    }

    /// Seeds the compaction tie-break generator, making pass counts
    /// reproducible.
    pub fn with_sketch_seed(mut self, seed: u64) -> Self {
        self.sketch_seed = seed;
        self
    }

    /// Attaches an externally held cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// The queried time range.
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// Returns a handle that can cancel queries using this context.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::cancelled());
        }
        Ok(())
    }
}

/// What a completed query reports, per the context's return mode.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryReply<T> {
    /// The queried range holds no rows.
    NoData,
    /// The exact value per target, in rank order.
    Values(Vec<T>),
    /// The pass count per target, in rank order.
    IterationCounts(Vec<u32>),
}

/// Resolves a quantile request and reports per the context's return mode.
///
/// This is the surface the query-execution layer calls. An empty range
/// yields [`QueryReply::NoData`]; every error of the taxonomy in
/// [`crate::error::ErrorKind`] aborts the query instead.
pub fn execute<T, S>(
    source: &S,
    ctx: &QueryContext,
    request: &QuantileRequest,
) -> Result<QueryReply<T>, Error>
where
    T: ColumnValue,
    S: ScanSource<T> + ?Sized,
{
    let targets = match request {
        QuantileRequest::Single(fraction) => {
            match QuantileEngine::new(source, ctx).resolve_quantile(*fraction)? {
                None => return Ok(QueryReply::NoData),
                Some(target) => vec![target],
            }
        }
        QuantileRequest::EvenlySpaced(count) => {
            match MultiQuantileCoordinator::new(source, ctx).resolve_evenly_spaced(*count)? {
                None => return Ok(QueryReply::NoData),
                Some(targets) => targets,
            }
        }
    };

    Ok(match ctx.return_mode {
        ReturnMode::Value => QueryReply::Values(
            targets
                .iter()
                .map(|target| target.value().expect("driven targets are resolved"))
                .collect(),
        ),
        ReturnMode::IterationNum => {
            QueryReply::IterationCounts(targets.iter().map(QuantileTarget::iterations).collect())
        }
    })
}
