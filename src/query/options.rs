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

//! Query-option surface consumed from the surrounding query layer.
//!
//! Options arrive as string key/value pairs, e.g.
//! `memory = '1024B'`, `quantile = '0.5'`, `multi_quantiles = '10'`,
//! `return_type = 'iteration_num'`. Everything is validated here, before
//! any scan is issued.

use crate::error::Error;

/// Default per-query sketch memory budget.
pub const DEFAULT_MEMORY_BUDGET_BYTES: usize = 1024 * 1024;

/// What a resolved query reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnMode {
    /// The resolved value per target.
    #[default]
    Value,
    /// The per-target pass count, the cost metric used for benchmarking.
    IterationNum,
}

/// The set of target ranks a query asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuantileRequest {
    /// One target at a fractional rank in `[0, 1]`.
    Single(f64),
    /// `n` evenly spaced targets over the queried range.
    EvenlySpaced(u32),
}

/// Validated query options.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Hard cap on working memory for the query.
    pub memory_budget_bytes: usize,
    /// The requested target ranks.
    pub request: QuantileRequest,
    /// Whether values or iteration counts are returned.
    pub return_mode: ReturnMode,
}

impl QueryOptions {
    /// Parses option key/value pairs as supplied by the query layer.
    ///
    /// Exactly one of `quantile` and `multi_quantiles` must be present.
    /// Invalid fractions and counts are rejected with `InvalidRank`,
    /// unparsable values and unknown keys with `ConfigInvalid`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use exact_quantiles::query::{QueryOptions, QuantileRequest};
    /// let options = QueryOptions::parse([("memory", "4096B"), ("quantile", "0.5")]).unwrap();
    /// assert_eq!(options.memory_budget_bytes, 4096);
    /// assert_eq!(options.request, QuantileRequest::Single(0.5));
    /// ```
    pub fn parse<'a, I>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut memory_budget_bytes = DEFAULT_MEMORY_BUDGET_BYTES;
        let mut quantile: Option<f64> = None;
        let mut multi_quantiles: Option<u32> = None;
        let mut return_mode = ReturnMode::default();

        for (key, value) in pairs {
            match key {
                "memory" => memory_budget_bytes = parse_memory(value)?,
                "quantile" => {
                    let fraction: f64 = value.parse().map_err(|_| {
                        Error::config(format!("unparsable quantile fraction: {value:?}"))
                    })?;
                    if fraction.is_nan() || !(0.0..=1.0).contains(&fraction) {
                        return Err(Error::invalid_rank(format!(
                            "quantile fraction must be in [0, 1], got {value}"
                        )));
                    }
                    quantile = Some(fraction);
                }
                "multi_quantiles" => {
                    let count: u32 = value.parse().map_err(|_| {
                        Error::config(format!("unparsable multi-quantile count: {value:?}"))
                    })?;
                    if count == 0 {
                        return Err(Error::invalid_rank("multi-quantile count must be positive"));
                    }
                    multi_quantiles = Some(count);
                }
                "return_type" => {
                    return_mode = match value {
                        "value" => ReturnMode::Value,
                        "iteration_num" => ReturnMode::IterationNum,
                        other => {
                            return Err(Error::config(format!("unknown return type: {other:?}")));
                        }
                    };
                }
                other => {
                    return Err(Error::config("unknown query option").with_context("key", other));
                }
            }
        }

        let request = match (quantile, multi_quantiles) {
            (Some(fraction), None) => QuantileRequest::Single(fraction),
            (None, Some(count)) => QuantileRequest::EvenlySpaced(count),
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "quantile and multi_quantiles are mutually exclusive",
                ));
            }
            (None, None) => {
                return Err(Error::config(
                    "one of quantile or multi_quantiles is required",
                ));
            }
        };

        Ok(Self {
            memory_budget_bytes,
            request,
            return_mode,
        })
    }
}

// Accepts "<n>B", "<n>KB", "<n>MB".
fn parse_memory(value: &str) -> Result<usize, Error> {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, suffix) = value.split_at(digits_end);
    let unit: usize = match suffix {
        "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        _ => return Err(Error::config(format!("unparsable memory budget: {value:?}"))),
    };
    let amount: usize = digits
        .parse()
        .map_err(|_| Error::config(format!("unparsable memory budget: {value:?}")))?;
    Ok(amount * unit)
}
