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

//! Exact quantiles over large, time-ordered numeric columns under a strict
//! memory budget.
//!
//! Single-pass rank sketches give fast bounded-memory estimates but no
//! exactness guarantee; sorting the whole range is infeasible at scale.
//! This crate resolves the tension by iterative narrowing: a compact rank
//! sketch proposes a candidate value interval for the target rank, each
//! subsequent pass rescans only the rows inside the shrinking interval with
//! exact counts, and the loop stops when the interval provably pins the
//! exact order statistic. Several quantiles resolve from shared passes.
//!
//! - [`rank`]: the mergeable rank sketch (compactor hierarchy).
//! - [`query`]: interval narrowing, the quantile engine, the multi-quantile
//!   coordinator, and the query-option surface.
//! - [`scan`]: the storage-layer scan interface and an in-memory column.
//! - [`value`]: supported column value types.
//!
//! # Usage
//!
//! ```rust
//! use exact_quantiles::query;
//! use exact_quantiles::query::QueryContext;
//! use exact_quantiles::query::QuantileRequest;
//! use exact_quantiles::query::QueryReply;
//! use exact_quantiles::scan::MemoryColumn;
//! use exact_quantiles::scan::TimeRange;
//!
//! let column = MemoryColumn::from_values(vec![5.0f64, 1.0, 4.0, 2.0, 3.0]);
//! let ctx = QueryContext::new(TimeRange::all());
//! let reply = query::execute(&column, &ctx, &QuantileRequest::Single(0.5)).unwrap();
//! assert_eq!(reply, QueryReply::Values(vec![3.0]));
//! ```

mod codec;
pub mod common;
pub mod error;
pub mod query;
pub mod rank;
pub mod scan;
pub mod value;
