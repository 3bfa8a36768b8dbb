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

//! Rank sketch: a compact, mergeable summary for approximate rank queries.
//!
//! The sketch keeps a hierarchy of compaction levels. Level *i* holds a
//! bounded buffer of items, each implicitly weighted `2^i`. When the sketch
//! is full, the lowest over-full level is sorted and every other element is
//! promoted with doubled weight, halving the space it occupies. Rank
//! estimates are accurate within `ε·n` for `ε` a function of the capacity
//! parameter `k` alone, independent of stream length.
//!
//! The quantile engine uses the sketch only to *propose* candidate value
//! intervals; exactness never depends on the sketch bound holding.
//!
//! # Usage
//!
//! ```rust
//! # use exact_quantiles::rank::RankSketch;
//! let mut sketch = RankSketch::<f64>::new(200);
//! for i in 0..100 {
//!     sketch.update(i as f64);
//! }
//! let (lo, hi) = sketch.rank_bounds(&50.0);
//! assert!(lo <= 50 && 50 <= hi);
//! ```

mod sketch;
mod serialization;
mod view;

pub use self::sketch::RankSketch;

use crate::error::Error;

/// Default value of the capacity parameter k.
pub const DEFAULT_K: u16 = 200;
/// Minimum value of the capacity parameter k.
pub const MIN_K: u16 = 8;
/// Maximum value of the capacity parameter k.
pub const MAX_K: u16 = u16::MAX;

/// Smallest buffer a level may be granted regardless of its depth.
pub(crate) const LEVEL_CAPACITY_FLOOR: u32 = 8;

// Retained items are bounded by roughly 3k (geometric capacity decay) plus
// the floor granted to deep levels; 32 levels cover any stream the engine
// can address.
const FLOOR_RESERVE: usize = LEVEL_CAPACITY_FLOOR as usize * 32;

/// Returns how many retained items a byte budget affords for one sketch.
pub fn items_for_budget(budget_bytes: usize, item_size: usize) -> usize {
    budget_bytes / item_size.max(1)
}

/// Derives the capacity parameter k from a byte budget.
///
/// Returns `ConfigInvalid` if the budget cannot hold a minimal sketch.
pub fn k_for_budget(budget_bytes: usize, item_size: usize) -> Result<u16, Error> {
    let items = items_for_budget(budget_bytes, item_size);
    let usable = items.saturating_sub(FLOOR_RESERVE) / 3;
    if usable < MIN_K as usize {
        return Err(Error::config("memory budget below minimal sketch capacity")
            .with_context("budget_bytes", budget_bytes)
            .with_context("item_size", item_size));
    }
    Ok(usable.min(MAX_K as usize) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_for_budget_rejects_tiny_budgets() {
        let err = k_for_budget(64, 8).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_k_for_budget_scales_with_budget() {
        let small = k_for_budget(16 * 1024, 8).unwrap();
        let large = k_for_budget(1024 * 1024, 8).unwrap();
        assert!(small >= MIN_K);
        assert!(large > small);
    }
}
