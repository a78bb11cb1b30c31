// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cross-run result comparison.

use crate::BenchError;
use std::ops::Range;
use work_store::{ResultSet, WorkItemStore};

/// Σ|baseline − multi| over every pixel of the images in `range`,
/// accumulated in `f64`.
pub fn discrepancy(store: &WorkItemStore, range: Range<usize>) -> Result<f64, BenchError> {
    let items = store.items_in(range)?;
    Ok(items
        .iter()
        .map(|item| {
            let baseline = item.result(ResultSet::Baseline).read();
            let multi = item.result(ResultSet::Multi).read();
            abs_diff_sum(&baseline, &multi)
        })
        .sum())
}

/// Σ|a − b| between two snapshots of the same images.
pub fn snapshot_discrepancy(a: &[Vec<f32>], b: &[Vec<f32>]) -> f64 {
    a.iter().zip(b).map(|(x, y)| abs_diff_sum(x, y)).sum()
}

fn abs_diff_sum(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs())
        .sum()
}
