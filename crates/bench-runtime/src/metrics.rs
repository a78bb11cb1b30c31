// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run reports and device profiling records.

use compute_platform::CompletionToken;
use dispatch::PipelineTokens;
use std::time::Duration;

/// Device timestamps of one command.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProfileRecord {
    /// Kernel entry point, or `upload` / `download`.
    pub name: String,
    pub device_index: usize,
    pub image: usize,
    pub queued: u64,
    pub submitted: u64,
    pub start: u64,
    pub end: u64,
}

impl ProfileRecord {
    /// `None` if the token carries no profiling data.
    pub fn from_token(token: &CompletionToken, image: usize) -> Option<Self> {
        let info = token.profiling_info().ok()?;
        Some(Self {
            name: token.label().to_string(),
            device_index: token.device_index(),
            image,
            queued: info.queued,
            submitted: info.submitted,
            start: info.start,
            end: info.end,
        })
    }

    /// Records for every stage of every pipeline, ordered by image.
    pub fn collect(pipelines: &[PipelineTokens]) -> Vec<Self> {
        let mut ordered: Vec<&PipelineTokens> = pipelines.iter().collect();
        ordered.sort_by_key(|p| p.image);
        ordered
            .into_iter()
            .flat_map(|p| p.stages().filter_map(move |(_, token)| Self::from_token(token, p.image)))
            .collect()
    }

    /// `<name> <device> <queued> <submitted> <start> <end>`
    pub fn line(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.name, self.device_index, self.queued, self.submitted, self.start, self.end
        )
    }
}

/// The outcome of one measured strategy.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub label: String,
    pub strategy: String,
    pub num_devices: usize,
    pub images_processed: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
    /// Σ|baseline − multi| over the compared images; 0.0 for the baseline.
    pub discrepancy: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<ProfileRecord>,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl RunReport {
    /// Elapsed seconds per processed image; 0.0 if nothing was processed.
    pub fn time_per_image(&self) -> f64 {
        if self.images_processed == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() / self.images_processed as f64
    }

    /// `<label>: total=<s> time_per_image=<s> error=<d>`
    pub fn report_line(&self) -> String {
        format!(
            "{}: total={:.6} time_per_image={:.6} error={:.6}",
            self.label,
            self.elapsed.as_secs_f64(),
            self.time_per_image(),
            self.discrepancy
        )
    }

    /// Throughput relative to `baseline` (>1 is faster).
    pub fn speedup_over(&self, baseline: &RunReport) -> f64 {
        let own = self.time_per_image();
        if own <= 0.0 {
            return 0.0;
        }
        baseline.time_per_image() / own
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(label: &str, ms: u64, images: usize, discrepancy: f64) -> RunReport {
        RunReport {
            label: label.into(),
            strategy: "single".into(),
            num_devices: 1,
            images_processed: images,
            elapsed: Duration::from_millis(ms),
            discrepancy,
            profile: Vec::new(),
        }
    }

    #[test]
    fn test_report_line() {
        let r = report("single device", 1500, 30, 0.0);
        assert_eq!(
            r.report_line(),
            "single device: total=1.500000 time_per_image=0.050000 error=0.000000"
        );
    }

    #[test]
    fn test_zero_images() {
        let r = report("4x device (single thread)", 10, 0, 0.0);
        assert_eq!(r.time_per_image(), 0.0);
        assert_eq!(r.speedup_over(&report("single device", 100, 10, 0.0)), 0.0);
    }

    #[test]
    fn test_speedup() {
        let base = report("single device", 400, 16, 0.0);
        let multi = report("4x device (multi thread)", 100, 16, 0.0);
        assert!((multi.speedup_over(&base) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_line() {
        let p = ProfileRecord {
            name: "nlm".into(),
            device_index: 2,
            image: 5,
            queued: 10,
            submitted: 11,
            start: 12,
            end: 20,
        };
        assert_eq!(p.line(), "nlm 2 10 11 12 20");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(report("single device", 2000, 4, 0.0)).unwrap();
        assert_eq!(json["elapsed_secs"], 2.0);
        assert_eq!(json["images_processed"], 4);
        assert!(json.get("profile").is_none());
    }
}
