// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Default command: run every configured strategy and print one report line
//! per run, followed by profile lines when profiling is enabled.
//!
//! If a strategy fails, the runs that finished before it are still
//! reported; the failed run produces no line and the command fails.

use bench_runtime::{BenchError, BenchmarkEngine, Ready, RunReport};

use crate::{Cli, Format};

pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = super::resolve_config(cli)?;
    let profiling = config.enable_profiling;

    let mut engine = BenchmarkEngine::new(config).initialize()?.allocate()?;
    let (reports, failure) = measure_each(&mut engine, |report| {
        if cli.format == Format::Text {
            println!("{}", report.report_line());
        }
    })?;

    match cli.format {
        Format::Text if profiling => print_profiles(&reports),
        Format::Text => {}
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    if let Some(baseline) = reports.first() {
        for report in reports.iter().skip(1) {
            tracing::info!(
                "{}: {:.2}x over {}",
                report.label,
                report.speedup_over(baseline),
                baseline.label
            );
        }
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Measures the configured strategies in order, calling `on_report` as each
/// one finishes. Stops at the first failure and returns it alongside the
/// reports gathered so far.
fn measure_each(
    engine: &mut BenchmarkEngine<Ready>,
    mut on_report: impl FnMut(&RunReport),
) -> Result<(Vec<RunReport>, Option<BenchError>), BenchError> {
    let strategies = engine.config().create_strategies()?;
    let mut reports = Vec::with_capacity(strategies.len());
    for strategy in &strategies {
        match engine.measure(strategy.as_ref()) {
            Ok(report) => {
                on_report(&report);
                reports.push(report);
            }
            Err(e) => {
                tracing::error!("{} failed, run discarded: {e}", strategy.name());
                return Ok((reports, Some(e)));
            }
        }
    }
    Ok((reports, None))
}

fn print_profiles(reports: &[RunReport]) {
    for record in reports.iter().flat_map(|r| &r.profile) {
        println!("{}", record.line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_runtime::BenchmarkConfig;
    use compute_platform::{CommandKind, FaultInjection, PlatformConfig};
    use std::io::Write;

    fn engine(faults: Vec<FaultInjection>) -> (tempfile::NamedTempFile, BenchmarkEngine<Ready>) {
        let mut kernel = tempfile::NamedTempFile::new().unwrap();
        writeln!(kernel, "[kernels.copy]\nalgorithm = \"copy\"").unwrap();
        let config = BenchmarkConfig {
            num_images: 8,
            width: 8,
            height: 8,
            kernel_source: kernel.path().to_path_buf(),
            kernel_entry: "copy".into(),
            platform: PlatformConfig {
                device_count: 2,
                device_memory: "1M".into(),
                faults,
                ..PlatformConfig::default()
            },
            ..BenchmarkConfig::default()
        };
        let engine = BenchmarkEngine::new(config).initialize().unwrap().allocate().unwrap();
        (kernel, engine)
    }

    #[test]
    fn test_measure_each_reports_every_strategy() {
        let (_kernel, mut engine) = engine(Vec::new());
        let mut lines = Vec::new();
        let (reports, failure) =
            measure_each(&mut engine, |r| lines.push(r.report_line())).unwrap();
        assert!(failure.is_none());
        assert_eq!(reports.len(), 3);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("single device:"));
    }

    #[test]
    fn test_finished_runs_survive_a_later_failure() {
        // Device 1 only runs kernels in multi-device strategies.
        let faults = vec![FaultInjection {
            device_index: 1,
            kind: CommandKind::Kernel,
            after: 0,
        }];
        let (_kernel, mut engine) = engine(faults);
        let mut lines = Vec::new();
        let (reports, failure) =
            measure_each(&mut engine, |r| lines.push(r.report_line())).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].strategy, "single");
        assert_eq!(lines.len(), 1);
        assert!(matches!(
            failure,
            Some(BenchError::DeviceOperationFailed { device_index: 1, .. })
        ));
    }
}
