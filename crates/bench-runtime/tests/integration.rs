// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end benchmark sessions.
//!
//! These drive the engine through every state against the simulated
//! platform, covering partitioning scenarios, verification, profiling and
//! failure propagation.

use bench_runtime::{verify, BenchError, BenchmarkConfig, BenchmarkEngine, Ready};
use compute_platform::{CommandKind, FaultInjection, PlatformConfig};
use dispatch::{strategy_from_name, Stage};
use std::io::Write;
use std::path::Path;
use work_store::ResultSet;

// ── Helpers ────────────────────────────────────────────────────

const KERNELS: &str = r#"
[kernels.nlm]
algorithm = "non-local-means"
search_radius = 2
patch_radius = 1
sigma = 0.15

[kernels.copy]
algorithm = "copy"
"#;

fn kernel_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

fn config(kernel: &Path, images: usize, devices: usize) -> BenchmarkConfig {
    BenchmarkConfig {
        num_images: images,
        width: 16,
        height: 12,
        kernel_source: kernel.to_path_buf(),
        kernel_entry: "nlm".into(),
        platform: PlatformConfig {
            device_count: devices,
            device_memory: "16M".into(),
            ..PlatformConfig::default()
        },
        ..BenchmarkConfig::default()
    }
}

fn ready(config: BenchmarkConfig) -> BenchmarkEngine<Ready> {
    BenchmarkEngine::new(config)
        .initialize()
        .unwrap()
        .allocate()
        .unwrap()
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn test_sixteen_images_four_devices() {
    let kernel = kernel_file(KERNELS);
    let mut engine = ready(config(kernel.path(), 16, 4));
    let reports = engine.run_all().unwrap();

    let labels: Vec<&str> = reports.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "single device",
            "4x device (single thread)",
            "4x device (multi thread)"
        ]
    );
    for r in &reports {
        assert_eq!(r.images_processed, 16);
        assert!(r.discrepancy.abs() < 1e-6, "{}: {}", r.label, r.discrepancy);
        assert!(r.report_line().starts_with(&format!("{}: total=", r.label)));
    }
}

#[test]
fn test_thirty_images_four_devices() {
    let kernel = kernel_file(KERNELS);
    let mut engine = ready(config(kernel.path(), 30, 4));
    let reports = engine.run_all().unwrap();

    assert_eq!(reports[0].images_processed, 30);
    assert_eq!(reports[1].images_processed, 28);
    assert_eq!(reports[2].images_processed, 28);
    assert_eq!(reports[2].discrepancy, 0.0);

    // Images 28 and 29 never reach the multi-device results.
    let multi = engine.snapshot(ResultSet::Multi).unwrap();
    assert!(multi[28..].iter().flatten().all(|&v| v == 0.0));
    assert!(multi[..28].iter().all(|img| img.iter().any(|&v| v != 0.0)));
}

#[test]
fn test_zero_devices_allocates_nothing() {
    let kernel = kernel_file(KERNELS);
    let err = BenchmarkEngine::new(config(kernel.path(), 4, 0))
        .initialize()
        .unwrap_err();
    assert!(matches!(err, BenchError::NoDeviceFound { .. }));
}

#[test]
fn test_vendor_mismatch() {
    let kernel = kernel_file(KERNELS);
    let cfg = BenchmarkConfig {
        vendor_filter: "NVIDIA".into(),
        ..config(kernel.path(), 4, 2)
    };
    assert!(matches!(
        BenchmarkEngine::new(cfg).initialize(),
        Err(BenchError::NoDeviceFound { vendor_filter }) if vendor_filter == "NVIDIA"
    ));
}

#[test]
fn test_max_devices_limits_the_pool() {
    let kernel = kernel_file(KERNELS);
    let cfg = BenchmarkConfig {
        max_devices: Some(3),
        ..config(kernel.path(), 12, 8)
    };
    let mut engine = ready(cfg);
    assert_eq!(engine.device_count(), 3);
    let reports = engine.run_all().unwrap();
    assert_eq!(reports[1].label, "3x device (single thread)");
}

// ── Verification ───────────────────────────────────────────────

#[test]
fn test_repeated_multi_runs_are_identical() {
    let kernel = kernel_file(KERNELS);
    let mut engine = ready(config(kernel.path(), 12, 3));
    let threaded = strategy_from_name("multi-threaded").unwrap();

    engine.measure(threaded.as_ref()).unwrap();
    let first = engine.snapshot(ResultSet::Multi).unwrap();
    engine.measure(threaded.as_ref()).unwrap();
    let second = engine.snapshot(ResultSet::Multi).unwrap();

    assert_eq!(verify::snapshot_discrepancy(&first, &second), 0.0);
}

#[test]
fn test_multi_results_match_baseline_for_any_device_count() {
    let kernel = kernel_file(KERNELS);
    for devices in 1..=5 {
        let mut engine = ready(config(kernel.path(), 10, devices));
        let reports = engine.run_all().unwrap();
        let covered = reports[1].images_processed;
        assert_eq!(covered, devices * (10 / devices));
        assert_eq!(verify::discrepancy(engine.store(), 0..covered).unwrap(), 0.0);
    }
}

#[test]
fn test_seed_controls_input() {
    let kernel = kernel_file(KERNELS);
    let a = ready(config(kernel.path(), 2, 1));
    let b = ready(config(kernel.path(), 2, 1));
    let c = ready(BenchmarkConfig {
        seed: 99,
        ..config(kernel.path(), 2, 1)
    });
    let input = |e: &BenchmarkEngine<Ready>| e.store().items()[0].input().to_vec();
    assert_eq!(input(&a), input(&b));
    assert_ne!(input(&a), input(&c));
}

// ── Profiling ──────────────────────────────────────────────────

#[test]
fn test_profile_records_follow_pipeline_order() {
    let kernel = kernel_file(KERNELS);
    let cfg = BenchmarkConfig {
        enable_profiling: true,
        ..config(kernel.path(), 8, 2)
    };
    let mut engine = ready(cfg);
    let reports = engine.run_all().unwrap();

    for report in &reports {
        assert_eq!(report.profile.len(), report.images_processed * 3);
        for stage in report.profile.chunks(3) {
            let names: Vec<&str> = stage.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["upload", "nlm", "download"]);
            assert!(stage.iter().all(|p| p.image == stage[0].image));
            assert!(stage.iter().all(|p| p.queued <= p.submitted && p.submitted <= p.start && p.start <= p.end));
            assert!(stage[0].end <= stage[1].start);
            assert!(stage[1].end <= stage[2].start);
            assert_eq!(stage[0].line().split(' ').count(), 6);
        }
    }
    assert!(reports[0].profile.iter().all(|p| p.device_index == 0));
    assert!(reports[2].profile.iter().any(|p| p.device_index == 1));
}

// ── Failures ───────────────────────────────────────────────────

#[test]
fn test_build_failure_carries_log() {
    let kernel = kernel_file(KERNELS);
    let cfg = BenchmarkConfig {
        build_options: "-DSIGMA=-1 -DUNKNOWN=3".into(),
        ..config(kernel.path(), 4, 2)
    };
    match BenchmarkEngine::new(cfg).initialize() {
        Err(BenchError::BuildFailure { log, .. }) => {
            assert!(log.contains("unknown build option 'UNKNOWN'"));
            assert!(log.contains("sigma must be positive"));
        }
        other => panic!("expected build failure, got {other:?}"),
    }
}

#[test]
fn test_missing_kernel_source() {
    let cfg = config(Path::new("/nonexistent/kernels.toml"), 4, 2);
    assert!(matches!(
        BenchmarkEngine::new(cfg).initialize(),
        Err(BenchError::SourceUnavailable { .. })
    ));
}

#[test]
fn test_allocation_failure_is_not_retried() {
    let kernel = kernel_file(KERNELS);
    let cfg = BenchmarkConfig {
        width: 512,
        height: 512,
        platform: PlatformConfig {
            device_count: 2,
            device_memory: "1M".into(),
            ..PlatformConfig::default()
        },
        ..config(kernel.path(), 2, 2)
    };
    let err = BenchmarkEngine::new(cfg)
        .initialize()
        .unwrap()
        .allocate()
        .unwrap_err();
    assert!(matches!(err, BenchError::AllocationFailure { device_index: 0, .. }));
}

#[test]
fn test_device_fault_fails_the_run_and_drains() {
    let kernel = kernel_file(KERNELS);
    let mut cfg = config(kernel.path(), 8, 2);
    cfg.platform.faults = vec![FaultInjection {
        device_index: 1,
        kind: CommandKind::ReadBuffer,
        after: 0,
    }];
    let mut engine = ready(cfg);

    let single = strategy_from_name("single").unwrap();
    engine.measure(single.as_ref()).unwrap();

    let serial = strategy_from_name("multi-serial").unwrap();
    match engine.measure(serial.as_ref()) {
        Err(BenchError::DeviceOperationFailed {
            stage, device_index, ..
        }) => {
            assert_eq!(stage, Stage::Download);
            assert_eq!(device_index, 1);
        }
        other => panic!("expected device failure, got {other:?}"),
    }

    // The fault fires once; the engine is still usable afterwards.
    let report = engine.measure(serial.as_ref()).unwrap();
    assert_eq!(report.discrepancy, 0.0);
    assert!(engine.pool().finish_all().is_ok());
}
