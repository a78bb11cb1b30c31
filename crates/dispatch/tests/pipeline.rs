// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline ordering and strategy behaviour against the simulated platform.

use compute_platform::{CommandKind, FaultInjection, PlatformConfig, Program, StatusCode};
use device_pool::{DevicePool, PoolConfig};
use dispatch::{
    all_strategies, run_one, strategy_from_name, wait_for_pipelines, DeviceLane, DispatchError,
    PipelineTokens, Stage,
};
use work_store::{ImageSpec, ResultSet, WorkItemStore};

// ── Helpers ────────────────────────────────────────────────────

const KERNELS: &str = r#"
[kernels.nlm]
algorithm = "non-local-means"
search_radius = 1
patch_radius = 1
sigma = 0.2

[kernels.copy]
algorithm = "copy"
"#;

fn pool_with(devices: usize, profiling: bool, faults: Vec<FaultInjection>) -> DevicePool {
    let mut pool = DevicePool::initialize(&PoolConfig {
        platform: PlatformConfig {
            device_count: devices,
            device_memory: "8M".into(),
            faults,
            ..PlatformConfig::default()
        },
        profiling,
        ..PoolConfig::default()
    })
    .unwrap();
    let program = Program::build("test-kernels", KERNELS, "").unwrap();
    pool.install_kernels(&program, "nlm").unwrap();
    pool
}

fn run(
    strategy_name: &str,
    pool: &mut DevicePool,
    store: &WorkItemStore,
    reuse_dependency: bool,
) -> Result<Vec<PipelineTokens>, DispatchError> {
    let strategy = strategy_from_name(strategy_name)?;
    let plan = strategy.plan(store.len(), pool.device_count())?;
    let mut lanes = DeviceLane::bind_all(pool.devices_mut(), store, reuse_dependency)?;
    let pipelines = strategy.dispatch(&plan, &mut lanes, store)?;
    wait_for_pipelines(&pipelines)?;
    Ok(pipelines)
}

fn sum_abs_diff(store: &WorkItemStore, range: std::ops::Range<usize>) -> f64 {
    store.items()[range]
        .iter()
        .map(|item| {
            let a = item.result(ResultSet::Baseline).to_vec();
            let b = item.result(ResultSet::Multi).to_vec();
            a.iter()
                .zip(&b)
                .map(|(x, y)| f64::from((x - y).abs()))
                .sum::<f64>()
        })
        .sum()
}

// ── Ordering ───────────────────────────────────────────────────

#[test]
fn stages_declare_their_predecessor() {
    let mut pool = pool_with(2, true, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(8, 8, 8), 1).unwrap();

    for name in ["single", "multi-serial", "multi-threaded"] {
        let pipelines = run(name, &mut pool, &store, true).unwrap();
        for p in &pipelines {
            assert!(p.compute.depends_on(&p.upload));
            assert!(p.download.depends_on(&p.compute));
            assert_eq!(p.upload.device_index(), p.device_index);

            let up = p.upload.profiling_info().unwrap();
            let compute = p.compute.profiling_info().unwrap();
            let down = p.download.profiling_info().unwrap();
            assert!(up.end <= compute.start, "{name}: compute started before upload ended");
            assert!(compute.end <= down.start, "{name}: download started before compute ended");
        }
    }
}

#[test]
fn reuse_dependency_chains_consecutive_images() {
    let mut pool = pool_with(2, false, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(6, 4, 4), 2).unwrap();

    let pipelines = run("multi-serial", &mut pool, &store, true).unwrap();
    for pair in pipelines.windows(2) {
        if pair[0].device_index == pair[1].device_index {
            assert!(pair[1].upload.depends_on(&pair[0].download));
        }
    }
    assert!(pipelines[0].upload.dependencies().is_empty());
    assert!(pipelines[3].upload.dependencies().is_empty());

    let pipelines = run("multi-serial", &mut pool, &store, false).unwrap();
    assert!(pipelines.iter().all(|p| p.upload.dependencies().is_empty()));
}

// ── Strategies ─────────────────────────────────────────────────

#[test]
fn sixteen_images_four_devices() {
    let mut pool = pool_with(4, false, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(16, 8, 8), 3).unwrap();

    let baseline = run("single", &mut pool, &store, true).unwrap();
    assert_eq!(baseline.len(), 16);
    assert!(baseline.iter().all(|p| p.device_index == 0));

    for name in ["multi-serial", "multi-threaded"] {
        store.clear_results(ResultSet::Multi).unwrap();
        let mut pipelines = run(name, &mut pool, &store, true).unwrap();
        pipelines.sort_by_key(|p| p.image);
        assert_eq!(pipelines.len(), 16);
        let on_two: Vec<usize> = pipelines
            .iter()
            .filter(|p| p.device_index == 2)
            .map(|p| p.image)
            .collect();
        assert_eq!(on_two, (8..12).collect::<Vec<_>>());
        assert_eq!(sum_abs_diff(&store, 0..16), 0.0);
    }
}

#[test]
fn thirty_images_four_devices_drops_remainder() {
    let mut pool = pool_with(4, false, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(30, 4, 4), 4).unwrap();

    assert_eq!(run("single", &mut pool, &store, true).unwrap().len(), 30);
    let multi = run("multi-threaded", &mut pool, &store, true).unwrap();
    assert_eq!(multi.len(), 28);
    assert!(multi.iter().all(|p| p.image < 28));
    assert_eq!(sum_abs_diff(&store, 0..28), 0.0);
    assert!(store.items()[28..]
        .iter()
        .all(|item| item.result(ResultSet::Multi).read().iter().all(|&v| v == 0.0)));
}

#[test]
fn results_go_to_the_strategy_target() {
    let mut pool = pool_with(2, false, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(4, 4, 4), 5).unwrap();

    run("multi-serial", &mut pool, &store, true).unwrap();
    for item in store.items() {
        assert!(item.result(ResultSet::Baseline).read().iter().all(|&v| v == 0.0));
        assert!(item.result(ResultSet::Multi).read().iter().any(|&v| v != 0.0));
    }
}

#[test]
fn every_strategy_runs_on_one_device() {
    let mut pool = pool_with(1, false, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(5, 4, 4), 6).unwrap();
    for strategy in all_strategies() {
        let pipelines = run(strategy.name(), &mut pool, &store, true).unwrap();
        assert_eq!(pipelines.len(), 5);
    }
    assert_eq!(sum_abs_diff(&store, 0..5), 0.0);
}

// ── Failures ───────────────────────────────────────────────────

#[test]
fn injected_kernel_fault_reports_compute_stage() {
    let fault = FaultInjection {
        device_index: 1,
        kind: CommandKind::Kernel,
        after: 1,
    };
    let mut pool = pool_with(2, false, vec![fault]);
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(8, 4, 4), 7).unwrap();

    let err = run("multi-threaded", &mut pool, &store, false).unwrap_err();
    match err {
        DispatchError::DeviceOperationFailed {
            stage,
            device_index,
            source,
        } => {
            assert_eq!(stage, Stage::Compute);
            assert_eq!(device_index, 1);
            assert_eq!(source.status(), StatusCode::OutOfResources);
        }
        other => panic!("unexpected error: {other}"),
    }
    pool.finish_all().unwrap();
}

#[test]
fn injected_upload_fault_stops_dispatch() {
    let fault = FaultInjection {
        device_index: 0,
        kind: CommandKind::WriteBuffer,
        after: 2,
    };
    let mut pool = pool_with(1, false, vec![fault]);
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(6, 4, 4), 8).unwrap();

    let err = run("single", &mut pool, &store, true).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::DeviceOperationFailed {
            stage: Stage::Upload,
            device_index: 0,
            ..
        }
    ));
}

#[test]
fn missing_kernel_is_rejected() {
    let mut pool = DevicePool::initialize(&PoolConfig::default()).unwrap();
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(2, 2, 2), 0).unwrap();
    let err = DeviceLane::bind_all(pool.devices_mut(), &store, true).unwrap_err();
    assert!(matches!(err, DispatchError::KernelNotInstalled { device_index: 0 }));
}

#[test]
fn run_one_writes_the_given_output() {
    let mut pool = pool_with(1, false, Vec::new());
    let store = WorkItemStore::allocate(&pool, ImageSpec::new(2, 4, 4), 9).unwrap();
    let mut lanes = DeviceLane::bind_all(pool.devices_mut(), &store, true).unwrap();

    let item = &store.items()[1];
    let tokens = run_one(&mut lanes[0], item, item.result(ResultSet::Baseline)).unwrap();
    tokens.download.wait().unwrap();
    assert_eq!(tokens.image, 1);
    assert_eq!(lanes[0].last_download().map(|t| t.id()), Some(tokens.download.id()));
    assert!(item.result(ResultSet::Baseline).read().iter().any(|&v| v != 0.0));
    assert!(item.result(ResultSet::Multi).read().iter().all(|&v| v == 0.0));
}

// ── Release ────────────────────────────────────────────────────

#[test]
fn release_after_run_returns_device_memory() {
    let mut pool = DevicePool::initialize(&PoolConfig {
        platform: PlatformConfig {
            device_count: 1,
            device_memory: "2K".into(),
            ..PlatformConfig::default()
        },
        ..PoolConfig::default()
    })
    .unwrap();
    let program = Program::build("test-kernels", KERNELS, "").unwrap();
    pool.install_kernels(&program, "copy").unwrap();

    // 16x16 f32 input + output fill the device exactly.
    let mut store = WorkItemStore::allocate(&pool, ImageSpec::new(1, 16, 16), 3).unwrap();
    {
        let mut lanes = DeviceLane::bind_all(pool.devices_mut(), &store, true).unwrap();
        let item = &store.items()[0];
        let tokens = run_one(&mut lanes[0], item, item.result(ResultSet::Baseline)).unwrap();
        wait_for_pipelines(std::slice::from_ref(&tokens)).unwrap();
    }
    assert!(pool.devices()[0].kernel().is_some());

    store.release();
    let memory = pool.context().unwrap().device_memory(0).unwrap();
    assert_eq!(memory.reserved_bytes(), 0);

    let again = WorkItemStore::allocate(&pool, ImageSpec::new(1, 16, 16), 3).unwrap();
    assert_eq!(again.len(), 1);
}

#[test]
fn failed_run_still_unbinds_kernels() {
    let faults = vec![FaultInjection {
        device_index: 0,
        kind: CommandKind::Kernel,
        after: 0,
    }];
    let mut pool = pool_with(1, false, faults);
    let mut store = WorkItemStore::allocate(&pool, ImageSpec::new(2, 8, 8), 0).unwrap();
    assert!(run("single", &mut pool, &store, true).is_err());
    pool.finish_all().ok();

    store.release();
    let memory = pool.context().unwrap().device_memory(0).unwrap();
    assert_eq!(memory.reserved_bytes(), 0);
}
