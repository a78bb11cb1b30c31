// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The benchmark engine with a type-state–enforced session lifecycle.
//!
//! ```text
//! BenchmarkEngine<Idle>
//!     │  .initialize()     device pool + kernel build + kernel install
//!     ▼
//! BenchmarkEngine<Initialized>
//!     │  .allocate()       work items + per-device buffer pairs
//!     ▼
//! BenchmarkEngine<Ready>
//!     │  .measure(strategy) / .run_all()
//!     ▼
//!   RunReport
//! ```
//!
//! Each transition consumes the old value. Resources acquired by a failed
//! transition are released before the error is returned, and dropping the
//! engine in any state releases the store before the pool.

use crate::{verify, BenchError, BenchmarkConfig, ProfileRecord, RunReport};
use compute_platform::Program;
use device_pool::DevicePool;
use dispatch::{wait_for_pipelines, BatchPlan, DeviceLane, DispatchError, DispatchStrategy, PipelineTokens};
use std::time::Instant;
use work_store::{ResultSet, WorkItemStore};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is configured; nothing is acquired yet.
#[derive(Debug)]
pub struct Idle;

/// Devices are up and the kernel is installed on each of them.
#[derive(Debug)]
pub struct Initialized {
    pool: DevicePool,
    program: Program,
}

/// Buffers are allocated; strategies can be measured.
#[derive(Debug)]
pub struct Ready {
    // Field order is drop order: buffers go before the queues they were
    // allocated for.
    store: WorkItemStore,
    pool: DevicePool,
    program: Program,
    baseline_measured: bool,
}

/// Sealed trait for engine states.
pub trait EngineState: std::fmt::Debug {}
impl EngineState for Idle {}
impl EngineState for Initialized {}
impl EngineState for Ready {}

// ── Engine ─────────────────────────────────────────────────────

/// The benchmark engine.
///
/// # Example
/// ```no_run
/// use bench_runtime::{BenchmarkConfig, BenchmarkEngine};
///
/// # fn example() -> Result<(), bench_runtime::BenchError> {
/// let mut engine = BenchmarkEngine::new(BenchmarkConfig::default())
///     .initialize()?
///     .allocate()?;
/// for report in engine.run_all()? {
///     println!("{}", report.report_line());
/// }
/// # Ok(())
/// # }
/// ```
pub struct BenchmarkEngine<S: EngineState = Idle> {
    config: BenchmarkConfig,
    state: S,
}

impl<S: EngineState> BenchmarkEngine<S> {
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }
}

// ── Idle → Initialized ─────────────────────────────────────────

impl BenchmarkEngine<Idle> {
    pub fn new(config: BenchmarkConfig) -> Self {
        tracing::info!(
            "benchmark: {} image(s) of {}x{}, strategies {:?}",
            config.num_images,
            config.width,
            config.height,
            config.strategies
        );
        Self { config, state: Idle }
    }

    /// Brings up the device pool, builds the kernel source, and installs
    /// the entry point on every device.
    ///
    /// If the build fails the pool is shut down before the error (with the
    /// full build log) is returned.
    pub fn initialize(self) -> Result<BenchmarkEngine<Initialized>, BenchError> {
        self.config.validate()?;

        let mut pool = DevicePool::initialize(&self.config.pool_config())?;
        let program = match Self::build_program(&self.config, &pool) {
            Ok(program) => program,
            Err(e) => {
                pool.shutdown();
                return Err(e);
            }
        };
        pool.install_kernels(&program, &self.config.kernel_entry)?;
        tracing::info!(
            "kernel '{}' installed on {} device(s)",
            self.config.kernel_entry,
            pool.device_count()
        );

        Ok(BenchmarkEngine {
            config: self.config,
            state: Initialized { pool, program },
        })
    }

    fn build_program(config: &BenchmarkConfig, pool: &DevicePool) -> Result<Program, BenchError> {
        let program = pool
            .context()?
            .build_program(&config.kernel_source, &config.build_options)
            .map_err(|e| {
                tracing::error!("kernel build failed: {e}");
                e
            })?;
        tracing::info!(
            "built '{}' (options: '{}')",
            program.source_name(),
            program.options()
        );
        Ok(program)
    }
}

// ── Initialized → Ready ────────────────────────────────────────

impl BenchmarkEngine<Initialized> {
    pub fn pool(&self) -> &DevicePool {
        &self.state.pool
    }

    pub fn program(&self) -> &Program {
        &self.state.program
    }

    /// Allocates the work items and one buffer pair per device.
    pub fn allocate(self) -> Result<BenchmarkEngine<Ready>, BenchError> {
        let Initialized { pool, program } = self.state;
        let store = WorkItemStore::allocate(&pool, self.config.image_spec(), self.config.seed)?;
        Ok(BenchmarkEngine {
            config: self.config,
            state: Ready {
                store,
                pool,
                program,
                baseline_measured: false,
            },
        })
    }
}

// ── Ready: measure strategies ──────────────────────────────────

impl BenchmarkEngine<Ready> {
    pub fn pool(&self) -> &DevicePool {
        &self.state.pool
    }

    pub fn store(&self) -> &WorkItemStore {
        &self.state.store
    }

    pub fn program(&self) -> &Program {
        &self.state.program
    }

    pub fn device_count(&self) -> usize {
        self.state.pool.device_count()
    }

    /// Times one strategy from first submission until every download has
    /// signalled, then checks its results against the baseline.
    ///
    /// Multi-device results are zeroed before the timer starts. If any
    /// stage fails, every queue is drained before the error is returned.
    pub fn measure(&mut self, strategy: &dyn DispatchStrategy) -> Result<RunReport, BenchError> {
        let Ready {
            store,
            pool,
            baseline_measured,
            ..
        } = &mut self.state;

        let plan = strategy.plan(store.len(), pool.device_count())?;
        plan.validate()?;
        tracing::debug!("{}: {}", strategy.name(), plan.summary());
        if plan.target == ResultSet::Multi {
            store.clear_results(ResultSet::Multi)?;
            if !*baseline_measured {
                tracing::warn!(
                    "{}: no baseline run yet, discrepancy is measured against zeroed results",
                    strategy.name()
                );
            }
        }

        let start = Instant::now();
        let outcome = Self::submit_and_wait(strategy, &plan, pool, store, self.config.reuse_dependency);
        let elapsed = start.elapsed();

        let pipelines = match outcome {
            Ok(pipelines) => pipelines,
            Err(e) => {
                tracing::warn!("{} failed, draining every queue: {e}", strategy.name());
                if let Err(drain) = pool.finish_all() {
                    tracing::warn!("drain after failure also failed: {drain}");
                }
                return Err(e.into());
            }
        };

        let discrepancy = match plan.target {
            ResultSet::Baseline => {
                *baseline_measured = true;
                0.0
            }
            ResultSet::Multi => verify::discrepancy(store, plan.compared_range())?,
        };
        let profile = if pool.profiling_enabled() {
            ProfileRecord::collect(&pipelines)
        } else {
            Vec::new()
        };

        let num_devices = plan.num_devices;
        let report = RunReport {
            label: strategy.label(num_devices),
            strategy: strategy.name().to_string(),
            num_devices,
            images_processed: plan.covered(),
            elapsed,
            discrepancy,
            profile,
        };
        tracing::info!("{}", report.report_line());
        Ok(report)
    }

    /// Measures every configured strategy, baseline first.
    pub fn run_all(&mut self) -> Result<Vec<RunReport>, BenchError> {
        let strategies = self.config.create_strategies()?;
        strategies
            .iter()
            .map(|strategy| self.measure(strategy.as_ref()))
            .collect()
    }

    /// Copies the `set` results of every work item, e.g. to compare two
    /// runs of the same strategy.
    pub fn snapshot(&self, set: ResultSet) -> Result<Vec<Vec<f32>>, BenchError> {
        let store = &self.state.store;
        Ok(store.snapshot(set, 0..store.len())?)
    }

    fn submit_and_wait(
        strategy: &dyn DispatchStrategy,
        plan: &BatchPlan,
        pool: &mut DevicePool,
        store: &WorkItemStore,
        reuse_dependency: bool,
    ) -> Result<Vec<PipelineTokens>, DispatchError> {
        let mut lanes = DeviceLane::bind_all(pool.devices_mut(), store, reuse_dependency)?;
        let pipelines = strategy.dispatch(plan, &mut lanes, store)?;
        wait_for_pipelines(&pipelines)?;
        Ok(pipelines)
    }
}

impl<S: EngineState> std::fmt::Debug for BenchmarkEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkEngine")
            .field("state", &std::any::type_name::<S>())
            .field("num_images", &self.config.num_images)
            .field("strategies", &self.config.strategies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute_platform::PlatformConfig;
    use std::io::Write;

    fn kernel_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[kernels.blur]\nalgorithm = \"box-blur\"\nradius = 1").unwrap();
        f
    }

    fn config(kernel: &std::path::Path, devices: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            num_images: 8,
            width: 8,
            height: 8,
            kernel_source: kernel.to_path_buf(),
            kernel_entry: "blur".into(),
            platform: PlatformConfig {
                device_count: devices,
                device_memory: "4M".into(),
                ..PlatformConfig::default()
            },
            ..BenchmarkConfig::default()
        }
    }

    #[test]
    fn test_transitions() {
        let kernel = kernel_file();
        let engine = BenchmarkEngine::new(config(kernel.path(), 2)).initialize().unwrap();
        assert_eq!(engine.pool().device_count(), 2);
        assert!(engine.pool().devices().iter().all(|d| d.kernel().is_some()));

        let engine = engine.allocate().unwrap();
        assert_eq!(engine.store().len(), 8);
        assert_eq!(engine.store().device_buffers().len(), 2);
        assert!(format!("{engine:?}").contains("Ready"));
    }

    #[test]
    fn test_measure_baseline_then_multi() {
        let kernel = kernel_file();
        let mut engine = BenchmarkEngine::new(config(kernel.path(), 2))
            .initialize()
            .unwrap()
            .allocate()
            .unwrap();

        let reports = engine.run_all().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].label, "single device");
        assert_eq!(reports[0].discrepancy, 0.0);
        assert_eq!(reports[1].label, "2x device (single thread)");
        assert_eq!(reports[2].label, "2x device (multi thread)");
        for r in &reports {
            assert_eq!(r.images_processed, 8);
            assert_eq!(r.discrepancy, 0.0);
            assert!(r.profile.is_empty());
        }
    }

    #[test]
    fn test_unknown_entry_point_fails_initialize() {
        let kernel = kernel_file();
        let cfg = BenchmarkConfig {
            kernel_entry: "nlm".into(),
            ..config(kernel.path(), 1)
        };
        assert!(matches!(
            BenchmarkEngine::new(cfg).initialize(),
            Err(BenchError::Platform(_))
        ));
    }
}
