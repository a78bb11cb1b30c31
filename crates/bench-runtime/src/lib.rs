// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # bench-runtime
//!
//! Orchestrates a multi-device benchmark session: brings up the device
//! pool, builds and installs the kernel, allocates the work items, then
//! times each dispatch strategy end to end and verifies its results
//! against the single-device baseline.
//!
//! # Type-State Pipeline
//! ```text
//! BenchmarkEngine<Idle> → BenchmarkEngine<Initialized> → BenchmarkEngine<Ready>
//! ```
//! Transitions are compile-time checked.

mod config;
mod engine;
mod error;
mod metrics;
pub mod verify;

pub use config::{BenchmarkConfig, DEFAULT_SEED};
pub use engine::{BenchmarkEngine, EngineState, Idle, Initialized, Ready};
pub use error::BenchError;
pub use metrics::{ProfileRecord, RunReport};
