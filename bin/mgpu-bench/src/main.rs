// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # mgpu-bench
//!
//! Command-line driver for the multi-device scaling benchmark.
//!
//! ## Usage
//! ```bash
//! # Default run: 30 images of 1024x1024, every strategy
//! mgpu-bench
//!
//! # Smaller workload with per-command profiling
//! mgpu-bench -n 16 -W 256 -H 256 --profile
//!
//! # Four simulated devices, JSON report
//! mgpu-bench --devices 4 --strategies single,multi-threaded --format json
//!
//! # Show what the platform exposes
//! mgpu-bench --list-devices
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "mgpu-bench",
    about = "Measure how an image kernel scales across compute devices",
    version,
    author
)]
pub struct Cli {
    /// Path to a TOML configuration file (flags override its values).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of images to process.
    #[arg(short = 'n', long = "images")]
    num_images: Option<usize>,

    /// Image width in pixels.
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Image height in pixels.
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Record per-command device timestamps and print them after the reports.
    #[arg(short, long)]
    profile: bool,

    /// Number of simulated devices the platform exposes.
    #[arg(long)]
    devices: Option<usize>,

    /// Only use platforms whose vendor contains this string.
    #[arg(long)]
    vendor: Option<String>,

    /// Strategies to run (comma-separated): single, multi-serial, multi-threaded.
    #[arg(long, value_delimiter = ',')]
    strategies: Option<Vec<String>>,

    /// Kernel source file.
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Kernel entry point to install on every device.
    #[arg(long)]
    entry: Option<String>,

    /// Build options passed to the kernel compiler (e.g. "-DSIGMA=0.2").
    #[arg(long, allow_hyphen_values = true)]
    build_options: Option<String>,

    /// Seed for the synthetic input images.
    #[arg(long)]
    seed: Option<u64>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print the discovered platform and devices, then exit.
    #[arg(long)]
    list_devices: bool,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = match commands::parse_cli(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    commands::init_tracing(cli.verbose);

    let result = if cli.list_devices {
        commands::devices::execute(&cli)
    } else {
        commands::bench::execute(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{e:?}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
