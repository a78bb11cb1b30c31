// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod bench;
pub mod devices;

use bench_runtime::{BenchError, BenchmarkConfig};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

use crate::Cli;

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// report lines. `RUST_LOG` takes precedence over `-v`.
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Parses the command line. `Ok(None)` means help or version was printed
/// and there is nothing to run.
pub fn parse_cli<I, T>(args: I) -> Result<Option<Cli>, BenchError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Ok(None)
        }
        Err(e) => {
            let rendered = e.render().to_string();
            let message = rendered.trim().trim_start_matches("error: ");
            Err(BenchError::OptionParseFailure(message.to_string()))
        }
    }
}

/// Loads the config file (if any) and applies flag overrides on top.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<BenchmarkConfig> {
    let mut config = match &cli.config {
        Some(path) => BenchmarkConfig::from_file(path)?,
        None => BenchmarkConfig::default(),
    };

    if let Some(n) = cli.num_images {
        config.num_images = n;
    }
    if let Some(w) = cli.width {
        config.width = w;
    }
    if let Some(h) = cli.height {
        config.height = h;
    }
    if cli.profile {
        config.enable_profiling = true;
    }
    if let Some(devices) = cli.devices {
        config.platform.device_count = devices;
    }
    if let Some(vendor) = &cli.vendor {
        config.vendor_filter = vendor.clone();
    }
    if let Some(strategies) = &cli.strategies {
        config.strategies = strategies.clone();
    }
    if let Some(kernel) = &cli.kernel {
        config.kernel_source = kernel.clone();
    }
    if let Some(entry) = &cli.entry {
        config.kernel_entry = entry.clone();
    }
    if let Some(options) = &cli.build_options {
        config.build_options = options.clone();
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    Ok(config)
}
