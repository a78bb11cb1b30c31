// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Program build: kernel descriptor + build options → kernel entry points.
//!
//! # Source Format
//! ```toml
//! [kernels.nlm]
//! algorithm = "non-local-means"
//! search_radius = 3
//! patch_radius = 1
//! sigma = 0.1
//!
//! [kernels.blur]
//! algorithm = "box-blur"
//! radius = 2
//! ```
//!
//! # Build Options
//! `-DNAME=VALUE` tokens (or `-D NAME=VALUE`) override a parameter in every
//! kernel that has it: `SEARCH_RADIUS`, `PATCH_RADIUS`, `SIGMA`, `RADIUS`.
//!
//! A failed build collects every diagnostic into the build log and returns
//! it verbatim in [`PlatformError::BuildFailure`].

use crate::{Kernel, KernelAlgorithm, PlatformError, StatusCode};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Largest accepted search/patch/blur radius.
pub const MAX_RADIUS: u32 = 32;

#[derive(serde::Deserialize)]
struct SourceFile {
    #[serde(default)]
    kernels: BTreeMap<String, KernelAlgorithm>,
}

/// A successfully built program.
#[derive(Debug, Clone)]
pub struct Program {
    source_name: String,
    options: String,
    kernels: BTreeMap<String, KernelAlgorithm>,
}

impl Program {
    /// Reads and builds the kernel descriptor at `path`.
    pub fn build_from_file(path: &Path, options: &str) -> Result<Self, PlatformError> {
        let source = std::fs::read_to_string(path).map_err(|e| PlatformError::SourceUnavailable {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::build(&path.display().to_string(), &source, options)
    }

    /// Builds a program from descriptor text. `source_name` is used in the
    /// build log.
    pub fn build(source_name: &str, source: &str, options: &str) -> Result<Self, PlatformError> {
        let mut log = String::new();

        let mut kernels = match toml::from_str::<SourceFile>(source) {
            Ok(file) => file.kernels,
            Err(e) => {
                let _ = writeln!(log, "{source_name}: error: {e}");
                return Err(build_failure(source_name, log));
            }
        };
        if kernels.is_empty() {
            let _ = writeln!(log, "{source_name}: error: no kernel entry points defined");
        }

        let overrides = parse_options(options, &mut log);
        for algorithm in kernels.values_mut() {
            for (name, value) in &overrides {
                apply_override(algorithm, name, *value);
            }
        }

        for (name, algorithm) in &kernels {
            validate(source_name, name, algorithm, &mut log);
        }

        if !log.is_empty() {
            return Err(build_failure(source_name, log));
        }

        tracing::debug!(
            "built '{source_name}' with options '{options}': {} entry point(s)",
            kernels.len()
        );
        Ok(Self {
            source_name: source_name.to_string(),
            options: options.to_string(),
            kernels,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Build options the program was built with.
    pub fn options(&self) -> &str {
        &self.options
    }

    /// Entry-point names, sorted.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.kernels.keys().map(String::as_str)
    }

    /// Creates a kernel instance for `entry_point`.
    pub fn create_kernel(&self, entry_point: &str) -> Result<Kernel, PlatformError> {
        let algorithm = self.kernels.get(entry_point).ok_or_else(|| {
            PlatformError::rejected("create_kernel", StatusCode::InvalidKernelName)
        })?;
        Ok(Kernel::new(entry_point, algorithm.clone()))
    }
}

fn build_failure(source_name: &str, log: String) -> PlatformError {
    PlatformError::BuildFailure {
        source_path: source_name.to_string(),
        log,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OptionValue {
    Int(u32),
    Float(f32),
}

fn parse_options(options: &str, log: &mut String) -> Vec<(String, OptionValue)> {
    let mut out = Vec::new();
    let mut tokens = options.split_whitespace();

    while let Some(token) = tokens.next() {
        let define = match token.strip_prefix("-D") {
            Some("") => match tokens.next() {
                Some(next) => next,
                None => {
                    let _ = writeln!(log, "error: '-D' requires an argument");
                    break;
                }
            },
            Some(rest) => rest,
            None => {
                let _ = writeln!(log, "error: unrecognized build option '{token}'");
                continue;
            }
        };

        let Some((name, raw)) = define.split_once('=') else {
            let _ = writeln!(log, "error: build option '-D{define}' has no value");
            continue;
        };

        let value = match name {
            "SEARCH_RADIUS" | "PATCH_RADIUS" | "RADIUS" => raw.parse().map(OptionValue::Int).ok(),
            "SIGMA" => raw.parse().map(OptionValue::Float).ok(),
            _ => {
                let _ = writeln!(log, "error: unknown build option '{name}'");
                continue;
            }
        };
        match value {
            Some(v) => out.push((name.to_string(), v)),
            None => {
                let _ = writeln!(log, "error: invalid value '{raw}' for '{name}'");
            }
        }
    }
    out
}

fn apply_override(algorithm: &mut KernelAlgorithm, name: &str, value: OptionValue) {
    match (algorithm, name, value) {
        (KernelAlgorithm::NonLocalMeans { search_radius, .. }, "SEARCH_RADIUS", OptionValue::Int(v)) => {
            *search_radius = v
        }
        (KernelAlgorithm::NonLocalMeans { patch_radius, .. }, "PATCH_RADIUS", OptionValue::Int(v)) => {
            *patch_radius = v
        }
        (KernelAlgorithm::NonLocalMeans { sigma, .. }, "SIGMA", OptionValue::Float(v)) => *sigma = v,
        (KernelAlgorithm::BoxBlur { radius }, "RADIUS", OptionValue::Int(v)) => *radius = v,
        _ => {}
    }
}

fn check_radius(source_name: &str, entry: &str, what: &str, r: u32, log: &mut String) {
    if r > MAX_RADIUS {
        let _ = writeln!(
            log,
            "{source_name}: error: kernel '{entry}': {what} {r} exceeds maximum {MAX_RADIUS}"
        );
    }
}

fn validate(source_name: &str, entry: &str, algorithm: &KernelAlgorithm, log: &mut String) {
    match *algorithm {
        KernelAlgorithm::NonLocalMeans {
            search_radius,
            patch_radius,
            sigma,
        } => {
            check_radius(source_name, entry, "search_radius", search_radius, log);
            check_radius(source_name, entry, "patch_radius", patch_radius, log);
            if !(sigma.is_finite() && sigma > 0.0) {
                let _ = writeln!(
                    log,
                    "{source_name}: error: kernel '{entry}': sigma must be positive, got {sigma}"
                );
            }
        }
        KernelAlgorithm::BoxBlur { radius } => check_radius(source_name, entry, "radius", radius, log),
        KernelAlgorithm::Copy => {}
    }
}
