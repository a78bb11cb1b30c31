// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Image kernels and per-device kernel objects.
//!
//! A [`KernelAlgorithm`] is the numerical routine named by an entry point
//! in a built [`Program`](crate::Program). A [`Kernel`] is one device's
//! instance of it, with two bound buffer arguments:
//!
//! | index | argument |
//! |---|---|
//! | 0 | input image |
//! | 1 | output image |
//!
//! Binding takes `&mut self`. A kernel's bind-then-enqueue sequence cannot
//! interleave with another caller's, because only one `&mut` exists.
//!
//! All algorithms are deterministic: identical input produces bit-identical
//! output regardless of which device runs them.

use crate::{DeviceBuffer, PlatformError, StatusCode};

/// Number of buffer arguments every image kernel takes.
pub const KERNEL_ARG_COUNT: usize = 2;

/// The numerical routine behind a kernel entry point.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KernelAlgorithm {
    /// Non-local means denoising.
    NonLocalMeans {
        search_radius: u32,
        patch_radius: u32,
        sigma: f32,
    },
    /// Mean over a square window.
    BoxBlur { radius: u32 },
    /// Output equals input.
    Copy,
}

impl KernelAlgorithm {
    /// Runs the algorithm on a row-major `width × height` image.
    pub fn apply(&self, input: &[f32], output: &mut [f32], width: usize, height: usize) {
        debug_assert_eq!(input.len(), width * height);
        debug_assert_eq!(output.len(), width * height);
        match *self {
            KernelAlgorithm::NonLocalMeans {
                search_radius,
                patch_radius,
                sigma,
            } => non_local_means(
                input,
                output,
                width,
                height,
                search_radius as isize,
                patch_radius as isize,
                sigma,
            ),
            KernelAlgorithm::BoxBlur { radius } => {
                box_blur(input, output, width, height, radius as isize)
            }
            KernelAlgorithm::Copy => output.copy_from_slice(input),
        }
    }

    /// Short algorithm name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            KernelAlgorithm::NonLocalMeans { .. } => "non-local-means",
            KernelAlgorithm::BoxBlur { .. } => "box-blur",
            KernelAlgorithm::Copy => "copy",
        }
    }
}

#[inline]
fn clamped(v: isize, max: usize) -> usize {
    v.clamp(0, max as isize - 1) as usize
}

fn non_local_means(
    input: &[f32],
    output: &mut [f32],
    width: usize,
    height: usize,
    search: isize,
    patch: isize,
    sigma: f32,
) {
    let h2 = sigma * sigma;
    let patch_area = ((2 * patch + 1) * (2 * patch + 1)) as f32;
    let px = |x: isize, y: isize| input[clamped(y, height) * width + clamped(x, width)];

    for y in 0..height as isize {
        for x in 0..width as isize {
            let mut weight_sum = 0.0f32;
            let mut acc = 0.0f32;
            for dy in -search..=search {
                for dx in -search..=search {
                    let (qx, qy) = (x + dx, y + dy);
                    let mut dist = 0.0f32;
                    for py in -patch..=patch {
                        for pxo in -patch..=patch {
                            let d = px(x + pxo, y + py) - px(qx + pxo, qy + py);
                            dist += d * d;
                        }
                    }
                    let w = (-(dist / patch_area) / h2).exp();
                    weight_sum += w;
                    acc += w * px(qx, qy);
                }
            }
            output[y as usize * width + x as usize] = acc / weight_sum;
        }
    }
}

fn box_blur(input: &[f32], output: &mut [f32], width: usize, height: usize, radius: isize) {
    let count = ((2 * radius + 1) * (2 * radius + 1)) as f32;
    for y in 0..height as isize {
        for x in 0..width as isize {
            let mut sum = 0.0f32;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    sum += input[clamped(y + dy, height) * width + clamped(x + dx, width)];
                }
            }
            output[y as usize * width + x as usize] = sum / count;
        }
    }
}

/// One device's instance of a kernel entry point.
#[derive(Debug, Clone)]
pub struct Kernel {
    name: String,
    algorithm: KernelAlgorithm,
    args: [Option<DeviceBuffer>; KERNEL_ARG_COUNT],
}

impl Kernel {
    pub(crate) fn new(name: impl Into<String>, algorithm: KernelAlgorithm) -> Self {
        Self {
            name: name.into(),
            algorithm,
            args: [None, None],
        }
    }

    /// Entry-point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithm(&self) -> &KernelAlgorithm {
        &self.algorithm
    }

    /// Binds `buffer` as argument `index` (0 = input, 1 = output).
    pub fn set_arg(&mut self, index: usize, buffer: &DeviceBuffer) -> Result<(), PlatformError> {
        let slot = self
            .args
            .get_mut(index)
            .ok_or_else(|| PlatformError::rejected("set_arg", StatusCode::InvalidArgIndex))?;
        *slot = Some(buffer.clone());
        Ok(())
    }

    /// Unbinds both arguments, dropping this kernel's handles on them.
    pub fn clear_args(&mut self) {
        self.args = [None, None];
    }

    /// Currently bound arguments, if both are set.
    pub(crate) fn bound_args(&self) -> Option<(&DeviceBuffer, &DeviceBuffer)> {
        match &self.args {
            [Some(input), Some(output)] => Some((input, output)),
            _ => None,
        }
    }
}
