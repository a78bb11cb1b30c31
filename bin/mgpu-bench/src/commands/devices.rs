// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `--list-devices`: print the discovered platform and its devices.

use compute_platform::Platform;

use crate::{Cli, Format};

pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = super::resolve_config(cli)?;
    let platform = Platform::discover(&config.platform, &config.vendor_filter)?;
    let info = platform.info();

    match cli.format {
        Format::Json => {
            let value = serde_json::json!({
                "platform": info,
                "devices": platform.devices(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Format::Text => {
            println!("{} {} (version {})", info.vendor, info.name, info.version);
            for device in platform.devices() {
                println!("  [{}] {} ({} memory)", device.index, device.name, device.memory);
            }
        }
    }
    Ok(())
}
