// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Get or set configuration values

use crate::config::{default_config_file, set_value, AppConfig};
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command
pub fn run(config: &AppConfig, file: Option<PathBuf>, key: &str, value: Option<String>) -> Result<()> {
    match value {
        Some(v) => {
            let file = file
                .or_else(default_config_file)
                .ok_or_else(|| anyhow::anyhow!("No config file location; pass --config"))?;
            set_value(&file, key, &v)?;
            println!("{key} = {v}");
        }
        None => {
            let current = config
                .get(key)
                .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
            println!("{current}");
        }
    }
    Ok(())
}
