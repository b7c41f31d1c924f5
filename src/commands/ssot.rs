// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Read endpoint for the schedule document

use crate::config::AppConfig;
use crate::ssot::read_endpoint;
use anyhow::Result;

/// Print the endpoint body; returns the process exit code
pub fn run(config: &AppConfig) -> Result<i32> {
    let response = read_endpoint(&config.ssot_candidates);
    tracing::debug!("SSOT endpoint status {}", response.status);
    println!("{}", response.body.trim_end());
    Ok(if response.is_success() { 0 } else { 1 })
}
