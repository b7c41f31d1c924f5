// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Conflict badges

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::conflicts::{blocks_apply, detect_conflicts};
use crate::types::Severity;
use anyhow::Result;

/// Run the conflicts command
pub fn run(config: AppConfig, out: Output, min_severity: Option<Severity>) -> Result<()> {
    let ws = Workspace::open(config)?;
    let mut conflicts = detect_conflicts(&ws.document.activities);
    if let Some(min) = min_severity {
        conflicts.retain(|c| c.severity >= min);
    }

    if out.json {
        return out.print_json(&conflicts);
    }

    if conflicts.is_empty() {
        println!("{}", out.verdict(true, "No conflicts"));
        return Ok(());
    }
    for conflict in &conflicts {
        let related = if conflict.related_ids.is_empty() {
            String::new()
        } else {
            format!(" [{}]", conflict.related_ids.join(", "))
        };
        println!(
            "{} {:<10} {}{}",
            out.severity_cell(conflict.severity, 8),
            conflict.activity_id,
            conflict.message,
            related
        );
    }
    println!();
    println!("{} conflict(s)", conflicts.len());
    if blocks_apply(&conflicts) {
        println!("{}", out.verdict(false, "Reflow apply is blocked until errors are resolved"));
    }
    Ok(())
}
