// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Reflow preview and apply

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::modes::can_apply_reflow_in_mode;
use crate::reflow::{apply_reflow, compute_reflow_preview, ReflowPreview};
use crate::store::HistoryEventDraft;
use crate::types::HistoryEventType;
use anyhow::{bail, Context, Result};
use serde_json::json;

/// Run the reflow command
pub fn run(config: AppConfig, out: Output, action: &str, reason: Option<String>, force: bool) -> Result<()> {
    let ws = Workspace::open(config)?;
    let preview = compute_reflow_preview(&ws.document.activities);

    match action {
        "preview" => {
            if out.json {
                return out.print_json(&json!({
                    "digest": preview.digest(),
                    "impact": preview.impact,
                    "order": preview.activities.iter().filter_map(|a| a.id()).collect::<Vec<_>>(),
                }));
            }
            print_impact(&preview, out);
            Ok(())
        }

        "apply" => {
            if !can_apply_reflow_in_mode(ws.mode)? {
                bail!("Reflow cannot be applied in {} mode", ws.mode);
            }
            if preview.impact.blocks_apply() && !force {
                bail!(
                    "Reflow blocked by {} error conflict(s); resolve them or pass --force",
                    preview
                        .impact
                        .conflicts
                        .iter()
                        .filter(|c| c.severity == crate::types::Severity::Error)
                        .count()
                );
            }
            let reason = reason.ok_or_else(|| anyhow::anyhow!("--reason is required"))?;

            let run = apply_reflow(&preview, &reason);
            let details = serde_json::to_value(&run).context("Failed to serialize reflow run")?;
            let mut draft = HistoryEventDraft::new(HistoryEventType::ReflowApplied, "schedule", run.run_id.as_str());
            if let serde_json::Value::Object(map) = details {
                draft.details = map;
            }
            draft.details.insert("forced".into(), json!(force));
            ws.history.append(draft)?;

            if out.json {
                return out.print_json(&run);
            }
            println!("Reflow run {} recorded", run.run_id);
            println!("  reason:  {}", run.trigger_reason);
            println!("  impact:  {}", run.impact_summary);
            println!("  digest:  {}", run.preview_digest);
            Ok(())
        }

        _ => bail!("Unknown action: {}. Use preview or apply", action),
    }
}

fn print_impact(preview: &ReflowPreview, out: Output) {
    let impact = &preview.impact;
    println!("Reflow preview ({} rows)", preview.activities.len());
    println!("  changes:  {}", impact.changes.len());
    println!("  affected: {}", impact.affected_count);
    println!("  frozen:   {}", impact.frozen.len());
    if !impact.frozen.is_empty() {
        println!("            {}", impact.frozen.join(", "));
    }
    println!("  conflicts: {}", impact.conflicts.len());
    for conflict in &impact.conflicts {
        println!("    [{}] {}: {}", out.severity(conflict.severity), conflict.activity_id, conflict.message);
    }
    println!("  digest:   {}", preview.digest());
    if impact.blocks_apply() {
        println!("{}", out.verdict(false, "Apply is blocked by error conflicts"));
    }
}
