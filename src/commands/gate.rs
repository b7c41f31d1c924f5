// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Evidence gate check for a prospective transition

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::evidence::{check_evidence_gate, transition_key, validate_evidence_gate};
use crate::types::ActivityStatus;
use anyhow::Result;
use serde_json::json;

/// Run the gate command
pub fn run(config: AppConfig, out: Output, id: &str, to: ActivityStatus) -> Result<()> {
    let ws = Workspace::open(config)?;
    let activity = ws.activity(id)?;
    let evidence = ws.evidence_for(id);

    let key = transition_key(activity.status, to);
    let decision = check_evidence_gate(&key, activity, &evidence);
    let validation = validate_evidence_gate(activity, &evidence);

    if out.json {
        return out.print_json(&json!({
            "activity_id": id,
            "transition": key,
            "decision": decision,
            "validation": validation,
            "evidence_count": evidence.len(),
        }));
    }

    println!("{} {}: {} -> {}", id, activity.activity_name, out.status(activity.status), out.status(to));
    println!("  transition: {key}");
    println!("  attached:   {}", evidence.len());
    if decision.allowed {
        println!("  gate:       {}", out.verdict(true, "open"));
    } else {
        println!("  gate:       {}", out.verdict(false, "blocked"));
        if let Some(reason) = &decision.reason {
            println!("  reason:     {reason}");
        }
    }
    if !validation.missing.is_empty() {
        let missing: Vec<&str> = validation.missing.iter().map(|t| t.as_str()).collect();
        println!("  missing:    {}", missing.join(", "));
    }
    Ok(())
}
