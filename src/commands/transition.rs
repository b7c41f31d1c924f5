// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status transitions, recorded in the history log

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::transition::{request_transition, TransitionOutcome};
use crate::types::ActivityStatus;
use anyhow::{bail, Result};
use chrono::Utc;
use serde_json::json;

/// Run the transition command
pub fn run(config: AppConfig, out: Output, id: &str, to: ActivityStatus, note: Option<String>) -> Result<()> {
    let ws = Workspace::open(config)?;
    let activity = ws.activity(id)?;
    let evidence = ws.evidence_for(id);

    match request_transition(ws.mode, activity, to, &evidence, Utc::now()) {
        TransitionOutcome::Blocked { reason } => {
            if out.json {
                out.print_json(&json!({ "applied": false, "reason": reason }))?;
            }
            bail!("Transition blocked: {}", reason)
        }
        TransitionOutcome::Applied { activity: updated, event } => {
            let event = match note {
                Some(text) => event.with_detail("note", text),
                None => event,
            };
            let recorded = ws.history.append(event)?;
            if out.json {
                return out.print_json(&json!({
                    "applied": true,
                    "activity": updated,
                    "event": recorded,
                }));
            }
            println!(
                "{}: {} -> {}",
                id,
                out.status(activity.status),
                out.status(updated.status)
            );
            println!("  recorded event {}", recorded.event_id);
            Ok(())
        }
    }
}
