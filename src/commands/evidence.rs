// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Evidence register - attach and list

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::modes::Action;
use crate::store::{EvidenceDraft, HistoryEventDraft};
use crate::types::{EvidenceItem, EvidenceType, HistoryEventType};
use anyhow::{bail, Result};

/// Arguments for attaching evidence
pub struct AttachArgs {
    /// Artifact type
    pub evidence_type: Option<EvidenceType>,
    /// Where the artifact lives
    pub uri: Option<String>,
    /// Trip the evidence also belongs to
    pub trip: Option<String>,
    /// Free-text note
    pub note: Option<String>,
}

/// Run the evidence command
pub fn run(config: AppConfig, out: Output, action: &str, id: Option<String>, args: AttachArgs) -> Result<()> {
    let ws = Workspace::open(config)?;

    match action {
        "attach" | "add" => {
            ws.require(Action::AttachEvidence)?;
            let id = id.ok_or_else(|| anyhow::anyhow!("Activity ID is required"))?;
            ws.activity(&id)?;
            let evidence_type = args
                .evidence_type
                .ok_or_else(|| anyhow::anyhow!("--type is required"))?;
            let uri = args.uri.ok_or_else(|| anyhow::anyhow!("--uri is required"))?;

            let item = ws.evidence.append(EvidenceDraft {
                evidence_type,
                activity_id: Some(id.clone()),
                trip_id: args.trip,
                uri,
                note: args.note,
                captured_by: None,
            })?;
            ws.history.append(
                HistoryEventDraft::new(HistoryEventType::EvidenceAttached, "activity", id.as_str())
                    .with_detail("evidence_id", item.evidence_id.as_str())
                    .with_detail("evidence_type", item.evidence_type.as_str()),
            )?;

            if out.json {
                return out.print_json(&item);
            }
            println!("Attached {} to {} ({})", item.evidence_type, id, item.evidence_id);
            Ok(())
        }

        "list" | "ls" => {
            let items: Vec<&EvidenceItem> = match id.as_deref() {
                Some(id) => crate::evidence::evidence_for_activity(&ws.document.evidence, id),
                None => ws.document.evidence.iter().collect(),
            };
            if out.json {
                return out.print_json(&items);
            }
            if items.is_empty() {
                println!("No evidence recorded.");
                return Ok(());
            }
            for item in items {
                println!(
                    "{:<12} {:<10} {:<10} {}  {}",
                    item.evidence_type,
                    item.activity_id.as_deref().unwrap_or("-"),
                    item.trip_id.as_deref().unwrap_or("-"),
                    item.captured_at.format("%Y-%m-%d %H:%M"),
                    item.uri
                );
            }
            Ok(())
        }

        _ => bail!("Unknown action: {}. Use attach or list", action),
    }
}
