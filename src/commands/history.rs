// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Audit trail

use super::{open_stores, Output};
use crate::config::AppConfig;
use crate::store::HistoryEventDraft;
use crate::types::HistoryEventType;
use anyhow::{bail, Result};

/// Run the history command
pub fn run(config: AppConfig, out: Output, action: &str, entity: Option<String>, text: Option<String>) -> Result<()> {
    let (history, _) = open_stores(&config);

    match action {
        "list" | "ls" => {
            let events = match entity.as_deref() {
                Some(id) => history.for_entity(id),
                None => history.list(),
            };
            if out.json {
                return out.print_json(&events);
            }
            if events.is_empty() {
                println!("No history recorded.");
                return Ok(());
            }
            for event in &events {
                println!(
                    "{}  {:<17} {:<9} {:<10} {}",
                    event.ts.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type.to_string(),
                    event.entity_type,
                    event.entity_id,
                    event.actor
                );
            }
            Ok(())
        }

        // Corrections are new events, never edits
        "note" => {
            let entity = entity.ok_or_else(|| anyhow::anyhow!("--entity is required"))?;
            let text = text.ok_or_else(|| anyhow::anyhow!("Note text is required"))?;
            let event = history.append(
                HistoryEventDraft::new(HistoryEventType::Note, "activity", entity).with_detail("text", text),
            )?;
            if out.json {
                return out.print_json(&event);
            }
            println!("Recorded note {}", event.event_id);
            Ok(())
        }

        _ => bail!("Unknown action: {}. Use list or note", action),
    }
}
