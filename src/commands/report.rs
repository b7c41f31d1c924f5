// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trip report export

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::modes::Action;
use crate::report::{generate_trip_report, trip_report_to_json, trip_report_to_markdown};
use crate::store::HistoryEventDraft;
use crate::types::{HistoryEventType, TripCloseout};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Markdown document
    Markdown,
    /// Pretty-printed JSON
    Json,
}

impl ReportFormat {
    /// Parse format from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get format name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
        }
    }
}

/// Run the report command
pub fn run(
    config: AppConfig,
    out: Output,
    trip_id: &str,
    format: &str,
    closeout: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let format = ReportFormat::from_str(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown report format: {}. Supported: markdown, json", format))?;
    // --json on the command line wins over --format
    let format = if out.json { ReportFormat::Json } else { format };

    let ws = Workspace::open(config)?;
    ws.require(Action::Export)?;

    let closeout: Option<TripCloseout> = match closeout {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?)
        }
        None => None,
    };

    let report = generate_trip_report(trip_id, closeout.as_ref(), &ws.document)?;
    let content = match format {
        ReportFormat::Markdown => trip_report_to_markdown(&report),
        ReportFormat::Json => trip_report_to_json(&report)?,
    };

    match output {
        Some(path) => {
            fs::write(&path, &content).with_context(|| format!("Failed to write to {}", path.display()))?;
            ws.history.append(
                HistoryEventDraft::new(HistoryEventType::ReportExported, "trip", trip_id)
                    .with_detail("format", format.name())
                    .with_detail("path", path.display().to_string()),
            )?;
            println!("Exported {} report to {}", format.name(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
