// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations
//!
//! Each subcommand is one dashboard view. Commands share a [`Workspace`]:
//! the schedule document with inferred dependencies and recorded history
//! applied, plus the history and evidence stores under the data directory.

pub mod brief;
pub mod completions;
pub mod config;
pub mod conflicts;
pub mod evidence;
pub mod gate;
pub mod history;
pub mod reflow;
pub mod report;
pub mod schedule;
pub mod ssot;
pub mod transition;

use crate::config::AppConfig;
use crate::dependencies::infer_dependencies;
use crate::modes::{is_action_permitted, Action, ViewMode};
use crate::ssot::load_document;
use crate::store::{EvidenceStore, FileBackend, HistoryStore, PersistenceBackend};
use crate::transition::overlay_history;
use crate::types::{ActivityStatus, EvidenceItem, ScheduleActivity, ScheduleDocument, Severity};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Output settings shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Print JSON instead of text
    pub json: bool,
    /// Use ANSI colours in text output
    pub color: bool,
}

impl Output {
    /// Print a value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{json}");
        Ok(())
    }

    /// Status label, coloured by lifecycle stage
    #[must_use]
    pub fn status(&self, status: ActivityStatus) -> String {
        self.paint_status(status, status.as_str())
    }

    /// Status label left-aligned to `width` columns before colouring
    #[must_use]
    pub fn status_cell(&self, status: ActivityStatus, width: usize) -> String {
        self.paint_status(status, &format!("{:<width$}", status.as_str()))
    }

    /// `text` in the colour of `status`
    #[must_use]
    pub fn paint_status(&self, status: ActivityStatus, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match status {
            ActivityStatus::Done => text.green().to_string(),
            ActivityStatus::InProgress => text.cyan().to_string(),
            ActivityStatus::Ready => text.blue().to_string(),
            ActivityStatus::Paused | ActivityStatus::Blocked => text.yellow().to_string(),
            ActivityStatus::Cancelled => text.dimmed().to_string(),
            ActivityStatus::Planned => text.to_string(),
        }
    }

    /// Severity label
    #[must_use]
    pub fn severity(&self, severity: Severity) -> String {
        self.severity_cell(severity, 0)
    }

    /// Severity label left-aligned to `width` columns before colouring
    #[must_use]
    pub fn severity_cell(&self, severity: Severity, width: usize) -> String {
        let label = format!("{:<width$}", severity.to_string());
        if !self.color {
            return label;
        }
        match severity {
            Severity::Error => label.red().bold().to_string(),
            Severity::Warning => label.yellow().to_string(),
            Severity::Info => label.dimmed().to_string(),
        }
    }

    /// Positive or negative verdict
    #[must_use]
    pub fn verdict(&self, ok: bool, text: &str) -> String {
        match (self.color, ok) {
            (false, _) => text.to_string(),
            (true, true) => text.green().to_string(),
            (true, false) => text.red().to_string(),
        }
    }
}

/// Open the history and evidence stores under the configured data directory
#[must_use]
pub fn open_stores(config: &AppConfig) -> (HistoryStore, EvidenceStore) {
    let backend: Arc<dyn PersistenceBackend> = Arc::new(FileBackend::new(&config.data_dir));
    (
        HistoryStore::new(Arc::clone(&backend), config.default_actor.clone()),
        EvidenceStore::new(backend, config.default_actor.clone()),
    )
}

/// Schedule state shared by the views
pub struct Workspace {
    /// Effective configuration
    pub config: AppConfig,
    /// Active view mode
    pub mode: ViewMode,
    /// File the document was read from
    pub source: PathBuf,
    /// Document with inferred links, recorded history and stored evidence
    pub document: ScheduleDocument,
    /// Audit trail
    pub history: HistoryStore,
    /// Evidence register
    pub evidence: EvidenceStore,
}

impl Workspace {
    /// Load the schedule document and the stores
    pub fn open(config: AppConfig) -> Result<Self> {
        let (source, mut document) =
            load_document(&config.ssot_candidates).context("Failed to load schedule document")?;
        let (history, evidence) = open_stores(&config);

        let inferred = infer_dependencies(&document.activities);
        document.activities = overlay_history(&inferred, &history.list());
        document.evidence.extend(evidence.list());

        Ok(Self {
            mode: config.default_mode,
            config,
            source,
            document,
            history,
            evidence,
        })
    }

    /// Fail unless the active mode allows `action`
    pub fn require(&self, action: Action) -> Result<()> {
        if !is_action_permitted(self.mode, action) {
            anyhow::bail!("{} is not permitted in {} mode", action, self.mode);
        }
        Ok(())
    }

    /// Leaf activity by ID
    pub fn activity(&self, id: &str) -> Result<&ScheduleActivity> {
        self.document
            .activity(id)
            .ok_or_else(|| anyhow::anyhow!("Activity not found: {}", id))
    }

    /// Evidence attached to an activity, from the document and the store
    #[must_use]
    pub fn evidence_for(&self, activity_id: &str) -> Vec<EvidenceItem> {
        crate::evidence::evidence_for_activity(&self.document.evidence, activity_id)
            .into_iter()
            .cloned()
            .collect()
    }
}
