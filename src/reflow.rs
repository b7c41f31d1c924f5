// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Reflow preview and apply
//!
//! Constraint propagation is not implemented: a preview orders the schedule
//! by planned start and reports conflicts and frozen activities, but never
//! moves a date. Applying a preview records a run for the audit trail and
//! leaves the source document untouched.

use crate::conflicts::{blocks_apply, detect_conflicts};
use crate::types::{ReflowRun, ScheduleActivity, ScheduleConflict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One proposed date change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChange {
    /// Activity being moved
    pub activity_id: String,
    /// Planned start before the change
    pub old_start: String,
    /// Planned start after the change
    pub new_start: String,
    /// Planned finish before the change
    pub old_finish: String,
    /// Planned finish after the change
    pub new_finish: String,
}

/// What a reflow would do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// Proposed changes
    pub changes: Vec<ScheduleChange>,
    /// Conflicts present in the snapshot
    pub conflicts: Vec<ScheduleConflict>,
    /// Activities with recorded actuals, which a reflow must not move
    pub frozen: Vec<String>,
    /// Number of activities the changes touch
    pub affected_count: usize,
}

impl ImpactReport {
    /// Whether error-severity conflicts stand in the way of an apply
    #[must_use]
    pub fn blocks_apply(&self) -> bool {
        blocks_apply(&self.conflicts)
    }
}

/// Reordered schedule plus its impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflowPreview {
    /// Every input row, ordered by planned start
    pub activities: Vec<ScheduleActivity>,
    /// Impact summary
    pub impact: ImpactReport,
}

impl ReflowPreview {
    /// SHA-256 of the preview serialized as JSON, hex encoded
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        if let Err(e) = serde_json::to_writer(&mut hasher, self) {
            tracing::warn!("Failed to serialize reflow preview for digest: {}", e);
        }
        hex::encode(hasher.finalize())
    }
}

/// IDs of leaf activities with a recorded actual start or finish
#[must_use]
pub fn frozen_ids(activities: &[ScheduleActivity]) -> Vec<String> {
    activities
        .iter()
        .filter(|a| a.is_frozen())
        .filter_map(|a| a.id().map(String::from))
        .collect()
}

/// Compute a reflow preview without touching `activities`.
///
/// The result holds every input row (summary rows included) in stable
/// planned-start order, unparseable dates last.
#[must_use]
pub fn compute_reflow_preview(activities: &[ScheduleActivity]) -> ReflowPreview {
    let mut ordered = activities.to_vec();
    ordered.sort_by_key(|a| {
        let at = a.planned_start_at();
        (at.is_none(), at)
    });

    let impact = ImpactReport {
        changes: Vec::new(),
        conflicts: detect_conflicts(activities),
        frozen: frozen_ids(activities),
        affected_count: 0,
    };

    tracing::info!(
        "Reflow preview: {} rows, {} conflicts, {} frozen",
        ordered.len(),
        impact.conflicts.len(),
        impact.frozen.len()
    );

    ReflowPreview {
        activities: ordered,
        impact,
    }
}

/// Record a reflow run for `preview`, stamped now
#[must_use]
pub fn apply_reflow(preview: &ReflowPreview, reason: &str) -> ReflowRun {
    apply_reflow_at(preview, reason, Utc::now())
}

/// Record a reflow run for `preview` at an explicit time.
///
/// Mode and conflict checks are the caller's job.
#[must_use]
pub fn apply_reflow_at(preview: &ReflowPreview, reason: &str, applied_at: DateTime<Utc>) -> ReflowRun {
    let impact = &preview.impact;
    let run = ReflowRun {
        run_id: uuid::Uuid::new_v4().to_string(),
        applied_at,
        trigger_reason: reason.to_string(),
        previewed_changes: impact.changes.len(),
        applied_changes: impact.changes.len(),
        impact_summary: format!(
            "{} change(s), {} affected, {} conflict(s), {} frozen",
            impact.changes.len(),
            impact.affected_count,
            impact.conflicts.len(),
            impact.frozen.len()
        ),
        preview_digest: preview.digest(),
    };
    tracing::info!("Reflow run {} recorded: {}", run.run_id, run.impact_summary);
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityStatus;
    use chrono::TimeZone;

    fn activity(id: &str, start: &str, finish: &str) -> ScheduleActivity {
        ScheduleActivity {
            activity_id: Some(id.into()),
            activity_name: id.into(),
            level1: "MOB".into(),
            level2: None,
            duration: 1.0,
            planned_start: start.into(),
            planned_finish: finish.into(),
            actual_start: None,
            actual_finish: None,
            status: ActivityStatus::Planned,
            tr_unit_id: None,
            anchor_type: None,
            resource_tags: vec![],
            voyage_id: None,
            constraint: None,
            depends_on: vec![],
            evidence_requirements: vec![],
        }
    }

    #[test]
    fn test_preview_orders_without_moving_dates() {
        let input = vec![
            activity("B", "2026-02-01", "2026-02-02"),
            activity("A", "2026-01-01", "2026-01-02"),
            activity("C", "not a date", "2026-03-01"),
        ];
        let snapshot = input.clone();

        let preview = compute_reflow_preview(&input);

        assert_eq!(input, snapshot);
        let ids: Vec<_> = preview.activities.iter().filter_map(ScheduleActivity::id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(preview.impact.changes.is_empty());
        assert_eq!(preview.impact.affected_count, 0);
        assert_eq!(preview.activities[1].planned_start, "2026-02-01");
    }

    #[test]
    fn test_frozen_activities_reported() {
        let mut started = activity("A", "2026-01-01", "2026-01-02");
        started.actual_start = Some("2026-01-01T08:00:00Z".into());
        let mut blank = activity("B", "2026-01-03", "2026-01-04");
        blank.actual_finish = Some("  ".into());

        let preview = compute_reflow_preview(&[started, blank]);

        assert_eq!(preview.impact.frozen, vec!["A".to_string()]);
    }

    #[test]
    fn test_preview_carries_blocking_conflicts() {
        let input = vec![activity("A", "2026-01-05", "2026-01-01")];
        let preview = compute_reflow_preview(&input);
        assert!(preview.impact.blocks_apply());
    }

    #[test]
    fn test_digest_is_stable_and_order_sensitive() {
        let a = compute_reflow_preview(&[activity("A", "2026-01-01", "2026-01-02")]);
        let b = compute_reflow_preview(&[activity("A", "2026-01-01", "2026-01-02")]);
        let c = compute_reflow_preview(&[activity("A", "2026-01-01", "2026-01-03")]);

        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_digest_covers_status_and_conflicts() {
        let base = compute_reflow_preview(&[activity("A", "2026-01-01", "2026-01-02")]);

        let mut started = activity("A", "2026-01-01", "2026-01-02");
        started.status = ActivityStatus::InProgress;
        started.actual_start = Some("2026-01-01T07:00:00Z".into());
        let with_actuals = compute_reflow_preview(&[started]);
        assert_ne!(base.digest(), with_actuals.digest());

        let broken = compute_reflow_preview(&[activity("A", "2026-01-05", "2026-01-02")]);
        let mut flagged = base.clone();
        flagged.impact.conflicts = broken.impact.conflicts;
        assert_ne!(base.digest(), flagged.digest());
    }

    #[test]
    fn test_apply_records_run() {
        let preview = compute_reflow_preview(&[activity("A", "2026-01-01", "2026-01-02")]);
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let run = apply_reflow_at(&preview, "weather hold", at);

        assert_eq!(run.applied_at, at);
        assert_eq!(run.trigger_reason, "weather hold");
        assert_eq!(run.previewed_changes, 0);
        assert_eq!(run.applied_changes, 0);
        assert_eq!(run.preview_digest, preview.digest());
        assert!(!run.run_id.is_empty());
    }
}
