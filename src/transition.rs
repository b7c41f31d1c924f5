// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Activity state transitions
//!
//! A transition request passes three checks in order: the view mode must
//! allow state changes, the status edge must exist, and the evidence gate
//! registered for the edge must be satisfied. The document itself is never
//! written; an applied transition yields the updated activity plus a history
//! draft, and [`overlay_history`] replays recorded transitions over a fresh
//! snapshot.

use crate::evidence::{check_evidence_gate, transition_key};
use crate::modes::{is_action_permitted, Action, ViewMode};
use crate::store::HistoryEventDraft;
use crate::types::{ActivityStatus, EvidenceItem, HistoryEvent, HistoryEventType, ScheduleActivity};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Entity type recorded on activity events
pub const ACTIVITY_ENTITY: &str = "activity";

/// Result of a transition request
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The request was refused
    Blocked {
        /// Why
        reason: String,
    },
    /// The request went through
    Applied {
        /// Activity with its new status
        activity: Box<ScheduleActivity>,
        /// Audit entry to append
        event: HistoryEventDraft,
    },
}

impl TransitionOutcome {
    /// Whether the transition went through
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    fn blocked(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::debug!("Transition blocked: {}", reason);
        Self::Blocked { reason }
    }
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn is_unset(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Request a status change for one activity.
///
/// `evidence` is the evidence attached to the activity. Entering
/// `in_progress` or `done` stamps `actual_start`/`actual_finish` with `now`
/// when they are not already recorded.
#[must_use]
pub fn request_transition(
    mode: ViewMode,
    activity: &ScheduleActivity,
    to: ActivityStatus,
    evidence: &[EvidenceItem],
    now: DateTime<Utc>,
) -> TransitionOutcome {
    if !is_action_permitted(mode, Action::ModifyState) {
        return TransitionOutcome::blocked(format!("state changes are not permitted in {mode} mode"));
    }
    let Some(id) = activity.id() else {
        return TransitionOutcome::blocked(format!(
            "'{}' is a summary row and has no status of its own",
            activity.activity_name
        ));
    };

    let from = activity.status;
    if from.is_terminal() {
        return TransitionOutcome::blocked(format!("{id}: cannot move from {from} to {to}, {from} is terminal"));
    }
    if !from.can_transition_to(to) {
        return TransitionOutcome::blocked(format!("{id}: cannot move from {from} to {to}"));
    }

    let key = transition_key(from, to);
    let gate = check_evidence_gate(&key, activity, evidence);
    if !gate.allowed {
        return TransitionOutcome::blocked(gate.reason.unwrap_or_else(|| format!("{key} is gated")));
    }

    let mut updated = activity.clone();
    updated.status = to;

    let mut details = Map::new();
    details.insert("from".into(), json!(from));
    details.insert("to".into(), json!(to));
    details.insert("transition".into(), json!(key));
    details.insert("evidence_count".into(), json!(evidence.len()));

    if to == ActivityStatus::InProgress && is_unset(updated.actual_start.as_ref()) {
        let at = stamp(now);
        details.insert("actual_start".into(), json!(at));
        updated.actual_start = Some(at);
    }
    if to == ActivityStatus::Done && is_unset(updated.actual_finish.as_ref()) {
        let at = stamp(now);
        details.insert("actual_finish".into(), json!(at));
        updated.actual_finish = Some(at);
    }

    tracing::info!("{}: {} -> {}", id, from, to);
    TransitionOutcome::Applied {
        activity: Box::new(updated),
        event: HistoryEventDraft {
            event_type: HistoryEventType::StateTransition,
            entity_type: ACTIVITY_ENTITY.to_string(),
            entity_id: id.to_string(),
            actor: None,
            details,
        },
    }
}

/// Replay recorded state transitions over a document snapshot.
///
/// Events are applied in timestamp order; events for unknown activities or
/// with an unreadable target status are skipped.
#[must_use]
pub fn overlay_history(activities: &[ScheduleActivity], events: &[HistoryEvent]) -> Vec<ScheduleActivity> {
    let mut result = activities.to_vec();
    let index: HashMap<String, usize> = result
        .iter()
        .enumerate()
        .filter_map(|(i, a)| a.id().map(|id| (id.to_string(), i)))
        .collect();

    let mut transitions: Vec<&HistoryEvent> = events
        .iter()
        .filter(|e| e.event_type == HistoryEventType::StateTransition && e.entity_type == ACTIVITY_ENTITY)
        .collect();
    transitions.sort_by_key(|e| e.ts);

    for event in transitions {
        let Some(&i) = index.get(&event.entity_id) else {
            tracing::debug!("History event {} targets unknown activity {}", event.event_id, event.entity_id);
            continue;
        };
        let Some(to) = event
            .details
            .get("to")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<ActivityStatus>().ok())
        else {
            tracing::debug!("History event {} has no readable target status", event.event_id);
            continue;
        };

        let activity = &mut result[i];
        activity.status = to;
        if let Some(at) = event.details.get("actual_start").and_then(Value::as_str) {
            activity.actual_start = Some(at.to_string());
        }
        if let Some(at) = event.details.get("actual_finish").and_then(Value::as_str) {
            activity.actual_finish = Some(at.to_string());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvidenceType;
    use chrono::TimeZone;

    fn make_activity(status: ActivityStatus) -> ScheduleActivity {
        ScheduleActivity {
            activity_id: Some("A3000".into()),
            activity_name: "Sail-away V1".into(),
            level1: "SEA".into(),
            level2: Some("V1".into()),
            duration: 2.0,
            planned_start: "2026-03-01".into(),
            planned_finish: "2026-03-03".into(),
            actual_start: None,
            actual_finish: None,
            status,
            tr_unit_id: None,
            anchor_type: None,
            resource_tags: vec![],
            voyage_id: Some("V1".into()),
            constraint: None,
            depends_on: vec![],
            evidence_requirements: vec![],
        }
    }

    fn make_evidence(ty: EvidenceType) -> EvidenceItem {
        EvidenceItem {
            evidence_id: format!("ev-{ty}"),
            evidence_type: ty,
            activity_id: Some("A3000".into()),
            trip_id: None,
            uri: "file:///tmp/x".into(),
            captured_at: Utc::now(),
            captured_by: "test".into(),
            note: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 6, 30, 0).unwrap()
    }

    #[test]
    fn test_blocked_outside_live_mode() {
        let activity = make_activity(ActivityStatus::Planned);
        for mode in [ViewMode::History, ViewMode::Approval, ViewMode::Compare] {
            let outcome = request_transition(mode, &activity, ActivityStatus::Ready, &[], now());
            assert!(!outcome.is_applied());
        }
    }

    #[test]
    fn test_blocked_on_illegal_edge() {
        let activity = make_activity(ActivityStatus::Planned);
        let outcome = request_transition(ViewMode::Live, &activity, ActivityStatus::Done, &[], now());
        match outcome {
            TransitionOutcome::Blocked { reason } => assert!(reason.contains("planned to done")),
            TransitionOutcome::Applied { .. } => panic!("planned -> done must be refused"),
        }
    }

    #[test]
    fn test_terminal_status_named_in_reason() {
        for status in [ActivityStatus::Done, ActivityStatus::Cancelled] {
            let activity = make_activity(status);
            let outcome = request_transition(ViewMode::Live, &activity, ActivityStatus::Planned, &[], now());
            match outcome {
                TransitionOutcome::Blocked { reason } => assert!(reason.ends_with(&format!("{status} is terminal"))),
                TransitionOutcome::Applied { .. } => panic!("{status} must not move"),
            }
        }
    }

    #[test]
    fn test_start_gate_then_start() {
        let activity = make_activity(ActivityStatus::Ready);

        let blocked = request_transition(ViewMode::Live, &activity, ActivityStatus::InProgress, &[], now());
        assert!(!blocked.is_applied());

        let evidence = vec![make_evidence(EvidenceType::Ptw)];
        let outcome = request_transition(ViewMode::Live, &activity, ActivityStatus::InProgress, &evidence, now());
        let TransitionOutcome::Applied { activity, event } = outcome else {
            panic!("expected transition to apply");
        };
        assert_eq!(activity.status, ActivityStatus::InProgress);
        assert_eq!(activity.actual_start.as_deref(), Some("2026-03-01T06:30:00Z"));
        assert_eq!(event.event_type, HistoryEventType::StateTransition);
        assert_eq!(event.entity_id, "A3000");
        assert_eq!(event.details["to"], json!("in_progress"));
    }

    #[test]
    fn test_existing_actual_start_kept() {
        let mut activity = make_activity(ActivityStatus::Paused);
        activity.actual_start = Some("2026-02-28T10:00:00Z".into());
        let evidence = vec![make_evidence(EvidenceType::Ptw)];

        let outcome = request_transition(ViewMode::Live, &activity, ActivityStatus::InProgress, &evidence, now());
        let TransitionOutcome::Applied { activity, event } = outcome else {
            panic!("paused -> in_progress should apply");
        };
        assert_eq!(activity.actual_start.as_deref(), Some("2026-02-28T10:00:00Z"));
        assert!(!event.details.contains_key("actual_start"));
    }

    #[test]
    fn test_overlay_replays_in_timestamp_order() {
        let activities = vec![make_activity(ActivityStatus::Ready)];
        let event = |id: &str, hour: u32, to: ActivityStatus| HistoryEvent {
            event_id: id.into(),
            ts: Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap(),
            event_type: HistoryEventType::StateTransition,
            entity_type: ACTIVITY_ENTITY.into(),
            entity_id: "A3000".into(),
            actor: "ops".into(),
            details: {
                let mut m = Map::new();
                m.insert("to".into(), json!(to));
                m
            },
        };
        // Recorded out of order
        let events = vec![
            event("e2", 9, ActivityStatus::Paused),
            event("e1", 8, ActivityStatus::InProgress),
        ];

        let out = overlay_history(&activities, &events);

        assert_eq!(out[0].status, ActivityStatus::Paused);
        assert_eq!(activities[0].status, ActivityStatus::Ready);
    }
}
