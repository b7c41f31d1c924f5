// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for the schedule core
//!
//! These tests verify critical invariants:
//! 1. Dependency inference - first-in-group, idempotence, acyclicity
//! 2. Evidence gate - block and allow at the start gate
//! 3. Mode policy - approval mode never applies a reflow
//! 4. Reflow preview - input untouched, length preserved
//! 5. Trip report - milestone order and JSON fidelity

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;
use trvoyage::dependencies::infer_dependencies;
use trvoyage::evidence::{check_evidence_gate, validate_evidence_gate, START_GATE_KEY};
use trvoyage::graph::ScheduleGraph;
use trvoyage::modes::{can_apply_reflow_in_mode, is_action_permitted, Action, ViewMode};
use trvoyage::reflow::compute_reflow_preview;
use trvoyage::report::{generate_trip_report_at, trip_report_to_json, TripReport};
use trvoyage::types::{
    ActivityStatus, DependencyLink, EvidenceItem, EvidenceRequirement, EvidenceType, GateTiming,
    RelationKind, ScheduleActivity, ScheduleDocument, Trip,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn make_activity(id: Option<&str>, level1: &str, level2: Option<&str>, start: &str) -> ScheduleActivity {
    ScheduleActivity {
        activity_id: id.map(String::from),
        activity_name: format!("Activity {}", id.unwrap_or("summary")),
        level1: level1.into(),
        level2: level2.map(String::from),
        duration: 1.0,
        planned_start: start.into(),
        planned_finish: start.into(),
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

fn make_evidence(activity_id: &str, ty: EvidenceType) -> EvidenceItem {
    EvidenceItem {
        evidence_id: format!("ev-{activity_id}-{ty}"),
        evidence_type: ty,
        activity_id: Some(activity_id.into()),
        trip_id: None,
        uri: "file:///evidence".into(),
        captured_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        captured_by: "test".into(),
        note: None,
    }
}

const LEVEL1: [&str; 3] = ["MOB", "LOAD", "SEA"];
const LEVEL2: [Option<&str>; 3] = [None, Some("SPMT"), Some("V1")];

/// Random schedule rows: (level1, level2, day offset, is leaf)
fn arb_schedule() -> impl Strategy<Value = Vec<ScheduleActivity>> {
    prop::collection::vec((0usize..3, 0usize..3, 0i64..45, prop::bool::weighted(0.85)), 0..40).prop_map(|rows| {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        rows.into_iter()
            .enumerate()
            .map(|(i, (l1, l2, day, leaf))| {
                let start = (base + Duration::days(day)).to_rfc3339();
                let id = format!("A{i:04}");
                make_activity(leaf.then_some(id.as_str()), LEVEL1[l1], LEVEL2[l2], &start)
            })
            .collect()
    })
}

// =============================================================================
// Dependency Inference
// =============================================================================

#[test]
fn test_inference_example_is_idempotent() {
    let input = vec![
        make_activity(Some("A1000"), "MOB", Some("SPMT"), "2026-01-26"),
        make_activity(Some("A1010"), "MOB", Some("SPMT"), "2026-02-07"),
    ];
    let expected = vec![DependencyLink {
        predecessor_id: "A1000".into(),
        relation: RelationKind::FinishToStart,
        lag_days: 0,
    }];

    let once = infer_dependencies(&input);
    assert_eq!(once[1].depends_on, expected);
    assert!(once[0].depends_on.is_empty());

    let twice = infer_dependencies(&once);
    assert_eq!(twice[1].depends_on, expected);
    assert_eq!(twice, once);
}

proptest! {
    #[test]
    fn prop_first_in_group_has_no_predecessor(schedule in arb_schedule()) {
        let out = infer_dependencies(&schedule);
        prop_assert_eq!(out.len(), schedule.len());

        // Earliest start per group, document order breaking ties
        let mut first: HashMap<(&str, &str), usize> = HashMap::new();
        for (i, a) in schedule.iter().enumerate().filter(|(_, a)| !a.is_summary()) {
            let earlier = first
                .get(&a.group_key())
                .map_or(true, |&j| (a.planned_start_at(), i) < (schedule[j].planned_start_at(), j));
            if earlier {
                first.insert(a.group_key(), i);
            }
        }
        for &index in first.values() {
            prop_assert!(out[index].depends_on.is_empty());
        }
    }

    #[test]
    fn prop_inference_is_idempotent(schedule in arb_schedule()) {
        let once = infer_dependencies(&schedule);
        let twice = infer_dependencies(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_inferred_links_are_acyclic(schedule in arb_schedule()) {
        let graph = ScheduleGraph::new(infer_dependencies(&schedule));
        prop_assert!(graph.topological_order().is_ok());
        prop_assert!(graph.cycles().is_empty());
    }

    #[test]
    fn prop_summary_rows_never_linked(schedule in arb_schedule()) {
        for a in infer_dependencies(&schedule).iter().filter(|a| a.is_summary()) {
            prop_assert!(a.depends_on.is_empty());
        }
    }
}

// =============================================================================
// Evidence Gate
// =============================================================================

#[test]
fn test_start_gate_blocks_without_evidence() {
    let mut activity = make_activity(Some("A1010"), "MOB", Some("SPMT"), "2026-02-07");
    activity.status = ActivityStatus::Ready;

    let decision = check_evidence_gate(START_GATE_KEY, &activity, &[]);

    assert!(!decision.allowed);
    assert!(!decision.reason.unwrap_or_default().is_empty());
}

#[test]
fn test_start_gate_allows_with_one_item() {
    let mut activity = make_activity(Some("A1010"), "MOB", Some("SPMT"), "2026-02-07");
    activity.status = ActivityStatus::Ready;
    activity.evidence_requirements.push(EvidenceRequirement {
        types: vec![EvidenceType::Ptw],
        min_count: 1,
        gate: GateTiming::BeforeStart,
    });
    let evidence = vec![make_evidence("A1010", EvidenceType::Ptw)];

    assert!(check_evidence_gate(START_GATE_KEY, &activity, &evidence).allowed);
    assert!(validate_evidence_gate(&activity, &evidence).missing.is_empty());
}

// =============================================================================
// Mode Policy
// =============================================================================

#[test]
fn test_reflow_mode_policy() {
    for mode in ViewMode::ALL {
        let result = can_apply_reflow_in_mode(mode);
        if mode == ViewMode::Approval {
            assert!(result.is_err(), "approval must refuse");
        } else {
            assert_eq!(result, Ok(is_action_permitted(mode, Action::ApplyReflow)));
        }
    }
}

// =============================================================================
// Reflow Preview
// =============================================================================

proptest! {
    #[test]
    fn prop_preview_preserves_input(schedule in arb_schedule()) {
        let snapshot = schedule.clone();
        let preview = compute_reflow_preview(&schedule);

        prop_assert_eq!(&schedule, &snapshot);
        prop_assert_eq!(preview.activities.len(), schedule.len());
        prop_assert!(preview.impact.changes.is_empty());
        prop_assert_eq!(preview.impact.affected_count, 0);
    }
}

// =============================================================================
// Trip Report
// =============================================================================

fn make_trip_document(order: &[usize]) -> ScheduleDocument {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();
    let activities = order
        .iter()
        .map(|&i| {
            let start = (base + Duration::hours(i64::try_from(i).unwrap() * 7)).to_rfc3339();
            let mut a = make_activity(Some(&format!("T{i:03}")), "SEA", Some("V1"), &start);
            a.voyage_id = Some("V1".into());
            a
        })
        .collect();
    ScheduleDocument {
        meta: None,
        activities,
        trips: vec![Trip {
            trip_id: "TRIP-1".into(),
            name: "Voyage 1".into(),
            voyage_id: Some("V1".into()),
            tr_unit_id: None,
            activity_ids: vec![],
            total_delay_minutes: None,
        }],
        evidence: vec![],
    }
}

proptest! {
    #[test]
    fn prop_milestones_sorted_for_any_order(order in Just((0..20usize).collect::<Vec<_>>()).prop_shuffle()) {
        let doc = make_trip_document(&order);
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let report = generate_trip_report_at("TRIP-1", None, &doc, at).unwrap();

        prop_assert_eq!(report.milestones.len(), order.len());
        prop_assert!(report.milestones.windows(2).all(|w| w[0].planned_ts <= w[1].planned_ts));
    }
}

#[test]
fn test_report_json_round_trip() {
    let doc = make_trip_document(&[2, 0, 1]);
    let at = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    let report = generate_trip_report_at("TRIP-1", None, &doc, at).unwrap();

    let json = trip_report_to_json(&report).unwrap();
    let parsed: TripReport = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, report);
}
