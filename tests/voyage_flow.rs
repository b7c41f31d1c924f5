// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Voyage flow integration test - Option C schedule end-to-end
//!
//! This test walks one working day through the library:
//! 1. Load the schedule document from the candidate list
//! 2. Infer dependencies and check for conflicts
//! 3. Try to start A1010 without a permit (blocked)
//! 4. Attach a PTW and start it (applied, recorded in history)
//! 5. Replay history over a fresh snapshot
//! 6. Preview and apply a reflow
//! 7. Generate trip reports for both voyages

use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use trvoyage::conflicts::detect_conflicts;
use trvoyage::dependencies::infer_dependencies;
use trvoyage::modes::{can_apply_reflow_in_mode, ViewMode};
use trvoyage::reflow::{apply_reflow_at, compute_reflow_preview};
use trvoyage::report::{generate_trip_report_at, trip_report_to_markdown, DelaySource};
use trvoyage::ssot::{load_document, read_endpoint};
use trvoyage::store::{EvidenceDraft, EvidenceStore, HistoryStore, MemoryBackend, PersistenceBackend};
use trvoyage::transition::{overlay_history, request_transition, TransitionOutcome};
use trvoyage::types::{ActivityStatus, EvidenceType, HistoryEventType, ScheduleDocument};

/// Path to the Option C fixture
fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/option_c.json")
}

/// Load the fixture through the candidate search, a missing path first
fn load_fixture() -> ScheduleDocument {
    let candidates = [PathBuf::from("does/not/exist.json"), fixture()];
    let (path, doc) = load_document(&candidates).expect("fixture should load");
    assert_eq!(path, fixture());
    doc
}

#[test]
fn test_voyage_flow() {
    let doc = load_fixture();
    assert_eq!(doc.activities.len(), 9);
    assert_eq!(doc.trips.len(), 2);

    // Step 2: dependencies and conflicts
    let activities = infer_dependencies(&doc.activities);
    let a1010 = activities.iter().find(|a| a.id() == Some("A1010")).unwrap();
    assert_eq!(a1010.depends_on.len(), 1);
    assert_eq!(a1010.depends_on[0].predecessor_id, "A1000");
    let a1000 = activities.iter().find(|a| a.id() == Some("A1000")).unwrap();
    assert!(a1000.depends_on.is_empty());
    assert!(detect_conflicts(&activities).is_empty(), "fixture is conflict-free");

    let backend: Arc<dyn PersistenceBackend> = Arc::new(MemoryBackend::new());
    let history = HistoryStore::new(Arc::clone(&backend), "duty-officer");
    let evidence = EvidenceStore::new(Arc::clone(&backend), "duty-officer");
    let now = Utc.with_ymd_and_hms(2026, 2, 7, 6, 30, 0).unwrap();

    // Step 3: no permit yet
    let blocked = request_transition(ViewMode::Live, a1010, ActivityStatus::InProgress, &[], now);
    match blocked {
        TransitionOutcome::Blocked { reason } => assert!(reason.contains("missing"), "got: {reason}"),
        TransitionOutcome::Applied { .. } => panic!("A1010 must not start without a PTW"),
    }
    assert!(history.list().is_empty());

    // Step 4: attach PTW, then start
    evidence
        .append(EvidenceDraft {
            evidence_type: EvidenceType::Ptw,
            activity_id: Some("A1010".into()),
            trip_id: None,
            uri: "file:///permits/ptw-0207.pdf".into(),
            note: None,
            captured_by: None,
        })
        .unwrap();
    let attached = evidence.for_activity("A1010");
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].captured_by, "duty-officer");

    let outcome = request_transition(ViewMode::Live, a1010, ActivityStatus::InProgress, &attached, now);
    let TransitionOutcome::Applied { activity, event } = outcome else {
        panic!("A1010 should start once the PTW is attached");
    };
    assert_eq!(activity.status, ActivityStatus::InProgress);
    assert_eq!(activity.actual_start.as_deref(), Some("2026-02-07T06:30:00Z"));
    history.append_at(event, now).unwrap();

    let recorded = history.for_entity("A1010");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].event_type, HistoryEventType::StateTransition);
    assert_eq!(recorded[0].actor, "duty-officer");
    assert!(history.delete(&recorded[0].event_id).is_err());

    // Step 5: a fresh snapshot picks the change up from history
    let replayed = overlay_history(&load_fixture().activities, &history.list());
    let a1010 = replayed.iter().find(|a| a.id() == Some("A1010")).unwrap();
    assert_eq!(a1010.status, ActivityStatus::InProgress);
    assert_eq!(a1010.actual_start.as_deref(), Some("2026-02-07T06:30:00Z"));

    // Step 6: reflow
    let preview = compute_reflow_preview(&replayed);
    assert_eq!(preview.activities.len(), replayed.len());
    assert!(!preview.impact.blocks_apply());
    assert!(preview.impact.frozen.iter().any(|id| id == "A1000"));
    assert_eq!(can_apply_reflow_in_mode(ViewMode::Live), Ok(true));
    let run = apply_reflow_at(&preview, "weather hold", now);
    assert_eq!(run.trigger_reason, "weather hold");
    assert_eq!(run.preview_digest, preview.digest());
    assert!(can_apply_reflow_in_mode(ViewMode::Approval).is_err());

    // Step 7: reports
    let generated = Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap();
    let t1 = generate_trip_report_at("T1", None, &doc, generated).unwrap();
    let ids: Vec<&str> = t1.milestones.iter().map(|m| m.activity_id.as_str()).collect();
    assert_eq!(ids, ["A2000", "A2010", "A2020"]);
    assert_eq!(t1.delay.source, DelaySource::Milestones);
    assert_eq!(t1.delay.total_delay_minutes, 0);
    assert_eq!(t1.evidence.required_total, 2);
    assert_eq!(t1.evidence.provided_total, 2);
    assert!(t1.evidence.is_complete());

    let md = trip_report_to_markdown(&t1);
    assert!(md.starts_with("# Trip Report: TR1 Voyage 1 (T1)"));
    assert!(md.contains("Status: complete"));

    let t2 = generate_trip_report_at("T2", None, &doc, generated).unwrap();
    assert_eq!(t2.delay.source, DelaySource::Trip);
    assert_eq!(t2.delay.total_delay_minutes, 30);
    let ids: Vec<&str> = t2.milestones.iter().map(|m| m.activity_id.as_str()).collect();
    assert_eq!(ids, ["A3000", "A3010"]);

    assert!(generate_trip_report_at("T9", None, &doc, generated).is_err());
}

#[test]
fn test_endpoint_serves_fixture_verbatim() {
    let response = read_endpoint(&[fixture()]);
    assert!(response.is_success());
    assert_eq!(response.body, std::fs::read_to_string(fixture()).unwrap());

    let missing = read_endpoint(&[PathBuf::from("nowhere.json")]);
    assert_eq!(missing.status, 404);
    assert!(missing.body.contains("SSOT file not found"));
}
