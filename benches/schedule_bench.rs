// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Schedule core benchmarks

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trvoyage::conflicts::detect_conflicts;
use trvoyage::dependencies::infer_dependencies;
use trvoyage::reflow::compute_reflow_preview;
use trvoyage::types::{ActivityStatus, ScheduleActivity};

const PHASES: [&str; 5] = ["MOB", "LOAD", "SEA", "DISCH", "INST"];

/// `n` activities spread over 5 phases and 7 voyages, half a day apart
fn build_schedule(n: usize) -> Vec<ScheduleActivity> {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let offset = i64::try_from(i).unwrap();
            let start = base + Duration::hours(offset * 12);
            let voyage = format!("V{}", i % 7 + 1);
            ScheduleActivity {
                activity_id: Some(format!("A{i:05}")),
                activity_name: format!("Step {i} {voyage}"),
                level1: PHASES[i % PHASES.len()].to_string(),
                level2: Some(voyage.clone()),
                duration: 1.0,
                planned_start: start.to_rfc3339(),
                planned_finish: (start + Duration::hours(20)).to_rfc3339(),
                actual_start: None,
                actual_finish: None,
                status: ActivityStatus::Planned,
                tr_unit_id: Some(format!("TR-{}", i % 7 + 1)),
                anchor_type: None,
                resource_tags: vec![if i % 3 == 0 { "SPMT" } else { "LCT" }.to_string()],
                voyage_id: Some(voyage),
                constraint: None,
                depends_on: vec![],
                evidence_requirements: vec![],
            }
        })
        .collect()
}

fn bench_infer(c: &mut Criterion) {
    let schedule = build_schedule(500);
    c.bench_function("infer_dependencies_500", |b| {
        b.iter(|| infer_dependencies(black_box(&schedule)));
    });
}

fn bench_conflicts(c: &mut Criterion) {
    let schedule = infer_dependencies(&build_schedule(500));
    c.bench_function("detect_conflicts_500", |b| {
        b.iter(|| detect_conflicts(black_box(&schedule)));
    });
}

fn bench_preview(c: &mut Criterion) {
    let schedule = infer_dependencies(&build_schedule(500));
    c.bench_function("reflow_preview_500", |b| {
        b.iter(|| compute_reflow_preview(black_box(&schedule)).digest());
    });
}

criterion_group!(benches, bench_infer, bench_conflicts, bench_preview);
criterion_main!(benches);
