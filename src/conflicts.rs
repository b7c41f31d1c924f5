// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Resource and timing conflict detection

use crate::graph::ScheduleGraph;
use crate::types::{
    parse_timestamp, ActivityStatus, ConflictKind, ConstraintKind, ScheduleActivity,
    ScheduleConflict, Severity,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Scan a schedule snapshot for conflicts.
///
/// Result is ordered by primary activity, then kind.
#[must_use]
pub fn detect_conflicts(activities: &[ScheduleActivity]) -> Vec<ScheduleConflict> {
    let leaves: HashMap<&str, &ScheduleActivity> = activities
        .iter()
        .filter_map(|a| a.id().map(|id| (id, a)))
        .collect();

    let mut conflicts = Vec::new();
    for (id, activity) in &leaves {
        check_window(id, activity, &mut conflicts);
        check_links(id, activity, &leaves, &mut conflicts);
        check_constraint(id, activity, &mut conflicts);
    }
    check_resources(activities, &mut conflicts);
    check_cycles(activities, &mut conflicts);

    conflicts.sort_by(|a, b| {
        (&a.activity_id, a.kind, &a.related_ids).cmp(&(&b.activity_id, b.kind, &b.related_ids))
    });
    tracing::debug!("Detected {} conflicts", conflicts.len());
    conflicts
}

/// Whether any conflict is severe enough to block a reflow apply
#[must_use]
pub fn blocks_apply(conflicts: &[ScheduleConflict]) -> bool {
    conflicts.iter().any(|c| c.severity == Severity::Error)
}

/// Conflicts that mention `activity_id`, as primary or related
pub fn conflicts_for<'a>(
    conflicts: &'a [ScheduleConflict],
    activity_id: &'a str,
) -> impl Iterator<Item = &'a ScheduleConflict> + 'a {
    conflicts
        .iter()
        .filter(move |c| c.activity_id == activity_id || c.related_ids.iter().any(|r| r == activity_id))
}

fn window(activity: &ScheduleActivity) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((activity.planned_start_at()?, activity.planned_finish_at()?))
}

fn check_window(id: &str, activity: &ScheduleActivity, out: &mut Vec<ScheduleConflict>) {
    if let Some((start, finish)) = window(activity) {
        if finish < start {
            out.push(ScheduleConflict {
                kind: ConflictKind::InvalidWindow,
                severity: Severity::Error,
                activity_id: id.to_string(),
                related_ids: vec![],
                message: format!(
                    "planned finish {} is before planned start {}",
                    activity.planned_finish, activity.planned_start
                ),
            });
        }
    }
}

fn check_links(
    id: &str,
    activity: &ScheduleActivity,
    leaves: &HashMap<&str, &ScheduleActivity>,
    out: &mut Vec<ScheduleConflict>,
) {
    for link in &activity.depends_on {
        let Some(predecessor) = leaves.get(link.predecessor_id.as_str()) else {
            out.push(ScheduleConflict {
                kind: ConflictKind::MissingPredecessor,
                severity: Severity::Warning,
                activity_id: id.to_string(),
                related_ids: vec![link.predecessor_id.clone()],
                message: format!("depends on unknown activity {}", link.predecessor_id),
            });
            continue;
        };

        let (Some(start), Some(pred_finish)) = (activity.planned_start_at(), predecessor.planned_finish_at()) else {
            continue;
        };
        let Some(earliest) = Duration::try_days(i64::from(link.lag_days))
            .and_then(|lag| pred_finish.checked_add_signed(lag))
        else {
            out.push(ScheduleConflict {
                kind: ConflictKind::DependencyViolation,
                severity: Severity::Error,
                activity_id: id.to_string(),
                related_ids: vec![link.predecessor_id.clone()],
                message: format!(
                    "{}d lag after {} is out of range and can never be met",
                    link.lag_days, link.predecessor_id
                ),
            });
            continue;
        };
        if start < earliest {
            out.push(ScheduleConflict {
                kind: ConflictKind::DependencyViolation,
                severity: Severity::Error,
                activity_id: id.to_string(),
                related_ids: vec![link.predecessor_id.clone()],
                message: format!(
                    "planned start {} is before {} finishes{} ({})",
                    activity.planned_start,
                    link.predecessor_id,
                    if link.lag_days > 0 { format!(" + {}d lag", link.lag_days) } else { String::new() },
                    earliest.format("%Y-%m-%d %H:%M")
                ),
            });
        }
    }
}

fn check_constraint(id: &str, activity: &ScheduleActivity, out: &mut Vec<ScheduleConflict>) {
    let Some(constraint) = &activity.constraint else {
        return;
    };
    let Some(date) = parse_timestamp(&constraint.date) else {
        out.push(ScheduleConflict {
            kind: ConflictKind::ConstraintViolation,
            severity: Severity::Warning,
            activity_id: id.to_string(),
            related_ids: vec![],
            message: format!("{} constraint has unreadable date '{}'", constraint.kind.code(), constraint.date),
        });
        return;
    };
    let Some((start, finish)) = window(activity) else {
        return;
    };

    let violated = match constraint.kind {
        ConstraintKind::StartNoEarlierThan => start < date,
        ConstraintKind::FinishNoLaterThan => finish > date,
        ConstraintKind::MustStartOn => start.date_naive() != date.date_naive(),
    };
    if violated {
        // Already executed: nothing left to reschedule
        let severity = if activity.is_frozen() { Severity::Info } else { Severity::Error };
        out.push(ScheduleConflict {
            kind: ConflictKind::ConstraintViolation,
            severity,
            activity_id: id.to_string(),
            related_ids: vec![],
            message: format!(
                "{} {} not met (planned {} to {})",
                constraint.kind.code(),
                constraint.date,
                activity.planned_start,
                activity.planned_finish
            ),
        });
    }
}

fn check_resources(activities: &[ScheduleActivity], out: &mut Vec<ScheduleConflict>) {
    let mut by_resource: BTreeMap<&str, Vec<(&str, DateTime<Utc>, DateTime<Utc>)>> = BTreeMap::new();
    for activity in activities {
        if activity.status == ActivityStatus::Cancelled {
            continue;
        }
        let (Some(id), Some((start, finish))) = (activity.id(), window(activity)) else {
            continue;
        };
        for tag in &activity.resource_tags {
            by_resource.entry(tag.as_str()).or_default().push((id, start, finish));
        }
    }

    let mut overlaps: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for (tag, mut slots) in by_resource {
        slots.sort_by_key(|(id, start, _)| (*start, *id));
        for (i, (a_id, a_start, a_finish)) in slots.iter().enumerate() {
            for (b_id, b_start, b_finish) in &slots[i + 1..] {
                if b_start >= a_finish {
                    break;
                }
                if a_start < b_finish && a_id != b_id {
                    overlaps.entry((*a_id, *b_id)).or_default().insert(tag);
                }
            }
        }
    }

    for ((first, second), tags) in overlaps {
        let tags: Vec<&str> = tags.into_iter().collect();
        out.push(ScheduleConflict {
            kind: ConflictKind::ResourceOverlap,
            severity: Severity::Warning,
            activity_id: first.to_string(),
            related_ids: vec![second.to_string()],
            message: format!("shares {} with {} in an overlapping window", tags.join(", "), second),
        });
    }
}

fn check_cycles(activities: &[ScheduleActivity], out: &mut Vec<ScheduleConflict>) {
    let graph = ScheduleGraph::new(activities.to_vec());
    for cycle in graph.cycles() {
        let Some((primary, rest)) = cycle.split_first() else {
            continue;
        };
        out.push(ScheduleConflict {
            kind: ConflictKind::DependencyCycle,
            severity: Severity::Error,
            activity_id: primary.clone(),
            related_ids: rest.to_vec(),
            message: format!("dependency cycle through {}", cycle.join(" -> ")),
        });
    }
}
