// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dependency inference from schedule order
//!
//! Leaf activities are grouped by `(level1, level2)` and each one is linked
//! finish-to-start to its immediate chronological predecessor in the group.
//! Every node links only backwards within its own group, so the result is
//! acyclic.

use crate::types::{DependencyLink, ScheduleActivity, ScheduleDependency};
use std::collections::HashMap;

/// Link each leaf activity to the previous activity of its group.
///
/// Returns a new list with the same length and order as `activities`.
/// Rows without an `activity_id` are left untouched. Ties on planned start
/// keep their original order, and an existing link to the same predecessor
/// is never duplicated, so running this twice adds nothing the second time.
#[must_use]
pub fn infer_dependencies(activities: &[ScheduleActivity]) -> Vec<ScheduleActivity> {
    let mut result = activities.to_vec();

    let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (index, activity) in activities.iter().enumerate() {
        if activity.is_summary() {
            continue;
        }
        groups.entry(activity.group_key()).or_default().push(index);
    }

    let mut added = 0usize;
    for (key, mut members) in groups {
        // Stable: equal timestamps keep document order. Unparseable dates sort last.
        members.sort_by_key(|&i| {
            let at = activities[i].planned_start_at();
            (at.is_none(), at)
        });

        for pair in members.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            let Some(prev_id) = activities[prev].id() else { continue };
            if result[curr].has_link_to(prev_id) {
                continue;
            }
            tracing::debug!(
                "Inferred {} -> {} in group {}/{}",
                prev_id,
                activities[curr].id().unwrap_or_default(),
                key.0,
                key.1
            );
            result[curr].depends_on.push(DependencyLink::finish_to_start(prev_id));
            added += 1;
        }
    }

    tracing::debug!("Dependency inference added {} links", added);
    result
}

/// Flatten the predecessor links of every leaf into directed edges
#[must_use]
pub fn dependencies_of(activities: &[ScheduleActivity]) -> Vec<ScheduleDependency> {
    activities
        .iter()
        .filter_map(|a| a.id().map(|id| (id, a)))
        .flat_map(|(id, a)| {
            a.depends_on.iter().map(move |link| ScheduleDependency {
                predecessor_id: link.predecessor_id.clone(),
                successor_id: id.to_string(),
                relation: link.relation,
                lag_days: link.lag_days,
            })
        })
        .collect()
}
