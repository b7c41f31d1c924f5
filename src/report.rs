// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trip reports
//!
//! A report is derived from the schedule document on demand and never
//! stored. Total delay comes from the first available source: closeout
//! delay details, the trip's precomputed delay, then the sum of positive
//! milestone delays.

use crate::error::ReportError;
use crate::types::{parse_timestamp, ScheduleActivity, ScheduleDocument, Trip, TripCloseout};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One trip activity as a timeline point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Activity ID
    pub activity_id: String,
    /// Activity name
    pub name: String,
    /// Planned start as written in the document
    pub planned_ts: String,
    /// Recorded start
    pub actual_ts: Option<String>,
    /// Actual minus planned start, in minutes
    pub delay_minutes: Option<i64>,
}

/// Where the total delay figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelaySource {
    /// Closeout delay details
    Closeout,
    /// Precomputed on the trip
    Trip,
    /// Summed from milestones
    Milestones,
}

impl DelaySource {
    fn label(self) -> &'static str {
        match self {
            Self::Closeout => "from closeout",
            Self::Trip => "precomputed",
            Self::Milestones => "from milestones",
        }
    }
}

/// Delay totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelaySummary {
    /// Total delay in minutes
    pub total_delay_minutes: i64,
    /// Source of the total
    pub source: DelaySource,
    /// Reason codes from the closeout
    #[serde(default)]
    pub reason_codes: Vec<String>,
}

/// Evidence counts against requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceCompleteness {
    /// Sum of `min_count` over every requirement of every trip activity
    pub required_total: u64,
    /// Evidence linked to the trip or one of its activities
    pub provided_total: u64,
}

impl EvidenceCompleteness {
    /// Whether enough evidence has been provided
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.provided_total >= self.required_total
    }
}

/// Read-only report for one trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripReport {
    /// Trip ID
    pub trip_id: String,
    /// Trip name
    pub trip_name: String,
    /// Voyage
    pub voyage_id: Option<String>,
    /// Transformer unit
    pub tr_unit_id: Option<String>,
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
    /// Milestones by planned start
    pub milestones: Vec<Milestone>,
    /// Delay totals
    pub delay: DelaySummary,
    /// Evidence counts
    pub evidence: EvidenceCompleteness,
}

/// Activities belonging to a trip.
///
/// Explicit `activity_ids` win; a trip without them covers every leaf of
/// its voyage.
#[must_use]
pub fn trip_activities<'a>(trip: &Trip, document: &'a ScheduleDocument) -> Vec<&'a ScheduleActivity> {
    if !trip.activity_ids.is_empty() {
        return trip
            .activity_ids
            .iter()
            .filter_map(|id| {
                let found = document.activity(id);
                if found.is_none() {
                    tracing::debug!("Trip {} lists unknown activity {}", trip.trip_id, id);
                }
                found
            })
            .collect();
    }
    match trip.voyage_id.as_deref() {
        Some(voyage) => document
            .leaves()
            .filter(|a| a.voyage_id.as_deref() == Some(voyage))
            .collect(),
        None => Vec::new(),
    }
}

fn milestone(activity: &ScheduleActivity) -> Milestone {
    let actual_ts = activity
        .actual_start
        .clone()
        .filter(|s| !s.trim().is_empty());
    let delay_minutes = match (activity.planned_start_at(), actual_ts.as_deref().and_then(parse_timestamp)) {
        (Some(planned), Some(actual)) => Some((actual - planned).num_minutes()),
        _ => None,
    };
    Milestone {
        activity_id: activity.id().unwrap_or_default().to_string(),
        name: activity.activity_name.clone(),
        planned_ts: activity.planned_start.clone(),
        actual_ts,
        delay_minutes,
    }
}

/// Generate a report stamped now
///
/// # Errors
///
/// Returns [`ReportError::TripNotFound`] for an unknown trip.
pub fn generate_trip_report(
    trip_id: &str,
    closeout: Option<&TripCloseout>,
    document: &ScheduleDocument,
) -> Result<TripReport, ReportError> {
    generate_trip_report_at(trip_id, closeout, document, Utc::now())
}

/// Generate a report with an explicit generation time
///
/// # Errors
///
/// Returns [`ReportError::TripNotFound`] for an unknown trip.
pub fn generate_trip_report_at(
    trip_id: &str,
    closeout: Option<&TripCloseout>,
    document: &ScheduleDocument,
    generated_at: DateTime<Utc>,
) -> Result<TripReport, ReportError> {
    let trip = document
        .trip(trip_id)
        .ok_or_else(|| ReportError::TripNotFound(trip_id.to_string()))?;
    let activities = trip_activities(trip, document);

    let mut milestones: Vec<Milestone> = activities.iter().map(|a| milestone(a)).collect();
    milestones.sort_by(|a, b| a.planned_ts.cmp(&b.planned_ts));

    let details = closeout
        .filter(|c| c.trip_id == trip.trip_id)
        .and_then(|c| c.delay_details.as_ref());
    let delay = if let Some(details) = details {
        DelaySummary {
            total_delay_minutes: details.total_delay_minutes,
            source: DelaySource::Closeout,
            reason_codes: details.reason_codes.clone(),
        }
    } else if let Some(total) = trip.total_delay_minutes {
        DelaySummary {
            total_delay_minutes: total,
            source: DelaySource::Trip,
            reason_codes: Vec::new(),
        }
    } else {
        DelaySummary {
            total_delay_minutes: milestones
                .iter()
                .filter_map(|m| m.delay_minutes)
                .filter(|d| *d > 0)
                .sum(),
            source: DelaySource::Milestones,
            reason_codes: Vec::new(),
        }
    };

    let required_total = activities
        .iter()
        .flat_map(|a| a.evidence_requirements.iter())
        .map(|r| u64::from(r.min_count))
        .sum();
    let member_ids: HashSet<&str> = activities.iter().filter_map(|a| a.id()).collect();
    let provided = document
        .evidence
        .iter()
        .filter(|e| {
            e.trip_id.as_deref() == Some(trip.trip_id.as_str())
                || e.activity_id.as_deref().is_some_and(|id| member_ids.contains(id))
        })
        .count();

    tracing::info!("Trip report {}: {} milestones", trip.trip_id, milestones.len());
    Ok(TripReport {
        trip_id: trip.trip_id.clone(),
        trip_name: trip.name.clone(),
        voyage_id: trip.voyage_id.clone(),
        tr_unit_id: trip.tr_unit_id.clone(),
        generated_at,
        milestones,
        delay,
        evidence: EvidenceCompleteness {
            required_total,
            provided_total: u64::try_from(provided).unwrap_or(u64::MAX),
        },
    })
}

/// Render a report as Markdown
#[must_use]
pub fn trip_report_to_markdown(report: &TripReport) -> String {
    let mut md = format!("# Trip Report: {} ({})\n\n", report.trip_name, report.trip_id);
    md.push_str(&format!(
        "Generated: {}\n\n",
        report.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));

    md.push_str("## Milestones\n\n");
    if report.milestones.is_empty() {
        md.push_str("- (none)\n");
    }
    for m in &report.milestones {
        let actual = m.actual_ts.as_deref().unwrap_or("-");
        let delay = m
            .delay_minutes
            .map_or_else(|| "-".to_string(), |d| format!("{d} min"));
        md.push_str(&format!(
            "- {} | {} {} | actual: {} | delay: {}\n",
            m.planned_ts, m.activity_id, m.name, actual, delay
        ));
    }

    md.push_str("\n## Delay Summary\n\n");
    md.push_str(&format!(
        "- Total delay: {} minutes ({})\n",
        report.delay.total_delay_minutes,
        report.delay.source.label()
    ));
    if !report.delay.reason_codes.is_empty() {
        md.push_str(&format!("- Reason codes: {}\n", report.delay.reason_codes.join(", ")));
    }

    md.push_str("\n## Evidence Completeness\n\n");
    md.push_str(&format!("- Required: {}\n", report.evidence.required_total));
    md.push_str(&format!("- Provided: {}\n", report.evidence.provided_total));
    md.push_str(&format!(
        "- Status: {}\n",
        if report.evidence.is_complete() { "complete" } else { "incomplete" }
    ));
    md
}

/// Render a report as pretty-printed JSON
///
/// # Errors
///
/// Returns [`ReportError::Serialize`] if serialization fails.
pub fn trip_report_to_json(report: &TripReport) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}
