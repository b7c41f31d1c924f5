// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! trvoyage library - heavy-transport voyage schedule engine
//!
//! This crate provides the schedule core behind the transformer voyage
//! dashboard: decoding the single source-of-truth schedule document,
//! inferring finish-to-start dependencies, detecting conflicts, gating state
//! transitions on evidence, enforcing view-mode permissions, previewing
//! reflows and generating trip reports.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod conflicts;
pub mod dependencies;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod mapper;
pub mod modes;
pub mod reflow;
pub mod report;
pub mod ssot;
pub mod store;
pub mod transition;

/// Core data types of the schedule document and its audit trail
pub mod types {
    use crate::error::ParseEnumError;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;

    /// Parse a schedule timestamp.
    ///
    /// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) and bare
    /// dates (midnight UTC). Blank input yields `None`.
    #[must_use]
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    fn is_blank(value: Option<&String>) -> bool {
        value.map_or(true, |v| v.trim().is_empty())
    }

    // =========================================================================
    // Activity Status
    // =========================================================================

    /// Execution status of a schedule activity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ActivityStatus {
        /// Scheduled, preconditions not yet confirmed
        Planned,
        /// Preconditions confirmed, may start
        Ready,
        /// Started
        InProgress,
        /// Started and temporarily halted
        Paused,
        /// Cannot proceed until an external issue is cleared
        Blocked,
        /// Finished
        Done,
        /// Will not be executed
        Cancelled,
    }

    impl ActivityStatus {
        /// Every status, in lifecycle order
        pub const ALL: [Self; 7] = [
            Self::Planned,
            Self::Ready,
            Self::InProgress,
            Self::Paused,
            Self::Blocked,
            Self::Done,
            Self::Cancelled,
        ];

        /// Wire name of the status
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Planned => "planned",
                Self::Ready => "ready",
                Self::InProgress => "in_progress",
                Self::Paused => "paused",
                Self::Blocked => "blocked",
                Self::Done => "done",
                Self::Cancelled => "cancelled",
            }
        }

        /// Statuses reachable in one step from this one
        #[must_use]
        pub fn allowed_transitions(&self) -> &'static [Self] {
            match self {
                Self::Planned => &[Self::Ready, Self::Cancelled],
                Self::Ready => &[Self::InProgress, Self::Planned, Self::Blocked],
                Self::InProgress => &[Self::Paused, Self::Done, Self::Blocked],
                Self::Paused => &[Self::InProgress],
                Self::Blocked => &[Self::Ready],
                Self::Done | Self::Cancelled => &[],
            }
        }

        /// Whether `next` is reachable in one step
        #[must_use]
        pub fn can_transition_to(&self, next: Self) -> bool {
            self.allowed_transitions().contains(&next)
        }

        /// Terminal statuses accept no further transitions
        #[must_use]
        pub fn is_terminal(&self) -> bool {
            self.allowed_transitions().is_empty()
        }

        /// Status implied by recorded actuals when the document carries none
        #[must_use]
        pub fn from_actuals(actual_start: Option<&String>, actual_finish: Option<&String>) -> Self {
            if !is_blank(actual_finish) {
                Self::Done
            } else if !is_blank(actual_start) {
                Self::InProgress
            } else {
                Self::Planned
            }
        }
    }

    impl fmt::Display for ActivityStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for ActivityStatus {
        type Err = ParseEnumError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_lowercase().replace('-', "_").as_str() {
                "planned" | "not_started" => Ok(Self::Planned),
                "ready" => Ok(Self::Ready),
                "in_progress" | "started" => Ok(Self::InProgress),
                "paused" | "on_hold" => Ok(Self::Paused),
                "blocked" => Ok(Self::Blocked),
                "done" | "completed" | "complete" => Ok(Self::Done),
                "cancelled" | "canceled" => Ok(Self::Cancelled),
                _ => Err(ParseEnumError::new("activity status", s)),
            }
        }
    }

    // =========================================================================
    // Dependencies and Constraints
    // =========================================================================

    /// Precedence relation kind. Only finish-to-start is modelled.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum RelationKind {
        /// Successor may start once the predecessor has finished
        #[default]
        #[serde(rename = "FS")]
        FinishToStart,
    }

    impl fmt::Display for RelationKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("FS")
        }
    }

    /// Predecessor link stored on the successor activity
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DependencyLink {
        /// Predecessor activity ID
        #[serde(rename = "predecessorId")]
        pub predecessor_id: String,
        /// Relation kind
        #[serde(rename = "type", default)]
        pub relation: RelationKind,
        /// Lag in whole days after the predecessor finishes
        #[serde(rename = "lagDays", default)]
        pub lag_days: u32,
    }

    impl DependencyLink {
        /// Finish-to-start link with zero lag
        #[must_use]
        pub fn finish_to_start(predecessor_id: impl Into<String>) -> Self {
            Self {
                predecessor_id: predecessor_id.into(),
                relation: RelationKind::FinishToStart,
                lag_days: 0,
            }
        }
    }

    /// Directed edge `predecessor -> successor`, derived from activity links
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ScheduleDependency {
        /// Predecessor activity ID
        pub predecessor_id: String,
        /// Successor activity ID
        pub successor_id: String,
        /// Relation kind
        pub relation: RelationKind,
        /// Lag in whole days
        pub lag_days: u32,
    }

    /// Date constraint kinds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum ConstraintKind {
        /// Start no earlier than
        #[serde(rename = "SNET")]
        StartNoEarlierThan,
        /// Finish no later than
        #[serde(rename = "FNLT")]
        FinishNoLaterThan,
        /// Must start on
        #[serde(rename = "MSO")]
        MustStartOn,
    }

    impl ConstraintKind {
        /// Short code used in the schedule document
        #[must_use]
        pub fn code(&self) -> &'static str {
            match self {
                Self::StartNoEarlierThan => "SNET",
                Self::FinishNoLaterThan => "FNLT",
                Self::MustStartOn => "MSO",
            }
        }
    }

    /// Date constraint on an activity
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ActivityConstraint {
        /// Constraint kind
        #[serde(rename = "type")]
        pub kind: ConstraintKind,
        /// Constraint date (ISO-8601)
        pub date: String,
    }

    // =========================================================================
    // Evidence
    // =========================================================================

    /// Evidence artifact types
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EvidenceType {
        /// Photograph
        Photo,
        /// Video recording
        Video,
        /// Document (procedure, drawing, method statement)
        Document,
        /// Sign-off signature
        Signature,
        /// Sensor or instrument log
        SensorLog,
        /// Permit to work
        Ptw,
        /// Certificate (lifting, class, warranty survey)
        Certificate,
    }

    impl EvidenceType {
        /// Every evidence type
        pub const ALL: [Self; 7] = [
            Self::Photo,
            Self::Video,
            Self::Document,
            Self::Signature,
            Self::SensorLog,
            Self::Ptw,
            Self::Certificate,
        ];

        /// Wire name
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Photo => "photo",
                Self::Video => "video",
                Self::Document => "document",
                Self::Signature => "signature",
                Self::SensorLog => "sensor_log",
                Self::Ptw => "ptw",
                Self::Certificate => "certificate",
            }
        }
    }

    impl fmt::Display for EvidenceType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for EvidenceType {
        type Err = ParseEnumError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let wanted = s.trim().to_lowercase().replace('-', "_");
            Self::ALL
                .into_iter()
                .find(|t| t.as_str() == wanted)
                .ok_or_else(|| ParseEnumError::new("evidence type", s))
        }
    }

    /// When an evidence requirement is enforced
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum GateTiming {
        /// Must be attached before the activity starts
        BeforeStart,
        /// Must be attached before the activity is closed
        Mandatory,
    }

    /// Evidence an activity needs before a gated transition
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EvidenceRequirement {
        /// Accepted evidence types
        pub types: Vec<EvidenceType>,
        /// Minimum number of attached items
        pub min_count: u32,
        /// Gate timing
        pub gate: GateTiming,
    }

    /// An attached evidence artifact
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EvidenceItem {
        /// Unique identifier
        pub evidence_id: String,
        /// Artifact type
        pub evidence_type: EvidenceType,
        /// Activity this evidence belongs to
        #[serde(default)]
        pub activity_id: Option<String>,
        /// Trip this evidence belongs to
        #[serde(default)]
        pub trip_id: Option<String>,
        /// Where the artifact lives
        pub uri: String,
        /// Capture time
        pub captured_at: DateTime<Utc>,
        /// Who captured it
        pub captured_by: String,
        /// Free-text note
        #[serde(default)]
        pub note: Option<String>,
    }

    // =========================================================================
    // Schedule Activity
    // =========================================================================

    /// Anchor milestones recognised in activity names
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AnchorType {
        /// Unit rolled from quay onto the vessel
        LoadOut,
        /// Vessel departs
        SailAway,
        /// Vessel alongside at the receiving berth
        Berthing,
        /// Unit rolled from the vessel onto the quay
        LoadIn,
        /// Unit turned on the SPMT
        Turning,
        /// Unit jacked down onto its foundation
        JackDown,
    }

    /// A row of the schedule: a leaf activity or a summary header
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ScheduleActivity {
        /// Activity ID; `None` for summary/group header rows
        pub activity_id: Option<String>,
        /// Display name
        pub activity_name: String,
        /// First hierarchy level (phase)
        pub level1: String,
        /// Second hierarchy level (work package)
        #[serde(default)]
        pub level2: Option<String>,
        /// Planned duration in days
        #[serde(default)]
        pub duration: f64,
        /// Planned start (ISO-8601)
        pub planned_start: String,
        /// Planned finish (ISO-8601)
        pub planned_finish: String,
        /// Recorded start
        #[serde(default)]
        pub actual_start: Option<String>,
        /// Recorded finish
        #[serde(default)]
        pub actual_finish: Option<String>,
        /// Execution status
        pub status: ActivityStatus,
        /// Transformer unit (e.g. `TR-1`)
        #[serde(default)]
        pub tr_unit_id: Option<String>,
        /// Anchor milestone type
        #[serde(default)]
        pub anchor_type: Option<AnchorType>,
        /// Resources the activity occupies
        #[serde(default)]
        pub resource_tags: Vec<String>,
        /// Voyage (e.g. `V1`)
        #[serde(default)]
        pub voyage_id: Option<String>,
        /// Date constraint
        #[serde(default)]
        pub constraint: Option<ActivityConstraint>,
        /// Predecessor links
        #[serde(default)]
        pub depends_on: Vec<DependencyLink>,
        /// Evidence requirements
        #[serde(default, alias = "evidence_required")]
        pub evidence_requirements: Vec<EvidenceRequirement>,
    }

    impl ScheduleActivity {
        /// Activity ID, if this is a leaf row
        #[must_use]
        pub fn id(&self) -> Option<&str> {
            self.activity_id.as_deref()
        }

        /// Whether this is a summary/group header row
        #[must_use]
        pub fn is_summary(&self) -> bool {
            self.activity_id.is_none()
        }

        /// Frozen activities have a recorded actual start or finish
        #[must_use]
        pub fn is_frozen(&self) -> bool {
            !is_blank(self.actual_start.as_ref()) || !is_blank(self.actual_finish.as_ref())
        }

        /// Parsed planned start
        #[must_use]
        pub fn planned_start_at(&self) -> Option<DateTime<Utc>> {
            parse_timestamp(&self.planned_start)
        }

        /// Parsed planned finish
        #[must_use]
        pub fn planned_finish_at(&self) -> Option<DateTime<Utc>> {
            parse_timestamp(&self.planned_finish)
        }

        /// Whether a link to `predecessor_id` already exists
        #[must_use]
        pub fn has_link_to(&self, predecessor_id: &str) -> bool {
            self.depends_on.iter().any(|l| l.predecessor_id == predecessor_id)
        }

        /// Activity-level requirement for a gate, if declared
        #[must_use]
        pub fn requirement_for(&self, gate: GateTiming) -> Option<&EvidenceRequirement> {
            self.evidence_requirements.iter().find(|r| r.gate == gate)
        }

        /// Grouping key used for dependency inference
        #[must_use]
        pub fn group_key(&self) -> (&str, &str) {
            (self.level1.as_str(), self.level2.as_deref().unwrap_or("ROOT"))
        }
    }

    // =========================================================================
    // Conflicts
    // =========================================================================

    /// Conflict categories
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ConflictKind {
        /// Planned finish precedes planned start
        InvalidWindow,
        /// Link to an activity that does not exist
        MissingPredecessor,
        /// Successor planned before its predecessor finishes
        DependencyViolation,
        /// Two activities occupy the same resource at once
        ResourceOverlap,
        /// SNET/FNLT/MSO constraint not honoured
        ConstraintViolation,
        /// Dependency links form a cycle
        DependencyCycle,
    }

    /// Conflict severity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Severity {
        /// Informational
        Info,
        /// Needs attention
        Warning,
        /// Blocks reflow apply
        Error,
    }

    impl fmt::Display for Severity {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Info => f.write_str("info"),
                Self::Warning => f.write_str("warning"),
                Self::Error => f.write_str("error"),
            }
        }
    }

    impl FromStr for Severity {
        type Err = ParseEnumError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_lowercase().as_str() {
                "info" => Ok(Self::Info),
                "warning" | "warn" => Ok(Self::Warning),
                "error" => Ok(Self::Error),
                _ => Err(ParseEnumError::new("severity", s)),
            }
        }
    }

    /// A flagged resource or timing conflict
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ScheduleConflict {
        /// Category
        pub kind: ConflictKind,
        /// Severity
        pub severity: Severity,
        /// Primary activity
        pub activity_id: String,
        /// Other activities involved
        #[serde(default)]
        pub related_ids: Vec<String>,
        /// Human-readable description
        pub message: String,
    }

    // =========================================================================
    // Trips
    // =========================================================================

    /// A voyage of one transformer unit
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Trip {
        /// Unique identifier
        pub trip_id: String,
        /// Display name
        pub name: String,
        /// Voyage ID
        #[serde(default)]
        pub voyage_id: Option<String>,
        /// Transformer unit
        #[serde(default)]
        pub tr_unit_id: Option<String>,
        /// Member activities; empty means "every activity of the voyage"
        #[serde(default)]
        pub activity_ids: Vec<String>,
        /// Precomputed delay
        #[serde(default)]
        pub total_delay_minutes: Option<i64>,
    }

    /// Delay accounting recorded at closeout
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DelayDetails {
        /// Total delay in minutes
        pub total_delay_minutes: i64,
        /// Reason codes
        #[serde(default)]
        pub reason_codes: Vec<String>,
    }

    /// Closeout record of a trip
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TripCloseout {
        /// Trip ID
        pub trip_id: String,
        /// When the trip was closed
        #[serde(default)]
        pub closed_at: Option<String>,
        /// Delay accounting
        #[serde(default)]
        pub delay_details: Option<DelayDetails>,
        /// Notes
        #[serde(default)]
        pub notes: Option<String>,
    }

    // =========================================================================
    // Schedule Document (SSOT)
    // =========================================================================

    /// Document metadata
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DocumentMeta {
        /// Project name
        #[serde(default)]
        pub project: Option<String>,
        /// When the document was produced
        #[serde(default)]
        pub generated_at: Option<String>,
    }

    /// The single source-of-truth schedule document
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ScheduleDocument {
        /// Metadata
        #[serde(default)]
        pub meta: Option<DocumentMeta>,
        /// All schedule rows
        pub activities: Vec<ScheduleActivity>,
        /// All trips
        #[serde(default)]
        pub trips: Vec<Trip>,
        /// Evidence recorded in the document
        #[serde(default)]
        pub evidence: Vec<EvidenceItem>,
    }

    impl ScheduleDocument {
        /// Find a leaf activity by ID
        #[must_use]
        pub fn activity(&self, id: &str) -> Option<&ScheduleActivity> {
            self.activities.iter().find(|a| a.id() == Some(id))
        }

        /// Find a trip by ID
        #[must_use]
        pub fn trip(&self, id: &str) -> Option<&Trip> {
            self.trips.iter().find(|t| t.trip_id == id)
        }

        /// Leaf activities only
        pub fn leaves(&self) -> impl Iterator<Item = &ScheduleActivity> {
            self.activities.iter().filter(|a| !a.is_summary())
        }
    }

    // =========================================================================
    // Audit Records
    // =========================================================================

    /// History event categories
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum HistoryEventType {
        /// Activity changed status
        StateTransition,
        /// Evidence attached
        EvidenceAttached,
        /// Reflow applied
        ReflowApplied,
        /// Report exported
        ReportExported,
        /// Free-form note or correction
        Note,
    }

    impl fmt::Display for HistoryEventType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                Self::StateTransition => "state_transition",
                Self::EvidenceAttached => "evidence_attached",
                Self::ReflowApplied => "reflow_applied",
                Self::ReportExported => "report_exported",
                Self::Note => "note",
            };
            f.write_str(name)
        }
    }

    /// Append-only audit entry
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct HistoryEvent {
        /// Unique identifier
        pub event_id: String,
        /// When the event was recorded
        pub ts: DateTime<Utc>,
        /// Category
        pub event_type: HistoryEventType,
        /// Entity kind (activity, trip, schedule, evidence)
        pub entity_type: String,
        /// Entity ID
        pub entity_id: String,
        /// Who caused the event
        pub actor: String,
        /// Free-form details
        #[serde(default)]
        pub details: serde_json::Map<String, serde_json::Value>,
    }

    /// Audit record of an applied reflow
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReflowRun {
        /// Unique identifier
        pub run_id: String,
        /// When the reflow was applied
        pub applied_at: DateTime<Utc>,
        /// Why the reflow was triggered
        pub trigger_reason: String,
        /// Number of changes in the preview
        pub previewed_changes: usize,
        /// Number of changes applied
        pub applied_changes: usize,
        /// Human-readable impact summary
        pub impact_summary: String,
        /// Digest of the preview this run was created from
        pub preview_digest: String,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{DecodeError, PolicyViolation, ReportError, SsotError};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
