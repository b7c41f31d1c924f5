// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Schedule mapper - decodes raw schedule JSON into typed activities
//!
//! Decoding is an explicit validation step: every record is checked on its
//! own so a failure names the offending field (`activities[4].planned_start`).

use crate::error::DecodeError;
use crate::types::{
    parse_timestamp, ActivityConstraint, ActivityStatus, AnchorType, DependencyLink,
    DocumentMeta, EvidenceRequirement, ScheduleActivity, ScheduleDocument,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

static TR_UNIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTR[\s_-]?(\d{1,2})\b").expect("valid TR unit pattern"));

static VOYAGE_WORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:voyage|voy)[\s_-]?(\d{1,3})\b").expect("valid voyage pattern")
});

static VOYAGE_SHORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bV(\d{1,2})\b").expect("valid short voyage pattern"));

const ANCHOR_KEYWORDS: &[(AnchorType, &[&str])] = &[
    (AnchorType::LoadOut, &["load-out", "loadout", "load out"]),
    (AnchorType::LoadIn, &["load-in", "loadin", "load in"]),
    (AnchorType::SailAway, &["sail-away", "sailaway", "sail away", "sailing"]),
    (AnchorType::Berthing, &["berthing", "berth"]),
    (AnchorType::Turning, &["turning"]),
    (AnchorType::JackDown, &["jack-down", "jackdown", "jack down", "jacking down"]),
];

const RESOURCE_KEYWORDS: &[(&str, &[&str])] = &[
    ("SPMT", &["spmt"]),
    ("LCT", &["lct", "barge"]),
    ("CRANE", &["crane"]),
    ("TUG", &["tug"]),
    ("MWS", &["mws", "marine warranty"]),
    ("LINKSPAN", &["linkspan"]),
];

/// Tags derived from an activity's name and work package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityTags {
    /// Transformer unit, normalised to `TR-<n>`
    pub tr_unit_id: Option<String>,
    /// Anchor milestone type
    pub anchor_type: Option<AnchorType>,
    /// Resource tags, explicit ones first
    pub resource_tags: Vec<String>,
    /// Voyage, normalised to `V<n>`
    pub voyage_id: Option<String>,
}

/// Activity record as it appears in the schedule document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActivity {
    /// Activity ID; null or blank for summary rows
    #[serde(default)]
    pub activity_id: Option<String>,
    /// Display name
    #[serde(default)]
    pub activity_name: Option<String>,
    /// Phase
    #[serde(default)]
    pub level1: Option<String>,
    /// Work package
    #[serde(default)]
    pub level2: Option<String>,
    /// Duration in days
    #[serde(default)]
    pub duration: Option<f64>,
    /// Planned start
    #[serde(default)]
    pub planned_start: Option<String>,
    /// Planned finish
    #[serde(default)]
    pub planned_finish: Option<String>,
    /// Recorded start
    #[serde(default)]
    pub actual_start: Option<String>,
    /// Recorded finish
    #[serde(default)]
    pub actual_finish: Option<String>,
    /// Explicit status
    #[serde(default)]
    pub status: Option<String>,
    /// Explicit transformer unit
    #[serde(default)]
    pub tr_unit_id: Option<String>,
    /// Explicit voyage
    #[serde(default)]
    pub voyage_id: Option<String>,
    /// Predecessor links
    #[serde(default)]
    pub depends_on: Vec<DependencyLink>,
    /// Explicit resource tags
    #[serde(default)]
    pub resource_tags: Vec<String>,
    /// Date constraint
    #[serde(default)]
    pub constraint: Option<ActivityConstraint>,
    /// Evidence requirements
    #[serde(default, alias = "evidence_required")]
    pub evidence_requirements: Vec<EvidenceRequirement>,
}

/// Decode a schedule document from JSON text
pub fn decode_document(json: &str) -> Result<ScheduleDocument, DecodeError> {
    let value: Value = serde_json::from_str(json)?;
    decode_value(value)
}

/// Decode a schedule document from an already-parsed JSON value
pub fn decode_value(value: Value) -> Result<ScheduleDocument, DecodeError> {
    let Value::Object(mut root) = value else {
        return Err(DecodeError::invalid("$", "expected a JSON object"));
    };

    let items = match root.remove("activities") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(DecodeError::invalid("activities", "expected an array")),
        None => return Err(DecodeError::invalid("activities", "missing required field")),
    };

    let mut seen_ids = HashSet::new();
    let mut activities = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let path = format!("activities[{index}]");
        let raw: RawActivity = serde_json::from_value(item)
            .map_err(|e| DecodeError::invalid(&path, e.to_string()))?;
        let activity = map_activity(raw, &path)?;
        if let Some(id) = activity.id() {
            if !seen_ids.insert(id.to_string()) {
                return Err(DecodeError::invalid(
                    format!("{path}.activity_id"),
                    format!("duplicate activity id '{id}'"),
                ));
            }
        }
        activities.push(activity);
    }

    let meta = match root.remove("meta") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<DocumentMeta>(value)
                .map_err(|e| DecodeError::invalid("meta", e.to_string()))?,
        ),
    };
    let trips = decode_list(&mut root, "trips")?;
    let evidence = decode_list(&mut root, "evidence")?;

    tracing::debug!(
        "Decoded schedule document: {} activities, {} trips, {} evidence items",
        activities.len(),
        trips.len(),
        evidence.len()
    );

    Ok(ScheduleDocument {
        meta,
        activities,
        trips,
        evidence,
    })
}

fn decode_list<T: DeserializeOwned>(
    root: &mut Map<String, Value>,
    key: &str,
) -> Result<Vec<T>, DecodeError> {
    match root.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .map_err(|e| DecodeError::invalid(format!("{key}[{i}]"), e.to_string()))
            })
            .collect(),
        Some(_) => Err(DecodeError::invalid(key, "expected an array")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, path: &str, field: &str) -> Result<String, DecodeError> {
    non_blank(value).ok_or_else(|| DecodeError::invalid(format!("{path}.{field}"), "missing or empty"))
}

fn timestamp_field(value: String, path: &str, field: &str) -> Result<String, DecodeError> {
    if parse_timestamp(&value).is_none() {
        return Err(DecodeError::invalid(
            format!("{path}.{field}"),
            format!("not a valid timestamp '{value}'"),
        ));
    }
    Ok(value)
}

/// Validate one raw record and turn it into a typed activity
pub fn map_activity(raw: RawActivity, path: &str) -> Result<ScheduleActivity, DecodeError> {
    let activity_id = non_blank(raw.activity_id);
    let activity_name = required(raw.activity_name, path, "activity_name")?;
    let level1 = required(raw.level1, path, "level1")?;
    let level2 = non_blank(raw.level2);

    let planned_start = timestamp_field(required(raw.planned_start, path, "planned_start")?, path, "planned_start")?;
    let planned_finish = timestamp_field(required(raw.planned_finish, path, "planned_finish")?, path, "planned_finish")?;
    let actual_start = non_blank(raw.actual_start)
        .map(|v| timestamp_field(v, path, "actual_start"))
        .transpose()?;
    let actual_finish = non_blank(raw.actual_finish)
        .map(|v| timestamp_field(v, path, "actual_finish"))
        .transpose()?;

    if activity_id.is_none() && !raw.depends_on.is_empty() {
        return Err(DecodeError::invalid(
            format!("{path}.depends_on"),
            "summary rows cannot carry dependency links",
        ));
    }

    let status = match non_blank(raw.status) {
        Some(s) => s
            .parse::<ActivityStatus>()
            .map_err(|e| DecodeError::invalid(format!("{path}.status"), e.to_string()))?,
        None => ActivityStatus::from_actuals(actual_start.as_ref(), actual_finish.as_ref()),
    };

    let duration = match raw.duration {
        Some(d) if d < 0.0 || !d.is_finite() => {
            return Err(DecodeError::invalid(
                format!("{path}.duration"),
                format!("duration must be a non-negative number, got {d}"),
            ))
        }
        Some(d) => d,
        None => window_days(&planned_start, &planned_finish),
    };

    let tags = derive_tags(&activity_name, level2.as_deref(), &raw.resource_tags);

    Ok(ScheduleActivity {
        activity_id,
        activity_name,
        level1,
        level2,
        duration,
        planned_start,
        planned_finish,
        actual_start,
        actual_finish,
        status,
        tr_unit_id: non_blank(raw.tr_unit_id).or(tags.tr_unit_id),
        anchor_type: tags.anchor_type,
        resource_tags: tags.resource_tags,
        voyage_id: non_blank(raw.voyage_id).or(tags.voyage_id),
        constraint: raw.constraint,
        depends_on: raw.depends_on,
        evidence_requirements: raw.evidence_requirements,
    })
}

#[allow(clippy::cast_precision_loss)]
fn window_days(start: &str, finish: &str) -> f64 {
    match (parse_timestamp(start), parse_timestamp(finish)) {
        (Some(s), Some(f)) if f >= s => (f - s).num_minutes() as f64 / (24.0 * 60.0),
        _ => 0.0,
    }
}

/// Derive unit, voyage, anchor and resource tags by pattern matching
#[must_use]
pub fn derive_tags(name: &str, level2: Option<&str>, explicit_resource_tags: &[String]) -> ActivityTags {
    let haystack = match level2 {
        Some(l2) => format!("{name} {l2}"),
        None => name.to_string(),
    };
    let lowered = haystack.to_lowercase();

    let tr_unit_id = TR_UNIT_PATTERN
        .captures(&haystack)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|n| format!("TR-{n}"));

    let voyage_id = VOYAGE_WORD_PATTERN
        .captures(&haystack)
        .or_else(|| VOYAGE_SHORT_PATTERN.captures(&haystack))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|n| format!("V{n}"));

    let anchor_type = ANCHOR_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(anchor, _)| *anchor);

    let mut resource_tags: Vec<String> = Vec::new();
    let explicit = explicit_resource_tags
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty());
    let derived = RESOURCE_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(tag, _)| (*tag).to_string());
    for tag in explicit.chain(derived) {
        if !resource_tags.contains(&tag) {
            resource_tags.push(tag);
        }
    }

    ActivityTags {
        tr_unit_id,
        anchor_type,
        resource_tags,
        voyage_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_derive_tr_unit_variants() {
        for name in ["Load-out TR1", "TR 1 load-out", "TR-01 jack down", "tr_1 turning"] {
            let tags = derive_tags(name, None, &[]);
            assert_eq!(tags.tr_unit_id.as_deref(), Some("TR-1"), "name: {name}");
        }
        assert_eq!(derive_tags("Transformer prep", None, &[]).tr_unit_id, None);
    }

    #[test]
    fn test_derive_voyage_and_anchor() {
        let tags = derive_tags("Voyage 3 sail-away", None, &[]);
        assert_eq!(tags.voyage_id.as_deref(), Some("V3"));
        assert_eq!(tags.anchor_type, Some(AnchorType::SailAway));

        let tags = derive_tags("Berthing at MW4", Some("V2"), &[]);
        assert_eq!(tags.voyage_id.as_deref(), Some("V2"));
        assert_eq!(tags.anchor_type, Some(AnchorType::Berthing));
    }

    #[test]
    fn test_resource_tags_explicit_first_and_deduplicated() {
        let tags = derive_tags("SPMT load-in onto barge", None, &["lct".into(), " ".into()]);
        assert_eq!(tags.resource_tags, vec!["LCT".to_string(), "SPMT".to_string()]);
    }

    #[test]
    fn test_decode_derives_status_from_actuals() {
        let doc = decode_value(json!({
            "activities": [
                {"activity_id": null, "activity_name": "Mobilisation", "level1": "MOB",
                 "planned_start": "2026-01-26", "planned_finish": "2026-02-10"},
                {"activity_id": "A1000", "activity_name": "SPMT mobilisation", "level1": "MOB",
                 "level2": "SPMT", "planned_start": "2026-01-26", "planned_finish": "2026-02-06",
                 "actual_start": "2026-01-27T08:00:00Z", "actual_finish": ""}
            ]
        }))
        .unwrap();

        assert!(doc.activities[0].is_summary());
        let leaf = &doc.activities[1];
        assert_eq!(leaf.status, ActivityStatus::InProgress);
        assert_eq!(leaf.actual_finish, None);
        assert!(leaf.is_frozen());
        assert_eq!(leaf.resource_tags, vec!["SPMT".to_string()]);
        assert!((leaf.duration - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_reports_field_path() {
        let err = decode_value(json!({
            "activities": [
                {"activity_id": "A1", "activity_name": "ok", "level1": "MOB",
                 "planned_start": "2026-01-01", "planned_finish": "2026-01-02"},
                {"activity_id": "A2", "activity_name": "bad", "level1": "MOB",
                 "planned_start": "soon", "planned_finish": "2026-01-02"}
            ]
        }))
        .unwrap_err();

        assert_eq!(err.path(), Some("activities[1].planned_start"));
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let row = json!({"activity_id": "A1", "activity_name": "x", "level1": "MOB",
                         "planned_start": "2026-01-01", "planned_finish": "2026-01-02"});
        let err = decode_value(json!({ "activities": [row.clone(), row] })).unwrap_err();
        assert_eq!(err.path(), Some("activities[1].activity_id"));
    }

    #[test]
    fn test_decode_rejects_links_on_summary_rows() {
        let err = decode_value(json!({
            "activities": [
                {"activity_id": null, "activity_name": "Group", "level1": "MOB",
                 "planned_start": "2026-01-01", "planned_finish": "2026-01-02",
                 "depends_on": [{"predecessorId": "A0", "type": "FS", "lagDays": 0}]}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("activities[0].depends_on"));
    }

    #[test]
    fn test_decode_requires_activities_array() {
        assert!(matches!(
            decode_document("{\"trips\": []}"),
            Err(DecodeError::Invalid { .. })
        ));
        assert!(matches!(decode_document("not json"), Err(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_decode_rejects_negative_lag() {
        let err = decode_value(json!({
            "activities": [
                {"activity_id": "A2", "activity_name": "x", "level1": "MOB",
                 "planned_start": "2026-01-01", "planned_finish": "2026-01-02",
                 "depends_on": [{"predecessorId": "A1", "type": "FS", "lagDays": -2}]}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("activities[0]"));
    }
}
