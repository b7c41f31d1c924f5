// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Evidence gates on activity state transitions
//!
//! Two registered gates exist: the start gate (`READY_TO_IN_PROGRESS`) and
//! the completion gate (`IN_PROGRESS_TO_DONE`). An activity may declare its
//! own requirement for either gate, which replaces the default.
//!
//! The count check ([`check_evidence_gate`]) and the type check
//! ([`validate_evidence_gate`]) are separate; callers that need both call
//! both.

use crate::types::{
    ActivityStatus, EvidenceItem, EvidenceRequirement, EvidenceType, GateTiming, ScheduleActivity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Transition key of the start gate
pub const START_GATE_KEY: &str = "READY_TO_IN_PROGRESS";

/// Transition key of the completion gate
pub const COMPLETION_GATE_KEY: &str = "IN_PROGRESS_TO_DONE";

/// Outcome of the count check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Whether the transition may proceed
    pub allowed: bool,
    /// Why it may not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }
}

/// Outcome of the type check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateValidation {
    /// Gate that applies to the activity's current status
    pub gate: Option<GateTiming>,
    /// Required types with no attached item
    pub missing: Vec<EvidenceType>,
}

impl GateValidation {
    /// Whether every required type is attached
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Key of a transition: `FROM_TO_TO`, uppercased
#[must_use]
pub fn transition_key(from: ActivityStatus, to: ActivityStatus) -> String {
    format!("{}_TO_{}", from.as_str(), to.as_str()).to_uppercase()
}

/// Gate registered for a transition key
#[must_use]
pub fn registered_gate(transition_key: &str) -> Option<GateTiming> {
    match transition_key.to_uppercase().as_str() {
        START_GATE_KEY => Some(GateTiming::BeforeStart),
        COMPLETION_GATE_KEY => Some(GateTiming::Mandatory),
        _ => None,
    }
}

/// Default requirement of a gate
#[must_use]
pub fn default_requirement(gate: GateTiming) -> EvidenceRequirement {
    match gate {
        GateTiming::BeforeStart => EvidenceRequirement {
            types: vec![EvidenceType::Ptw],
            min_count: 1,
            gate,
        },
        GateTiming::Mandatory => EvidenceRequirement {
            types: vec![EvidenceType::Photo, EvidenceType::Signature],
            min_count: 2,
            gate,
        },
    }
}

fn effective_requirement(activity: &ScheduleActivity, gate: GateTiming) -> EvidenceRequirement {
    activity
        .requirement_for(gate)
        .cloned()
        .unwrap_or_else(|| default_requirement(gate))
}

/// Requirement guarding a transition, if one is registered
#[must_use]
pub fn requirement_for_transition(
    transition_key: &str,
    activity: &ScheduleActivity,
) -> Option<EvidenceRequirement> {
    registered_gate(transition_key).map(|gate| effective_requirement(activity, gate))
}

/// Gate that applies in the activity's current status.
///
/// Ready and in-progress activities answer to the start gate, done
/// activities to the completion gate; other statuses have none.
#[must_use]
pub fn gate_for_status(status: ActivityStatus) -> Option<GateTiming> {
    match status {
        ActivityStatus::Ready | ActivityStatus::InProgress => Some(GateTiming::BeforeStart),
        ActivityStatus::Done => Some(GateTiming::Mandatory),
        _ => None,
    }
}

/// Count check for a transition.
///
/// Unregistered transitions are always allowed. Otherwise the transition is
/// blocked while fewer than `min_count` items are attached.
#[must_use]
pub fn check_evidence_gate(
    transition_key: &str,
    activity: &ScheduleActivity,
    evidence: &[EvidenceItem],
) -> GateDecision {
    let Some(requirement) = requirement_for_transition(transition_key, activity) else {
        return GateDecision::allow();
    };

    let attached = u32::try_from(evidence.len()).unwrap_or(u32::MAX);
    let missing_count = requirement.min_count.saturating_sub(attached);
    if missing_count == 0 {
        return GateDecision::allow();
    }

    let accepted: Vec<&str> = requirement.types.iter().map(EvidenceType::as_str).collect();
    let reason = format!(
        "{} requires at least {} evidence item(s) ({}) for {}: {} attached, {} missing",
        transition_key.to_uppercase(),
        requirement.min_count,
        accepted.join(", "),
        activity.id().unwrap_or(&activity.activity_name),
        attached,
        missing_count
    );
    tracing::debug!("Evidence gate blocked: {}", reason);
    GateDecision {
        allowed: false,
        reason: Some(reason),
    }
}

/// Type check against the gate of the activity's current status.
///
/// `missing` is the set of required types with no attached item, in
/// declaration order, independent of `min_count`.
#[must_use]
pub fn validate_evidence_gate(activity: &ScheduleActivity, evidence: &[EvidenceItem]) -> GateValidation {
    let Some(gate) = gate_for_status(activity.status) else {
        return GateValidation {
            gate: None,
            missing: vec![],
        };
    };

    let requirement = effective_requirement(activity, gate);
    let attached: BTreeSet<EvidenceType> = evidence.iter().map(|e| e.evidence_type).collect();
    let mut missing = Vec::new();
    for ty in requirement.types {
        if !attached.contains(&ty) && !missing.contains(&ty) {
            missing.push(ty);
        }
    }

    GateValidation {
        gate: Some(gate),
        missing,
    }
}

/// Evidence attached to one activity
#[must_use]
pub fn evidence_for_activity<'a>(items: &'a [EvidenceItem], activity_id: &str) -> Vec<&'a EvidenceItem> {
    items
        .iter()
        .filter(|e| e.activity_id.as_deref() == Some(activity_id))
        .collect()
}
