// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! View modes and the actions each one permits

use crate::error::{ParseEnumError, PolicyViolation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the schedule is being viewed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Working on the current schedule
    #[default]
    Live,
    /// Looking back at past state
    History,
    /// Reviewing a proposed change for sign-off
    Approval,
    /// Side-by-side comparison of two states
    Compare,
}

impl ViewMode {
    /// Every mode
    pub const ALL: [Self; 4] = [Self::Live, Self::History, Self::Approval, Self::Compare];

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::History => "history",
            Self::Approval => "approval",
            Self::Compare => "compare",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ParseEnumError::new("view mode", s))
    }
}

/// Actions gated by view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Change an activity's status
    ModifyState,
    /// Apply a reflow run
    ApplyReflow,
    /// Attach evidence to an activity or trip
    AttachEvidence,
    /// Export reports
    Export,
}

impl Action {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModifyState => "modify_state",
            Self::ApplyReflow => "apply_reflow",
            Self::AttachEvidence => "attach_evidence",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a mode allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ModeCapabilities {
    /// May change activity status
    pub can_modify_state: bool,
    /// May apply reflow runs
    pub can_apply_reflow: bool,
    /// May attach evidence
    pub can_attach_evidence: bool,
    /// May export reports
    pub can_export: bool,
}

/// Permission row for a mode
#[must_use]
pub fn capabilities(mode: ViewMode) -> ModeCapabilities {
    let live = mode == ViewMode::Live;
    ModeCapabilities {
        can_modify_state: live,
        can_apply_reflow: live,
        can_attach_evidence: live,
        can_export: true,
    }
}

/// Whether `action` is allowed in `mode`
#[must_use]
pub fn is_action_permitted(mode: ViewMode, action: Action) -> bool {
    let caps = capabilities(mode);
    match action {
        Action::ModifyState => caps.can_modify_state,
        Action::ApplyReflow => caps.can_apply_reflow,
        Action::AttachEvidence => caps.can_attach_evidence,
        Action::Export => caps.can_export,
    }
}

/// Reflow permission with the approval-mode hard stop.
///
/// # Errors
///
/// Always fails in approval mode, whatever the permission table says.
pub fn can_apply_reflow_in_mode(mode: ViewMode) -> Result<bool, PolicyViolation> {
    if mode == ViewMode::Approval {
        tracing::warn!("Reflow apply attempted in approval mode");
        return Err(PolicyViolation::ReflowInApprovalMode);
    }
    Ok(capabilities(mode).can_apply_reflow)
}
