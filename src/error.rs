// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Typed errors of the schedule core
//!
//! Recoverable validation outcomes (evidence gates, blocked transitions) are
//! plain values elsewhere. The types here cover decoding failures, missing
//! documents and policy violations that must never be silently ignored.

use std::path::PathBuf;
use thiserror::Error;

/// Schema validation failure at the JSON boundary
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not well-formed JSON
    #[error("malformed JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    /// The JSON is well-formed but does not match the expected shape
    #[error("{path}: {message}")]
    Invalid {
        /// Location of the offending value, e.g. `activities[3].planned_start`
        path: String,
        /// What is wrong with it
        message: String,
    },
}

impl DecodeError {
    /// Shape error at `path`
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Location of the error, when known
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Invalid { path, .. } => Some(path),
            Self::Syntax(_) => None,
        }
    }
}

/// Errors reading the source-of-truth schedule document
#[derive(Debug, Error)]
pub enum SsotError {
    /// No candidate path exists
    #[error("SSOT file not found")]
    NotFound {
        /// Candidates that were tried, in order
        searched: Vec<PathBuf>,
    },
    /// The file exists but could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file does not match the schedule schema
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Forbidden operations. These are policy violations, not user-facing
/// validation, and callers must treat them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// Reflow apply attempted while in approval mode
    #[error("reflow cannot be applied in approval mode")]
    ReflowInApprovalMode,
    /// Attempt to rewrite or remove an audit entry
    #[error("history event {event_id} is append-only and cannot be {action}")]
    HistoryImmutable {
        /// Targeted event
        event_id: String,
        /// What was attempted (`modified`, `deleted`)
        action: &'static str,
    },
}

/// Errors producing a trip report
#[derive(Debug, Error)]
pub enum ReportError {
    /// Unknown trip
    #[error("trip not found: {0}")]
    TripNotFound(String),
    /// JSON serialization failed
    #[error("failed to serialize trip report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Unrecognised enumeration value in text input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    /// Build an error for `value` not being a valid `kind`
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
