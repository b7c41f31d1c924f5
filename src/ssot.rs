// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Source-of-truth schedule document and operations documents

use crate::error::{DecodeError, SsotError};
use crate::mapper::decode_document;
use crate::types::ScheduleDocument;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the schedule document is looked for, in order
pub const DEFAULT_SSOT_CANDIDATES: [&str; 3] = [
    "data/option_c.json",
    "option_c.json",
    "public/data/option_c.json",
];

/// First candidate that exists
///
/// # Errors
///
/// Returns [`SsotError::NotFound`] when none does.
pub fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf, SsotError> {
    for candidate in candidates {
        let path = candidate.as_ref();
        if path.is_file() {
            tracing::debug!("SSOT found at {}", path.display());
            return Ok(path.to_path_buf());
        }
        tracing::debug!("SSOT not at {}", path.display());
    }
    Err(SsotError::NotFound {
        searched: candidates.iter().map(|c| c.as_ref().to_path_buf()).collect(),
    })
}

fn read(path: &Path) -> Result<String, SsotError> {
    fs::read_to_string(path).map_err(|source| SsotError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Locate, read and decode the schedule document
///
/// # Errors
///
/// Fails when no candidate exists, the file cannot be read, or it does not
/// decode.
pub fn load_document<P: AsRef<Path>>(candidates: &[P]) -> Result<(PathBuf, ScheduleDocument), SsotError> {
    let path = locate(candidates)?;
    let content = read(&path)?;
    let document = decode_document(&content)?;
    tracing::info!(
        "Loaded {} rows, {} trips from {}",
        document.activities.len(),
        document.trips.len(),
        path.display()
    );
    Ok((path, document))
}

/// Status and body of the read endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body
    pub body: String,
}

impl EndpointResponse {
    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Serve the raw schedule document.
///
/// 200 with the file content, 404 with `{"error":"SSOT file not found"}`
/// when no candidate exists, 500 when the file cannot be read.
#[must_use]
pub fn read_endpoint<P: AsRef<Path>>(candidates: &[P]) -> EndpointResponse {
    let result = locate(candidates).and_then(|path| read(&path));
    match result {
        Ok(body) => EndpointResponse { status: 200, body },
        Err(e @ SsotError::NotFound { .. }) => EndpointResponse::error(404, &e.to_string()),
        Err(e) => {
            tracing::warn!("SSOT read failed: {}", e);
            EndpointResponse::error(500, &e.to_string())
        }
    }
}

// =============================================================================
// Operations Documents
// =============================================================================

/// Go/No-Go call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Proceed
    #[serde(rename = "GO")]
    Go,
    /// Do not proceed
    #[serde(rename = "NO-GO")]
    NoGo,
    /// Wait for a new call
    #[serde(rename = "HOLD")]
    Hold,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Go => "GO",
            Self::NoGo => "NO-GO",
            Self::Hold => "HOLD",
        })
    }
}

/// Current Go/No-Go decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoNoGo {
    /// The call
    pub decision: Decision,
    /// Why
    #[serde(default)]
    pub reason_codes: Vec<String>,
    /// When the call was made
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    /// Date
    pub date: String,
    /// Wind speed in knots
    pub wind_kt: f64,
    /// Significant wave height in metres
    pub wave_m: f64,
    /// Visibility in kilometres
    #[serde(default)]
    pub visibility_km: Option<f64>,
    /// Free-text summary
    #[serde(default)]
    pub summary: Option<String>,
}

/// Weather forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherOutlook {
    /// Forecast issue time
    #[serde(default)]
    pub last_updated: Option<String>,
    /// Days
    #[serde(default)]
    pub forecast: Vec<ForecastDay>,
}

impl WeatherOutlook {
    /// Day with the strongest wind
    #[must_use]
    pub fn windiest(&self) -> Option<&ForecastDay> {
        self.forecast.iter().max_by(|a, b| a.wind_kt.total_cmp(&b.wind_kt))
    }
}

/// A high-water window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TideWindow {
    /// Window opens
    pub start: String,
    /// Window closes
    pub end: String,
    /// Tide height in metres
    pub height_m: f64,
}

/// Best windows for one voyage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoyageTides {
    /// Voyage ID
    pub voyage_id: String,
    /// Up to three best windows
    #[serde(default)]
    pub top3: Vec<TideWindow>,
}

/// Tide windows per voyage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TideWindows {
    /// Voyages
    #[serde(default)]
    pub voyages: Vec<VoyageTides>,
}

impl TideWindows {
    /// Windows of one voyage
    #[must_use]
    pub fn for_voyage(&self, voyage_id: &str) -> Option<&VoyageTides> {
        self.voyages.iter().find(|v| v.voyage_id == voyage_id)
    }
}

/// Operations documents, loaded once
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationsBrief {
    /// Go/No-Go call
    pub go_no_go: Option<GoNoGo>,
    /// Weather
    pub weather: Option<WeatherOutlook>,
    /// Tides
    pub tides: Option<TideWindows>,
}

/// Read an optional JSON document. A missing file is `Ok(None)`.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or decoded.
pub fn load_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SsotError> {
    if !path.is_file() {
        tracing::debug!("No document at {}", path.display());
        return Ok(None);
    }
    let content = read(path)?;
    let value = serde_json::from_str(&content).map_err(DecodeError::from)?;
    Ok(Some(value))
}

/// Load the Go/No-Go, weather and tide documents
///
/// # Errors
///
/// Fails when a document exists but is unreadable or malformed.
pub fn load_brief(go_no_go: &Path, weather: &Path, tides: &Path) -> Result<OperationsBrief, SsotError> {
    Ok(OperationsBrief {
        go_no_go: load_optional(go_no_go)?,
        weather: load_optional(weather)?,
        tides: load_optional(tides)?,
    })
}
