// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Append-only history and evidence stores
//!
//! Both stores sit on an [`AppendLog`] that keeps a JSON array under one key
//! of a [`PersistenceBackend`]. Appends are read-modify-write with no
//! locking: the last writer wins. Unreadable data degrades to an empty log.

use crate::error::PolicyViolation;
use crate::types::{EvidenceItem, EvidenceType, HistoryEvent, HistoryEventType};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Storage key of the history log
pub const HISTORY_KEY: &str = "trvoyage.history.v1";

/// Storage key of the evidence log
pub const EVIDENCE_KEY: &str = "trvoyage.evidence.v1";

// =============================================================================
// Backends
// =============================================================================

/// String key-value storage the logs are written to
pub trait PersistenceBackend {
    /// Stored value, or `None` when absent or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process backend for tests and sandboxes
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Backend rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PersistenceBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))
    }
}

// =============================================================================
// Append Log
// =============================================================================

/// Handle returned by [`AppendLog::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Box<dyn Fn(&[T])>;

/// Append-only JSON array stored under one key
pub struct AppendLog<T> {
    key: String,
    backend: Arc<dyn PersistenceBackend>,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_subscription: u64,
}

impl<T> AppendLog<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Log stored under `key`
    pub fn new(key: impl Into<String>, backend: Arc<dyn PersistenceBackend>) -> Self {
        Self {
            key: key.into(),
            backend,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Every stored record, oldest first. Missing or corrupted data reads as
    /// an empty log.
    #[must_use]
    pub fn read_all(&self) -> Vec<T> {
        let Some(raw) = self.backend.get(&self.key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Ignoring corrupted log {}: {}", self.key, e);
                Vec::new()
            }
        }
    }

    /// Append one record and notify listeners with the full log
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be serialized or written.
    pub fn append(&self, record: T) -> Result<()> {
        let mut records = self.read_all();
        records.push(record);
        let json = serde_json::to_string(&records)
            .with_context(|| format!("Failed to serialize {}", self.key))?;
        self.backend.set(&self.key, &json)?;

        for (_, listener) in &self.listeners {
            listener(records.as_slice());
        }
        Ok(())
    }

    /// Register a listener called after every append
    pub fn subscribe(&mut self, listener: impl Fn(&[T]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() < before
    }
}

// =============================================================================
// History
// =============================================================================

/// History event before it is stamped by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEventDraft {
    /// Category
    pub event_type: HistoryEventType,
    /// Entity kind
    pub entity_type: String,
    /// Entity ID
    pub entity_id: String,
    /// Actor; the store default when `None`
    #[serde(default)]
    pub actor: Option<String>,
    /// Free-form details
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl HistoryEventDraft {
    /// Draft with no details
    pub fn new(event_type: HistoryEventType, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            event_type,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            actor: None,
            details: Map::new(),
        }
    }

    /// Add one detail entry
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Append-only audit trail
pub struct HistoryStore {
    log: AppendLog<HistoryEvent>,
    actor: String,
}

impl HistoryStore {
    /// Store writing to `backend`, stamping `actor` when a draft has none
    pub fn new(backend: Arc<dyn PersistenceBackend>, actor: impl Into<String>) -> Self {
        Self {
            log: AppendLog::new(HISTORY_KEY, backend),
            actor: actor.into(),
        }
    }

    /// Record an event now
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be written.
    pub fn append(&self, draft: HistoryEventDraft) -> Result<HistoryEvent> {
        self.append_at(draft, Utc::now())
    }

    /// Record an event at an explicit time
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be written.
    pub fn append_at(&self, draft: HistoryEventDraft, ts: DateTime<Utc>) -> Result<HistoryEvent> {
        let event = HistoryEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            ts,
            event_type: draft.event_type,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            actor: draft.actor.unwrap_or_else(|| self.actor.clone()),
            details: draft.details,
        };
        self.log.append(event.clone())?;
        tracing::debug!("Recorded {} for {} {}", event.event_type, event.entity_type, event.entity_id);
        Ok(event)
    }

    /// Every event, oldest first
    #[must_use]
    pub fn list(&self) -> Vec<HistoryEvent> {
        self.log.read_all()
    }

    /// Events about one entity
    #[must_use]
    pub fn for_entity(&self, entity_id: &str) -> Vec<HistoryEvent> {
        self.list()
            .into_iter()
            .filter(|e| e.entity_id == entity_id)
            .collect()
    }

    /// Events are never rewritten; record a correction instead.
    ///
    /// # Errors
    ///
    /// Always.
    pub fn update(&self, event_id: &str, _replacement: HistoryEventDraft) -> Result<(), PolicyViolation> {
        Err(PolicyViolation::HistoryImmutable {
            event_id: event_id.to_string(),
            action: "modified",
        })
    }

    /// Events are never removed.
    ///
    /// # Errors
    ///
    /// Always.
    pub fn delete(&self, event_id: &str) -> Result<(), PolicyViolation> {
        Err(PolicyViolation::HistoryImmutable {
            event_id: event_id.to_string(),
            action: "deleted",
        })
    }

    /// Listen for appended events
    pub fn subscribe(&mut self, listener: impl Fn(&[HistoryEvent]) + 'static) -> SubscriptionId {
        self.log.subscribe(listener)
    }

    /// Stop listening
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.log.unsubscribe(id)
    }
}

// =============================================================================
// Evidence
// =============================================================================

/// Evidence before it is stamped by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceDraft {
    /// Artifact type
    pub evidence_type: EvidenceType,
    /// Activity it belongs to
    #[serde(default)]
    pub activity_id: Option<String>,
    /// Trip it belongs to
    #[serde(default)]
    pub trip_id: Option<String>,
    /// Where the artifact lives
    pub uri: String,
    /// Free-text note
    #[serde(default)]
    pub note: Option<String>,
    /// Who captured it; the store default when `None`
    #[serde(default)]
    pub captured_by: Option<String>,
}

/// Append-only evidence register
pub struct EvidenceStore {
    log: AppendLog<EvidenceItem>,
    actor: String,
}

impl EvidenceStore {
    /// Store writing to `backend`
    pub fn new(backend: Arc<dyn PersistenceBackend>, actor: impl Into<String>) -> Self {
        Self {
            log: AppendLog::new(EVIDENCE_KEY, backend),
            actor: actor.into(),
        }
    }

    /// Attach evidence now
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be written.
    pub fn append(&self, draft: EvidenceDraft) -> Result<EvidenceItem> {
        let item = EvidenceItem {
            evidence_id: uuid::Uuid::new_v4().to_string(),
            evidence_type: draft.evidence_type,
            activity_id: draft.activity_id,
            trip_id: draft.trip_id,
            uri: draft.uri,
            captured_at: Utc::now(),
            captured_by: draft.captured_by.unwrap_or_else(|| self.actor.clone()),
            note: draft.note,
        };
        self.log.append(item.clone())?;
        Ok(item)
    }

    /// Every item, oldest first
    #[must_use]
    pub fn list(&self) -> Vec<EvidenceItem> {
        self.log.read_all()
    }

    /// Items attached to one activity
    #[must_use]
    pub fn for_activity(&self, activity_id: &str) -> Vec<EvidenceItem> {
        self.list()
            .into_iter()
            .filter(|e| e.activity_id.as_deref() == Some(activity_id))
            .collect()
    }

    /// Listen for attached evidence
    pub fn subscribe(&mut self, listener: impl Fn(&[EvidenceItem]) + 'static) -> SubscriptionId {
        self.log.subscribe(listener)
    }

    /// Stop listening
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.log.unsubscribe(id)
    }
}
