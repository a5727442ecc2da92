//! Pending-verification store
//!
//! Keyed map `token address -> producer id -> prediction`, persisted as one
//! JSON document. Owned by the single verifying actor; loaded at startup and
//! saved after every mutation. Saves go through a temp file and a rename so a
//! crash mid-write never leaves a truncated document.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::PredictionRecord;

/// Producer id -> prediction for one token
pub type ProducerPredictions = BTreeMap<String, PredictionRecord>;

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct Document(BTreeMap<String, ProducerPredictions>);

#[derive(Debug)]
pub struct PendingStore {
    path: PathBuf,
    entries: BTreeMap<String, ProducerPredictions>,
}

impl PendingStore {
    /// Empty store bound to `path`; nothing is read
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load from disk. A missing file is an empty store; an unparseable one
    /// is `STORE_CORRUPT`.
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty(path)),
            Err(e) => {
                return Err(AppError::store_io(
                    format!("Failed to read {}", path.display()),
                    e,
                ))
            }
        };

        let Document(entries) = serde_json::from_str::<Document>(&raw).map_err(|e| {
            AppError::with_source(
                ErrorCode::StoreCorrupt,
                format!("Unparseable store {}", path.display()),
                e,
            )
        })?;

        info!(
            path = %path.display(),
            tokens = entries.len(),
            "📂 Loaded pending verifications"
        );
        Ok(Self { path, entries })
    }

    /// Load, moving a corrupt document aside (`.corrupt`) and starting empty
    pub fn load_or_recover(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        match Self::load(&path) {
            Err(err) if err.code == ErrorCode::StoreCorrupt => {
                let aside = path.with_extension("json.corrupt");
                warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %err,
                    "Pending store corrupt, starting empty"
                );
                std::fs::rename(&path, &aside)
                    .map_err(|e| AppError::store_io("Failed to move corrupt store aside", e))?;
                Ok(Self::empty(path))
            }
            other => other,
        }
    }

    /// Write the whole document atomically
    pub fn save(&self) -> AppResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::store_io(format!("Failed to create {}", dir.display()), e)
            })?;
        }

        let body = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .map_err(|e| AppError::store_io(format!("Failed to write {}", tmp.display()), e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::store_io(format!("Failed to replace {}", self.path.display()), e)
        })?;
        Ok(())
    }

    /// Record one producer's prediction; a later one for the same pair wins
    pub fn insert(&mut self, token: &str, producer: &str, record: PredictionRecord) {
        self.entries
            .entry(token.to_string())
            .or_default()
            .insert(producer.to_string(), record);
    }

    /// Drop a token once its outcome is verified
    pub fn remove(&mut self, token: &str) -> Option<ProducerPredictions> {
        self.entries.remove(token)
    }

    pub fn get(&self, token: &str) -> Option<&ProducerPredictions> {
        self.entries.get(token)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
