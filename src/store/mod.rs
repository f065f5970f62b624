//! Session checkpoint store
//!
//! One JSON file per audit session, keyed by session id. Writes go through
//! an exclusive lock plus a temp-file-and-rename sequence so a reader never
//! observes a partial file: a crash between write and rename leaves the
//! prior checkpoint (or no file, on first write) intact. The worker pool
//! calls [`SessionStore::save`] after every completed or failed page; an
//! external process can load the last-written file to know exactly which
//! pages were already processed even if the run was killed mid-audit.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use fs2::FileExt;

use crate::domain::AuditSession;

/// Errors raised by the checkpoint store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize session {session_id}: {source}")]
    Serialize {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse session file {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable store of audit sessions, one file per session id
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Per-user default location (~/.siteaudit/sessions)
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".siteaudit")
            .join("sessions")
    }

    /// Final path of a session's checkpoint file
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Atomically persist a session snapshot.
    ///
    /// Write order: exclusive lock on a sibling lock file (guards against a
    /// second process writing the same session), full serialization to a
    /// temp path, fsync, rename over the final path.
    pub fn save(&self, session: &AuditSession) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let content =
            serde_json::to_string_pretty(session).map_err(|source| StoreError::Serialize {
                session_id: session.session_id.clone(),
                source,
            })?;

        let path = self.session_path(&session.session_id);
        let lock_path = path.with_extension("json.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|source| StoreError::Io {
                path: lock_path.clone(),
                source,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|source| StoreError::Io {
                path: lock_path.clone(),
                source,
            })?;

        let temp_path = path.with_extension("json.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;
        temp_file.sync_all().map_err(|source| StoreError::Io {
            path: temp_path.clone(),
            source,
        })?;

        std::fs::rename(&temp_path, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            session = %session.session_id,
            completed = session.completed_count(),
            total = session.total_pages,
            "checkpoint written"
        );
        // Lock released when lock_file drops
        Ok(())
    }

    /// Load a session checkpoint; Ok(None) when none was ever written
    pub fn load(&self, session_id: &str) -> Result<Option<AuditSession>, StoreError> {
        let path = self.session_path(session_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let session =
            serde_json::from_str(&content).map_err(|source| StoreError::Deserialize {
                path,
                source,
            })?;
        Ok(Some(session))
    }

    /// Session ids with a checkpoint on disk, sorted
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Remove a session checkpoint and its write artifacts
    pub fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let path = self.session_path(session_id);
        for path in [
            path.with_extension("json.tmp"),
            path.with_extension("json.lock"),
            path,
        ] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        Ok(())
    }
}
