// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-root path discipline for the chowkidar pipeline.
//!
//! All persisted files live under one `data/` root, in exactly five
//! permitted subdirectories: `snaps/`, `tts/`, `tmp/`, `logs/`, `members/`.
//! Writes go through an atomic-replace helper (sibling temp file, fsync,
//! rename). Deletions are never performed automatically.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use chowkidar_core::ChowkidarError;

/// The permitted subdirectories under the data root.
pub const PERMITTED_SUBDIRS: [&str; 5] = ["snaps", "tts", "tmp", "logs", "members"];

/// Handle to the data root; the only way the pipeline touches the filesystem.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and every permitted subdirectory, idempotently.
    pub async fn ensure(&self) -> Result<(), ChowkidarError> {
        for sub in PERMITTED_SUBDIRS {
            tokio::fs::create_dir_all(self.root.join(sub))
                .await
                .map_err(map_io)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot destination: `snaps/<session>.jpg`.
    pub fn snapshot_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join("snaps")
            .join(format!("{}.jpg", sanitize_component(session_id)))
    }

    /// Synthesized audio destination: `tts/<session>.wav`.
    pub fn tts_audio_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join("tts")
            .join(format!("{}.wav", sanitize_component(session_id)))
    }

    /// Sanitized text preview destination: `tts/<session>.txt`.
    pub fn tts_preview_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join("tts")
            .join(format!("{}.txt", sanitize_component(session_id)))
    }

    /// In-flight ring audio destination: `tmp/<session>/<stamp>.wav`.
    pub fn tmp_audio_path(&self, session_id: &str, stamp: &str) -> PathBuf {
        self.root
            .join("tmp")
            .join(sanitize_component(session_id))
            .join(format!("{}.wav", sanitize_component(stamp)))
    }

    /// Append-only operational log: `logs/<agent>.log`.
    pub fn log_path(&self, agent: &str) -> PathBuf {
        self.root
            .join("logs")
            .join(format!("{}.log", sanitize_component(agent)))
    }

    /// Member photo destination: `members/<name>_<suffix>.jpg`.
    pub fn member_photo_path(&self, name: &str, suffix: &str) -> PathBuf {
        self.root.join("members").join(format!(
            "{}_{}.jpg",
            sanitize_component(name),
            sanitize_component(suffix)
        ))
    }

    /// Whether a path lies under one of the permitted subdirectories.
    pub fn is_permitted(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        match rel.components().next() {
            Some(std::path::Component::Normal(first)) => PERMITTED_SUBDIRS
                .iter()
                .any(|s| first.to_str() == Some(s)),
            _ => false,
        }
    }

    /// Atomic-replace write: sibling temp file, fsync, rename.
    ///
    /// Refuses destinations outside the permitted subdirectories.
    pub async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), ChowkidarError> {
        if !self.is_permitted(path) {
            return Err(ChowkidarError::Internal(format!(
                "write outside permitted data subdirectories: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(map_io)?;
        }

        let tmp = sibling_temp(path);
        let mut file = tokio::fs::File::create(&tmp).await.map_err(map_io)?;
        file.write_all(bytes).await.map_err(map_io)?;
        file.sync_all().await.map_err(map_io)?;
        drop(file);
        tokio::fs::rename(&tmp, path).await.map_err(map_io)?;
        Ok(())
    }

    /// Append a line to an append-only file under the data root.
    pub async fn append_line(&self, path: &Path, line: &str) -> Result<(), ChowkidarError> {
        if !self.is_permitted(path) {
            return Err(ChowkidarError::Internal(format!(
                "append outside permitted data subdirectories: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(map_io)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(map_io)?;
        file.write_all(line.as_bytes()).await.map_err(map_io)?;
        file.write_all(b"\n").await.map_err(map_io)?;
        Ok(())
    }
}

/// Keep path components to a safe alphabet; everything else becomes `_`.
/// `..` sequences are flattened so a component can never traverse upward.
fn sanitize_component(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.replace("..", "_").trim_matches('.').to_string()
}

fn sibling_temp(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

fn map_io(e: std::io::Error) -> ChowkidarError {
    ChowkidarError::Store {
        source: Box::new(e),
    }
}
