// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locates call recordings on disk by switch unique id.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

/// Finds the newest recording whose file name contains a unique id.
#[derive(Debug, Clone)]
pub struct RecordingLocator {
    root: PathBuf,
    /// Lowercase extensions without the leading dot.
    extensions: Vec<String>,
}

impl RecordingLocator {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the storage tree. Returns `None` for a missing root or no match.
    ///
    /// Blocking; use [`locate`](Self::locate) from async code.
    pub fn find(&self, unique_id: &str) -> Option<PathBuf> {
        if unique_id.is_empty() {
            return None;
        }
        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "recording root missing");
            return None;
        }

        let mut best: Option<(SystemTime, PathBuf)> = None;
        for entry in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !self.matches(entry.path(), unique_id) {
                continue;
            }
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if best.as_ref().is_none_or(|(newest, _)| modified > *newest) {
                best = Some((modified, entry.into_path()));
            }
        }
        best.map(|(_, path)| path)
    }

    /// Runs [`find`](Self::find) on the blocking pool.
    pub async fn locate(&self, unique_id: &str) -> Option<PathBuf> {
        let locator = self.clone();
        let id = unique_id.to_string();
        match tokio::task::spawn_blocking(move || locator.find(&id)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, unique_id, "recording search task failed");
                None
            }
        }
    }

    fn matches(&self, path: &Path, unique_id: &str) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)));
        extension_ok && name.contains(unique_id)
    }
}
