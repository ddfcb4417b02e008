use crate::config::write_json_atomic;
use crate::model::{Snapshot, SAVE_VERSION};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SaveFile {
    pub(crate) version: u32,
    pub(crate) saved_at: DateTime<Utc>,
    pub(crate) snapshot: Snapshot,
}

impl SaveFile {
    pub(crate) fn new(snapshot: Snapshot) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now(),
            snapshot,
        }
    }
}

/// A resumable save, if one exists. Broken, stale or finished runs yield `None`.
pub(crate) fn load_save(path: &Path) -> Option<SaveFile> {
    let s = fs::read_to_string(path).ok()?;
    let save = match serde_json::from_str::<SaveFile>(&s) {
        Ok(v) => v,
        Err(err) => {
            warn!(path = %path.display(), %err, "unreadable save, starting fresh");
            return None;
        }
    };
    if save.version != SAVE_VERSION {
        warn!(found = save.version, "save version mismatch, starting fresh");
        return None;
    }
    if save.snapshot.endings.any() {
        return None;
    }
    Some(save)
}

pub(crate) fn save_atomic(path: &Path, save: &SaveFile) -> Result<()> {
    write_json_atomic(path, save)
}

pub(crate) fn clear_save(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(())
}
