use crate::balance::Balance;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) sim_step_ms: u64,
    pub(crate) enable_color: bool,
    pub(crate) seed: u64,
    pub(crate) autosave_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 30,
            sim_step_ms: 50,
            enable_color: true,
            seed: 0xB0B_DA75_u64,
            autosave_secs: 10,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) save_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) balance_path: PathBuf,
    pub(crate) log_dir: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "bobdays", "Bobdays")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create data dir {}", dir.display()))?;
    Ok(paths_in(&dir))
}

pub(crate) fn paths_in(dir: &Path) -> Paths {
    Paths {
        save_path: dir.join("save.json"),
        settings_path: dir.join("settings.json"),
        balance_path: dir.join("balance.json"),
        log_dir: dir.join("logs"),
    }
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<Settings>(&s) {
            Ok(v) => v,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring malformed settings");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    write_json_atomic(path, s)
}

/// Missing file means the built-in balance. A file that is present must parse and validate.
pub(crate) fn load_balance(path: &Path) -> Result<Balance> {
    if !path.exists() {
        debug!(path = %path.display(), "no balance override, using defaults");
        return Ok(Balance::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading balance {}", path.display()))?;
    let balance: Balance = serde_json::from_str(&raw)
        .with_context(|| format!("parsing balance {}", path.display()))?;
    balance
        .validate()
        .with_context(|| format!("invalid balance {}", path.display()))?;
    Ok(balance)
}

pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // Windows refuses to rename over an existing file.
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}
