//! Data directory discovery and configuration.
//!
//! A workspace is a `.vendesk/` directory found by walking up from the
//! current directory, holding the SQLite database and an optional
//! `config.toml`.

use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const DATA_DIR: &str = ".vendesk";
pub const DB_FILE: &str = "vendesk.db";
const CONFIG_FILE: &str = "config.toml";

/// Default display timezone offset (UTC+3).
pub const DEFAULT_TZ_OFFSET_HOURS: i32 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fixed UTC offset, in hours, used when rendering timestamps for staff
    /// views and report exports.
    pub display_tz_offset_hours: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display_tz_offset_hours: DEFAULT_TZ_OFFSET_HOURS,
        }
    }
}

impl Config {
    /// Read `config.toml` from the data directory; missing file means
    /// defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_tz_offset_hours * 3600)
            .or_else(|| FixedOffset::east_opt(DEFAULT_TZ_OFFSET_HOURS * 3600))
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Walk up from the current directory looking for a `.vendesk` workspace.
pub fn find_data_dir() -> Result<PathBuf> {
    find_data_dir_from(&env::current_dir()?)
}

fn find_data_dir_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(DATA_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !current.pop() {
            bail!("Not a vendesk workspace (or any parent). Run 'vendesk init' first.");
        }
    }
}
