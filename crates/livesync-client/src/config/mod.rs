//! Client config loader (strict parsing).

pub mod schema;

use std::fs;

use livesync_core::error::{Result, SyncError};

pub use schema::{
    ConnectionSection, ExportSection, MonitorSection, SyncConfig, ViewSection,
};

pub fn load_from_file(path: &str) -> Result<SyncConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SyncError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SyncConfig> {
    let cfg: SyncConfig = serde_yaml::from_str(s)
        .map_err(|e| SyncError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
