use serde::Deserialize;

use livesync_core::error::{Result, SyncError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    pub version: u32,

    pub connection: ConnectionSection,

    #[serde(default)]
    pub export: ExportSection,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub view: ViewSection,
}

impl SyncConfig {
    /// Programmatic construction with defaults for everything but the URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            version: 1,
            connection: ConnectionSection {
                url: url.into(),
                ..ConnectionSection::default()
            },
            export: ExportSection::default(),
            monitor: MonitorSection::default(),
            view: ViewSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SyncError::Config("version must be 1".into()));
        }
        self.connection.validate()?;
        self.export.validate()?;
        self.monitor.validate()?;
        self.view.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    pub url: String,

    /// Base reconnect delay; attempt n waits `base * 2^(n-1)`.
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Bound on one in-flight connect attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Bound on the offline send queue; sends beyond it are rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            base_interval_ms: default_base_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ConnectionSection {
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(SyncError::Config("connection.url must not be empty".into()));
        }
        if !(100..=60000).contains(&self.base_interval_ms) {
            return Err(SyncError::Config(
                "connection.base_interval_ms must be between 100 and 60000".into(),
            ));
        }
        if !(1..=100).contains(&self.max_reconnect_attempts) {
            return Err(SyncError::Config(
                "connection.max_reconnect_attempts must be between 1 and 100".into(),
            ));
        }
        if !(5000..=120000).contains(&self.heartbeat_interval_ms) {
            return Err(SyncError::Config(
                "connection.heartbeat_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(1000..=60000).contains(&self.connect_timeout_ms) {
            return Err(SyncError::Config(
                "connection.connect_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        if self.connect_timeout_ms >= self.heartbeat_interval_ms {
            return Err(SyncError::Config(
                "connection.connect_timeout_ms must be less than heartbeat_interval_ms".into(),
            ));
        }
        if !(1..=65536).contains(&self.queue_capacity) {
            return Err(SyncError::Config(
                "connection.queue_capacity must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_base_interval_ms() -> u64 {
    3000
}
fn default_max_reconnect_attempts() -> u32 {
    10
}
fn default_heartbeat_interval_ms() -> u64 {
    30000
}
fn default_connect_timeout_ms() -> u64 {
    10000
}
fn default_queue_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    /// Interval between local progress ticks.
    #[serde(default = "default_export_tick_ms")]
    pub tick_ms: u64,

    /// Progress increment per tick.
    #[serde(default = "default_export_progress_step")]
    pub progress_step: u8,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            tick_ms: default_export_tick_ms(),
            progress_step: default_export_progress_step(),
        }
    }
}

impl ExportSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=5000).contains(&self.tick_ms) {
            return Err(SyncError::Config(
                "export.tick_ms must be between 10 and 5000".into(),
            ));
        }
        if !(1..=100).contains(&self.progress_step) {
            return Err(SyncError::Config(
                "export.progress_step must be between 1 and 100".into(),
            ));
        }
        Ok(())
    }
}

fn default_export_tick_ms() -> u64 {
    120
}
fn default_export_progress_step() -> u8 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl MonitorSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.sample_interval_ms) {
            return Err(SyncError::Config(
                "monitor.sample_interval_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_sample_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewSection {
    /// How long the transient reflow indicator stays up after a device
    /// switch.
    #[serde(default = "default_device_switch_settle_ms")]
    pub device_switch_settle_ms: u64,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            device_switch_settle_ms: default_device_switch_settle_ms(),
        }
    }
}

impl ViewSection {
    pub fn validate(&self) -> Result<()> {
        if self.device_switch_settle_ms > 5000 {
            return Err(SyncError::Config(
                "view.device_switch_settle_ms must be at most 5000".into(),
            ));
        }
        Ok(())
    }
}

fn default_device_switch_settle_ms() -> u64 {
    300
}
