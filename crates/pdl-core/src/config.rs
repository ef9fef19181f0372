use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DefaultsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_phase_weeks")]
    pub phase_duration_weeks: u32,
}

fn default_phase_weeks() -> u32 {
    crate::engine::DEFAULT_PHASE_WEEKS
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            phase_duration_weeks: default_phase_weeks(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Location of the shared store; `~/.pdl/shared.redb` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_path: Option<PathBuf>,
    /// The shared store counts as populated once its project data exceeds
    /// this many bytes.
    #[serde(default = "default_min_shared_bytes")]
    pub min_shared_bytes: u64,
}

fn default_min_shared_bytes() -> u64 {
    0
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            shared_path: None,
            min_shared_bytes: default_min_shared_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

fn default_port() -> u16 {
    3142
}

fn default_heartbeat_secs() -> u64 {
    15
}

fn default_heartbeat_timeout_secs() -> u64 {
    45
}

fn default_watch_interval_ms() -> u64 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            heartbeat_secs: default_heartbeat_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            defaults: DefaultsConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Read `.pdl/config.yaml`; a missing file means all defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Configured shared store path, or the per-user default.
    pub fn shared_store_path(&self, root: &Path) -> Result<PathBuf> {
        match &self.storage.shared_path {
            Some(p) if p.is_absolute() => Ok(p.clone()),
            Some(p) => Ok(root.join(p)),
            None => paths::default_shared_store_path(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.defaults.phase_duration_weeks == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "defaults.phase_duration_weeks is 0; new phases will have no duration"
                    .to_string(),
            });
        }

        if self.server.heartbeat_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "server.heartbeat_secs must be greater than 0".to_string(),
            });
        }

        if self.server.heartbeat_timeout_secs <= self.server.heartbeat_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "server.heartbeat_timeout_secs ({}) should exceed server.heartbeat_secs ({})",
                    self.server.heartbeat_timeout_secs, self.server.heartbeat_secs
                ),
            });
        }

        if self.server.watch_interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "server.watch_interval_ms must be greater than 0".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
