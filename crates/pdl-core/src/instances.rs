//! Registry of running `pdl serve` processes.
//!
//! Each server writes `<dir>/<pid>.yaml` on start and removes it on
//! shutdown. The backend selector counts live records other than its own to
//! detect concurrent instances; records left behind by crashed processes are
//! pruned while counting.

use crate::error::Result;
use crate::io::atomic_write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// InstanceRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub pid: u32,
    pub root: PathBuf,
    #[serde(default)]
    pub port: Option<u16>,
    pub started_at: DateTime<Utc>,
}

fn record_path(dir: &Path, pid: u32) -> PathBuf {
    dir.join(format!("{pid}.yaml"))
}

impl InstanceRecord {
    /// Record for the calling process.
    pub fn current(root: &Path, port: Option<u16>) -> Self {
        Self {
            pid: std::process::id(),
            root: root.to_path_buf(),
            port,
            started_at: Utc::now(),
        }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(&record_path(dir, self.pid), data.as_bytes())
    }

    /// Remove this record file. Silently succeeds if the file is gone.
    pub fn remove(&self, dir: &Path) -> Result<()> {
        let path = record_path(dir, self.pid);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry helpers
// ---------------------------------------------------------------------------

/// Read all records from `dir`. Invalid / non-record files are skipped.
pub fn read_all(dir: &Path) -> Result<Vec<InstanceRecord>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut records = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let data = match std::fs::read_to_string(&path) {
            Ok(d) => d,
            Err(_) => continue,
        };
        if let Ok(record) = serde_yaml::from_str::<InstanceRecord>(&data) {
            records.push(record);
        }
    }
    records.sort_by_key(|r| r.pid);
    Ok(records)
}

/// Number of live instances other than `self_pid`. Dead records are removed.
pub fn count_live_others(dir: &Path, self_pid: u32) -> Result<usize> {
    let mut live = 0;
    for record in read_all(dir)? {
        if record.pid == self_pid {
            continue;
        }
        if is_pid_alive(record.pid) {
            live += 1;
        } else {
            tracing::debug!(pid = record.pid, "pruning stale instance record");
            record.remove(dir)?;
        }
    }
    Ok(live)
}

// ---------------------------------------------------------------------------
// PID helpers (Unix only)
// ---------------------------------------------------------------------------

/// Returns true if the process is still alive (`kill -0 {pid}`).
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
