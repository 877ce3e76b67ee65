//! Probe Configuration
//!
//! Explicit settings passed into a probe session. Binaries load them from
//! `$ACCEL_PROBE_CONFIG` or `<config dir>/accel-probe/probe.json`; a missing
//! file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};
use crate::hardware::device::DeviceCategory;
use crate::policy::{Task, TaskKind};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "ACCEL_PROBE_CONFIG";

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Ordered category preferences for each fixed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPreferences {
    pub detection: Vec<DeviceCategory>,
    pub recognition: Vec<DeviceCategory>,
}

impl Default for TaskPreferences {
    fn default() -> Self {
        Self {
            detection: Task::detection().preferences,
            recognition: Task::recognition().preferences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Bound on each validation attempt and runtime query
    pub timeout_seconds: u64,
    pub task_preferences: TaskPreferences,
    /// Forbid two tasks from sharing one device
    pub exclusive_assignment: bool,
    /// Validate devices concurrently instead of one at a time
    pub concurrent_validation: bool,
    /// Bound on each external host tool invocation
    pub tool_timeout_seconds: u64,
    pub output: OutputFormat,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            task_preferences: TaskPreferences::default(),
            exclusive_assignment: false,
            concurrent_validation: false,
            tool_timeout_seconds: 10,
            output: OutputFormat::Text,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }

    /// Tasks in priority order, detection first
    pub fn tasks(&self) -> Vec<Task> {
        vec![
            Task::new(TaskKind::Detection, self.task_preferences.detection.clone()),
            Task::new(
                TaskKind::Recognition,
                self.task_preferences.recognition.clone(),
            ),
        ]
    }

    pub fn validate(&self) -> ProbeResult<()> {
        if self.timeout_seconds == 0 {
            return Err(ProbeError::Config("timeout_seconds must be > 0".into()));
        }
        if self.tool_timeout_seconds == 0 {
            return Err(ProbeError::Config("tool_timeout_seconds must be > 0".into()));
        }
        for task in self.tasks() {
            if task.preferences.is_empty() {
                return Err(ProbeError::Config(format!(
                    "task {} has no preferred device categories",
                    task.kind
                )));
            }
        }
        Ok(())
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("accel-probe").join("probe.json")
    }

    /// Load from `$ACCEL_PROBE_CONFIG` or the default location
    pub fn load() -> ProbeResult<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path);
        Self::load_from(&path)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> ProbeResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ProbeConfig = serde_json::from_str(&content).map_err(|e| {
            ProbeError::Config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::info!(path = %path.display(), "Loaded probe config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.exclusive_assignment);
        let tasks = config.tasks();
        assert_eq!(tasks[0], Task::detection());
        assert_eq!(tasks[1], Task::recognition());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProbeConfig::load_from(&dir.path().join("probe.json")).unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.json");
        fs::write(
            &path,
            r#"{
                "timeout_seconds": 5,
                "exclusive_assignment": true,
                "task_preferences": { "detection": ["GPU", "NPU", "CPU"], "recognition": ["NPU"] },
                "output": "json"
            }"#,
        )
        .unwrap();

        let config = ProbeConfig::load_from(&path).unwrap();
        assert_eq!(config.timeout_seconds, 5);
        assert!(config.exclusive_assignment);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.tool_timeout_seconds, 10);
        assert_eq!(
            config.task_preferences.detection,
            vec![DeviceCategory::Gpu, DeviceCategory::Npu, DeviceCategory::Cpu]
        );
    }

    #[test]
    fn test_single_task_preference_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.json");
        fs::write(
            &path,
            r#"{ "timeout_seconds": 5, "task_preferences": { "detection": ["NPU", "CPU"] } }"#,
        )
        .unwrap();

        let config = ProbeConfig::load_from(&path).unwrap();
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(
            config.task_preferences.detection,
            vec![DeviceCategory::Npu, DeviceCategory::Cpu]
        );
        assert_eq!(
            config.task_preferences.recognition,
            Task::recognition().preferences
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.json");

        fs::write(&path, r#"{ "timeout_seconds": 0 }"#).unwrap();
        assert!(matches!(ProbeConfig::load_from(&path), Err(ProbeError::Config(_))));

        fs::write(
            &path,
            r#"{ "task_preferences": { "detection": [], "recognition": ["NPU"] } }"#,
        )
        .unwrap();
        assert!(matches!(ProbeConfig::load_from(&path), Err(ProbeError::Config(_))));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ProbeConfig::load_from(&path), Err(ProbeError::Config(_))));
    }
}
