//! Device records produced by a probe session

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeErrorKind};

/// Semantic device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceCategory {
    Cpu,
    Gpu,
    Npu,
    Other,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Cpu => "CPU",
            DeviceCategory::Gpu => "GPU",
            DeviceCategory::Npu => "NPU",
            DeviceCategory::Other => "OTHER",
        }
    }

    /// Anything that offloads work from the host CPU
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, DeviceCategory::Cpu)
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running the synthetic workload on a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Validation {
    /// Not attempted yet
    Pending,
    /// The workload compiled and executed
    Passed { elapsed_ms: f64 },
    /// Compile, execution or timeout failure
    Failed {
        kind: RuntimeErrorKind,
        reason: String,
    },
}

/// A logical compute device seen by the inference runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub category: DeviceCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub capabilities: BTreeSet<String>,
    pub validation: Validation,
    /// Non-fatal notes, e.g. properties the runtime refused to report
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl Device {
    pub fn new(id: impl Into<String>, category: DeviceCategory) -> Self {
        Self {
            id: id.into(),
            category,
            name: None,
            capabilities: BTreeSet::new(),
            validation: Validation::Pending,
            diagnostics: Vec::new(),
        }
    }

    /// True only after a workload actually executed on this device
    pub fn is_validated(&self) -> bool {
        matches!(self.validation, Validation::Passed { .. })
    }

    pub fn mark_validated(&mut self, elapsed: Duration) {
        self.validation = Validation::Passed {
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        };
    }

    pub fn mark_failed(&mut self, err: &RuntimeError) {
        self.validation = Validation::Failed {
            kind: err.kind,
            reason: err.message.clone(),
        };
    }

    /// Name for display, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_is_not_validated() {
        let device = Device::new("GPU.0", DeviceCategory::Gpu);
        assert!(!device.is_validated());
        assert_eq!(device.display_name(), "GPU.0");
    }

    #[test]
    fn test_failure_clears_validation() {
        let mut device = Device::new("GPU.0", DeviceCategory::Gpu);
        device.mark_validated(Duration::from_millis(3));
        assert!(device.is_validated());

        device.mark_failed(&RuntimeError::timeout("GPU.0", Duration::from_secs(1)));
        assert!(!device.is_validated());
        assert!(matches!(
            device.validation,
            Validation::Failed { kind: RuntimeErrorKind::Timeout, .. }
        ));
    }

    #[test]
    fn test_category_serializes_uppercase() {
        let json = serde_json::to_string(&DeviceCategory::Npu).unwrap();
        assert_eq!(json, "\"NPU\"");
        let parsed: DeviceCategory = serde_json::from_str("\"GPU\"").unwrap();
        assert_eq!(parsed, DeviceCategory::Gpu);
    }
}
