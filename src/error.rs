//! Probe Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.
//! Only `RuntimeErrorKind::RuntimeUnavailable` ever ends a probe session;
//! every other runtime failure is absorbed by the component that hit it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for probe operations
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Inference runtime errors
    #[error("Runtime Error: {0}")]
    Runtime(#[from] RuntimeError),
    /// Configuration errors
    #[error("Config Error: {0}")]
    Config(String),
    /// File system errors
    #[error("File System Error: {0}")]
    FileSystem(String),
    /// Report serialization errors
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure classes reported by an inference runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeErrorKind {
    /// The runtime itself could not be initialized or queried
    RuntimeUnavailable,
    /// A descriptive device property could not be read
    PropertyUnavailable,
    /// The workload could not be compiled for the device
    CompileError,
    /// The compiled workload failed while running
    ExecutionError,
    /// The validation attempt exceeded its time bound
    Timeout,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuntimeErrorKind::RuntimeUnavailable => "RuntimeUnavailable",
            RuntimeErrorKind::PropertyUnavailable => "PropertyUnavailable",
            RuntimeErrorKind::CompileError => "CompileError",
            RuntimeErrorKind::ExecutionError => "ExecutionError",
            RuntimeErrorKind::Timeout => "Timeout",
        };
        f.write_str(label)
    }
}

/// Error raised by the inference runtime boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Device the failure is attributed to, if any
    pub device: Option<String>,
    pub message: String,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.device {
            Some(device) => write!(f, "[{}] {}: {}", self.kind, device, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeErrorKind::RuntimeUnavailable,
            device: None,
            message: message.into(),
        }
    }

    pub fn property_unavailable(device: impl Into<String>, property: &str) -> Self {
        Self {
            kind: RuntimeErrorKind::PropertyUnavailable,
            device: Some(device.into()),
            message: format!("property {} is not reported", property),
        }
    }

    pub fn compile(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeErrorKind::CompileError,
            device: Some(device.into()),
            message: message.into(),
        }
    }

    pub fn execution(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeErrorKind::ExecutionError,
            device: Some(device.into()),
            message: message.into(),
        }
    }

    pub fn timeout(device: impl Into<String>, limit: Duration) -> Self {
        Self {
            kind: RuntimeErrorKind::Timeout,
            device: Some(device.into()),
            message: format!("no result within {:.1}s", limit.as_secs_f64()),
        }
    }

    /// Whether this error ends the whole probe session
    pub fn is_fatal(&self) -> bool {
        self.kind == RuntimeErrorKind::RuntimeUnavailable
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::FileSystem(err.to_string())
    }
}

/// Result type alias for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_runtime_unavailable_is_fatal() {
        assert!(RuntimeError::unavailable("no driver").is_fatal());
        assert!(!RuntimeError::property_unavailable("GPU.0", "FULL_DEVICE_NAME").is_fatal());
        assert!(!RuntimeError::compile("GPU.0", "bad").is_fatal());
        assert!(!RuntimeError::execution("GPU.0", "bad").is_fatal());
        assert!(!RuntimeError::timeout("GPU.0", Duration::from_secs(1)).is_fatal());
    }

    #[test]
    fn test_display_includes_kind_and_device() {
        let err = RuntimeError::timeout("GPU.0", Duration::from_secs(30));
        assert_eq!(err.to_string(), "[Timeout] GPU.0: no result within 30.0s");

        let err = ProbeError::from(RuntimeError::unavailable("missing driver stack"));
        assert_eq!(
            err.to_string(),
            "Runtime Error: [RuntimeUnavailable] missing driver stack"
        );
    }
}
