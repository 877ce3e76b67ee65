//! Inference Runtime Abstraction
//!
//! Defines the InferenceRuntime trait the probe drives, plus the synthetic
//! workload description that validation compiles on each device.

pub mod candle;

#[cfg(test)]
pub(crate) mod fake;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

pub use self::candle::CandleRuntime;

/// Property holding the human readable device name
pub const FULL_DEVICE_NAME: &str = "FULL_DEVICE_NAME";
/// Property holding space separated optimization hints
pub const OPTIMIZATION_CAPABILITIES: &str = "OPTIMIZATION_CAPABILITIES";

/// A minimal fixed-shape f32 pass-through (y = x) used to prove a device
/// can execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    pub shape: Vec<usize>,
}

impl Workload {
    /// Pass-through over a single 3x224x224 image tensor
    pub fn pass_through() -> Self {
        Self {
            name: "test_model".to_string(),
            shape: vec![1, 3, 224, 224],
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::pass_through()
    }
}

/// A workload compiled for one device
pub trait CompiledWorkload: Send {
    /// Run the workload on a flat input buffer
    fn infer(&self, input: &[f32]) -> Result<Vec<f32>, RuntimeError>;
}

/// The inference runtime query interface - all backends implement this
pub trait InferenceRuntime: Send + Sync {
    /// Runtime name for logging/display
    fn name(&self) -> &str;

    /// Logical device identifiers in runtime order
    fn list_devices(&self) -> Result<Vec<String>, RuntimeError>;

    /// Read a named device property
    fn get_property(&self, device_id: &str, property: &str) -> Result<String, RuntimeError>;

    /// Compile a workload for a device
    fn compile(
        &self,
        workload: &Workload,
        device_id: &str,
    ) -> Result<Box<dyn CompiledWorkload>, RuntimeError>;

    /// Execute a compiled workload
    fn execute(
        &self,
        compiled: &dyn CompiledWorkload,
        input: &[f32],
    ) -> Result<Vec<f32>, RuntimeError> {
        compiled.infer(input)
    }
}
