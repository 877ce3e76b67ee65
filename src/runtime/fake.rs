//! Scripted runtime for tests.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::RuntimeError;
use crate::runtime::{
    CompiledWorkload, InferenceRuntime, Workload, FULL_DEVICE_NAME, OPTIMIZATION_CAPABILITIES,
};

/// How a scripted device behaves when validated
#[derive(Debug, Clone)]
pub enum Behavior {
    Works,
    FailsCompile(&'static str),
    FailsExecution(&'static str),
    Hangs(Duration),
    /// Property queries stall; the workload itself runs fine
    SlowProperties(Duration),
    TruncatesOutput,
}

#[derive(Debug, Clone)]
struct FakeDevice {
    id: String,
    name: Option<String>,
    capabilities: Option<String>,
    behavior: Behavior,
}

/// Runtime whose devices and failures are fixed up front
#[derive(Default)]
pub struct FakeRuntime {
    devices: Vec<FakeDevice>,
    unavailable: Option<String>,
    list_delay: Option<Duration>,
    compiles: Mutex<HashMap<String, usize>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            unavailable: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Runtime whose device listing stalls for `delay` before answering
    pub fn hanging_list(delay: Duration) -> Self {
        Self {
            list_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn device(mut self, id: &str, behavior: Behavior) -> Self {
        self.devices.push(FakeDevice {
            id: id.to_string(),
            name: None,
            capabilities: None,
            behavior,
        });
        self
    }

    pub fn named(mut self, id: &str, name: &str, capabilities: &str, behavior: Behavior) -> Self {
        self.devices.push(FakeDevice {
            id: id.to_string(),
            name: Some(name.to_string()),
            capabilities: Some(capabilities.to_string()),
            behavior,
        });
        self
    }

    pub fn compile_count(&self, id: &str) -> usize {
        self.compiles.lock().get(id).copied().unwrap_or(0)
    }

    fn find(&self, id: &str) -> Option<&FakeDevice> {
        self.devices.iter().find(|d| d.id == id)
    }
}

struct FakeCompiled {
    device_id: String,
    behavior: Behavior,
}

impl CompiledWorkload for FakeCompiled {
    fn infer(&self, input: &[f32]) -> Result<Vec<f32>, RuntimeError> {
        match &self.behavior {
            Behavior::FailsExecution(msg) => Err(RuntimeError::execution(&self.device_id, *msg)),
            Behavior::Hangs(delay) => {
                std::thread::sleep(*delay);
                Ok(input.to_vec())
            }
            Behavior::TruncatesOutput => Ok(input[..input.len() / 2].to_vec()),
            _ => Ok(input.to_vec()),
        }
    }
}

impl InferenceRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    fn list_devices(&self) -> Result<Vec<String>, RuntimeError> {
        if let Some(delay) = self.list_delay {
            std::thread::sleep(delay);
        }
        if let Some(reason) = &self.unavailable {
            return Err(RuntimeError::unavailable(reason.clone()));
        }
        Ok(self.devices.iter().map(|d| d.id.clone()).collect())
    }

    fn get_property(&self, device_id: &str, property: &str) -> Result<String, RuntimeError> {
        let device = self
            .find(device_id)
            .ok_or_else(|| RuntimeError::property_unavailable(device_id, property))?;
        if let Behavior::SlowProperties(delay) = device.behavior {
            std::thread::sleep(delay);
        }
        let value = match property {
            FULL_DEVICE_NAME => device.name.clone(),
            OPTIMIZATION_CAPABILITIES => device.capabilities.clone(),
            _ => None,
        };
        value.ok_or_else(|| RuntimeError::property_unavailable(device_id, property))
    }

    fn compile(
        &self,
        _workload: &Workload,
        device_id: &str,
    ) -> Result<Box<dyn CompiledWorkload>, RuntimeError> {
        *self.compiles.lock().entry(device_id.to_string()).or_default() += 1;
        let device = self
            .find(device_id)
            .ok_or_else(|| RuntimeError::compile(device_id, "unknown device"))?;
        if let Behavior::FailsCompile(msg) = device.behavior {
            return Err(RuntimeError::compile(device_id, msg));
        }
        Ok(Box::new(FakeCompiled {
            device_id: device_id.to_string(),
            behavior: device.behavior.clone(),
        }))
    }
}
