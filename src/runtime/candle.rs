//! Candle-backed Inference Runtime
//!
//! Exposes candle devices through the InferenceRuntime trait.
//! Supports CUDA (NVIDIA), Metal (Apple), and the CPU device, which is
//! always present. Devices are named `CPU` and `GPU.<n>`.

use std::path::Path;

use candle_core::{Device, Tensor};
use parking_lot::RwLock;

use crate::error::RuntimeError;
use crate::hardware::host;
use crate::runtime::{
    CompiledWorkload, InferenceRuntime, Workload, FULL_DEVICE_NAME, OPTIMIZATION_CAPABILITIES,
};

/// Upper bound on CUDA ordinals tried during discovery
const MAX_CUDA_DEVICES: usize = 16;

/// Backend a logical device maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

/// A discovered candle device
struct DeviceSlot {
    id: String,
    backend: Backend,
    device: Device,
}

/// Inference runtime built on candle
pub struct CandleRuntime {
    slots: RwLock<Option<Vec<DeviceSlot>>>,
}

impl CandleRuntime {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(None),
        }
    }

    /// Discover devices once per runtime instance
    fn discover() -> Vec<DeviceSlot> {
        let mut slots = vec![DeviceSlot {
            id: "CPU".to_string(),
            backend: Backend::Cpu,
            device: Device::Cpu,
        }];
        let mut gpu_index = 0;

        if candle_core::utils::cuda_is_available() {
            for ordinal in 0..MAX_CUDA_DEVICES {
                match Device::new_cuda(ordinal) {
                    Ok(device) => {
                        slots.push(DeviceSlot {
                            id: format!("GPU.{}", gpu_index),
                            backend: Backend::Cuda(ordinal),
                            device,
                        });
                        gpu_index += 1;
                    }
                    Err(e) => {
                        tracing::debug!(ordinal, error = %e, "CUDA discovery stopped");
                        break;
                    }
                }
            }
        }

        if candle_core::utils::metal_is_available() {
            match Device::new_metal(0) {
                Ok(device) => slots.push(DeviceSlot {
                    id: format!("GPU.{}", gpu_index),
                    backend: Backend::Metal(0),
                    device,
                }),
                Err(e) => tracing::debug!(error = %e, "Metal device unavailable"),
            }
        }

        slots
    }

    /// Look up a discovered device, running discovery on first use
    fn slot(&self, device_id: &str) -> Option<(Backend, Device)> {
        if self.slots.read().is_none() {
            let discovered = Self::discover();
            let mut guard = self.slots.write();
            if guard.is_none() {
                *guard = Some(discovered);
            }
        }
        self.slots.read().as_ref().and_then(|slots| {
            slots
                .iter()
                .find(|slot| slot.id == device_id)
                .map(|slot| (slot.backend, slot.device.clone()))
        })
    }

    /// Human readable name of a backend device
    fn device_name(backend: Backend) -> Option<String> {
        match backend {
            Backend::Cpu => host::cpu_model(Path::new("/")),
            Backend::Cuda(ordinal) => host::nvidia_gpu_name(ordinal),
            Backend::Metal(_) => host::apple_chip_name().map(|chip| format!("{} GPU", chip)),
        }
    }

    fn cpu_capabilities() -> Vec<&'static str> {
        let mut caps = vec!["FP32"];
        if candle_core::utils::with_avx() {
            caps.push("AVX");
        }
        if candle_core::utils::with_f16c() {
            caps.push("F16C");
        }
        if candle_core::utils::with_neon() {
            caps.push("NEON");
        }
        if candle_core::utils::with_simd128() {
            caps.push("SIMD128");
        }
        caps
    }
}

impl Default for CandleRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceRuntime for CandleRuntime {
    fn name(&self) -> &str {
        "candle"
    }

    fn list_devices(&self) -> Result<Vec<String>, RuntimeError> {
        // Discovery itself cannot fail: the CPU device is always present
        self.slot("CPU")
            .ok_or_else(|| RuntimeError::unavailable("candle CPU device missing"))?;
        let guard = self.slots.read();
        Ok(guard
            .as_ref()
            .map(|slots| slots.iter().map(|slot| slot.id.clone()).collect())
            .unwrap_or_default())
    }

    fn get_property(&self, device_id: &str, property: &str) -> Result<String, RuntimeError> {
        let (backend, _) = self
            .slot(device_id)
            .ok_or_else(|| RuntimeError::property_unavailable(device_id, property))?;

        match (property, backend) {
            (FULL_DEVICE_NAME, _) => Self::device_name(backend)
                .ok_or_else(|| RuntimeError::property_unavailable(device_id, property)),
            (OPTIMIZATION_CAPABILITIES, Backend::Cpu) => Ok(Self::cpu_capabilities().join(" ")),
            (OPTIMIZATION_CAPABILITIES, Backend::Cuda(_)) => Ok("FP32 FP16 BF16".to_string()),
            (OPTIMIZATION_CAPABILITIES, Backend::Metal(_)) => Ok("FP32 FP16".to_string()),
            _ => Err(RuntimeError::property_unavailable(device_id, property)),
        }
    }

    fn compile(
        &self,
        workload: &Workload,
        device_id: &str,
    ) -> Result<Box<dyn CompiledWorkload>, RuntimeError> {
        let (_, device) = self
            .slot(device_id)
            .ok_or_else(|| RuntimeError::compile(device_id, "device was not enumerated"))?;

        if workload.shape.is_empty() || workload.element_count() == 0 {
            return Err(RuntimeError::compile(
                device_id,
                format!("workload {} has an empty shape", workload.name),
            ));
        }

        Ok(Box::new(CandleWorkload {
            device_id: device_id.to_string(),
            device,
            shape: workload.shape.clone(),
        }))
    }
}

/// Workload bound to a candle device
struct CandleWorkload {
    device_id: String,
    device: Device,
    shape: Vec<usize>,
}

impl CandleWorkload {
    fn run(&self, input: &[f32]) -> candle_core::Result<Vec<f32>> {
        let tensor = Tensor::from_slice(input, self.shape.clone(), &self.device)?;
        tensor.affine(1.0, 0.0)?.flatten_all()?.to_vec1::<f32>()
    }
}

impl CompiledWorkload for CandleWorkload {
    fn infer(&self, input: &[f32]) -> Result<Vec<f32>, RuntimeError> {
        let expected: usize = self.shape.iter().product();
        if input.len() != expected {
            return Err(RuntimeError::execution(
                &self.device_id,
                format!("input has {} elements, expected {}", input.len(), expected),
            ));
        }
        self.run(input)
            .map_err(|e| RuntimeError::execution(&self.device_id, e.to_string()))
    }
}
