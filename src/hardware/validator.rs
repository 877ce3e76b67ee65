//! Capability Validation
//!
//! A device counts as usable only after the synthetic workload compiled and
//! executed on it. Every failure (compile, execution, timeout) is recorded
//! on the device and never escalated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rand::Rng;

use crate::error::RuntimeError;
use crate::hardware::bounded::{run_bounded, Bounded};
use crate::hardware::device::Device;
use crate::runtime::{InferenceRuntime, Workload};

/// Runs the synthetic workload on devices under a per-attempt time bound
pub struct Validator {
    runtime: Arc<dyn InferenceRuntime>,
    workload: Workload,
    timeout: Duration,
}

impl Validator {
    pub fn new(runtime: Arc<dyn InferenceRuntime>, timeout: Duration) -> Self {
        Self {
            runtime,
            workload: Workload::pass_through(),
            timeout,
        }
    }

    /// Validate one device, updating its validation state in place
    pub async fn validate(&self, device: &mut Device) {
        let outcome = self.attempt(device.id.clone()).await;
        apply(device, outcome);
    }

    /// Validate every device. Concurrent attempts each own their workload;
    /// outcomes are applied in enumeration order either way.
    pub async fn validate_all(&self, devices: &mut [Device], concurrent: bool) {
        if concurrent {
            let attempts = devices.iter().map(|d| self.attempt(d.id.clone()));
            let outcomes = join_all(attempts).await;
            for (device, outcome) in devices.iter_mut().zip(outcomes) {
                apply(device, outcome);
            }
        } else {
            for device in devices.iter_mut() {
                self.validate(device).await;
            }
        }
    }

    async fn attempt(&self, device_id: String) -> Result<Duration, RuntimeError> {
        tracing::debug!(device = %device_id, workload = %self.workload.name, "Validating device");
        let runtime = Arc::clone(&self.runtime);
        let workload = self.workload.clone();
        let id = device_id.clone();
        // Input generation stays outside the time bound
        let input = random_input(workload.element_count());

        match run_bounded(self.timeout, move || {
            run_workload(runtime.as_ref(), &workload, &id, &input)
        })
        .await
        {
            Bounded::Done(result) => result,
            Bounded::TimedOut => Err(RuntimeError::timeout(device_id, self.timeout)),
            Bounded::Aborted(reason) => Err(RuntimeError::execution(device_id, reason)),
        }
    }
}

fn apply(device: &mut Device, outcome: Result<Duration, RuntimeError>) {
    match outcome {
        Ok(elapsed) => {
            tracing::info!(
                device = %device.id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Validation succeeded"
            );
            device.mark_validated(elapsed);
        }
        Err(e) => {
            tracing::warn!(device = %device.id, error = %e, "Validation failed");
            device.mark_failed(&e);
        }
    }
}

fn random_input(len: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Compile and execute the workload once, timing both steps
fn run_workload(
    runtime: &dyn InferenceRuntime,
    workload: &Workload,
    device_id: &str,
    input: &[f32],
) -> Result<Duration, RuntimeError> {
    let started = Instant::now();
    let compiled = runtime.compile(workload, device_id)?;
    let output = runtime.execute(compiled.as_ref(), input)?;
    let elapsed = started.elapsed();

    if output.len() != input.len() {
        return Err(RuntimeError::execution(
            device_id,
            format!(
                "output has {} elements, expected {}",
                output.len(),
                input.len()
            ),
        ));
    }
    Ok(elapsed)
}
