//! Accelerator capability probe.
//!
//! Enumerates compute devices through an inference runtime, classifies and
//! validates each one with a real workload, then places the detection and
//! recognition tasks on the best validated device.

pub mod cli;
pub mod config;
pub mod error;
pub mod hardware;
pub mod policy;
pub mod probe;
pub mod report;
pub mod runtime;

pub use config::{OutputFormat, ProbeConfig};
pub use error::{ProbeError, ProbeResult, RuntimeError, RuntimeErrorKind};
pub use hardware::{Device, DeviceCategory, HostProbe, HostReport, Validation};
pub use policy::{assign, Assignment, AssignmentReason, PlanOutcome, Task, TaskKind};
pub use probe::{ProbeReport, ProbeSession};
pub use runtime::{CandleRuntime, InferenceRuntime};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` overrides the default `accel_probe=info` filter. Calling this
/// more than once is harmless.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("accel_probe=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
