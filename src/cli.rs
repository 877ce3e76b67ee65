//! Diagnostic Entry Points
//!
//! One function per binary. None of them take arguments; settings come
//! from the probe config file. Every entry point prints a full report and
//! exits 0, except the NPU probe which exits 1 unless an NPU validates.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::{OutputFormat, ProbeConfig};
use crate::hardware::device::DeviceCategory;
use crate::hardware::host::{HostProbe, HostReport, HostTool};
use crate::probe::{ProbeReport, ProbeSession};
use crate::report;
use crate::runtime::CandleRuntime;

/// Run an entry point on a fresh tokio runtime.
///
/// The runtime is shut down in the background so a validation thread stuck
/// inside a driver cannot keep the process alive.
pub fn block_on<F>(entry: F) -> ExitCode
where
    F: Future<Output = ExitCode>,
{
    crate::init_logging();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(entry);
    runtime.shutdown_background();
    code
}

/// Load the probe config, falling back to defaults on any problem
pub fn load_config() -> ProbeConfig {
    match ProbeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring probe config, using defaults");
            ProbeConfig::default()
        }
    }
}

async fn run_probe(config: &ProbeConfig) -> ProbeReport {
    ProbeSession::new(Arc::new(CandleRuntime::new()), config.clone())
        .run_to_report()
        .await
}

/// Print either the text sections or one JSON document
fn emit(config: &ProbeConfig, probe: Option<&ProbeReport>, host: Option<&HostReport>, text: String) {
    match config.output {
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Json => match report::render_json(probe, host) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize report");
                println!("{}", text);
            }
        },
    }
}

/// Host summary, full probe and assignment
pub async fn probe_devices() -> ExitCode {
    let config = load_config();
    let host = HostProbe::new(config.tool_timeout())
        .run(&[
            HostTool::NvidiaSmi,
            HostTool::Lspci,
            HostTool::Vainfo,
            HostTool::Clinfo,
            HostTool::Dpkg,
        ])
        .await;
    let probe = run_probe(&config).await;

    let text = [
        report::banner("Accelerator Probe"),
        report::render_host(&host),
        report::render_report(&probe, Some(&host)),
        report::footer("Probe complete"),
    ]
    .join("\n");
    emit(&config, Some(&probe), Some(&host), text);
    ExitCode::SUCCESS
}

/// GPU-focused evidence and validation
pub async fn probe_gpu() -> ExitCode {
    let config = load_config();
    let host = HostProbe::new(config.tool_timeout())
        .run(&[HostTool::Lspci, HostTool::Vainfo, HostTool::Clinfo, HostTool::NvidiaSmi])
        .await;
    let probe = run_probe(&config).await;

    let mut text = vec![
        report::banner("GPU Support Test"),
        report::render_host(&host),
        "=== GPU Devices ===".to_string(),
        report::render_devices(probe.devices_of(DeviceCategory::Gpu), Some(&host)),
    ];
    if let Some(err) = &probe.runtime_error {
        text.push(format!("✗ Runtime unavailable: {}", err));
    }
    text.push(report::footer(if probe.has_validated(DeviceCategory::Gpu) {
        "✓ GPU inference test successful"
    } else {
        "✗ No GPU passed the inference test"
    }));
    emit(&config, Some(&probe), Some(&host), text.join("\n"));
    ExitCode::SUCCESS
}

/// Whether an NPU both enumerated and validated
pub fn npu_ready(probe: &ProbeReport) -> bool {
    probe.has_validated(DeviceCategory::Npu)
}

/// NPU-focused evidence and validation; exits 1 without a working NPU
pub async fn probe_npu() -> ExitCode {
    let config = load_config();
    let host = HostProbe::new(config.tool_timeout())
        .run(&[HostTool::Lspci, HostTool::Dpkg])
        .await;
    let probe = run_probe(&config).await;
    let ready = npu_ready(&probe);

    let mut text = vec![
        report::banner("NPU Support Test"),
        report::render_host(&host),
        "=== NPU Devices ===".to_string(),
        report::render_devices(probe.devices_of(DeviceCategory::Npu), Some(&host)),
    ];
    if let Some(err) = &probe.runtime_error {
        text.push(format!("✗ Runtime unavailable: {}", err));
    }
    text.push(report::footer(if ready {
        "✓ NPU inference test successful"
    } else {
        "✗ No NPU passed the inference test"
    }));
    emit(&config, Some(&probe), Some(&host), text.join("\n"));

    if ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Detection/recognition placement and recommendation
pub async fn verify_assignment() -> ExitCode {
    let config = load_config();
    let probe = run_probe(&config).await;

    let text = [
        report::banner("Hardware Assignment Verification"),
        report::render_report(&probe, None),
        report::footer("Hardware assignment verification completed"),
    ]
    .join("\n");
    emit(&config, Some(&probe), None, text);
    ExitCode::SUCCESS
}

/// System information and tool availability only
pub async fn probe_host() -> ExitCode {
    let config = load_config();
    let host = HostProbe::new(config.tool_timeout())
        .run(&[
            HostTool::NvidiaSmi,
            HostTool::Lspci,
            HostTool::Vainfo,
            HostTool::Clinfo,
            HostTool::Dpkg,
        ])
        .await;

    let summary = format!(
        "=== Summary ===\nNVIDIA GPU: {}\nGPU device nodes: {}\nNPU device nodes: {}",
        report::mark(!host.nvidia.is_empty()),
        report::mark(host.corroborates(DeviceCategory::Gpu).unwrap_or(false)),
        report::mark(host.corroborates(DeviceCategory::Npu).unwrap_or(false)),
    );
    let text = [
        report::banner("Local Hardware Test"),
        report::render_host(&host),
        summary,
    ]
    .join("\n");
    emit(&config, None, Some(&host), text);
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::{Behavior, FakeRuntime};

    async fn report_for(runtime: FakeRuntime) -> ProbeReport {
        ProbeSession::new(Arc::new(runtime), ProbeConfig::default())
            .run_to_report()
            .await
    }

    #[tokio::test]
    async fn test_npu_ready_requires_validation() {
        let working = report_for(FakeRuntime::new().device("NPU", Behavior::Works)).await;
        assert!(npu_ready(&working));

        let broken =
            report_for(FakeRuntime::new().device("NPU", Behavior::FailsCompile("no plugin"))).await;
        assert!(!npu_ready(&broken));

        let missing = report_for(FakeRuntime::new().device("CPU", Behavior::Works)).await;
        assert!(!npu_ready(&missing));

        let unavailable = report_for(FakeRuntime::unavailable("no runtime")).await;
        assert!(!npu_ready(&unavailable));
    }
}
