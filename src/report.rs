//! Report Rendering
//!
//! Turns probe and host results into the text printed by the diagnostic
//! binaries, or into JSON when configured.

use std::fmt::Write;

use serde::Serialize;

use crate::error::ProbeResult;
use crate::hardware::device::{Device, Validation};
use crate::hardware::host::{HostReport, ToolStatus};
use crate::policy::{Assignment, AssignmentReason, PlanOutcome};
use crate::probe::ProbeReport;

const RULE: &str = "==================================================";

pub fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

pub fn banner(title: &str) -> String {
    format!("{}\n{}", title, RULE)
}

pub fn footer(message: &str) -> String {
    format!("\n{}\n{}", RULE, message)
}

/// One block per device, with host evidence when available
pub fn render_devices<'a>(
    devices: impl IntoIterator<Item = &'a Device>,
    host: Option<&HostReport>,
) -> String {
    let mut out = String::new();
    let mut any = false;

    for device in devices {
        any = true;
        let status = match &device.validation {
            Validation::Passed { elapsed_ms } => format!("workload ran in {:.1} ms", elapsed_ms),
            Validation::Failed { kind, reason } => format!("{}: {}", kind, reason),
            Validation::Pending => "not validated".to_string(),
        };
        let _ = writeln!(
            out,
            "{} {} [{}] {} - {}",
            mark(device.is_validated()),
            device.id,
            device.category,
            device.display_name(),
            status
        );
        if !device.capabilities.is_empty() {
            let caps: Vec<&str> = device.capabilities.iter().map(String::as_str).collect();
            let _ = writeln!(out, "    Capabilities: {}", caps.join(" "));
        }
        for note in &device.diagnostics {
            let _ = writeln!(out, "    Note: {}", note);
        }
        if let Some(evidence) = host.and_then(|h| h.corroborates(device.category)) {
            let _ = writeln!(
                out,
                "    Host evidence: {}",
                if evidence {
                    "device node present"
                } else {
                    "no device node found"
                }
            );
        }
    }

    if !any {
        out.push_str("✗ No devices found\n");
    }
    out
}

fn render_assignment(assignment: &Assignment) -> String {
    match (&assignment.device, assignment.reason) {
        (Some(device), AssignmentReason::PreferredMatched) => format!(
            "✓ {:<12} → {} ({}, preferred)",
            assignment.task.as_str(),
            device.id,
            device.category
        ),
        (Some(device), AssignmentReason::FallbackUsed { preferred, used }) => format!(
            "⚠ {:<12} → {} ({}, {} not available)",
            assignment.task.as_str(),
            device.id,
            used,
            preferred
        ),
        _ => format!(
            "✗ {:<12} → no device available",
            assignment.task.as_str()
        ),
    }
}

pub fn recommendation(plan: PlanOutcome) -> &'static str {
    match plan {
        PlanOutcome::Optimal => "Optimal configuration: every task runs on its preferred device",
        PlanOutcome::Partial => "Partial optimization: some tasks fell back to another device",
        PlanOutcome::CpuOnly => {
            "No specialized hardware available: all tasks use the CPU, performance will be limited"
        }
        PlanOutcome::Unassigned => "No usable device: no task can run",
    }
}

pub fn render_assignments(report: &ProbeReport) -> String {
    let mut out = String::new();
    for assignment in &report.assignments {
        let _ = writeln!(out, "{}", render_assignment(assignment));
    }
    let _ = writeln!(out, "\n{}", recommendation(report.plan));
    out
}

/// Full probe section: runtime, devices, assignments
pub fn render_report(report: &ProbeReport, host: Option<&HostReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Inference Runtime ({}) ===", report.runtime);
    if let Some(err) = &report.runtime_error {
        let _ = writeln!(out, "✗ Runtime unavailable: {}", err);
    } else {
        let ids: Vec<&str> = report.devices.iter().map(|d| d.id.as_str()).collect();
        let _ = writeln!(out, "Available devices: {:?}", ids);
    }

    let _ = writeln!(out, "\n=== Device Validation ===");
    out.push_str(&render_devices(&report.devices, host));

    let _ = writeln!(out, "\n=== Hardware Assignment ===");
    out.push_str(&render_assignments(report));
    out
}

fn tool_line(status: &ToolStatus) -> String {
    match status {
        ToolStatus::Ok => "✓ ok".to_string(),
        ToolStatus::Failed(reason) => format!("✗ failed: {}", reason),
        ToolStatus::Missing => "✗ command not found".to_string(),
        ToolStatus::TimedOut => "✗ timed out".to_string(),
    }
}

fn render_listing(out: &mut String, label: &str, entries: Option<&[String]>) {
    match entries {
        Some(entries) if !entries.is_empty() => {
            let _ = writeln!(out, "✓ {}: {}", label, entries.join(", "));
        }
        Some(_) => {
            let _ = writeln!(out, "✗ {}: empty", label);
        }
        None => {
            let _ = writeln!(out, "✗ {}: not found", label);
        }
    }
}

pub fn render_host(host: &HostReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== System Information ===");
    let _ = writeln!(
        out,
        "OS: {}",
        host.os_name.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(out, "Architecture: {}", host.arch);
    let _ = writeln!(
        out,
        "CPU: {}",
        host.cpu_model.as_deref().unwrap_or("unknown")
    );
    match host.memory_total_kb {
        Some(kb) => {
            let _ = writeln!(out, "Total Memory: {:.1} GB", kb as f64 / 1_048_576.0);
        }
        None => {
            let _ = writeln!(out, "Total Memory: unknown");
        }
    }

    let _ = writeln!(out, "\n=== Device Nodes ===");
    render_listing(&mut out, "/dev/dri", host.dri_nodes.as_deref());
    render_listing(
        &mut out,
        "/dev/accel",
        Some(host.accel_nodes.as_slice()).filter(|n| !n.is_empty()),
    );
    render_listing(
        &mut out,
        "/sys/class/accel",
        Some(host.sysfs_accel.as_slice()).filter(|n| !n.is_empty()),
    );
    render_listing(&mut out, "/opt/intel", host.intel_tools.as_deref());
    render_listing(
        &mut out,
        "Level Zero libraries",
        Some(host.level_zero_libs.as_slice()).filter(|n| !n.is_empty()),
    );

    if !host.nvidia.is_empty() {
        let _ = writeln!(out, "\n=== NVIDIA GPU ===");
    }
    for gpu in &host.nvidia {
        let _ = writeln!(out, "✓ {}", gpu.name);
        if let Some(vram) = gpu.vram_mb {
            let _ = writeln!(out, "  VRAM: {} MB", vram);
        }
        if let Some(driver) = &gpu.driver_version {
            let _ = writeln!(out, "  Driver: {}", driver);
        }
    }

    if !host.tools.is_empty() {
        let _ = writeln!(out, "\n=== Tools ===");
        for check in &host.tools {
            let _ = writeln!(out, "{}: {}", check.tool.program(), tool_line(&check.status));
            for line in &check.lines {
                let _ = writeln!(out, "  {}", line);
            }
        }
    }
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<&'a HostReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probe: Option<&'a ProbeReport>,
}

pub fn render_json(probe: Option<&ProbeReport>, host: Option<&HostReport>) -> ProbeResult<String> {
    Ok(serde_json::to_string_pretty(&JsonReport { host, probe })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::error::RuntimeError;
    use crate::hardware::device::DeviceCategory;
    use crate::policy::{assign, Task};
    use std::time::Duration;

    fn sample_report() -> ProbeReport {
        let mut cpu = Device::new("CPU", DeviceCategory::Cpu);
        cpu.name = Some("Intel(R) Core(TM) Ultra 7 155H".into());
        cpu.mark_validated(Duration::from_millis(2));
        let mut npu = Device::new("NPU", DeviceCategory::Npu);
        npu.mark_failed(&RuntimeError::compile("NPU", "unsupported operation"));
        npu.diagnostics.push("[PropertyUnavailable] NPU: property FULL_DEVICE_NAME is not reported".into());

        let devices = vec![cpu, npu];
        let assignments = assign(&[Task::detection(), Task::recognition()], &devices, false);
        ProbeReport {
            session_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            runtime: "fake".into(),
            plan: PlanOutcome::evaluate(&assignments),
            devices,
            assignments,
            runtime_error: None,
        }
    }

    #[test]
    fn test_text_report_marks_devices_and_assignments() {
        let text = render_report(&sample_report(), None);
        assert!(text.contains("✓ CPU [CPU] Intel(R) Core(TM) Ultra 7 155H"));
        assert!(text.contains("✗ NPU [NPU] NPU - CompileError: unsupported operation"));
        assert!(text.contains("Note: [PropertyUnavailable]"));
        assert!(text.contains("detection    → CPU (CPU, GPU not available)"));
        assert!(text.contains(recommendation(PlanOutcome::CpuOnly)));
    }

    #[test]
    fn test_unavailable_runtime_still_renders() {
        let report = ProbeReport::unavailable(
            uuid::Uuid::new_v4(),
            chrono::Utc::now(),
            "fake",
            &ProbeConfig::default(),
            RuntimeError::unavailable("driver stack missing"),
        );
        let text = render_report(&report, None);
        assert!(text.contains("Runtime unavailable"));
        assert!(text.contains("✗ No devices found"));
        assert!(text.contains("✗ detection    → no device available"));
    }

    #[test]
    fn test_host_section_lists_nodes() {
        let host = HostReport {
            dri_nodes: Some(vec!["card0".into(), "renderD128".into()]),
            accel_nodes: vec!["accel0".into()],
            ..HostReport::default()
        };
        let text = render_host(&host);
        assert!(text.contains("✓ /dev/dri: card0, renderD128"));
        assert!(text.contains("✓ /dev/accel: accel0"));
        assert!(text.contains("✗ /opt/intel: not found"));
    }

    #[test]
    fn test_json_contains_probe_and_host() {
        let report = sample_report();
        let host = HostReport::default();
        let json = render_json(Some(&report), Some(&host)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["probe"]["devices"][0]["id"], "CPU");
        assert_eq!(value["probe"]["plan"], "cpu_only");
        assert!(value["host"].is_object());
    }
}
