//! Host Hardware Evidence
//!
//! Corroborates what the inference runtime reports using the host itself:
//! 1. Device nodes: /dev/dri (GPU render nodes), /dev/accel* (NPU)
//! 2. Driver trees: /sys/class/accel, /opt/intel, Level Zero libraries
//! 3. Vendor tools: nvidia-smi, lspci, vainfo, clinfo, dpkg
//!
//! Everything here is informational. A missing node or tool never fails
//! the probe.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::hardware::device::DeviceCategory;

const NVIDIA_QUERY: [&str; 2] = [
    "--query-gpu=name,memory.total,driver_version",
    "--format=csv,noheader,nounits",
];

/// NVIDIA GPU as reported by nvidia-smi
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvidiaGpu {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_version: Option<String>,
}

/// External tools the host probe knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostTool {
    NvidiaSmi,
    Lspci,
    Vainfo,
    Clinfo,
    Dpkg,
}

impl HostTool {
    pub fn program(&self) -> &'static str {
        match self {
            HostTool::NvidiaSmi => "nvidia-smi",
            HostTool::Lspci => "lspci",
            HostTool::Vainfo => "vainfo",
            HostTool::Clinfo => "clinfo",
            HostTool::Dpkg => "dpkg",
        }
    }

    fn args(&self) -> &'static [&'static str] {
        match self {
            HostTool::NvidiaSmi => &NVIDIA_QUERY,
            HostTool::Lspci => &[],
            HostTool::Vainfo => &[],
            HostTool::Clinfo => &["-l"],
            HostTool::Dpkg => &["-l"],
        }
    }

    /// Keep only the output lines that matter for accelerator detection
    fn relevant_lines(&self, stdout: &str) -> Vec<String> {
        match self {
            HostTool::NvidiaSmi => non_empty_lines(stdout),
            HostTool::Lspci => filter_pci_lines(stdout),
            HostTool::Vainfo => stdout
                .lines()
                .map(str::trim)
                .filter(|l| l.starts_with("vainfo:"))
                .map(str::to_string)
                .collect(),
            HostTool::Clinfo => non_empty_lines(stdout),
            HostTool::Dpkg => filter_npu_packages(stdout),
        }
    }
}

/// Outcome of running one external tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Failed(String),
    Missing,
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCheck {
    pub tool: HostTool,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
}

/// Everything the host probe found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostReport {
    pub os_name: Option<String>,
    pub arch: String,
    pub cpu_model: Option<String>,
    pub memory_total_kb: Option<u64>,
    /// Entries of /dev/dri, or None when the directory is absent
    pub dri_nodes: Option<Vec<String>>,
    pub accel_nodes: Vec<String>,
    pub sysfs_accel: Vec<String>,
    /// Entries of /opt/intel, or None when absent
    pub intel_tools: Option<Vec<String>>,
    pub level_zero_libs: Vec<String>,
    /// One entry per GPU listed by nvidia-smi
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nvidia: Vec<NvidiaGpu>,
    pub tools: Vec<ToolCheck>,
}

impl HostReport {
    /// Whether the host shows physical evidence for a device category.
    /// `None` when the host probe has nothing to say about the category.
    pub fn corroborates(&self, category: DeviceCategory) -> Option<bool> {
        match category {
            DeviceCategory::Gpu => {
                let dri = self.dri_nodes.as_ref().is_some_and(|nodes| {
                    nodes
                        .iter()
                        .any(|n| n.starts_with("render") || n.starts_with("card"))
                });
                Some(dri || !self.nvidia.is_empty())
            }
            DeviceCategory::Npu => {
                Some(!self.accel_nodes.is_empty() || !self.sysfs_accel.is_empty())
            }
            DeviceCategory::Cpu | DeviceCategory::Other => None,
        }
    }
}

/// Read-only probe of the host filesystem and vendor tools
pub struct HostProbe {
    root: PathBuf,
    tool_timeout: Duration,
}

impl HostProbe {
    pub fn new(tool_timeout: Duration) -> Self {
        Self::with_root("/", tool_timeout)
    }

    /// Probe a filesystem tree mounted somewhere other than `/`
    pub fn with_root(root: impl Into<PathBuf>, tool_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            tool_timeout,
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// Filesystem evidence only, no external commands
    pub fn scan(&self) -> HostReport {
        // Older kernels expose /dev/accel0, newer ones /dev/accel/accel0
        let mut accel_nodes: Vec<String> = list_dir(&self.path("/dev"))
            .unwrap_or_default()
            .into_iter()
            .filter(|n| n.starts_with("accel") && n != "accel")
            .collect();
        accel_nodes.extend(
            list_dir(&self.path("/dev/accel"))
                .unwrap_or_default()
                .into_iter()
                .map(|n| format!("accel/{}", n)),
        );

        let level_zero_libs = list_dir(&self.path("/usr/lib/x86_64-linux-gnu"))
            .unwrap_or_default()
            .into_iter()
            .filter(|lib| {
                let lower = lib.to_lowercase();
                (lower.contains("level") && lower.contains("zero")) || lower.starts_with("libze_")
            })
            .collect();

        HostReport {
            os_name: os_pretty_name(&self.root),
            arch: std::env::consts::ARCH.to_string(),
            cpu_model: cpu_model(&self.root),
            memory_total_kb: memory_total_kb(&self.root),
            dri_nodes: list_dir(&self.path("/dev/dri")),
            accel_nodes,
            sysfs_accel: list_dir(&self.path("/sys/class/accel")).unwrap_or_default(),
            intel_tools: list_dir(&self.path("/opt/intel")),
            level_zero_libs,
            nvidia: Vec::new(),
            tools: Vec::new(),
        }
    }

    /// Filesystem scan plus the requested tool checks
    pub async fn run(&self, tools: &[HostTool]) -> HostReport {
        let mut report = self.scan();
        let checks = futures::future::join_all(tools.iter().map(|t| self.check_tool(*t))).await;

        if let Some(check) = checks
            .iter()
            .find(|c| c.tool == HostTool::NvidiaSmi && c.status == ToolStatus::Ok)
        {
            report.nvidia = parse_nvidia_smi(&check.lines.join("\n"));
            for gpu in &report.nvidia {
                tracing::info!(name = %gpu.name, vram_mb = ?gpu.vram_mb, "Detected NVIDIA GPU");
            }
        }
        report.tools = checks;
        report
    }

    /// Run one tool bounded by the tool timeout
    pub async fn check_tool(&self, tool: HostTool) -> ToolCheck {
        let mut command = Command::new(tool.program());
        command
            .args(tool.args())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let status = match tokio::time::timeout(self.tool_timeout, command.output()).await {
            Err(_) => ToolStatus::TimedOut,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => ToolStatus::Missing,
            Ok(Err(e)) => ToolStatus::Failed(e.to_string()),
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let lines = tool.relevant_lines(&stdout);
                tracing::debug!(tool = tool.program(), lines = lines.len(), "Tool check complete");
                return ToolCheck {
                    tool,
                    status: ToolStatus::Ok,
                    lines,
                };
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let first = stderr.lines().next().unwrap_or("").trim().to_string();
                ToolStatus::Failed(if first.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    first
                })
            }
        };

        tracing::debug!(tool = tool.program(), status = ?status, "Tool check complete");
        ToolCheck {
            tool,
            status,
            lines: Vec::new(),
        }
    }
}

/// Sorted directory entry names, or None when the directory is unreadable
fn list_dir(path: &Path) -> Option<Vec<String>> {
    let entries = std::fs::read_dir(path).ok()?;
    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Some(names)
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// CPU model from /proc/cpuinfo under `root`
pub fn cpu_model(root: &Path) -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        let _ = root;
        std::env::var("PROCESSOR_IDENTIFIER").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        let cpuinfo = std::fs::read_to_string(root.join("proc/cpuinfo")).ok()?;
        cpuinfo
            .lines()
            .find(|l| l.starts_with("model name"))
            .and_then(|l| l.split_once(':'))
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

fn os_pretty_name(root: &Path) -> Option<String> {
    let release = std::fs::read_to_string(root.join("etc/os-release")).ok()?;
    release
        .lines()
        .find_map(|l| l.strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim_matches('"').to_string())
}

fn memory_total_kb(root: &Path) -> Option<u64> {
    let meminfo = std::fs::read_to_string(root.join("proc/meminfo")).ok()?;
    meminfo
        .lines()
        .find_map(|l| l.strip_prefix("MemTotal:"))
        .and_then(|value| value.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// Parse `nvidia-smi --query-gpu=name,memory.total,driver_version` CSV,
/// one GPU per line
pub fn parse_nvidia_smi(stdout: &str) -> Vec<NvidiaGpu> {
    stdout.lines().filter_map(parse_nvidia_line).collect()
}

fn parse_nvidia_line(line: &str) -> Option<NvidiaGpu> {
    let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();

    if parts.len() >= 3 && !parts[0].is_empty() {
        return Some(NvidiaGpu {
            name: parts[0].to_string(),
            vram_mb: parts[1].parse().ok(),
            driver_version: if parts[2].is_empty() {
                None
            } else {
                Some(parts[2].to_string())
            },
        });
    }

    None
}

/// Name of the NVIDIA GPU at `index`. Blocks on nvidia-smi.
pub fn nvidia_gpu_name(index: usize) -> Option<String> {
    let output = std::process::Command::new("nvidia-smi")
        .arg(format!("--id={}", index))
        .args(NVIDIA_QUERY)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))
        .into_iter()
        .next()
        .map(|gpu| gpu.name)
}

/// Chip name on Apple silicon, e.g. "Apple M2". Blocks on sysctl.
pub fn apple_chip_name() -> Option<String> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "machdep.cpu.brand_string"])
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// lspci lines naming Intel graphics or an AI accelerator
pub fn filter_pci_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            let intel_graphics =
                line.contains("Intel") && (line.contains("Graphics") || line.contains("VGA"));
            let accelerator = lower.contains("neural")
                || lower.contains("npu")
                || lower.contains("processing accelerators");
            intel_graphics || accelerator
        })
        .map(|l| l.trim().to_string())
        .collect()
}

/// dpkg -l lines for Intel NPU or Level Zero packages
pub fn filter_npu_packages(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("intel") && (lower.contains("npu") || lower.contains("level-zero"))
        })
        .map(|l| l.trim().to_string())
        .collect()
}
