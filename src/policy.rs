//! Assignment Policy
//!
//! Resolves each fixed task to a validated device by walking the task's
//! preferred categories in order. Resolution is a pure function of the
//! tasks, the device list and the exclusivity flag.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hardware::device::{Device, DeviceCategory};

/// The two cooperating workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Face detection
    Detection,
    /// Face recognition
    Recognition,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Detection => "detection",
            TaskKind::Recognition => "recognition",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical task and the device categories it prefers, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub preferences: Vec<DeviceCategory>,
}

impl Task {
    pub fn new(kind: TaskKind, preferences: Vec<DeviceCategory>) -> Self {
        Self { kind, preferences }
    }

    /// Detection runs best on a GPU
    pub fn detection() -> Self {
        Self::new(
            TaskKind::Detection,
            vec![DeviceCategory::Gpu, DeviceCategory::Cpu],
        )
    }

    /// Recognition runs best on an NPU
    pub fn recognition() -> Self {
        Self::new(
            TaskKind::Recognition,
            vec![DeviceCategory::Npu, DeviceCategory::Cpu],
        )
    }
}

/// Why a task ended up where it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AssignmentReason {
    /// The first preferred category was available
    PreferredMatched,
    /// A later preference was used
    FallbackUsed {
        preferred: DeviceCategory,
        used: DeviceCategory,
    },
    /// No validated device matched any preference
    NoMatchingDevice,
}

/// The device a task was assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedDevice {
    pub id: String,
    pub category: DeviceCategory,
}

/// Resolved task placement. `device` is None when nothing was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: TaskKind,
    pub device: Option<AssignedDevice>,
    #[serde(flatten)]
    pub reason: AssignmentReason,
}

/// Overall quality of an assignment set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOutcome {
    /// Every task got its first preference
    Optimal,
    /// Some task fell back, but an accelerator is still in use
    Partial,
    /// Every assigned task runs on the CPU
    CpuOnly,
    /// No task has a device
    Unassigned,
}

impl PlanOutcome {
    pub fn evaluate(assignments: &[Assignment]) -> Self {
        let assigned: Vec<&AssignedDevice> =
            assignments.iter().filter_map(|a| a.device.as_ref()).collect();

        if assigned.is_empty() {
            PlanOutcome::Unassigned
        } else if assignments
            .iter()
            .all(|a| a.reason == AssignmentReason::PreferredMatched)
        {
            PlanOutcome::Optimal
        } else if assigned.iter().any(|d| d.category.is_accelerator()) {
            PlanOutcome::Partial
        } else {
            PlanOutcome::CpuOnly
        }
    }
}

/// Assign every task to a validated device.
///
/// Tasks are resolved in slice order; with `exclusive` set a device claimed
/// by an earlier task is skipped by later ones. Unvalidated devices are
/// never assigned.
pub fn assign(tasks: &[Task], devices: &[Device], exclusive: bool) -> Vec<Assignment> {
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut assignments = Vec::with_capacity(tasks.len());

    for task in tasks {
        let found = task.preferences.iter().enumerate().find_map(|(rank, category)| {
            devices
                .iter()
                .filter(|d| d.is_validated() && d.category == *category)
                .find(|d| !(exclusive && claimed.contains(d.id.as_str())))
                .map(|d| (rank, d))
        });

        let assignment = match found {
            Some((rank, device)) => {
                if exclusive {
                    claimed.insert(device.id.as_str());
                }
                let reason = if rank == 0 {
                    AssignmentReason::PreferredMatched
                } else {
                    AssignmentReason::FallbackUsed {
                        preferred: task.preferences[0],
                        used: device.category,
                    }
                };
                tracing::debug!(task = %task.kind, device = %device.id, ?reason, "Task assigned");
                Assignment {
                    task: task.kind,
                    device: Some(AssignedDevice {
                        id: device.id.clone(),
                        category: device.category,
                    }),
                    reason,
                }
            }
            None => {
                tracing::warn!(
                    task = %task.kind,
                    preferences = ?task.preferences,
                    "No validated device matches task preferences"
                );
                Assignment {
                    task: task.kind,
                    device: None,
                    reason: AssignmentReason::NoMatchingDevice,
                }
            }
        };
        assignments.push(assignment);
    }

    assignments
}
