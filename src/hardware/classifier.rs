//! Device Classification
//!
//! Maps runtime device identifiers to categories with a fixed rule table.
//! Rules are checked in order (NPU, GPU, CPU) and the first hit wins, so an
//! identifier carrying both an NPU and a GPU token is an NPU.

use std::collections::BTreeSet;

use crate::hardware::device::{Device, DeviceCategory};
use crate::runtime::{InferenceRuntime, FULL_DEVICE_NAME, OPTIMIZATION_CAPABILITIES};

/// One row of the classification table
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: DeviceCategory,
    /// Uppercase substrings that select this category
    pub tokens: &'static [&'static str],
}

/// Classification rules in priority order
pub const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: DeviceCategory::Npu,
        tokens: &["NPU", "VPU", "NEURAL", "ACCEL"],
    },
    CategoryRule {
        category: DeviceCategory::Gpu,
        tokens: &["GPU", "CUDA", "METAL", "VULKAN", "OPENCL"],
    },
    CategoryRule {
        category: DeviceCategory::Cpu,
        tokens: &["CPU"],
    },
];

/// First matching rule for a piece of text
fn match_rules(text: &str) -> Option<DeviceCategory> {
    let upper = text.to_uppercase();
    RULES
        .iter()
        .find(|rule| rule.tokens.iter().any(|token| upper.contains(token)))
        .map(|rule| rule.category)
}

/// Classify an identifier, consulting the display name only when the
/// identifier alone is inconclusive
pub fn classify(id: &str, name: Option<&str>) -> DeviceCategory {
    match_rules(id)
        .or_else(|| name.and_then(match_rules))
        .unwrap_or(DeviceCategory::Other)
}

/// Build a Device record, fetching descriptive properties best-effort
pub fn describe(runtime: &dyn InferenceRuntime, id: &str) -> Device {
    let mut diagnostics = Vec::new();

    let name = match runtime.get_property(id, FULL_DEVICE_NAME) {
        Ok(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(device = id, error = %e, "Device name unavailable");
            diagnostics.push(e.to_string());
            None
        }
    };

    let capabilities = match runtime.get_property(id, OPTIMIZATION_CAPABILITIES) {
        Ok(raw) => parse_capabilities(&raw),
        Err(e) => {
            tracing::debug!(device = id, error = %e, "Device capabilities unavailable");
            diagnostics.push(e.to_string());
            BTreeSet::new()
        }
    };

    let mut device = Device::new(id, classify(id, name.as_deref()));
    device.name = name;
    device.capabilities = capabilities;
    device.diagnostics = diagnostics;
    device
}

/// Split a capability list on whitespace and commas
fn parse_capabilities(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .map(|s| s.trim_matches(|c| c == '[' || c == ']' || c == '\'' || c == '"'))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::{Behavior, FakeRuntime};

    #[test]
    fn test_openvino_style_identifiers() {
        assert_eq!(classify("CPU", None), DeviceCategory::Cpu);
        assert_eq!(classify("GPU.0", None), DeviceCategory::Gpu);
        assert_eq!(classify("GPU.1", None), DeviceCategory::Gpu);
        assert_eq!(classify("NPU", None), DeviceCategory::Npu);
        assert_eq!(classify("HETERO", None), DeviceCategory::Other);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(classify("gpu.0", None), DeviceCategory::Gpu);
        assert_eq!(classify("intel-npu", None), DeviceCategory::Npu);
    }

    #[test]
    fn test_npu_wins_over_gpu() {
        assert_eq!(classify("GPU_NPU.0", None), DeviceCategory::Npu);
        assert_eq!(classify("NPU-GPU", None), DeviceCategory::Npu);
    }

    #[test]
    fn test_name_consulted_only_when_id_is_inconclusive() {
        assert_eq!(
            classify("dev0", Some("Intel(R) AI Boost NPU")),
            DeviceCategory::Npu
        );
        assert_eq!(
            classify("CPU", Some("Intel(R) Core(TM) Ultra 7 with Neural engine")),
            DeviceCategory::Cpu
        );
        assert_eq!(classify("dev0", None), DeviceCategory::Other);
    }

    #[test]
    fn test_classification_is_idempotent() {
        for id in ["CPU", "GPU.0", "NPU", "GNA", "GPU.NPU"] {
            let first = classify(id, None);
            for _ in 0..3 {
                assert_eq!(classify(id, None), first);
            }
        }
    }

    #[test]
    fn test_describe_records_missing_properties() {
        let runtime = FakeRuntime::new().device("NPU", Behavior::Works);
        let device = describe(&runtime, "NPU");
        assert_eq!(device.category, DeviceCategory::Npu);
        assert!(device.name.is_none());
        assert!(device.capabilities.is_empty());
        assert_eq!(device.diagnostics.len(), 2);
        assert!(!device.is_validated());
    }

    #[test]
    fn test_describe_parses_capabilities() {
        let runtime = FakeRuntime::new().named(
            "GPU.0",
            "Intel(R) Arc(TM) Graphics (iGPU)",
            "['FP32', 'FP16', 'INT8']",
            Behavior::Works,
        );
        let device = describe(&runtime, "GPU.0");
        assert_eq!(device.name.as_deref(), Some("Intel(R) Arc(TM) Graphics (iGPU)"));
        let caps: Vec<&str> = device.capabilities.iter().map(String::as_str).collect();
        assert_eq!(caps, vec!["FP16", "FP32", "INT8"]);
        assert!(device.diagnostics.is_empty());
    }
}
