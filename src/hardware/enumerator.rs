//! Device Enumeration

use std::sync::Arc;
use std::time::Duration;

use crate::error::RuntimeError;
use crate::hardware::bounded::{run_bounded, Bounded};
use crate::runtime::InferenceRuntime;

/// List the runtime's device identifiers in runtime order.
///
/// Any failure to query the runtime, including a hung query, is reported
/// as `RuntimeUnavailable`. Duplicate identifiers keep their first position.
pub async fn enumerate(
    runtime: Arc<dyn InferenceRuntime>,
    limit: Duration,
) -> Result<Vec<String>, RuntimeError> {
    let name = runtime.name().to_string();
    let listed = match run_bounded(limit, move || runtime.list_devices()).await {
        Bounded::Done(result) => result,
        Bounded::TimedOut => Err(RuntimeError::unavailable(format!(
            "{} did not list devices within {:.1}s",
            name,
            limit.as_secs_f64()
        ))),
        Bounded::Aborted(reason) => Err(RuntimeError::unavailable(reason)),
    };

    let raw = listed.map_err(|e| {
        if e.is_fatal() {
            e
        } else {
            RuntimeError::unavailable(e.to_string())
        }
    })?;

    let mut ids: Vec<String> = Vec::with_capacity(raw.len());
    for id in raw {
        if ids.contains(&id) {
            tracing::warn!(device = %id, "Runtime listed device twice, ignoring repeat");
            continue;
        }
        ids.push(id);
    }

    if ids.is_empty() {
        tracing::warn!(runtime = %name, "Runtime reported no devices");
    } else {
        tracing::info!(runtime = %name, devices = ?ids, "Available devices");
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeErrorKind;
    use crate::runtime::fake::{Behavior, FakeRuntime};

    #[tokio::test]
    async fn test_enumeration_keeps_runtime_order() {
        let runtime = FakeRuntime::new()
            .device("GPU.0", Behavior::Works)
            .device("CPU", Behavior::Works)
            .device("NPU", Behavior::Works);
        let ids = enumerate(Arc::new(runtime), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(ids, vec!["GPU.0", "CPU", "NPU"]);
    }

    #[tokio::test]
    async fn test_duplicates_are_dropped() {
        let runtime = FakeRuntime::new()
            .device("CPU", Behavior::Works)
            .device("CPU", Behavior::Works);
        let ids = enumerate(Arc::new(runtime), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(ids, vec!["CPU"]);
    }

    #[tokio::test]
    async fn test_unavailable_runtime_is_fatal() {
        let runtime = FakeRuntime::unavailable("libopenvino missing");
        let err = enumerate(Arc::new(runtime), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::RuntimeUnavailable);
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_hung_listing_is_runtime_unavailable() {
        let runtime = FakeRuntime::hanging_list(Duration::from_secs(2));
        let err = enumerate(Arc::new(runtime), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::RuntimeUnavailable);
        assert!(err.message.contains("did not list devices within 0.3s"));
    }
}
