//! Probe Session
//!
//! Drives one complete probe: enumerate → classify → validate → assign.
//! Each session starts from an empty device set and shares nothing with
//! earlier sessions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult, RuntimeError};
use crate::hardware::bounded::{run_bounded, Bounded};
use crate::hardware::device::{Device, DeviceCategory};
use crate::hardware::{classifier, enumerator, Validator};
use crate::policy::{assign, Assignment, PlanOutcome};
use crate::runtime::InferenceRuntime;

/// Self-contained result of one probe session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub runtime: String,
    pub devices: Vec<Device>,
    pub assignments: Vec<Assignment>,
    pub plan: PlanOutcome,
    /// Set when the runtime could not be used at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<RuntimeError>,
}

impl ProbeReport {
    /// Empty report for a session the runtime could not serve
    pub fn unavailable(
        session_id: Uuid,
        started_at: DateTime<Utc>,
        runtime: &str,
        config: &ProbeConfig,
        error: RuntimeError,
    ) -> Self {
        let assignments = assign(&config.tasks(), &[], config.exclusive_assignment);
        Self {
            session_id,
            started_at,
            runtime: runtime.to_string(),
            plan: PlanOutcome::evaluate(&assignments),
            devices: Vec::new(),
            assignments,
            runtime_error: Some(error),
        }
    }

    pub fn devices_of(&self, category: DeviceCategory) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(move |d| d.category == category)
    }

    /// Whether some device of the category both enumerated and validated
    pub fn has_validated(&self, category: DeviceCategory) -> bool {
        self.devices_of(category).any(Device::is_validated)
    }
}

/// One probe run against one runtime
pub struct ProbeSession {
    runtime: Arc<dyn InferenceRuntime>,
    config: ProbeConfig,
}

impl ProbeSession {
    pub fn new(runtime: Arc<dyn InferenceRuntime>, config: ProbeConfig) -> Self {
        Self { runtime, config }
    }

    /// Run the session. Only an unusable runtime is an error.
    pub async fn run(&self) -> ProbeResult<ProbeReport> {
        self.run_as(Uuid::new_v4(), Utc::now()).await
    }

    /// Run the session, turning an unusable runtime into an empty report
    /// that keeps the session's id and start time
    pub async fn run_to_report(&self) -> ProbeReport {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let error = match self.run_as(session_id, started_at).await {
            Ok(report) => return report,
            Err(ProbeError::Runtime(e)) => e,
            Err(other) => RuntimeError::unavailable(other.to_string()),
        };
        ProbeReport::unavailable(
            session_id,
            started_at,
            self.runtime.name(),
            &self.config,
            error,
        )
    }

    async fn run_as(&self, session_id: Uuid, started_at: DateTime<Utc>) -> ProbeResult<ProbeReport> {
        let timeout = self.config.timeout();
        tracing::info!(%session_id, runtime = self.runtime.name(), "Starting probe session");

        let ids = enumerator::enumerate(Arc::clone(&self.runtime), timeout)
            .await
            .map_err(|e| {
                tracing::error!(%session_id, error = %e, "Inference runtime unavailable");
                ProbeError::Runtime(e)
            })?;

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            devices.push(self.describe_bounded(id).await);
        }

        Validator::new(Arc::clone(&self.runtime), timeout)
            .validate_all(&mut devices, self.config.concurrent_validation)
            .await;

        let assignments = assign(
            &self.config.tasks(),
            &devices,
            self.config.exclusive_assignment,
        );
        let plan = PlanOutcome::evaluate(&assignments);
        tracing::info!(
            %session_id,
            devices = devices.len(),
            validated = devices.iter().filter(|d| d.is_validated()).count(),
            ?plan,
            "Probe session complete"
        );

        Ok(ProbeReport {
            session_id,
            started_at,
            runtime: self.runtime.name().to_string(),
            devices,
            assignments,
            plan,
            runtime_error: None,
        })
    }

    /// Classify a device; a hung property query falls back to the identifier
    async fn describe_bounded(&self, id: String) -> Device {
        let runtime = Arc::clone(&self.runtime);
        let lookup_id = id.clone();
        match run_bounded(self.config.timeout(), move || {
            classifier::describe(runtime.as_ref(), &lookup_id)
        })
        .await
        {
            Bounded::Done(device) => device,
            Bounded::TimedOut | Bounded::Aborted(_) => {
                tracing::warn!(device = %id, "Property query did not complete");
                let mut device = Device::new(&id, classifier::classify(&id, None));
                device
                    .diagnostics
                    .push("device properties did not complete in time".to_string());
                device
            }
        }
    }
}
