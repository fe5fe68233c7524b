//! Health reporting for the price predictor
//!
//! Two components are tracked. `lookup_tables` is assessed once when the
//! artifacts load: an empty table still serves but every lookup falls back
//! to defaults, so it reports degraded. `pipeline` follows the run of
//! consecutive inference failures and turns unhealthy once the run reaches
//! [`PIPELINE_UNHEALTHY_AFTER`]. Readiness additionally waits for the HTTP
//! listener to be bound.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive inference failures after which the pipeline is unhealthy
pub const PIPELINE_UNHEALTHY_AFTER: u32 = 5;

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but with reduced fidelity
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Assess the loaded lookup tables from their entry counts
    pub fn for_lookup_tables(sizes: &[(&str, usize)]) -> Self {
        let empty: Vec<&str> = sizes
            .iter()
            .filter(|(_, entries)| *entries == 0)
            .map(|(table, _)| *table)
            .collect();

        if empty.is_empty() {
            Self::new(ComponentStatus::Healthy, None)
        } else {
            Self::new(
                ComponentStatus::Degraded,
                Some(format!(
                    "empty lookup tables ({}), lookups fall back to defaults",
                    empty.join(", ")
                )),
            )
        }
    }

    /// Assess the pipeline from its current run of consecutive failures
    pub fn for_pipeline(failure_streak: u32) -> Self {
        match failure_streak {
            0 => Self::new(ComponentStatus::Healthy, None),
            n if n < PIPELINE_UNHEALTHY_AFTER => Self::new(
                ComponentStatus::Degraded,
                Some(format!("{} consecutive inference failures", n)),
            ),
            n => Self::new(
                ComponentStatus::Unhealthy,
                Some(format!("{} consecutive inference failures", n)),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const PIPELINE: &str = "pipeline";
    pub const LOOKUP_TABLES: &str = "lookup_tables";
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    serving: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state of freshly loaded artifacts
    pub async fn record_artifacts(&self, table_sizes: &[(&str, usize)]) {
        let mut components = self.components.write().await;
        components.insert(
            components::LOOKUP_TABLES.to_string(),
            ComponentHealth::for_lookup_tables(table_sizes),
        );
        components.insert(
            components::PIPELINE.to_string(),
            ComponentHealth::for_pipeline(0),
        );
    }

    /// Update the pipeline component; writes only when the reported state changes
    pub async fn record_pipeline(&self, failure_streak: u32) {
        let next = ComponentHealth::for_pipeline(failure_streak);
        let current = self
            .components
            .read()
            .await
            .get(components::PIPELINE)
            .map(|h| (h.status, h.message.clone()));
        if current == Some((next.status, next.message.clone())) {
            return;
        }
        self.components
            .write()
            .await
            .insert(components::PIPELINE.to_string(), next);
    }

    /// Mark whether the HTTP listener is accepting connections
    pub async fn set_serving(&self, serving: bool) {
        *self.serving.write().await = serving;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !*self.serving.read().await {
            Some("Listener not yet bound")
        } else if self.components.read().await.is_empty() {
            Some("Artifacts not yet loaded")
        } else if self.health().await.status == ComponentStatus::Unhealthy {
            Some("Price pipeline is failing")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}
