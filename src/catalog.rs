use std::sync::Arc;

use log::{error, warn};
use serde::Serialize;

use crate::error::Result;
use crate::model::ModelRuntime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Model discovery and runtime connectivity. Always asks the runtime; nothing is cached.
pub struct ModelCatalog {
    runtime: Arc<dyn ModelRuntime>,
}

impl ModelCatalog {
    pub fn new(runtime: Arc<dyn ModelRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn list_available_models(&self) -> Result<Vec<String>> {
        let models = self.runtime.list_models().await.map_err(|e| {
            error!("Error fetching models: {}", e);
            e
        })?;
        Ok(models.into_iter().map(|m| m.name).collect())
    }

    /// Never fails: an unreachable or misbehaving runtime is reported in the body.
    pub async fn check_health(&self) -> HealthStatus {
        match self.runtime.list_models().await {
            Ok(models) => HealthStatus {
                healthy: true,
                model_count: Some(models.len()),
                error: None,
            },
            Err(e) => {
                warn!("Health check failed: {}", e);
                HealthStatus {
                    healthy: false,
                    model_count: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
