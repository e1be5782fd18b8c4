//! Health report for the application context.
//!
//! Each component contributes a pass/fail entry; the overall status is
//! healthy when at least [`HEALTHY_THRESHOLD`] of the components pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fraction of passing components required for an overall healthy status.
pub const HEALTHY_THRESHOLD: f64 = 0.8;

/// Aggregated health of the running application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    /// Passing components over total components, from 0.0 to 1.0
    pub score: f64,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    /// Build a report from component checks and score it.
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let score = if components.is_empty() {
            1.0
        } else {
            let passing = components.iter().filter(|component| component.is_healthy).count();
            passing as f64 / components.len() as f64
        };

        Self { is_healthy: score >= HEALTHY_THRESHOLD, score, components, checked_at: Utc::now() }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|component| component.name == name)
    }
}

/// Health of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub is_healthy: bool,
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    /// Passing component with an informational note.
    pub fn healthy_with(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: Some(message.into()) }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}
