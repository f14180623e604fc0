use serde::Deserialize;

use crate::domain::DomainError;

/// Prometheus exposition settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Route serving the text exposition format
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// The path must be mountable next to the user routes
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.enabled {
            return Ok(());
        }

        if !self.path.starts_with('/') || self.path.len() < 2 {
            return Err(DomainError::configuration(format!(
                "metrics.path must be an absolute route, got '{}'",
                self.path
            )));
        }

        if self.path == "/users" || self.path.starts_with("/users/") {
            return Err(DomainError::configuration(
                "metrics.path must not overlap the /users routes",
            ));
        }

        Ok(())
    }
}
