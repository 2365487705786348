//! # Circuit Breaker Configuration
//!
//! TOML-facing circuit breaker settings and their conversion into the
//! resilience module's runtime [`CircuitBreakerConfig`](crate::resilience::CircuitBreakerConfig).
//! Each downstream dependency may override thresholds; anything not
//! overridden falls back to `default_config`.
//!
//! ```toml
//! [circuit_breakers.default_config]
//! failure_threshold = 5
//! timeout_seconds = 30
//! success_threshold = 2
//!
//! [circuit_breakers.component_configs.order_mutation]
//! failure_threshold = 3
//! success_threshold = 1
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience;

/// Dependency name for the order-facts read interface
pub const ORDER_FACTS_COMPONENT: &str = "order_facts";
/// Dependency name for the timestamp-facts read interface
pub const TIMESTAMPS_COMPONENT: &str = "timestamps";
/// Dependency name for the order-mutation write interface
pub const ORDER_MUTATION_COMPONENT: &str = "order_mutation";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub default_config: CircuitBreakerDefaultConfig,
    pub component_configs: ComponentCircuitBreakerConfigs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerDefaultConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u32,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerDefaultConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 30,
            success_threshold: 2,
        }
    }
}

/// Per-dependency overrides (timeouts always come from the default config)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComponentCircuitBreakerConfigs {
    pub order_facts: Option<CircuitBreakerComponentConfig>,
    pub timestamps: Option<CircuitBreakerComponentConfig>,
    pub order_mutation: Option<CircuitBreakerComponentConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CircuitBreakerComponentConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
}

impl CircuitBreakerComponentConfig {
    /// Convert to the resilience module's format using the shared timeout
    pub fn to_resilience_config_with_timeout(
        &self,
        timeout_seconds: u32,
    ) -> resilience::CircuitBreakerConfig {
        resilience::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: Duration::from_secs(u64::from(timeout_seconds)),
            success_threshold: self.success_threshold,
        }
    }
}

impl CircuitBreakerSettings {
    /// Thresholds for a named dependency, falling back to the defaults
    pub fn config_for_component(&self, component: &str) -> CircuitBreakerComponentConfig {
        let override_config = match component {
            ORDER_FACTS_COMPONENT => self.component_configs.order_facts,
            TIMESTAMPS_COMPONENT => self.component_configs.timestamps,
            ORDER_MUTATION_COMPONENT => self.component_configs.order_mutation,
            _ => None,
        };

        override_config.unwrap_or(CircuitBreakerComponentConfig {
            failure_threshold: self.default_config.failure_threshold,
            success_threshold: self.default_config.success_threshold,
        })
    }

    /// Runtime breaker config for a named dependency
    pub fn resilience_config_for(&self, component: &str) -> resilience::CircuitBreakerConfig {
        self.config_for_component(component)
            .to_resilience_config_with_timeout(self.default_config.timeout_seconds)
    }
}
