//! # Dependency Circuit Breakers
//!
//! One independent breaker per downstream dependency, built from the
//! component settings. An outage in one dependency never throttles calls to
//! another.

use std::sync::Arc;

use tracing::info;

use detention_shared::config::{
    CircuitBreakerSettings, ORDER_FACTS_COMPONENT, ORDER_MUTATION_COMPONENT, TIMESTAMPS_COMPONENT,
};
use detention_shared::resilience::{CircuitBreaker, CircuitBreakerBehavior, CircuitBreakerMetrics};

#[derive(Debug, Clone)]
pub struct DependencyBreakers {
    pub order_facts: Arc<CircuitBreaker>,
    pub timestamps: Arc<CircuitBreaker>,
    pub order_mutation: Arc<CircuitBreaker>,
}

impl DependencyBreakers {
    pub fn from_settings(settings: &CircuitBreakerSettings) -> Self {
        let build = |component: &str| {
            let config = settings.resilience_config_for(component);
            info!(
                circuit_breaker = component,
                failure_threshold = config.failure_threshold,
                success_threshold = config.success_threshold,
                timeout_seconds = config.timeout.as_secs(),
                "Dependency circuit breaker initialized"
            );
            Arc::new(CircuitBreaker::new(component.to_string(), config))
        };

        Self {
            order_facts: build(ORDER_FACTS_COMPONENT),
            timestamps: build(TIMESTAMPS_COMPONENT),
            order_mutation: build(ORDER_MUTATION_COMPONENT),
        }
    }

    pub fn all(&self) -> [&dyn CircuitBreakerBehavior; 3] {
        [
            self.order_facts.as_ref(),
            self.timestamps.as_ref(),
            self.order_mutation.as_ref(),
        ]
    }

    pub fn metrics(&self) -> Vec<(String, CircuitBreakerMetrics)> {
        self.all()
            .iter()
            .map(|breaker| (breaker.name().to_string(), breaker.metrics()))
            .collect()
    }

    pub fn all_healthy(&self) -> bool {
        self.all().iter().all(|breaker| breaker.is_healthy())
    }
}

impl Default for DependencyBreakers {
    fn default() -> Self {
        Self::from_settings(&CircuitBreakerSettings::default())
    }
}
