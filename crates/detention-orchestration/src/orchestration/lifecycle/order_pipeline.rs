//! # Order Pipeline
//!
//! Fetch and analyze one order: order facts, billing rules, timing facts,
//! then the analyzer per stop. Nothing here writes to the order.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use detention_shared::models::{OrderRecord, TourTimestamps};
use detention_shared::{BillingRulesSource, DetentionError};

use crate::orchestration::analyzer::DetentionAnalyzer;
use crate::orchestration::breakers::DependencyBreakers;
use crate::orchestration::gateway::ProtectedGateway;

/// Terminal failure for one order
#[derive(Debug, Clone)]
pub struct OrderFailure {
    pub order_id: String,
    pub shipper: Option<String>,
    pub error: DetentionError,
}

impl OrderFailure {
    pub fn new(order_id: impl Into<String>, shipper: Option<String>, error: DetentionError) -> Self {
        Self {
            order_id: order_id.into(),
            shipper,
            error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderPipeline {
    gateway: ProtectedGateway,
    rules: Arc<dyn BillingRulesSource>,
    analyzer: DetentionAnalyzer,
}

impl OrderPipeline {
    pub fn new(
        gateway: ProtectedGateway,
        rules: Arc<dyn BillingRulesSource>,
        analyzer: DetentionAnalyzer,
    ) -> Self {
        Self {
            gateway,
            rules,
            analyzer,
        }
    }

    pub fn breakers(&self) -> &DependencyBreakers {
        self.gateway.breakers()
    }

    /// Build an analyzed [`OrderRecord`]
    #[instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn prepare(&self, order_id: &str) -> Result<OrderRecord, OrderFailure> {
        let mut record = OrderRecord::new(order_id);

        let facts = self
            .gateway
            .order_facts(order_id)
            .await
            .map_err(|error| OrderFailure::new(order_id, None, error))?;

        let shipper = facts.order.shipper_name.trim().to_string();
        record.shipper = Some(shipper.clone());

        let Some(rules) = self.rules.rules_for(&shipper) else {
            return Err(OrderFailure::new(
                order_id,
                Some(shipper.clone()),
                DetentionError::MissingBillingRules { shipper },
            ));
        };
        record.rules = Some(Arc::clone(&rules));

        record.timestamps = self.fetch_timestamps(order_id, facts.linkage.tour_id.as_deref()).await;

        let code = self.analyzer.config().detention_charge_code.as_str();
        record.results = facts
            .order
            .stops
            .iter()
            .enumerate()
            .map(|(index, stop)| {
                let existing = facts.order.hold_for(index, code);
                let timestamps = record.timestamps.as_ref().and_then(|t| t.for_stop(index));
                self.analyzer.analyze(
                    stop,
                    timestamps,
                    &rules,
                    facts.order.status,
                    &existing,
                    index,
                )
            })
            .collect();

        debug!(
            stops = record.results.len(),
            needs_approval = record.needs_approval(),
            needs_mutation = record.needs_mutation(),
            "Order analyzed"
        );

        record.order = Some(facts.order);
        record.linkage = Some(facts.linkage);
        Ok(record)
    }

    /// Timing facts are optional: failures are logged and recorded as absence
    async fn fetch_timestamps(&self, order_id: &str, tour_id: Option<&str>) -> Option<TourTimestamps> {
        let tour_id = tour_id?;
        match self.gateway.tour_timestamps(tour_id).await {
            Ok(timestamps) => timestamps,
            Err(error) => {
                warn!(
                    order_id = %order_id,
                    tour_id = %tour_id,
                    error = %error,
                    "Timing facts unavailable, continuing without them"
                );
                None
            }
        }
    }
}
