use std::sync::Arc;

use rust_decimal::Decimal;

use detention_shared::config::{ConfigurationError, DetentionConfig};
use detention_shared::models::{
    BillingRules, ExecutionLinkage, FreeTimeTable, LoadType, OrderFacts, OrderStatus, OrderView,
    PricingLine, RateUnit, StaticRulesCatalog, Stop, StopTimestamps, StopType, TourTimestamps,
};

use super::{FakeCredentialProvider, FakeOrderBackend, FakeTimestampSource, ScriptedPresenter};
use crate::orchestration::checkpoint::InMemoryCheckpointStore;
use crate::system_context::{Collaborators, SystemContext};

pub const MINUTE_MS: i64 = 60_000;
pub const PLANNED_DEPARTURE_MS: i64 = 1_700_000_000_000;

/// $2/min, 60 free minutes on live stops, $100 cap, auto-charge, no approval
pub fn scenario_rules(shipper: &str) -> BillingRules {
    BillingRules::builder()
        .shipper(shipper)
        .rate(Decimal::new(2, 0))
        .rate_unit(RateUnit::PerMinute)
        .max_charge(Decimal::new(100, 0))
        .free_time(FreeTimeTable::live_only(60))
        .auto_charge_allowed(true)
        .build()
}

/// Delivered order with one live pickup executed on `tour_id`
pub fn live_pickup_order(order_id: &str, shipper: &str, tour_id: &str) -> OrderFacts {
    OrderFacts {
        order: OrderView {
            order_id: order_id.to_string(),
            status: OrderStatus::Delivered,
            shipper_name: shipper.to_string(),
            version: 1,
            stops: vec![Stop {
                stop_type: StopType::Pickup,
                load_type: LoadType::Live,
                location: Some("Dock 4".to_string()),
            }],
            pricing_lines: vec![PricingLine {
                line_id: format!("{order_id}-LINEHAUL"),
                charge_code: "LINEHAUL".to_string(),
                amount: Decimal::new(1200, 0),
                stop_index: None,
                description: None,
            }],
        },
        linkage: ExecutionLinkage {
            tour_id: Some(tour_id.to_string()),
            lane_ids: Vec::new(),
        },
    }
}

/// Zero-amount detention line reserved against `stop_index`
pub fn hold_line(order_id: &str, stop_index: usize) -> PricingLine {
    PricingLine {
        line_id: format!("{order_id}-HOLD-{stop_index}"),
        charge_code: "DETENTION".to_string(),
        amount: Decimal::ZERO,
        stop_index: Some(stop_index),
        description: Some("Detention hold".to_string()),
    }
}

/// Arrived on plan; departed `minutes_late` after the planned departure
pub fn departed_late(tour_id: &str, minutes_late: i64) -> TourTimestamps {
    TourTimestamps {
        tour_id: tour_id.to_string(),
        stops: vec![StopTimestamps {
            planned_arrival: Some(PLANNED_DEPARTURE_MS - 120 * MINUTE_MS),
            actual_arrival: Some(PLANNED_DEPARTURE_MS - 120 * MINUTE_MS),
            planned_departure: Some(PLANNED_DEPARTURE_MS),
            actual_departure: Some(PLANNED_DEPARTURE_MS + minutes_late * MINUTE_MS),
        }],
    }
}

/// Configuration with short delays so runs finish quickly under test
pub fn test_config() -> DetentionConfig {
    let mut config = DetentionConfig::default();
    config.batch.chunk_size = 10;
    config.batch.parallel_group_size = 5;
    config.batch.inter_chunk_cooldown_ms = 0;
    config.batch.pause_poll_interval_ms = 10;
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.rate_limit_cooldown_ms = 1;
    config.retry.jitter_ratio = 0.0;
    config.approval.timeout_seconds = 5;
    config
}

/// Fakes plus a [`SystemContext`] wired to them
#[derive(Debug)]
pub struct TestHarness {
    pub backend: Arc<FakeOrderBackend>,
    pub timestamps: Arc<FakeTimestampSource>,
    pub credentials: Arc<FakeCredentialProvider>,
    pub presenter: Arc<ScriptedPresenter>,
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    pub context: SystemContext,
}

impl TestHarness {
    pub fn new(
        config: DetentionConfig,
        rules: impl IntoIterator<Item = BillingRules>,
    ) -> Result<Self, ConfigurationError> {
        let backend = Arc::new(FakeOrderBackend::new());
        let timestamps = Arc::new(FakeTimestampSource::new());
        let credentials = Arc::new(FakeCredentialProvider::new());
        let presenter = Arc::new(ScriptedPresenter::default());
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());

        let collaborators = Collaborators {
            order_facts: backend.clone(),
            timestamps: timestamps.clone(),
            mutations: backend.clone(),
            credentials: credentials.clone(),
            rules: Arc::new(StaticRulesCatalog::new(rules)),
            presenter: presenter.clone(),
        };
        let context =
            SystemContext::new(config, collaborators)?.with_checkpoint_store(checkpoints.clone());

        Ok(Self {
            backend,
            timestamps,
            credentials,
            presenter,
            checkpoints,
            context,
        })
    }

    /// Live-pickup order on tour `TOUR-<order_id>` that departed `minutes_late`
    pub fn add_late_order(&self, order_id: &str, shipper: &str, minutes_late: i64) {
        let tour_id = format!("TOUR-{order_id}");
        self.backend
            .insert(live_pickup_order(order_id, shipper, &tour_id));
        self.timestamps.insert(departed_late(&tour_id, minutes_late));
    }

    /// Like [`add_late_order`](Self::add_late_order) with a zero-amount hold on the stop
    pub fn add_late_order_with_hold(&self, order_id: &str, shipper: &str, minutes_late: i64) {
        let tour_id = format!("TOUR-{order_id}");
        let mut facts = live_pickup_order(order_id, shipper, &tour_id);
        facts.order.pricing_lines.push(hold_line(order_id, 0));
        self.backend.insert(facts);
        self.timestamps.insert(departed_late(&tour_id, minutes_late));
    }
}
