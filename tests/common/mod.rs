//! Shared wiring for the end-to-end suites.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use detention_core::shared::config::DetentionConfig;
use detention_core::shared::models::{BillingRules, StaticRulesCatalog};
use detention_core::{Collaborators, SystemContext};
use detention_orchestration::testing::fixtures::{self, test_config};
use detention_orchestration::testing::{
    FakeCredentialProvider, FakeOrderBackend, FakeTimestampSource, ScriptedPresenter,
};

/// Fakes that outlive any single [`SystemContext`], standing in for the
/// external systems across a simulated restart
#[derive(Debug, Clone)]
pub struct World {
    pub backend: Arc<FakeOrderBackend>,
    pub timestamps: Arc<FakeTimestampSource>,
    pub credentials: Arc<FakeCredentialProvider>,
    pub presenter: Arc<ScriptedPresenter>,
    pub rules: Arc<StaticRulesCatalog>,
}

impl World {
    pub fn new(rules: impl IntoIterator<Item = BillingRules>) -> Self {
        detention_core::shared::logging::init_tracing();
        Self {
            backend: Arc::new(FakeOrderBackend::new()),
            timestamps: Arc::new(FakeTimestampSource::new()),
            credentials: Arc::new(FakeCredentialProvider::new()),
            presenter: Arc::new(ScriptedPresenter::default()),
            rules: Arc::new(StaticRulesCatalog::new(rules)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            order_facts: self.backend.clone(),
            timestamps: self.timestamps.clone(),
            mutations: self.backend.clone(),
            credentials: self.credentials.clone(),
            rules: self.rules.clone(),
            presenter: self.presenter.clone(),
        }
    }

    /// A new context over the same fakes, as a restarted process would build
    pub fn context(&self, config: DetentionConfig) -> anyhow::Result<SystemContext> {
        Ok(SystemContext::new(config, self.collaborators())?)
    }

    pub fn add_late_order(&self, order_id: &str, shipper: &str, minutes_late: i64) {
        let tour_id = format!("TOUR-{order_id}");
        self.backend
            .insert(fixtures::live_pickup_order(order_id, shipper, &tour_id));
        self.timestamps
            .insert(fixtures::departed_late(&tour_id, minutes_late));
    }
}

/// Test configuration with checkpoints written under `directory`
pub fn file_backed_config(directory: &Path) -> DetentionConfig {
    let mut config = test_config();
    config.checkpoint.directory = Some(directory.to_path_buf());
    config
}

pub fn order_ids(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}-{i:02}")).collect()
}
