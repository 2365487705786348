//! # System Context
//!
//! Owns the shared resources of the engine (circuit breakers, credential
//! manager, deduplicating gateway, approval gate, checkpoint store) and hands
//! out components wired to them. Nothing is ambient: two contexts built from
//! the same collaborators share no state.

use std::sync::Arc;

use tracing::info;

use detention_shared::config::{ConfigurationError, DetentionConfig};
use detention_shared::interfaces::{
    BillingRulesSource, CredentialProvider, OrderFactsSource, OrderMutationSink,
    TimestampFactsSource,
};

use crate::orchestration::analyzer::DetentionAnalyzer;
use crate::orchestration::approval::{ApprovalGate, ApprovalPresenter};
use crate::orchestration::batch::BatchOrchestrator;
use crate::orchestration::breakers::DependencyBreakers;
use crate::orchestration::checkpoint::{
    CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore,
};
use crate::orchestration::credentials::CredentialManager;
use crate::orchestration::gateway::ProtectedGateway;
use crate::orchestration::lifecycle::{ActionExecutor, OrderPipeline};

/// External systems the engine talks to
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub order_facts: Arc<dyn OrderFactsSource>,
    pub timestamps: Arc<dyn TimestampFactsSource>,
    pub mutations: Arc<dyn OrderMutationSink>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub rules: Arc<dyn BillingRulesSource>,
    pub presenter: Arc<dyn ApprovalPresenter>,
}

#[derive(Debug, Clone)]
pub struct SystemContext {
    pub config: Arc<DetentionConfig>,
    pub breakers: DependencyBreakers,
    pub credentials: Arc<CredentialManager>,
    pub gateway: ProtectedGateway,
    pub rules: Arc<dyn BillingRulesSource>,
    pub analyzer: DetentionAnalyzer,
    pub approval_gate: ApprovalGate,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl SystemContext {
    /// Validate `config` and wire the shared resources around `collaborators`
    pub fn new(
        config: DetentionConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let breakers = DependencyBreakers::from_settings(&config.circuit_breakers);
        let credentials = Arc::new(CredentialManager::new(
            collaborators.credentials,
            config.credentials.clone(),
        ));
        let gateway = ProtectedGateway::new(
            collaborators.order_facts,
            collaborators.timestamps,
            collaborators.mutations,
            Arc::clone(&credentials),
            breakers.clone(),
            config.retry.to_policy(),
        );
        let checkpoints: Arc<dyn CheckpointStore> = match &config.checkpoint.directory {
            Some(directory) => Arc::new(FileCheckpointStore::new(directory.clone())),
            None => Arc::new(InMemoryCheckpointStore::new()),
        };

        info!(
            chunk_size = config.batch.chunk_size,
            parallel_group_size = config.batch.parallel_group_size,
            file_checkpoints = config.checkpoint.directory.is_some(),
            "System context initialized"
        );

        Ok(Self {
            analyzer: DetentionAnalyzer::new(config.analyzer.clone()),
            approval_gate: ApprovalGate::new(collaborators.presenter, config.approval.timeout()),
            rules: collaborators.rules,
            config: Arc::new(config),
            breakers,
            credentials,
            gateway,
            checkpoints,
        })
    }

    /// Replace the checkpoint store chosen from configuration
    #[must_use]
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = store;
        self
    }

    pub fn order_pipeline(&self) -> OrderPipeline {
        OrderPipeline::new(
            self.gateway.clone(),
            Arc::clone(&self.rules),
            self.analyzer.clone(),
        )
    }

    pub fn action_executor(&self) -> ActionExecutor {
        ActionExecutor::new(
            self.gateway.clone(),
            self.config.analyzer.detention_charge_code.clone(),
        )
    }

    /// A fresh orchestrator for one run
    pub fn batch_orchestrator(&self) -> BatchOrchestrator {
        BatchOrchestrator::new(
            &self.config,
            self.order_pipeline(),
            self.action_executor(),
            self.approval_gate.clone(),
            Arc::clone(&self.credentials),
            Arc::clone(&self.checkpoints),
        )
    }
}
