pub mod analyzer;
pub mod approval;
pub mod batch;
pub mod breakers;
pub mod checkpoint;
pub mod credentials;
pub mod deduplicator;
pub mod gateway;
pub mod lifecycle;
pub mod report;

pub use analyzer::DetentionAnalyzer;
pub use approval::{
    ApprovalDecision, ApprovalGate, ApprovalOutcome, ApprovalPresenter, ApprovalPrompt,
    ApprovalRequest, ApprovalResponder, ChannelPresenter,
};
pub use batch::{BatchController, BatchOrchestrator, BatchProgress, BatchState, BatchSummary};
pub use breakers::DependencyBreakers;
pub use checkpoint::{
    BatchCheckpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore,
};
pub use credentials::CredentialManager;
pub use deduplicator::RequestDeduplicator;
pub use gateway::ProtectedGateway;
pub use lifecycle::{ActionExecutor, OrderFailure, OrderPipeline};
pub use report::{render_csv, render_text};
