//! # Collaborator Interfaces
//!
//! The engine talks to the outside world only through these traits. Concrete
//! HTTP clients live outside this workspace; tests substitute in-memory fakes.
//!
//! Every mutation is keyed by the `version` of the most recent read and fails
//! with [`DetentionError::VersionConflict`](crate::errors::DetentionError::VersionConflict)
//! when the order changed underneath it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::DetentionResult;
use crate::models::{BillingRules, NewPricingLine, OrderFacts, OrderView, PricingLine, TourTimestamps};

/// Read-only shipper → rules mapping
pub trait BillingRulesSource: Send + Sync + std::fmt::Debug {
    fn rules_for(&self, shipper: &str) -> Option<Arc<BillingRules>>;
}

#[async_trait]
pub trait OrderFactsSource: Send + Sync + std::fmt::Debug {
    /// Order view, status, pricing lines and execution linkage
    async fn order_facts(&self, token: &str, order_id: &str) -> DetentionResult<OrderFacts>;

    /// Current mutable snapshot, used immediately before writes
    async fn order_snapshot(&self, token: &str, order_id: &str) -> DetentionResult<OrderView>;
}

#[async_trait]
pub trait TimestampFactsSource: Send + Sync + std::fmt::Debug {
    /// `Ok(None)` when the tour has no timing data yet
    async fn tour_timestamps(
        &self,
        token: &str,
        tour_id: &str,
    ) -> DetentionResult<Option<TourTimestamps>>;
}

#[async_trait]
pub trait OrderMutationSink: Send + Sync + std::fmt::Debug {
    /// Replace the order's pricing lines wholesale; returns the new version
    async fn update_order(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        pricing_lines: Vec<PricingLine>,
    ) -> DetentionResult<u64>;

    /// Append one pricing line; returns the new version
    async fn append_pricing_line(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        line: NewPricingLine,
    ) -> DetentionResult<u64>;

    async fn append_comment(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        comment: &str,
    ) -> DetentionResult<u64>;
}

/// Raw token acquisition; lifetime bookkeeping is the credential manager's job
#[async_trait]
pub trait CredentialProvider: Send + Sync + std::fmt::Debug {
    /// A token already present in the ambient session context, if any
    fn ambient_token(&self) -> Option<String>;

    /// Acquire a brand-new token over the network
    async fn refresh(&self) -> DetentionResult<String>;
}
