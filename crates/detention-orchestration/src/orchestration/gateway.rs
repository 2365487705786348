//! # Protected Gateway
//!
//! Single entry point for every downstream call. Each call is wrapped, from
//! the outside in, as:
//!
//! ```text
//! dedup (reads only) -> retry with backoff -> credential -> circuit breaker -> call
//! ```
//!
//! Authentication failures invalidate the shared credential and are returned
//! without retry; circuit-open rejections are returned without retry and the
//! breaker's own cooldown governs recovery.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use detention_shared::models::{NewPricingLine, OrderFacts, OrderView, PricingLine, TourTimestamps};
use detention_shared::resilience::{CircuitBreaker, RetryPolicy};
use detention_shared::{
    DetentionError, DetentionResult, OrderFactsSource, OrderMutationSink, TimestampFactsSource,
};

use super::breakers::DependencyBreakers;
use super::credentials::CredentialManager;
use super::deduplicator::RequestDeduplicator;
use super::lifecycle::retry::retry_with_policy;

#[derive(Debug, Clone)]
pub struct ProtectedGateway {
    order_facts: Arc<dyn OrderFactsSource>,
    timestamps: Arc<dyn TimestampFactsSource>,
    mutations: Arc<dyn OrderMutationSink>,
    credentials: Arc<CredentialManager>,
    breakers: DependencyBreakers,
    retry: RetryPolicy,
    facts_dedup: Arc<RequestDeduplicator<OrderFacts>>,
    timestamps_dedup: Arc<RequestDeduplicator<Option<TourTimestamps>>>,
}

impl ProtectedGateway {
    pub fn new(
        order_facts: Arc<dyn OrderFactsSource>,
        timestamps: Arc<dyn TimestampFactsSource>,
        mutations: Arc<dyn OrderMutationSink>,
        credentials: Arc<CredentialManager>,
        breakers: DependencyBreakers,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            order_facts,
            timestamps,
            mutations,
            credentials,
            breakers,
            retry,
            facts_dedup: Arc::new(RequestDeduplicator::new("order_facts")),
            timestamps_dedup: Arc::new(RequestDeduplicator::new("timestamps")),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn breakers(&self) -> &DependencyBreakers {
        &self.breakers
    }

    async fn guarded<T, F, Fut>(
        &self,
        operation: &'static str,
        breaker: &CircuitBreaker,
        call: F,
    ) -> DetentionResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = DetentionResult<T>>,
    {
        retry_with_policy(&self.retry, operation, |attempt| {
            let call = &call;
            async move {
                let credential = self.credentials.ensure().await?;
                if attempt > 1 {
                    debug!(operation, attempt, "Retrying downstream call");
                }
                let result = breaker.call(|| call(credential.token)).await;
                if let Err(DetentionError::Authentication(reason)) = &result {
                    debug!(operation, reason = %reason, "Authentication rejected");
                    self.credentials.invalidate();
                }
                result
            }
        })
        .await
    }

    /// Order view and execution linkage; concurrent lookups of one order share a request
    pub async fn order_facts(&self, order_id: &str) -> DetentionResult<OrderFacts> {
        let this = self.clone();
        let id = order_id.to_string();
        self.facts_dedup
            .run(format!("order_facts:{order_id}"), move || async move {
                let source = Arc::clone(&this.order_facts);
                this.guarded("order_facts", &this.breakers.order_facts, |token| {
                    let source = Arc::clone(&source);
                    let id = id.clone();
                    async move { source.order_facts(&token, &id).await }
                })
                .await
            })
            .await
    }

    /// Fresh mutable snapshot; never deduplicated
    pub async fn order_snapshot(&self, order_id: &str) -> DetentionResult<OrderView> {
        self.guarded("order_snapshot", &self.breakers.order_facts, |token| {
            let source = Arc::clone(&self.order_facts);
            async move { source.order_snapshot(&token, order_id).await }
        })
        .await
    }

    /// Tour timing facts; orders sharing a tour share the lookup
    pub async fn tour_timestamps(&self, tour_id: &str) -> DetentionResult<Option<TourTimestamps>> {
        let this = self.clone();
        let id = tour_id.to_string();
        self.timestamps_dedup
            .run(format!("timestamps:{tour_id}"), move || async move {
                let source = Arc::clone(&this.timestamps);
                this.guarded("tour_timestamps", &this.breakers.timestamps, |token| {
                    let source = Arc::clone(&source);
                    let id = id.clone();
                    async move { source.tour_timestamps(&token, &id).await }
                })
                .await
            })
            .await
    }

    pub async fn update_order(
        &self,
        order_id: &str,
        version: u64,
        pricing_lines: Vec<PricingLine>,
    ) -> DetentionResult<u64> {
        self.guarded("update_order", &self.breakers.order_mutation, |token| {
            let sink = Arc::clone(&self.mutations);
            let lines = pricing_lines.clone();
            async move { sink.update_order(&token, order_id, version, lines).await }
        })
        .await
    }

    pub async fn append_pricing_line(
        &self,
        order_id: &str,
        version: u64,
        line: NewPricingLine,
    ) -> DetentionResult<u64> {
        self.guarded("append_pricing_line", &self.breakers.order_mutation, |token| {
            let sink = Arc::clone(&self.mutations);
            let line = line.clone();
            async move { sink.append_pricing_line(&token, order_id, version, line).await }
        })
        .await
    }

    pub async fn append_comment(
        &self,
        order_id: &str,
        version: u64,
        comment: &str,
    ) -> DetentionResult<u64> {
        self.guarded("append_comment", &self.breakers.order_mutation, |token| {
            let sink = Arc::clone(&self.mutations);
            async move { sink.append_comment(&token, order_id, version, comment).await }
        })
        .await
    }
}
