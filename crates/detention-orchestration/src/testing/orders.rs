use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use detention_shared::interfaces::{OrderFactsSource, OrderMutationSink, TimestampFactsSource};
use detention_shared::models::{
    ExecutionLinkage, NewPricingLine, OrderFacts, OrderView, PricingLine, TourTimestamps,
};
use detention_shared::{DetentionError, DetentionResult};

use super::lock;

/// Order system with optimistic versioning
#[derive(Debug, Default)]
pub struct FakeOrderBackend {
    orders: Mutex<HashMap<String, (OrderView, ExecutionLinkage)>>,
    facts_delay: Mutex<Duration>,
    facts_calls: AtomicUsize,
    snapshot_calls: AtomicUsize,
    write_calls: AtomicUsize,
    next_line: AtomicUsize,
    facts_failures: Mutex<VecDeque<DetentionError>>,
    write_failures: Mutex<VecDeque<DetentionError>>,
    concurrent_edit_pending: AtomicBool,
    comments: Mutex<Vec<(String, String)>>,
    tokens_seen: Mutex<Vec<String>>,
}

impl FakeOrderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, facts: OrderFacts) {
        lock(&self.orders).insert(facts.order.order_id.clone(), (facts.order, facts.linkage));
    }

    pub fn order(&self, order_id: &str) -> Option<OrderView> {
        lock(&self.orders).get(order_id).map(|(view, _)| view.clone())
    }

    /// Every `order_facts` call sleeps for `delay` first
    pub fn set_facts_delay(&self, delay: Duration) {
        *lock(&self.facts_delay) = delay;
    }

    pub fn facts_calls(&self) -> usize {
        self.facts_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    /// Attempted writes, including rejected ones
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        lock(&self.comments).clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        lock(&self.tokens_seen).clone()
    }

    /// The next `times` fact reads fail with `error`
    pub fn fail_facts(&self, times: usize, error: DetentionError) {
        let mut failures = lock(&self.facts_failures);
        failures.extend((0..times).map(|_| error.clone()));
    }

    pub fn fail_next_write(&self, error: DetentionError) {
        lock(&self.write_failures).push_back(error);
    }

    /// Another writer bumps the order version just before the next write
    pub fn edit_concurrently_before_next_write(&self) {
        self.concurrent_edit_pending.store(true, Ordering::SeqCst);
    }

    fn write(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        apply: impl FnOnce(&mut OrderView),
    ) -> DetentionResult<u64> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.tokens_seen).push(token.to_string());
        if let Some(error) = lock(&self.write_failures).pop_front() {
            return Err(error);
        }

        let mut orders = lock(&self.orders);
        let (view, _) = orders
            .get_mut(order_id)
            .ok_or_else(|| DetentionError::BusinessRule(format!("order {order_id} not found")))?;

        if self.concurrent_edit_pending.swap(false, Ordering::SeqCst) {
            view.version += 1;
        }
        if view.version != version {
            return Err(DetentionError::version_conflict(order_id, version));
        }

        apply(view);
        view.version += 1;
        Ok(view.version)
    }
}

#[async_trait]
impl OrderFactsSource for FakeOrderBackend {
    async fn order_facts(&self, token: &str, order_id: &str) -> DetentionResult<OrderFacts> {
        self.facts_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.tokens_seen).push(token.to_string());
        let delay = *lock(&self.facts_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = lock(&self.facts_failures).pop_front() {
            return Err(error);
        }
        lock(&self.orders)
            .get(order_id)
            .map(|(order, linkage)| OrderFacts {
                order: order.clone(),
                linkage: linkage.clone(),
            })
            .ok_or_else(|| DetentionError::BusinessRule(format!("order {order_id} not found")))
    }

    async fn order_snapshot(&self, _token: &str, order_id: &str) -> DetentionResult<OrderView> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.order(order_id)
            .ok_or_else(|| DetentionError::BusinessRule(format!("order {order_id} not found")))
    }
}

#[async_trait]
impl OrderMutationSink for FakeOrderBackend {
    async fn update_order(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        pricing_lines: Vec<PricingLine>,
    ) -> DetentionResult<u64> {
        self.write(token, order_id, version, |view| {
            view.pricing_lines = pricing_lines;
        })
    }

    async fn append_pricing_line(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        line: NewPricingLine,
    ) -> DetentionResult<u64> {
        let line_id = format!("NEW-{}", self.next_line.fetch_add(1, Ordering::SeqCst) + 1);
        self.write(token, order_id, version, |view| {
            view.pricing_lines.push(PricingLine {
                line_id,
                charge_code: line.charge_code,
                amount: line.amount,
                stop_index: Some(line.stop_index),
                description: Some(line.description),
            });
        })
    }

    async fn append_comment(
        &self,
        token: &str,
        order_id: &str,
        version: u64,
        comment: &str,
    ) -> DetentionResult<u64> {
        let version = self.write(token, order_id, version, |_| {})?;
        lock(&self.comments).push((order_id.to_string(), comment.to_string()));
        Ok(version)
    }
}

/// Tour timing data keyed by tour id; unknown tours have no data yet
#[derive(Debug, Default)]
pub struct FakeTimestampSource {
    tours: Mutex<HashMap<String, TourTimestamps>>,
    calls: AtomicUsize,
    failures: Mutex<VecDeque<DetentionError>>,
}

impl FakeTimestampSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, timestamps: TourTimestamps) {
        lock(&self.tours).insert(timestamps.tour_id.clone(), timestamps);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, error: DetentionError) {
        lock(&self.failures).push_back(error);
    }
}

#[async_trait]
impl TimestampFactsSource for FakeTimestampSource {
    async fn tour_timestamps(
        &self,
        _token: &str,
        tour_id: &str,
    ) -> DetentionResult<Option<TourTimestamps>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        Ok(lock(&self.tours).get(tour_id).cloned())
    }
}
