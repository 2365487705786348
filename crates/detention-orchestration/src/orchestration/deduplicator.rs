//! # Request Deduplicator
//!
//! Collapses concurrent identical lookups. The first caller for a key starts
//! the request; callers arriving while it is in flight await the same shared
//! outcome. The key is released as soon as the request settles, so later
//! callers always issue a fresh request.

use std::future::Future;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use detention_shared::DetentionResult;

type SharedRequest<T> = Shared<BoxFuture<'static, DetentionResult<T>>>;

#[derive(Debug)]
pub struct RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    name: &'static str,
    in_flight: DashMap<String, SharedRequest<T>>,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            in_flight: DashMap::new(),
        }
    }

    /// Keys currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub async fn run<F, Fut>(&self, key: impl Into<String>, request: F) -> DetentionResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DetentionResult<T>> + Send + 'static,
    {
        let key = key.into();

        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().peek().is_none() {
                    debug!(deduplicator = self.name, key = %key, "Joining in-flight request");
                    entry.get().clone()
                } else {
                    let fresh = request().boxed().shared();
                    entry.insert(fresh.clone());
                    fresh
                }
            }
            Entry::Vacant(entry) => {
                let fresh = request().boxed().shared();
                entry.insert(fresh.clone());
                fresh
            }
        };

        let outcome = shared.clone().await;
        self.in_flight
            .remove_if(&key, |_, pending| pending.ptr_eq(&shared));
        outcome
    }
}
