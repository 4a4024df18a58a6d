//! Per-platform call path: adapter + rate limiter + retry policy.
//!
//! Limiter and retry state belong to one [`PlatformLink`] and are never shared
//! across platforms.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::domain::TransferError;
use super::rate_limit::RateLimiter;
use super::retry::RetryExecutor;
use super::traits::PlatformAdapter;
use crate::model::Platform;

/// One platform's adapter wrapped with its limiter and retry policy.
#[derive(Clone)]
pub struct PlatformLink {
    pub platform: Platform,
    adapter: Arc<dyn PlatformAdapter>,
    limiter: Arc<RateLimiter>,
    retry: RetryExecutor,
}

impl PlatformLink {
    pub fn new(
        platform: Platform,
        adapter: Arc<dyn PlatformAdapter>,
        limiter: RateLimiter,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            platform,
            adapter,
            limiter: Arc::new(limiter),
            retry,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn PlatformAdapter> {
        &self.adapter
    }

    /// Run one adapter operation: every attempt waits for a rate-limit slot,
    /// transient failures are retried up to `attempts` times.
    pub async fn call<T, F, Fut>(&self, attempts: u32, mut operation: F) -> Result<T, TransferError>
    where
        F: FnMut(Arc<dyn PlatformAdapter>) -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        self.retry
            .execute(
                || {
                    let pending = operation(Arc::clone(&self.adapter));
                    let limiter = Arc::clone(&self.limiter);
                    async move {
                        limiter.wait_for_slot().await;
                        pending.await
                    }
                },
                attempts,
            )
            .await
    }
}

/// The set of platforms the engine can talk to.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    links: HashMap<Platform, PlatformLink>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, link: PlatformLink) {
        self.links.insert(link.platform, link);
    }

    pub fn with(mut self, link: PlatformLink) -> Self {
        self.register(link);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformLink> {
        self.links.get(&platform)
    }

    /// Link for `platform`, or a validation error naming it.
    pub fn require(&self, platform: Platform) -> Result<&PlatformLink, TransferError> {
        self.get(platform).ok_or_else(|| {
            TransferError::Validation(format!("no adapter configured for {}", platform.display_name()))
        })
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.links.keys().copied().collect();
        platforms.sort();
        platforms
    }
}
