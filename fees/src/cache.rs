//! Fee quote caching with TTL support.
//!
//! The cache belongs to the provider it wraps and has its own expiry; the
//! route planner always builds a fresh graph and never shares fee state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fxroute_common::CurrencyPair;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::FeeResult;
use crate::provider::{FeeProvider, FeeQuote};

/// Cached quote entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    quote: FeeQuote,
    cached_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn new(quote: FeeQuote, ttl: Duration) -> Self {
        Self {
            quote,
            cached_at: Utc::now(),
            ttl,
        }
    }

    fn is_valid(&self) -> bool {
        Utc::now().signed_duration_since(self.cached_at) < self.ttl
    }
}

/// Configuration for the fee cache.
#[derive(Debug, Clone)]
pub struct FeeCacheConfig {
    /// Default TTL for cached quotes.
    pub default_ttl: Duration,
    /// Maximum number of entries.
    pub max_entries: usize,
}

impl Default for FeeCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::seconds(30),
            max_entries: 10000,
        }
    }
}

type CacheKey = (CurrencyPair, Decimal);

/// Fee provider wrapper that remembers answers for a bounded time.
///
/// `NoRoute` answers are cached like priced ones; errors never are.
pub struct CachedFeeProvider {
    inner: Arc<dyn FeeProvider>,
    cache: DashMap<CacheKey, CacheEntry>,
    config: FeeCacheConfig,
}

impl CachedFeeProvider {
    pub fn new(inner: Arc<dyn FeeProvider>) -> Self {
        Self::with_config(inner, FeeCacheConfig::default())
    }

    pub fn with_config(inner: Arc<dyn FeeProvider>, config: FeeCacheConfig) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            config,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<FeeQuote> {
        if let Some(entry) = self.cache.get(key) {
            if entry.is_valid() {
                debug!(pair = %key.0, "Fee cache hit");
                return Some(entry.quote.clone());
            }
            debug!(pair = %key.0, "Fee cache entry expired");
            drop(entry);
            self.cache.remove(key);
        }

        debug!(pair = %key.0, "Fee cache miss");
        None
    }

    fn insert(&self, key: CacheKey, quote: FeeQuote) {
        if self.config.max_entries == 0 {
            return;
        }

        if !self.cache.contains_key(&key) && self.cache.len() >= self.config.max_entries {
            self.evict_expired();
            while self.cache.len() >= self.config.max_entries {
                if !self.evict_oldest() {
                    break;
                }
            }
        }
        self.cache.insert(key, CacheEntry::new(quote, self.config.default_ttl));
    }

    /// Drop the entry cached longest ago. Returns false when the cache is empty.
    fn evict_oldest(&self) -> bool {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                debug!(pair = %key.0, amount = %key.1, "Fee cache full, evicting oldest entry");
                self.cache.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Forget the cached quote for a pair, at every notional amount.
    pub fn invalidate(&self, pair: &CurrencyPair) {
        self.cache.retain(|(cached_pair, _), _| cached_pair != pair);
    }

    /// Clear all cached quotes.
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries.
    pub fn evict_expired(&self) {
        self.cache.retain(|_, entry| entry.is_valid());
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.cache.len();
        let valid = self.cache.iter().filter(|e| e.is_valid()).count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
        }
    }
}

#[async_trait]
impl FeeProvider for CachedFeeProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn quote(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<FeeQuote> {
        let key = (pair.clone(), amount.normalize());
        if let Some(quote) = self.get(&key) {
            return Ok(quote);
        }

        let quote = self.inner.quote(pair, amount).await?;
        self.insert(key, quote.clone());
        Ok(quote)
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockFeeProvider;
    use rust_decimal_macros::dec;
    use std::time::Duration as StdDuration;

    fn mock() -> Arc<MockFeeProvider> {
        Arc::new(MockFeeProvider::new("mock").with_fee("BTC", "MXN", dec!(0.0065)))
    }

    #[tokio::test]
    async fn test_cache_hit() {
        let inner = mock();
        let cached = CachedFeeProvider::new(inner.clone());
        let pair = CurrencyPair::new("BTC", "MXN");

        let first = cached.quote(&pair, dec!(1)).await.unwrap();
        let second = cached.quote(&pair, dec!(1.00)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls(), 1);
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.name(), "mock");
    }

    #[tokio::test]
    async fn test_amount_is_part_of_key() {
        let inner = mock();
        let cached = CachedFeeProvider::new(inner.clone());
        let pair = CurrencyPair::new("BTC", "MXN");

        cached.quote(&pair, dec!(1)).await.unwrap();
        cached.quote(&pair, dec!(2)).await.unwrap();

        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_route_cached() {
        let inner = mock();
        let cached = CachedFeeProvider::new(inner.clone());
        let pair = CurrencyPair::new("ARS", "SOL");

        assert!(cached.quote(&pair, dec!(1)).await.unwrap().is_no_route());
        assert!(cached.quote(&pair, dec!(1)).await.unwrap().is_no_route());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let inner = mock();
        let pair = CurrencyPair::new("MXN", "BTC");
        inner.fail_pair(pair.clone(), "timeout");
        let cached = CachedFeeProvider::new(inner.clone());

        assert!(cached.quote(&pair, dec!(1)).await.is_err());
        assert!(cached.quote(&pair, dec!(1)).await.is_err());
        assert_eq!(inner.calls(), 2);
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let inner = mock();
        let config = FeeCacheConfig {
            default_ttl: Duration::milliseconds(50),
            ..Default::default()
        };
        let cached = CachedFeeProvider::with_config(inner.clone(), config);
        let pair = CurrencyPair::new("BTC", "MXN");

        cached.quote(&pair, dec!(1)).await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(60)).await;

        let stats = cached.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 1);

        cached.quote(&pair, dec!(1)).await.unwrap();
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_max_entries_enforced() {
        let inner = mock();
        let config = FeeCacheConfig {
            max_entries: 2,
            ..Default::default()
        };
        let cached = CachedFeeProvider::with_config(inner.clone(), config);
        let pair = CurrencyPair::new("BTC", "MXN");

        for amount in [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)] {
            cached.quote(&pair, amount).await.unwrap();
            assert!(cached.len() <= 2);
        }
        assert_eq!(cached.len(), 2);
        assert_eq!(inner.calls(), 5);

        // The latest answer survives eviction
        cached.quote(&pair, dec!(5)).await.unwrap();
        assert_eq!(inner.calls(), 5);
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_caching() {
        let inner = mock();
        let config = FeeCacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        let cached = CachedFeeProvider::with_config(inner.clone(), config);
        let pair = CurrencyPair::new("BTC", "MXN");

        cached.quote(&pair, dec!(1)).await.unwrap();
        cached.quote(&pair, dec!(1)).await.unwrap();

        assert!(cached.is_empty());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let inner = mock();
        let cached = CachedFeeProvider::new(inner.clone());
        let pair = CurrencyPair::new("BTC", "MXN");

        cached.quote(&pair, dec!(1)).await.unwrap();
        cached.quote(&pair, dec!(2)).await.unwrap();
        cached.quote(&CurrencyPair::new("ARS", "SOL"), dec!(1)).await.unwrap();
        assert_eq!(cached.len(), 3);

        cached.invalidate(&pair);
        assert_eq!(cached.len(), 1);

        cached.clear();
        assert!(cached.is_empty());
    }
}
