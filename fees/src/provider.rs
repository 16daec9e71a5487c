//! Fee provider trait and quote type.

use async_trait::async_trait;
use fxroute_common::CurrencyPair;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeeResult;

/// Answer from a fee provider for one directed pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeeQuote {
    /// The pair is tradable; `fee_fraction` of the value is lost on the hop.
    ///
    /// The fraction is passed through untouched. Values outside `(0, 1)`
    /// are the route planner's problem, not the provider's.
    Priced {
        pair: CurrencyPair,
        fee_fraction: Decimal,
        provider: String,
    },
    /// The provider has no market for the pair.
    NoRoute { pair: CurrencyPair, provider: String },
}

impl FeeQuote {
    pub fn priced(pair: CurrencyPair, fee_fraction: Decimal, provider: impl Into<String>) -> Self {
        FeeQuote::Priced {
            pair,
            fee_fraction,
            provider: provider.into(),
        }
    }

    pub fn no_route(pair: CurrencyPair, provider: impl Into<String>) -> Self {
        FeeQuote::NoRoute {
            pair,
            provider: provider.into(),
        }
    }

    pub fn pair(&self) -> &CurrencyPair {
        match self {
            FeeQuote::Priced { pair, .. } | FeeQuote::NoRoute { pair, .. } => pair,
        }
    }

    /// Label of the provider or venue that produced the quote.
    pub fn provider(&self) -> &str {
        match self {
            FeeQuote::Priced { provider, .. } | FeeQuote::NoRoute { provider, .. } => provider,
        }
    }

    pub fn fee_fraction(&self) -> Option<Decimal> {
        match self {
            FeeQuote::Priced { fee_fraction, .. } => Some(*fee_fraction),
            FeeQuote::NoRoute { .. } => None,
        }
    }

    pub fn is_no_route(&self) -> bool {
        matches!(self, FeeQuote::NoRoute { .. })
    }

    /// Absolute fee charged on `amount`, in the pair's `from` currency.
    pub fn fee_for(&self, amount: Decimal) -> Option<Decimal> {
        self.fee_fraction().map(|fraction| amount * fraction)
    }
}

/// Trait for fee providers.
///
/// Implementations may block on the network; callers treat `quote` as a
/// black box that either answers or fails.
#[async_trait]
pub trait FeeProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Quote the fee for converting `amount` units of `pair.from` into `pair.to`.
    async fn quote(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<FeeQuote>;
}

/// Mock fee provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockFeeProvider {
    name: String,
    entries: dashmap::DashMap<CurrencyPair, MockEntry>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
enum MockEntry {
    Fee(Decimal),
    Fail(String),
}

#[cfg(any(test, feature = "test-utils"))]
impl MockFeeProvider {
    /// Create a new mock provider. Unknown pairs answer `NoRoute`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: dashmap::DashMap::new(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the fee fraction for a pair.
    pub fn set_fee(&self, pair: CurrencyPair, fee_fraction: Decimal) {
        self.entries.insert(pair, MockEntry::Fee(fee_fraction));
    }

    /// Builder form of [`set_fee`](Self::set_fee).
    pub fn with_fee(self, from: &str, to: &str, fee_fraction: Decimal) -> Self {
        self.set_fee(CurrencyPair::new(from, to), fee_fraction);
        self
    }

    /// Make lookups for a pair fail.
    pub fn fail_pair(&self, pair: CurrencyPair, message: impl Into<String>) {
        self.entries.insert(pair, MockEntry::Fail(message.into()));
    }

    /// Number of quotes served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl FeeProvider for MockFeeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, pair: &CurrencyPair, _amount: Decimal) -> FeeResult<FeeQuote> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        match self.entries.get(pair).map(|e| e.clone()) {
            Some(MockEntry::Fee(fraction)) => Ok(FeeQuote::priced(pair.clone(), fraction, &self.name)),
            Some(MockEntry::Fail(message)) => Err(crate::FeeError::ProviderError(message)),
            None => Ok(FeeQuote::no_route(pair.clone(), &self.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeeError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_for_amount() {
        let quote = FeeQuote::priced(CurrencyPair::new("BTC", "MXN"), dec!(0.0065), "bitso");

        assert_eq!(quote.fee_for(dec!(1000)), Some(dec!(6.5)));
        assert_eq!(quote.provider(), "bitso");
        assert!(!quote.is_no_route());
    }

    #[test]
    fn test_no_route_has_no_fee() {
        let quote = FeeQuote::no_route(CurrencyPair::new("ARS", "SOL"), "bitso");

        assert!(quote.is_no_route());
        assert_eq!(quote.fee_fraction(), None);
        assert_eq!(quote.fee_for(dec!(1000)), None);
        assert_eq!(quote.pair(), &CurrencyPair::new("ARS", "SOL"));
    }

    #[test]
    fn test_quote_serialization_tags_status() {
        let quote = FeeQuote::no_route(CurrencyPair::new("ARS", "SOL"), "bitso");
        let json = serde_json::to_value(&quote).unwrap();

        assert_eq!(json["status"], "no_route");
        assert_eq!(json["provider"], "bitso");
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockFeeProvider::new("mock").with_fee("USDC", "MXN", dec!(0.01));
        provider.fail_pair(CurrencyPair::new("MXN", "USDC"), "boom");

        let priced = provider.quote(&CurrencyPair::new("USDC", "MXN"), dec!(1)).await.unwrap();
        assert_eq!(priced.fee_fraction(), Some(dec!(0.01)));

        let missing = provider.quote(&CurrencyPair::new("USDC", "ARS"), dec!(1)).await.unwrap();
        assert!(missing.is_no_route());

        let failed = provider.quote(&CurrencyPair::new("MXN", "USDC"), dec!(1)).await;
        assert!(matches!(failed, Err(FeeError::ProviderError(_))));

        assert_eq!(provider.calls(), 3);
    }
}
