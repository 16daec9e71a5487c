//! Routing of pairs to the fiat-capable or crypto-capable provider.

use std::sync::Arc;

use async_trait::async_trait;
use fxroute_common::{CurrencyKind, CurrencyPair};
use rust_decimal::Decimal;
use tracing::debug;

use crate::classify::{CurrencyClassifier, StaticClassifier};
use crate::error::FeeResult;
use crate::provider::{FeeProvider, FeeQuote};

/// Picks the provider for a pair: fiat-capable when either side is fiat,
/// crypto-capable otherwise.
#[derive(Clone)]
pub struct ProviderSelector {
    fiat: Arc<dyn FeeProvider>,
    crypto: Arc<dyn FeeProvider>,
    classifier: Arc<dyn CurrencyClassifier>,
}

impl ProviderSelector {
    /// Create a selector using the default fiat set.
    pub fn new(fiat: Arc<dyn FeeProvider>, crypto: Arc<dyn FeeProvider>) -> Self {
        Self::with_classifier(fiat, crypto, Arc::new(StaticClassifier::default()))
    }

    pub fn with_classifier(
        fiat: Arc<dyn FeeProvider>,
        crypto: Arc<dyn FeeProvider>,
        classifier: Arc<dyn CurrencyClassifier>,
    ) -> Self {
        Self {
            fiat,
            crypto,
            classifier,
        }
    }

    /// Which provider family prices the pair.
    pub fn kind_for(&self, pair: &CurrencyPair) -> CurrencyKind {
        if self.classifier.is_fiat_pair(pair) {
            CurrencyKind::Fiat
        } else {
            CurrencyKind::Crypto
        }
    }

    pub fn select(&self, pair: &CurrencyPair) -> &Arc<dyn FeeProvider> {
        match self.kind_for(pair) {
            CurrencyKind::Fiat => &self.fiat,
            CurrencyKind::Crypto => &self.crypto,
        }
    }
}

#[async_trait]
impl FeeProvider for ProviderSelector {
    fn name(&self) -> &str {
        "selector"
    }

    async fn quote(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<FeeQuote> {
        let provider = self.select(pair);
        debug!(pair = %pair, provider = provider.name(), "Selected fee provider");
        provider.quote(pair, amount).await
    }
}
