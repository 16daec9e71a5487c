//! Currency classification.

use std::collections::HashSet;

use fxroute_common::{Currency, CurrencyKind, CurrencyPair};

/// Decides whether a currency is fiat or crypto.
pub trait CurrencyClassifier: Send + Sync {
    fn classify(&self, currency: &Currency) -> CurrencyKind;

    /// True if either side of the pair is fiat.
    fn is_fiat_pair(&self, pair: &CurrencyPair) -> bool {
        self.classify(&pair.from) == CurrencyKind::Fiat || self.classify(&pair.to) == CurrencyKind::Fiat
    }
}

/// Classifier backed by a fixed set of fiat symbols; everything else is crypto.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    fiat: HashSet<Currency>,
}

impl StaticClassifier {
    pub fn new<I, C>(fiat: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Currency>,
    {
        Self {
            fiat: fiat.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StaticClassifier {
    fn default() -> Self {
        Self::new(["USD", "ARS", "MXN"])
    }
}

impl CurrencyClassifier for StaticClassifier {
    fn classify(&self, currency: &Currency) -> CurrencyKind {
        if self.fiat.contains(currency) {
            CurrencyKind::Fiat
        } else {
            CurrencyKind::Crypto
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fiat_set() {
        let classifier = StaticClassifier::default();

        assert_eq!(classifier.classify(&Currency::ars()), CurrencyKind::Fiat);
        assert_eq!(classifier.classify(&Currency::mxn()), CurrencyKind::Fiat);
        assert_eq!(classifier.classify(&Currency::usd()), CurrencyKind::Fiat);
        // USDC is a stablecoin, not fiat
        assert_eq!(classifier.classify(&Currency::usdc()), CurrencyKind::Crypto);
        assert_eq!(classifier.classify(&Currency::btc()), CurrencyKind::Crypto);
    }

    #[test]
    fn test_fiat_pair_if_either_side_fiat() {
        let classifier = StaticClassifier::default();

        assert!(classifier.is_fiat_pair(&CurrencyPair::new("BTC", "MXN")));
        assert!(classifier.is_fiat_pair(&CurrencyPair::new("ARS", "USDC")));
        assert!(!classifier.is_fiat_pair(&CurrencyPair::new("SOL", "BTC")));
    }

    #[test]
    fn test_symbols_normalised() {
        let classifier = StaticClassifier::new(["eur"]);
        assert_eq!(classifier.classify(&Currency::new("EUR")), CurrencyKind::Fiat);
    }
}
