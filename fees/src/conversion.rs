//! Rate conversion between currencies.

use async_trait::async_trait;
use dashmap::DashMap;
use fxroute_common::{Currency, CurrencyPair, FxRate};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::{FeeError, FeeResult};

/// Converts an amount from one currency into another at market rate.
#[async_trait]
pub trait RateConverter: Send + Sync {
    /// Convert `amount` units of `pair.from` into units of `pair.to`.
    async fn convert(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<Decimal>;
}

/// Converter over a table of mid rates.
///
/// A pair is resolved directly, through the inverse of a quoted rate, or by
/// triangulating through the pivot currency (`USD` by default), which is
/// how fiat -> crypto prices are usually composed.
pub struct StaticRateConverter {
    rates: DashMap<CurrencyPair, FxRate>,
    pivot: Currency,
}

impl StaticRateConverter {
    pub fn new() -> Self {
        Self::with_pivot(Currency::usd())
    }

    pub fn with_pivot(pivot: Currency) -> Self {
        Self {
            rates: DashMap::new(),
            pivot,
        }
    }

    /// Add or replace a rate.
    pub fn set_rate(&self, rate: FxRate) {
        self.rates.insert(rate.pair.clone(), rate);
    }

    /// Builder form: one unit of `from` buys `mid` units of `to`.
    pub fn with_rate(self, from: &str, to: &str, mid: Decimal) -> Self {
        self.set_rate(FxRate::at_mid(CurrencyPair::new(from, to), mid, i64::from(u32::MAX), "static"));
        self
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Mid rate for `pair`, if it can be resolved.
    pub fn rate_for(&self, pair: &CurrencyPair) -> Option<Decimal> {
        if pair.is_identity() {
            return Some(Decimal::ONE);
        }

        if let Some(rate) = self.single_leg(pair) {
            return Some(rate);
        }

        if pair.from == self.pivot || pair.to == self.pivot {
            return None;
        }

        let first = self.single_leg(&CurrencyPair::new(pair.from.clone(), self.pivot.clone()))?;
        let second = self.single_leg(&CurrencyPair::new(self.pivot.clone(), pair.to.clone()))?;
        trace!(pair = %pair, pivot = %self.pivot, "Triangulated rate");
        first.checked_mul(second)
    }

    fn single_leg(&self, pair: &CurrencyPair) -> Option<Decimal> {
        if let Some(rate) = self.valid_rate(pair) {
            return Some(rate.mid);
        }
        self.valid_rate(&pair.inverse())
            .and_then(|rate| rate.inverse())
            .map(|rate| rate.mid)
    }

    fn valid_rate(&self, pair: &CurrencyPair) -> Option<FxRate> {
        let rate = self.rates.get(pair)?;
        if !rate.is_valid() {
            debug!(pair = %pair, "Ignoring expired rate");
            return None;
        }
        Some(rate.clone())
    }
}

impl Default for StaticRateConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateConverter for StaticRateConverter {
    async fn convert(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<Decimal> {
        let rate = self
            .rate_for(pair)
            .ok_or_else(|| FeeError::ConversionUnavailable(pair.clone()))?;

        amount.checked_mul(rate).ok_or_else(|| {
            debug!(pair = %pair, amount = %amount, rate = %rate, "Converted amount overflows");
            FeeError::ConversionUnavailable(pair.clone())
        })
    }
}
