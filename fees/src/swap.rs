//! Fee derivation from swap quotes.
//!
//! Crypto swap aggregators (Swapzone and friends) do not publish a fee; they
//! quote how much of the target coin a given input buys. The fee is the
//! value lost in the swap, measured in a common valuation currency:
//! `(value_in - value_out) / value_in`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use fxroute_common::{Currency, CurrencyPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::conversion::RateConverter;
use crate::error::{FeeError, FeeResult};
use crate::provider::{FeeProvider, FeeQuote};

/// A venue's answer to "how much `to` do I get for `amount_from` of `from`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount_from: Decimal,
    pub amount_to: Decimal,
    /// Venue that would execute the swap.
    pub venue: Option<String>,
}

/// Source of swap quotes.
#[async_trait]
pub trait SwapQuoter: Send + Sync {
    /// Quote a swap, or `None` when no venue supports the pair.
    async fn quote_swap(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<Option<SwapQuote>>;
}

/// Fee provider that prices pairs from swap quotes.
pub struct SwapFeeProvider {
    name: String,
    quoter: Arc<dyn SwapQuoter>,
    converter: Arc<dyn RateConverter>,
    valuation: Currency,
}

impl SwapFeeProvider {
    pub fn new(quoter: Arc<dyn SwapQuoter>, converter: Arc<dyn RateConverter>) -> Self {
        Self {
            name: "swapzone".to_string(),
            quoter,
            converter,
            valuation: Currency::usd(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Currency both legs are valued in before comparing them.
    pub fn with_valuation(mut self, valuation: Currency) -> Self {
        self.valuation = valuation;
        self
    }
}

#[async_trait]
impl FeeProvider for SwapFeeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<FeeQuote> {
        let Some(swap) = self.quoter.quote_swap(pair, amount).await? else {
            trace!(pair = %pair, provider = %self.name, "No swap venue for pair");
            return Ok(FeeQuote::no_route(pair.clone(), &self.name));
        };

        let value_in = self
            .converter
            .convert(&CurrencyPair::new(pair.from.clone(), self.valuation.clone()), swap.amount_from)
            .await?;
        let value_out = self
            .converter
            .convert(&CurrencyPair::new(pair.to.clone(), self.valuation.clone()), swap.amount_to)
            .await?;

        if value_in <= Decimal::ZERO {
            return Err(FeeError::InvalidQuote {
                pair: pair.clone(),
                reason: format!("input valued at {} {}", value_in, self.valuation),
            });
        }

        let fee_fraction = (value_in - value_out)
            .checked_div(value_in)
            .ok_or_else(|| FeeError::InvalidQuote {
                pair: pair.clone(),
                reason: format!("fee from {} in and {} out overflows", value_in, value_out),
            })?;
        debug!(
            pair = %pair,
            value_in = %value_in,
            value_out = %value_out,
            fee_fraction = %fee_fraction,
            "Derived fee from swap quote"
        );

        let label = swap.venue.unwrap_or_else(|| self.name.clone());
        Ok(FeeQuote::priced(pair.clone(), fee_fraction, label))
    }
}

/// Swap quoter over a table of effective output rates.
#[derive(Default)]
pub struct StaticSwapQuoter {
    rates: DashMap<CurrencyPair, (Decimal, Option<String>)>,
}

impl StaticSwapQuoter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One unit of `pair.from` yields `output_rate` units of `pair.to`, fees included.
    pub fn set_rate(&self, pair: CurrencyPair, output_rate: Decimal, venue: Option<String>) {
        self.rates.insert(pair, (output_rate, venue));
    }

    pub fn with_rate(self, from: &str, to: &str, output_rate: Decimal) -> Self {
        self.set_rate(CurrencyPair::new(from, to), output_rate, None);
        self
    }
}

#[async_trait]
impl SwapQuoter for StaticSwapQuoter {
    async fn quote_swap(&self, pair: &CurrencyPair, amount: Decimal) -> FeeResult<Option<SwapQuote>> {
        let Some(entry) = self.rates.get(pair) else {
            return Ok(None);
        };
        let (rate, venue) = entry.value();

        let amount_to = amount.checked_mul(*rate).ok_or_else(|| FeeError::InvalidQuote {
            pair: pair.clone(),
            reason: format!("{} at rate {} overflows", amount, rate),
        })?;

        Ok(Some(SwapQuote {
            amount_from: amount,
            amount_to,
            venue: venue.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::StaticRateConverter;
    use rust_decimal_macros::dec;

    fn provider(quoter: StaticSwapQuoter) -> SwapFeeProvider {
        let converter = StaticRateConverter::new()
            .with_rate("SOL", "USD", dec!(150))
            .with_rate("BTC", "USD", dec!(60000))
            .with_rate("USDC", "USD", dec!(1));
        SwapFeeProvider::new(Arc::new(quoter), Arc::new(converter))
    }

    #[tokio::test]
    async fn test_fee_is_value_lost() {
        // 400 SOL = 60000 USD should buy 1 BTC; the venue gives 0.99 BTC
        let quoter = StaticSwapQuoter::new().with_rate("SOL", "BTC", dec!(0.002475));
        let quote = provider(quoter).quote(&CurrencyPair::new("SOL", "BTC"), dec!(400)).await.unwrap();

        assert_eq!(quote.fee_fraction(), Some(dec!(0.01)));
        assert_eq!(quote.provider(), "swapzone");
    }

    #[tokio::test]
    async fn test_venue_label_used() {
        let quoter = StaticSwapQuoter::new();
        quoter.set_rate(CurrencyPair::new("USDC", "SOL"), dec!(0.0066), Some("changenow".to_string()));

        let quote = provider(quoter).quote(&CurrencyPair::new("USDC", "SOL"), dec!(150)).await.unwrap();

        assert_eq!(quote.provider(), "changenow");
        assert_eq!(quote.fee_fraction(), Some(dec!(0.01)));
    }

    #[tokio::test]
    async fn test_no_venue_is_no_route() {
        let quote = provider(StaticSwapQuoter::new())
            .quote(&CurrencyPair::new("SOL", "BTC"), dec!(1))
            .await
            .unwrap();

        assert!(quote.is_no_route());
    }

    #[tokio::test]
    async fn test_zero_input_rejected() {
        let quoter = StaticSwapQuoter::new().with_rate("SOL", "BTC", dec!(0.0025));
        let result = provider(quoter).quote(&CurrencyPair::new("SOL", "BTC"), Decimal::ZERO).await;

        assert!(matches!(result, Err(FeeError::InvalidQuote { .. })));
    }

    #[tokio::test]
    async fn test_oversized_amount_rejected() {
        let quoter = StaticSwapQuoter::new().with_rate("BTC", "SOL", dec!(398));
        let result = provider(quoter)
            .quote(&CurrencyPair::new("BTC", "SOL"), Decimal::MAX / dec!(10))
            .await;

        assert!(matches!(result, Err(FeeError::InvalidQuote { .. })));
    }

    #[tokio::test]
    async fn test_missing_valuation_rate_propagates() {
        let quoter = StaticSwapQuoter::new().with_rate("DOGE", "BTC", dec!(0.000002));
        let result = provider(quoter).quote(&CurrencyPair::new("DOGE", "BTC"), dec!(1)).await;

        assert!(matches!(result, Err(FeeError::ConversionUnavailable(_))));
    }
}
