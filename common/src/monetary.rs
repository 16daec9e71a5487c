//! Monetary types shared across fxroute crates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency symbol, fiat ("MXN") or crypto ("BTC").
///
/// Codes are normalised to upper case so `"usdc"` and `"USDC"` name the
/// same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from its symbol.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency symbol.
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn usdc() -> Self {
        Self::new("USDC")
    }

    pub fn ars() -> Self {
        Self::new("ARS")
    }

    pub fn mxn() -> Self {
        Self::new("MXN")
    }

    pub fn btc() -> Self {
        Self::new("BTC")
    }

    pub fn sol() -> Self {
        Self::new("SOL")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// Classification used to decide which fee provider prices a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    Fiat,
    Crypto,
}

impl fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyKind::Fiat => write!(f, "fiat"),
            CurrencyKind::Crypto => write!(f, "crypto"),
        }
    }
}

/// A directed conversion from one currency into another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency being sold.
    pub from: Currency,
    /// Currency being bought.
    pub to: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: impl Into<Currency>, to: impl Into<Currency>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Get the reverse direction.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// True when both sides are the same currency.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// FX rate between two currencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    /// The currency pair; one unit of `from` buys `mid` units of `to`.
    pub pair: CurrencyPair,
    pub bid: Decimal,
    pub ask: Decimal,
    /// Mid-market rate.
    pub mid: Decimal,
    /// When this rate was quoted.
    pub quoted_at: chrono::DateTime<chrono::Utc>,
    /// When this rate expires.
    pub valid_until: chrono::DateTime<chrono::Utc>,
    /// Rate source.
    pub source: String,
}

impl FxRate {
    /// Create a new FX rate.
    pub fn new(
        pair: CurrencyPair,
        bid: Decimal,
        ask: Decimal,
        valid_for_seconds: i64,
        source: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            pair,
            bid,
            ask,
            mid: bid + (ask - bid) / Decimal::TWO,
            quoted_at: now,
            valid_until: now + chrono::Duration::seconds(valid_for_seconds),
            source: source.into(),
        }
    }

    /// Create a rate with no spread.
    pub fn at_mid(
        pair: CurrencyPair,
        mid: Decimal,
        valid_for_seconds: i64,
        source: impl Into<String>,
    ) -> Self {
        Self::new(pair, mid, mid, valid_for_seconds, source)
    }

    /// Check if the rate is still valid.
    pub fn is_valid(&self) -> bool {
        chrono::Utc::now() < self.valid_until
    }

    /// The rate for the reverse direction, or `None` for a zero rate.
    pub fn inverse(&self) -> Option<FxRate> {
        if self.bid.is_zero() || self.ask.is_zero() {
            return None;
        }
        Some(FxRate {
            pair: self.pair.inverse(),
            bid: Decimal::ONE / self.ask,
            ask: Decimal::ONE / self.bid,
            mid: Decimal::ONE / self.mid,
            quoted_at: self.quoted_at,
            valid_until: self.valid_until,
            source: self.source.clone(),
        })
    }
}
