//! Fee provider error types.

use fxroute_common::CurrencyPair;
use thiserror::Error;

/// Errors raised by fee providers and rate converters.
///
/// A pair that simply has no market is not an error: providers answer it
/// with [`FeeQuote::NoRoute`](crate::FeeQuote::NoRoute).
#[derive(Debug, Error)]
pub enum FeeError {
    /// Provider failed (transport, malformed payload, authentication).
    #[error("Fee provider error: {0}")]
    ProviderError(String),

    /// Amount cannot be converted between the two currencies.
    #[error("Conversion unavailable for {0}")]
    ConversionUnavailable(CurrencyPair),

    /// Provider returned a quote that cannot be turned into a fee.
    #[error("Invalid quote for {pair}: {reason}")]
    InvalidQuote { pair: CurrencyPair, reason: String },
}

/// Result type for fee operations.
pub type FeeResult<T> = Result<T, FeeError>;
