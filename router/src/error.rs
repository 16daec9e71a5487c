//! Route planner error types.

use fxroute_common::Currency;
use fxroute_fees::FeeError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while planning or evaluating a route.
///
/// An edge without a market or with a nonsensical fee is not an error; it is
/// priced out of the search with an infinite weight.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Currency is not a node of the graph.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(Currency),

    /// No finite-cost path connects the two currencies.
    #[error("No route found from {from} to {to}")]
    UnreachableTarget { from: Currency, to: Currency },

    /// A path to evaluate must name at least one currency.
    #[error("Path is empty")]
    EmptyPath,

    /// Two consecutive path currencies have no direct conversion.
    #[error("No direct conversion from {from} to {to}")]
    MissingEdge { from: Currency, to: Currency },

    /// The conversion exists but has no usable fee.
    #[error("Conversion from {from} to {to} is not priced with a usable fee")]
    UnusableEdge { from: Currency, to: Currency },

    /// Amount must not be negative.
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Fee provider or rate converter failed.
    #[error(transparent)]
    Provider(#[from] FeeError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RouteError {
    /// Get error code for the request/response layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            RouteError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            RouteError::UnreachableTarget { .. } => "NO_ROUTE_FOUND",
            RouteError::EmptyPath => "EMPTY_PATH",
            RouteError::MissingEdge { .. } => "MISSING_EDGE",
            RouteError::UnusableEdge { .. } => "UNUSABLE_EDGE",
            RouteError::InvalidAmount(_) => "INVALID_AMOUNT",
            RouteError::Provider(_) => "PROVIDER_FAILURE",
            RouteError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RouteError::Provider(_) | RouteError::Configuration(_))
    }
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        let unreachable = RouteError::UnreachableTarget {
            from: Currency::ars(),
            to: Currency::sol(),
        };
        assert_eq!(unreachable.error_code(), "NO_ROUTE_FOUND");
        assert_eq!(unreachable.to_string(), "No route found from ARS to SOL");
        assert!(unreachable.is_client_error());

        let provider: RouteError = FeeError::ProviderError("HTTP 503".to_string()).into();
        assert_eq!(provider.error_code(), "PROVIDER_FAILURE");
        assert!(!provider.is_client_error());

        assert_eq!(RouteError::InvalidAmount(dec!(-1)).error_code(), "INVALID_AMOUNT");
    }
}
