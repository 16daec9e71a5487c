//! fxroute Fee Providers
//!
//! Collaborators that put a price on a single conversion hop.
//!
//! # Features
//!
//! - [`FeeProvider`] trait with an explicit "no route" answer
//! - Fiat/crypto classification and provider selection
//! - Book-based fee schedules and swap-quote derived fees
//! - Rate conversion with inverse and pivot triangulation
//! - Per-provider TTL caching
//!
//! # Example
//!
//! ```rust,ignore
//! use fxroute_fees::{BookFeeProvider, ProviderSelector, SwapFeeProvider};
//!
//! let selector = ProviderSelector::new(Arc::new(books), Arc::new(swaps));
//! let quote = selector.quote(&CurrencyPair::new("ARS", "USDC"), dec!(1)).await?;
//! ```

pub mod book;
pub mod cache;
pub mod classify;
pub mod conversion;
pub mod error;
pub mod provider;
pub mod selector;
pub mod swap;

pub use book::BookFeeProvider;
pub use cache::{CacheStats, CachedFeeProvider, FeeCacheConfig};
pub use classify::{CurrencyClassifier, StaticClassifier};
pub use conversion::{RateConverter, StaticRateConverter};
pub use error::{FeeError, FeeResult};
pub use provider::{FeeProvider, FeeQuote};
pub use selector::ProviderSelector;
pub use swap::{StaticSwapQuoter, SwapFeeProvider, SwapQuote, SwapQuoter};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockFeeProvider;
