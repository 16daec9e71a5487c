//! Exchange fee schedule keyed by order book.
//!
//! Exchanges such as Bitso publish one taker fee per order book
//! (`btc_mxn`, `usd_ars`, ...). A book trades in both directions, so a pair
//! is priced by `from_to` if that book exists and by `to_from` otherwise.

use std::collections::HashMap;

use async_trait::async_trait;
use fxroute_common::{Currency, CurrencyPair};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::FeeResult;
use crate::provider::{FeeProvider, FeeQuote};

/// Fee provider over a snapshot of per-book fee fractions.
pub struct BookFeeProvider {
    name: String,
    symbols: HashMap<Currency, String>,
    books: RwLock<HashMap<String, Decimal>>,
}

impl BookFeeProvider {
    /// Create a provider over `books` (book name -> fee fraction).
    pub fn new(books: HashMap<String, Decimal>) -> Self {
        Self {
            name: "bitso".to_string(),
            symbols: default_symbols(),
            books: RwLock::new(normalise_books(books)),
        }
    }

    /// Override the provider label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Map a node currency to the symbol the exchange uses for it.
    pub fn with_symbol(mut self, currency: impl Into<Currency>, symbol: impl Into<String>) -> Self {
        self.symbols.insert(currency.into(), symbol.into().to_lowercase());
        self
    }

    /// Replace the fee schedule with a fresh snapshot.
    pub fn update_books(&self, books: HashMap<String, Decimal>) {
        let books = normalise_books(books);
        debug!(provider = %self.name, books = books.len(), "Replacing book fee snapshot");
        *self.books.write() = books;
    }

    pub fn book_count(&self) -> usize {
        self.books.read().len()
    }

    /// Resolve the book that prices `pair`, trying `from_to` then `to_from`.
    pub fn book_for(&self, pair: &CurrencyPair) -> Option<String> {
        let from = self.symbols.get(&pair.from)?;
        let to = self.symbols.get(&pair.to)?;

        let books = self.books.read();
        [format!("{from}_{to}"), format!("{to}_{from}")]
            .into_iter()
            .find(|book| books.contains_key(book))
    }
}

#[async_trait]
impl FeeProvider for BookFeeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, pair: &CurrencyPair, _amount: Decimal) -> FeeResult<FeeQuote> {
        let Some(book) = self.book_for(pair) else {
            trace!(pair = %pair, provider = %self.name, "No book for pair");
            return Ok(FeeQuote::no_route(pair.clone(), &self.name));
        };

        let fee = self.books.read().get(&book).copied();
        match fee {
            Some(fee_fraction) => Ok(FeeQuote::priced(pair.clone(), fee_fraction, &self.name)),
            // Snapshot replaced between lookup and read.
            None => Ok(FeeQuote::no_route(pair.clone(), &self.name)),
        }
    }
}

fn default_symbols() -> HashMap<Currency, String> {
    [("ARS", "ars"), ("USDC", "usd"), ("BTC", "btc"), ("SOL", "sol"), ("MXN", "mxn")]
        .into_iter()
        .map(|(node, symbol)| (Currency::new(node), symbol.to_string()))
        .collect()
}

fn normalise_books(books: HashMap<String, Decimal>) -> HashMap<String, Decimal> {
    books
        .into_iter()
        .map(|(book, fee)| (book.to_lowercase(), fee))
        .collect()
}
