//! Fee and topology snapshot files.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::{env, fs};

use dotenvy::dotenv;
use fxroute_common::{Currency, CurrencyPair, FxRate};
use fxroute_fees::{BookFeeProvider, ProviderSelector, StaticRateConverter, StaticSwapQuoter, SwapFeeProvider};
use fxroute_router::{RouterConfig, TopologyConfig};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Snapshot shipped with the binary.
const DEMO_SNAPSHOT: &str = include_str!("../snapshots/demo.toml");

/// Rates in a snapshot do not expire while the process runs.
const SNAPSHOT_RATE_VALIDITY_SECS: i64 = u32::MAX as i64;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid snapshot: {0}")]
    Invalid(String),
}

/// One swap venue quote: a unit of `from` yields `rate` units of `to`.
#[derive(Debug, Clone, Deserialize)]
pub struct SwapQuoteEntry {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
    #[serde(default)]
    pub venue: Option<String>,
}

/// Mid-market rate: a unit of `from` buys `mid` units of `to`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateEntry {
    pub from: Currency,
    pub to: Currency,
    pub mid: Decimal,
}

/// Everything needed to plan routes offline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub router: Option<RouterConfig>,
    /// Exchange fee per order book.
    #[serde(default)]
    pub fees: HashMap<String, Decimal>,
    /// Extra currency -> exchange symbol mappings.
    #[serde(default)]
    pub symbols: BTreeMap<Currency, String>,
    #[serde(default)]
    pub swap_quotes: Vec<SwapQuoteEntry>,
    #[serde(default)]
    pub rates: Vec<RateEntry>,
}

impl SnapshotFile {
    /// Load a snapshot, expanding `${VAR}` references from the environment.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        dotenv().ok();
        let contents = fs::read_to_string(path)?;
        let snapshot = Self::parse(&expand_vars(&contents)?)?;
        info!(
            path = %path.display(),
            currencies = snapshot.topology.currencies.len(),
            books = snapshot.fees.len(),
            swap_quotes = snapshot.swap_quotes.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// The built-in demo snapshot.
    pub fn demo() -> Result<Self, SnapshotError> {
        Self::parse(DEMO_SNAPSHOT)
    }

    pub fn parse(contents: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = toml::from_str(contents)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        self.topology.validate().map_err(SnapshotError::Invalid)?;

        if let Some(entry) = self.rates.iter().find(|r| r.mid <= Decimal::ZERO) {
            return Err(SnapshotError::Invalid(format!(
                "Rate {}->{} must be positive",
                entry.from, entry.to
            )));
        }

        if let Some(entry) = self.swap_quotes.iter().find(|q| q.rate < Decimal::ZERO) {
            return Err(SnapshotError::Invalid(format!(
                "Swap rate {}->{} cannot be negative",
                entry.from, entry.to
            )));
        }

        Ok(())
    }

    /// Router configuration from the file, with environment overrides on top.
    pub fn router_config(&self) -> RouterConfig {
        self.router.clone().unwrap_or_default().with_env_overrides()
    }

    pub fn converter(&self) -> StaticRateConverter {
        let converter = StaticRateConverter::new();
        for entry in &self.rates {
            converter.set_rate(FxRate::at_mid(
                CurrencyPair::new(entry.from.clone(), entry.to.clone()),
                entry.mid,
                SNAPSHOT_RATE_VALIDITY_SECS,
                "snapshot",
            ));
        }
        converter
    }

    /// Book fees for fiat pairs, swap quotes for the rest.
    pub fn selector(&self, converter: Arc<StaticRateConverter>) -> ProviderSelector {
        let books = self
            .symbols
            .iter()
            .fold(BookFeeProvider::new(self.fees.clone()), |books, (currency, symbol)| {
                books.with_symbol(currency.clone(), symbol.clone())
            });

        let quoter = StaticSwapQuoter::new();
        for entry in &self.swap_quotes {
            quoter.set_rate(
                CurrencyPair::new(entry.from.clone(), entry.to.clone()),
                entry.rate,
                entry.venue.clone(),
            );
        }
        let swaps = SwapFeeProvider::new(Arc::new(quoter), converter);

        ProviderSelector::with_classifier(
            Arc::new(books),
            Arc::new(swaps),
            Arc::new(self.topology.classifier()),
        )
    }
}

/// Replace `${VAR}` with the variable's value; unknown variables are kept verbatim.
fn expand_vars(raw: &str) -> Result<String, SnapshotError> {
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}")?;
    Ok(re
        .replace_all(raw, |caps: &Captures| match env::var(&caps[1]) {
            Ok(val) => val,
            Err(_) => caps[0].to_string(),
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxroute_fees::FeeProvider;
    use fxroute_router::RoutePlanner;
    use rust_decimal_macros::dec;

    #[test]
    fn test_demo_snapshot_parses() {
        let snapshot = SnapshotFile::demo().unwrap();

        assert_eq!(snapshot.topology, TopologyConfig::default());
        assert_eq!(snapshot.fees.len(), 5);
        assert_eq!(snapshot.swap_quotes.len(), 6);
        assert_eq!(snapshot.converter().len(), 5);
        assert!(snapshot.router.is_some());
    }

    #[test]
    fn test_expand_vars() {
        env::set_var("FXROUTE_TEST_BOOK_FEE", "0.004");

        let expanded = expand_vars(r#"btc_mxn = "${FXROUTE_TEST_BOOK_FEE}" # ${FXROUTE_TEST_UNSET_VAR}"#).unwrap();

        assert_eq!(expanded, r#"btc_mxn = "0.004" # ${FXROUTE_TEST_UNSET_VAR}"#);
    }

    #[test]
    fn test_minimal_snapshot_uses_defaults() {
        let snapshot = SnapshotFile::parse("[fees]\nbtc_mxn = \"0.0065\"\n").unwrap();

        assert_eq!(snapshot.topology, TopologyConfig::default());
        assert!(snapshot.rates.is_empty());
        assert_eq!(snapshot.fees["btc_mxn"], dec!(0.0065));
    }

    #[test]
    fn test_invalid_snapshots_rejected() {
        let result = SnapshotFile::parse("[topology]\ncurrencies = []\n");
        assert!(matches!(result, Err(SnapshotError::Invalid(_))));

        let result = SnapshotFile::parse("[[rates]]\nfrom = \"USD\"\nto = \"ARS\"\nmid = \"0\"\n");
        assert!(matches!(result, Err(SnapshotError::Invalid(_))));

        let result = SnapshotFile::parse("[fees\n");
        assert!(matches!(result, Err(SnapshotError::Toml(_))));
    }

    #[tokio::test]
    async fn test_demo_selector_prices_both_families() {
        let snapshot = SnapshotFile::demo().unwrap();
        let selector = snapshot.selector(Arc::new(snapshot.converter()));

        let fiat = selector.quote(&CurrencyPair::new("ARS", "USDC"), dec!(1)).await.unwrap();
        assert_eq!(fiat.fee_fraction(), Some(dec!(0.005)));
        assert_eq!(fiat.provider(), "bitso");

        // 1 SOL = 150 USD buys 0.00249 BTC = 149.4 USD
        let crypto = selector.quote(&CurrencyPair::new("SOL", "BTC"), dec!(1)).await.unwrap();
        assert_eq!(crypto.fee_fraction(), Some(dec!(0.004)));
        assert_eq!(crypto.provider(), "changenow");
    }

    #[tokio::test]
    async fn test_demo_route() {
        let snapshot = SnapshotFile::demo().unwrap();
        let converter = Arc::new(snapshot.converter());
        let planner = RoutePlanner::new(
            snapshot.topology.clone(),
            snapshot.selector(converter.clone()),
            RouterConfig::default(),
        )
        .unwrap()
        .with_converter(converter);

        let route = planner
            .best_route(&Currency::ars(), &Currency::mxn(), dec!(100000))
            .await
            .unwrap();

        assert_eq!(route.path, vec![Currency::ars(), Currency::usdc(), Currency::mxn()]);
        // 100000 ARS -0.5% = 99.5 USDC, -0.65% = 98.85325 USDC = 1680.50525 MXN
        assert_eq!(route.evaluation.final_amount, dec!(1680.50525));
    }

    #[tokio::test]
    async fn test_demo_convert() {
        let snapshot = SnapshotFile::demo().unwrap();
        let converter = Arc::new(snapshot.converter());
        let planner = RoutePlanner::new(
            snapshot.topology.clone(),
            snapshot.selector(converter.clone()),
            RouterConfig::default(),
        )
        .unwrap()
        .with_converter(converter);

        // 1 BTC = 60000 USD = 1020000 MXN
        let conversion = planner.convert(&Currency::btc(), &Currency::mxn(), dec!(1)).await.unwrap();
        assert_eq!(conversion.converted, dec!(1020000));
    }
}
