//! Router configuration.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use fxroute_common::Currency;
use fxroute_fees::StaticClassifier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How edge fees are fetched when pricing a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    /// One lookup at a time, in edge order.
    #[default]
    Sequential,
    /// Bounded parallel lookups; fees are applied only if every lookup succeeds.
    Concurrent,
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStrategy::Sequential => write!(f, "sequential"),
            UpdateStrategy::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for UpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(UpdateStrategy::Sequential),
            "concurrent" => Ok(UpdateStrategy::Concurrent),
            other => Err(format!("Unknown update strategy: {}", other)),
        }
    }
}

/// Route planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Notional amount every edge is quoted at.
    pub quote_amount: Decimal,
    /// Fee lookup strategy.
    pub update_strategy: UpdateStrategy,
    /// Upper bound on in-flight lookups for the concurrent strategy.
    pub max_concurrent_quotes: usize,
    /// Currency fees and final amounts are also reported in.
    pub reporting_currency: Option<Currency>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            quote_amount: Decimal::ONE,
            update_strategy: UpdateStrategy::Sequential,
            max_concurrent_quotes: 8,
            reporting_currency: None,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Override fields that are set in the environment.
    pub fn with_env_overrides(self) -> Self {
        let mut config = self;

        if let Ok(amount) = std::env::var("FXROUTE_QUOTE_AMOUNT") {
            if let Ok(amount) = amount.parse() {
                config.quote_amount = amount;
            }
        }

        if let Ok(strategy) = std::env::var("FXROUTE_UPDATE_STRATEGY") {
            if let Ok(strategy) = strategy.parse() {
                config.update_strategy = strategy;
            }
        }

        if let Ok(max) = std::env::var("FXROUTE_MAX_CONCURRENT_QUOTES") {
            if let Ok(max) = max.parse() {
                config.max_concurrent_quotes = max;
            }
        }

        if let Ok(currency) = std::env::var("FXROUTE_REPORTING_CURRENCY") {
            if !currency.trim().is_empty() {
                config.reporting_currency = Some(Currency::new(currency));
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.quote_amount <= Decimal::ZERO {
            return Err("Quote amount must be positive".to_string());
        }

        if self.max_concurrent_quotes == 0 {
            return Err("Max concurrent quotes cannot be 0".to_string());
        }

        Ok(())
    }
}

/// The currencies a graph is built from and which conversions exist.
///
/// Neighbor lists may name currencies that are not nodes; those entries
/// produce no edge. A repeated neighbor produces a repeated edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Node currencies, in node order.
    pub currencies: Vec<Currency>,
    /// Currencies priced by the fiat provider.
    #[serde(default)]
    pub fiat: Vec<Currency>,
    /// Directed conversions, from each currency to its neighbors in order.
    #[serde(default)]
    pub neighbors: BTreeMap<Currency, Vec<Currency>>,
}

impl Default for TopologyConfig {
    /// The five-currency LatAm corridor: two fiat rails, a stablecoin hub, two coins.
    fn default() -> Self {
        let list = |codes: &[&str]| codes.iter().map(|c| Currency::new(*c)).collect::<Vec<_>>();

        let neighbors = [
            ("USDC", list(&["MXN", "ARS", "SOL", "BTC"])),
            ("MXN", list(&["USDC", "SOL", "BTC"])),
            ("ARS", list(&["USDC", "BTC"])),
            ("SOL", list(&["USDC", "BTC", "MXN"])),
            ("BTC", list(&["USDC", "SOL", "ARS", "MXN"])),
        ]
        .into_iter()
        .map(|(from, to)| (Currency::new(from), to))
        .collect();

        Self {
            currencies: list(&["USDC", "ARS", "MXN", "SOL", "BTC"]),
            fiat: list(&["USD", "ARS", "MXN"]),
            neighbors,
        }
    }
}

impl TopologyConfig {
    pub fn new(currencies: Vec<Currency>) -> Self {
        Self {
            currencies,
            fiat: Vec::new(),
            neighbors: BTreeMap::new(),
        }
    }

    /// Add a directed conversion.
    pub fn with_edge(mut self, from: &str, to: &str) -> Self {
        self.neighbors
            .entry(Currency::new(from))
            .or_default()
            .push(Currency::new(to));
        self
    }

    /// Classifier matching the configured fiat set.
    pub fn classifier(&self) -> StaticClassifier {
        StaticClassifier::new(self.fiat.iter().cloned())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.currencies.is_empty() {
            return Err("Topology must name at least one currency".to_string());
        }

        let mut seen = HashSet::new();
        for currency in &self.currencies {
            if currency.code().is_empty() {
                return Err("Currency code cannot be empty".to_string());
            }
            if !seen.insert(currency) {
                return Err(format!("Duplicate currency in topology: {}", currency));
            }
        }

        Ok(())
    }
}
