//! Route planner facade.
//!
//! Every call builds and prices a fresh graph from the topology, so no fee
//! state is shared between requests. Caching, if wanted, belongs to the fee
//! provider (see [`CachedFeeProvider`](fxroute_fees::CachedFeeProvider)).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fxroute_common::{Currency, CurrencyPair};
use fxroute_fees::{FeeProvider, FeeQuote, ProviderSelector, RateConverter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{RouterConfig, TopologyConfig};
use crate::cost::CostUpdater;
use crate::dijkstra::shortest_paths;
use crate::error::{RouteError, RouteResult};
use crate::evaluator::{PathEvaluation, PathEvaluator};
use crate::graph::CurrencyGraph;

/// Shortest-path costs and predecessors from one start currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestPathReport {
    pub start: Currency,
    /// Minimum search cost per currency, `None` when unreachable.
    pub costs: BTreeMap<Currency, Option<f64>>,
    /// Currency the cheapest path arrives from, `None` for the start and
    /// for unreachable currencies.
    pub previous: BTreeMap<Currency, Option<Currency>>,
}

impl ShortestPathReport {
    /// Path from the start to `target`, if reachable.
    pub fn path_to(&self, target: &Currency) -> Option<Vec<Currency>> {
        if target != &self.start && self.previous.get(target)?.is_none() {
            return None;
        }

        let mut path = vec![target.clone()];
        let mut current = target;
        while let Some(Some(prev)) = self.previous.get(current) {
            path.push(prev.clone());
            current = prev;
        }
        path.reverse();
        Some(path)
    }
}

/// Recommended route between two currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecommendation {
    pub id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub from: Currency,
    pub to: Currency,
    pub path: Vec<Currency>,
    /// Sum of search weights along the path.
    pub search_cost: f64,
    /// Fraction of value kept end to end, `exp(-search_cost)`.
    pub retained_fraction: f64,
    pub evaluation: PathEvaluation,
}

impl RouteRecommendation {
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Absolute fee for converting an amount over one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostQuote {
    pub amount: Decimal,
    /// `amount * fee_fraction`, `None` when the pair has no route.
    pub fee: Option<Decimal>,
    pub quote: FeeQuote,
}

/// Market-rate conversion of an amount; no fees are charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: Currency,
    pub to: Currency,
    pub amount: Decimal,
    pub converted: Decimal,
}

/// Plans lowest-fee conversion routes over a fixed topology.
pub struct RoutePlanner {
    topology: TopologyConfig,
    provider: Arc<dyn FeeProvider>,
    converter: Option<Arc<dyn RateConverter>>,
    config: RouterConfig,
}

impl RoutePlanner {
    /// Create a planner that prices edges through `selector`.
    pub fn new(topology: TopologyConfig, selector: ProviderSelector, config: RouterConfig) -> RouteResult<Self> {
        Self::with_provider(topology, Arc::new(selector), config)
    }

    /// Create a planner over any fee provider.
    pub fn with_provider(
        topology: TopologyConfig,
        provider: Arc<dyn FeeProvider>,
        config: RouterConfig,
    ) -> RouteResult<Self> {
        topology.validate().map_err(RouteError::Configuration)?;
        config.validate().map_err(RouteError::Configuration)?;

        info!(
            currencies = topology.currencies.len(),
            provider = provider.name(),
            strategy = %config.update_strategy,
            "Route planner ready"
        );

        Ok(Self {
            topology,
            provider,
            converter: None,
            config,
        })
    }

    /// Apply exchange rates between hops and fill in reporting amounts.
    pub fn with_converter(mut self, converter: Arc<dyn RateConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn topology(&self) -> &TopologyConfig {
        &self.topology
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Build a fresh graph and price every edge at `amount`.
    ///
    /// `None` uses the configured quote amount.
    pub async fn price_graph(&self, amount: Option<Decimal>) -> RouteResult<CurrencyGraph> {
        let mut graph = CurrencyGraph::from_topology(&self.topology);
        self.price(&mut graph, amount).await?;
        Ok(graph)
    }

    async fn price(&self, graph: &mut CurrencyGraph, amount: Option<Decimal>) -> RouteResult<()> {
        let amount = amount.unwrap_or(self.config.quote_amount);
        if amount <= Decimal::ZERO {
            return Err(RouteError::InvalidAmount(amount));
        }

        CostUpdater::new(self.provider.as_ref())
            .with_quote_amount(amount)
            .with_strategy(self.config.update_strategy, self.config.max_concurrent_quotes)
            .update_fees(graph)
            .await?;
        Ok(())
    }

    /// Cheapest search cost from `start` to every currency.
    #[instrument(skip(self, start), fields(start = %start))]
    pub async fn shortest_paths(&self, start: &Currency, amount: Option<Decimal>) -> RouteResult<ShortestPathReport> {
        let mut graph = CurrencyGraph::from_topology(&self.topology);
        let source = graph.require(start)?;
        self.price(&mut graph, amount).await?;

        let paths = shortest_paths(&graph, source);

        let mut costs = BTreeMap::new();
        let mut previous = BTreeMap::new();
        for node in graph.node_indices() {
            let Some(currency) = graph.currency(node) else {
                continue;
            };
            let cost = paths.cost(node);
            costs.insert(currency.clone(), cost.is_finite().then_some(cost));
            previous.insert(
                currency.clone(),
                paths.predecessor(node).and_then(|prev| graph.currency(prev)).cloned(),
            );
        }

        Ok(ShortestPathReport {
            start: start.clone(),
            costs,
            previous,
        })
    }

    /// Evaluate a caller-chosen path on a freshly priced graph.
    #[instrument(skip(self, path), fields(hops = path.len().saturating_sub(1)))]
    pub async fn evaluate(&self, path: &[Currency], amount: Decimal) -> RouteResult<PathEvaluation> {
        if path.is_empty() {
            return Err(RouteError::EmptyPath);
        }

        let evaluator = self.evaluator()?;
        let mut graph = CurrencyGraph::from_topology(&self.topology);
        let nodes = path
            .iter()
            .map(|currency| graph.require(currency))
            .collect::<RouteResult<Vec<_>>>()?;
        self.price(&mut graph, None).await?;

        evaluator.evaluate(&graph, &nodes, amount).await
    }

    /// Find and evaluate the lowest-fee route from `from` to `to`.
    #[instrument(skip(self, from, to, amount), fields(from = %from, to = %to, amount = %amount))]
    pub async fn best_route(&self, from: &Currency, to: &Currency, amount: Decimal) -> RouteResult<RouteRecommendation> {
        if amount < Decimal::ZERO {
            return Err(RouteError::InvalidAmount(amount));
        }

        let evaluator = self.evaluator()?;
        let mut graph = CurrencyGraph::from_topology(&self.topology);
        let source = graph.require(from)?;
        let target = graph.require(to)?;
        self.price(&mut graph, None).await?;

        let paths = shortest_paths(&graph, source);
        let nodes = paths
            .reconstruct_path(target)
            .ok_or_else(|| RouteError::UnreachableTarget {
                from: from.clone(),
                to: to.clone(),
            })?;

        let evaluation = evaluator.evaluate(&graph, &nodes, amount).await?;
        let search_cost = paths.cost(target);

        let recommendation = RouteRecommendation {
            id: Uuid::now_v7(),
            computed_at: Utc::now(),
            from: from.clone(),
            to: to.clone(),
            path: evaluation.path.clone(),
            search_cost,
            retained_fraction: (-search_cost).exp(),
            evaluation,
        };

        info!(
            route_id = %recommendation.id,
            path = ?recommendation.path,
            search_cost = recommendation.search_cost,
            final_amount = %recommendation.evaluation.final_amount,
            "Route found"
        );
        Ok(recommendation)
    }

    /// Absolute fee for converting `amount` over a single pair.
    #[instrument(skip(self, from, to), fields(from = %from, to = %to))]
    pub async fn quote_cost(&self, from: &Currency, to: &Currency, amount: Decimal) -> RouteResult<CostQuote> {
        if amount < Decimal::ZERO {
            return Err(RouteError::InvalidAmount(amount));
        }

        let quote = self.provider.quote(&CurrencyPair::new(from.clone(), to.clone()), amount).await?;
        let fee = quote.fee_for(amount);
        debug!(provider = quote.provider(), fee = ?fee, "Quoted pair cost");

        Ok(CostQuote { amount, fee, quote })
    }

    /// Convert `amount` at market rate, without charging any fee.
    #[instrument(skip(self, from, to), fields(from = %from, to = %to))]
    pub async fn convert(&self, from: &Currency, to: &Currency, amount: Decimal) -> RouteResult<Conversion> {
        let converter = self
            .converter
            .as_ref()
            .ok_or_else(|| RouteError::Configuration("Currency conversion requires a rate converter".to_string()))?;
        if amount < Decimal::ZERO {
            return Err(RouteError::InvalidAmount(amount));
        }

        let converted = converter
            .convert(&CurrencyPair::new(from.clone(), to.clone()), amount)
            .await?;
        debug!(amount = %amount, converted = %converted, "Converted amount");

        Ok(Conversion {
            from: from.clone(),
            to: to.clone(),
            amount,
            converted,
        })
    }

    /// Evaluator for the configured converter and reporting currency.
    fn evaluator(&self) -> RouteResult<PathEvaluator<'_>> {
        let mut evaluator = PathEvaluator::new();
        if let Some(reporting) = &self.config.reporting_currency {
            if self.converter.is_none() {
                return Err(RouteError::Configuration(format!(
                    "Reporting in {} requires a rate converter",
                    reporting
                )));
            }
            evaluator = evaluator.with_reporting_currency(reporting);
        }
        if let Some(converter) = &self.converter {
            evaluator = evaluator.with_converter(converter.as_ref());
        }
        Ok(evaluator)
    }
}
