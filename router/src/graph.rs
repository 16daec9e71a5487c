//! Currency graph: one node per currency, one directed edge per conversion.

use std::collections::{BTreeMap, HashMap};

use fxroute_common::{Currency, CurrencyPair};
use fxroute_fees::FeeQuote;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::TopologyConfig;
use crate::cost::search_weight;
use crate::error::{RouteError, RouteResult};

/// A currency in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyNode {
    pub currency: Currency,
}

/// What is known about the fee of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EdgePricing {
    /// Not looked up yet.
    Unpriced,
    /// The provider has no market for the conversion.
    NoRoute { provider: String },
    /// The provider quoted a fee fraction.
    Priced { fee_fraction: Decimal, provider: String },
}

/// Usability of an edge for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStatus {
    Unpriced,
    Usable,
    NoRoute,
    /// Priced, but the fee is outside `(0, 1)`.
    Degenerate,
}

/// A directed conversion with its fee and search weight.
///
/// The weight is derived from the pricing whenever the pricing changes, so
/// the two never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionEdge {
    pricing: EdgePricing,
    search_weight: f64,
}

impl ConversionEdge {
    /// Placeholder edge with a zero weight, before any fee is known.
    pub fn unpriced() -> Self {
        Self {
            pricing: EdgePricing::Unpriced,
            search_weight: 0.0,
        }
    }

    pub fn from_quote(quote: &FeeQuote) -> Self {
        let mut edge = Self::unpriced();
        edge.apply_quote(quote);
        edge
    }

    /// Record a provider answer and recompute the search weight.
    pub fn apply_quote(&mut self, quote: &FeeQuote) {
        self.pricing = match quote {
            FeeQuote::Priced {
                fee_fraction,
                provider,
                ..
            } => EdgePricing::Priced {
                fee_fraction: *fee_fraction,
                provider: provider.clone(),
            },
            FeeQuote::NoRoute { provider, .. } => EdgePricing::NoRoute {
                provider: provider.clone(),
            },
        };
        self.search_weight = match &self.pricing {
            EdgePricing::Priced { fee_fraction, .. } => search_weight(*fee_fraction),
            EdgePricing::NoRoute { .. } => f64::INFINITY,
            EdgePricing::Unpriced => 0.0,
        };
    }

    pub fn pricing(&self) -> &EdgePricing {
        &self.pricing
    }

    pub fn search_weight(&self) -> f64 {
        self.search_weight
    }

    /// Fee fraction as quoted, if any.
    pub fn fee_fraction(&self) -> Option<Decimal> {
        match &self.pricing {
            EdgePricing::Priced { fee_fraction, .. } => Some(*fee_fraction),
            _ => None,
        }
    }

    /// Provider label, if the edge has been looked up.
    pub fn provider(&self) -> Option<&str> {
        match &self.pricing {
            EdgePricing::Priced { provider, .. } | EdgePricing::NoRoute { provider } => Some(provider),
            EdgePricing::Unpriced => None,
        }
    }

    pub fn status(&self) -> EdgeStatus {
        match &self.pricing {
            EdgePricing::Unpriced => EdgeStatus::Unpriced,
            EdgePricing::NoRoute { .. } => EdgeStatus::NoRoute,
            EdgePricing::Priced { .. } if self.search_weight.is_finite() => EdgeStatus::Usable,
            EdgePricing::Priced { .. } => EdgeStatus::Degenerate,
        }
    }

    /// True if the edge is priced with a fee a route can be charged.
    pub fn is_usable(&self) -> bool {
        self.status() == EdgeStatus::Usable
    }
}

impl Default for ConversionEdge {
    fn default() -> Self {
        Self::unpriced()
    }
}

/// Directed multigraph of currencies and conversions.
pub struct CurrencyGraph {
    graph: DiGraph<CurrencyNode, ConversionEdge>,
    currency_to_node: HashMap<Currency, NodeIndex>,
}

impl CurrencyGraph {
    /// Build the graph from node names and neighbor lists.
    ///
    /// Nodes are created in the given order. Edges are created node by node,
    /// following each neighbor list in order; neighbors that are not nodes
    /// are skipped and a repeated neighbor yields a parallel edge. Every edge
    /// starts unpriced.
    pub fn build<I, C>(currencies: I, neighbors: &BTreeMap<Currency, Vec<Currency>>) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Currency>,
    {
        let mut graph = DiGraph::new();
        let mut currency_to_node = HashMap::new();
        let mut order = Vec::new();

        for currency in currencies {
            let currency = currency.into();
            if currency_to_node.contains_key(&currency) {
                warn!(currency = %currency, "Ignoring duplicate currency");
                continue;
            }
            let node = graph.add_node(CurrencyNode {
                currency: currency.clone(),
            });
            currency_to_node.insert(currency.clone(), node);
            order.push((currency, node));
        }

        for (currency, from) in &order {
            let Some(targets) = neighbors.get(currency) else {
                continue;
            };
            for target in targets {
                match currency_to_node.get(target) {
                    Some(&to) => {
                        graph.add_edge(*from, to, ConversionEdge::unpriced());
                    }
                    None => trace!(from = %currency, to = %target, "Skipping neighbor that is not a node"),
                }
            }
        }

        Self {
            graph,
            currency_to_node,
        }
    }

    pub fn from_topology(topology: &TopologyConfig) -> Self {
        Self::build(topology.currencies.iter().cloned(), &topology.neighbors)
    }

    /// Get the node index for a currency
    pub fn node(&self, currency: &Currency) -> Option<NodeIndex> {
        self.currency_to_node.get(currency).copied()
    }

    /// Node index for a currency, or `UnknownCurrency`.
    pub fn require(&self, currency: &Currency) -> RouteResult<NodeIndex> {
        self.node(currency)
            .ok_or_else(|| RouteError::UnknownCurrency(currency.clone()))
    }

    /// Get the currency for a node index
    pub fn currency(&self, node: NodeIndex) -> Option<&Currency> {
        self.graph.node_weight(node).map(|n| &n.currency)
    }

    /// Currencies in node order.
    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.graph.node_indices().map(|node| &self.graph[node].currency)
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing edges of `node` in construction order.
    pub fn outgoing(&self, node: NodeIndex) -> Vec<(EdgeIndex, NodeIndex, &ConversionEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges(node)
            .map(|e| (e.id(), e.target(), e.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges
    }

    /// First-constructed edge from `from` to `to`.
    pub fn edge_between(&self, from: NodeIndex, to: NodeIndex) -> Option<&ConversionEdge> {
        self.graph
            .edges_connecting(from, to)
            .min_by_key(|e| e.id())
            .map(|e| e.weight())
    }

    pub fn edge(&self, edge: EdgeIndex) -> Option<&ConversionEdge> {
        self.graph.edge_weight(edge)
    }

    pub fn edge_mut(&mut self, edge: EdgeIndex) -> Option<&mut ConversionEdge> {
        self.graph.edge_weight_mut(edge)
    }

    /// Every edge with its currency pair, in construction order.
    pub fn edge_pairs(&self) -> Vec<(EdgeIndex, CurrencyPair)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((
                    edge,
                    CurrencyPair::new(self.graph[from].currency.clone(), self.graph[to].currency.clone()),
                ))
            })
            .collect()
    }

    /// Every edge as `(pair, edge)`, in construction order.
    pub fn edges(&self) -> impl Iterator<Item = (CurrencyPair, &ConversionEdge)> {
        self.graph.edge_references().map(|e| {
            (
                CurrencyPair::new(
                    self.graph[e.source()].currency.clone(),
                    self.graph[e.target()].currency.clone(),
                ),
                e.weight(),
            )
        })
    }
}
