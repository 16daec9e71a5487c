//! Fee accounting along a chosen path.

use std::collections::BTreeMap;

use fxroute_common::{Currency, CurrencyPair};
use fxroute_fees::RateConverter;
use petgraph::graph::NodeIndex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RouteError, RouteResult};
use crate::graph::{CurrencyGraph, EdgePricing};

/// One conversion step of an evaluated path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopBreakdown {
    pub from: Currency,
    pub to: Currency,
    /// Fee charged, in `from` units.
    pub fee: Decimal,
    pub fee_fraction: Decimal,
    pub amount_before: Decimal,
    pub amount_after_fee: Decimal,
    /// Amount carried into the next hop; converted to `to` units when a
    /// rate converter is configured.
    pub amount_next: Decimal,
    pub provider: String,
    /// Fee expressed in the reporting currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_reporting: Option<Decimal>,
}

/// Outcome of pushing an amount through a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEvaluation {
    pub path: Vec<Currency>,
    pub initial_amount: Decimal,
    pub final_amount: Decimal,
    /// Sum of per-hop fees, each in its own hop's source currency.
    pub total_fee: Decimal,
    pub hops: Vec<HopBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fee_reporting: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_amount_reporting: Option<Decimal>,
}

impl PathEvaluation {
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Hop fees summed per currency they were charged in.
    pub fn fees_by_currency(&self) -> BTreeMap<Currency, Decimal> {
        let mut fees = BTreeMap::new();
        for hop in &self.hops {
            *fees.entry(hop.from.clone()).or_insert(Decimal::ZERO) += hop.fee;
        }
        fees
    }
}

/// Charge one hop's fee on `amount`.
fn charge_hop(graph: &CurrencyGraph, from: NodeIndex, to: NodeIndex, amount: Decimal) -> RouteResult<HopBreakdown> {
    let from_currency = currency(graph, from)?;
    let to_currency = currency(graph, to)?;

    let edge = graph.edge_between(from, to).ok_or_else(|| RouteError::MissingEdge {
        from: from_currency.clone(),
        to: to_currency.clone(),
    })?;

    let (fee_fraction, provider) = match edge.pricing() {
        EdgePricing::Priced { fee_fraction, provider }
            if *fee_fraction >= Decimal::ZERO && *fee_fraction < Decimal::ONE =>
        {
            (*fee_fraction, provider.clone())
        }
        _ => {
            return Err(RouteError::UnusableEdge {
                from: from_currency,
                to: to_currency,
            })
        }
    };

    let fee = amount * fee_fraction;
    let amount_after_fee = amount - fee;

    Ok(HopBreakdown {
        from: from_currency,
        to: to_currency,
        fee,
        fee_fraction,
        amount_before: amount,
        amount_after_fee,
        amount_next: amount_after_fee,
        provider,
        fee_reporting: None,
    })
}

fn currency(graph: &CurrencyGraph, node: NodeIndex) -> RouteResult<Currency> {
    graph
        .currency(node)
        .cloned()
        .ok_or_else(|| RouteError::Configuration(format!("Node {} is not in the graph", node.index())))
}

fn check_inputs(path: &[NodeIndex], amount: Decimal) -> RouteResult<()> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if amount < Decimal::ZERO {
        return Err(RouteError::InvalidAmount(amount));
    }
    Ok(())
}

/// Push `amount` through `path`, deducting each hop's fee.
///
/// Every hop is a 1:1 notional step: no exchange rate is applied between hops.
pub fn evaluate_path(graph: &CurrencyGraph, path: &[NodeIndex], amount: Decimal) -> RouteResult<PathEvaluation> {
    check_inputs(path, amount)?;

    let mut running = amount;
    let mut total_fee = Decimal::ZERO;
    let mut hops = Vec::with_capacity(path.len().saturating_sub(1));

    for window in path.windows(2) {
        let hop = charge_hop(graph, window[0], window[1], running)?;
        total_fee += hop.fee;
        running = hop.amount_next;
        hops.push(hop);
    }

    Ok(PathEvaluation {
        path: path.iter().map(|n| currency(graph, *n)).collect::<RouteResult<_>>()?,
        initial_amount: amount,
        final_amount: running,
        total_fee,
        hops,
        reporting_currency: None,
        total_fee_reporting: None,
        final_amount_reporting: None,
    })
}

/// Path evaluation with exchange rates applied between hops.
///
/// With a converter, the amount left after each fee is converted into the
/// hop's target currency before the next fee is charged. With a reporting
/// currency, fees and the final amount are also expressed in it.
#[derive(Clone, Copy)]
pub struct PathEvaluator<'a> {
    converter: Option<&'a dyn RateConverter>,
    reporting_currency: Option<&'a Currency>,
}

impl<'a> PathEvaluator<'a> {
    /// Evaluator without conversion, equivalent to [`evaluate_path`].
    pub fn new() -> Self {
        Self {
            converter: None,
            reporting_currency: None,
        }
    }

    pub fn with_converter(mut self, converter: &'a dyn RateConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_reporting_currency(mut self, currency: &'a Currency) -> Self {
        self.reporting_currency = Some(currency);
        self
    }

    pub async fn evaluate(
        &self,
        graph: &CurrencyGraph,
        path: &[NodeIndex],
        amount: Decimal,
    ) -> RouteResult<PathEvaluation> {
        let Some(converter) = self.converter else {
            if let Some(reporting) = self.reporting_currency {
                return Err(RouteError::Configuration(format!(
                    "Reporting in {} requires a rate converter",
                    reporting
                )));
            }
            return evaluate_path(graph, path, amount);
        };

        check_inputs(path, amount)?;

        let mut running = amount;
        let mut total_fee = Decimal::ZERO;
        let mut total_fee_reporting = Decimal::ZERO;
        let mut hops = Vec::with_capacity(path.len().saturating_sub(1));

        for window in path.windows(2) {
            let mut hop = charge_hop(graph, window[0], window[1], running)?;
            let pair = CurrencyPair::new(hop.from.clone(), hop.to.clone());
            hop.amount_next = converter.convert(&pair, hop.amount_after_fee).await?;

            if let Some(reporting) = self.reporting_currency {
                let fee = converter
                    .convert(&CurrencyPair::new(hop.from.clone(), reporting.clone()), hop.fee)
                    .await?;
                total_fee_reporting += fee;
                hop.fee_reporting = Some(fee);
            }

            debug!(
                from = %hop.from,
                to = %hop.to,
                fee = %hop.fee,
                amount_next = %hop.amount_next,
                "Evaluated hop"
            );
            total_fee += hop.fee;
            running = hop.amount_next;
            hops.push(hop);
        }

        let path: Vec<Currency> = path.iter().map(|n| currency(graph, *n)).collect::<RouteResult<_>>()?;

        let final_amount_reporting = match (self.reporting_currency, path.last()) {
            (Some(reporting), Some(last)) => Some(
                converter
                    .convert(&CurrencyPair::new(last.clone(), reporting.clone()), running)
                    .await?,
            ),
            _ => None,
        };

        Ok(PathEvaluation {
            path,
            initial_amount: amount,
            final_amount: running,
            total_fee,
            hops,
            reporting_currency: self.reporting_currency.cloned(),
            total_fee_reporting: self.reporting_currency.map(|_| total_fee_reporting),
            final_amount_reporting,
        })
    }
}

impl Default for PathEvaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use fxroute_fees::{FeeError, FeeQuote, StaticRateConverter};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    /// Graph with one edge per quote, nodes in order of first mention.
    fn graph_with(quotes: &[FeeQuote]) -> CurrencyGraph {
        let mut topology = TopologyConfig::new(Vec::new());
        for quote in quotes {
            let pair = quote.pair();
            for currency in [&pair.from, &pair.to] {
                if !topology.currencies.contains(currency) {
                    topology.currencies.push(currency.clone());
                }
            }
            topology = topology.with_edge(pair.from.code(), pair.to.code());
        }

        let mut graph = CurrencyGraph::from_topology(&topology);
        for ((edge, _), quote) in graph.edge_pairs().into_iter().zip(quotes) {
            graph.edge_mut(edge).unwrap().apply_quote(quote);
        }
        graph
    }

    fn fee(from: &str, to: &str, fraction: Decimal) -> FeeQuote {
        FeeQuote::priced(CurrencyPair::new(from, to), fraction, format!("{from}-{to}"))
    }

    fn nodes(graph: &CurrencyGraph, codes: &[&str]) -> Vec<NodeIndex> {
        codes.iter().map(|c| graph.node(&Currency::new(*c)).unwrap()).collect()
    }

    #[test]
    fn test_three_node_chain() {
        let graph = graph_with(&[fee("A", "B", dec!(0.1)), fee("B", "C", dec!(0.2))]);
        let path = nodes(&graph, &["A", "B", "C"]);

        let result = evaluate_path(&graph, &path, dec!(1000)).unwrap();

        assert_eq!(result.final_amount, dec!(720));
        assert_eq!(result.total_fee, dec!(280));
        assert_eq!(result.hop_count(), 2);

        let first = &result.hops[0];
        assert_eq!(first.fee, dec!(100));
        assert_eq!(first.amount_before, dec!(1000));
        assert_eq!(first.amount_after_fee, dec!(900));
        assert_eq!(first.amount_next, dec!(900));
        assert_eq!(first.provider, "A-B");

        let second = &result.hops[1];
        assert_eq!(second.fee, dec!(180));
        assert_eq!(second.amount_after_fee, dec!(720));
        assert_eq!(second.fee_fraction, dec!(0.2));
        assert_eq!(result.path, vec![Currency::new("A"), Currency::new("B"), Currency::new("C")]);
    }

    #[test]
    fn test_single_node_path() {
        let graph = graph_with(&[fee("A", "B", dec!(0.1))]);
        let path = nodes(&graph, &["A"]);

        let result = evaluate_path(&graph, &path, dec!(1000)).unwrap();

        assert_eq!(result.final_amount, dec!(1000));
        assert_eq!(result.total_fee, Decimal::ZERO);
        assert!(result.hops.is_empty());
    }

    #[test]
    fn test_order_sensitive_fees() {
        let graph = graph_with(&[
            fee("A", "B", dec!(0.1)),
            fee("B", "C", dec!(0.2)),
            fee("A", "D", dec!(0.2)),
            fee("D", "C", dec!(0.1)),
        ]);

        let abc = evaluate_path(&graph, &nodes(&graph, &["A", "B", "C"]), dec!(1000)).unwrap();
        let adc = evaluate_path(&graph, &nodes(&graph, &["A", "D", "C"]), dec!(1000)).unwrap();

        // Same retained value, different fee split
        assert_eq!(abc.final_amount, adc.final_amount);
        assert_eq!(adc.hops[0].fee, dec!(200));
        assert_eq!(adc.hops[1].fee, dec!(80));
        assert_ne!(abc.hops[0].fee, adc.hops[0].fee);
    }

    #[test]
    fn test_errors() {
        let graph = graph_with(&[
            fee("A", "B", dec!(0.1)),
            FeeQuote::no_route(CurrencyPair::new("B", "C"), "p"),
            fee("C", "A", dec!(1)),
        ]);

        assert!(matches!(evaluate_path(&graph, &[], dec!(1)), Err(RouteError::EmptyPath)));

        let path = nodes(&graph, &["A", "C"]);
        assert!(matches!(
            evaluate_path(&graph, &path, dec!(1)),
            Err(RouteError::MissingEdge { .. })
        ));

        let path = nodes(&graph, &["A", "B", "C"]);
        let err = evaluate_path(&graph, &path, dec!(1)).unwrap_err();
        assert_eq!(err.error_code(), "UNUSABLE_EDGE");

        let path = nodes(&graph, &["C", "A"]);
        assert!(matches!(
            evaluate_path(&graph, &path, dec!(1)),
            Err(RouteError::UnusableEdge { .. })
        ));

        let path = nodes(&graph, &["A", "B"]);
        assert!(matches!(
            evaluate_path(&graph, &path, dec!(-5)),
            Err(RouteError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_zero_fee_edge_evaluates() {
        let graph = graph_with(&[fee("A", "B", Decimal::ZERO)]);
        let result = evaluate_path(&graph, &nodes(&graph, &["A", "B"]), dec!(50)).unwrap();

        assert_eq!(result.final_amount, dec!(50));
        assert_eq!(result.total_fee, Decimal::ZERO);
    }

    #[test]
    fn test_fees_by_currency() {
        let graph = graph_with(&[
            fee("A", "B", dec!(0.1)),
            fee("B", "A", dec!(0.5)),
        ]);
        let result = evaluate_path(&graph, &nodes(&graph, &["A", "B", "A", "B"]), dec!(100)).unwrap();

        let fees = result.fees_by_currency();
        // A: 10 + 4.5, B: 45
        assert_eq!(fees[&Currency::new("A")], dec!(14.5));
        assert_eq!(fees[&Currency::new("B")], dec!(45));
    }

    #[tokio::test]
    async fn test_converter_applies_rates() {
        let graph = graph_with(&[fee("ARS", "USDC", dec!(0.01)), fee("USDC", "MXN", dec!(0.02))]);
        let converter = StaticRateConverter::new()
            .with_rate("USD", "ARS", dec!(1000))
            .with_rate("USD", "MXN", dec!(20))
            .with_rate("USDC", "USD", dec!(1));
        let reporting = Currency::usd();

        let result = PathEvaluator::new()
            .with_converter(&converter)
            .with_reporting_currency(&reporting)
            .evaluate(&graph, &nodes(&graph, &["ARS", "USDC", "MXN"]), dec!(100000))
            .await
            .unwrap();

        // 100000 ARS - 1% = 99000 ARS = 99 USDC; 99 USDC - 2% = 97.02 USDC = 1940.4 MXN
        assert_eq!(result.hops[0].fee, dec!(1000));
        assert_eq!(result.hops[0].amount_next, dec!(99));
        assert_eq!(result.hops[1].fee, dec!(1.98));
        assert_eq!(result.final_amount, dec!(1940.4));

        assert_eq!(result.hops[0].fee_reporting, Some(dec!(1)));
        assert_eq!(result.total_fee_reporting, Some(dec!(2.98)));
        assert_eq!(result.final_amount_reporting, Some(dec!(97.02)));
        assert_eq!(result.reporting_currency, Some(Currency::usd()));
    }

    #[tokio::test]
    async fn test_without_converter_matches_plain_evaluation() {
        let graph = graph_with(&[fee("A", "B", dec!(0.1)), fee("B", "C", dec!(0.2))]);
        let path = nodes(&graph, &["A", "B", "C"]);

        let plain = evaluate_path(&graph, &path, dec!(1000)).unwrap();
        let evaluated = PathEvaluator::default().evaluate(&graph, &path, dec!(1000)).await.unwrap();

        assert_eq!(plain, evaluated);
        assert!(evaluated.total_fee_reporting.is_none());
    }

    #[tokio::test]
    async fn test_reporting_requires_converter() {
        let graph = graph_with(&[fee("A", "B", dec!(0.1))]);
        let reporting = Currency::usd();

        let result = PathEvaluator::new()
            .with_reporting_currency(&reporting)
            .evaluate(&graph, &nodes(&graph, &["A", "B"]), dec!(1))
            .await;

        assert!(matches!(result, Err(RouteError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_conversion_failure_propagates() {
        let graph = graph_with(&[fee("SOL", "BTC", dec!(0.01))]);
        let converter = StaticRateConverter::new();

        let result = PathEvaluator::new()
            .with_converter(&converter)
            .evaluate(&graph, &nodes(&graph, &["SOL", "BTC"]), dec!(1))
            .await;

        assert!(matches!(
            result,
            Err(RouteError::Provider(FeeError::ConversionUnavailable(_)))
        ));
    }

    proptest! {
        #[test]
        fn prop_final_amount_is_product_of_retained(
            fractions in proptest::collection::vec(1u32..9_999, 1..6),
            amount in 1u64..1_000_000,
        ) {
            let codes: Vec<String> = (0..=fractions.len()).map(|i| format!("C{i}")).collect();
            let fees: Vec<_> = fractions
                .iter()
                .enumerate()
                .map(|(i, f)| fee(&codes[i], &codes[i + 1], Decimal::new(*f as i64, 4)))
                .collect();
            let graph = graph_with(&fees);
            let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
            let amount = Decimal::from(amount);

            let result = evaluate_path(&graph, &nodes(&graph, &refs), amount).unwrap();

            let retained = fractions
                .iter()
                .fold(Decimal::ONE, |acc, f| acc * (Decimal::ONE - Decimal::new(*f as i64, 4)));
            let expected = amount * retained;
            prop_assert!((result.final_amount - expected).abs() < dec!(0.000001));
            prop_assert_eq!(result.final_amount + result.total_fee, amount);
        }
    }
}
