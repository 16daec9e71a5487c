//! Fee lookup and the fee-to-weight transform.
//!
//! A fee fraction `f` keeps `1 - f` of the value on a hop, so the value kept
//! along a path is the product of `1 - f_i`. Searching over `-ln(1 - f)`
//! turns that product into a sum a shortest-path search can minimise.

use fxroute_common::CurrencyPair;
use fxroute_fees::{FeeProvider, FeeQuote};
use futures::stream::{self, StreamExt, TryStreamExt};
use petgraph::graph::EdgeIndex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::UpdateStrategy;
use crate::error::RouteResult;
use crate::graph::{CurrencyGraph, EdgeStatus};

/// Fees below this are small enough for `ln_1p` to beat `ln(1 - f)` on precision.
const SMALL_FEE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Search weight for a fee fraction: `-ln(1 - f)` for `0 < f < 1`, else infinity.
///
/// A zero fee would make a free edge and a negative one a gain; both are
/// treated as unpriceable along with total loss. The retained part `1 - f`
/// is taken in `Decimal` so fees just below 1 keep a finite weight.
pub fn search_weight(fee_fraction: Decimal) -> f64 {
    if fee_fraction <= Decimal::ZERO || fee_fraction >= Decimal::ONE {
        return f64::INFINITY;
    }

    let weight = if fee_fraction < SMALL_FEE {
        fee_fraction.to_f64().map(|f| -(-f).ln_1p())
    } else {
        (Decimal::ONE - fee_fraction).to_f64().map(|kept| -kept.ln())
    };

    match weight {
        Some(w) if w > 0.0 && w.is_finite() => w,
        _ => f64::INFINITY,
    }
}

/// Counts from one pricing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub edges: usize,
    pub usable: usize,
    pub no_route: usize,
    pub degenerate: usize,
}

/// Prices every edge of a graph through a fee provider.
///
/// The provider is usually a [`ProviderSelector`](fxroute_fees::ProviderSelector),
/// which routes each pair to the fiat or crypto provider.
pub struct CostUpdater<'a> {
    provider: &'a dyn FeeProvider,
    quote_amount: Decimal,
    strategy: UpdateStrategy,
    max_concurrent: usize,
}

impl<'a> CostUpdater<'a> {
    pub fn new(provider: &'a dyn FeeProvider) -> Self {
        Self {
            provider,
            quote_amount: Decimal::ONE,
            strategy: UpdateStrategy::Sequential,
            max_concurrent: 8,
        }
    }

    /// Notional amount every edge is quoted at.
    pub fn with_quote_amount(mut self, amount: Decimal) -> Self {
        self.quote_amount = amount;
        self
    }

    pub fn with_strategy(mut self, strategy: UpdateStrategy, max_concurrent: usize) -> Self {
        self.strategy = strategy;
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Look up the fee of every edge and refresh its search weight.
    ///
    /// The first provider failure aborts the pass. With the sequential
    /// strategy edges priced before the failure keep their new fee; with the
    /// concurrent strategy the graph is left untouched.
    pub async fn update_fees(&self, graph: &mut CurrencyGraph) -> RouteResult<UpdateSummary> {
        let pairs = graph.edge_pairs();
        debug!(
            edges = pairs.len(),
            strategy = %self.strategy,
            quote_amount = %self.quote_amount,
            "Updating edge fees"
        );

        match self.strategy {
            UpdateStrategy::Sequential => {
                for (edge, pair) in pairs {
                    let quote = self.provider.quote(&pair, self.quote_amount).await?;
                    apply(graph, edge, &quote);
                }
            }
            UpdateStrategy::Concurrent => {
                let mut quotes: Vec<(EdgeIndex, FeeQuote)> = stream::iter(pairs)
                    .map(|(edge, pair)| async move {
                        self.quote(&pair).await.map(|quote| (edge, quote))
                    })
                    .buffer_unordered(self.max_concurrent)
                    .try_collect()
                    .await?;

                quotes.sort_by_key(|(edge, _)| *edge);
                for (edge, quote) in &quotes {
                    apply(graph, *edge, quote);
                }
            }
        }

        let summary = summarize(graph);
        info!(
            edges = summary.edges,
            usable = summary.usable,
            no_route = summary.no_route,
            degenerate = summary.degenerate,
            "Edge fees updated"
        );
        Ok(summary)
    }

    async fn quote(&self, pair: &CurrencyPair) -> RouteResult<FeeQuote> {
        Ok(self.provider.quote(pair, self.quote_amount).await?)
    }
}

fn apply(graph: &mut CurrencyGraph, edge: EdgeIndex, quote: &FeeQuote) {
    let Some(conversion) = graph.edge_mut(edge) else {
        return;
    };
    conversion.apply_quote(quote);

    let pair = quote.pair();
    match conversion.status() {
        EdgeStatus::Usable => debug!(
            pair = %pair,
            provider = quote.provider(),
            fee_fraction = ?conversion.fee_fraction(),
            weight = conversion.search_weight(),
            "Priced edge"
        ),
        EdgeStatus::NoRoute => warn!(pair = %pair, provider = quote.provider(), "No route for pair"),
        EdgeStatus::Degenerate => warn!(
            pair = %pair,
            provider = quote.provider(),
            fee_fraction = ?conversion.fee_fraction(),
            "Fee outside (0, 1), edge excluded from search"
        ),
        EdgeStatus::Unpriced => {}
    }
}

fn summarize(graph: &CurrencyGraph) -> UpdateSummary {
    graph.edges().fold(
        UpdateSummary {
            edges: graph.edge_count(),
            ..Default::default()
        },
        |mut summary, (_, edge)| {
            match edge.status() {
                EdgeStatus::Usable => summary.usable += 1,
                EdgeStatus::NoRoute => summary.no_route += 1,
                EdgeStatus::Degenerate => summary.degenerate += 1,
                EdgeStatus::Unpriced => {}
            }
            summary
        },
    )
}
