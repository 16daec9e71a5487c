//! fxroute Router
//!
//! Finds the lowest-fee chain of conversions between two currencies.
//!
//! # Overview
//!
//! - [`CurrencyGraph`]: one node per currency, one directed edge per
//!   conversion, each edge carrying a fee fraction and a search weight
//! - [`CostUpdater`]: prices every edge through a fee provider and derives
//!   its weight as `-ln(1 - fee)`, pruning unusable edges with infinity
//! - [`shortest_paths`]: Dijkstra over the weights, so the cheapest path is
//!   the one that retains the most value
//! - [`evaluate_path`] / [`PathEvaluator`]: the hop-by-hop fee breakdown for
//!   a concrete amount
//! - [`RoutePlanner`]: builds, prices, searches and evaluates per request
//!
//! # Example
//!
//! ```rust,ignore
//! use fxroute_router::{RoutePlanner, RouterConfig, TopologyConfig};
//!
//! let planner = RoutePlanner::new(TopologyConfig::default(), selector, RouterConfig::from_env())?;
//! let route = planner.best_route(&Currency::ars(), &Currency::mxn(), dec!(1000)).await?;
//! println!("{:?} keeps {:.4}", route.path, route.retained_fraction);
//! ```

pub mod config;
pub mod cost;
pub mod dijkstra;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod planner;

pub use config::{RouterConfig, TopologyConfig, UpdateStrategy};
pub use cost::{search_weight, CostUpdater, UpdateSummary};
pub use dijkstra::{shortest_paths, ShortestPaths};
pub use error::{RouteError, RouteResult};
pub use evaluator::{evaluate_path, HopBreakdown, PathEvaluation, PathEvaluator};
pub use graph::{ConversionEdge, CurrencyGraph, CurrencyNode, EdgePricing, EdgeStatus};
pub use planner::{Conversion, CostQuote, RoutePlanner, RouteRecommendation, ShortestPathReport};
