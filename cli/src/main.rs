//! fxroute CLI
//!
//! Plans lowest-fee currency conversion routes from a fee snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fxroute_common::Currency;
use fxroute_router::{RouteError, RoutePlanner};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod snapshot;

use snapshot::SnapshotFile;

/// fxroute CLI
#[derive(Parser, Debug)]
#[command(name = "fxroute")]
#[command(about = "Lowest-fee currency conversion routes", version)]
struct Args {
    /// Fee snapshot to load (TOML); the built-in demo snapshot when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Treat every route hop as a 1:1 notional step instead of applying snapshot rates
    #[arg(long, global = true)]
    notional: bool,

    /// Also report fees and final amounts in this currency
    #[arg(long, global = true)]
    report_in: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the lowest-fee route between two currencies
    Route {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "100")]
        amount: Decimal,
    },
    /// Shortest-path costs from one currency to every other
    Paths {
        #[arg(long)]
        from: String,
    },
    /// Fee breakdown along a given path, e.g. --path ARS,USDC,MXN
    Evaluate {
        #[arg(long, value_delimiter = ',', required = true)]
        path: Vec<String>,
        #[arg(long, default_value = "100")]
        amount: Decimal,
    },
    /// Fee for a single conversion
    Cost {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "1")]
        amount: Decimal,
    },
    /// Convert an amount at snapshot market rates, without fees
    Convert {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "1")]
        amount: Decimal,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let snapshot = match &args.config {
        Some(path) => SnapshotFile::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SnapshotFile::demo().context("loading built-in demo snapshot")?,
    };

    let mut config = snapshot.router_config();
    if let Some(currency) = &args.report_in {
        config.reporting_currency = Some(Currency::new(currency.as_str()));
    }

    let converter = Arc::new(snapshot.converter());
    let selector = snapshot.selector(converter.clone());
    let mut planner = RoutePlanner::new(snapshot.topology.clone(), selector, config).map_err(route_error)?;
    if !args.notional || matches!(args.command, Command::Convert { .. }) {
        planner = planner.with_converter(converter);
    }

    match args.command {
        Command::Route { from, to, amount } => {
            let route = planner
                .best_route(&Currency::new(from), &Currency::new(to), amount)
                .await
                .map_err(route_error)?;
            info!(route_id = %route.id, hops = route.hop_count(), "Route planned");
            print_json(&route)
        }
        Command::Paths { from } => {
            let report = planner
                .shortest_paths(&Currency::new(from), None)
                .await
                .map_err(route_error)?;
            print_json(&report)
        }
        Command::Evaluate { path, amount } => {
            let path: Vec<Currency> = path.into_iter().map(Currency::new).collect();
            let evaluation = planner.evaluate(&path, amount).await.map_err(route_error)?;
            print_json(&evaluation)
        }
        Command::Cost { from, to, amount } => {
            let cost = planner
                .quote_cost(&Currency::new(from), &Currency::new(to), amount)
                .await
                .map_err(route_error)?;
            print_json(&cost)
        }
        Command::Convert { from, to, amount } => {
            let conversion = planner
                .convert(&Currency::new(from), &Currency::new(to), amount)
                .await
                .map_err(route_error)?;
            print_json(&conversion)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn route_error(err: RouteError) -> anyhow::Error {
    anyhow::anyhow!("[{}] {}", err.error_code(), err)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
