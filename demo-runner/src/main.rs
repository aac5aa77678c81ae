mod stubs;

use analyst_pool::analyst::{Analyst, BuffettAnalyst, GrahamAnalyst, MomentumAnalyst};
use analyst_pool::reasoner::Reasoner;
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use decision_engine::engine::Pipeline;
use decision_engine::gateway::{ExecutionGateway, PaperGateway};
use fund_core::config::PipelineConfig;
use fund_core::model::{InstrumentId, PortfolioState};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use stubs::{demo_contexts, DemoMarketData, HeuristicReasoner};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pipeline configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Instruments to evaluate, as SYMBOL or SYMBOL.EXCHANGE
    #[arg(long)]
    instruments: Vec<String>,

    /// Number of evaluation cycles to run
    #[arg(long, default_value_t = 1)]
    cycles: u32,

    /// Starting cash for the paper portfolio
    #[arg(long, default_value_t = 100_000.0)]
    cash: f64,
}

fn parse_instrument(raw: &str) -> InstrumentId {
    match raw.split_once('.') {
        Some((symbol, exchange)) => InstrumentId::new(symbol, exchange),
        None => InstrumentId::new(raw, "NSE"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = PipelineConfig::load(args.config.as_deref())?;

    let instruments: Vec<InstrumentId> = if args.instruments.is_empty() {
        ["RELIANCE", "HDFCBANK", "ONGC", "INFY", "ITC", "TATASTEEL"]
            .iter()
            .map(|s| InstrumentId::new(*s, "NSE"))
            .collect()
    } else {
        args.instruments.iter().map(|s| parse_instrument(s)).collect()
    };

    let contexts = demo_contexts(&instruments, Utc::now().timestamp_millis());

    let (gateway, mut reports) = PaperGateway::new();
    for context in &contexts {
        gateway.set_price(context.price().clone());
    }
    let gateway = Arc::new(gateway);

    let reasoner: Arc<dyn Reasoner> = Arc::new(HeuristicReasoner);
    let analysts: Vec<Arc<dyn Analyst>> = vec![
        Arc::new(GrahamAnalyst::new(Arc::clone(&reasoner))),
        Arc::new(BuffettAnalyst::new(Arc::clone(&reasoner))),
        Arc::new(MomentumAnalyst::new(Arc::clone(&reasoner))),
    ];

    let mut pipeline = Pipeline::new(
        config,
        analysts,
        Arc::new(DemoMarketData::new(contexts)),
        Arc::clone(&gateway) as Arc<dyn ExecutionGateway>,
        PortfolioState::with_cash(args.cash),
    )?;

    for cycle in 1..=args.cycles {
        info!("Running cycle {}/{}", cycle, args.cycles);
        let result = pipeline.run_cycle(&instruments).await;

        // Drain paper-broker confirmations; this is the only path that
        // moves the portfolio.
        while let Ok(report) = reports.try_recv() {
            pipeline.on_execution_report(report);
        }

        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    let portfolio = pipeline.portfolio();
    info!(
        "Final: cash {:.2}, realized PnL {:.2}, peak equity {:.2}, {} open positions",
        portfolio.cash(),
        portfolio.realized_pnl(),
        portfolio.peak_equity(),
        portfolio.positions().count()
    );

    Ok(())
}
