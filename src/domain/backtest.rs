//! Backtest driver: replays stored bars through the engine session by
//! session against the simulated broker.

use tracing::{debug, info};

use crate::domain::config::{BacktestConfig, StrategyConfig};
use crate::domain::engine::{Engine, MarketSession, SessionReport, TriggerKind, TriggerOutcome};
use crate::domain::error::AllocatorError;
use crate::domain::instrument::{build_unified_timeline, Instrument};
use crate::domain::portfolio::Portfolio;
use crate::domain::sim_broker::SimBroker;

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    pub sessions: Vec<SessionReport>,
    pub rebalances: usize,
    pub repositions: usize,
}

impl BacktestResult {
    pub fn order_count(&self) -> usize {
        self.sessions.iter().map(|s| s.orders().count()).sum()
    }

    pub fn failed_triggers(&self) -> usize {
        self.sessions
            .iter()
            .flat_map(|s| s.triggers.iter())
            .filter(|t| matches!(t.outcome, TriggerOutcome::Failed(_)))
            .count()
    }
}

/// Run the allocation engine over every session of the benchmark.
///
/// Instruments missing a bar on a session simply do not trade that day.
pub fn run_backtest(
    benchmark: &Instrument,
    instruments: &[Instrument],
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, AllocatorError> {
    let timeline = build_unified_timeline(&[benchmark]);
    if timeline.is_empty() {
        return Err(AllocatorError::NoData {
            code: benchmark.code.clone(),
            exchange: benchmark.exchange.clone(),
        });
    }

    let codes: Vec<String> = instruments.iter().map(|i| i.code.clone()).collect();
    let mut engine = Engine::new(strategy.clone(), &benchmark.code, &config.exchange, &codes);
    let mut broker = SimBroker::new(config.initial_capital, &config.exchange);
    let mut sessions = Vec::with_capacity(timeline.len());
    let mut rebalances = 0;
    let mut repositions = 0;

    for date in timeline {
        let Some(benchmark_bar) = benchmark.get_bar(date) else {
            continue;
        };
        let session = MarketSession {
            date,
            benchmark: benchmark_bar.clone(),
            bars: instruments
                .iter()
                .filter_map(|i| i.get_bar(date).cloned())
                .collect(),
        };

        broker.mark(date, &session.bars);
        let report = engine.on_session_advance(&session, &mut broker)?;
        broker.record_equity();

        if report.trigger(TriggerKind::Rebalance).is_some() {
            rebalances += 1;
        }
        if report.trigger(TriggerKind::Reposition).is_some() {
            repositions += 1;
        }
        debug!(%date, orders = report.orders().count(), "session processed");
        sessions.push(report);
    }

    let portfolio = broker.into_portfolio();
    info!(
        sessions = sessions.len(),
        rebalances,
        repositions,
        trades = portfolio.closed_trades.len(),
        "backtest finished"
    );

    Ok(BacktestResult {
        portfolio,
        sessions,
        rebalances,
        repositions,
    })
}
