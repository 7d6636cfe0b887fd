//! Session-driven allocation engine.
//!
//! The caller feeds one [`MarketSession`] at a time through
//! [`Engine::on_session_advance`]. Within a session the order is fixed:
//! append bars, refresh indicators, advance eligibility, consult the
//! scheduler, then run the rebalance (sells before buys) and/or the
//! reposition.
//!
//! An order the broker cannot fund is left out and the pass moves on to the
//! next candidate; the trigger then ends as cash-exhausted. Any other broker
//! error stops the trigger that hit it. It is logged and recorded in the
//! [`SessionReport`], and the next trigger or session runs normally.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::domain::benchmark_gate::allows_new_exposure;
use crate::domain::config::StrategyConfig;
use crate::domain::eligibility::{EligibilityFilter, EligibilityPhase};
use crate::domain::error::AllocatorError;
use crate::domain::indicator_cache::{IndicatorCache, IndicatorPeriods};
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::ranking::{rank, RankedList};
use crate::domain::scheduler::RebalanceScheduler;
use crate::domain::sizing::target_size;
use crate::ports::broker_port::BrokerPort;

const POSITION_EPSILON: f64 = 1e-9;

/// Market state for one trading session: the benchmark bar plus the bars of
/// every instrument that traded.
#[derive(Debug, Clone)]
pub struct MarketSession {
    pub date: NaiveDate,
    pub benchmark: OhlcvBar,
    pub bars: Vec<OhlcvBar>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderIntent {
    Buy { code: String, size: f64 },
    Close { code: String },
    TargetSize { code: String, size: f64 },
}

impl OrderIntent {
    pub fn code(&self) -> &str {
        match self {
            OrderIntent::Buy { code, .. }
            | OrderIntent::Close { code }
            | OrderIntent::TargetSize { code, .. } => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Rebalance,
    Reposition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Completed,
    /// Nothing eligible to rank.
    EmptyUniverse,
    /// Reposition before any rebalance produced a ranking.
    NoRanking,
    /// Benchmark below its moving average; buy side suppressed.
    GateClosed,
    /// Cash ran out; orders issued before that stand.
    CashExhausted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerReport {
    pub kind: TriggerKind,
    pub outcome: TriggerOutcome,
    pub orders: Vec<OrderIntent>,
    /// Codes whose order was skipped because their volatility was degenerate.
    pub skipped: Vec<String>,
    /// Codes whose order the broker could not fund from available cash.
    pub unfunded: Vec<String>,
}

impl TriggerReport {
    fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            outcome: TriggerOutcome::Completed,
            orders: Vec::new(),
            skipped: Vec::new(),
            unfunded: Vec::new(),
        }
    }

    /// Record an order result. Insufficient cash is not fatal: the code is
    /// noted as unfunded and `false` is returned.
    fn record(
        &mut self,
        placed: Result<(), AllocatorError>,
        order: OrderIntent,
    ) -> Result<bool, AllocatorError> {
        match placed {
            Ok(()) => {
                self.orders.push(order);
                Ok(true)
            }
            Err(AllocatorError::InsufficientCash {
                code,
                needed,
                available,
            }) => {
                debug!(%code, needed, available, "order left unfunded");
                self.unfunded.push(code);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub date: NaiveDate,
    pub phase: EligibilityPhase,
    pub eligible: usize,
    pub triggers: Vec<TriggerReport>,
}

impl SessionReport {
    pub fn orders(&self) -> impl Iterator<Item = &OrderIntent> {
        self.triggers.iter().flat_map(|t| t.orders.iter())
    }

    pub fn trigger(&self, kind: TriggerKind) -> Option<&TriggerReport> {
        self.triggers.iter().find(|t| t.kind == kind)
    }
}

pub struct Engine {
    config: StrategyConfig,
    benchmark: Instrument,
    instruments: Vec<Instrument>,
    index: HashMap<String, usize>,
    cache: IndicatorCache,
    eligibility: EligibilityFilter,
    scheduler: RebalanceScheduler,
    ranked: Option<Rc<RankedList>>,
}

impl Engine {
    /// Build an engine over a fixed monitored universe. Codes are expected to
    /// be unique; a repeated code is monitored once.
    pub fn new(config: StrategyConfig, benchmark: &str, exchange: &str, codes: &[String]) -> Self {
        let mut instruments = Vec::with_capacity(codes.len());
        let mut index = HashMap::with_capacity(codes.len());
        for code in codes {
            if index.contains_key(code) {
                continue;
            }
            index.insert(code.clone(), instruments.len());
            instruments.push(Instrument::empty(code, exchange));
        }

        Self {
            cache: IndicatorCache::new(IndicatorPeriods::from(&config)),
            eligibility: EligibilityFilter::new(config.stock_ma_period),
            scheduler: RebalanceScheduler::new(
                config.rebalance_weekday,
                config.reposition_weekday,
                config.reposition_occurrence,
            ),
            benchmark: Instrument::empty(benchmark, exchange),
            instruments,
            index,
            ranked: None,
            config,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn phase(&self) -> EligibilityPhase {
        self.eligibility.phase()
    }

    pub fn cache(&self) -> &IndicatorCache {
        &self.cache
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, code: &str) -> Option<&Instrument> {
        self.index.get(code).map(|&i| &self.instruments[i])
    }

    pub fn benchmark(&self) -> &Instrument {
        &self.benchmark
    }

    /// The ranking produced by the most recent rebalance.
    pub fn ranked(&self) -> Option<&RankedList> {
        self.ranked.as_deref()
    }

    pub fn on_session_advance(
        &mut self,
        session: &MarketSession,
        broker: &mut dyn BrokerPort,
    ) -> Result<SessionReport, AllocatorError> {
        if session.benchmark.date != session.date {
            return Err(AllocatorError::DataFeed {
                reason: format!(
                    "benchmark bar dated {} in session {}",
                    session.benchmark.date, session.date
                ),
            });
        }
        if !self.benchmark.push_bar(session.benchmark.clone()) {
            return Err(AllocatorError::DataFeed {
                reason: format!("session {} is not after the previous session", session.date),
            });
        }

        for bar in &session.bars {
            match self.index.get(&bar.code) {
                Some(&i) => {
                    if !self.instruments[i].push_bar(bar.clone()) {
                        warn!(code = %bar.code, date = %bar.date, "out-of-order bar ignored");
                    }
                }
                None => debug!(code = %bar.code, "bar for unmonitored instrument ignored"),
            }
        }

        self.cache.refresh(&self.instruments, &self.benchmark);
        let eligible: Vec<String> = self
            .eligibility
            .advance(&self.instruments)
            .into_iter()
            .map(str::to_string)
            .collect();

        let triggers = self.scheduler.advance(session.date);
        let mut report = SessionReport {
            date: session.date,
            phase: self.eligibility.phase(),
            eligible: eligible.len(),
            triggers: Vec::new(),
        };

        if triggers.rebalance {
            debug!(date = %session.date, "rebalancing");
            report.triggers.push(self.rebalance(&eligible, session.benchmark.open, broker));
        }
        if triggers.reposition {
            debug!(date = %session.date, "repositioning");
            report.triggers.push(self.reposition(session.benchmark.open, broker));
        }

        Ok(report)
    }

    /// Full rebalance: rank, sell what left the top slice or fell under its
    /// moving average, then buy the top slice if the benchmark allows it.
    pub fn rebalance(
        &mut self,
        eligible: &[String],
        benchmark_open: f64,
        broker: &mut dyn BrokerPort,
    ) -> TriggerReport {
        let codes: Vec<&str> = eligible.iter().map(String::as_str).collect();
        let ranked = Rc::new(rank(&codes, &self.cache));
        self.ranked = Some(Rc::clone(&ranked));

        let mut report = TriggerReport::new(TriggerKind::Rebalance);
        if ranked.is_empty() {
            debug!("no ranked instruments, rebalance skipped");
            report.outcome = TriggerOutcome::EmptyUniverse;
            return report;
        }

        report.outcome = match self.run_rebalance(&ranked, benchmark_open, broker, &mut report) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("rebalance stopped: {e}");
                TriggerOutcome::Failed(e.to_string())
            }
        };
        info!(
            ranked = ranked.len(),
            orders = report.orders.len(),
            outcome = ?report.outcome,
            "rebalance finished"
        );
        report
    }

    fn run_rebalance(
        &self,
        ranked: &RankedList,
        benchmark_open: f64,
        broker: &mut dyn BrokerPort,
        report: &mut TriggerReport,
    ) -> Result<TriggerOutcome, AllocatorError> {
        let fraction = self.config.buy_top_percent;
        let mut closed = HashSet::new();

        for (i, entry) in ranked.entries().iter().enumerate() {
            if broker.position(&entry.code).abs() <= POSITION_EPSILON {
                continue;
            }
            let below_ma = self
                .instrument(&entry.code)
                .and_then(Instrument::last_bar)
                .is_some_and(|bar| bar.close < entry.snapshot.slow_moving_average);
            if !ranked.is_top(i, fraction) || below_ma {
                debug!(code = %entry.code, rank = i, below_ma, "closing position");
                broker.close(&entry.code)?;
                closed.insert(entry.code.as_str());
                report.orders.push(OrderIntent::Close {
                    code: entry.code.clone(),
                });
            }
        }

        if !allows_new_exposure(benchmark_open, self.cache.benchmark_ma()) {
            debug!(
                open = benchmark_open,
                ma = ?self.cache.benchmark_ma(),
                "benchmark below moving average, no buying"
            );
            return Ok(TriggerOutcome::GateClosed);
        }

        let mut cash_short = false;
        for entry in ranked.top(fraction) {
            let cash = broker.cash();
            let value = broker.value();
            if cash <= 0.0 {
                debug!(cash, "cash exhausted, buy pass stopped");
                return Ok(TriggerOutcome::CashExhausted);
            }
            // A position closed by this pass is not reopened until the next rebalance.
            if closed.contains(entry.code.as_str())
                || broker.position(&entry.code).abs() > POSITION_EPSILON
            {
                continue;
            }
            let Some(size) = target_size(
                value,
                self.config.risk_parity_factor,
                entry.snapshot.volatility,
            ) else {
                warn!(code = %entry.code, volatility = entry.snapshot.volatility, "degenerate volatility, buy skipped");
                report.skipped.push(entry.code.clone());
                continue;
            };
            let placed = broker.buy(&entry.code, size);
            let order = OrderIntent::Buy {
                code: entry.code.clone(),
                size,
            };
            cash_short |= !report.record(placed, order)?;
        }

        Ok(if cash_short {
            TriggerOutcome::CashExhausted
        } else {
            TriggerOutcome::Completed
        })
    }

    /// Interim reposition: re-target every instrument of the last ranking's
    /// top slice to its current inverse-volatility size.
    pub fn reposition(&mut self, benchmark_open: f64, broker: &mut dyn BrokerPort) -> TriggerReport {
        let mut report = TriggerReport::new(TriggerKind::Reposition);
        let Some(ranked) = self.ranked.clone() else {
            report.outcome = TriggerOutcome::NoRanking;
            return report;
        };

        report.outcome = match self.run_reposition(&ranked, benchmark_open, broker, &mut report) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("reposition stopped: {e}");
                TriggerOutcome::Failed(e.to_string())
            }
        };
        info!(
            orders = report.orders.len(),
            outcome = ?report.outcome,
            "reposition finished"
        );
        report
    }

    fn run_reposition(
        &self,
        ranked: &RankedList,
        benchmark_open: f64,
        broker: &mut dyn BrokerPort,
        report: &mut TriggerReport,
    ) -> Result<TriggerOutcome, AllocatorError> {
        if !allows_new_exposure(benchmark_open, self.cache.benchmark_ma()) {
            return Ok(TriggerOutcome::GateClosed);
        }

        let mut cash_short = false;
        for entry in ranked.top(self.config.buy_top_percent) {
            let cash = broker.cash();
            let value = broker.value();
            if cash <= 0.0 {
                return Ok(TriggerOutcome::CashExhausted);
            }
            let Some(snapshot) = self.cache.get(&entry.code) else {
                debug!(code = %entry.code, "no current snapshot, reposition skipped");
                continue;
            };
            let Some(size) = target_size(value, self.config.risk_parity_factor, snapshot.volatility)
            else {
                warn!(code = %entry.code, volatility = snapshot.volatility, "degenerate volatility, reposition skipped");
                report.skipped.push(entry.code.clone());
                continue;
            };
            let placed = broker.order_target_size(&entry.code, size);
            let order = OrderIntent::TargetSize {
                code: entry.code.clone(),
                size,
            };
            cash_short |= !report.record(placed, order)?;
        }

        Ok(if cash_short {
            TriggerOutcome::CashExhausted
        } else {
            TriggerOutcome::Completed
        })
    }
}
