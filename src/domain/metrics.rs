//! Performance statistics of a finished run.

use std::collections::BTreeMap;

use super::portfolio::{EquityPoint, Portfolio};
use super::position::ClosedTrade;

const SESSIONS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of sessions spent below a previous equity peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
}

impl Metrics {
    pub fn compute(portfolio: &Portfolio, risk_free_rate: f64) -> Self {
        let curve = &portfolio.equity_curve;
        let initial = portfolio.initial_capital;
        let final_equity = curve.last().map_or(initial, |p| p.equity);

        let total_return = if initial > 0.0 {
            final_equity / initial - 1.0
        } else {
            0.0
        };
        let years = curve.len() as f64 / SESSIONS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let returns = session_returns(curve);
        let daily_rf = risk_free_rate / SESSIONS_PER_YEAR;
        let (max_drawdown, max_drawdown_duration) = drawdown(curve);
        let trades = TradeStats::from_trades(&portfolio.closed_trades);

        Metrics {
            final_equity,
            total_return,
            annualized_return,
            sharpe_ratio: sharpe(&returns, daily_rf),
            sortino_ratio: sortino(&returns, daily_rf),
            max_drawdown,
            max_drawdown_duration,
            total_trades: trades.count,
            trades_won: trades.won,
            trades_lost: trades.lost,
            win_rate: ratio(trades.won as f64, trades.count as f64),
            profit_factor: if trades.gross_loss > 0.0 {
                trades.gross_win / trades.gross_loss
            } else if trades.gross_win > 0.0 {
                f64::INFINITY
            } else {
                0.0
            },
            avg_win: ratio(trades.gross_win, trades.won as f64),
            avg_loss: ratio(trades.gross_loss, trades.lost as f64),
        }
    }
}

/// Trade summary for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeResult {
    pub code: String,
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

impl CodeResult {
    /// One entry per traded code, sorted by code.
    pub fn compute_per_code(trades: &[ClosedTrade]) -> Vec<CodeResult> {
        let mut by_code: BTreeMap<&str, Vec<&ClosedTrade>> = BTreeMap::new();
        for trade in trades {
            by_code.entry(trade.code.as_str()).or_default().push(trade);
        }
        by_code
            .into_iter()
            .map(|(code, trades)| {
                let won = trades.iter().filter(|t| t.pnl > 0.0).count();
                CodeResult {
                    code: code.to_string(),
                    total_trades: trades.len(),
                    win_rate: ratio(won as f64, trades.len() as f64),
                    total_pnl: trades.iter().map(|t| t.pnl).sum(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct TradeStats {
    count: usize,
    won: usize,
    lost: usize,
    gross_win: f64,
    gross_loss: f64,
}

impl TradeStats {
    fn from_trades(trades: &[ClosedTrade]) -> Self {
        trades.iter().fold(Self::default(), |mut acc, trade| {
            acc.count += 1;
            if trade.pnl > 0.0 {
                acc.won += 1;
                acc.gross_win += trade.pnl;
            } else if trade.pnl < 0.0 {
                acc.lost += 1;
                acc.gross_loss -= trade.pnl;
            }
            acc
        })
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn session_returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .map(|w| ratio(w[1].equity - w[0].equity, w[0].equity))
        .collect()
}

fn drawdown(curve: &[EquityPoint]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for point in curve {
        if point.equity >= peak {
            peak = point.equity;
            run = 0;
            continue;
        }
        run += 1;
        longest = longest.max(run);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }

    (max_dd, longest)
}

fn sharpe(returns: &[f64], daily_rf: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        (mean - daily_rf) / stddev * SESSIONS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

fn sortino(returns: &[f64], daily_rf: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let downside = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|r| (r - daily_rf).powi(2))
        .sum::<f64>()
        / n;
    let downside_dev = downside.sqrt();
    if downside_dev > 0.0 {
        (mean - daily_rf) / downside_dev * SESSIONS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
