use serde::{Deserialize, Serialize};

use super::trade::Trade;
use super::{MarketData, Portfolio};
use crate::statistic::algorithm::WelfordOnline;

/// Trading days per year, used to annualize daily volatility and Sharpe.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Annual risk-free rate subtracted from returns before annualizing Sharpe.
const RISK_FREE_RATE: f64 = 0.02;

/// A point-in-time snapshot of an agent's or benchmark's performance, appended to
/// [`crate::agent::Agent::performance_history`] every price tick and trade window. Narrower than
/// a `statistic::summary::trading::TradingSummary` — limited to the fields this model actually
/// reports (no Calmar ratio or tear sheet — see Non-goals).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_value: f64,
    pub total_return: f64,
    pub daily_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub turnover: f64,
    pub timestamp: f64,
    pub intraday_hour: f64,
}

fn sample_std_dev(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }

    let mut mean = 0.0;
    let mut m = 0.0;
    for (i, &value) in series.iter().enumerate() {
        let count = (i + 1) as f64;
        let new_mean = mean + (value - mean) / count;
        m = WelfordOnline::calculate_recurrence_relation_m(m, mean, value, new_mean);
        mean = new_mean;
    }

    WelfordOnline::calculate_sample_variance(m, series.len() as f64).sqrt()
}

/// Scans the running peak across `history` extended with `latest`, returning the largest
/// peak-to-trough fractional decline observed.
fn max_drawdown(history: &[f64], latest: f64) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0;

    for &value in history.iter().chain(std::iter::once(&latest)) {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }

    worst
}

/// `computeMetrics(P, M, history, timestamp, dailyTrades)`: the single pure function computing
/// an agent's (or benchmark's) [`PerformanceMetrics`] from its portfolio, the current market,
/// its prior total-value history, and (optionally) the trades executed this round for turnover.
pub fn compute_metrics(
    portfolio: &Portfolio,
    market: &MarketData,
    history: &[f64],
    timestamp: f64,
    intraday_hour: f64,
    daily_trades: &[Trade],
) -> PerformanceMetrics {
    compute_metrics_from_total_value(portfolio.total_value(market), history, timestamp, intraday_hour, daily_trades)
}

/// As [`compute_metrics`], but for callers that already have a total value rather than a
/// [`Portfolio`] + [`MarketData`] pair — used by benchmarks, which track only a value series.
pub fn compute_metrics_from_total_value(
    total_value: f64,
    history: &[f64],
    timestamp: f64,
    intraday_hour: f64,
    daily_trades: &[Trade],
) -> PerformanceMetrics {
    let daily_return = match history.last() {
        Some(&previous) if previous != 0.0 => total_value / previous - 1.0,
        _ => 0.0,
    };

    let total_return = match history.first() {
        Some(&first) if first != 0.0 => total_value / first - 1.0,
        _ => 0.0,
    };

    let mut returns: Vec<f64> = history
        .windows(2)
        .map(|pair| if pair[0] != 0.0 { pair[1] / pair[0] - 1.0 } else { 0.0 })
        .collect();
    returns.push(daily_return);

    let daily_std_dev = sample_std_dev(&returns);
    let annualized_volatility = daily_std_dev * TRADING_DAYS_PER_YEAR.sqrt();

    let per_day_risk_free = RISK_FREE_RATE / TRADING_DAYS_PER_YEAR;
    let excess_returns: Vec<f64> = returns.iter().map(|r| r - per_day_risk_free).collect();
    let avg_excess = if excess_returns.is_empty() {
        0.0
    } else {
        excess_returns.iter().sum::<f64>() / excess_returns.len() as f64
    };
    let sharpe_ratio = if daily_std_dev > 0.0 {
        (avg_excess / daily_std_dev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let drawdown = max_drawdown(history, total_value);

    let turnover = if total_value > 0.0 {
        daily_trades
            .iter()
            .map(|trade| (trade.quantity as f64 * trade.execution_price).abs())
            .sum::<f64>()
            / total_value
    } else {
        0.0
    };

    PerformanceMetrics {
        total_value,
        total_return,
        daily_return,
        annualized_volatility,
        sharpe_ratio,
        max_drawdown: drawdown,
        turnover,
        timestamp,
        intraday_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::TickerSnapshot;
    use crate::portfolio::Side;

    fn market_with(symbol: &str, price: f64) -> MarketData {
        let mut market = MarketData::new();
        market.insert(TickerSnapshot::new(symbol, price));
        market
    }

    #[test]
    fn daily_return_is_zero_with_empty_history() {
        let portfolio = Portfolio::new(10_000.0);
        let market = MarketData::new();
        let metrics = compute_metrics(&portfolio, &market, &[], 0.0, 0.0, &[]);
        assert_eq!(metrics.daily_return, 0.0);
        assert_eq!(metrics.total_return, 0.0);
    }

    #[test]
    fn daily_return_reflects_change_from_last_history_entry() {
        let portfolio = Portfolio::new(11_000.0);
        let market = MarketData::new();
        let metrics = compute_metrics(&portfolio, &market, &[10_000.0], 1.0, 0.1, &[]);
        assert!((metrics.daily_return - 0.1).abs() < 1e-9);
    }

    #[test]
    fn max_drawdown_detects_peak_to_trough_decline() {
        let portfolio = Portfolio::new(8_000.0);
        let market = MarketData::new();
        let metrics = compute_metrics(&portfolio, &market, &[10_000.0, 12_000.0], 2.0, 0.2, &[]);
        assert!((metrics.max_drawdown - (12_000.0 - 8_000.0) / 12_000.0).abs() < 1e-9);
    }

    #[test]
    fn turnover_sums_absolute_notional_of_daily_trades_over_total_value() {
        let mut portfolio = Portfolio::new(5_000.0);
        portfolio
            .positions
            .insert("AAA".to_string(), crate::portfolio::Position::new("AAA", 50, 100.0));
        let market = market_with("AAA", 100.0);

        let trades = vec![Trade {
            symbol: "AAA".to_string(),
            side: Side::Buy,
            quantity: 50,
            execution_price: 100.0,
            timestamp: 0.0,
            fee: 2.5,
            fair_value: None,
            top_of_box: None,
            bottom_of_box: None,
            justification: None,
        }];

        let metrics = compute_metrics(&portfolio, &market, &[], 0.0, 0.0, &trades);
        let expected_total_value = 5_000.0 + 5_000.0;
        assert!((metrics.turnover - 5_000.0 / expected_total_value).abs() < 1e-9);
    }
}
