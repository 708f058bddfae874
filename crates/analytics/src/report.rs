use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One point of the equity series: the P/L a single trade contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub trade_date: NaiveDate,
    pub profit_loss: Decimal,
}

/// The derived metrics for a non-empty set of trades.
///
/// This struct is the output of the `StatisticsEngine` and serves as the data
/// transfer object handed to whatever renders the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    // I. Trade counts (by stored outcome label)
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub break_even_trades: usize,
    pub win_rate: Decimal,

    // II. Profitability (by signed P/L)
    pub total_profit_loss: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    /// Equals `gross_profit` when there are no losses.
    pub profit_factor: Decimal,
    pub avg_profit_per_trade: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub max_drawdown: Decimal,

    // III. Journal ratings (absent values count as zero)
    pub avg_risk_reward_ratio: Decimal,
    pub avg_execution_rating: Decimal,

    // IV. Series
    pub equity_series: Vec<EquityPoint>,
}

impl StatisticsSummary {
    /// Running total of the equity series, in series order.
    pub fn cumulative_equity(&self) -> Vec<EquityPoint> {
        cumulative(&self.equity_series)
    }
}

pub(crate) fn cumulative(series: &[EquityPoint]) -> Vec<EquityPoint> {
    let mut running = Decimal::ZERO;
    series
        .iter()
        .map(|point| {
            running = running.saturating_add(point.profit_loss);
            EquityPoint {
                trade_date: point.trade_date,
                profit_loss: running,
            }
        })
        .collect()
}

/// The result of summarizing a set of trades.
///
/// An empty input yields `NoData` instead of a summary full of divide-by-zero
/// artifacts; callers render an empty state for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Statistics {
    NoData,
    Summary(StatisticsSummary),
}

impl Statistics {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Statistics::NoData)
    }

    pub fn summary(&self) -> Option<&StatisticsSummary> {
        match self {
            Statistics::NoData => None,
            Statistics::Summary(summary) => Some(summary),
        }
    }

    pub fn into_summary(self) -> Option<StatisticsSummary> {
        match self {
            Statistics::NoData => None,
            Statistics::Summary(summary) => Some(summary),
        }
    }
}
