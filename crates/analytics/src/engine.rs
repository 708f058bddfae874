use crate::filter::FilterCriteria;
use crate::report::{EquityPoint, Statistics, StatisticsSummary, cumulative};
use core_types::{Outcome, TradeRecord};
use rust_decimal::Decimal;

/// A stateless calculator for deriving journal statistics from trade records.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticsEngine {}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating statistics.
    ///
    /// # Arguments
    ///
    /// * `records` - The (possibly already filtered) trades, in the order the
    ///   caller wants the equity series to follow.
    ///
    /// # Returns
    ///
    /// `Statistics::NoData` for an empty slice, otherwise the full summary.
    pub fn summarize(&self, records: &[TradeRecord]) -> Statistics {
        if records.is_empty() {
            tracing::debug!("No trades to summarize.");
            return Statistics::NoData;
        }

        let mut summary = StatisticsSummary {
            total_trades: records.len(),
            winning_trades: 0,
            losing_trades: 0,
            break_even_trades: 0,
            win_rate: Decimal::ZERO,
            total_profit_loss: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            avg_profit_per_trade: Decimal::ZERO,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            largest_win: records[0].profit_loss,
            largest_loss: records[0].profit_loss,
            max_drawdown: Decimal::ZERO,
            avg_risk_reward_ratio: Decimal::ZERO,
            avg_execution_rating: Decimal::ZERO,
            equity_series: Vec::with_capacity(records.len()),
        };

        self.calculate_counts(records, &mut summary);
        self.calculate_profitability(records, &mut summary);
        self.calculate_ratings(records, &mut summary);
        self.calculate_drawdown(&mut summary);

        tracing::debug!(
            total_trades = summary.total_trades,
            total_profit_loss = %summary.total_profit_loss,
            "Trades summarized."
        );

        Statistics::Summary(summary)
    }

    /// Filters `records` with `criteria`, then summarizes what is left.
    pub fn summarize_filtered(&self, records: &[TradeRecord], criteria: &FilterCriteria) -> Statistics {
        self.summarize(&criteria.apply(records))
    }

    /// Outcome counts come from the stored label, never from the P/L sign.
    fn calculate_counts(&self, records: &[TradeRecord], summary: &mut StatisticsSummary) {
        for record in records {
            match record.outcome {
                Outcome::Win => summary.winning_trades += 1,
                Outcome::Loss => summary.losing_trades += 1,
                Outcome::BreakEven => summary.break_even_trades += 1,
            }
        }

        summary.win_rate = (Decimal::from(summary.winning_trades)
            / Decimal::from(summary.total_trades))
            * Decimal::ONE_HUNDRED;
    }

    /// Calculates all profitability-related metrics from the signed P/L.
    ///
    /// Sums saturate at the `Decimal` bounds and a ratio that would overflow
    /// is pinned to `Decimal::MAX`, so extreme journals still summarize.
    fn calculate_profitability(&self, records: &[TradeRecord], summary: &mut StatisticsSummary) {
        let mut profitable_trades = 0usize;
        let mut unprofitable_trades = 0usize;
        let mut losses = Decimal::ZERO;

        for record in records {
            let pnl = record.profit_loss;
            summary.total_profit_loss = summary.total_profit_loss.saturating_add(pnl);

            // Exactly zero counts toward neither side.
            if pnl > Decimal::ZERO {
                summary.gross_profit = summary.gross_profit.saturating_add(pnl);
                profitable_trades += 1;
            } else if pnl < Decimal::ZERO {
                losses = losses.saturating_add(pnl);
                unprofitable_trades += 1;
            }

            summary.largest_win = summary.largest_win.max(pnl);
            summary.largest_loss = summary.largest_loss.min(pnl);
            summary.equity_series.push(EquityPoint {
                trade_date: record.trade_date,
                profit_loss: pnl,
            });
        }

        summary.gross_loss = losses.abs();

        // --- Ratios ---
        summary.profit_factor = if summary.gross_loss.is_zero() {
            summary.gross_profit
        } else {
            summary
                .gross_profit
                .checked_div(summary.gross_loss)
                .unwrap_or(Decimal::MAX)
        };

        summary.avg_profit_per_trade = average(summary.total_profit_loss, summary.total_trades);
        summary.average_win = average(summary.gross_profit, profitable_trades);
        summary.average_loss = average(summary.gross_loss, unprofitable_trades);
    }

    /// Averages the optional journal ratings. A missing value still counts in
    /// the denominator and contributes zero to the sum.
    fn calculate_ratings(&self, records: &[TradeRecord], summary: &mut StatisticsSummary) {
        let risk_reward_sum = records
            .iter()
            .map(|r| r.risk_reward_ratio.unwrap_or(Decimal::ZERO))
            .fold(Decimal::ZERO, Decimal::saturating_add);
        let rating_sum = records
            .iter()
            .map(|r| Decimal::from(r.execution_rating.unwrap_or(0)))
            .fold(Decimal::ZERO, Decimal::saturating_add);

        summary.avg_risk_reward_ratio = average(risk_reward_sum, records.len());
        summary.avg_execution_rating = average(rating_sum, records.len());
    }

    /// Calculates the largest peak-to-trough drop of the cumulative equity,
    /// starting from a flat account before the first trade.
    fn calculate_drawdown(&self, summary: &mut StatisticsSummary) {
        let mut peak_equity = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;

        for point in cumulative(&summary.equity_series) {
            if point.profit_loss > peak_equity {
                peak_equity = point.profit_loss;
            }
            let drawdown = peak_equity.saturating_sub(point.profit_loss);
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        summary.max_drawdown = max_drawdown;
    }
}

/// `total / count`, or zero when there is nothing to average.
fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    total.checked_div(Decimal::from(count)).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use core_types::{Direction, NewTradeRecord};
    use rust_decimal_macros::dec;

    fn trade(
        day: u32,
        direction: Direction,
        entry: Decimal,
        exit: Decimal,
        size: Decimal,
        outcome: Outcome,
        risk_reward: Option<Decimal>,
    ) -> TradeRecord {
        NewTradeRecord {
            trade_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            instrument: "BTC/USD".to_string(),
            direction,
            entry_price: entry,
            exit_price: exit,
            position_size: size,
            outcome,
            risk_reward_ratio: risk_reward,
            execution_rating: None,
            strategy_id: None,
            notes: None,
        }
        .into_record(Utc::now())
        .unwrap()
    }

    fn seed() -> Vec<TradeRecord> {
        vec![
            trade(1, Direction::Long, dec!(100), dec!(110), dec!(1), Outcome::Win, Some(dec!(2.0))),
            trade(2, Direction::Short, dec!(50), dec!(40), dec!(2), Outcome::Win, Some(dec!(1.5))),
            trade(3, Direction::Long, dec!(200), dec!(190), dec!(1), Outcome::Loss, Some(dec!(1.0))),
        ]
    }

    #[test]
    fn seed_scenario_matches_expected_summary() {
        let stats = StatisticsEngine::new().summarize(&seed());
        let s = stats.summary().expect("non-empty input must produce a summary");

        assert_eq!(s.total_trades, 3);
        assert_eq!(s.winning_trades, 2);
        assert_eq!(s.losing_trades, 1);
        assert_eq!(s.break_even_trades, 0);
        assert_eq!(s.win_rate.round_dp(4), dec!(66.6667));
        assert_eq!(s.total_profit_loss, dec!(20));
        assert_eq!(s.gross_profit, dec!(30));
        assert_eq!(s.gross_loss, dec!(10));
        assert_eq!(s.profit_factor, dec!(3));
        assert_eq!(s.avg_profit_per_trade.round_dp(4), dec!(6.6667));
        assert_eq!(s.largest_win, dec!(20));
        assert_eq!(s.largest_loss, dec!(-10));
        assert_eq!(s.avg_risk_reward_ratio, dec!(1.5));
        assert_eq!(s.average_win, dec!(15));
        assert_eq!(s.average_loss, dec!(10));
        assert_eq!(s.max_drawdown, dec!(10));
    }

    #[test]
    fn empty_input_is_no_data() {
        assert_eq!(StatisticsEngine::new().summarize(&[]), Statistics::NoData);
    }

    #[test]
    fn profit_factor_collapses_to_gross_profit_without_losses() {
        let records = vec![
            trade(1, Direction::Long, dec!(100), dec!(300), dec!(2), Outcome::Win, None),
            trade(2, Direction::Long, dec!(100), dec!(200), dec!(1), Outcome::Win, None),
            trade(3, Direction::Long, dec!(100), dec!(100), dec!(1), Outcome::BreakEven, None),
        ];
        let stats = StatisticsEngine::new().summarize(&records);
        let s = stats.summary().unwrap();
        assert_eq!(s.gross_profit, dec!(500));
        assert_eq!(s.gross_loss, dec!(0));
        assert_eq!(s.profit_factor, dec!(500));
        assert_eq!(s.break_even_trades, 1);
        assert_eq!(s.average_loss, dec!(0));
    }

    #[test]
    fn largest_win_is_negative_when_every_trade_lost() {
        let records = vec![
            trade(1, Direction::Long, dec!(100), dec!(95), dec!(1), Outcome::Loss, None),
            trade(2, Direction::Short, dec!(100), dec!(102), dec!(1), Outcome::Loss, None),
        ];
        let stats = StatisticsEngine::new().summarize(&records);
        let s = stats.summary().unwrap();
        assert_eq!(s.largest_win, dec!(-2));
        assert_eq!(s.largest_loss, dec!(-5));
        assert_eq!(s.gross_profit, dec!(0));
        assert_eq!(s.profit_factor, dec!(0));
        assert_eq!(s.win_rate, dec!(0));
    }

    #[test]
    fn mislabeled_outcome_counts_by_label_but_sums_by_sign() {
        // Labelled a win, but lost money.
        let records = vec![trade(1, Direction::Long, dec!(100), dec!(90), dec!(1), Outcome::Win, None)];
        let stats = StatisticsEngine::new().summarize(&records);
        let s = stats.summary().unwrap();
        assert_eq!(s.winning_trades, 1);
        assert_eq!(s.win_rate, dec!(100));
        assert_eq!(s.gross_profit, dec!(0));
        assert_eq!(s.gross_loss, dec!(10));
    }

    #[test]
    fn absent_ratings_dilute_the_averages() {
        let mut records = seed();
        records[1].risk_reward_ratio = None;
        records[0].execution_rating = Some(9);
        let stats = StatisticsEngine::new().summarize(&records);
        let s = stats.summary().unwrap();
        assert_eq!(s.avg_risk_reward_ratio, dec!(1));
        assert_eq!(s.avg_execution_rating, dec!(3));
    }

    #[test]
    fn equity_series_keeps_input_order() {
        let mut records = seed();
        records.reverse();
        let stats = StatisticsEngine::new().summarize(&records);
        let series: Vec<Decimal> = stats
            .summary()
            .unwrap()
            .equity_series
            .iter()
            .map(|p| p.profit_loss)
            .collect();
        assert_eq!(series, vec![dec!(-10), dec!(20), dec!(10)]);
    }

    #[test]
    fn drawdown_counts_losses_from_a_flat_start() {
        let records = vec![
            trade(1, Direction::Long, dec!(100), dec!(90), dec!(1), Outcome::Loss, None),
            trade(2, Direction::Long, dec!(100), dec!(95), dec!(1), Outcome::Loss, None),
            trade(3, Direction::Long, dec!(100), dec!(130), dec!(1), Outcome::Win, None),
        ];
        let stats = StatisticsEngine::new().summarize(&records);
        assert_eq!(stats.summary().unwrap().max_drawdown, dec!(15));
    }

    #[test]
    fn extreme_profit_factor_is_pinned_instead_of_overflowing() {
        let mut records = seed();
        records.truncate(2);
        records[0].profit_loss = dec!(100000000000000000000);
        records[1].profit_loss = dec!(-0.00000000000000000001);
        let stats = StatisticsEngine::new().summarize(&records);
        let s = stats.summary().unwrap();
        assert_eq!(s.profit_factor, Decimal::MAX);
        assert_eq!(s.gross_loss, dec!(0.00000000000000000001));
    }

    #[test]
    fn sums_saturate_at_the_decimal_bounds() {
        let mut records = seed();
        records.truncate(2);
        records[0].profit_loss = dec!(50000000000000000000000000000);
        records[1].profit_loss = dec!(50000000000000000000000000000);
        let s = StatisticsEngine::new().summarize(&records).into_summary().unwrap();
        assert_eq!(s.total_profit_loss, Decimal::MAX);
        assert_eq!(s.gross_profit, Decimal::MAX);
        assert_eq!(s.largest_win, dec!(50000000000000000000000000000));
        assert_eq!(s.max_drawdown, dec!(0));
        assert_eq!(s.cumulative_equity().last().unwrap().profit_loss, Decimal::MAX);
    }

    #[test]
    fn cumulative_equity_follows_the_summary_series() {
        let s = StatisticsEngine::new().summarize(&seed()).into_summary().unwrap();
        let running: Vec<Decimal> = s.cumulative_equity().iter().map(|p| p.profit_loss).collect();
        assert_eq!(running, vec![dec!(10), dec!(30), dec!(20)]);
        assert!(StatisticsEngine::new().summarize(&[]).into_summary().is_none());
    }

    #[test]
    fn summarize_filtered_filters_first() {
        let criteria = FilterCriteria::new().with_direction(Direction::Long);
        let stats = StatisticsEngine::new().summarize_filtered(&seed(), &criteria);
        let s = stats.summary().unwrap();
        assert_eq!(s.total_trades, 2);
        assert_eq!(s.total_profit_loss, dec!(0));

        let none = FilterCriteria::new().with_outcome(Outcome::BreakEven);
        assert!(StatisticsEngine::new().summarize_filtered(&seed(), &none).is_no_data());
    }
}
