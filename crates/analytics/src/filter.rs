use chrono::{Datelike, Days, NaiveDate};
use core_types::{CoreError, Direction, Outcome, TradeRecord};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Criteria for narrowing a list of trades. Every criterion that is set must
/// hold for a record to be kept; unset criteria impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    /// Case-insensitive substring of the instrument. Blank counts as unset.
    #[serde(default)]
    pub instrument_substring: Option<String>,
    /// Inclusive lower bound on `trade_date`.
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on `trade_date`.
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub strategy_id: Option<Uuid>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_instrument(mut self, substring: impl Into<String>) -> Self {
        self.instrument_substring = Some(substring.into());
        self
    }

    pub fn with_date_from(mut self, from: NaiveDate) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn with_date_to(mut self, to: NaiveDate) -> Self {
        self.date_to = Some(to);
        self
    }

    pub fn with_strategy(mut self, strategy_id: Uuid) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    /// Narrows the date bounds to `window`, resolved relative to `today`.
    ///
    /// Existing bounds are intersected with the window, never widened.
    pub fn with_window(mut self, window: TimeWindow, today: NaiveDate) -> Self {
        let (from, to) = window.bounds(today);
        self.date_from = match (self.date_from, from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.date_to = match (self.date_to, to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self
    }

    /// The instrument substring, lowercased, if it is set and not blank.
    pub fn instrument_needle(&self) -> Option<String> {
        self.instrument_substring
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether a single record satisfies every criterion that is set.
    pub fn matches(&self, record: &TradeRecord) -> bool {
        self.matches_with_needle(record, self.instrument_needle().as_deref())
    }

    fn matches_with_needle(&self, record: &TradeRecord, needle: Option<&str>) -> bool {
        if self.direction.is_some_and(|d| d != record.direction) {
            return false;
        }
        if self.outcome.is_some_and(|o| o != record.outcome) {
            return false;
        }
        if self.strategy_id.is_some() && self.strategy_id != record.strategy_id {
            return false;
        }
        if self.date_from.is_some_and(|from| record.trade_date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| record.trade_date > to) {
            return false;
        }
        if let Some(needle) = needle {
            if !record.instrument.to_lowercase().contains(needle) {
                return false;
            }
        }
        true
    }

    /// Returns the records that match, in their original relative order.
    ///
    /// The input is left untouched. Contradictory bounds (`date_from` after
    /// `date_to`) simply match nothing.
    pub fn apply(&self, records: &[TradeRecord]) -> Vec<TradeRecord> {
        let needle = self.instrument_needle();
        records
            .iter()
            .filter(|r| self.matches_with_needle(r, needle.as_deref()))
            .cloned()
            .collect()
    }
}

/// A relative or explicit reporting period for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    #[default]
    AllTime,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    YearToDate,
    Custom {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl TimeWindow {
    /// Resolves the window to inclusive `(from, to)` bounds. `LastNDays`
    /// covers `today` and the `N - 1` days before it.
    pub fn bounds(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match *self {
            TimeWindow::AllTime => (None, None),
            TimeWindow::Last7Days => (Some(days_back(today, 7)), Some(today)),
            TimeWindow::Last30Days => (Some(days_back(today, 30)), Some(today)),
            TimeWindow::Last90Days => (Some(days_back(today, 90)), Some(today)),
            TimeWindow::YearToDate => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                (Some(start), Some(today))
            }
            TimeWindow::Custom { from, to } => (from, to),
        }
    }
}

fn days_back(today: NaiveDate, days: u64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days - 1))
        .unwrap_or(NaiveDate::MIN)
}

impl FromStr for TimeWindow {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_time" => Ok(TimeWindow::AllTime),
            "7d" | "last_7_days" => Ok(TimeWindow::Last7Days),
            "30d" | "last_30_days" => Ok(TimeWindow::Last30Days),
            "90d" | "last_90_days" => Ok(TimeWindow::Last90Days),
            "ytd" | "year_to_date" => Ok(TimeWindow::YearToDate),
            _ => Err(CoreError::UnknownVariant {
                kind: "time window",
                value: s.to_string(),
            }),
        }
    }
}
