use core_types::TradeRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The column a journal list is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    TradeDate,
    ProfitLoss,
    Instrument,
    ExecutionRating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[serde(alias = "asc")]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

/// Sorts a journal list in place.
///
/// The sort is stable in both directions, so records that compare equal keep
/// their relative order. Unrated trades come first when sorting ratings
/// ascending.
pub fn sort_records(records: &mut [TradeRecord], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = compare(key, a, b);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn compare(key: SortKey, a: &TradeRecord, b: &TradeRecord) -> Ordering {
    match key {
        SortKey::TradeDate => a.trade_date.cmp(&b.trade_date),
        SortKey::ProfitLoss => a.profit_loss.cmp(&b.profit_loss),
        SortKey::Instrument => a.instrument.to_lowercase().cmp(&b.instrument.to_lowercase()),
        SortKey::ExecutionRating => a.execution_rating.cmp(&b.execution_rating),
    }
}
