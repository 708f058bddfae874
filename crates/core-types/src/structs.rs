use crate::enums::{Direction, Outcome};
use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Lowest and highest accepted execution rating.
pub const MIN_EXECUTION_RATING: i32 = 1;
pub const MAX_EXECUTION_RATING: i32 = 10;

/// Computes the signed profit/loss of a trade.
///
/// `(exit - entry) * size`, negated for shorts. A result outside the
/// `Decimal` range is rejected rather than wrapped or rounded.
pub fn compute_profit_loss(
    direction: Direction,
    entry_price: Decimal,
    exit_price: Decimal,
    position_size: Decimal,
) -> Result<Decimal, CoreError> {
    exit_price
        .checked_sub(entry_price)
        .and_then(|price_move| price_move.checked_mul(position_size))
        .and_then(|pnl| pnl.checked_mul(direction.sign()))
        .ok_or_else(|| CoreError::invalid("position_size", "profit/loss out of range"))
}

/// One logged trade, as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub trade_date: NaiveDate,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub position_size: Decimal,
    pub outcome: Outcome,
    /// Persisted at create/update time; consumers read it, they never recompute it.
    pub profit_loss: Decimal,
    pub risk_reward_ratio: Option<Decimal>,
    pub execution_rating: Option<i32>,
    pub strategy_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The payload submitted when a user logs a new trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTradeRecord {
    pub trade_date: NaiveDate,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub position_size: Decimal,
    pub outcome: Outcome,
    #[serde(default)]
    pub risk_reward_ratio: Option<Decimal>,
    #[serde(default)]
    pub execution_rating: Option<i32>,
    #[serde(default)]
    pub strategy_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTradeRecord {
    /// Checks the invariants every stored record must satisfy.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_trade_fields(
            &self.instrument,
            self.entry_price,
            self.exit_price,
            self.position_size,
            self.execution_rating,
        )
    }

    /// Turns the payload into a full record with a fresh id and a computed P/L.
    pub fn into_record(self, now: DateTime<Utc>) -> Result<TradeRecord, CoreError> {
        self.validate()?;
        let profit_loss = compute_profit_loss(
            self.direction,
            self.entry_price,
            self.exit_price,
            self.position_size,
        )?;
        Ok(TradeRecord {
            id: Uuid::new_v4(),
            trade_date: self.trade_date,
            instrument: self.instrument.trim().to_string(),
            direction: self.direction,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            position_size: self.position_size,
            outcome: self.outcome,
            profit_loss,
            risk_reward_ratio: self.risk_reward_ratio,
            execution_rating: self.execution_rating,
            strategy_id: self.strategy_id,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A partial edit of an existing trade. Absent fields are left untouched.
///
/// The nullable fields use a nested `Option`: `None` keeps the stored value,
/// `Some(None)` clears it (an explicit JSON `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeUpdate {
    #[serde(default)]
    pub trade_date: Option<NaiveDate>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    #[serde(default)]
    pub position_size: Option<Decimal>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default, deserialize_with = "double_option")]
    pub risk_reward_ratio: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub execution_rating: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub strategy_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl TradeUpdate {
    /// Whether this update touches any field that feeds the P/L formula.
    pub fn changes_profit_loss(&self) -> bool {
        self.direction.is_some()
            || self.entry_price.is_some()
            || self.exit_price.is_some()
            || self.position_size.is_some()
    }

    /// Merges the update into `current`, re-validating the result and
    /// recomputing the profit/loss when prices, size or direction changed.
    pub fn apply_to(&self, current: &TradeRecord, now: DateTime<Utc>) -> Result<TradeRecord, CoreError> {
        let mut updated = current.clone();

        if let Some(date) = self.trade_date {
            updated.trade_date = date;
        }
        if let Some(instrument) = &self.instrument {
            updated.instrument = instrument.trim().to_string();
        }
        if let Some(direction) = self.direction {
            updated.direction = direction;
        }
        if let Some(price) = self.entry_price {
            updated.entry_price = price;
        }
        if let Some(price) = self.exit_price {
            updated.exit_price = price;
        }
        if let Some(size) = self.position_size {
            updated.position_size = size;
        }
        if let Some(outcome) = self.outcome {
            updated.outcome = outcome;
        }
        if let Some(ratio) = self.risk_reward_ratio {
            updated.risk_reward_ratio = ratio;
        }
        if let Some(rating) = self.execution_rating {
            updated.execution_rating = rating;
        }
        if let Some(strategy_id) = self.strategy_id {
            updated.strategy_id = strategy_id;
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }

        validate_trade_fields(
            &updated.instrument,
            updated.entry_price,
            updated.exit_price,
            updated.position_size,
            updated.execution_rating,
        )?;

        if self.changes_profit_loss() {
            updated.profit_loss = compute_profit_loss(
                updated.direction,
                updated.entry_price,
                updated.exit_price,
                updated.position_size,
            )?;
        }
        updated.updated_at = now;

        Ok(updated)
    }
}

/// User-managed metadata describing a trading strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStrategy {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewStrategy {
    pub fn into_strategy(self, now: DateTime<Utc>) -> Result<Strategy, CoreError> {
        let name = validate_strategy_name(&self.name)?;
        Ok(Strategy {
            id: Uuid::new_v4(),
            name,
            description: self.description,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl StrategyUpdate {
    pub fn apply_to(&self, current: &Strategy) -> Result<Strategy, CoreError> {
        let mut updated = current.clone();
        if let Some(name) = &self.name {
            updated.name = validate_strategy_name(name)?;
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        Ok(updated)
    }
}

fn validate_strategy_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::invalid("name", "must not be empty"));
    }
    Ok(name.to_string())
}

fn validate_trade_fields(
    instrument: &str,
    entry_price: Decimal,
    exit_price: Decimal,
    position_size: Decimal,
    execution_rating: Option<i32>,
) -> Result<(), CoreError> {
    if instrument.trim().is_empty() {
        return Err(CoreError::invalid("instrument", "must not be empty"));
    }
    if entry_price <= Decimal::ZERO {
        return Err(CoreError::invalid("entry_price", "must be positive"));
    }
    if exit_price <= Decimal::ZERO {
        return Err(CoreError::invalid("exit_price", "must be positive"));
    }
    if position_size <= Decimal::ZERO {
        return Err(CoreError::invalid("position_size", "must be positive"));
    }
    if let Some(rating) = execution_rating {
        if !(MIN_EXECUTION_RATING..=MAX_EXECUTION_RATING).contains(&rating) {
            return Err(CoreError::invalid(
                "execution_rating",
                format!("must be between {MIN_EXECUTION_RATING} and {MAX_EXECUTION_RATING}"),
            ));
        }
    }
    Ok(())
}

// Distinguishes a missing field (outer `None`) from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_trade() -> NewTradeRecord {
        NewTradeRecord {
            trade_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            instrument: " BTC/USD ".to_string(),
            direction: Direction::Long,
            entry_price: dec!(100),
            exit_price: dec!(110),
            position_size: dec!(1),
            outcome: Outcome::Win,
            risk_reward_ratio: Some(dec!(2.0)),
            execution_rating: Some(8),
            strategy_id: None,
            notes: None,
        }
    }

    #[test]
    fn profit_loss_follows_direction() {
        assert_eq!(compute_profit_loss(Direction::Long, dec!(100), dec!(110), dec!(1)), Ok(dec!(10)));
        assert_eq!(compute_profit_loss(Direction::Short, dec!(50), dec!(40), dec!(2)), Ok(dec!(20)));
        assert_eq!(compute_profit_loss(Direction::Long, dec!(200), dec!(190), dec!(1)), Ok(dec!(-10)));
    }

    #[test]
    fn profit_loss_out_of_range_is_rejected() {
        let mut payload = new_trade();
        payload.entry_price = dec!(1);
        payload.exit_price = dec!(50000000000000000000000000000);
        payload.position_size = dec!(2);
        assert_eq!(
            payload.into_record(Utc::now()).unwrap_err(),
            CoreError::InvalidInput("position_size".into(), "profit/loss out of range".into())
        );

        let record = new_trade().into_record(Utc::now()).unwrap();
        let update = TradeUpdate {
            exit_price: Some(dec!(50000000000000000000000000000)),
            position_size: Some(dec!(3)),
            ..Default::default()
        };
        assert!(matches!(
            update.apply_to(&record, Utc::now()),
            Err(CoreError::InvalidInput(field, _)) if field == "position_size"
        ));
    }

    #[test]
    fn into_record_computes_profit_loss_and_trims_instrument() {
        let now = Utc::now();
        let record = new_trade().into_record(now).unwrap();
        assert_eq!(record.profit_loss, dec!(10));
        assert_eq!(record.instrument, "BTC/USD");
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
    }

    #[test]
    fn rejects_non_positive_prices_and_bad_ratings() {
        let mut trade = new_trade();
        trade.entry_price = dec!(0);
        assert!(matches!(trade.validate(), Err(CoreError::InvalidInput(f, _)) if f == "entry_price"));

        let mut trade = new_trade();
        trade.position_size = dec!(-1);
        assert!(trade.validate().is_err());

        let mut trade = new_trade();
        trade.execution_rating = Some(11);
        assert!(trade.validate().is_err());

        let mut trade = new_trade();
        trade.instrument = "   ".to_string();
        assert!(trade.validate().is_err());
    }

    #[test]
    fn outcome_is_kept_even_when_it_disagrees_with_profit_loss() {
        let mut trade = new_trade();
        trade.outcome = Outcome::Loss;
        let record = trade.into_record(Utc::now()).unwrap();
        assert_eq!(record.outcome, Outcome::Loss);
        assert_eq!(record.profit_loss, dec!(10));
    }

    #[test]
    fn update_recomputes_profit_loss_on_price_change() {
        let record = new_trade().into_record(Utc::now()).unwrap();
        let update = TradeUpdate {
            direction: Some(Direction::Short),
            exit_price: Some(dec!(90)),
            ..Default::default()
        };
        let updated = update.apply_to(&record, Utc::now()).unwrap();
        assert_eq!(updated.profit_loss, dec!(10));
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.created_at, record.created_at);
    }

    #[test]
    fn update_without_price_fields_keeps_stored_profit_loss() {
        let mut record = new_trade().into_record(Utc::now()).unwrap();
        record.profit_loss = dec!(12.5);
        let update = TradeUpdate {
            outcome: Some(Outcome::BreakEven),
            ..Default::default()
        };
        let updated = update.apply_to(&record, Utc::now()).unwrap();
        assert_eq!(updated.profit_loss, dec!(12.5));
        assert_eq!(updated.outcome, Outcome::BreakEven);
    }

    #[test]
    fn update_rejects_invalid_merge() {
        let record = new_trade().into_record(Utc::now()).unwrap();
        let update = TradeUpdate {
            exit_price: Some(dec!(0)),
            ..Default::default()
        };
        assert!(update.apply_to(&record, Utc::now()).is_err());
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let record = new_trade().into_record(Utc::now()).unwrap();
        let update: TradeUpdate =
            serde_json::from_str(r#"{"risk_reward_ratio": null, "notes": "late entry"}"#).unwrap();
        assert_eq!(update.risk_reward_ratio, Some(None));
        assert_eq!(update.execution_rating, None);

        let updated = update.apply_to(&record, Utc::now()).unwrap();
        assert_eq!(updated.risk_reward_ratio, None);
        assert_eq!(updated.execution_rating, Some(8));
        assert_eq!(updated.notes.as_deref(), Some("late entry"));
    }

    #[test]
    fn strategy_names_are_trimmed_and_required() {
        let strategy = NewStrategy {
            name: "  Breakout ".to_string(),
            description: None,
        }
        .into_strategy(Utc::now())
        .unwrap();
        assert_eq!(strategy.name, "Breakout");

        let update = StrategyUpdate {
            name: Some(" ".to_string()),
            description: None,
        };
        assert!(update.apply_to(&strategy).is_err());
    }
}
