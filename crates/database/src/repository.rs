use crate::error::DbError;
use crate::store::{StrategyStore, TradeQuery, TradeRecordStore};
use analytics::SortOrder;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{
    CoreError, Direction, NewStrategy, NewTradeRecord, Outcome, Strategy, StrategyUpdate, TradeRecord, TradeUpdate,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, QueryBuilder};
use uuid::Uuid;

const TRADE_COLUMNS: &str = "id, trade_date, instrument, direction, entry_price, exit_price, \
     position_size, outcome, profit_loss, risk_reward_ratio, execution_rating, strategy_id, \
     notes, created_at, updated_at";

// Postgres SQLSTATE for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// The `DbRepository` provides the PostgreSQL implementation of the journal
/// stores. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// Database-specific trade struct that matches the trades table schema.
#[derive(Debug, Clone, FromRow)]
struct DbTrade {
    id: Uuid,
    trade_date: NaiveDate,
    instrument: String,
    direction: String,
    entry_price: Decimal,
    exit_price: Decimal,
    position_size: Decimal,
    outcome: String,
    profit_loss: Decimal,
    risk_reward_ratio: Option<Decimal>,
    execution_rating: Option<i32>,
    strategy_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbTrade> for TradeRecord {
    type Error = DbError;

    fn try_from(row: DbTrade) -> Result<Self, Self::Error> {
        let direction = row
            .direction
            .parse::<Direction>()
            .map_err(|e: CoreError| DbError::CorruptRow(e.to_string()))?;
        let outcome = row
            .outcome
            .parse::<Outcome>()
            .map_err(|e: CoreError| DbError::CorruptRow(e.to_string()))?;

        Ok(TradeRecord {
            id: row.id,
            trade_date: row.trade_date,
            instrument: row.instrument,
            direction,
            entry_price: row.entry_price,
            exit_price: row.exit_price,
            position_size: row.position_size,
            outcome,
            profit_loss: row.profit_loss,
            risk_reward_ratio: row.risk_reward_ratio,
            execution_rating: row.execution_rating,
            strategy_id: row.strategy_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbStrategy {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DbStrategy> for Strategy {
    fn from(row: DbStrategy) -> Self {
        Strategy {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `%`, `_` and `\` so user input is matched literally by `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Turns a foreign key violation on `strategy_id` into a validation error.
fn map_write_error(e: sqlx::Error) -> DbError {
    let is_fk_violation = e
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION);
    if is_fk_violation {
        DbError::Validation(CoreError::InvalidInput(
            "strategy_id".to_string(),
            "no such strategy".to_string(),
        ))
    } else {
        e.into()
    }
}

fn not_found_or(e: sqlx::Error) -> DbError {
    if let sqlx::Error::RowNotFound = e {
        DbError::NotFound
    } else {
        e.into()
    }
}

/// Builds the filtered, ordered SELECT for a list query.
fn build_list_query(query: &TradeQuery) -> QueryBuilder<'static, Postgres> {
    let criteria = &query.criteria;
    let mut builder = QueryBuilder::new(format!("SELECT {TRADE_COLUMNS} FROM trades WHERE TRUE"));

    if let Some(direction) = criteria.direction {
        builder.push(" AND direction = ").push_bind(direction.as_str());
    }
    if let Some(outcome) = criteria.outcome {
        builder.push(" AND outcome = ").push_bind(outcome.as_str());
    }
    if let Some(strategy_id) = criteria.strategy_id {
        builder.push(" AND strategy_id = ").push_bind(strategy_id);
    }
    if let Some(from) = criteria.date_from {
        builder.push(" AND trade_date >= ").push_bind(from);
    }
    if let Some(to) = criteria.date_to {
        builder.push(" AND trade_date <= ").push_bind(to);
    }
    if let Some(needle) = criteria.instrument_needle() {
        builder
            .push(" AND instrument ILIKE ")
            .push_bind(format!("%{}%", escape_like(&needle)));
    }

    let direction = match query.order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    builder.push(format!(" ORDER BY trade_date {direction}, created_at {direction}"));

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }
    if let Some(offset) = query.offset {
        builder.push(" OFFSET ").push_bind(i64::from(offset));
    }

    builder
}

#[async_trait]
impl TradeRecordStore for DbRepository {
    async fn create_trade(&self, new_trade: NewTradeRecord) -> Result<TradeRecord, DbError> {
        let record = new_trade.into_record(Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO trades (
                id, trade_date, instrument, direction, entry_price, exit_price, position_size,
                outcome, profit_loss, risk_reward_ratio, execution_rating, strategy_id, notes,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(record.id)
        .bind(record.trade_date)
        .bind(&record.instrument)
        .bind(record.direction.as_str())
        .bind(record.entry_price)
        .bind(record.exit_price)
        .bind(record.position_size)
        .bind(record.outcome.as_str())
        .bind(record.profit_loss)
        .bind(record.risk_reward_ratio)
        .bind(record.execution_rating)
        .bind(record.strategy_id)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        tracing::debug!(trade_id = %record.id, instrument = %record.instrument, "Trade created.");
        Ok(record)
    }

    async fn get_trade(&self, id: Uuid) -> Result<TradeRecord, DbError> {
        let row = sqlx::query_as::<_, DbTrade>(&format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or)?;
        row.try_into()
    }

    async fn list_trades(&self, query: &TradeQuery) -> Result<Vec<TradeRecord>, DbError> {
        let rows: Vec<DbTrade> = build_list_query(query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    /// Reads, merges and writes back within a single transaction, holding a
    /// row lock so concurrent edits cannot interleave.
    async fn update_trade(&self, id: Uuid, update: TradeUpdate) -> Result<TradeRecord, DbError> {
        let mut tx = self.pool.begin().await?;

        let current: TradeRecord = sqlx::query_as::<_, DbTrade>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_or)?
        .try_into()?;

        let updated = update.apply_to(&current, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE trades SET
                trade_date = $2, instrument = $3, direction = $4, entry_price = $5,
                exit_price = $6, position_size = $7, outcome = $8, profit_loss = $9,
                risk_reward_ratio = $10, execution_rating = $11, strategy_id = $12,
                notes = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(updated.id)
        .bind(updated.trade_date)
        .bind(&updated.instrument)
        .bind(updated.direction.as_str())
        .bind(updated.entry_price)
        .bind(updated.exit_price)
        .bind(updated.position_size)
        .bind(updated.outcome.as_str())
        .bind(updated.profit_loss)
        .bind(updated.risk_reward_ratio)
        .bind(updated.execution_rating)
        .bind(updated.strategy_id)
        .bind(&updated.notes)
        .bind(updated.updated_at)
        .execute(&mut *tx) // Note: must use the transaction object `tx` here
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        tracing::debug!(trade_id = %id, "Trade updated.");
        Ok(updated)
    }

    async fn delete_trade(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM trades WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        tracing::debug!(trade_id = %id, "Trade deleted.");
        Ok(())
    }
}

#[async_trait]
impl StrategyStore for DbRepository {
    async fn create_strategy(&self, new_strategy: NewStrategy) -> Result<Strategy, DbError> {
        let strategy = new_strategy.into_strategy(Utc::now())?;
        sqlx::query("INSERT INTO strategies (id, name, description, created_at) VALUES ($1, $2, $3, $4)")
            .bind(strategy.id)
            .bind(&strategy.name)
            .bind(&strategy.description)
            .bind(strategy.created_at)
            .execute(&self.pool)
            .await?;
        Ok(strategy)
    }

    async fn get_strategy(&self, id: Uuid) -> Result<Strategy, DbError> {
        let row = sqlx::query_as::<_, DbStrategy>(
            "SELECT id, name, description, created_at FROM strategies WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or)?;
        Ok(row.into())
    }

    async fn list_strategies(&self) -> Result<Vec<Strategy>, DbError> {
        let rows = sqlx::query_as::<_, DbStrategy>(
            "SELECT id, name, description, created_at FROM strategies ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Strategy::from).collect())
    }

    async fn update_strategy(&self, id: Uuid, update: StrategyUpdate) -> Result<Strategy, DbError> {
        let mut tx = self.pool.begin().await?;

        let current: Strategy = sqlx::query_as::<_, DbStrategy>(
            "SELECT id, name, description, created_at FROM strategies WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_or)?
        .into();

        let updated = update.apply_to(&current)?;

        sqlx::query("UPDATE strategies SET name = $2, description = $3 WHERE id = $1")
            .bind(updated.id)
            .bind(&updated.name)
            .bind(&updated.description)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Linked trades are unlinked by the `ON DELETE SET NULL` foreign key.
    async fn delete_strategy(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM strategies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::FilterCriteria;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("btc_usd%"), "btc\\_usd\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn list_query_pushes_down_every_criterion() {
        let criteria = FilterCriteria::new()
            .with_direction(Direction::Long)
            .with_outcome(Outcome::Win)
            .with_instrument("btc")
            .with_date_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_date_to(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let query = TradeQuery::new(criteria).ascending().paginate(50, 100);
        let builder = build_list_query(&query);
        let sql = builder.sql();

        assert!(sql.contains("direction = $1"));
        assert!(sql.contains("outcome = $2"));
        assert!(sql.contains("trade_date >= $3"));
        assert!(sql.contains("trade_date <= $4"));
        assert!(sql.contains("instrument ILIKE $5"));
        assert!(sql.contains("ORDER BY trade_date ASC, created_at ASC"));
        assert!(sql.contains("LIMIT $6"));
        assert!(sql.contains("OFFSET $7"));
    }

    #[test]
    fn empty_query_has_no_filters() {
        let builder = build_list_query(&TradeQuery::default());
        let sql = builder.sql();
        assert!(sql.ends_with("WHERE TRUE ORDER BY trade_date DESC, created_at DESC"));
    }
}
