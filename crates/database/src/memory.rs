use crate::error::DbError;
use crate::store::{StrategyStore, TradeQuery, TradeRecordStore};
use analytics::SortOrder;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{
    CoreError, NewStrategy, NewTradeRecord, Strategy, StrategyUpdate, TradeRecord, TradeUpdate,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    // Insertion order doubles as the tie-breaker for equal timestamps.
    trades: Vec<TradeRecord>,
    strategies: Vec<Strategy>,
}

impl MemoryState {
    fn ensure_strategy_exists(&self, strategy_id: Option<Uuid>) -> Result<(), DbError> {
        match strategy_id {
            Some(id) if !self.strategies.iter().any(|s| s.id == id) => Err(DbError::Validation(
                CoreError::InvalidInput("strategy_id".to_string(), "no such strategy".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

/// An in-process store with the same semantics as the PostgreSQL repository.
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeRecordStore for MemoryStore {
    async fn create_trade(&self, new_trade: NewTradeRecord) -> Result<TradeRecord, DbError> {
        let record = new_trade.into_record(Utc::now())?;
        let mut state = self.state.write().await;
        state.ensure_strategy_exists(record.strategy_id)?;
        state.trades.push(record.clone());
        Ok(record)
    }

    async fn get_trade(&self, id: Uuid) -> Result<TradeRecord, DbError> {
        let state = self.state.read().await;
        state
            .trades
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_trades(&self, query: &TradeQuery) -> Result<Vec<TradeRecord>, DbError> {
        let mut records = {
            let state = self.state.read().await;
            query.criteria.apply(&state.trades)
        };

        records.sort_by(|a, b| {
            let ordering = (a.trade_date, a.created_at).cmp(&(b.trade_date, b.created_at));
            match query.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_trade(&self, id: Uuid, update: TradeUpdate) -> Result<TradeRecord, DbError> {
        let mut state = self.state.write().await;
        let index = state
            .trades
            .iter()
            .position(|t| t.id == id)
            .ok_or(DbError::NotFound)?;

        let updated = update.apply_to(&state.trades[index], Utc::now())?;
        state.ensure_strategy_exists(updated.strategy_id)?;
        state.trades[index] = updated.clone();
        Ok(updated)
    }

    async fn delete_trade(&self, id: Uuid) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        let before = state.trades.len();
        state.trades.retain(|t| t.id != id);
        if state.trades.len() == before {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StrategyStore for MemoryStore {
    async fn create_strategy(&self, new_strategy: NewStrategy) -> Result<Strategy, DbError> {
        let strategy = new_strategy.into_strategy(Utc::now())?;
        self.state.write().await.strategies.push(strategy.clone());
        Ok(strategy)
    }

    async fn get_strategy(&self, id: Uuid) -> Result<Strategy, DbError> {
        let state = self.state.read().await;
        state
            .strategies
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_strategies(&self) -> Result<Vec<Strategy>, DbError> {
        let mut strategies = self.state.read().await.strategies.clone();
        strategies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(strategies)
    }

    async fn update_strategy(&self, id: Uuid, update: StrategyUpdate) -> Result<Strategy, DbError> {
        let mut state = self.state.write().await;
        let strategy = state
            .strategies
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DbError::NotFound)?;
        let updated = update.apply_to(strategy)?;
        *strategy = updated.clone();
        Ok(updated)
    }

    async fn delete_strategy(&self, id: Uuid) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        let before = state.strategies.len();
        state.strategies.retain(|s| s.id != id);
        if state.strategies.len() == before {
            return Err(DbError::NotFound);
        }
        for trade in state.trades.iter_mut().filter(|t| t.strategy_id == Some(id)) {
            trade.strategy_id = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::FilterCriteria;
    use chrono::NaiveDate;
    use core_types::{Direction, Outcome};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn new_trade(day: u32, instrument: &str, direction: Direction, exit: Decimal) -> NewTradeRecord {
        NewTradeRecord {
            trade_date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            instrument: instrument.to_string(),
            direction,
            entry_price: dec!(100),
            exit_price: exit,
            position_size: dec!(2),
            outcome: Outcome::Win,
            risk_reward_ratio: None,
            execution_rating: None,
            strategy_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_profit_loss() {
        let store = MemoryStore::new();
        let record = store
            .create_trade(new_trade(1, "BTC/USD", Direction::Short, dec!(90)))
            .await
            .unwrap();
        assert_eq!(record.profit_loss, dec!(20));
        assert_eq!(store.get_trade(record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn create_rejects_invalid_payloads() {
        let store = MemoryStore::new();
        let err = store
            .create_trade(new_trade(1, "BTC/USD", Direction::Long, dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(store.list_trades(&TradeQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_orders_and_paginates() {
        let store = MemoryStore::new();
        for (day, instrument) in [(3, "BTC/USD"), (1, "ETH/USD"), (2, "btc/eur"), (5, "BTC/JPY")] {
            store
                .create_trade(new_trade(day, instrument, Direction::Long, dec!(110)))
                .await
                .unwrap();
        }

        let newest_first = store.list_trades(&TradeQuery::default()).await.unwrap();
        let days: Vec<u32> = newest_first.iter().map(|t| chrono::Datelike::day(&t.trade_date)).collect();
        assert_eq!(days, vec![5, 3, 2, 1]);

        let query = TradeQuery::new(FilterCriteria::new().with_instrument("btc"))
            .ascending()
            .paginate(2, 1);
        let page: Vec<String> = store
            .list_trades(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.instrument)
            .collect();
        assert_eq!(page, vec!["BTC/USD", "BTC/JPY"]);
    }

    #[tokio::test]
    async fn update_recomputes_and_delete_removes() {
        let store = MemoryStore::new();
        let record = store
            .create_trade(new_trade(1, "BTC/USD", Direction::Long, dec!(110)))
            .await
            .unwrap();

        let update = TradeUpdate {
            position_size: Some(dec!(3)),
            ..Default::default()
        };
        let updated = store.update_trade(record.id, update).await.unwrap();
        assert_eq!(updated.profit_loss, dec!(30));

        store.delete_trade(record.id).await.unwrap();
        assert!(matches!(store.get_trade(record.id).await, Err(DbError::NotFound)));
        assert!(matches!(store.delete_trade(record.id).await, Err(DbError::NotFound)));
        assert!(matches!(
            store.update_trade(record.id, TradeUpdate::default()).await,
            Err(DbError::NotFound)
        ));
    }

    #[tokio::test]
    async fn trades_must_reference_known_strategies() {
        let store = MemoryStore::new();
        let mut payload = new_trade(1, "BTC/USD", Direction::Long, dec!(110));
        payload.strategy_id = Some(Uuid::new_v4());
        assert!(matches!(store.create_trade(payload).await, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn deleting_a_strategy_unlinks_its_trades() {
        let store = MemoryStore::new();
        let strategy = store
            .create_strategy(NewStrategy {
                name: "Breakout".to_string(),
                description: Some("Range breaks on the 4h".to_string()),
            })
            .await
            .unwrap();

        let mut payload = new_trade(1, "BTC/USD", Direction::Long, dec!(110));
        payload.strategy_id = Some(strategy.id);
        let trade = store.create_trade(payload).await.unwrap();

        store.delete_strategy(strategy.id).await.unwrap();
        assert!(store.list_strategies().await.unwrap().is_empty());
        assert_eq!(store.get_trade(trade.id).await.unwrap().strategy_id, None);
    }

    #[tokio::test]
    async fn strategies_update_and_list_by_name() {
        let store = MemoryStore::new();
        for name in ["Scalp", "Breakout"] {
            store
                .create_strategy(NewStrategy {
                    name: name.to_string(),
                    description: None,
                })
                .await
                .unwrap();
        }
        let names: Vec<String> = store
            .list_strategies()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Breakout", "Scalp"]);

        let scalp = store.list_strategies().await.unwrap().pop().unwrap();
        let renamed = store
            .update_strategy(
                scalp.id,
                StrategyUpdate {
                    name: Some("Momentum scalp".to_string()),
                    description: Some(Some("1m chart".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get_strategy(scalp.id).await.unwrap(), renamed);
    }
}
