use crate::error::DbError;
use analytics::{FilterCriteria, SortOrder};
use async_trait::async_trait;
use core_types::{NewStrategy, NewTradeRecord, Strategy, StrategyUpdate, TradeRecord, TradeUpdate};
use uuid::Uuid;

/// A read query against the trade store.
///
/// Filters are pushed down to the store; results come back ordered by
/// `trade_date` (then creation time) in the requested direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeQuery {
    pub criteria: FilterCriteria,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TradeQuery {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    pub fn ascending(mut self) -> Self {
        self.order = SortOrder::Ascending;
        self
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// The persistence contract for logged trades.
///
/// Implementations validate every payload and compute `profit_loss` on
/// create and update; the trade's outcome label is stored exactly as given.
#[async_trait]
pub trait TradeRecordStore: Send + Sync {
    /// Stores a new trade with a fresh id and timestamps.
    async fn create_trade(&self, new_trade: NewTradeRecord) -> Result<TradeRecord, DbError>;

    /// Fetches one trade, or `DbError::NotFound`.
    async fn get_trade(&self, id: Uuid) -> Result<TradeRecord, DbError>;

    /// Fetches every trade matching the query.
    async fn list_trades(&self, query: &TradeQuery) -> Result<Vec<TradeRecord>, DbError>;

    /// Applies a partial update and returns the stored result.
    async fn update_trade(&self, id: Uuid, update: TradeUpdate) -> Result<TradeRecord, DbError>;

    /// Removes a trade, or returns `DbError::NotFound`.
    async fn delete_trade(&self, id: Uuid) -> Result<(), DbError>;
}

/// The persistence contract for strategy metadata.
#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn create_strategy(&self, new_strategy: NewStrategy) -> Result<Strategy, DbError>;

    async fn get_strategy(&self, id: Uuid) -> Result<Strategy, DbError>;

    /// All strategies, alphabetically by name.
    async fn list_strategies(&self) -> Result<Vec<Strategy>, DbError>;

    async fn update_strategy(&self, id: Uuid, update: StrategyUpdate) -> Result<Strategy, DbError>;

    /// Removes a strategy. Trades linked to it are kept and unlinked.
    async fn delete_strategy(&self, id: Uuid) -> Result<(), DbError>;
}
