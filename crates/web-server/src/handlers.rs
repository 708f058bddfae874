use crate::{AppState, error::AppError};
use analytics::{FilterCriteria, SortKey, SortOrder, Statistics, TimeWindow, sort_records};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::{NaiveDate, Utc};
use core_types::{
    Direction, NewStrategy, NewTradeRecord, Outcome, Strategy, StrategyUpdate, TradeRecord,
    TradeUpdate,
};
use database::TradeQuery;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Filter parameters shared by the list and statistics endpoints.
///
/// Enum-like values are taken as strings so `long`, `Long` and `LONG` all work.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub direction: Option<String>,
    pub outcome: Option<String>,
    pub instrument: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub strategy_id: Option<Uuid>,
    /// `all`, `7d`, `30d`, `90d` or `ytd`.
    pub window: Option<String>,
}

impl FilterParams {
    fn into_criteria(self, today: NaiveDate) -> Result<FilterCriteria, AppError> {
        let mut criteria = FilterCriteria {
            direction: self.direction.as_deref().map(str::parse::<Direction>).transpose()?,
            outcome: self.outcome.as_deref().map(str::parse::<Outcome>).transpose()?,
            instrument_substring: self.instrument,
            date_from: self.from,
            date_to: self.to,
            strategy_id: self.strategy_id,
        };
        if let Some(window) = self.window.as_deref() {
            criteria = criteria.with_window(window.parse::<TimeWindow>()?, today);
        }
        Ok(criteria)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(flatten)]
    pub filter: FilterParams,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsParams {
    #[serde(flatten)]
    pub filter: FilterParams,
    /// Order of the equity series; chronological unless asked otherwise.
    pub order: Option<SortOrder>,
}

// Extractors whose rejections answer with the JSON error body.
type ApiJson<T> = WithRejection<Json<T>, AppError>;
type ApiQuery<T> = WithRejection<Query<T>, AppError>;
type ApiPath<T> = WithRejection<Path<T>, AppError>;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// # GET /api/health
pub async fn health() -> &'static str {
    "OK"
}

/// # GET /api/trades
/// Lists trades matching the filter, sorted for display.
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<ListParams>,
) -> Result<Json<Vec<TradeRecord>>, AppError> {
    let criteria = params.filter.into_criteria(today())?;
    let mut query = TradeQuery::new(criteria);
    query.order = params.order;

    let page = params.page.unwrap_or(1).max(1);
    let pagination = params.limit.map(|limit| (limit, (page - 1).saturating_mul(limit)));

    // Date order is the store's native order, so paging can be pushed down.
    // Any other order needs the full selection sorted before it is paged.
    if params.sort == SortKey::TradeDate {
        if let Some((limit, offset)) = pagination {
            query = query.paginate(limit, offset);
        }
        return Ok(Json(state.trades.list_trades(&query).await?));
    }

    let mut trades = state.trades.list_trades(&query).await?;
    sort_records(&mut trades, params.sort, params.order);
    if let Some((limit, offset)) = pagination {
        trades = trades
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
    }
    Ok(Json(trades))
}

/// # POST /api/trades
pub async fn create_trade(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(new_trade), _): ApiJson<NewTradeRecord>,
) -> Result<(StatusCode, Json<TradeRecord>), AppError> {
    let trade = state.trades.create_trade(new_trade).await?;
    tracing::info!(trade_id = %trade.id, instrument = %trade.instrument, "Trade logged.");
    Ok((StatusCode::CREATED, Json(trade)))
}

/// # GET /api/trades/:id
pub async fn get_trade(
    WithRejection(Path(id), _): ApiPath<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TradeRecord>, AppError> {
    Ok(Json(state.trades.get_trade(id).await?))
}

/// # PUT /api/trades/:id
pub async fn update_trade(
    WithRejection(Path(id), _): ApiPath<Uuid>,
    State(state): State<Arc<AppState>>,
    WithRejection(Json(update), _): ApiJson<TradeUpdate>,
) -> Result<Json<TradeRecord>, AppError> {
    Ok(Json(state.trades.update_trade(id, update).await?))
}

/// # DELETE /api/trades/:id
pub async fn delete_trade(
    WithRejection(Path(id), _): ApiPath<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.trades.delete_trade(id).await?;
    tracing::info!(trade_id = %id, "Trade deleted.");
    Ok(StatusCode::NO_CONTENT)
}

/// # GET /api/statistics
/// Summarizes the trades matching the filter. An empty selection answers
/// `{"status": "no_data"}` rather than an error.
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<StatisticsParams>,
) -> Result<Json<Statistics>, AppError> {
    let criteria = params.filter.into_criteria(today())?;
    let mut query = TradeQuery::new(criteria);
    query.order = params.order.unwrap_or(SortOrder::Ascending);

    let trades = state.trades.list_trades(&query).await?;
    Ok(Json(state.engine.summarize(&trades)))
}

/// # GET /api/strategies
pub async fn list_strategies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Strategy>>, AppError> {
    Ok(Json(state.strategies.list_strategies().await?))
}

/// # POST /api/strategies
pub async fn create_strategy(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(new_strategy), _): ApiJson<NewStrategy>,
) -> Result<(StatusCode, Json<Strategy>), AppError> {
    let strategy = state.strategies.create_strategy(new_strategy).await?;
    Ok((StatusCode::CREATED, Json(strategy)))
}

/// # GET /api/strategies/:id
pub async fn get_strategy(
    WithRejection(Path(id), _): ApiPath<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Strategy>, AppError> {
    Ok(Json(state.strategies.get_strategy(id).await?))
}

/// # PUT /api/strategies/:id
pub async fn update_strategy(
    WithRejection(Path(id), _): ApiPath<Uuid>,
    State(state): State<Arc<AppState>>,
    WithRejection(Json(update), _): ApiJson<StrategyUpdate>,
) -> Result<Json<Strategy>, AppError> {
    Ok(Json(state.strategies.update_strategy(id, update).await?))
}

/// # DELETE /api/strategies/:id
pub async fn delete_strategy(
    WithRejection(Path(id), _): ApiPath<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.strategies.delete_strategy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
