// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::CoreError,
    models::{ClosedTradeList, TradeDetail, TradeList},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/trades",
    tag = "Trades",
    responses((status = 200, body = TradeList))
)]
pub async fn list_trades(State(state): State<AppState>) -> Json<TradeList> {
    let items: Vec<TradeDetail> = state.gateway.trades().iter().map(TradeDetail::from).collect();
    Json(TradeList::from(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/trades/closed",
    tag = "Trades",
    responses((status = 200, body = ClosedTradeList))
)]
pub async fn list_closed_trades(State(state): State<AppState>) -> Json<ClosedTradeList> {
    Json(ClosedTradeList::from(state.gateway.closed_trades()))
}

#[utoipa::path(
    get,
    path = "/api/v1/trades/{trade_id}",
    params(("trade_id" = String, Path, description = "Trade identifier")),
    tag = "Trades",
    responses((status = 200, body = TradeDetail), (status = 404))
)]
pub async fn get_trade(
    Path(trade_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TradeDetail>, CoreError> {
    let trade = state.gateway.trade(&trade_id)?;
    Ok(Json(TradeDetail::from(&trade)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trades/{trade_id}/payment-started",
    params(("trade_id" = String, Path, description = "Trade identifier")),
    tag = "Trades",
    responses(
        (status = 204),
        (status = 404),
        (status = 422, description = "Wrong state or role")
    )
)]
pub async fn payment_started(
    Path(trade_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, CoreError> {
    state.gateway.start_payment(&trade_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/trades/{trade_id}/payment-received",
    params(("trade_id" = String, Path, description = "Trade identifier")),
    tag = "Trades",
    responses(
        (status = 204),
        (status = 404),
        (status = 422, description = "Wrong state or role")
    )
)]
pub async fn payment_received(
    Path(trade_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, CoreError> {
    state.gateway.confirm_payment_received(&trade_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/trades/{trade_id}/move-funds",
    params(("trade_id" = String, Path, description = "Trade identifier")),
    tag = "Trades",
    responses(
        (status = 204),
        (status = 404),
        (status = 422, description = "Payout not yet published")
    )
)]
pub async fn move_funds(
    Path(trade_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, CoreError> {
    state.gateway.sweep_to_main_wallet(&trade_id)?;
    Ok(StatusCode::NO_CONTENT)
}
