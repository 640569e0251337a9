// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::CoreError,
    models::{ArbitratorList, RegisterArbitratorRequest},
    state::AppState,
};

#[derive(Deserialize, IntoParams)]
pub struct ArbitratorQuery {
    /// Only arbitrators accepted for our own trades.
    #[serde(default)]
    pub accepted: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/arbitrators",
    params(ArbitratorQuery),
    tag = "Arbitrators",
    responses((status = 200, body = ArbitratorList))
)]
pub async fn list_arbitrators(
    State(state): State<AppState>,
    Query(params): Query<ArbitratorQuery>,
) -> Json<ArbitratorList> {
    Json(ArbitratorList::from(
        state.gateway.arbitrators(params.accepted),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/arbitrators",
    request_body = RegisterArbitratorRequest,
    tag = "Arbitrators",
    responses((status = 204), (status = 422, description = "Validation failed"))
)]
pub async fn register_arbitrator(
    State(state): State<AppState>,
    Json(request): Json<RegisterArbitratorRequest>,
) -> Result<StatusCode, CoreError> {
    state
        .gateway
        .register_arbitrator(request.language_codes, &request.registration_key)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/arbitrators/{node_address}/select",
    params(("node_address" = String, Path, description = "Arbitrator node address")),
    tag = "Arbitrators",
    responses(
        (status = 200, body = ArbitratorList),
        (status = 404),
        (status = 422, description = "Cannot select yourself")
    )
)]
pub async fn select_arbitrator(
    Path(node_address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ArbitratorList>, CoreError> {
    Ok(Json(ArbitratorList::from(
        state.gateway.select_arbitrator(&node_address)?,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/arbitrators/{node_address}/deselect",
    params(("node_address" = String, Path, description = "Arbitrator node address")),
    tag = "Arbitrators",
    responses((status = 200, body = ArbitratorList), (status = 404))
)]
pub async fn deselect_arbitrator(
    Path(node_address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ArbitratorList>, CoreError> {
    Ok(Json(ArbitratorList::from(
        state.gateway.deselect_arbitrator(&node_address)?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::app_state;

    #[tokio::test]
    async fn registration_then_listing_round_trip() {
        let (_engine, state) = app_state();
        let status = register_arbitrator(
            State(state.clone()),
            Json(RegisterArbitratorRequest {
                language_codes: vec!["en".into()],
                registration_key: "regkey".into(),
            }),
        )
        .await
        .expect("registration succeeds");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(list) =
            list_arbitrators(State(state), Query(ArbitratorQuery { accepted: false })).await;
        assert_eq!(list.total, 1);
        assert_eq!(list.items[0].registration_signature, "sig:regkey");
    }
}
