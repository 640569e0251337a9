// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::CoreError,
    gateway::{AddressPurpose, WalletAddressRecord, WalletDetails},
    models::{CreateAddressRequest, WalletAddressList, WithdrawRequest},
    state::AppState,
};

#[derive(Deserialize, IntoParams)]
pub struct AddressQuery {
    /// Restrict the listing to one purpose; all entries when omitted.
    pub purpose: Option<AddressPurpose>,
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    tag = "Wallet",
    responses(
        (status = 200, body = WalletDetails),
        (status = 503, description = "Wallet not ready")
    )
)]
pub async fn wallet_details(
    State(state): State<AppState>,
) -> Result<Json<WalletDetails>, CoreError> {
    Ok(Json(state.gateway.wallet_details()?))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/addresses",
    params(AddressQuery),
    tag = "Wallet",
    responses((status = 200, body = WalletAddressList))
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    Query(params): Query<AddressQuery>,
) -> Json<WalletAddressList> {
    Json(WalletAddressList::from(
        state.gateway.wallet_addresses(params.purpose),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet/addresses",
    request_body = CreateAddressRequest,
    tag = "Wallet",
    responses((status = 201, body = WalletAddressRecord))
)]
pub async fn create_address(
    State(state): State<AppState>,
    Json(request): Json<CreateAddressRequest>,
) -> (StatusCode, Json<WalletAddressRecord>) {
    let record = state
        .gateway
        .get_or_create_address(request.context, request.unused);
    (StatusCode::CREATED, Json(record))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet/withdraw",
    request_body = WithdrawRequest,
    tag = "Wallet",
    responses(
        (status = 204),
        (status = 409, description = "Insufficient funds"),
        (status = 422, description = "Validation failed or amount too low")
    )
)]
pub async fn withdraw(
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<StatusCode, CoreError> {
    state.gateway.withdraw_funds(request.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::app_state;
    use crate::engine::AddressContext;

    #[tokio::test]
    async fn wallet_details_reports_the_available_balance() {
        let (engine, state) = app_state();
        engine.set_available_balance(42_000);

        let Json(details) = wallet_details(State(state)).await.expect("wallet is ready");
        assert_eq!(details.available_balance, 42_000);
        assert_eq!(details.reserved_balance, 0);
        assert_eq!(details.locked_balance, 0);
    }

    #[tokio::test]
    async fn created_addresses_show_up_in_the_receive_listing() {
        let (_engine, state) = app_state();
        let (status, Json(record)) = create_address(
            State(state.clone()),
            Json(CreateAddressRequest {
                context: AddressContext::Available,
                unused: true,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let Json(list) = list_addresses(
            State(state),
            Query(AddressQuery {
                purpose: Some(AddressPurpose::ReceiveFunds),
            }),
        )
        .await;
        assert_eq!(list.total, 1);
        assert_eq!(list.items[0].address, record.address);
    }
}
