// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    engine::Offer,
    error::CoreError,
    models::{MakeOfferRequest, OfferList, TakeOfferRequest, TradeDetail},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/offers",
    tag = "Offers",
    responses((status = 200, body = OfferList))
)]
pub async fn list_offers(State(state): State<AppState>) -> Json<OfferList> {
    Json(OfferList::from(state.gateway.offers()))
}

#[utoipa::path(
    get,
    path = "/api/v1/offers/{offer_id}",
    params(("offer_id" = String, Path, description = "Offer identifier")),
    tag = "Offers",
    responses((status = 200, body = Offer), (status = 404))
)]
pub async fn get_offer(
    Path(offer_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Offer>, CoreError> {
    Ok(Json(state.gateway.offer(&offer_id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers",
    request_body = MakeOfferRequest,
    tag = "Offers",
    responses(
        (status = 201, body = Offer),
        (status = 409, description = "Insufficient funds"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn make_offer(
    State(state): State<AppState>,
    Json(request): Json<MakeOfferRequest>,
) -> Result<(StatusCode, Json<Offer>), CoreError> {
    let offer = state.gateway.make_offer(request.into()).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/offers/{offer_id}",
    params(("offer_id" = String, Path, description = "Offer identifier")),
    tag = "Offers",
    responses((status = 204), (status = 404))
)]
pub async fn cancel_offer(
    Path(offer_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, CoreError> {
    state.gateway.cancel_offer(&offer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/offers/{offer_id}/take",
    params(("offer_id" = String, Path, description = "Offer identifier")),
    request_body = TakeOfferRequest,
    tag = "Offers",
    responses(
        (status = 200, body = TradeDetail),
        (status = 404),
        (status = 409, description = "Insufficient funds"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn take_offer(
    Path(offer_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<TakeOfferRequest>,
) -> Result<Json<TradeDetail>, CoreError> {
    let trade = state
        .gateway
        .take_offer(
            &offer_id,
            &request.payment_account_id,
            request.amount,
            request.fund_from_wallet,
        )
        .await?;
    Ok(Json(TradeDetail::from(&trade)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::app_state;
    use crate::engine::{Direction, PriceSpec};

    #[tokio::test]
    async fn make_offer_answers_created_with_the_published_offer() {
        let (engine, state) = app_state();
        engine.set_available_balance(10_000_000);
        engine.insert_payment_account(crate::engine::PaymentAccount {
            id: "acc-1".into(),
            currency_codes: vec!["EUR".into()],
        });

        let (status, Json(offer)) = make_offer(
            State(state.clone()),
            Json(MakeOfferRequest {
                direction: Direction::Buy,
                amount: 1_000_000,
                min_amount: 100_000,
                price: PriceSpec::Fixed(4_500_000),
                currency_code: "EUR".into(),
                payment_account_id: "acc-1".into(),
                buyer_security_deposit: None,
                fund_from_wallet: true,
            }),
        )
        .await
        .expect("offer placement succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert!(!offer.id.is_empty());

        let Json(list) = list_offers(State(state)).await;
        assert_eq!(list.total, 1);
        assert_eq!(list.items[0].id, offer.id);
    }

    #[tokio::test]
    async fn unknown_offer_is_reported_as_not_found() {
        let (_engine, state) = app_state();
        let err = get_offer(Path("missing".into()), State(state))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
