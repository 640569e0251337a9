// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{extract::State, Json};

use crate::{
    auth,
    error::CoreError,
    models::{AuthRequest, AuthResult, ChangePasswordRequest},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/user/authenticate",
    request_body = AuthRequest,
    tag = "User",
    responses(
        (status = 200, body = AuthResult),
        (status = 401, description = "Invalid password"),
        (status = 503, description = "Wallet not ready")
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<AuthRequest>,
) -> Result<Json<AuthResult>, CoreError> {
    let token = auth::authenticate(state.wallet.as_ref(), &state.tokens, &request.password)?;
    Ok(Json(AuthResult { token }))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/password",
    request_body = ChangePasswordRequest,
    tag = "User",
    responses(
        (status = 200, body = AuthResult),
        (status = 401, description = "Old password does not match")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthResult>, CoreError> {
    let token = auth::change_password(
        state.wallet.as_ref(),
        &state.tokens,
        request.old_password.as_deref(),
        &request.new_password,
    )?;
    Ok(Json(AuthResult { token }))
}
