/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Handlers for identity and token issuance.

use axum::{
    extract::{Query, State},
    Json,
};
use kitchen_sink_types::{requests::TokenQuery, AccessToken, Identity};

use crate::error::AppError;
use crate::state::AppState;

/// GET /Identity
///
/// Mints a brand new communication user on every call and returns it with
/// its first access token. The body is the bare [`Identity`], not wrapped in
/// an `APIResponse`, so browser clients can hand `accessToken.token`
/// straight to the calling SDK.
pub async fn create_identity(State(state): State<AppState>) -> Result<Json<Identity>, AppError> {
    let identity = state.issuer.create_user_and_token(&state.scopes).await?;
    tracing::info!("Issued identity for {}", identity.user.id);
    Ok(Json(identity))
}

/// GET /Identity/token?userId=...
///
/// Issues a fresh access token for an existing user. Used by the client's
/// credential refresher.
pub async fn refresh_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<AccessToken>, AppError> {
    let user_id = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(AppError::missing_user_id)?;

    let token = state.issuer.issue_token(user_id, &state.scopes).await?;
    tracing::debug!("Refreshed token for {user_id}");
    Ok(Json(token))
}
