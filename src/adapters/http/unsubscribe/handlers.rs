//! HTTP handler for self-service unsubscribe links.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::domain::account::AccountError;
use crate::domain::foundation::{AccountId, UnsubscribeToken};

use super::super::error::ApiError;
use super::super::AppState;

/// POST /unsubscribe/:account_id/:token - Remove the recipient holding the token
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path((account_id, token)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let account_id = AccountId::parse(account_id).map_err(|_| {
        ApiError::bad_request("ACCOUNT_NOT_FOUND", "Account not found")
    })?;
    let token = UnsubscribeToken::new(token)
        .map_err(|_| ApiError::from(AccountError::recipient_not_found(account_id.clone())))?;

    state.unsubscribe.unsubscribe(&account_id, &token).await?;

    Ok(StatusCode::OK)
}
