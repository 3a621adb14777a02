use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::{bearer_token, AuthError, BearerToken};
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer authentication for the protected tier.
///
/// Verifies the token on every request and injects `AuthUser` and the raw
/// `BearerToken` into request extensions. Nothing is cached between requests.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidHeader)?),
        None => None,
    };
    let token = bearer_token(header)?.to_string();

    let user = state.authenticator.verify(&token).await?;
    debug!("Authenticated request for {}", user.user_id);

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}
