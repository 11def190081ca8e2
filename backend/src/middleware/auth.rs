//! Authentication middleware
//!
//! Bearer tokens are issued elsewhere; this layer only verifies them and turns
//! their claims into the `Actor` the ledger services act on behalf of.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{Actor, ActorRole};
use uuid::Uuid;

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// `admin`, `manager` or `member`
    pub role: String,
    pub exp: i64,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let actor = match decode_actor(&token, &state.config.jwt.secret) {
        Ok(actor) => actor,
        Err(msg) => {
            tracing::debug!("Rejected bearer token: {}", msg);
            return unauthorized_response(&msg);
        }
    };

    request.extensions_mut().insert(actor);
    next.run(request).await
}

/// Decode and validate a token into the acting user
pub fn decode_actor(token: &str, secret: &str) -> Result<Actor, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;
    let role = ActorRole::from_str(&claims.role).ok_or_else(|| "Invalid role in token".to_string())?;

    Ok(Actor::new(user_id, role))
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail::new("UNAUTHORIZED", message),
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for the authenticated actor
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Actor);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new("UNAUTHORIZED", "Authentication required"),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
