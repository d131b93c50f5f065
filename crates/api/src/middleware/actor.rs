//! Request actor extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Header naming the caller on whose behalf a request is made.
pub const ACTOR_HEADER: &str = "x-actor";

/// Actor used when the request carries no `x-actor` header.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Longest accepted actor name.
const MAX_ACTOR_LENGTH: usize = 100;

/// The caller of a request, read from the optional `x-actor` header.
///
/// This is request-scoped context attached to log events, not an
/// authentication mechanism.
///
/// ```ignore
/// async fn my_handler(actor: RequestActor) -> AppResult<Json<()>> {
///     tracing::info!(actor = %actor, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestActor(pub String);

impl RequestActor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequestParts<AppState> for RequestActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(RequestActor(ANONYMOUS_ACTOR.to_string()));
        };

        let actor = value
            .to_str()
            .map_err(|_| AppError::BadRequest("x-actor header must be visible ASCII".into()))?
            .trim();

        if actor.is_empty() {
            return Ok(RequestActor(ANONYMOUS_ACTOR.to_string()));
        }
        if actor.len() > MAX_ACTOR_LENGTH {
            return Err(AppError::BadRequest(format!(
                "x-actor header must be at most {MAX_ACTOR_LENGTH} characters"
            )));
        }

        Ok(RequestActor(actor.to_string()))
    }
}
