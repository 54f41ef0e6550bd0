//! Request context extraction and authentication middleware.
//!
//! Identity is owned by the upstream OAuth2 layer; this module only derives
//! a [`UserContext`] from what that layer forwarded. In debug mode the
//! identity arrives as `X-User` / `X-Email` / `X-Teams` headers (local
//! development and tests). In production mode it arrives as a verified JWT
//! whose claims name the user and their teams.
//!
//! Requests without identity still pass: read-only routes serve anonymous
//! callers, and mutating handlers reject the absent user themselves.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::header::HeaderName;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use ulid::Ulid;

use dashops_core::UserContext;

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context derived from authentication and headers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated principal, when the request carried identity.
    pub user: Option<UserContext>,
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

impl RequestContext {
    /// Returns the authenticated user or a 401 for mutating handlers.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::missing_auth` when the request is anonymous.
    pub fn require_user(&self) -> Result<&UserContext, ApiError> {
        self.user
            .as_ref()
            .ok_or_else(|| ApiError::missing_auth().with_request_id(self.request_id.clone()))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            header_string(headers, "X-Request-Id").unwrap_or_else(|| Ulid::new().to_string());

        let user = if state.config.debug {
            user_from_headers(headers)
        } else {
            match bearer_token(headers) {
                Some(token) => Some(user_from_jwt(&token, &state.config.jwt, &request_id)?),
                None => None,
            }
        };

        let ctx = Self { user, request_id };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

/// Debug-mode identity: forwarded headers from a dev proxy or test harness.
fn user_from_headers(headers: &HeaderMap) -> Option<UserContext> {
    let username = header_string(headers, "X-User")?;
    let email = header_string(headers, "X-Email").unwrap_or_default();
    let name = header_string(headers, "X-Name").unwrap_or_default();
    let teams = header_string(headers, "X-Teams")
        .map(|teams| {
            teams
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(UserContext::new(username, name, email).with_teams(teams))
}

/// Production identity: claims from the upstream-issued JWT.
fn user_from_jwt(token: &str, jwt: &JwtConfig, request_id: &str) -> Result<UserContext, ApiError> {
    let (decoding_key, algorithm) = jwt_decoding_key(jwt, request_id)?;
    let mut validation = Validation::new(algorithm);
    validation.validate_nbf = true;

    if let Some(iss) = jwt.issuer.as_deref() {
        validation.set_issuer(&[iss]);
    }
    if let Some(aud) = jwt.audience.as_deref() {
        validation.set_audience(&[aud]);
    }

    let data = jsonwebtoken::decode::<Value>(token, &decoding_key, &validation)
        .map_err(|_| invalid_token(request_id))?;

    let Some(claims) = data.claims.as_object() else {
        return Err(invalid_token(request_id));
    };

    let username = required_claim(claims, &jwt.username_claim, request_id)?;
    let email = required_claim(claims, &jwt.email_claim, request_id)?;
    let name = claims
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let teams = claims
        .get(&jwt.teams_claim)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(UserContext::new(username, name, email).with_teams(teams))
}

fn jwt_decoding_key(
    jwt: &JwtConfig,
    request_id: &str,
) -> Result<(DecodingKey, Algorithm), ApiError> {
    match (jwt.hs256_secret.as_deref(), jwt.rs256_public_key_pem.as_deref()) {
        (Some(secret), None) => Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)),
        (None, Some(pem)) => DecodingKey::from_rsa_pem(pem.as_bytes())
            .map(|key| (key, Algorithm::RS256))
            .map_err(|e| {
                ApiError::internal(format!("failed to parse jwt.rs256_public_key_pem: {e}"))
                    .with_request_id(request_id.to_string())
            }),
        (Some(_), Some(_)) => Err(ApiError::internal(
            "jwt.hs256_secret and jwt.rs256_public_key_pem are mutually exclusive",
        )
        .with_request_id(request_id.to_string())),
        (None, None) => Err(ApiError::internal(
            "jwt.hs256_secret or jwt.rs256_public_key_pem is required when debug=false",
        )
        .with_request_id(request_id.to_string())),
    }
}

fn invalid_token(request_id: &str) -> ApiError {
    ApiError::unauthorized("Invalid bearer token").with_request_id(request_id.to_string())
}

fn required_claim(
    claims: &serde_json::Map<String, Value>,
    claim: &str,
    request_id: &str,
) -> Result<String, ApiError> {
    claims
        .get(claim)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid_token(request_id))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_string(headers, "Authorization")?;
    let token = raw.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Authentication middleware.
///
/// Runs ahead of the route handlers and injects a [`RequestContext`] into
/// request extensions; the request ID is echoed on the response.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let ctx = match RequestContext::from_request_parts(&mut parts, &state).await {
        Ok(ctx) => ctx,
        Err(err) => return err.into_response(),
    };

    let mut req = Request::from_parts(parts, body);
    let request_id = ctx.request_id.clone();
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
