//! Session context: the cached "current user" blob and the extractors
//! and gates that carry identity explicitly through handlers.
//!
//! Clients hold the authenticated user as base64-encoded JSON and send
//! it back in the `x-club-session` header. The encoding is reversible
//! obfuscation of what the client already knows about itself, never a
//! trust boundary; authorization decisions made from it are advisory
//! and the external store's access rules remain the real enforcement.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

use pawclub_authz::{has_any_role, Role};
use pawclub_http::AppError;
use pawclub_kernel::settings::SessionSettings;

use crate::modules::profiles::models::User;

/// Header carrying the encoded session blob.
pub const SESSION_HEADER: &str = "x-club-session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session blob is not valid base64")]
    Decode(#[from] base64::DecodeError),

    #[error("session blob does not decode to a user")]
    Encoding(#[from] serde_json::Error),
}

/// Encode a user into the client-held session blob.
pub fn encode_session(user: &User) -> Result<String, SessionError> {
    Ok(BASE64.encode(serde_json::to_vec(user)?))
}

/// Decode a session blob back into the cached user.
pub fn decode_session(blob: &str) -> Result<User, SessionError> {
    let bytes = BASE64.decode(blob.trim().as_bytes())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// The optional viewer: present when the request carried a decodable
/// session blob. Garbage blobs read as "not signed in".
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|blob| match decode_session(blob) {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::debug!(%err, "ignoring undecodable session blob");
                    None
                }
            });
        Ok(Self(user))
    }
}

/// The signed-in viewer. Rejects with 401 so the client can surface its
/// login prompt instead of performing the action.
pub struct Authenticated(pub User);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(Some(user))) => Ok(Self(user)),
            Ok(CurrentUser(None)) => Err(AppError::unauthorized("sign in to continue")),
            Err(infallible) => match infallible {},
        }
    }
}

/// Configuration of a role-gated route subtree: which role values open
/// it and where everyone else is sent.
#[derive(Clone)]
pub struct RoleGate {
    pub required: Vec<Role>,
    pub fallback: String,
}

impl RoleGate {
    pub fn from_settings(session: &SessionSettings) -> Self {
        let required = session
            .admin_roles
            .iter()
            .filter_map(|name| match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(err) => {
                    tracing::warn!(%err, "ignoring unknown role in session.admin_roles");
                    None
                }
            })
            .collect();
        Self {
            required,
            fallback: session.login_redirect.clone(),
        }
    }
}

/// Middleware guarding a protected subtree: the viewer must be signed in
/// and hold one of the gate's roles, otherwise they are redirected to
/// the configured fallback location.
pub async fn require_roles(
    State(gate): State<RoleGate>,
    CurrentUser(user): CurrentUser,
    request: Request,
    next: Next,
) -> Response {
    match user {
        Some(user) if has_any_role(&user.roles, &gate.required) => next.run(request).await,
        Some(user) => {
            tracing::debug!(user = %user.id, "viewer lacks a gating role");
            Redirect::temporary(&gate.fallback).into_response()
        }
        None => Redirect::temporary(&gate.fallback).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http, middleware::from_fn_with_state, routing::get, Router};
    use pawclub_authz::RoleMap;
    use tower::ServiceExt;

    fn member(roles: &[(&str, Role)]) -> User {
        User {
            id: "u1".into(),
            display_name: "Ada".into(),
            email: "ada@club.example".into(),
            avatar_url: None,
            roles: roles
                .iter()
                .map(|(id, role)| (id.to_string(), *role))
                .collect::<RoleMap>(),
        }
    }

    #[test]
    fn session_blob_roundtrips() {
        let user = member(&[("r1", Role::Moderator)]);
        let blob = encode_session(&user).unwrap();
        let back = decode_session(&blob).unwrap();
        assert_eq!(back.id, user.id);
        assert_eq!(back.roles, user.roles);
    }

    #[test]
    fn tampered_blob_fails_to_decode() {
        assert!(decode_session("!!not-base64!!").is_err());
        let not_a_user = BASE64.encode(b"[1,2,3]");
        assert!(decode_session(&not_a_user).is_err());
    }

    fn gated_app() -> Router {
        let gate = RoleGate {
            required: vec![Role::Admin, Role::Moderator],
            fallback: "/login".to_string(),
        };
        Router::new()
            .route("/admin", get(|| async { "secret" }))
            .layer(from_fn_with_state(gate, require_roles))
    }

    async fn status_for(session: Option<&User>) -> http::StatusCode {
        let mut request = http::Request::builder().uri("/admin");
        if let Some(user) = session {
            request = request.header(SESSION_HEADER, encode_session(user).unwrap());
        }
        let response = gated_app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn gate_redirects_anonymous_viewers() {
        assert_eq!(status_for(None).await, http::StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn gate_redirects_members_without_a_gating_role() {
        let user = member(&[("r1", Role::User)]);
        assert_eq!(
            status_for(Some(&user)).await,
            http::StatusCode::TEMPORARY_REDIRECT
        );
    }

    #[tokio::test]
    async fn gate_admits_moderators() {
        let user = member(&[("r1", Role::Moderator)]);
        assert_eq!(status_for(Some(&user)).await, http::StatusCode::OK);
    }

    #[test]
    fn gate_config_skips_unknown_roles() {
        let settings = SessionSettings {
            login_redirect: "/signin".into(),
            admin_roles: vec!["admin".into(), "owner".into()],
            bootstrap_admin: None,
        };
        let gate = RoleGate::from_settings(&settings);
        assert_eq!(gate.required, vec![Role::Admin]);
        assert_eq!(gate.fallback, "/signin");
    }
}
