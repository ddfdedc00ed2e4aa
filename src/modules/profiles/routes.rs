use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use pawclub_authz::{is_moderator, Role};
use pawclub_http::AppError;

use super::models::UserPatch;
use super::repository::{ProfileError, ProfileRepository};
use crate::session::{require_roles, Authenticated, RoleGate};

#[derive(Clone)]
pub struct ProfilesState {
    pub repo: ProfileRepository,
}

/// Profile routes plus the role-gated administration subtree.
pub fn router(state: ProfilesState, gate: RoleGate) -> Router {
    let admin = Router::new()
        .route("/", get(list_admins))
        .route("/{user_id}/roles", post(grant_roles))
        .route("/{user_id}/roles", delete(revoke_roles))
        .layer(from_fn_with_state(gate, require_roles));

    Router::new()
        .route("/me", get(get_me).post(post_me))
        .route("/{user_id}", get(get_profile))
        .route("/{user_id}", put(put_profile))
        .nest("/admin", admin)
        .with_state(state)
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        let message = err.to_string();
        match err {
            ProfileError::NotFound(_) => AppError::not_found(message),
            ProfileError::Store(store_err) => match store_err {
                pawclub_store::StoreError::InvalidPath(_) => {
                    AppError::bad_request(store_err.to_string())
                }
                other => AppError::Internal(anyhow::Error::new(other)),
            },
            ProfileError::Encoding(encoding_err) => {
                AppError::Internal(anyhow::Error::new(encoding_err))
            }
        }
    }
}

/// The viewer's profile: the stored record when present, otherwise the
/// session copy (a first visit before `POST /me` has synced it).
async fn get_me(
    State(state): State<ProfilesState>,
    Authenticated(session_user): Authenticated,
) -> Result<impl IntoResponse, AppError> {
    match state.repo.get_user(&session_user.id).await? {
        Some(user) => Ok(Json(user)),
        None => Ok(Json(session_user)),
    }
}

/// Sync the session user into the store, typically right after login.
async fn post_me(
    State(state): State<ProfilesState>,
    Authenticated(session_user): Authenticated,
) -> Result<impl IntoResponse, AppError> {
    state.repo.upsert_user(&session_user).await?;
    let user = state
        .repo
        .get_user(&session_user.id)
        .await?
        .unwrap_or(session_user);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_profile(
    State(state): State<ProfilesState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.repo.get_user(&user_id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found(format!("user {user_id:?} not found"))),
    }
}

/// Members edit their own profile; moderators may edit anyone's.
async fn put_profile(
    State(state): State<ProfilesState>,
    Path(user_id): Path<String>,
    Authenticated(viewer): Authenticated,
    Json(patch): Json<UserPatch>,
) -> Result<impl IntoResponse, AppError> {
    if viewer.id != user_id && !is_moderator(&viewer.roles) {
        return Err(AppError::forbidden("you may only edit your own profile"));
    }
    state.repo.update_user(&user_id, &patch).await?;
    match state.repo.get_user(&user_id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found(format!("user {user_id:?} not found"))),
    }
}

async fn list_admins(
    State(state): State<ProfilesState>,
) -> Result<impl IntoResponse, AppError> {
    let admins = state.repo.list_admins().await?;
    Ok(Json(admins))
}

#[derive(Debug, Deserialize)]
struct GrantRolesBody {
    roles: Vec<Role>,
}

async fn grant_roles(
    State(state): State<ProfilesState>,
    Path(user_id): Path<String>,
    Json(body): Json<GrantRolesBody>,
) -> Result<impl IntoResponse, AppError> {
    if body.roles.is_empty() {
        return Err(AppError::validation(
            vec![json!({"field": "roles", "error": "empty"})],
            "at least one role is required",
        ));
    }
    let entries = state.repo.assign_roles(&user_id, &body.roles).await?;
    Ok((StatusCode::CREATED, Json(json!({ "entries": entries }))))
}

async fn revoke_roles(
    State(state): State<ProfilesState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.repo.remove_all_roles(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{self, Request};
    use pawclub_authz::RoleMap;
    use pawclub_store::{MemoryStore, PathStore};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::modules::profiles::models::User;
    use crate::session::{encode_session, SESSION_HEADER};

    fn app() -> (Router, Arc<dyn PathStore>) {
        let store: Arc<dyn PathStore> = Arc::new(MemoryStore::new());
        let state = ProfilesState {
            repo: ProfileRepository::new(store.clone()),
        };
        let gate = RoleGate {
            required: vec![Role::Admin, Role::Moderator],
            fallback: "/login".into(),
        };
        (router(state, gate), store)
    }

    fn session_for(id: &str, roles: &[(&str, Role)]) -> String {
        encode_session(&User {
            id: id.into(),
            display_name: "Ada".into(),
            email: "ada@club.example".into(),
            avatar_url: None,
            roles: roles
                .iter()
                .map(|(entry, role)| (entry.to_string(), *role))
                .collect::<RoleMap>(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn me_requires_a_session() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_me_syncs_the_profile() {
        let (app, store) = app();
        let blob = session_for("u1", &[]);

        let request = Request::builder()
            .method(http::Method::POST)
            .uri("/me")
            .header(SESSION_HEADER, &blob)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::CREATED);

        let stored = store.get("users/u1").await.unwrap().unwrap();
        assert_eq!(stored["display_name"], "Ada");
    }

    #[tokio::test]
    async fn members_cannot_edit_other_profiles() {
        let (app, store) = app();
        store
            .set(
                "users/u2",
                serde_json::json!({
                    "id": "u2", "display_name": "Grace", "email": "grace@club.example"
                }),
            )
            .await
            .unwrap();

        let blob = session_for("u1", &[("r1", Role::User)]);
        let request = Request::builder()
            .method(http::Method::PUT)
            .uri("/u2")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(SESSION_HEADER, &blob)
            .body(Body::from(
                serde_json::json!({"display_name": "Hacked"}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn role_administration_is_gated() {
        let (app, _) = app();

        let anonymous = Request::builder()
            .uri("/admin")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::TEMPORARY_REDIRECT);

        let blob = session_for("boss", &[("r1", Role::Admin)]);
        let request = Request::builder()
            .method(http::Method::POST)
            .uri("/admin/u2/roles")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(SESSION_HEADER, &blob)
            .body(Body::from(
                serde_json::json!({"roles": ["moderator"]}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::CREATED);
    }
}
