use super::error::{ApiError, ApiResult};
use super::http_layers::{throttled, ClientIpKeyExtractor};
use super::metrics::record_login_attempt;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::user::auth::{AuthToken, AuthTokenValue};

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Deserialize)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    expiry: String,
}

fn session_cookie(token: &AuthToken) -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION_TOKEN_KEY, token.value.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(time::OffsetDateTime::from(token.expires))
        .build()
}

/// The token in the body and in the session cookie.
fn token_response(token: &AuthToken) -> Response {
    let body = LoginSuccessResponse {
        token: token.value.0.clone(),
        expiry: DateTime::<Utc>::from(token.expires).to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    (
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(token).to_string())],
        Json(body),
    )
        .into_response()
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Response> {
    debug!("login() called for {}", body.user_handle);
    let start = Instant::now();
    let result = user_manager
        .lock()
        .unwrap()
        .login(&body.user_handle, &body.password);

    match result {
        Ok(Some(token)) => {
            record_login_attempt("success", start.elapsed());
            info!("User {} logged in", body.user_handle);
            Ok(token_response(&token))
        }
        Ok(None) => {
            record_login_attempt("failure", start.elapsed());
            Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password.",
            ))
        }
        Err(err) => {
            record_login_attempt("error", start.elapsed());
            Err(err.into())
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    let locked_manager = user_manager.lock().unwrap();
    match locked_manager.delete_auth_token(session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie_value = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
                .same_site(SameSite::Lax)
                .build();

            (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie_value.to_string())],
            )
                .into_response()
        }
        Err(err) => {
            debug!("Logout failed: {}", err);
            ApiError::bad_request("Could not log out.").into_response()
        }
    }
}

async fn anonymous_login(State(state): State<ServerState>) -> ApiResult<Response> {
    let Some(handle) = state.config.service_account.as_deref() else {
        error!("Anonymous login requested but no service account is configured");
        return Err(ApiError::internal("Service account not configured"));
    };

    let user_manager = state.user_manager.lock().unwrap();
    let user_id = user_manager.get_or_create_service_account(handle)?;
    match user_manager.prune_expired_auth_tokens_of(user_id) {
        Ok(0) => {}
        Ok(count) => debug!("Pruned {} expired tokens of service account {}", count, handle),
        Err(err) => warn!("Could not prune tokens of service account {}: {}", handle, err),
    }
    let token = user_manager.generate_auth_token(user_id)?;
    debug!("Issued anonymous token for service account {}", handle);
    Ok(token_response(&token))
}

/// Login and anonymous-login are limited per client IP, logout is not.
pub fn make_auth_routes(state: ServerState) -> Result<Router> {
    let login_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/anonymous-login", post(anonymous_login))
        .with_state(state.clone());
    let login_routes = throttled(
        login_routes,
        ClientIpKeyExtractor,
        state.config.login_per_minute,
        "login",
    )?;

    Ok(Router::new()
        .route("/logout", get(logout).post(logout))
        .with_state(state)
        .merge(login_routes))
}
