// Axum login, CSRF and permission guards

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;

use crate::api::responses::ApiError;
use crate::api::AppState;
use crate::auth::audit_logger::{AuthEvent, ClientInfo};
use crate::auth::session::SessionHandle;
use crate::core::errors::AdminError;
use crate::core::models::{Permission, SessionUser};

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// The account behind `user` as stored right now; `None` once it is deleted
async fn current_user(state: &AppState, user: &SessionUser) -> Result<Option<SessionUser>, AdminError> {
    let record = state.users.find_for_session(user).await?;
    Ok(record.map(|r| SessionUser::from_record(&r)))
}

/// Login guard for `/api` routes
///
/// Puts the logged-in account, re-read from the user store so role and
/// permission changes apply at once, into request extensions. Answers 401
/// JSON when there is no login or the account is gone.
pub async fn require_api_login(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let cached = request
        .extensions()
        .get::<SessionHandle>()
        .and_then(|s| s.user());
    let Some(cached) = cached else {
        return ApiError::from_admin_error(AdminError::Unauthorized(
            "Authentication required".to_string(),
        ))
        .into_response();
    };

    match current_user(&state, &cached).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => ApiError::from_admin_error(AdminError::Unauthorized("User not found".to_string()))
            .into_response(),
        Err(e) => ApiError::from_admin_error(e).into_response(),
    }
}

/// Login guard for HTML pages; anonymous callers are sent to `/login`
pub async fn require_page_login(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<SessionHandle>().cloned() else {
        return Redirect::to("/login").into_response();
    };
    let Some(cached) = session.user() else {
        session.flash("warning", "Please log in to access this page.");
        return Redirect::to("/login").into_response();
    };

    match current_user(&state, &cached).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            session.logout();
            session.flash("warning", "Please log in to access this page.");
            Redirect::to("/login").into_response()
        }
        Err(e) => ApiError::from_admin_error(e).into_response(),
    }
}

/// Reject state-changing API calls whose `X-CSRFToken` header does not
/// match the session token.
pub async fn csrf_protect(request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let presented = extract_csrf_header(request.headers()).unwrap_or_default();
    let valid = request
        .extensions()
        .get::<SessionHandle>()
        .map(|s| s.verify_csrf(&presented))
        .unwrap_or(false);

    if !valid {
        warn!(path = %request.uri().path(), "CSRF token missing or invalid");
        return ApiError::from_admin_error(AdminError::CsrfMismatch).into_response();
    }
    next.run(request).await
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn extract_csrf_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Check `permission` for the caller, logging denials.
///
/// `user` is the identity the login guards refreshed for this request.
pub fn require_permission(
    state: &AppState,
    user: &SessionUser,
    permission: Permission,
    client: &ClientInfo,
) -> Result<(), AdminError> {
    if user.has_permission(permission) {
        return Ok(());
    }
    state.audit_logger.log_auth_event(
        AuthEvent::PermissionDenied {
            permission: permission.to_string(),
        },
        user.display_name(),
        client,
    );
    Err(AdminError::Forbidden(format!(
        "Permission denied: {} required",
        permission
    )))
}

/// Namespace check for any database-scoped operation
pub fn ensure_db_access(
    state: &AppState,
    user: &SessionUser,
    db_name: &str,
    client: &ClientInfo,
) -> Result<(), AdminError> {
    if user.can_access_database(db_name) {
        return Ok(());
    }
    state.audit_logger.log_auth_event(
        AuthEvent::DatabaseAccessDenied {
            database: db_name.to_string(),
        },
        user.display_name(),
        client,
    );
    Err(AdminError::Forbidden(
        "Access denied to this database".to_string(),
    ))
}
