// Cookie-backed server-side sessions

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::core::models::SessionUser;

pub const SESSION_COOKIE: &str = "mongo_admin_session";

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

/// Server-side session record
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub csrf_token: String,
    pub user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: random_token(),
            csrf_token: random_token(),
            user: None,
            flashes: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// 256 random bits, hex encoded
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

struct SessionSlot {
    session: Session,
    touched: bool,
    changed: bool,
}

/// Per-request handle to the caller's session
///
/// Inserted into request extensions by `session_middleware`; changes are
/// written back to the store once the handler has produced its response.
/// Requests that leave the session unchanged write nothing back.
#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<SessionSlot>>);

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(SessionSlot {
            session,
            touched: false,
            changed: false,
        })))
    }

    pub fn snapshot(&self) -> Session {
        self.0.lock().session.clone()
    }

    /// Whether anything read the CSRF token or changed the session
    pub fn is_touched(&self) -> bool {
        self.0.lock().touched
    }

    /// Whether the record itself changed (login, logout, flashes)
    pub fn is_changed(&self) -> bool {
        self.0.lock().changed
    }

    pub fn id(&self) -> String {
        self.0.lock().session.id.clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.0.lock().session.user.clone()
    }

    pub fn csrf_token(&self) -> String {
        let mut slot = self.0.lock();
        slot.touched = true;
        slot.session.csrf_token.clone()
    }

    /// Constant-time comparison with the session's CSRF token
    pub fn verify_csrf(&self, presented: &str) -> bool {
        let slot = self.0.lock();
        let expected = slot.session.csrf_token.as_bytes();
        !presented.is_empty() && bool::from(expected.ct_eq(presented.as_bytes()))
    }

    /// Attach `user` and rotate the session id and CSRF token
    pub fn login(&self, user: SessionUser) {
        let mut slot = self.0.lock();
        slot.session.id = random_token();
        slot.session.csrf_token = random_token();
        slot.session.user = Some(user);
        slot.touched = true;
        slot.changed = true;
    }

    /// Drop everything, including pending flashes, and start a fresh session
    pub fn logout(&self) {
        let mut slot = self.0.lock();
        slot.session = Session::new();
        slot.touched = true;
        slot.changed = true;
    }

    pub fn flash(&self, category: &str, message: impl Into<String>) {
        let mut slot = self.0.lock();
        slot.session.flashes.push(Flash {
            category: category.to_string(),
            message: message.into(),
        });
        slot.touched = true;
        slot.changed = true;
    }

    pub fn take_flashes(&self) -> Vec<Flash> {
        let mut slot = self.0.lock();
        if !slot.session.flashes.is_empty() {
            slot.touched = true;
            slot.changed = true;
        }
        std::mem::take(&mut slot.session.flashes)
    }
}

fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Load the caller's session from the cookie, run the request, then persist it.
///
/// Fresh sessions nobody used are not stored and get no cookie, so anonymous
/// health checks don't fill the session table. A changed id (login/logout)
/// evicts the old record and re-issues the cookie. Changes to an existing
/// session are only written if the session is still live, so a request that
/// overlaps a logout cannot bring the logged-out record back.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let existing = match cookie_id.as_deref() {
        Some(id) => match state.sessions.load(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Session lookup failed, starting a new session");
                None
            }
        },
        None => None,
    };
    let is_new = existing.is_none();

    let handle = SessionHandle::new(existing.unwrap_or_default());
    request.extensions_mut().insert(handle.clone());

    let response = next.run(request).await;

    if is_new && !handle.is_touched() {
        return response;
    }

    let session = handle.snapshot();
    let rotated = cookie_id.as_deref() != Some(session.id.as_str());
    if !is_new && !rotated && !handle.is_changed() {
        return response;
    }

    if !rotated {
        match state.sessions.update(session).await {
            Ok(true) => {}
            Ok(false) => debug!("Session ended during the request, dropping its changes"),
            Err(e) => warn!(error = %e, "Failed to persist session"),
        }
        return response;
    }

    if let Some(old) = cookie_id.as_deref() {
        if let Err(e) = state.sessions.remove(old).await {
            warn!(error = %e, "Failed to evict rotated session");
        }
    }
    let jar = jar.add(session_cookie(session.id.clone(), state.config.session_cookie_secure));
    if let Err(e) = state.sessions.save(session).await {
        warn!(error = %e, "Failed to persist session");
    }

    (jar, response).into_response()
}
