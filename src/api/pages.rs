// Server-rendered HTML pages

use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use minijinja::{context, Value};
use serde::Deserialize;
use tracing::{error, warn};

use crate::api::handlers::UploadForm;
use crate::api::responses::ApiError;
use crate::api::{AppState, FindOptions};
use crate::auth::audit_logger::{AuthEvent, ClientInfo};
use crate::auth::auth_middleware::{ensure_db_access, require_permission};
use crate::auth::password::Password;
use crate::auth::session::SessionHandle;
use crate::auth::user_store::SignupError;
use crate::core::errors::AdminError;
use crate::core::models::{Document, Permission, SessionUser};
use crate::core::pagination::{Page, PageParams, VIEW_PAGE_SIZE};
use crate::core::validation::{sanitize_collection_name, validate_collection_name, validate_db_name};
use crate::engine::{catalog, importer};

const CSRF_FAILED: &str = "Security validation failed. Please try again.";

/// Render `template` with the session's CSRF token, pending flashes and user
fn render(
    state: &AppState,
    session: &SessionHandle,
    user: Option<&SessionUser>,
    template: &str,
    extra: Value,
) -> Response {
    let user = user.map(|u| context! { name => u.display_name(), is_admin => u.is_admin() });
    let ctx = context! {
        csrf_token => session.csrf_token(),
        flashes => session.take_flashes(),
        user => user,
        ..extra
    };

    match state.views.render(template, ctx) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(template = %template, error = %e, "Template rendering failed");
            ApiError::from_admin_error(e).into_response()
        }
    }
}

fn flash_redirect(session: &SessionHandle, category: &str, message: impl Into<String>, to: &str) -> Response {
    session.flash(category, message);
    Redirect::to(to).into_response()
}

/// GET /
pub async fn index(Extension(session): Extension<SessionHandle>) -> Redirect {
    if session.user().is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
}

/// GET /login
pub async fn login_form(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Response {
    render(&app_state, &session, None, "login.html", context! {})
}

/// POST /login
pub async fn login_submit(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    if !session.verify_csrf(&form.csrf_token) {
        warn!("CSRF validation failed on login form");
        return flash_redirect(&session, "danger", CSRF_FAILED, "/login");
    }

    let client = ClientInfo::from_headers(&headers);
    let email = form.email.trim().to_lowercase();
    app_state.users.ensure_bootstrap_admin_once().await;

    match app_state
        .users
        .authenticate_by_email(&email, &Password::new(&form.password))
        .await
    {
        Ok(Some(record)) => {
            app_state
                .audit_logger
                .log_auth_event(AuthEvent::LoginSuccess, &email, &client);
            session.login(SessionUser::from_record(&record));
            flash_redirect(&session, "success", "Logged in successfully.", "/dashboard")
        }
        Ok(None) => {
            app_state.audit_logger.log_auth_event(
                AuthEvent::LoginFailure {
                    reason: "invalid credentials".to_string(),
                },
                &email,
                &client,
            );
            session.flash("danger", "Invalid credentials.");
            render(&app_state, &session, None, "login.html", context! { email => email })
        }
        Err(e) => {
            error!(error = %e, "User lookup failed during login");
            session.flash("danger", AdminError::from(e).user_message());
            render(&app_state, &session, None, "login.html", context! { email => email })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub csrf_token: String,
}

/// GET /signup
pub async fn signup_form(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Response {
    render(&app_state, &session, None, "signup.html", context! {})
}

/// POST /signup
pub async fn signup_submit(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Response {
    if !session.verify_csrf(&form.csrf_token) {
        warn!("CSRF validation failed on signup form");
        return flash_redirect(&session, "danger", CSRF_FAILED, "/signup");
    }

    let client = ClientInfo::from_headers(&headers);
    let email = form.email.trim().to_lowercase();

    if form.password != form.confirm_password {
        session.flash("danger", "Passwords do not match.");
        return render(&app_state, &session, None, "signup.html", context! { email => email });
    }

    match app_state
        .users
        .create_user_by_email(&email, &Password::new(&form.password))
        .await
    {
        Ok(_) => {
            app_state
                .audit_logger
                .log_auth_event(AuthEvent::SignupSuccess, &email, &client);
            flash_redirect(&session, "success", "Account created. Please log in.", "/login")
        }
        Err(e) => {
            app_state.audit_logger.log_auth_event(
                AuthEvent::SignupFailure {
                    reason: e.to_string(),
                },
                &email,
                &client,
            );
            let message = match e {
                SignupError::Store(store) => AdminError::from(store).user_message(),
                _ => "Signup failed. Ensure email is valid/unique and password length ≥ 6.".to_string(),
            };
            session.flash("danger", message);
            render(&app_state, &session, None, "signup.html", context! { email => email })
        }
    }
}

/// GET /logout
pub async fn logout(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    headers: HeaderMap,
) -> Response {
    if let Some(user) = session.user() {
        app_state.audit_logger.log_auth_event(
            AuthEvent::Logout,
            user.display_name(),
            &ClientInfo::from_headers(&headers),
        );
    }
    session.logout();
    flash_redirect(&session, "info", "Logged out.", "/login")
}

/// GET /dashboard
pub async fn dashboard(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<SessionUser>,
) -> Response {
    render(
        &app_state,
        &session,
        Some(&user),
        "dashboard.html",
        context! {
            namespace => user.namespace(),
            can_create_db => user.has_permission(Permission::CreateDatabase),
        },
    )
}

/// GET /collections/{db}
pub async fn collections(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(db_name): Path<String>,
) -> Response {
    if let Err(e) = validate_db_name(&db_name) {
        return flash_redirect(
            &session,
            "danger",
            format!("Invalid database name: {}", e.user_message()),
            "/dashboard",
        );
    }
    if ensure_db_access(&app_state, &user, &db_name, &ClientInfo::from_headers(&headers)).is_err() {
        return flash_redirect(
            &session,
            "danger",
            "You don't have permission to access this database.",
            "/dashboard",
        );
    }

    match app_state.store.list_collection_names(&db_name).await {
        Ok(collections) => render(
            &app_state,
            &session,
            Some(&user),
            "collections.html",
            context! { db_name => db_name, collections => collections },
        ),
        Err(e) => {
            error!(db = %db_name, error = %e, "Error listing collections");
            flash_redirect(
                &session,
                "danger",
                format!("Error accessing database: {}", e.user_message()),
                "/dashboard",
            )
        }
    }
}

/// GET /data/{db}/{collection}?page=&limit=
pub async fn data_view(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path((db_name, collection_name)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Response {
    if let Err(e) = validate_db_name(&db_name) {
        return flash_redirect(
            &session,
            "danger",
            format!("Invalid database name: {}", e.user_message()),
            "/dashboard",
        );
    }
    let collections_page = format!("/collections/{}", db_name);
    if let Err(e) = validate_collection_name(&collection_name) {
        return flash_redirect(
            &session,
            "danger",
            format!("Invalid collection name: {}", e.user_message()),
            &collections_page,
        );
    }
    if ensure_db_access(&app_state, &user, &db_name, &ClientInfo::from_headers(&headers)).is_err() {
        return flash_redirect(
            &session,
            "danger",
            "You don't have permission to access this database.",
            "/dashboard",
        );
    }

    let page = Page::from_params(&params, VIEW_PAGE_SIZE);
    let options = FindOptions {
        skip: page.skip(),
        limit: Some(page.limit),
        include_id: true,
    };
    let loaded = async {
        let docs = app_state
            .store
            .find(&db_name, &collection_name, Document::new(), options)
            .await?;
        let total = app_state
            .store
            .count_documents(&db_name, &collection_name, Document::new())
            .await?;
        Ok::<_, AdminError>((docs, total))
    }
    .await;

    match loaded {
        Ok((documents, total)) => render(
            &app_state,
            &session,
            Some(&user),
            "data_view.html",
            context! {
                db_name => db_name,
                collection_name => collection_name,
                documents => documents,
                page => page.page,
                limit => page.limit,
                total => total,
                pages => page.page_count(total),
            },
        ),
        Err(e) => {
            error!(db = %db_name, collection = %collection_name, error = %e, "Error accessing collection");
            flash_redirect(
                &session,
                "danger",
                format!("Error accessing collection: {}", e.user_message()),
                &collections_page,
            )
        }
    }
}

/// GET /upload
pub async fn upload_form(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<SessionUser>,
) -> Response {
    let databases = match catalog::list_visible_databases(app_state.store.as_ref(), &user).await {
        Ok(databases) => databases,
        Err(e) => {
            warn!(error = %e, "Could not list databases for upload form");
            session.flash("danger", e.user_message());
            Vec::new()
        }
    };
    render(
        &app_state,
        &session,
        Some(&user),
        "upload.html",
        context! { databases => databases },
    )
}

/// POST /upload
///
/// The `preview` action stores the file and shows its first rows; `import`
/// inserts either that stored file (`file_token`) or a fresh upload.
pub async fn upload_submit(
    State(app_state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return flash_redirect(&session, "danger", e.user_message(), "/upload"),
    };
    if !session.verify_csrf(form.csrf_token.as_deref().unwrap_or_default()) {
        warn!("CSRF validation failed on upload form");
        return flash_redirect(&session, "danger", CSRF_FAILED, "/upload");
    }

    match process_upload(&app_state, &session, &user, &headers, form).await {
        Ok(response) => response,
        Err(e) => flash_redirect(&session, "danger", e.user_message(), "/upload"),
    }
}

async fn process_upload(
    state: &AppState,
    session: &SessionHandle,
    user: &SessionUser,
    headers: &HeaderMap,
    form: UploadForm,
) -> Result<Response, AdminError> {
    let client = ClientInfo::from_headers(headers);
    require_permission(state, user, Permission::Import, &client)?;

    let (token, filename) = match (form.file_token, form.file) {
        (Some(token), _) if form.import => (token, None),
        (_, Some((filename, bytes))) => (state.uploads.save(&filename, &bytes).await?, Some(filename)),
        _ => {
            return Err(AdminError::InvalidUpload(
                "Please upload a valid Excel or CSV file.".to_string(),
            ))
        }
    };

    let db_name = form
        .db_name
        .ok_or_else(|| AdminError::MissingParameters("Please choose a database.".to_string()))?;
    let collection_name = match (form.collection_name, filename) {
        (Some(name), _) => name,
        (None, Some(filename)) => default_collection_name(&filename),
        (None, None) => {
            return Err(AdminError::MissingParameters(
                "Collection name is required".to_string(),
            ))
        }
    };
    validate_db_name(&db_name)?;
    validate_collection_name(&collection_name)?;
    ensure_db_access(state, user, &db_name, &client)?;

    if form.import {
        let inserted = importer::import_upload(
            state.store.as_ref(),
            &state.uploads,
            &token,
            &db_name,
            &collection_name,
        )
        .await?;
        session.flash(
            "success",
            format!("Inserted {} documents into {}.{}", inserted, db_name, collection_name),
        );
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let path = state.uploads.resolve(&token).await?;
    let sheet = importer::read_spreadsheet(path).await?;
    Ok(render(
        state,
        session,
        Some(user),
        "upload.html",
        context! {
            headers => sheet.headers,
            preview => sheet.preview(),
            row_count => sheet.rows.len(),
            file_token => token,
            db_name => db_name,
            collection_name => collection_name,
        },
    ))
}

/// Collection name used when the form leaves it blank: the file's stem
fn default_collection_name(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match sanitize_collection_name(stem) {
        name if name.is_empty() => "import".to_string(),
        name => name,
    }
}
