// Account storage in the auth database

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::DocumentStore;
use crate::auth::password::{Password, PasswordHash};
use crate::core::errors::StoreError;
use crate::core::models::{Document, Permissions, Role, SessionUser, UserRecord};

pub const USERS_COLLECTION: &str = "users";
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("static regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Why a signup was refused
#[derive(Error, Debug)]
pub enum SignupError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password shorter than 6 characters")]
    PasswordTooShort,
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Credentials for the admin account created on first start
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: SecretString,
}

impl BootstrapAdmin {
    /// Login email of the bootstrap account (`<username>@local`)
    pub fn email(&self) -> String {
        format!("{}@local", self.username.to_lowercase())
    }
}

/// Account lookup, signup and authentication over a `DocumentStore`
pub struct UserDirectory {
    store: Arc<dyn DocumentStore + Send + Sync>,
    auth_db: String,
    hash_iterations: u32,
    bootstrap: BootstrapAdmin,
    bootstrapped: AtomicBool,
}

fn filter(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn decode(doc: Document) -> Result<UserRecord, StoreError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| StoreError::Conversion(format!("malformed user record: {}", e)))
}

fn encode(record: &UserRecord) -> Result<Document, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Conversion("user record is not an object".to_string())),
        Err(e) => Err(StoreError::Conversion(e.to_string())),
    }
}

impl UserDirectory {
    pub fn new(
        store: Arc<dyn DocumentStore + Send + Sync>,
        auth_db: impl Into<String>,
        hash_iterations: u32,
        bootstrap: BootstrapAdmin,
    ) -> Self {
        Self {
            store,
            auth_db: auth_db.into(),
            hash_iterations,
            bootstrap,
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn auth_db(&self) -> &str {
        &self.auth_db
    }

    async fn find_one(&self, query: Document) -> Result<Option<UserRecord>, StoreError> {
        self.store
            .find_one(&self.auth_db, USERS_COLLECTION, query)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.find_one(filter(json!({ "email": email.trim().to_lowercase() })))
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.find_one(filter(json!({ "username": username }))).await
    }

    /// Current stored record behind a session, so permission changes apply immediately
    pub async fn find_for_session(&self, user: &SessionUser) -> Result<Option<UserRecord>, StoreError> {
        if let Some(email) = user.email.as_deref() {
            if let Some(record) = self.find_by_email(email).await? {
                return Ok(Some(record));
            }
        }
        match user.username.as_deref() {
            Some(username) => self.find_by_username(username).await,
            None => Ok(None),
        }
    }

    /// Register a `user`-role account identified by email
    pub async fn create_user_by_email(
        &self,
        email: &str,
        password: &Password,
    ) -> Result<UserRecord, SignupError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(SignupError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(SignupError::PasswordTooShort);
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(SignupError::EmailTaken);
        }

        let record = UserRecord {
            username: None,
            email: Some(email.clone()),
            password: PasswordHash::generate(password, self.hash_iterations).to_string(),
            role: Role::User,
            permissions: Permissions::standard(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.store
            .insert_one(&self.auth_db, USERS_COLLECTION, encode(&record)?)
            .await?;

        info!(email = %email, "Created user by email");
        Ok(record)
    }

    /// Check email + password; `None` on any mismatch.
    ///
    /// The bootstrap admin's `<username>@local` address is accepted even though
    /// it fails the public email pattern.
    pub async fn authenticate_by_email(
        &self,
        email: &str,
        password: &Password,
    ) -> Result<Option<UserRecord>, StoreError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) && email != self.bootstrap.email() {
            return Ok(None);
        }

        let Some(record) = self.find_by_email(&email).await? else {
            return Ok(None);
        };
        if !PasswordHash::from_stored(&record.password).verify(password) {
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Create the bootstrap admin unless an account with its username exists.
    ///
    /// Returns whether an account was created.
    pub async fn ensure_bootstrap_admin(&self) -> Result<bool, StoreError> {
        let username = self.bootstrap.username.clone();
        if self.find_by_username(&username).await?.is_some() {
            info!(username = %username, "Default user already exists");
            self.bootstrapped.store(true, Ordering::SeqCst);
            return Ok(false);
        }

        let password = Password::new(self.bootstrap.password.expose_secret());
        let record = UserRecord {
            username: Some(username.clone()),
            email: Some(self.bootstrap.email()),
            password: PasswordHash::generate(&password, self.hash_iterations).to_string(),
            role: Role::Admin,
            permissions: Permissions::standard(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        let id = self
            .store
            .insert_one(&self.auth_db, USERS_COLLECTION, encode(&record)?)
            .await?;

        self.bootstrapped.store(true, Ordering::SeqCst);
        info!(username = %username, id = %id, "Default admin user created");
        Ok(true)
    }

    /// Retry bootstrap if it has not succeeded yet (database was down at startup)
    pub async fn ensure_bootstrap_admin_once(&self) {
        if self.bootstrapped.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.ensure_bootstrap_admin().await {
            warn!(error = %e, "Default admin bootstrap failed, will retry on next login");
        }
    }
}
