//! Domain models for the admin service.
//!
//! Accounts, permissions, request payloads and dashboard aggregates. Nothing
//! in here performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::namespace;

/// A schema-free document as exchanged with the store and over HTTP
pub type Document = Map<String, Value>;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// `"*"` or an explicit list of resource names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessScope {
    Names(Vec<String>),
    Pattern(String),
}

impl AccessScope {
    pub fn all() -> Self {
        AccessScope::Pattern("*".to_string())
    }

    pub fn allows(&self, name: &str) -> bool {
        match self {
            AccessScope::Pattern(p) => p == "*" || p == name,
            AccessScope::Names(names) => names.iter().any(|n| n == name),
        }
    }
}

impl Default for AccessScope {
    fn default() -> Self {
        AccessScope::Names(Vec::new())
    }
}

/// Per-account permission flags, stored alongside the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Permissions {
    #[serde(default)]
    pub databases: AccessScope,
    #[serde(default)]
    pub collections: AccessScope,
    #[serde(default)]
    pub can_create_db: bool,
    #[serde(default)]
    pub can_delete_db: bool,
    #[serde(default)]
    pub can_create_collection: bool,
    #[serde(default)]
    pub can_delete_collection: bool,
    #[serde(default)]
    pub can_import: bool,
    #[serde(default)]
    pub can_export: bool,
}

impl Permissions {
    /// Permission set granted to self-service signups and the bootstrap admin.
    /// Database visibility is narrowed by namespace at runtime.
    pub fn standard() -> Self {
        Self {
            databases: AccessScope::all(),
            collections: AccessScope::all(),
            can_create_db: true,
            can_delete_db: false,
            can_create_collection: true,
            can_delete_collection: true,
            can_import: true,
            can_export: true,
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::CreateDatabase => self.can_create_db,
            Permission::DeleteDatabase => self.can_delete_db,
            Permission::CreateCollection => self.can_create_collection,
            Permission::DeleteCollection => self.can_delete_collection,
            Permission::Import => self.can_import,
            Permission::Export => self.can_export,
        }
    }
}

/// Action-level permissions checked by handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CreateDatabase,
    DeleteDatabase,
    CreateCollection,
    DeleteCollection,
    Import,
    Export,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateDatabase => "can_create_db",
            Permission::DeleteDatabase => "can_delete_db",
            Permission::CreateCollection => "can_create_collection",
            Permission::DeleteCollection => "can_delete_collection",
            Permission::Import => "can_import",
            Permission::Export => "can_export",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account as persisted in the `users` collection of the auth database
///
/// The password field holds a salted hash, never the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The identity carried in a logged-in session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Role,
    pub permissions: Permissions,
}

impl SessionUser {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            email: record.email.clone(),
            username: record.username.clone(),
            role: record.role,
            permissions: record.permissions.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name shown in the UI and written to logs
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("unknown")
    }

    /// Namespace prefix for databases this user creates
    pub fn namespace(&self) -> String {
        let identity = self.email.as_deref().or(self.username.as_deref()).unwrap_or("");
        namespace::user_namespace(identity)
    }

    /// Admins pass every check; other users need the flag set.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.allows(permission)
    }

    pub fn can_access_database(&self, db_name: &str) -> bool {
        namespace::can_access(self, db_name)
    }
}

/// POST /api/databases
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDatabaseRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /api/collection/{add,create,delete}
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionRequest {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

/// POST /api/document/add
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsertDocumentRequest {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// POST /api/document/update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub query: Option<Document>,
    #[serde(default)]
    pub new_values: Option<Document>,
}

/// POST /api/document/delete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteDocumentRequest {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub query: Option<Document>,
}

/// Per-database line of the dashboard overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseOverview {
    pub db: String,
    pub collections: u64,
    pub documents: u64,
}

/// Aggregate counts shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Overview {
    pub databases: u64,
    pub collections: u64,
    pub documents: u64,
    pub per_db: Vec<DatabaseOverview>,
}
