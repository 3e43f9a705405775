// Per-user database namespaces for tenant isolation

use regex::Regex;
use std::sync::LazyLock;

use crate::core::models::SessionUser;

/// Databases never shown in listings
pub const HIDDEN_DATABASES: &[&str] = &["local"];

const DEFAULT_NAMESPACE: &str = "ns_default__";

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9]+").expect("static regex")
});

/// Namespace prefix derived from an account's email (or legacy username).
///
/// `Bob.Smith@Example.com` becomes `ns_bob_smith_example_com__`.
pub fn user_namespace(identity: &str) -> String {
    if identity.is_empty() {
        return DEFAULT_NAMESPACE.to_string();
    }
    let lowered = identity.to_lowercase();
    let safe = NON_ALPHANUMERIC.replace_all(&lowered, "_");
    format!("ns_{}__", safe)
}

/// Prefix `name` with `namespace` unless it already carries it
pub fn apply_namespace(namespace: &str, name: &str) -> String {
    if name.starts_with(namespace) {
        name.to_string()
    } else {
        format!("{}{}", namespace, name)
    }
}

/// Admins reach every database; everyone else only their own namespace.
pub fn can_access(user: &SessionUser, db_name: &str) -> bool {
    if user.is_admin() {
        return true;
    }
    db_name.starts_with(&user.namespace())
}

/// Narrow a raw database listing to what `user` may see
pub fn visible_databases(user: &SessionUser, all: Vec<String>) -> Vec<String> {
    all.into_iter()
        .filter(|name| !HIDDEN_DATABASES.contains(&name.as_str()))
        .filter(|name| can_access(user, name))
        .collect()
}
