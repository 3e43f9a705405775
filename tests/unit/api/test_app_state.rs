// Compile-time guarantees for shared state

use mongo_admin::api::{AppState, DocumentStore, FindOptions, SessionStore};
use mongo_admin::state::{MemoryStore, MokaSessionStore, MongoStore};
use static_assertions::{assert_impl_all, assert_obj_safe};
use tempfile::TempDir;

use crate::common::create_test_app_state;

assert_impl_all!(AppState: Clone, Send, Sync);
assert_impl_all!(MemoryStore: DocumentStore, Send, Sync);
assert_impl_all!(MongoStore: DocumentStore, Send, Sync);
assert_impl_all!(MokaSessionStore: SessionStore, Send, Sync);
assert_obj_safe!(DocumentStore);
assert_obj_safe!(SessionStore);

#[test]
fn test_find_options_default_keeps_ids() {
    let options = FindOptions::default();
    assert_eq!(options.skip, 0);
    assert_eq!(options.limit, None);
    assert!(options.include_id);
}

#[test]
fn test_app_state_clones_share_components() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());
    let cloned = state.clone();

    assert!(std::sync::Arc::ptr_eq(&state.users, &cloned.users));
    assert!(std::sync::Arc::ptr_eq(&state.config, &cloned.config));
    assert_eq!(cloned.uploads.root(), dir.path());
}
