// Names, documents and paging limits

use mongo_admin::core::errors::AdminError;
use mongo_admin::core::pagination::{Page, PageParams, API_PAGE_SIZE, MAX_PAGE_SIZE};
use mongo_admin::core::validation::{
    parse_json_object, sanitize_collection_name, validate_collection_name, validate_db_name,
};

#[test]
fn test_namespaced_names_respect_length_limit() {
    let requested = "a".repeat(40);
    assert!(validate_db_name(&requested).is_ok());

    let namespaced = format!("ns_someone_example_com__{}", requested);
    assert!(matches!(
        validate_db_name(&namespaced),
        Err(AdminError::InvalidDbName(_))
    ));
}

#[test]
fn test_collection_names() {
    assert!(validate_collection_name("orders.2024").is_ok());
    assert!(validate_collection_name("system.users").is_err());
    assert!(validate_collection_name("has space").is_err());
    assert!(validate_collection_name("").is_err());
}

#[test]
fn test_sanitized_names_validate() {
    for raw in ["Q3 sales (final)", "..hidden", "übersicht"] {
        let name = sanitize_collection_name(raw);
        assert!(validate_collection_name(&name).is_ok(), "{} -> {}", raw, name);
    }
}

#[test]
fn test_editor_json() {
    let doc = parse_json_object(r#"{"a": 1, "b": {"c": [1, 2]}}"#).unwrap();
    assert_eq!(doc.len(), 2);
    assert!(parse_json_object("[1, 2]").is_err());
    assert!(parse_json_object("   ").is_err());
}

#[test]
fn test_page_limits() {
    let page = Page::from_params(
        &PageParams {
            page: Some(3),
            limit: Some(MAX_PAGE_SIZE as i64),
        },
        API_PAGE_SIZE,
    );
    assert_eq!(page.skip(), 200);
    assert_eq!(page.page_count(201), 3);

    let page = Page::from_params(
        &PageParams {
            page: Some(-4),
            limit: Some(MAX_PAGE_SIZE as i64 + 1),
        },
        API_PAGE_SIZE,
    );
    assert_eq!(page, Page { page: 1, limit: API_PAGE_SIZE });
}
