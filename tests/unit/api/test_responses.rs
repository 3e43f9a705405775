// Error-to-HTTP mapping

use axum::http::StatusCode;
use axum::response::IntoResponse;
use mongo_admin::api::responses::ApiError;
use mongo_admin::core::errors::{AdminError, StoreError};

use crate::common::body_json;

#[test]
fn test_status_codes() {
    let cases = [
        (AdminError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
        (AdminError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (AdminError::EmptyUpdate, StatusCode::BAD_REQUEST),
        (AdminError::CsrfMismatch, StatusCode::BAD_REQUEST),
        (AdminError::NotFound, StatusCode::NOT_FOUND),
        (AdminError::Render("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            AdminError::Store(StoreError::Unavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
        (
            AdminError::Store(StoreError::OperationFailed("x".into())),
            StatusCode::BAD_REQUEST,
        ),
    ];
    for (err, status) in cases {
        let label = err.to_string();
        assert_eq!(ApiError::from(err).status, status, "{}", label);
    }
}

#[test]
fn test_internal_errors_hide_detail() {
    let err: ApiError =
        AdminError::Io(std::io::Error::other("/var/uploads/secret.csv: denied")).into();
    assert_eq!(err.error, "internal_error");
    assert!(!err.message.contains("secret"));

    let err: ApiError = StoreError::AuthenticationFailed("bad password for root".into()).into();
    assert!(!err.message.contains("root"));
}

#[test]
fn test_operation_failure_echoes_reason() {
    let err: ApiError =
        StoreError::OperationFailed("Collection shop.orders already exists.".into()).into();
    assert_eq!(err.message, "Collection shop.orders already exists.");
}

#[tokio::test]
async fn test_error_body_shape() {
    let response = ApiError::from(AdminError::MissingQuery("Delete query is required".into()))
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_query");
    assert_eq!(body["message"], "Delete query is required");
    assert_eq!(body["error_id"].as_str().map(str::len), Some(8));
}
