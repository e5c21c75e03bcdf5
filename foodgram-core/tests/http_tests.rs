//! Responses produced at the HTTP boundary.

use axum::body::to_bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use foodgram_core::shopping_list::{ShoppingListFile, SHOPPING_LIST_FILENAME};
use foodgram_core::{CoreError, StoreError};
use serde_json::Value;

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn validation_error_names_the_field() {
    let response = CoreError::validation("ingredients", "Ingredients must be unique").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Ingredients must be unique");
    assert_eq!(body["field"], "ingredients");
}

#[tokio::test]
async fn error_kinds_map_to_status_codes() {
    let cases = [
        (CoreError::Conflict("dup".to_string()), StatusCode::CONFLICT),
        (CoreError::NotFound("gone".to_string()), StatusCode::NOT_FOUND),
        (CoreError::Permission("no".to_string()), StatusCode::FORBIDDEN),
    ];
    for (error, status) in cases {
        let message = error.to_string();
        let response = error.into_response();
        assert_eq!(response.status(), status);
        let body = json_body(response).await;
        assert_eq!(body["error"], message.as_str());
        assert!(body.get("field").is_none());
    }
}

#[tokio::test]
async fn storage_errors_are_not_leaked() {
    let response =
        CoreError::Storage(StoreError::Database("relation does not exist".to_string())).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn shopping_list_is_a_text_attachment() {
    let file = ShoppingListFile {
        filename: SHOPPING_LIST_FILENAME,
        content: "egg. Amount: 2 pcs.\nflour. Amount: 300 g.".to_string(),
    };
    let response = file.into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"shopping-list.txt\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"egg. Amount: 2 pcs.\nflour. Amount: 300 g.");
}
