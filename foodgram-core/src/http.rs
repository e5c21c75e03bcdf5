//! Conversions an HTTP layer can return directly.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::catalog::{IngredientRecord, TagInput};
use crate::error::CoreError;
use crate::pagination::{PageParams, PaginationMetadata};
use crate::read_model::{IngredientLine, IngredientView, RecipeFull, RecipeSummary, TagView, UserProfile};
use crate::recipes::{IngredientAmount, ListRecipesResponse, RecipeFilter, RecipeInput};
use crate::shopping_list::{ShoppingListFile, ShoppingListItem};
use crate::subscriptions::{SubscribedAuthor, SubscriptionsResponse};
use crate::users::{ListUsersResponse, RegisterUser};

/// Error body returned for every rejected operation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// The offending input field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl CoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Permission(_) => StatusCode::FORBIDDEN,
            CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            CoreError::Validation { field, message } => ErrorResponse {
                error: message,
                field: Some(field),
            },
            CoreError::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    field: None,
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                field: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ShoppingListFile {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                ),
            ],
            self.content,
        )
            .into_response()
    }
}

/// Component schemas of every input, read model and error body.
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(components(schemas(
        ErrorResponse,
        PageParams,
        PaginationMetadata,
        TagView,
        TagInput,
        IngredientView,
        IngredientRecord,
        IngredientLine,
        IngredientAmount,
        RecipeInput,
        RecipeFilter,
        RecipeSummary,
        RecipeFull,
        ListRecipesResponse,
        UserProfile,
        RegisterUser,
        ListUsersResponse,
        SubscribedAuthor,
        SubscriptionsResponse,
        ShoppingListItem,
    )))]
    struct ApiDoc;

    ApiDoc::openapi()
}
