use diesel::result::DatabaseErrorKind;
use thiserror::Error;

/// Failures reported by a [`crate::store::Store`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("row not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => StoreError::NotFound,
            diesel::result::Error::DatabaseError(kind, info) => {
                let constraint = info.constraint_name().unwrap_or("unknown").to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => StoreError::UniqueViolation { constraint },
                    DatabaseErrorKind::CheckViolation => StoreError::CheckViolation { constraint },
                    DatabaseErrorKind::ForeignKeyViolation => {
                        StoreError::ForeignKeyViolation { constraint }
                    }
                    _ => StoreError::Database(info.message().to_string()),
                }
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(error: diesel::r2d2::PoolError) -> Self {
        StoreError::Pool(error.to_string())
    }
}

/// Outcome of a rejected domain operation.
///
/// Every variant except `Storage` is a recoverable, caller-facing result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Permission(String),

    #[error(transparent)]
    Storage(StoreError),
}

impl CoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn authentication_required() -> Self {
        CoreError::Permission("Authentication credentials were not provided".to_string())
    }
}

/// Constraint violations are remapped here so a lost race between a
/// pre-check and the insert surfaces as the same outcome the pre-check gives.
impl From<StoreError> for CoreError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { constraint } if constraint == SUBSCRIPTION_KEY => {
                CoreError::validation("author", ALREADY_SUBSCRIBED)
            }
            StoreError::UniqueViolation { constraint } => {
                CoreError::Conflict(conflict_message(&constraint).to_string())
            }
            StoreError::CheckViolation { constraint } => {
                let (field, message) = check_violation_field(&constraint);
                CoreError::validation(field, message)
            }
            StoreError::ForeignKeyViolation { .. } => {
                CoreError::NotFound("Referenced object does not exist".to_string())
            }
            StoreError::NotFound => CoreError::NotFound("Not found".to_string()),
            other => CoreError::Storage(other),
        }
    }
}

impl From<diesel::result::Error> for CoreError {
    fn from(error: diesel::result::Error) -> Self {
        StoreError::from(error).into()
    }
}

/// A repeated subscription is rejected as invalid input, not as a conflict.
pub(crate) const SUBSCRIPTION_KEY: &str = "subscriptions_user_author_key";
pub(crate) const ALREADY_SUBSCRIBED: &str = "Already subscribed to this author";

fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "favorites_user_recipe_key" => "Recipe is already in favorites",
        "shopping_cart_user_recipe_key" => "Recipe is already in the shopping cart",
        "users_email_key" => "A user with this email already exists",
        "users_username_key" => "A user with this username already exists",
        "tags_name_key" => "A tag with this name already exists",
        "tags_slug_key" => "A tag with this slug already exists",
        "recipe_ingredients_recipe_ingredient_key" => "Ingredients must be unique",
        _ => "Object already exists",
    }
}

fn check_violation_field(constraint: &str) -> (&'static str, &'static str) {
    match constraint {
        "prevent_self_follow" => ("author", "You cannot subscribe to yourself"),
        "recipe_ingredients_amount_positive" => ("ingredients", "Amount must be at least 1"),
        "recipes_cooking_time_positive" => ("cooking_time", "Cooking time must be at least 1"),
        _ => ("non_field_errors", "Invalid data"),
    }
}
