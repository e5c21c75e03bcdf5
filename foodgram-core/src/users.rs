//! User registration and profiles.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::CoreError;
use crate::models::NewUser;
use crate::pagination::{Page, PaginationMetadata};
use crate::read_model::{user_profile, user_profiles, UserProfile};
use crate::store::Store;

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserProfile>,
    pub pagination: PaginationMetadata,
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "This field is required"));
    }
    if value.chars().count() > max {
        return Err(CoreError::validation(
            field,
            format!("Must be at most {} characters", max),
        ));
    }
    Ok(())
}

fn validate(input: &RegisterUser) -> Result<(), CoreError> {
    check_length("username", &input.username, MAX_USERNAME_LENGTH)?;
    let allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);
    if !input.username.chars().all(allowed) {
        return Err(CoreError::validation(
            "username",
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }

    check_length("email", &input.email, MAX_EMAIL_LENGTH)?;
    match input.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(CoreError::validation("email", "Enter a valid email address")),
    }

    check_length("first_name", &input.first_name, MAX_NAME_LENGTH)?;
    check_length("last_name", &input.last_name, MAX_NAME_LENGTH)?;
    Ok(())
}

fn create<S: Store>(
    store: &mut S,
    input: &RegisterUser,
    is_staff: bool,
) -> Result<UserProfile, CoreError> {
    validate(input)?;

    let user = store.transaction(|store| {
        Ok(store.insert_user(&NewUser {
            email: input.email.trim(),
            username: &input.username,
            first_name: input.first_name.trim(),
            last_name: input.last_name.trim(),
            is_staff,
        })?)
    })?;

    info!(user_id = user.id, username = %user.username, is_staff, "User registered");
    Ok(UserProfile::new(&user, false))
}

pub fn register_user<S: Store>(
    store: &mut S,
    input: &RegisterUser,
) -> Result<UserProfile, CoreError> {
    create(store, input, false)
}

/// Registers a user with administrative rights. Operator use only.
pub fn register_staff_user<S: Store>(
    store: &mut S,
    input: &RegisterUser,
) -> Result<UserProfile, CoreError> {
    create(store, input, true)
}

pub fn get_user<S: Store>(
    store: &mut S,
    actor: &Actor,
    user_id: i32,
) -> Result<UserProfile, CoreError> {
    let user = store
        .find_user(user_id)?
        .ok_or_else(|| CoreError::NotFound("User not found".to_string()))?;
    user_profile(store, actor, &user)
}

pub fn list_users<S: Store>(
    store: &mut S,
    actor: &Actor,
    page: Page,
) -> Result<ListUsersResponse, CoreError> {
    let (users, total) = store.list_users(page)?;
    debug!(total, "Listed users");
    Ok(ListUsersResponse {
        users: user_profiles(store, actor, &users)?,
        pagination: PaginationMetadata::new(total, page),
    })
}
