//! Domain core of a recipe-sharing service: recipes with tagged
//! ingredients, favorites, shopping carts, author subscriptions and the
//! aggregated shopping list.
//!
//! Every operation takes the acting [`Actor`] explicitly and a [`Store`]
//! to persist through. Errors are [`CoreError`]s, which convert into HTTP
//! responses via axum's `IntoResponse`.

pub mod actor;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod raw_sql;
pub mod read_model;
pub mod recipes;
pub mod relations;
pub mod schema;
pub mod shopping_list;
pub mod store;
pub mod subscriptions;
pub mod users;

pub use actor::Actor;
pub use config::{Config, ConfigError};
pub use error::{CoreError, StoreError};
pub use store::{MemoryStore, Store};
