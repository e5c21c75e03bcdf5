//! Configuration from environment variables.

use std::env;
use thiserror::Error;

use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::subscriptions::DEFAULT_FEED_RECIPES_LIMIT;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Page size used when a listing doesn't ask for one.
    pub page_size: i64,
    /// Recipes shown per author in the subscription feed by default.
    pub feed_recipes_limit: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional:
    /// - `FOODGRAM_PAGE_SIZE`: Default page size (default: 6)
    /// - `FOODGRAM_FEED_RECIPES_LIMIT`: Recipes per followed author (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        Ok(Self {
            database_url,
            page_size: positive_var("FOODGRAM_PAGE_SIZE").unwrap_or(DEFAULT_PAGE_SIZE),
            feed_recipes_limit: positive_var("FOODGRAM_FEED_RECIPES_LIMIT")
                .unwrap_or(DEFAULT_FEED_RECIPES_LIMIT),
        })
    }
}

fn positive_var(name: &str) -> Option<i64> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &i64| *v > 0)
}
