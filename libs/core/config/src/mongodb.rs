use crate::{env_or_default, env_required, ConfigError, FromEnv};

/// MongoDB connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub app_name: Option<String>,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: None,
        }
    }
}

impl FromEnv for MongoConfig {
    /// Requires `MONGO_URI`. `MONGO_DATABASE` defaults to `products`.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            uri: env_required("MONGO_URI")?,
            database: env_or_default("MONGO_DATABASE", "products"),
            app_name: std::env::var("MONGO_APP_NAME").ok(),
        })
    }
}
