//! Runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Request
//! handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_DATABASE_NAME, DEFAULT_REST_ADDR};
use crate::{CoreError, CoreResult};
use std::time::Duration;

/// Which resource store backs the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store; contents are lost on restart.
    Memory,
    /// MongoDB document store.
    Mongo { uri: String, database: String },
}

/// Application configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    rest_addr: String,
    store: StoreBackend,
    request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Create a new `AppConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the listen address is blank.
    pub fn new(
        rest_addr: String,
        store: StoreBackend,
        request_timeout: Option<Duration>,
    ) -> CoreResult<Self> {
        if rest_addr.trim().is_empty() {
            return Err(CoreError::Config("REST address cannot be empty".into()));
        }

        Ok(Self {
            rest_addr,
            store,
            request_timeout,
        })
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn store(&self) -> &StoreBackend {
        &self.store
    }

    /// Timeout for the outbound match request; `None` keeps the HTTP client's default.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

/// Resolve the REST listen address from an optional value, falling back to the default.
pub fn rest_addr_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.to_string())
}

/// Select the store backend from optional MongoDB URI and database values.
///
/// A missing or blank URI selects the in-memory store.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if the URI does not use a `mongodb://` or `mongodb+srv://`
/// scheme.
pub fn store_backend_from_env_values(
    uri: Option<String>,
    database: Option<String>,
) -> CoreResult<StoreBackend> {
    let uri = uri.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let Some(uri) = uri else {
        return Ok(StoreBackend::Memory);
    };

    if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
        return Err(CoreError::Config(format!(
            "MongoDB URI must start with mongodb:// or mongodb+srv://, got '{uri}'"
        )));
    }

    let database = database
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());

    Ok(StoreBackend::Mongo { uri, database })
}

/// Parse the outbound request timeout (whole seconds) from an optional value.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if the value is not a positive integer.
pub fn request_timeout_from_env_value(value: Option<String>) -> CoreResult<Option<Duration>> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Ok(None);
    };

    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(CoreError::Config(format!(
            "request timeout must be a positive number of seconds, got '{value}'"
        ))),
    }
}
