//! Nitrapi Client
//!
//! Main client for the Nitrado API, combining the access token, the base URL
//! and the HTTP transport. Resource handles hold a clone of it.

use super::auth::AccessToken;
use super::error::{Error, Result};
use super::http::NitrapiHttpClient;
use super::params::Params;
use crate::service::Service;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.nitrado.net/";

/// Application name reported in restart/stop messages when none is configured
pub const DEFAULT_APPLICATION_NAME: &str = "nitrapi-rs";

/// Main Nitrapi client
#[derive(Clone)]
pub struct Nitrapi {
    http: NitrapiHttpClient,
    token: AccessToken,
    base_url: Url,
    application_name: String,
}

impl std::fmt::Debug for Nitrapi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nitrapi")
            .field("base_url", &self.base_url.as_str())
            .field("application_name", &self.application_name)
            .field("token", &self.token)
            .finish()
    }
}

impl Nitrapi {
    /// Create a client against the production endpoint
    pub fn new(token: AccessToken) -> Result<Self> {
        let http = NitrapiHttpClient::new(concat!("nitrapi-rs/", env!("CARGO_PKG_VERSION")))?;
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| Error::Config(format!("invalid base URL: {e}")))?;

        Ok(Self {
            http,
            token,
            base_url,
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        })
    }

    /// Point the client at another endpoint (staging, mock server)
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        self.base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("invalid base URL `{base_url}`: {e}")))?;
        Ok(self)
    }

    pub fn with_application_name(mut self, name: &str) -> Self {
        self.application_name = name.to_string();
        self
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build the absolute URL for an API path such as `services/42/gameservers`
    pub fn url(&self, path: &str) -> Result<String> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map(String::from)
            .map_err(|e| Error::Config(format!("invalid path `{path}`: {e}")))
    }

    /// GET a path and return the unwrapped `data` object
    pub async fn data_get(&self, path: &str, query: &Params) -> Result<Value> {
        let url = self.url(path)?;
        let body = self.http.get(&url, self.token.as_str(), query).await?;
        Ok(unwrap_envelope(body))
    }

    /// POST to a path and return the unwrapped `data` object
    pub async fn data_post(&self, path: &str, form: &Params) -> Result<Value> {
        let url = self.url(path)?;
        let body = self.http.post(&url, self.token.as_str(), form).await?;
        Ok(unwrap_envelope(body))
    }

    /// DELETE a path and return the unwrapped `data` object
    pub async fn data_delete(&self, path: &str, form: &Params) -> Result<Value> {
        let url = self.url(path)?;
        let body = self.http.delete(&url, self.token.as_str(), form).await?;
        Ok(unwrap_envelope(body))
    }

    /// List all services the token can see
    pub async fn services(&self) -> Result<Vec<Service>> {
        let data = self.data_get("services", &Params::new()).await?;
        extract(&data, "services")
    }

    /// Fetch a single service descriptor
    pub async fn service(&self, id: u64) -> Result<Service> {
        let data = self.data_get(&format!("services/{}", id), &Params::new()).await?;
        extract(&data, "service")
    }
}

/// Strip the `{"status": "success", "data": {...}}` envelope.
/// Bodies without one are returned unchanged.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode the value found under a dotted key path (`"console.url"`).
/// A missing or null key is a [`Error::MissingKey`], a shape mismatch is a
/// [`Error::Decode`].
pub fn extract<T: DeserializeOwned>(data: &Value, key: &str) -> Result<T> {
    let mut current = data;
    for part in key.split('.') {
        current = match current.get(part) {
            Some(v) if !v.is_null() => v,
            _ => return Err(Error::MissingKey(key.to_string())),
        };
    }

    T::deserialize(current).map_err(|source| Error::Decode {
        key: key.to_string(),
        source,
    })
}
