//! HTTP utilities for Nitrapi REST calls

use super::error::{Error, Result};
use super::params::Params;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human readable message out of an error body.
/// Nitrapi errors look like `{"status": "error", "message": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_default()
}

/// HTTP client wrapper for Nitrapi calls
#[derive(Clone)]
pub struct NitrapiHttpClient {
    client: Client,
}

impl NitrapiHttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self { client })
    }

    /// Make a GET request, parameters go into the query string
    pub async fn get(&self, url: &str, token: &str, query: &Params) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query.as_pairs());
        }

        execute(request).await
    }

    /// Make a POST request, parameters are sent form-encoded
    pub async fn post(&self, url: &str, token: &str, form: &Params) -> Result<Value> {
        tracing::debug!("POST {}", url);
        execute(self.with_form(Method::POST, url, token, form)).await
    }

    /// Make a DELETE request, parameters are sent form-encoded
    pub async fn delete(&self, url: &str, token: &str, form: &Params) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        execute(self.with_form(Method::DELETE, url, token, form)).await
    }

    fn with_form(&self, method: Method, url: &str, token: &str, form: &Params) -> RequestBuilder {
        let request = self.client.request(method, url).bearer_auth(token);
        if form.is_empty() {
            request
        } else {
            request.form(form.as_pairs())
        }
    }
}

async fn execute(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
        tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        return Err(Error::Api {
            status,
            message: error_message(&body),
        });
    }

    // Handle empty response
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|source| Error::Decode {
        key: "<body>".to_string(),
        source,
    })
}
