//! Error types for Nitrapi calls
//!
//! Callers can tell a remote rejection ([`Error::Api`]) apart from a body we
//! could not understand ([`Error::Decode`] / [`Error::MissingKey`]).

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced an HTTP response (DNS, TLS, connection reset, ...)
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API request failed: {status} - {message}")]
    Api { status: StatusCode, message: String },

    /// A response key was present but did not match the expected shape
    #[error("failed to decode `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response lacked the top-level key the resource is wrapped in
    #[error("response is missing expected key `{0}`")]
    MissingKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Remote status code, if the server rejected the request.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// True when the server answered but the body had the wrong shape.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::MissingKey(_))
    }
}

/// Format an API error for display
/// Security: avoids echoing raw response bodies back to the terminal
pub fn format_api_error(error: &Error) -> String {
    match error {
        Error::Api { status, message } => match status.as_u16() {
            401 => "Authentication failed. Check your access token.".to_string(),
            403 => "Permission denied. The token lacks the required scope.".to_string(),
            404 => "Service not found.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            500..=599 => "Nitrado service temporarily unavailable. Please try again.".to_string(),
            _ if !message.is_empty() => truncate(message, 80),
            _ => format!("Request failed ({status})."),
        },
        Error::Transport(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        Error::Decode { key, .. } | Error::MissingKey(key) => {
            format!("Unexpected response from the API (while reading `{key}`).")
        }
        Error::Config(msg) => truncate(msg, 80),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let sanitized: String = text
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(max)
        .collect();

    if text.chars().count() > max {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> Error {
        Error::Api {
            status: StatusCode::from_u16(status).unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_status_is_exposed_for_api_errors() {
        assert_eq!(api(404, "nope").status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(Error::MissingKey("gameserver".into()).status(), None);
    }

    #[test]
    fn test_short_message_is_not_marked_truncated() {
        assert_eq!(format_api_error(&api(400, "Ungültig")), "Ungltig");
        assert_eq!(format_api_error(&api(400, "Bad slot count")), "Bad slot count");
    }

    #[test]
    fn test_decode_errors_are_distinguishable() {
        assert!(Error::MissingKey("cloud_server".into()).is_decode());
        assert!(!api(500, "boom").is_decode());
    }

    #[test]
    fn test_format_maps_common_codes() {
        assert!(format_api_error(&api(401, "")).contains("Authentication"));
        assert!(format_api_error(&api(403, "")).contains("scope"));
        assert!(format_api_error(&api(503, "")).contains("unavailable"));
    }

    #[test]
    fn test_format_truncates_remote_message() {
        let long = "x".repeat(200);
        let msg = format_api_error(&api(400, &long));
        assert!(msg.ends_with("..."));
        assert!(msg.len() <= 83);
    }
}
