// Error types shared by every part of the library.
//
// Remote failures (the platform answered with an unexpected status) are kept
// apart from local failures (bad arguments, a broken deploy directory) so a
// caller can tell "my setup is wrong" from "the server rejected this".

use serde_json::Value;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, GhostError>;

#[derive(Debug, thiserror::Error)]
pub enum GhostError {
    #[error("API request failed with status {status}: {}", describe_errors(.errors))]
    Api { status: u16, errors: Vec<Value> },

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("deploy failed: {0}")]
    Deploy(String),

    #[error("multiple {collection} found for {search_by} {value}")]
    Ambiguous {
        collection: String,
        search_by: String,
        value: String,
    },

    #[error("no {collection} found for {search_by} {value}")]
    NotFound {
        collection: String,
        search_by: String,
        value: String,
    },

    #[error("{} does not contain valid JSON: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected error accessing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("client secret is not valid hex: {0}")]
    InvalidSecret(#[from] hex::FromHexError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GhostError {
    /// Whether the platform itself rejected the request.
    pub fn is_remote(&self) -> bool {
        matches!(self, GhostError::Api { .. })
    }

    /// Whether the failure comes from the caller's arguments or local files
    /// rather than from the network or the platform.
    pub fn is_local_setup(&self) -> bool {
        matches!(
            self,
            GhostError::Validation(_)
                | GhostError::Deploy(_)
                | GhostError::Ambiguous { .. }
                | GhostError::NotFound { .. }
                | GhostError::InvalidJson { .. }
                | GhostError::Io { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GhostError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an API error from a response status and its JSON body,
    /// picking up the `errors` array when the body carries one.
    pub(crate) fn from_response(status: u16, body: &Value) -> Self {
        let errors = body
            .get("errors")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        GhostError::Api { status, errors }
    }
}

fn describe_errors(errors: &[Value]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| match e.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => e.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
