// Client configuration: where the platform lives and which admin
// credentials to sign tokens with. Built once per client instance.

use crate::error::{GhostError, Result};

pub const DEFAULT_API_VERSION: &str = "v3";

/// Connection settings for one Admin API client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub site_url: String,
    pub version: String,
    pub client_id: String,
    /// Hex-encoded signing key.
    pub client_secret: String,
}

impl ClientConfig {
    pub fn new(
        site_url: impl Into<String>,
        version: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        ClientConfig {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            version: version.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Build a config from the combined `<id>:<secret>` admin key the
    /// platform hands out.
    pub fn from_admin_key(
        site_url: impl Into<String>,
        version: impl Into<String>,
        admin_key: &str,
    ) -> Result<Self> {
        let (id, secret) = admin_key.split_once(':').ok_or_else(|| {
            GhostError::Validation("admin API key must have the form <id>:<secret>".to_string())
        })?;
        Ok(Self::new(site_url, version, id, secret))
    }

    /// Load settings from the environment. Used by the CLI; the library
    /// itself never reads the environment.
    ///
    /// `GHOST_SITE_URL` is required, `GHOST_API_VERSION` defaults to `v3`.
    /// Credentials come from `GHOST_ADMIN_API_KEY`, or from the pair
    /// `GHOST_CLIENT_ID` / `GHOST_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self> {
        let site_url = require_env("GHOST_SITE_URL")?;
        let version =
            std::env::var("GHOST_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.into());
        if let Ok(key) = std::env::var("GHOST_ADMIN_API_KEY") {
            return Self::from_admin_key(site_url, version, &key);
        }
        let client_id = require_env("GHOST_CLIENT_ID")?;
        let client_secret = require_env("GHOST_CLIENT_SECRET")?;
        Ok(Self::new(site_url, version, client_id, client_secret))
    }

    /// Root of every Admin API request, always with a trailing slash.
    pub fn base_url(&self) -> String {
        url_join(&[&self.site_url, "admin-api", &self.version, "admin"])
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| GhostError::Validation(format!("environment variable {name} is not set")))
}

/// Join URL segments with `/`, dropping their trailing slashes and making
/// sure the result ends in one. The platform rejects paths without it.
pub fn url_join(segments: &[&str]) -> String {
    let mut url = segments
        .iter()
        .map(|s| s.trim_end_matches('/'))
        .collect::<Vec<_>>()
        .join("/");
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
