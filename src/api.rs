// API client module: holds the configuration, the signed admin token and
// the session cookies, and sends every Admin API call through a
// `Transport`. Resource, image and deploy operations are implemented in
// their own modules as further `impl ApiClient` blocks.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth;
use crate::config::{url_join, ClientConfig};
use crate::error::{GhostError, Result};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, RequestBody, Transport};

/// Admin API client for one site and one user session.
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
    config: ClientConfig,
    base_url: String,
    token: String,
    session: Option<Vec<(String, String)>>,
}

impl ApiClient<HttpTransport> {
    /// Create a client that talks HTTP, signing its admin token up front.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, HttpTransport::new()?)
    }

    /// Create an HTTP client configured from the environment. See
    /// [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client over any transport. Fails when the client secret is
    /// not valid hex.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let token = auth::issue_token(&config.client_id, &config.client_secret, &config.version)?;
        let base_url = config.base_url();
        Ok(ApiClient {
            transport,
            config,
            base_url,
            token,
            session: None,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns whether a session cookie has been obtained.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Exchange the signed token plus user credentials for a session
    /// cookie, which is attached to every later call. API access is then
    /// limited to the role of the logged-in user.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let token = self.current_token()?;
        let url = self.endpoint(&["session"]);
        let req = ApiRequest::new(Method::POST, url)
            .header("Authorization", format!("Ghost {token}"))
            .header("Origin", self.config.site_url.clone())
            .body(RequestBody::Form(vec![
                ("username".to_string(), username.to_string()),
                ("password".to_string(), password.to_string()),
            ]));

        let res = self.transport.send(req)?;
        if res.status != 201 {
            return Err(GhostError::from_response(res.status, &res.body));
        }

        let names: Vec<&str> = res.cookies.iter().map(|(n, _)| n.as_str()).collect();
        debug!(cookies = ?names, "using session cookies");
        info!(username, "logged in to {}", self.config.site_url);

        self.session = Some(res.cookies);
        Ok(())
    }

    /// Read basic information about the site.
    pub fn get_site(&self) -> Result<Value> {
        let req = ApiRequest::new(Method::GET, self.endpoint(&["site"]));
        self.send(req)?.expect_status(200)
    }

    /// The stored token after checking it against the secret and audience
    /// it was signed for; an expired one is replaced by a fresh token.
    fn current_token(&mut self) -> Result<String> {
        match auth::verify_token(&self.token, &self.config.client_secret, &self.config.version) {
            Ok(_) => {}
            Err(GhostError::Token(e))
                if matches!(
                    e.kind(),
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature
                ) =>
            {
                debug!("admin token expired, issuing a new one");
                self.token = auth::issue_token(
                    &self.config.client_id,
                    &self.config.client_secret,
                    &self.config.version,
                )?;
            }
            Err(e) => return Err(e),
        }
        Ok(self.token.clone())
    }

    /// Absolute URL of an endpoint below the Admin API root.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> String {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push(self.base_url.as_str());
        all.extend_from_slice(segments);
        url_join(&all)
    }

    /// Send a request with the session cookie attached, if there is one.
    pub(crate) fn send(&self, req: ApiRequest) -> Result<ApiResponse> {
        let req = match self.cookie_header() {
            Some(cookie) => req.header("Cookie", cookie),
            None => req,
        };
        self.transport.send(req)
    }

    fn cookie_header(&self) -> Option<String> {
        let cookies = self.session.as_ref()?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
