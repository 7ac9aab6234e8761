// HTTP exchange seam.
//
// Every call the client makes goes through [`Transport::send`]: one
// fully-described request in, status + parsed body + cookies out. The
// production implementation wraps a blocking `reqwest` client; tests plug
// in the `mockall`-generated `MockTransport` to count and inspect calls.

use reqwest::blocking::{multipart, Client};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{GhostError, Result};

/// A single request to the Admin API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        ApiRequest {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first query parameter called `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(FileUpload),
}

/// A file already read into memory plus the `ref` form field that
/// accompanies it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub contents: Vec<u8>,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` for an empty body and a JSON string
    /// holding the raw text when the body is not JSON.
    pub body: Value,
    pub cookies: Vec<(String, String)>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse {
            status,
            body,
            cookies: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pass the body through when the status is `expected`, otherwise turn
    /// the response into an API error.
    pub fn expect_status(self, expected: u16) -> Result<Value> {
        if self.status != expected {
            return Err(GhostError::from_response(self.status, &self.body));
        }
        Ok(self.body)
    }
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Transport {
    fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, GhostError>;
}

/// Blocking `reqwest` transport used outside tests.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let ApiRequest {
            method,
            url,
            query,
            headers,
            body,
        } = request;
        debug!(%method, %url, "sending Admin API request");

        let mut builder = self.client.request(method, &url).query(&query);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart(upload) => {
                let part = multipart::Part::bytes(upload.contents)
                    .file_name(upload.file_name)
                    .mime_str(&upload.mime_type)?;
                let form = multipart::Form::new()
                    .part("file", part)
                    .text("ref", upload.reference);
                builder.multipart(form)
            }
        };

        let res = builder.send()?;
        let status = res.status().as_u16();
        let cookies = res
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let text = res.text()?;
        debug!(status, %url, "received Admin API response");

        Ok(ApiResponse {
            status,
            body: parse_body(text),
            cookies,
        })
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
