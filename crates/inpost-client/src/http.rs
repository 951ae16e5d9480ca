//! HTTP plumbing for the InPost API
//!
//! Request/response types, client configuration, status classification and the
//! [`Transport`] seam the request pipeline sends through. The production
//! transport is [`ReqwestTransport`].

use crate::{endpoints, ApiFailure, Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PATCH request
    Patch,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One logical API call
///
/// Built with [`ApiRequest::get`]/[`ApiRequest::post`] etc. and executed by
/// [`InpostClient::request`](crate::InpostClient::request). Requests are
/// authenticated and auto-refreshing unless told otherwise.
///
/// # Examples
/// ```
/// use inpost_client::{ApiRequest, HttpMethod};
///
/// let req = ApiRequest::post("send sms code", "/v1/sendSMSCode")
///     .anonymous()
///     .no_refresh()
///     .json_body(&serde_json::json!({"phoneNumber": "123456789"}))
///     .unwrap();
///
/// assert_eq!(req.method, HttpMethod::Post);
/// assert!(!req.require_auth);
/// assert!(!req.auto_refresh);
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Label used only in logs and errors
    pub action: String,
    /// Endpoint path (resolved against the base URL) or absolute URL
    pub url: String,
    /// Attach the session auth token
    pub require_auth: bool,
    /// Extra request headers
    pub headers: HashMap<String, String>,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Refresh the token and retry once on 401
    pub auto_refresh: bool,
}

impl ApiRequest {
    /// Create a request with the given method
    pub fn new(method: HttpMethod, action: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method,
            action: action.into(),
            url: url.into(),
            require_auth: true,
            headers: HashMap::new(),
            body: None,
            auto_refresh: true,
        }
    }

    /// Create a GET request
    pub fn get(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, action, url)
    }

    /// Create a POST request
    pub fn post(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, action, url)
    }

    /// Create a PATCH request
    pub fn patch(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, action, url)
    }

    /// Create a DELETE request
    pub fn delete(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, action, url)
    }

    /// Send without the session auth token
    pub fn anonymous(mut self) -> Self {
        self.require_auth = false;
        self
    }

    /// Do not refresh-and-retry on 401
    pub fn no_refresh(mut self) -> Self {
        self.auto_refresh = false;
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> std::result::Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Whether the caller supplied its own Authorization header
    pub fn has_authorization_header(&self) -> bool {
        self.headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case("authorization"))
    }
}

/// A fully built request as handed to the [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// All headers, including Authorization when attached
    pub headers: HashMap<String, String>,
    /// JSON body
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Raw HTTP response
///
/// Returned by the pipeline on success so the caller can decode the body into
/// whatever shape the endpoint produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: String,
}

impl RawResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The body as text
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers.get(key)
    }
}

/// Turn a final response into success or a classified error
///
/// Only 200 counts as success. 401 and 404 get their own kinds, everything
/// else is [`Error::UnidentifiedApi`].
pub fn classify(action: &str, request: &HttpRequest, response: RawResponse) -> Result<RawResponse> {
    if response.status == 200 {
        return Ok(response);
    }

    let failure = ApiFailure {
        action: action.to_string(),
        method: request.method,
        url: request.url.clone(),
        status: response.status,
        body: response.body,
    };

    Err(match failure.status {
        401 => Error::Unauthorized(failure),
        404 => Error::NotFound(failure),
        _ => Error::UnidentifiedApi(failure),
    })
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the InPost client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// OS reported in auth payloads
    pub phone_os: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: endpoints::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("inpost-rs/{}", env!("CARGO_PKG_VERSION")),
            phone_os: "Android".to_string(),
            default_headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the OS reported to the auth endpoints
    pub fn with_phone_os(mut self, phone_os: impl Into<String>) -> Self {
        self.phone_os = phone_os.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Whether the default headers carry an Authorization header
    ///
    /// Such a header conflicts with the session token on authenticated calls.
    pub fn has_authorization_header(&self) -> bool {
        self.default_headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case("authorization"))
    }

    /// Absolute URL for an endpoint path; absolute URLs pass through
    pub fn url_for(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            endpoints::resolve(&self.base_url, url)
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Sends one HTTP request and returns whatever came back
///
/// Implementations must not interpret the status code; classification and the
/// refresh-and-retry protocol live in the client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the request
    async fn send(&self, request: HttpRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse> {
        let mut req = self
            .client
            .request(request.method.into(), &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.to_string(), value_str.to_string());
            }
        }

        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
