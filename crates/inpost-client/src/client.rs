//! InpostClient - the facade an application holds
//!
//! Owns the configuration, the transport and the [`Session`], and runs the
//! authenticated request pipeline every API call goes through:
//!
//! 1. attach the session auth token when the request requires it,
//! 2. send it,
//! 3. on 401 with auto-refresh enabled, refresh the token once and resend the
//!    identical request once,
//! 4. classify the final status (200 ok, 401, 404, anything else).
//!
//! Auth, lookup and collection operations live in their own modules as
//! further `impl` blocks on [`InpostClient`].
//!
//! A client is driven by one caller at a time; all mutating operations take
//! `&mut self`.

use crate::http::{classify, ApiRequest, ClientConfig, HttpRequest, RawResponse, ReqwestTransport, Transport};
use crate::session::{Session, SessionMapping, SessionStore};
use crate::{Error, Result};
use tracing::{Instrument, Span};

/// Client for the InPost mobile API
///
/// # Example
///
/// ```rust,no_run
/// use inpost_client::InpostClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = InpostClient::new()?;
///     client.set_phone_number("123456789")?;
///     client.send_sms_code().await?;
///     client.confirm_sms_code("123456").await?;
///
///     let parcels = client.get_parcels(&Default::default()).await?;
///     println!("{} parcels", parcels.len());
///     Ok(())
/// }
/// ```
pub struct InpostClient<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
    session: Session,
    span: Span,
}

impl InpostClient<ReqwestTransport> {
    /// Create a client for the production API
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> InpostClient<T> {
    /// Create a client over any transport, with an empty session
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            session: Session::new(),
            span: session_span(None),
        }
    }

    /// Create a client restoring a persisted session
    pub fn from_mapping(config: ClientConfig, transport: T, mapping: SessionMapping) -> Result<Self> {
        let session = Session::from_mapping(mapping)?;
        let span = session_span(session.phone_number());
        Ok(Self {
            config,
            transport,
            session,
            span,
        })
    }

    /// Export the session for external persistence
    pub fn to_mapping(&self) -> SessionMapping {
        self.session.to_mapping()
    }

    /// Persist the session to `store`
    pub async fn save_session(&self, store: &SessionStore) -> Result<()> {
        store.save(&self.session.to_mapping()).await
    }

    /// Replace the session with the one in `store`
    ///
    /// Returns `false` and leaves the session untouched when the store is empty.
    pub async fn restore_session(&mut self, store: &SessionStore) -> Result<bool> {
        match store.load().await? {
            Some(mapping) => {
                self.session = Session::from_mapping(mapping)?;
                self.reset_span();
                tracing::info!(parent: &self.span, "session restored");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Tracing span carrying this client's identity
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn reset_span(&mut self) {
        self.span = session_span(self.session.phone_number());
    }

    pub(crate) fn into_transport(self) -> T {
        self.transport
    }

    /// Execute one logical API call
    ///
    /// Attaches the auth token when `require_auth` is set and refreshes the
    /// token then retries exactly once when the first attempt comes back 401
    /// and `auto_refresh` is set. The retry reuses the same method, URL and
    /// body. Returns the raw 200 response for the caller to decode.
    ///
    /// # Errors
    ///
    /// - [`Error::HeaderConflict`] if the request or the default headers
    ///   carry their own Authorization header while requiring auth
    /// - [`Error::NotAuthenticated`] if auth is required but no token is held
    /// - errors of [`refresh_token`](Self::refresh_token) when the refresh fails
    /// - [`Error::Unauthorized`], [`Error::NotFound`] or
    ///   [`Error::UnidentifiedApi`] for the final response
    pub async fn request(&mut self, request: ApiRequest) -> Result<RawResponse> {
        let span = self.span.clone();

        async move {
            let (sent, response) = self.dispatch(&request).await?;

            let (sent, response) = if response.status == 401 && request.auto_refresh {
                tracing::warn!(action = %request.action, "unauthorized, refreshing token and retrying once");
                self.refresh_token().await?;
                self.dispatch(&request).await?
            } else {
                (sent, response)
            };

            classify(&request.action, &sent, response)
        }
        .instrument(span)
        .await
    }

    /// Execute a call once, without the refresh-and-retry step
    pub(crate) async fn send_once(&self, request: &ApiRequest) -> Result<RawResponse> {
        let (sent, response) = self.dispatch(request).await?;
        classify(&request.action, &sent, response)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<(HttpRequest, RawResponse)> {
        let sent = self.build(request)?;

        tracing::debug!(
            action = %request.action,
            method = sent.method.as_str(),
            url = %sent.url,
            authenticated = request.require_auth,
            "sending request"
        );

        let response = self.transport.send(sent.clone()).await?;

        tracing::debug!(action = %request.action, status = response.status, "received response");

        Ok((sent, response))
    }

    fn build(&self, request: &ApiRequest) -> Result<HttpRequest> {
        let mut headers = self.config.default_headers.clone();

        if request.require_auth {
            if request.has_authorization_header() || self.config.has_authorization_header() {
                return Err(Error::HeaderConflict(request.action.clone()));
            }

            let token = self.session.auth_token().ok_or_else(|| {
                Error::NotAuthenticated(format!("'{}' requires an auth token", request.action))
            })?;
            headers.extend(request.headers.clone());
            headers.insert("Authorization".to_string(), token.to_string());
        } else {
            headers.extend(request.headers.clone());
        }

        if request.body.is_some() {
            headers
                .entry("Content-Type".to_string())
                .or_insert_with(|| "application/json".to_string());
        }

        Ok(HttpRequest {
            method: request.method,
            url: self.config.url_for(&request.url),
            headers,
            body: request.body.clone(),
        })
    }
}

fn session_span(phone_number: Option<&str>) -> Span {
    tracing::info_span!("inpost_client", phone_number = phone_number.unwrap_or("-"))
}
