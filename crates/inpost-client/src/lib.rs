//! InPost Mobile API client library
//!
//! This crate wraps the InPost parcel-locker mobile API: SMS based login and
//! token refresh, parcel lookups, and the compartment collection flow used to
//! physically pick a parcel up from a locker.
//!
//! # Example
//!
//! ```rust,no_run
//! use inpost_client::{ExpectedStatus, InpostClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = InpostClient::new()?;
//!
//!     client.set_phone_number("123456789")?;
//!     client.send_sms_code().await?;
//!     client.confirm_sms_code("000000").await?;
//!
//!     let outcome = client.collect(Some("123456789012345678901234"), None, None).await?;
//!     if outcome.opened {
//!         let mut parcel = outcome.parcel;
//!         // ... take the parcel out and shut the door ...
//!         client.close_compartment(&mut parcel).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod collection;
pub mod endpoints;
pub mod http;
pub mod lookup;
pub mod parcel;
pub mod session;
pub mod statuses;

#[cfg(test)]
mod test_utils;

pub use client::InpostClient;
pub use collection::CollectOutcome;
pub use http::{ApiRequest, ClientConfig, HttpMethod, RawResponse, ReqwestTransport, Transport};
pub use lookup::ParcelFilter;
pub use parcel::{CollectionStage, CollectionStep, CompartmentLocation, CompartmentProperties, GeoPoint, Parcel, Point};
pub use session::{AuthState, Session, SessionMapping, SessionStore};
pub use statuses::{
    CompartmentStatus, ExpectedStatus, ParcelCarrierSize, ParcelLockerSize, ParcelSize, ParcelStatus,
    ParcelType, ShipmentType,
};

use std::fmt;

/// Result type for InPost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Details of a request the API refused
///
/// Carried by the HTTP-classified error kinds so callers can see which call
/// failed and what the server said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// Diagnostic label of the call (e.g. "confirm sms code")
    pub action: String,
    /// HTTP method used
    pub method: HttpMethod,
    /// Absolute URL of the call
    pub url: String,
    /// HTTP status returned
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}) returned {}",
            self.action,
            self.method.as_str(),
            self.url,
            self.status
        )?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

/// Error types for InPost operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Phone number is not exactly nine digits, or was never set
    #[error("Invalid phone number: {0}")]
    PhoneNumber(String),

    /// SMS code is not exactly six digits
    #[error("Invalid SMS code: {0}")]
    SmsCode(String),

    /// An auth token is required but the session holds none
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Refresh was requested without a refresh token
    #[error("Refresh token error: {0}")]
    RefreshToken(String),

    /// Server demands a fresh SMS login
    #[error("Re-authentication required: {0}")]
    ReAuthentication(String),

    /// HTTP 401 after the single refresh-and-retry was spent
    #[error("Unauthorized: {0}")]
    Unauthorized(ApiFailure),

    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(ApiFailure),

    /// Any other non-200 status
    #[error("Unidentified API error: {0}")]
    UnidentifiedApi(ApiFailure),

    /// Mutually exclusive parameters were both supplied
    #[error("Only one parameter allowed: {0}")]
    SingleParam(String),

    /// None of the required parameters were supplied
    #[error("Missing parameters: {0}")]
    MissingParams(String),

    /// Parcel or its compartment properties are missing
    #[error("No parcel: {0}")]
    NoParcel(String),

    /// Collection step called from a stage that does not permit it
    #[error("Step '{step}' not allowed in collection stage {stage:?}")]
    InvalidState {
        /// Stage the parcel was in
        stage: CollectionStage,
        /// Step that was attempted
        step: &'static str,
    },

    /// Caller supplied an Authorization header on an authenticated request
    #[error("Authorization header supplied for authenticated request '{0}'")]
    HeaderConflict(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session store I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session store contents are not usable
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// The failing response, for HTTP-classified errors
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            Error::Unauthorized(f) | Error::NotFound(f) | Error::UnidentifiedApi(f) => Some(f),
            _ => None,
        }
    }

    /// Whether the error was raised locally before any request was sent
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::PhoneNumber(_)
                | Error::SmsCode(_)
                | Error::NotAuthenticated(_)
                | Error::RefreshToken(_)
                | Error::SingleParam(_)
                | Error::MissingParams(_)
                | Error::NoParcel(_)
                | Error::InvalidState { .. }
                | Error::HeaderConflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(status: u16) -> ApiFailure {
        ApiFailure {
            action: "get parcel".to_string(),
            method: HttpMethod::Get,
            url: "https://example.test/v3/parcels/tracked/1".to_string(),
            status,
            body: "{\"error\":\"nope\"}".to_string(),
        }
    }

    #[test]
    fn test_error_types() {
        let err = Error::PhoneNumber("12345".to_string());
        assert!(err.to_string().contains("Invalid phone number"));
        assert!(err.is_precondition());
        assert!(err.api_failure().is_none());
    }

    #[test]
    fn test_api_failure_display() {
        let err = Error::NotFound(failure(404));
        let display = err.to_string();
        assert!(display.contains("get parcel"));
        assert!(display.contains("GET"));
        assert!(display.contains("404"));
        assert!(display.contains("nope"));
        assert!(!err.is_precondition());
        assert_eq!(err.api_failure().map(|f| f.status), Some(404));
    }
}
