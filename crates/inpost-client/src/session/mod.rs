//! Session and token state
//!
//! [`Session`] holds the identity and tokens of one logical client. Only the
//! auth operations on [`InpostClient`](crate::InpostClient) mutate it; the
//! request pipeline reads the auth token from it for every authenticated call.
//!
//! # Example
//!
//! ```rust
//! use inpost_client::session::{Session, SessionMapping};
//!
//! let mapping = SessionMapping {
//!     phone_number: Some("123456789".to_string()),
//!     sms_code: Some("000000".to_string()),
//!     auth_token: Some("A".to_string()),
//!     refr_token: Some("R".to_string()),
//! };
//!
//! let session = Session::from_mapping(mapping.clone()).unwrap();
//! assert_eq!(session.auth_token(), Some("A"));
//! assert_eq!(session.to_mapping(), mapping);
//! ```

mod store;

pub use store::SessionStore;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of digits in a phone number
pub const PHONE_NUMBER_LEN: usize = 9;

/// Number of digits in an SMS code
pub const SMS_CODE_LEN: usize = 6;

/// Where a session stands in the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// No phone number set
    Anonymous,
    /// Phone number set, no SMS requested yet
    PhoneSet,
    /// SMS code requested
    SmsSent,
    /// Tokens held
    Authenticated,
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Check a phone number is exactly nine ASCII digits
pub fn validate_phone_number(phone_number: &str) -> Result<()> {
    if is_digits(phone_number, PHONE_NUMBER_LEN) {
        Ok(())
    } else {
        Err(Error::PhoneNumber(format!(
            "expected {} digits, got '{}'",
            PHONE_NUMBER_LEN, phone_number
        )))
    }
}

/// Check an SMS code is exactly six ASCII digits
pub fn validate_sms_code(sms_code: &str) -> Result<()> {
    if is_digits(sms_code, SMS_CODE_LEN) {
        Ok(())
    } else {
        Err(Error::SmsCode(format!(
            "expected {} digits, got '{}'",
            SMS_CODE_LEN, sms_code
        )))
    }
}

/// Identity and tokens of one client
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    phone_number: Option<String>,
    sms_code: Option<String>,
    auth_token: Option<String>,
    refresh_token: Option<String>,
    sms_requested: bool,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a session from its persisted mapping
    ///
    /// A phone number present in the mapping must be well formed.
    pub fn from_mapping(mapping: SessionMapping) -> Result<Self> {
        if let Some(phone_number) = &mapping.phone_number {
            validate_phone_number(phone_number)?;
        }

        Ok(Self {
            phone_number: mapping.phone_number,
            sms_code: mapping.sms_code,
            auth_token: mapping.auth_token,
            refresh_token: mapping.refr_token,
            sms_requested: false,
        })
    }

    /// Export the session for external persistence
    pub fn to_mapping(&self) -> SessionMapping {
        SessionMapping {
            phone_number: self.phone_number.clone(),
            sms_code: self.sms_code.clone(),
            auth_token: self.auth_token.clone(),
            refr_token: self.refresh_token.clone(),
        }
    }

    /// Phone number identifying the account
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Last confirmed SMS code
    pub fn sms_code(&self) -> Option<&str> {
        self.sms_code.as_deref()
    }

    /// Bearer token for authenticated calls
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Token used to obtain a new auth token
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Whether an auth token is held
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Current login state
    pub fn state(&self) -> AuthState {
        if self.auth_token.is_some() {
            AuthState::Authenticated
        } else if self.sms_requested {
            AuthState::SmsSent
        } else if self.phone_number.is_some() {
            AuthState::PhoneSet
        } else {
            AuthState::Anonymous
        }
    }

    pub(crate) fn set_phone_number(&mut self, phone_number: String) {
        self.phone_number = Some(phone_number);
        self.sms_requested = false;
    }

    pub(crate) fn mark_sms_requested(&mut self) {
        self.sms_requested = true;
    }

    pub(crate) fn store_tokens(
        &mut self,
        auth_token: impl Into<String>,
        refresh_token: impl Into<String>,
        sms_code: impl Into<String>,
    ) {
        self.auth_token = Some(auth_token.into());
        self.refresh_token = Some(refresh_token.into());
        self.sms_code = Some(sms_code.into());
        self.sms_requested = false;
    }

    pub(crate) fn replace_auth_token(&mut self, auth_token: String) {
        self.auth_token = Some(auth_token);
    }

    /// Drop tokens but keep the phone number, so login restarts at the SMS step
    pub(crate) fn drop_tokens(&mut self) {
        self.auth_token = None;
        self.refresh_token = None;
        self.sms_code = None;
        self.sms_requested = false;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phone_number", &self.phone_number)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("state", &self.state())
            .finish()
    }
}

/// Plain mapping of the persisted session fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMapping {
    /// Phone number
    pub phone_number: Option<String>,
    /// Last confirmed SMS code
    pub sms_code: Option<String>,
    /// Auth token
    pub auth_token: Option<String>,
    /// Refresh token
    pub refr_token: Option<String>,
}

impl From<&Session> for SessionMapping {
    fn from(session: &Session) -> Self {
        session.to_mapping()
    }
}
