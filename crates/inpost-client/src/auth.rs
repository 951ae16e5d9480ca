//! SMS login, token refresh and logout
//!
//! Login is a two step exchange: request an SMS code for the phone number,
//! then trade the code for an auth token and a refresh token. When an auth
//! token expires the request pipeline calls [`InpostClient::refresh_token`]
//! on its own; callers rarely need it directly.

use crate::endpoints;
use crate::http::{ApiRequest, Transport};
use crate::session::{validate_phone_number, validate_sms_code, AuthState};
use crate::{Error, InpostClient, Result};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendSmsCodeBody<'a> {
    phone_number: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmSmsCodeBody<'a> {
    phone_number: &'a str,
    sms_code: &'a str,
    #[serde(rename = "phoneOS")]
    phone_os: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmSmsCodeResponse {
    auth_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenBody<'a> {
    refresh_token: &'a str,
    #[serde(rename = "phoneOS")]
    phone_os: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenResponse {
    #[serde(default)]
    reauthentication_required: bool,
    auth_token: Option<String>,
}

impl<T: Transport> InpostClient<T> {
    /// Set the phone number the session logs in with
    ///
    /// Switching to a different number drops any tokens held for the old one.
    ///
    /// # Errors
    ///
    /// [`Error::PhoneNumber`] unless the number is exactly nine digits.
    pub fn set_phone_number(&mut self, phone_number: impl Into<String>) -> Result<()> {
        let phone_number = phone_number.into();
        validate_phone_number(&phone_number)?;

        let previous = self.session().phone_number().map(str::to_owned);
        if previous.as_deref() != Some(phone_number.as_str()) && self.session().is_authenticated() {
            tracing::info!(parent: self.span(), "phone number changed, dropping tokens");
            self.session_mut().drop_tokens();
        }

        self.session_mut().set_phone_number(phone_number);
        self.reset_span();
        tracing::debug!(parent: self.span(), "phone number set");
        Ok(())
    }

    /// Current login state
    pub fn auth_state(&self) -> AuthState {
        self.session().state()
    }

    /// Ask the server to text an SMS code to the session phone number
    ///
    /// # Errors
    ///
    /// [`Error::PhoneNumber`] when no phone number was set, plus the request
    /// pipeline errors.
    pub async fn send_sms_code(&mut self) -> Result<()> {
        let phone_number = self
            .session()
            .phone_number()
            .ok_or_else(|| Error::PhoneNumber("phone number not set".to_string()))?
            .to_owned();

        let request = ApiRequest::post("send sms code", endpoints::SEND_SMS_CODE)
            .anonymous()
            .no_refresh()
            .json_body(&SendSmsCodeBody {
                phone_number: &phone_number,
            })?;

        self.request(request).await?;
        self.session_mut().mark_sms_requested();
        tracing::info!(parent: self.span(), "sms code requested");
        Ok(())
    }

    /// Trade an SMS code for an auth token and a refresh token
    ///
    /// # Errors
    ///
    /// - [`Error::SmsCode`] unless the code is exactly six digits; nothing is sent
    /// - [`Error::PhoneNumber`] when no phone number was set
    /// - the request pipeline errors
    pub async fn confirm_sms_code(&mut self, sms_code: &str) -> Result<()> {
        validate_sms_code(sms_code)?;

        let phone_number = self
            .session()
            .phone_number()
            .ok_or_else(|| Error::PhoneNumber("phone number not set".to_string()))?
            .to_owned();

        let request = ApiRequest::post("confirm sms code", endpoints::CONFIRM_SMS_CODE)
            .anonymous()
            .no_refresh()
            .json_body(&ConfirmSmsCodeBody {
                phone_number: &phone_number,
                sms_code,
                phone_os: &self.config().phone_os,
            })?;

        let response = self.request(request).await?;
        let tokens: ConfirmSmsCodeResponse = response.json()?;

        self.session_mut()
            .store_tokens(tokens.auth_token, tokens.refresh_token, sms_code);
        tracing::info!(parent: self.span(), "authenticated");
        Ok(())
    }

    /// Exchange the refresh token for a new auth token
    ///
    /// Sent once and never retried; the pipeline calls this itself on a 401.
    ///
    /// # Errors
    ///
    /// - [`Error::RefreshToken`] when the session has no refresh token or the
    ///   server returned no auth token
    /// - [`Error::ReAuthentication`] when the server demands a new SMS login;
    ///   the tokens are dropped and the phone number kept
    /// - classified HTTP errors of the refresh call
    pub async fn refresh_token(&mut self) -> Result<()> {
        let span = self.span().clone();

        async move {
            let refresh_token = self
                .session()
                .refresh_token()
                .filter(|token| !token.is_empty())
                .ok_or_else(|| Error::RefreshToken("no refresh token in session".to_string()))?
                .to_owned();

            let request = ApiRequest::post("refresh token", endpoints::REFRESH_TOKEN)
                .anonymous()
                .no_refresh()
                .json_body(&RefreshTokenBody {
                    refresh_token: &refresh_token,
                    phone_os: &self.config().phone_os,
                })?;

            let response = self.send_once(&request).await?;
            let refreshed: RefreshTokenResponse = response.json()?;

            if refreshed.reauthentication_required {
                tracing::warn!("server requires re-authentication, dropping tokens");
                self.session_mut().drop_tokens();
                return Err(Error::ReAuthentication(
                    "refresh token rejected, log in with a new sms code".to_string(),
                ));
            }

            let auth_token = refreshed
                .auth_token
                .filter(|token| !token.is_empty())
                .ok_or_else(|| Error::RefreshToken("refresh response carried no auth token".to_string()))?;

            self.session_mut().replace_auth_token(auth_token);
            tracing::info!("auth token refreshed");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// End the session server side and forget it locally
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthenticated`] when no auth token is held; nothing is sent.
    pub async fn logout(&mut self) -> Result<()> {
        if !self.session().is_authenticated() {
            return Err(Error::NotAuthenticated("logout requires a session".to_string()));
        }

        self.request(ApiRequest::post("logout", endpoints::LOGOUT)).await?;

        tracing::info!(parent: self.span(), "logged out");
        self.session_mut().clear();
        self.reset_span();
        Ok(())
    }

    /// Log out and release the transport
    pub async fn disconnect(mut self) -> Result<()> {
        self.logout().await?;
        drop(self.into_transport());
        Ok(())
    }
}
