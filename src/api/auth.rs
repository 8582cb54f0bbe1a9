use jiff::{SignedDuration, Timestamp};
use tracing::info;

use crate::client::{ApiClient, unwrap_envelope};
use crate::dispatch::Call;
use crate::errors::Error;
use crate::token::Credential;
use crate::types::{ApiResponse, OtpRequest, RegisterRequest, SignInRequest, SignInResult};

use super::{OTP_PATH, REGISTER_PATH, SIGN_IN_PATH};

/// Lifetime assumed for a signed-in credential; the sign-in response carries
/// no expiry of its own.
const SIGN_IN_LIFETIME: SignedDuration = SignedDuration::from_hours(24);

impl ApiClient {
    /// Signs in and stores the issued credential.
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<SignInResult, Error> {
        let envelope: ApiResponse<SignInResult> = self
            .request(Call::post(SIGN_IN_PATH).json(request)?)
            .await?;
        let result = unwrap_envelope(envelope)?;
        let credential = Credential::new(&result.access_token, &result.refresh_token)
            .with_expiry(sign_in_expiry(Timestamp::now()));
        self.store().set(credential);
        info!(
            "signed in: user='{}' roles={}",
            result.username,
            result.role_names.len()
        );
        Ok(result)
    }

    /// Registers a new account. The backend signs the account in as part of
    /// registration, but the credential is left for the caller to store.
    pub async fn register(&self, request: &RegisterRequest) -> Result<SignInResult, Error> {
        self.call_api(Call::post(REGISTER_PATH).json(request)?).await
    }

    /// Requests a one-time code for `phone_or_email`.
    pub async fn send_otp(&self, phone_or_email: impl Into<String>) -> Result<(), Error> {
        let request = OtpRequest {
            phone_or_email: phone_or_email.into(),
        };
        let envelope: ApiResponse<serde_json::Value> =
            self.request(Call::post(OTP_PATH).json(&request)?).await?;
        if envelope.status {
            Ok(())
        } else {
            Err(Error::Api {
                message: envelope
                    .message
                    .unwrap_or_else(|| "otp request unsuccessful".to_string()),
            })
        }
    }

    /// Ends the session locally; no request is sent.
    pub fn log_out(&self) {
        self.session().end_session();
    }
}

fn sign_in_expiry(now: Timestamp) -> Timestamp {
    now.checked_add(SIGN_IN_LIFETIME).unwrap_or(Timestamp::MAX)
}
