use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::RefreshFailure;
use crate::token::Credential;
use crate::types::{ApiResponse, RefreshRequest};

/// Body shapes accepted from the refresh endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum RefreshReply {
    Envelope(ApiResponse<Credential>),
    Bare(Credential),
}

/// Trades a refresh token for a new credential pair.
#[derive(Clone)]
pub struct RefreshExchange {
    http: Client,
    url: String,
}

impl RefreshExchange {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub async fn exchange(&self, refresh_token: &str) -> Result<Credential, RefreshFailure> {
        let resp = self
            .http
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| {
                warn!("refresh exchange transport failure: {}", e);
                RefreshFailure::Network(e.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RefreshFailure::Network(e.to_string()))?;
        if !status.is_success() {
            warn!("refresh exchange rejected: status={} body='{}'", status, body);
            return Err(RefreshFailure::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let credential = parse_reply(status.as_u16(), &body)?;
        info!(
            "refresh exchange ok (access_len={})",
            credential.access_token.len()
        );
        Ok(credential)
    }
}

fn parse_reply(status: u16, body: &str) -> Result<Credential, RefreshFailure> {
    let reply: RefreshReply =
        serde_json::from_str(body).map_err(|e| RefreshFailure::Malformed(e.to_string()))?;
    let credential = match reply {
        RefreshReply::Envelope(envelope) => match (envelope.status, envelope.data) {
            (true, Some(credential)) => credential,
            (true, None) => {
                return Err(RefreshFailure::Malformed("envelope without data".into()));
            }
            (false, _) => {
                return Err(RefreshFailure::Rejected {
                    status,
                    message: envelope.message.unwrap_or_default(),
                });
            }
        },
        RefreshReply::Bare(credential) => credential,
    };
    if credential.access_token().is_none() {
        return Err(RefreshFailure::Malformed("empty access token".into()));
    }
    Ok(credential)
}
