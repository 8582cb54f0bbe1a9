mod call;
mod gate;

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use tracing::{info, warn};

use crate::errors::Error;
use crate::refresh::{RefreshCoordinator, RefreshExchange};
use crate::session::SessionManager;
use crate::token::CredentialStore;

pub use call::Call;
pub use gate::{Gated, RequestGate, Whitelist};

/// Entry point for every outbound call: gates it, sends it, and recovers
/// from an expired access token with a single retry.
#[derive(Clone)]
pub struct Dispatcher {
    http: Client,
    base_url: String,
    gate: RequestGate,
    coordinator: Arc<RefreshCoordinator>,
    exchange: RefreshExchange,
    session: Arc<dyn SessionManager>,
}

impl Dispatcher {
    pub fn build(
        http: Client,
        base_url: impl Into<String>,
        whitelist: Whitelist,
        refresh_path: &str,
        store: Arc<dyn CredentialStore>,
        session: Arc<dyn SessionManager>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let exchange = RefreshExchange::new(http.clone(), Call::post(refresh_path).url(&base_url));
        let gate = RequestGate::new(whitelist, refresh_path, Arc::clone(&store));
        Self {
            http,
            base_url,
            gate,
            coordinator: Arc::new(RefreshCoordinator::new(store, Arc::clone(&session))),
            exchange,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn coordinator(&self) -> Arc<RefreshCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Sends `call`. Responses other than 401 are returned untouched,
    /// whatever their status; a 401 on a protected call is absorbed by the
    /// refresh coordinator and the call is reissued once with the new token.
    pub async fn dispatch(&self, call: &Call) -> Result<Response, Error> {
        let gated = self.gate.gate(call);
        let resp = self.send(call, gated.authorization()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        let path = call.route().to_string();
        if self.gate.is_refresh_endpoint(call) {
            warn!(path = %path, "dispatch.unauthorized on refresh endpoint; ending session");
            let err = terminal(path, resp).await;
            self.session.end_session();
            return Err(err);
        }
        if let Gated::Bypass = gated {
            warn!(path = %path, "dispatch.unauthorized on whitelisted endpoint");
            return Err(terminal(path, resp).await);
        }

        warn!(path = %path, status = 401, "dispatch.unauthorized; recovering credential");
        let token = self
            .coordinator
            .recover(gated.token(), |refresh_token| async move {
                self.exchange.exchange(&refresh_token).await
            })
            .await?;

        info!(path = %path, "dispatch.retry with refreshed credential");
        self.send(call, Some(gate::format_bearer(&token))).await
    }

    async fn send(&self, call: &Call, authorization: Option<String>) -> Result<Response, Error> {
        let mut req = self
            .http
            .request(call.method.clone(), call.url(&self.base_url));
        if let Some(value) = authorization {
            req = req.header(AUTHORIZATION, value);
        }
        if let Some(body) = &call.body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }
}

async fn terminal(path: String, resp: Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Error::TerminalAuthFailure { path, status, body }
}
