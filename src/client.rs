use std::sync::Arc;

use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::{
    config::ClientConfig,
    dispatch::{Call, Dispatcher, Whitelist},
    errors::Error,
    session::{SessionManager, StoreSession},
    token::{CredentialStore, MemoryCredentialStore},
    types::ApiResponse,
};

/// Authenticated client for the console backend.
#[derive(Clone)]
pub struct ApiClient {
    dispatcher: Dispatcher,
    store: Arc<dyn CredentialStore>,
    session: Arc<dyn SessionManager>,
}

impl ApiClient {
    /// Create a new ApiClient
    /// # Arguments
    /// * `config` - Explicit configuration, typically loaded via `ClientConfig::from_file` or `ClientConfig::from_env`.
    /// * `store` - Where the active credential lives
    /// * `session` - Notified when the credential cannot be recovered
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        session: Arc<dyn SessionManager>,
    ) -> Result<Self, Error> {
        let base_url = config.base_url()?;
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .default_headers(default_headers())
            .build()?;
        let dispatcher = Dispatcher::build(
            http,
            base_url.as_str(),
            Whitelist::new(config.whitelist()),
            config.refresh_path(),
            Arc::clone(&store),
            Arc::clone(&session),
        );
        info!("api client ready: base='{}'", dispatcher.base_url());
        Ok(Self {
            dispatcher,
            store,
            session,
        })
    }

    /// Client backed by an in-memory store whose session end simply clears it.
    pub fn in_memory(config: ClientConfig) -> Result<Self, Error> {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let session = Arc::new(StoreSession::new(Arc::clone(&store)));
        Self::new(config, store, session)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn session(&self) -> &Arc<dyn SessionManager> {
        &self.session
    }

    /// Dispatches `call` and decodes a successful JSON body as `T`.
    pub async fn request<T: DeserializeOwned>(&self, call: Call) -> Result<T, Error> {
        let resp = self.dispatcher.dispatch(&call).await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            error!(
                "request failed: {} {} status={} body='{}'",
                call.method, call.path, status, body
            );
            return Err(Error::Status { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Like `request`, for endpoints answering with the `{ status, data,
    /// message }` envelope; returns `data`.
    pub async fn call_api<T: DeserializeOwned>(&self, call: Call) -> Result<T, Error> {
        let envelope: ApiResponse<T> = self.request(call).await?;
        unwrap_envelope(envelope)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Call::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Call::post(path).json(body)?).await
    }
}

pub(crate) fn unwrap_envelope<T>(envelope: ApiResponse<T>) -> Result<T, Error> {
    match envelope {
        ApiResponse {
            status: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiResponse {
            status: true,
            data: None,
            ..
        } => Err(Error::Api {
            message: "response carried no data".to_string(),
        }),
        ApiResponse { message, .. } => Err(Error::Api {
            message: message.unwrap_or_else(|| "request unsuccessful".to_string()),
        }),
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}
