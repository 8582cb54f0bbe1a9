//! read client configuration from a file, the environment, or explicit values

use std::path::Path;
use std::time::Duration;

use crate::errors::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_USER_AGENT: &str = "locker-console-client/0.1.0";

/// Endpoints that never carry a bearer token and never trigger a refresh.
pub const DEFAULT_WHITELIST: &[&str] = &[
    "/auth/refresh",
    "/login",
    "/auth/sign-in",
    "/auth/otp",
    "/auth/register",
];

#[derive(Clone, Debug, serde::Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub refresh_path: Option<String>,
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// # ENV Vars
    /// * `LOCKER_API_URL` - Base URL of the console backend (required)
    /// * `LOCKER_API_TIMEOUT_SECS` - Per-request timeout in seconds
    /// * `LOCKER_API_REFRESH_PATH` - Path of the token refresh endpoint
    /// * `LOCKER_API_USER_AGENT` - User-Agent header value
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("LOCKER_API_URL")
            .map_err(|_| Error::Config("Missing LOCKER_API_URL env var".to_string()))?;
        let timeout_secs = match std::env::var("LOCKER_API_TIMEOUT_SECS") {
            Ok(raw) => Some(raw.parse::<u64>().map_err(|e| {
                Error::Config(format!("Invalid LOCKER_API_TIMEOUT_SECS '{}': {}", raw, e))
            })?),
            Err(_) => None,
        };
        Ok(Self {
            base_url,
            timeout_secs,
            refresh_path: std::env::var("LOCKER_API_REFRESH_PATH").ok(),
            whitelist: None,
            user_agent: std::env::var("LOCKER_API_USER_AGENT").ok(),
        })
    }

    pub fn from_values(
        base_url: impl Into<String>,
        timeout_secs: Option<u64>,
        refresh_path: Option<String>,
        whitelist: Option<Vec<String>>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs,
            refresh_path,
            whitelist,
            user_agent,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn refresh_path(&self) -> &str {
        self.refresh_path.as_deref().unwrap_or(DEFAULT_REFRESH_PATH)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// The configured whitelist, always including the refresh path so a 401
    /// from the refresh endpoint can never start another refresh.
    pub fn whitelist(&self) -> Vec<String> {
        let mut list: Vec<String> = match &self.whitelist {
            Some(custom) => custom.clone(),
            None => DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
        };
        let refresh = self.refresh_path().to_string();
        if !list.contains(&refresh) {
            list.push(refresh);
        }
        list
    }

    /// Parses the base URL, defaulting to https when no scheme is given.
    pub fn base_url(&self) -> Result<reqwest::Url, Error> {
        let raw = if self.base_url.contains("://") {
            self.base_url.clone()
        } else {
            format!("https://{}", self.base_url)
        };
        reqwest::Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{ "base_url": "api.example.com" }"#).unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.refresh_path(), "/auth/refresh");
        assert_eq!(cfg.base_url().unwrap().as_str(), "https://api.example.com/");
        assert!(cfg.whitelist().iter().any(|p| p == "/auth/sign-in"));
    }

    #[test]
    fn custom_refresh_path_joins_whitelist() {
        let cfg = ClientConfig::from_values(
            "http://localhost:8080",
            Some(3),
            Some("/v2/token/renew".into()),
            Some(vec!["/auth/sign-in".into()]),
            None,
        );
        let list = cfg.whitelist();
        assert_eq!(list, vec!["/auth/sign-in", "/v2/token/renew"]);
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn bare_host_starting_with_http_gets_a_scheme() {
        let cfg = ClientConfig::from_values("httpbin.example.com/api", None, None, None, None);
        assert_eq!(
            cfg.base_url().unwrap().as_str(),
            "https://httpbin.example.com/api"
        );
        let explicit = ClientConfig::from_values("http://localhost:8080", None, None, None, None);
        assert_eq!(explicit.base_url().unwrap().scheme(), "http");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let cfg = ClientConfig::from_values("http://[::1", None, None, None, None);
        assert!(matches!(cfg.base_url(), Err(Error::Config(_))));
    }
}
