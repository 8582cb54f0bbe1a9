use std::sync::Arc;

use crate::token::CredentialStore;

use super::Call;

pub(crate) fn format_bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Path suffixes exempt from credential attachment and from refresh.
#[derive(Clone, Debug)]
pub struct Whitelist {
    suffixes: Vec<String>,
}

impl Whitelist {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }
}

/// Outcome of gating one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Gated {
    /// Whitelisted: sent exactly as described, no Authorization header.
    Bypass,
    /// Protected: sent with the access token read at send time, if any.
    Protected { token: Option<String> },
}

impl Gated {
    pub fn authorization(&self) -> Option<String> {
        match self {
            Gated::Protected { token: Some(token) } => Some(format_bearer(token)),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Gated::Protected { token } => token.as_deref(),
            Gated::Bypass => None,
        }
    }
}

/// Decides per call whether to attach the current access token.
#[derive(Clone)]
pub struct RequestGate {
    whitelist: Whitelist,
    refresh_path: String,
    store: Arc<dyn CredentialStore>,
}

impl RequestGate {
    pub fn new(
        whitelist: Whitelist,
        refresh_path: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            whitelist,
            refresh_path: refresh_path.into(),
            store,
        }
    }

    pub fn gate(&self, call: &Call) -> Gated {
        if self.whitelist.contains(call.route()) {
            return Gated::Bypass;
        }
        Gated::Protected {
            token: self.store.access_token(),
        }
    }

    pub fn is_refresh_endpoint(&self, call: &Call) -> bool {
        call.route().ends_with(self.refresh_path.as_str())
    }
}
