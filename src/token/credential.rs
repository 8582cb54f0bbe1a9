use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair plus optional expiry, as issued by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(
        default,
        alias = "expires",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp::deserialize"
    )]
    pub expires_at: Option<Timestamp>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns the refresh token, treating an empty string as absent.
    pub fn refresh_token(&self) -> Option<&str> {
        if self.refresh_token.is_empty() {
            None
        } else {
            Some(&self.refresh_token)
        }
    }

    /// Returns the access token, treating an empty string as absent.
    pub fn access_token(&self) -> Option<&str> {
        if self.access_token.is_empty() {
            None
        } else {
            Some(&self.access_token)
        }
    }

    /// Time left until `expires_at`, or `None` when unknown or already past.
    pub fn remaining(&self, now: Timestamp) -> Option<Duration> {
        let expires_at = self.expires_at?;
        let left: SignedDuration = expires_at.duration_since(now);
        Duration::try_from(left).ok()
    }
}

/// Expiry arrives as RFC 3339, epoch milliseconds, or `YYYY/MM/DD HH:MM:SS`
/// (UTC). Anything else is dropped; expiry is advisory only.
mod lenient_timestamp {
    use jiff::Timestamp;
    use jiff::civil::DateTime;
    use jiff::tz::TimeZone;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Raw>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Raw::Millis(ms)) => Timestamp::from_millisecond(ms).ok(),
            Some(Raw::Text(text)) => parse_text(&text),
            None => None,
        })
    }

    fn parse_text(text: &str) -> Option<Timestamp> {
        if let Ok(ts) = text.parse::<Timestamp>() {
            return Some(ts);
        }
        DateTime::strptime("%Y/%m/%d %H:%M:%S", text)
            .ok()?
            .to_zoned(TimeZone::UTC)
            .ok()
            .map(|zdt| zdt.timestamp())
    }
}
