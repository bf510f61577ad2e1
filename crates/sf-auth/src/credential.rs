//! The access/refresh token bundle and its persisted snapshot form
//!
//! A `Credential` is created once per login and mutated in place on refresh.
//! `expires` is always `issued + TOKEN_LIFETIME_MINUTES` for credentials built
//! from a token response; snapshots carry their stored expiry unchanged.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{SNAPSHOT_DATE_FORMAT, TOKEN_LIFETIME_MINUTES};
use crate::error::{Error, Result};
use crate::factory::RefreshResponse;

/// Expiry for a token issued at `issued`.
pub fn expiry_for(issued: DateTime<Utc>) -> DateTime<Utc> {
    issued + Duration::minutes(TOKEN_LIFETIME_MINUTES)
}

/// OAuth credentials for one Salesforce org session.
#[derive(Clone, PartialEq)]
pub struct Credential {
    id: String,
    issued: DateTime<Utc>,
    expires: DateTime<Utc>,
    scope: Vec<String>,
    token_type: String,
    refresh_token: String,
    signature: String,
    access_token: String,
    api_url: String,
}

impl Credential {
    /// Build from explicit fields. No validation is performed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        issued: DateTime<Utc>,
        expires: DateTime<Utc>,
        scope: Vec<String>,
        token_type: String,
        refresh_token: String,
        signature: String,
        access_token: String,
        api_url: String,
    ) -> Self {
        Self {
            id,
            issued,
            expires,
            scope,
            token_type,
            refresh_token,
            signature,
            access_token,
            api_url,
        }
    }

    /// Whether the token has reached its expiry.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    /// `needs_refresh` against an explicit clock. The boundary is inclusive.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    /// Apply a refresh-grant response in place.
    ///
    /// Issue and expiry are recomputed from `issued_at`. `signature` and
    /// `access_token` are overwritten; a field missing from the response
    /// becomes an empty string. Id, refresh token, scope and API URL are kept.
    pub fn refresh(&mut self, update: &RefreshResponse) -> &mut Self {
        self.issued = update.issued_at;
        self.expires = expiry_for(update.issued_at);
        self.signature = update.signature.clone().unwrap_or_default();
        self.access_token = update.access_token.clone().unwrap_or_default();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn issued(&self) -> DateTime<Utc> {
        self.issued
    }

    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Instance URL that REST calls are made against.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn to_snapshot(&self) -> CredentialSnapshot {
        CredentialSnapshot::from(self)
    }

    /// Serialize the snapshot form to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_snapshot())
            .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("issued", &self.issued)
            .field("expires", &self.expires)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("refresh_token", &"[REDACTED]")
            .field("signature", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Persisted form of a `Credential`.
///
/// Field order is the serialized order. Dates use `SNAPSHOT_DATE_FORMAT` in
/// UTC, so a round trip keeps one-second resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSnapshot {
    #[serde(default)]
    pub id: String,
    pub date_issued: String,
    pub date_expires: String,
    #[serde(default, deserialize_with = "scope_list")]
    pub scope: Vec<String>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub api_url: String,
}

impl From<&Credential> for CredentialSnapshot {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id.clone(),
            date_issued: format_date(credential.issued),
            date_expires: format_date(credential.expires),
            scope: credential.scope.clone(),
            token_type: credential.token_type.clone(),
            refresh_token: credential.refresh_token.clone(),
            signature: credential.signature.clone(),
            access_token: credential.access_token.clone(),
            api_url: credential.api_url.clone(),
        }
    }
}

pub(crate) fn format_date(date: DateTime<Utc>) -> String {
    date.format(SNAPSHOT_DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), SNAPSHOT_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::CredentialParse(format!("{field} {value:?}: {e}")))
}

/// Split a space-delimited scope string, dropping duplicates and keeping
/// first-seen order.
pub(crate) fn split_scope(raw: &str) -> Vec<String> {
    let mut scope: Vec<String> = Vec::new();
    for item in raw.split_whitespace() {
        if !scope.iter().any(|s| s == item) {
            scope.push(item.to_string());
        }
    }
    scope
}

/// Accept the scope as either an array or a space-delimited string.
fn scope_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(list) => list,
        Raw::Joined(joined) => split_scope(&joined),
    })
}
