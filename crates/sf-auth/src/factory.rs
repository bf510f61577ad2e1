//! Building credentials from the token endpoint and from storage
//!
//! The token endpoint answers with two shapes: the full grant (login and
//! authorization-code exchange) and the refresh-only response, which omits
//! `refresh_token`, `scope` and `instance_url`. The third input is the
//! persisted snapshot. Each has its own typed struct and named constructor so
//! every defaulted field is visible here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::credential::{Credential, CredentialSnapshot, expiry_for, parse_date, split_scope};
use crate::error::{Error, Result};

/// Epoch values above this are milliseconds (the platform's actual format).
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Full grant response from the password or authorization-code grant.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantResponse {
    /// Identity URL of the authenticated user
    #[serde(default)]
    pub id: String,
    #[serde(deserialize_with = "issued_at")]
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub token_type: String,
    /// Space-delimited
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub instance_url: String,
}

/// Response from the refresh-token grant.
///
/// Only the fields `Credential::refresh` consumes are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    #[serde(deserialize_with = "issued_at")]
    pub issued_at: DateTime<Utc>,
    pub signature: Option<String>,
    pub access_token: Option<String>,
}

/// Named constructors for `Credential`.
pub struct CredentialFactory;

impl CredentialFactory {
    /// Build from a full grant. Expiry is derived from `issued_at`.
    ///
    /// Rejects a grant without an access token. A missing refresh token is
    /// allowed: the password grant does not issue one.
    pub fn from_grant(grant: GrantResponse) -> Result<Credential> {
        if grant.access_token.is_empty() {
            return Err(Error::InvalidCredentials(
                "grant response has no access_token".into(),
            ));
        }
        debug!(issued_at = %grant.issued_at, instance_url = %grant.instance_url, "credential built from grant");

        Ok(Credential::new(
            grant.id,
            grant.issued_at,
            expiry_for(grant.issued_at),
            split_scope(&grant.scope),
            grant.token_type,
            grant.refresh_token,
            grant.signature,
            grant.access_token,
            grant.instance_url,
        ))
    }

    /// Decode a grant response body, then `from_grant`.
    pub fn from_grant_body(body: &str) -> Result<Credential> {
        let grant: GrantResponse = serde_json::from_str(body)
            .map_err(|e| Error::CredentialParse(format!("invalid grant response: {e}")))?;
        Self::from_grant(grant)
    }

    /// Build the successor of `prior` from a refresh-only response.
    ///
    /// `prior` is left untouched, so the caller can swap the result in as a
    /// single step.
    pub fn from_refresh(prior: &Credential, response: &RefreshResponse) -> Credential {
        let mut next = prior.clone();
        next.refresh(response);
        next
    }

    /// Decode a refresh response body, then `from_refresh`.
    pub fn from_refresh_body(prior: &Credential, body: &str) -> Result<Credential> {
        let response: RefreshResponse = serde_json::from_str(body)
            .map_err(|e| Error::CredentialParse(format!("invalid refresh response: {e}")))?;
        Ok(Self::from_refresh(prior, &response))
    }

    /// Rebuild from a persisted snapshot. Stored dates are used as-is.
    pub fn from_snapshot(snapshot: CredentialSnapshot) -> Result<Credential> {
        let issued = parse_date("dateIssued", &snapshot.date_issued)?;
        let expires = parse_date("dateExpires", &snapshot.date_expires)?;

        Ok(Credential::new(
            snapshot.id,
            issued,
            expires,
            snapshot.scope,
            snapshot.token_type,
            snapshot.refresh_token,
            snapshot.signature,
            snapshot.access_token,
            snapshot.api_url,
        ))
    }

    /// Decode a snapshot JSON document, then `from_snapshot`.
    pub fn from_json(json: &str) -> Result<Credential> {
        let snapshot: CredentialSnapshot = serde_json::from_str(json)
            .map_err(|e| Error::CredentialParse(format!("invalid credential snapshot: {e}")))?;
        Self::from_snapshot(snapshot)
    }
}

/// `issued_at` arrives as a number or a numeric string, in seconds or
/// milliseconds since the epoch.
fn issued_at<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
    use serde::de::Error as _;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| D::Error::custom(format!("issued_at {s:?}: {e}")))?,
    };

    let parsed = if value.abs() > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    };
    parsed.ok_or_else(|| D::Error::custom(format!("issued_at {value} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const FULL_GRANT: &str = r#"{
        "id": "https://login.salesforce.com/id/00D50000000IZ3ZEAW/00550000001fg5OAAQ",
        "issued_at": "1470764688209",
        "scope": "api refresh_token web",
        "token_type": "Bearer",
        "refresh_token": "5Aep861KIwKdekr90I4iHdtDgWwRoG7O_6uHrgJ",
        "signature": "VGVzdCBsaWJyYXJ5Lg==",
        "access_token": "00D50000000IZ3Z!AQ0AQDpEDKYsn7ioKug2aSmgCjgrPjG9",
        "instance_url": "https://na1.salesforce.com"
    }"#;

    fn prior() -> Credential {
        CredentialFactory::from_grant_body(FULL_GRANT).unwrap()
    }

    #[test]
    fn full_grant_builds_every_field() {
        let credential = prior();
        let issued = DateTime::from_timestamp_millis(1_470_764_688_209).unwrap();

        assert_eq!(
            credential.id(),
            "https://login.salesforce.com/id/00D50000000IZ3ZEAW/00550000001fg5OAAQ"
        );
        assert_eq!(credential.issued(), issued);
        assert_eq!(credential.expires(), issued + Duration::minutes(55));
        assert_eq!(credential.scope(), ["api", "refresh_token", "web"]);
        assert_eq!(credential.token_type(), "Bearer");
        assert_eq!(credential.refresh_token(), "5Aep861KIwKdekr90I4iHdtDgWwRoG7O_6uHrgJ");
        assert_eq!(credential.signature(), "VGVzdCBsaWJyYXJ5Lg==");
        assert_eq!(credential.access_token(), "00D50000000IZ3Z!AQ0AQDpEDKYsn7ioKug2aSmgCjgrPjG9");
        assert_eq!(credential.api_url(), "https://na1.salesforce.com");
    }

    #[test]
    fn numeric_seconds_issued_at() {
        let credential = CredentialFactory::from_grant_body(
            r#"{"issued_at": 1429281826, "access_token": "at", "instance_url": ""}"#,
        )
        .unwrap();
        let issued = Utc.timestamp_opt(1_429_281_826, 0).unwrap();
        assert_eq!(credential.issued(), issued);
        assert_eq!(credential.expires().timestamp(), 1_429_281_826 + 55 * 60);
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let credential = CredentialFactory::from_grant_body(
            r#"{"issued_at": "1429281826", "access_token": "at_only"}"#,
        )
        .unwrap();
        assert_eq!(credential.id(), "");
        assert_eq!(credential.refresh_token(), "");
        assert_eq!(credential.signature(), "");
        assert_eq!(credential.token_type(), "");
        assert!(credential.scope().is_empty());
        assert_eq!(credential.api_url(), "");
    }

    #[test]
    fn grant_without_access_token_is_rejected() {
        let err = CredentialFactory::from_grant_body(r#"{"issued_at": 1429281826}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
    }

    #[test]
    fn grant_without_issued_at_is_rejected() {
        let err = CredentialFactory::from_grant_body(r#"{"access_token": "at"}"#).unwrap_err();
        assert!(matches!(err, Error::CredentialParse(_)), "got: {err:?}");
    }

    #[test]
    fn non_numeric_issued_at_is_rejected() {
        let err = CredentialFactory::from_grant_body(r#"{"issued_at": "yesterday", "access_token": "at"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("issued_at"), "got: {err}");
    }

    #[test]
    fn refresh_response_preserves_identity_fields() {
        let prior = prior();
        let next = CredentialFactory::from_refresh_body(
            &prior,
            r#"{
                "id": "https://login.salesforce.com/id/00D/005",
                "issued_at": "1470768288209",
                "signature": "bmV3LXNpZw==",
                "access_token": "00D50000000IZ3Z!new",
                "token_type": "Bearer",
                "instance_url": "https://na2.salesforce.com"
            }"#,
        )
        .unwrap();

        let issued = DateTime::from_timestamp_millis(1_470_768_288_209).unwrap();
        assert_eq!(next.issued(), issued);
        assert_eq!(next.expires(), issued + Duration::minutes(55));
        assert_eq!(next.access_token(), "00D50000000IZ3Z!new");
        assert_eq!(next.signature(), "bmV3LXNpZw==");

        assert_eq!(next.id(), prior.id());
        assert_eq!(next.refresh_token(), prior.refresh_token());
        assert_eq!(next.scope(), prior.scope());
        assert_eq!(next.api_url(), prior.api_url());

        // prior is a separate value
        assert_eq!(prior.access_token(), "00D50000000IZ3Z!AQ0AQDpEDKYsn7ioKug2aSmgCjgrPjG9");
    }

    #[test]
    fn refresh_response_without_issued_at_is_rejected() {
        let err = CredentialFactory::from_refresh_body(&prior(), r#"{"access_token": "at"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::CredentialParse(_)));
    }

    #[test]
    fn snapshot_round_trip_keeps_all_fields() {
        let original = prior();
        let restored = CredentialFactory::from_json(&original.to_json().unwrap()).unwrap();

        assert_eq!(restored.id(), original.id());
        assert_eq!(restored.issued().timestamp(), original.issued().timestamp());
        assert_eq!(restored.expires().timestamp(), original.expires().timestamp());
        assert_eq!(restored.scope(), original.scope());
        assert_eq!(restored.token_type(), original.token_type());
        assert_eq!(restored.refresh_token(), original.refresh_token());
        assert_eq!(restored.signature(), original.signature());
        assert_eq!(restored.access_token(), original.access_token());
        assert_eq!(restored.api_url(), original.api_url());
    }

    #[test]
    fn snapshot_dates_are_taken_verbatim() {
        let credential = CredentialFactory::from_json(
            r#"{
                "id": "",
                "dateIssued": "2015-01-02 10:11:12",
                "dateExpires": "2015-01-02 11:11:12",
                "scope": [],
                "tokenType": "",
                "refreshToken": "",
                "signature": "",
                "accessToken": "",
                "apiUrl": ""
            }"#,
        )
        .unwrap();
        assert_eq!(credential.to_snapshot().date_issued, "2015-01-02 10:11:12");
        assert_eq!(credential.to_snapshot().date_expires, "2015-01-02 11:11:12");
    }

    #[test]
    fn snapshot_with_bad_date_is_rejected() {
        let err = CredentialFactory::from_json(r#"{"dateIssued": "", "dateExpires": ""}"#).unwrap_err();
        assert!(err.to_string().contains("dateIssued"), "got: {err}");
    }
}
