//! Salesforce OAuth constants

/// Token endpoint path (password, authorization-code and refresh grants),
/// relative to the login URL
pub const TOKEN_PATH: &str = "services/oauth2/token";

/// Authorization endpoint path for the web-server flow
pub const AUTHORIZE_PATH: &str = "services/oauth2/authorize";

/// Timestamp layout of the persisted snapshot (`dateIssued`, `dateExpires`)
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lifetime assigned to every access token: the platform's 60-minute
/// session minus a 5-minute margin.
pub const TOKEN_LIFETIME_MINUTES: i64 = 55;
