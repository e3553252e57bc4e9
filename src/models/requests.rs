//! Request parsing for the cache server API
//!
//! Inserts carry their TTL in HTTP headers rather than in the body.

use axum::http::HeaderMap;

/// Relative TTL in seconds.
pub const EXPIRES_SEC_HEADER: &str = "X-Content-Expires-Sec";
/// Absolute expiration instant in Unix seconds.
pub const EXPIRES_AT_HEADER: &str = "X-Content-Expires-At";

/// TTL settings of an insert (POST /<key>)
///
/// Resolution order: `X-Content-Expires-Sec`, then `X-Content-Expires-At`,
/// then the server default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiresRequest {
    /// Relative TTL in seconds
    InSeconds(i64),
    /// Absolute Unix timestamp
    At(i64),
    /// No header given
    Default,
}

impl ExpiresRequest {
    /// Reads the TTL headers.
    ///
    /// Returns an error message if a header is present but not an integer.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, String> {
        if let Some(value) = headers.get(EXPIRES_SEC_HEADER) {
            return parse_header(EXPIRES_SEC_HEADER, value).map(Self::InSeconds);
        }
        if let Some(value) = headers.get(EXPIRES_AT_HEADER) {
            return parse_header(EXPIRES_AT_HEADER, value).map(Self::At);
        }
        Ok(Self::Default)
    }

    /// Resolves to a TTL in seconds relative to `now`.
    ///
    /// Returns an error message if the resulting TTL is below one second.
    pub fn ttl_secs(self, now: i64, default_ttl: i64) -> Result<i64, String> {
        let ttl = match self {
            Self::InSeconds(secs) => secs,
            Self::At(at) => at.saturating_sub(now),
            Self::Default => default_ttl,
        };

        if ttl < 1 {
            return Err(format!(
                "Improper value of {} or {} HTTP header",
                EXPIRES_SEC_HEADER, EXPIRES_AT_HEADER
            ));
        }
        Ok(ttl)
    }
}

fn parse_header(name: &str, value: &axum::http::HeaderValue) -> Result<i64, String> {
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| format!("Improper value of {} HTTP header", name))
}
