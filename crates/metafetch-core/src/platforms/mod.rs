//! Built-in platform plugins.
//!
//! Each module owns its discovery patterns and plugin(s) and exposes an
//! `install` function. [`install`] registers them all in a fixed order;
//! earlier discovery entries win when patterns overlap.

pub mod bilibili;
pub mod meta;
pub mod niconico;
pub mod pixiv;
pub mod vsqx;

use crate::http::{HttpFetch, HttpRequest};
use crate::plugin::RegistryBuilder;
use crate::{Config, Result};
use chrono::{DateTime, SecondsFormat};
use serde::de::DeserializeOwned;

/// Register every built-in platform.
pub fn install(builder: &mut RegistryBuilder, config: &Config) -> Result<()> {
    meta::install(builder);
    bilibili::install(builder)?;
    niconico::install(builder, config.nico_url_type)?;
    pixiv::install(builder)?;
    vsqx::install(builder)?;
    Ok(())
}

/// GET `url` as JSON, failing on any status other than 200.
pub(crate) async fn fetch_json<T: DeserializeOwned>(http: &dyn HttpFetch, url: &str) -> Result<T> {
    http.fetch(&HttpRequest::json(url))
        .await?
        .ensure_ok(url)?
        .json()
}

/// Upgrade `http:` and protocol-relative links to `https:`.
pub(crate) fn to_https(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{rest}")
    } else if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

/// Unix seconds as an RFC 3339 UTC timestamp.
pub(crate) fn format_timestamp(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Decimal digits without a redundant leading zero (`0` alone is fine).
pub(crate) fn is_canonical_number(digits: &str) -> bool {
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !(digits.len() > 1 && digits.starts_with('0'))
}

/// `Some` unless `s` is blank.
pub(crate) fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    (!s.trim().is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_https() {
        assert_eq!(to_https("http://i0.hdslb.com/a.jpg"), "https://i0.hdslb.com/a.jpg");
        assert_eq!(to_https("//i0.hdslb.com/a.jpg"), "https://i0.hdslb.com/a.jpg");
        assert_eq!(to_https("https://x/y"), "https://x/y");
        assert_eq!(to_https(""), "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_262_304_000).as_deref(), Some("2010-01-01T00:00:00Z"));
    }

    #[test]
    fn test_is_canonical_number() {
        assert!(is_canonical_number("0"));
        assert!(is_canonical_number("170001"));
        assert!(!is_canonical_number("0170001"));
        assert!(!is_canonical_number(""));
        assert!(!is_canonical_number("12a"));
    }
}
