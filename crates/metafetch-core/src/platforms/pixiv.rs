//! Pixiv illustrations.
//!
//! `pixiv!<pid>-<page>` addresses one page of a multi-page work. Every page
//! shares the work's cache entry.

use super::{fetch_json, non_empty};
use crate::cache::CacheExt;
use crate::discovery::Discover;
use crate::html;
use crate::plugin::{Platform, RegistryBuilder};
use crate::types::{ParsedInfo, ResolvedInfo};
use crate::{Error, Pipeline, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PIXIV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pixiv[!:](\d+)(?:[!-](\d+))?$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^pid=(\d+)$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static APP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pixiv://illusts/(\d+)(?:$|[?#])").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ARTWORKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^www\.pixiv\.net/(?:en/)?artworks/(\d+)(?:$|[?#])").unwrap());

pub(crate) fn install(builder: &mut RegistryBuilder) -> Result<()> {
    builder.define_discover(
        Discover::new("Pixiv", discover)
            .bare([&*PIXIV_RE, &*PID_RE, &*APP_RE])
            .http([&*ARTWORKS_RE]),
    );
    builder.define_plugin(Illust)?;
    Ok(())
}

fn discover(m: &Captures<'_>, _: &Regex) -> Option<String> {
    Some(match m.get(2) {
        Some(page) => format!("pixiv/illust/{}/{}", &m[1], page.as_str()),
        None => format!("pixiv/illust/{}", &m[1]),
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// One tag of an illustration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllustTag {
    /// Tag text.
    pub tag: String,
}

/// Tag block of an illustration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllustTags {
    /// Tags in display order.
    #[serde(default)]
    pub tags: Vec<IllustTag>,
}

/// Image URLs of an illustration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllustUrls {
    /// Thumbnail, when listed.
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Summary of another work by the same user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIllust {
    /// Thumbnail of that work.
    #[serde(default)]
    pub url: Option<String>,
}

/// Cached body of `ajax/illust/<pid>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustBody {
    /// Illustration title.
    #[serde(default)]
    pub title: String,
    /// Author's user id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Author's display name.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Upload time, RFC 3339.
    #[serde(default)]
    pub upload_date: Option<String>,
    /// Description markup.
    #[serde(default)]
    pub description: String,
    /// Number of pages.
    #[serde(default)]
    pub page_count: Option<u32>,
    /// Attached tags.
    #[serde(default)]
    pub tags: IllustTags,
    /// Image URLs.
    #[serde(default)]
    pub urls: IllustUrls,
    /// Other works by the same user, keyed by id; entries may be `null`.
    #[serde(default)]
    pub user_illusts: HashMap<String, Option<UserIllust>>,
}

#[derive(Debug, Deserialize)]
struct AjaxEnvelope {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
    /// An empty array rather than an object when `error` is set.
    #[serde(default)]
    body: Value,
}

/// A Pixiv illustration, optionally one page of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Illust;

#[async_trait]
impl Platform for Illust {
    type Data = IllustBody;

    fn name(&self) -> &'static str {
        "Pixiv Illust"
    }

    fn path(&self) -> &'static str {
        "pixiv/illust"
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        let (pid, page) = match path {
            [pid] => (pid, None),
            [pid, page] => (pid, Some(page)),
            _ => return None,
        };
        if !is_digits(pid) || !page.is_none_or(|p| is_digits(p)) {
            return None;
        }
        let suffix = page.map(|p| format!("-{p}")).unwrap_or_default();
        Some(ResolvedInfo::new(
            format!("pixiv!{pid}{suffix}"),
            format!("pixiv:{pid}{suffix}"),
            format!("pixiv!{pid}"),
            "",
            format!("https://www.pixiv.net/artworks/{pid}"),
        ))
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<IllustBody>> {
        let Some(pid) = info.cache_id().strip_prefix("pixiv!").map(str::to_string) else {
            return Ok(None);
        };
        let owned = pipeline.clone();
        pipeline
            .cache()
            .json(info.cache_id(), async move {
                let url = format!("https://www.pixiv.net/ajax/illust/{pid}");
                let envelope: AjaxEnvelope = fetch_json(owned.http(), &url).await?;
                if envelope.error {
                    return Err(Error::Upstream(envelope.message));
                }
                match envelope.body {
                    Value::Null => Ok(None),
                    body => Ok(Some(serde_json::from_value(body)?)),
                }
            })
            .await
    }

    fn parse(&self, data: &IllustBody, info: &ResolvedInfo) -> Option<ParsedInfo> {
        let pid = info.cache_id().strip_prefix("pixiv!")?;
        let mut parsed = ParsedInfo::new(data.title.clone());
        parsed.keywords = non_empty(
            data.tags
                .tags
                .iter()
                .map(|t| t.tag.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        parsed.thumbnail_url = data.urls.thumb.clone().or_else(|| {
            data.user_illusts
                .get(pid)
                .and_then(|illust| illust.as_ref()?.url.clone())
        });
        parsed.owner_name = data.user_name.clone();
        parsed.owner_url = data
            .user_id
            .as_ref()
            .map(|uid| format!("https://www.pixiv.net/users/{uid}"));
        parsed.publish_date = data.upload_date.clone();
        parsed.description = non_empty(html::to_text(&data.description, false));
        Some(parsed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{Config, Registry};
    use serde_json::json;

    fn registry() -> Registry {
        Registry::builtin(&Config::default()).unwrap()
    }

    #[test]
    fn test_input_forms() {
        let registry = registry();

        for input in [
            "pixiv:12345",
            "pixiv!12345",
            "pid=12345",
            "pixiv://illusts/12345",
            "https://www.pixiv.net/artworks/12345",
            "https://www.pixiv.net/en/artworks/12345#big_0",
        ] {
            let info = registry.resolve(input).unwrap();
            assert_eq!(info.id(), "pixiv!12345", "{input}");
            assert_eq!(info.display_id(), "pixiv:12345");
            assert_eq!(info.short_url(), "");
            assert_eq!(info.url(), "https://www.pixiv.net/artworks/12345");
        }
    }

    #[test]
    fn test_pages_share_cache_id() {
        let registry = registry();

        // Given: Two spellings of page 2 and the work itself
        let page = registry.resolve("pixiv:12345-2").unwrap();
        let bang = registry.resolve("pixiv!12345!2").unwrap();
        let work = registry.resolve("pixiv:12345").unwrap();

        // Then: Ids differ per page but the cache entry is shared
        assert_eq!(page.id(), "pixiv!12345-2");
        assert_eq!(page.display_id(), "pixiv:12345-2");
        assert_eq!(bang.id(), "pixiv!12345-2");
        assert_eq!(page.cache_id(), work.cache_id());
        assert_eq!(page.url(), work.url());
    }

    #[test]
    fn test_parse_illust() {
        let info = registry().resolve("pixiv:12345-1").unwrap();
        let body: IllustBody = serde_json::from_value(json!({
            "title": "Illust",
            "userId": "77",
            "userName": "artist",
            "uploadDate": "2020-01-01T00:00:00+00:00",
            "description": "a<br />b &amp; c",
            "tags": {"tags": [{"tag": "オリジナル"}, {"tag": "girl"}]},
            "urls": {"thumb": null},
            "userIllusts": {"12345": {"url": "https://i.pximg.net/t.jpg"}, "1": null},
            "zoneConfig": {"ignored": true}
        }))
        .unwrap();

        let parsed = Platform::parse(&Illust, &body, &info).unwrap();

        assert_eq!(parsed.title, "Illust");
        assert_eq!(parsed.keywords.as_deref(), Some("オリジナル,girl"));
        assert_eq!(parsed.thumbnail_url.as_deref(), Some("https://i.pximg.net/t.jpg"));
        assert_eq!(parsed.owner_name.as_deref(), Some("artist"));
        assert_eq!(parsed.owner_url.as_deref(), Some("https://www.pixiv.net/users/77"));
        assert_eq!(parsed.publish_date.as_deref(), Some("2020-01-01T00:00:00+00:00"));
        assert_eq!(parsed.description.as_deref(), Some("a\nb & c"));
    }

    #[test]
    fn test_thumb_preferred_over_user_illusts() {
        let info = registry().resolve("pixiv:1").unwrap();
        let body = IllustBody {
            title: "t".into(),
            urls: IllustUrls { thumb: Some("https://thumb".into()) },
            user_illusts: HashMap::from([(
                "1".to_string(),
                Some(UserIllust { url: Some("https://other".into()) }),
            )]),
            ..IllustBody::default()
        };

        let parsed = Platform::parse(&Illust, &body, &info).unwrap();

        assert_eq!(parsed.thumbnail_url.as_deref(), Some("https://thumb"));
    }
}
