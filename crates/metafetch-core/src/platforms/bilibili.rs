//! Bilibili videos (`av`/`BV` ids), `b23.tv` short links and `cv` articles.
//!
//! `BV` ids are decoded to their `av` form during discovery so both spellings
//! share one record. A `BV` id that does not decode is kept verbatim as
//! `raw!BV1...`. Short links and articles resolve to meta records that are
//! chased through their redirect.

use super::{fetch_json, format_timestamp, is_canonical_number, non_empty, to_https};
use crate::cache::CacheExt;
use crate::codec;
use crate::discovery::Discover;
use crate::html;
use crate::http::{HttpFetch, HttpRequest};
use crate::plugin::{Platform, Redirected, RegistryBuilder};
use crate::types::{ParsedInfo, ResolvedInfo};
use crate::{Error, Pipeline, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, info};

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static AV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[aA][vV](\d{1,16})$").unwrap());

/// `BV1` followed by nine base58 characters.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[bB][vV]1([1-9A-HJ-NP-Za-km-z]{9})$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([aA][vV]\d{1,16}|[bB][vV]1[1-9A-HJ-NP-Za-km-z]{9})$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static B23_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:b23\.tv|bili2{0,2}3{0,2}\.cn)/([-\w]+)(?:$|[?#])").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static FULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:m|www)\.bilibili\.com/video/(\w+)/?(?:$|[?#])").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static WATCH_LATER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^www\.bilibili\.com/list/watchlater/?\?(?:\S*?&)??bvid=(\w+)").unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static META_B23_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@(b23)!([-\w]+)$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static APP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bilibili://(video)/(\d{1,16})$").unwrap());

/// Force the `BV` spelling of an `av` id.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static FORCE_BV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(bv)!([aA][vV]\d{1,16})$").unwrap());

/// Keep a `BV` id undecoded.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static RAW_BV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(raw)!([bB][vV]1\w{9})$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@?cv(\d+)$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ARTICLE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^www\.bilibili\.com/(?:read/cv|mobile\?id=)(\d+)(?:$|[/?#&])").unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static INITIAL_STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*window\.__INITIAL_STATE__\s*=\s*").unwrap());

pub(crate) fn install(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .define_discover(
            Discover::new("Bilibili", discover)
                .bare([&*BARE_ID_RE])
                .http([&*B23_RE, &*FULL_RE, &*WATCH_LATER_RE]),
        )
        .define_discover(
            Discover::new("Bilibili (extended)", discover_extended).bare([
                &*META_B23_RE,
                &*APP_RE,
                &*FORCE_BV_RE,
                &*RAW_BV_RE,
            ]),
        )
        .define_discover(
            Discover::new("Bilibili article", discover_article)
                .bare([&*ARTICLE_RE])
                .http([&*ARTICLE_URL_RE]),
        );
    builder.define_plugin(Video)?;
    builder.define_plugin(ShortLink)?;
    builder.define_plugin(Article)?;
    Ok(())
}

/// `av` id with canonical digits.
fn is_av(id: &str) -> bool {
    AV_RE
        .captures(id)
        .is_some_and(|caps| is_canonical_number(&caps[1]))
}

fn discover(m: &Captures<'_>, reg: &Regex) -> Option<String> {
    let id = &m[1];
    if is_av(id) {
        return Some(format!("bilibili/video/{id}"));
    }
    if BV_RE.is_match(id) {
        let id = codec::decode_av(id).unwrap_or_else(|| id.to_string());
        return Some(format!("bilibili/video/{id}"));
    }
    std::ptr::eq(reg, &*B23_RE).then(|| format!("bilibili/b23/{id}"))
}

fn discover_extended(m: &Captures<'_>, _: &Regex) -> Option<String> {
    let value = &m[2];
    match &m[1] {
        "b23" => Some(format!("bilibili/b23/{value}")),
        "video" => is_canonical_number(value).then(|| format!("bilibili/video/av{value}")),
        "bv" if is_av(value) => {
            let id = codec::encode_av(value).unwrap_or_else(|| value.to_string());
            Some(format!("bilibili/video/{id}"))
        },
        "raw" => Some(format!("bilibili/video/{value}")),
        _ => None,
    }
}

fn discover_article(m: &Captures<'_>, _: &Regex) -> Option<String> {
    Some(format!("bilibili/article/cv{}", &m[1]))
}

fn short_url(id: &str) -> String {
    format!("https://b23.tv/{id}")
}

fn video_url(id: &str) -> String {
    format!("https://www.bilibili.com/video/{id}/")
}

/// Error block of the page state; only present when it carries a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    /// Platform error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable reason.
    pub message: String,
}

impl PageError {
    fn from_state(value: &Value) -> Option<Self> {
        let message = value.get("message")?.as_str()?.to_string();
        let code = value
            .get("trueCode")
            .or_else(|| value.get("code"))
            .and_then(Value::as_i64);
        Some(Self { code, message })
    }
}

/// Uploader of a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// User id.
    #[serde(default)]
    pub mid: Option<u64>,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Co-creator of a collaborative upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Role in the collaboration.
    #[serde(default)]
    pub title: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// The `videoData` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Numeric id.
    #[serde(default)]
    pub aid: Option<u64>,
    /// `BV` spelling of the id.
    #[serde(default)]
    pub bvid: Option<String>,
    /// Video title.
    #[serde(default)]
    pub title: String,
    /// Cover image.
    #[serde(default)]
    pub pic: String,
    /// Publication time, seconds since the epoch.
    #[serde(default)]
    pub pubdate: Option<i64>,
    /// Description.
    #[serde(default)]
    pub desc: String,
    /// Uploader.
    #[serde(default)]
    pub owner: Owner,
    /// Co-creators, for collaborative uploads.
    #[serde(default)]
    pub staff: Option<Vec<Staff>>,
}

/// A tag attached to a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag text.
    #[serde(default)]
    pub tag_name: String,
    /// Tag kind; only `old_channel` tags become keywords.
    #[serde(default)]
    pub tag_type: String,
}

/// Cached payload of one video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    /// Set when the page reported the video unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
    /// Where the page redirected to when the API was used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Video details.
    #[serde(default)]
    pub video_data: Option<VideoInfo>,
    /// Attached tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl VideoPage {
    /// Keep the parts of `window.__INITIAL_STATE__` that parsing needs.
    fn from_state(mut state: Value) -> Result<Self> {
        let error = state.get("error").and_then(PageError::from_state);
        let video_data = match state.get_mut("videoData").map(Value::take) {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value)?),
        };
        let tags = match state.get_mut("tags").map(Value::take) {
            Some(value @ Value::Array(_)) => serde_json::from_value(value)?,
            _ => Vec::new(),
        };
        Ok(Self {
            error,
            redirect: None,
            video_data,
            tags,
        })
    }
}

/// `{code, message, data}` envelope of the web APIs.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn into_data(self, what: &str) -> Result<T> {
        self.data
            .ok_or_else(|| Error::Upstream(format!("{what}: {} ({})", self.message, self.code)))
    }
}

/// Load the payload from the web APIs when the page itself redirects.
async fn load_from_api(http: &dyn HttpFetch, raw_id: &str, location: String) -> Result<VideoPage> {
    let query = if let Some(caps) = AV_RE.captures(raw_id) {
        format!("aid={}", &caps[1])
    } else if BV_RE.is_match(raw_id) {
        format!("bvid={raw_id}")
    } else {
        return Err(Error::Upstream(format!("Cannot query {raw_id}")));
    };
    info!(id = raw_id, %location, "Video page redirected, using API");
    let view: ApiEnvelope<VideoInfo> = fetch_json(
        http,
        &format!("https://api.bilibili.com/x/web-interface/view?{query}"),
    )
    .await?;
    let tags: ApiEnvelope<Vec<Tag>> = fetch_json(
        http,
        &format!("https://api.bilibili.com/x/tag/archive/tags?{query}"),
    )
    .await?;
    Ok(VideoPage {
        error: None,
        redirect: Some(location),
        video_data: Some(view.into_data("view")?),
        tags: tags.into_data("tags")?,
    })
}

async fn load_page(pipeline: &Pipeline, raw_id: &str, url: &str) -> Result<VideoPage> {
    let html = match pipeline.cache().get(&format!("{raw_id}.html")).await? {
        Some(html) => html,
        None => {
            let response = pipeline.http().fetch(&HttpRequest::html(url)).await?;
            if response.is_redirect() {
                if let Some(location) = response.location() {
                    return load_from_api(pipeline.http(), raw_id, location.to_string()).await;
                }
            }
            response.ensure_ok(url)?.body
        },
    };
    let state = html::script_json(&html, &INITIAL_STATE_RE)?
        .ok_or_else(|| Error::Parse(format!("No initial state in {url}")))?;
    VideoPage::from_state(state)
}

/// A Bilibili video.
#[derive(Debug, Clone, Copy, Default)]
pub struct Video;

#[async_trait]
impl Platform for Video {
    type Data = VideoPage;

    fn name(&self) -> &'static str {
        "Bilibili Video"
    }

    fn path(&self) -> &'static str {
        "bilibili/video"
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        let [id] = path else {
            return None;
        };
        let (id, raw_id) = if is_av(id) {
            let av = format!("av{}", &id[2..]);
            (av.clone(), av)
        } else if BV_RE.is_match(id) {
            let raw_id = format!("BV1{}", &id[3..]);
            (format!("raw!{raw_id}"), raw_id)
        } else {
            return None;
        };
        Some(ResolvedInfo::new(
            id,
            raw_id.clone(),
            raw_id.clone(),
            short_url(&raw_id),
            video_url(&raw_id),
        ))
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<VideoPage>> {
        let raw_id = info.cache_id().to_string();
        let url = info.url().to_string();
        let owned = pipeline.clone();
        pipeline
            .cache()
            .json(info.cache_id(), async move {
                load_page(&owned, &raw_id, &url).await.map(Some)
            })
            .await
    }

    fn parse(&self, data: &VideoPage, info: &ResolvedInfo) -> Option<ParsedInfo> {
        if let Some(error) = &data.error {
            debug!(id = info.id(), code = ?error.code, message = %error.message, "Video unavailable");
            return None;
        }
        let video = data.video_data.as_ref()?;
        let mut parsed = ParsedInfo::new(video.title.clone());
        if let Some(aid) = video.aid {
            let id = format!("av{aid}");
            parsed.short_url = Some(short_url(&id));
            parsed.url = Some(video_url(&id));
        }
        parsed.thumbnail_url = non_empty(to_https(&video.pic));
        parsed.keywords = non_empty(
            data.tags
                .iter()
                .filter(|tag| tag.tag_type == "old_channel")
                .map(|tag| tag.tag_name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        parsed.owner_name = match video.staff.as_deref() {
            Some(staff) if !staff.is_empty() => Some(
                staff
                    .iter()
                    .map(|s| format!("[{}]{}", s.title, s.name))
                    .collect::<Vec<_>>()
                    .join("；"),
            ),
            _ => non_empty(video.owner.name.clone()),
        };
        parsed.owner_url = video
            .owner
            .mid
            .map(|mid| format!("https://space.bilibili.com/{mid}"));
        parsed.publish_date = video.pubdate.and_then(format_timestamp);
        parsed.description = non_empty(html::to_text(&video.desc, true));
        Some(parsed)
    }
}

/// A `b23.tv` short link, resolved through its redirect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortLink;

#[async_trait]
impl Platform for ShortLink {
    type Data = Redirected;

    fn name(&self) -> &'static str {
        "Bilibili Short Link"
    }

    fn path(&self) -> &'static str {
        "bilibili/b23"
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        let [code] = path else {
            return None;
        };
        if code.is_empty() {
            return None;
        }
        Some(ResolvedInfo::simple(format!("@b23!{code}"), "", short_url(code)))
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<Redirected>> {
        Redirected::fetch(pipeline, info).await
    }

    fn parse(&self, data: &Redirected, _info: &ResolvedInfo) -> Option<ParsedInfo> {
        data.parse()
    }
}

/// A `cv` article; its page redirects to wherever the article now lives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Article;

#[async_trait]
impl Platform for Article {
    type Data = Redirected;

    fn name(&self) -> &'static str {
        "Bilibili Article"
    }

    fn path(&self) -> &'static str {
        "bilibili/article"
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        let [id] = path else {
            return None;
        };
        let number = id.strip_prefix("cv")?;
        if !is_canonical_number(number) {
            return None;
        }
        Some(ResolvedInfo::new(
            format!("@{id}"),
            id.as_str(),
            id.as_str(),
            "",
            format!("https://www.bilibili.com/read/{id}/"),
        ))
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<Redirected>> {
        Redirected::fetch(pipeline, info).await
    }

    fn parse(&self, data: &Redirected, _info: &ResolvedInfo) -> Option<ParsedInfo> {
        data.parse()
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

    fn id_of(registry: &Registry, input: &str) -> Option<String> {
        registry.resolve(input).map(|info| info.id().to_string())
    }

    #[test]
    fn test_av_and_bv_share_a_record() {
        let registry = registry();

        // Given/When: The same video spelled three ways
        let av = registry.resolve("av170001").unwrap();
        let bv = registry.resolve("BV17x411w7KC").unwrap();
        let url = registry
            .resolve("https://www.bilibili.com/video/BV17x411w7KC/?spm=1")
            .unwrap();

        // Then: All resolve to the canonical av record
        for info in [&av, &bv, &url] {
            assert_eq!(info.id(), "av170001");
            assert_eq!(info.cache_id(), "av170001");
            assert_eq!(info.short_url(), "https://b23.tv/av170001");
            assert_eq!(info.url(), "https://www.bilibili.com/video/av170001/");
        }
    }

    #[test]
    fn test_av_prefix_is_normalized() {
        let registry = registry();
        assert_eq!(id_of(&registry, "AV170001").as_deref(), Some("av170001"));
        assert_eq!(id_of(&registry, "bilibili://video/170001").as_deref(), Some("av170001"));
    }

    #[test]
    fn test_leading_zeros_are_rejected() {
        let registry = registry();
        assert_eq!(id_of(&registry, "av0170001"), None);
        assert_eq!(id_of(&registry, "bilibili://video/0170001"), None);
    }

    #[test]
    fn test_raw_and_forced_spellings() {
        let registry = registry();

        // Given: Explicit raw BV input
        let raw = registry.resolve("raw!BV17x411w7KC").unwrap();

        // Then: The id keeps the BV spelling
        assert_eq!(raw.id(), "raw!BV17x411w7KC");
        assert_eq!(raw.display_id(), "BV17x411w7KC");
        assert_eq!(raw.cache_id(), "BV17x411w7KC");
        assert_eq!(raw.url(), "https://www.bilibili.com/video/BV17x411w7KC/");

        // And: Forcing BV on an av id encodes it
        assert_eq!(
            id_of(&registry, "bv!av170001").as_deref(),
            Some("raw!BV17x411w7KC")
        );
    }

    #[test]
    fn test_watch_later_and_mobile_urls() {
        let registry = registry();
        assert_eq!(
            id_of(
                &registry,
                "https://www.bilibili.com/list/watchlater?oid=1&bvid=BV17x411w7KC&p=1"
            )
            .as_deref(),
            Some("av170001")
        );
        assert_eq!(
            id_of(&registry, "https://m.bilibili.com/video/av170001").as_deref(),
            Some("av170001")
        );
        assert_eq!(id_of(&registry, "https://www.bilibili.com/video/ss123/"), None);
    }

    #[test]
    fn test_short_links() {
        let registry = registry();

        for input in ["https://b23.tv/xYz12", "b23.tv/xYz12", "@b23!xYz12", "bili2233.cn/xYz12"] {
            let info = registry.resolve(input).unwrap();
            assert_eq!(info.id(), "@b23!xYz12", "{input}");
            assert!(info.is_meta());
            assert_eq!(info.short_url(), "");
            assert_eq!(info.url(), "https://b23.tv/xYz12");
        }

        // And: A short link spelling a video id goes straight to the video
        assert_eq!(id_of(&registry, "https://b23.tv/av170001").as_deref(), Some("av170001"));
    }

    #[test]
    fn test_article_inputs() {
        let registry = registry();

        for input in [
            "cv123",
            "@cv123",
            "https://www.bilibili.com/read/cv123",
            "https://www.bilibili.com/read/cv123/?from=search",
            "https://www.bilibili.com/mobile?id=123",
        ] {
            let info = registry.resolve(input).unwrap_or_else(|| panic!("{input}"));
            assert_eq!(info.id(), "@cv123", "{input}");
            assert!(info.is_meta());
            assert_eq!(info.display_id(), "cv123");
            assert_eq!(info.cache_id(), "cv123");
            assert_eq!(info.short_url(), "");
            assert_eq!(info.url(), "https://www.bilibili.com/read/cv123/");
            assert_eq!(registry.plugin_for(&info).unwrap().name(), "Bilibili Article");
        }

        assert_eq!(id_of(&registry, "cv0123"), None);
        assert_eq!(id_of(&registry, "@cv0123"), None);
        assert_eq!(id_of(&registry, "cv"), None);
    }

    #[test]
    fn test_page_state_is_trimmed_to_needed_fields() {
        let state = json!({
            "error": {},
            "videoData": {"aid": 170_001, "title": "T", "pic": "http://i0/p.jpg", "owner": {"mid": 9, "name": "n"}, "stat": {"view": 1}},
            "tags": [{"tag_name": "a", "tag_type": "old_channel"}],
            "upData": {"ignored": true}
        });

        let page = VideoPage::from_state(state).unwrap();

        assert_eq!(page.error, None);
        assert_eq!(page.video_data.as_ref().unwrap().aid, Some(170_001));
        assert_eq!(page.tags.len(), 1);
    }

    #[test]
    fn test_page_error_is_kept_and_parse_declines() {
        let state = json!({"error": {"trueCode": -404, "message": "啊叻？视频不见了？"}, "videoData": null});
        let page = VideoPage::from_state(state).unwrap();
        let info = registry().resolve("av1").unwrap();

        assert_eq!(page.error.as_ref().unwrap().code, Some(-404));
        assert_eq!(Platform::parse(&Video, &page, &info), None);
    }

    #[test]
    fn test_parse_video() {
        // Given: A payload with channel tags, staff and an aid
        let info = registry().resolve("raw!BV17x411w7KC").unwrap();
        let page = VideoPage {
            video_data: Some(VideoInfo {
                aid: Some(170_001),
                title: "Title".into(),
                pic: "//i0.hdslb.com/p.jpg".into(),
                pubdate: Some(1_262_304_000),
                desc: "line1\nline2 &amp; more".into(),
                owner: Owner { mid: Some(2), name: "owner".into() },
                staff: Some(vec![
                    Staff { title: "UP主".into(), name: "a".into() },
                    Staff { title: "参与".into(), name: "b".into() },
                ]),
                ..VideoInfo::default()
            }),
            tags: vec![
                Tag { tag_name: "music".into(), tag_type: "old_channel".into() },
                Tag { tag_name: "topic".into(), tag_type: "topic".into() },
                Tag { tag_name: "vocaloid".into(), tag_type: "old_channel".into() },
            ],
            ..VideoPage::default()
        };

        // When: Parsing
        let parsed = Platform::parse(&Video, &page, &info).unwrap();

        // Then: Fields are normalized and links switch to the av spelling
        assert_eq!(parsed.title, "Title");
        assert_eq!(parsed.thumbnail_url.as_deref(), Some("https://i0.hdslb.com/p.jpg"));
        assert_eq!(parsed.keywords.as_deref(), Some("music,vocaloid"));
        assert_eq!(parsed.owner_name.as_deref(), Some("[UP主]a；[参与]b"));
        assert_eq!(parsed.owner_url.as_deref(), Some("https://space.bilibili.com/2"));
        assert_eq!(parsed.publish_date.as_deref(), Some("2010-01-01T00:00:00Z"));
        assert_eq!(parsed.description.as_deref(), Some("line1\nline2 & more"));
        assert_eq!(parsed.url.as_deref(), Some("https://www.bilibili.com/video/av170001/"));
        assert_eq!(parsed.short_url.as_deref(), Some("https://b23.tv/av170001"));
    }

    #[test]
    fn test_parse_without_staff_uses_owner() {
        let info = registry().resolve("av1").unwrap();
        let page = VideoPage {
            video_data: Some(VideoInfo {
                title: "T".into(),
                owner: Owner { mid: None, name: "solo".into() },
                staff: Some(Vec::new()),
                ..VideoInfo::default()
            }),
            ..VideoPage::default()
        };

        let parsed = Platform::parse(&Video, &page, &info).unwrap();

        assert_eq!(parsed.owner_name.as_deref(), Some("solo"));
        assert_eq!(parsed.keywords, None);
        assert_eq!(parsed.url, None);
    }
}
