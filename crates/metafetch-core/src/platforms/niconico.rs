//! niconico works (videos, seiga, 3D, commons materials).
//!
//! All kinds are read through the niconico commons works API; the owner's
//! nickname comes from the public account API and is cached per user.

use super::{fetch_json, non_empty};
use crate::cache::CacheExt;
use crate::config::NicoUrlType;
use crate::discovery::Discover;
use crate::html;
use crate::plugin::{Platform, RegistryBuilder};
use crate::types::{ParsedInfo, ResolvedInfo};
use crate::{Error, Pipeline, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NICO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:sm|nm|im|td|nc)(\d+))$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NICO_MS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^nico\.ms/([a-z]{2}\d+)(?:$|[?#])").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static WATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:www\.|sp\.)?nicovideo\.jp/watch/([sn]m\d+)(?:$|[?#])").unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SEIGA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^seiga\.nicovideo\.jp/seiga/(im\d+)(?:$|[?#])").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SP_SEIGA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sp\.seiga\.nicovideo\.jp/seiga/#!/(im\d+)$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static THREE_D_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^3d\.nicovideo\.jp/works/(td\d+)(?:$|[?#])").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static MATERIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^commons\.nicovideo\.jp/material/(nc\d+)(?:$|[?#])").unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static COMMONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^commons\.nicovideo\.jp/(?:works|tree)/([a-z]{2}\d+)(?:$|[?#])").unwrap()
});

pub(crate) fn install(builder: &mut RegistryBuilder, url_type: NicoUrlType) -> Result<()> {
    builder.define_discover(
        Discover::new("niconico", discover)
            .bare([&*NICO_RE])
            .http([
                &*NICO_MS_RE,
                &*WATCH_RE,
                &*SEIGA_RE,
                &*SP_SEIGA_RE,
                &*THREE_D_RE,
                &*MATERIAL_RE,
                &*COMMONS_RE,
            ]),
    );
    builder.define_plugin(Works { url_type })?;
    Ok(())
}

fn discover(m: &Captures<'_>, _: &Regex) -> Option<String> {
    Some(format!("niconico/works/{}", &m[1]))
}

/// Whether `id` is a known kind with canonical digits.
fn is_work_id(id: &str) -> bool {
    NICO_RE
        .captures(id)
        .is_some_and(|caps| !(caps[2].len() > 1 && caps[2].starts_with('0')))
}

/// Page URL for `id`, shown as a `prefix` work.
fn work_url(id: &str, prefix: &str) -> String {
    match prefix {
        "sm" | "nm" => format!("https://www.nicovideo.jp/watch/{id}"),
        "im" => format!("https://seiga.nicovideo.jp/seiga/{id}"),
        "td" => format!("https://3d.nicovideo.jp/works/{id}"),
        _ => format!("https://commons.nicovideo.jp/works/{id}"),
    }
}

/// `node` of the commons works API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    /// Work title.
    #[serde(default)]
    pub title: String,
    /// Content kind such as `video` or `illust`.
    #[serde(default)]
    pub content_kind: String,
    /// Description markup.
    #[serde(default)]
    pub description: String,
    /// Thumbnail, if the work has one.
    #[serde(default, rename = "thumbnailURL")]
    pub thumbnail_url: Option<String>,
    /// Owner's user id.
    #[serde(default)]
    pub user_id: Option<u64>,
}

/// Public profile of a work's owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    #[serde(default)]
    pub nickname: String,
}

/// Payload of one work and its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkData {
    /// The work itself.
    pub work: Work,
    /// Owner profile, when the user API knows them.
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    status: u16,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    meta: Meta,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, url: &str) -> Result<Option<T>> {
        if self.meta.status == 200 {
            Ok(self.data)
        } else {
            Err(Error::Upstream(self.meta.error_message.unwrap_or_else(|| {
                format!("{url} reported status {}", self.meta.status)
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkNode {
    node: Work,
}

/// A niconico work.
#[derive(Debug, Clone, Copy, Default)]
pub struct Works {
    /// Which URL form is canonical.
    pub url_type: NicoUrlType,
}

#[async_trait]
impl Platform for Works {
    type Data = WorkData;

    fn name(&self) -> &'static str {
        "niconico"
    }

    fn path(&self) -> &'static str {
        "niconico/works"
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        let [id] = path else {
            return None;
        };
        if !is_work_id(id) {
            return None;
        }
        let prefix = match self.url_type {
            NicoUrlType::Watch => &id[..2],
            NicoUrlType::Tree => "nc",
        };
        Some(ResolvedInfo::simple(
            id.clone(),
            format!("https://nico.ms/{id}"),
            work_url(id, prefix),
        ))
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<WorkData>> {
        let id = info.cache_id().to_string();
        let owned = pipeline.clone();
        let work = pipeline
            .cache()
            .json(info.cache_id(), async move {
                let url = format!("https://public-api.commons.nicovideo.jp/v1/works/{id}?with_meta=1");
                let envelope: Envelope<WorkNode> = fetch_json(owned.http(), &url).await?;
                Ok(envelope.into_data(&url)?.map(|data| data.node))
            })
            .await?;
        let Some(work) = work else {
            return Ok(None);
        };
        let user = match work.user_id {
            Some(uid) => {
                let owned = pipeline.clone();
                pipeline
                    .cache()
                    .json(&format!("nico!user!{uid}"), async move {
                        let url = format!(
                            "https://account.nicovideo.jp/api/public/v1/users.json?userIds={uid}"
                        );
                        let envelope: Envelope<Vec<User>> = fetch_json(owned.http(), &url).await?;
                        Ok(envelope
                            .into_data(&url)?
                            .and_then(|users| users.into_iter().next()))
                    })
                    .await?
            },
            None => None,
        };
        Ok(Some(WorkData { work, user }))
    }

    fn parse(&self, data: &WorkData, _info: &ResolvedInfo) -> Option<ParsedInfo> {
        let work = &data.work;
        let mut parsed = ParsedInfo::new(work.title.clone());
        parsed.owner_name = data.user.as_ref().and_then(|u| non_empty(u.nickname.clone()));
        parsed.owner_url = work
            .user_id
            .map(|uid| format!("https://www.nicovideo.jp/user/{uid}"));
        parsed.thumbnail_url = work.thumbnail_url.clone();
        parsed.description = non_empty(if work.content_kind == "commons" {
            work.description.clone()
        } else {
            html::to_text(&work.description, false)
        });
        Some(parsed)
    }
}
