//! vsqx.top projects.

use super::{fetch_json, is_canonical_number, non_empty};
use crate::cache::CacheExt;
use crate::discovery::Discover;
use crate::plugin::{Platform, RegistryBuilder};
use crate::types::{ParsedInfo, ResolvedInfo};
use crate::{Error, Pipeline, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(vn\d+)$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^www\.vsqx\.top/project/(vn\d+)(?:$|[/?#])").unwrap());

/// `YYYY-MM-DD hh:mm:ss` in China Standard Time.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static UP_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d\d)-(\d\d)\s+(\d\d:\d\d:\d\d)$").unwrap());

pub(crate) fn install(builder: &mut RegistryBuilder) -> Result<()> {
    builder.define_discover(
        Discover::new("vsqx.top", discover)
            .bare([&*BARE_RE])
            .http([&*PROJECT_RE]),
    );
    builder.define_plugin(Project)?;
    Ok(())
}

fn discover(m: &Captures<'_>, _: &Regex) -> Option<String> {
    Some(format!("vsqx.top/project/{}", &m[1]))
}

/// Numeric part of a `vn` id; ids never start with zero.
fn project_number(id: &str) -> Option<&str> {
    let digits = id.strip_prefix("vn")?;
    (is_canonical_number(digits) && !digits.starts_with('0')).then_some(digits)
}

/// Project record of `api/app/project_msg`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMsg {
    /// Song title.
    #[serde(default)]
    pub music_name: String,
    /// Producer name.
    #[serde(default)]
    pub p_name: Option<String>,
    /// Upload time as `YYYY-MM-DD hh:mm:ss`, China Standard Time.
    #[serde(default)]
    pub up_time: Option<String>,
    /// Number or string depending on the record.
    #[serde(default)]
    pub vsqx_uid: Value,
    /// Project description.
    #[serde(default)]
    pub music_desc: Option<String>,
    /// Related Bilibili video id, if any.
    #[serde(default)]
    pub b_av: Value,
}

/// Payload of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectData {
    /// The project record.
    pub project: ProjectMsg,
    /// Canonical URL of the related video, resolved while fetching.
    pub related_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<ProjectMsg>,
}

/// String form of a scalar JSON value; `None` for null or empty.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert `up_time` to RFC 3339 with the +08:00 offset.
fn publish_date(up_time: &str) -> String {
    UP_TIME_RE
        .replace(up_time.trim(), "$1-$2-${3}T$4+08:00")
        .into_owned()
}

/// A vsqx.top project.
#[derive(Debug, Clone, Copy, Default)]
pub struct Project;

#[async_trait]
impl Platform for Project {
    type Data = ProjectData;

    fn name(&self) -> &'static str {
        "vsqx.top"
    }

    fn path(&self) -> &'static str {
        "vsqx.top/project"
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        let [id] = path else {
            return None;
        };
        project_number(id)?;
        Some(ResolvedInfo::simple(
            id.clone(),
            "",
            format!("https://www.vsqx.top/project/{id}"),
        ))
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<ProjectData>> {
        let Some(number) = project_number(info.cache_id()).map(str::to_string) else {
            return Ok(None);
        };
        let owned = pipeline.clone();
        let project = pipeline
            .cache()
            .json(info.cache_id(), async move {
                let url = format!("https://www.vsqx.top/api/app/project_msg/{number}");
                let envelope: Envelope = fetch_json(owned.http(), &url).await?;
                if !envelope.success {
                    return Err(Error::Upstream(
                        envelope.message.unwrap_or_else(|| "Unknown Error".to_string()),
                    ));
                }
                Ok(envelope.data)
            })
            .await?;
        Ok(project.map(|project| {
            let related_url = scalar_text(&project.b_av)
                .and_then(|av| pipeline.resolve(&av))
                .map(|info| info.url().to_string());
            ProjectData {
                project,
                related_url,
            }
        }))
    }

    fn parse(&self, data: &ProjectData, _info: &ResolvedInfo) -> Option<ParsedInfo> {
        let project = &data.project;
        let mut parsed = ParsedInfo::new(project.music_name.clone());
        parsed.owner_name = project.p_name.clone().and_then(non_empty);
        parsed.publish_date = project.up_time.as_deref().map(publish_date);
        parsed.thumbnail_url = scalar_text(&project.vsqx_uid)
            .map(|uid| format!("https://vsqx-cover.vsqx.top/{uid}.jpg"));
        parsed.description = project.music_desc.clone().and_then(non_empty);
        parsed.related_url = data.related_url.clone();
        Some(parsed)
    }
}
