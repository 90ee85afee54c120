use serde::{Deserialize, Serialize};

/// Sigil marking identifiers that must be resolved through a redirect.
pub const META_SIGIL: char = '@';

/// Which registry and plugin produced a [`ResolvedInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Origin {
    pub(crate) registry: u64,
    pub(crate) index: usize,
}

/// Canonical identifier record for one piece of content.
///
/// Records are immutable once built and shared as `Arc<ResolvedInfo>`.
/// Records produced by a registry carry a hidden origin tag that lets
/// generic callers dispatch to the owning plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInfo {
    id: String,
    display_id: String,
    cache_id: String,
    short_url: String,
    url: String,
    #[serde(skip)]
    origin: Option<Origin>,
}

impl ResolvedInfo {
    /// Build an untagged record; the registry tags it when a plugin returns it.
    pub fn new(
        id: impl Into<String>,
        display_id: impl Into<String>,
        cache_id: impl Into<String>,
        short_url: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_id: display_id.into(),
            cache_id: cache_id.into(),
            short_url: short_url.into(),
            url: url.into(),
            origin: None,
        }
    }

    /// Record whose id, display id and cache id are all `id`.
    pub fn simple(id: impl Into<String>, short_url: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), id.clone(), id, short_url, url)
    }

    /// Canonical identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier shown to users.
    pub fn display_id(&self) -> &str {
        &self.display_id
    }

    /// Key shared by every id that denotes the same remote resource.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Short link; empty when the platform has none.
    pub fn short_url(&self) -> &str {
        &self.short_url
    }

    /// Canonical page URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether this is a redirect stub rather than fetchable content.
    pub fn is_meta(&self) -> bool {
        self.id.starts_with(META_SIGIL)
    }

    pub(crate) const fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Normalized metadata reduced from a platform payload.
///
/// `title` is mandatory: a blank title means "no result".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInfo {
    /// Content title.
    pub title: String,
    /// Uploader or author name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Uploader or author profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_url: Option<String>,
    /// Thumbnail image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Publication time, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    /// Comma-separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Plain-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link to related content on another platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_url: Option<String>,
    /// Replaces the resolved short link when the payload knows a better one.
    #[serde(skip)]
    pub short_url: Option<String>,
    /// Replaces the resolved URL when the payload knows a better one.
    #[serde(skip)]
    pub url: Option<String>,
}

impl ParsedInfo {
    /// Metadata with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Whether the title is non-blank.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// A resolved record merged with its parsed metadata.
///
/// Serialized with the camelCase field names templates refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Canonical identifier.
    pub id: String,
    /// Identifier shown to users.
    pub display_id: String,
    /// Cache grouping key.
    pub cache_id: String,
    /// Short link, possibly empty.
    pub short_url: String,
    /// Canonical page URL.
    pub url: String,
    /// Parsed fields, flattened into the record.
    #[serde(flatten)]
    pub parsed: ParsedInfo,
}

impl Metadata {
    /// Merge; link overrides in `parsed` win over the resolved links.
    pub fn merge(info: &ResolvedInfo, mut parsed: ParsedInfo) -> Self {
        Self {
            id: info.id.clone(),
            display_id: info.display_id.clone(),
            cache_id: info.cache_id.clone(),
            short_url: parsed.short_url.take().unwrap_or_else(|| info.short_url.clone()),
            url: parsed.url.take().unwrap_or_else(|| info.url.clone()),
            parsed,
        }
    }
}
