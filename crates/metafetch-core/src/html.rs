//! Minimal HTML querying for platform fetchers.
//!
//! Platform pages embed their data as JSON inside inline `<script>` blocks
//! or in `<meta>` tags. This module pulls those out with a handful of
//! regexes; it is not a general HTML parser.

use crate::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Regex for `<script ...>body</script>` blocks.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").unwrap());

/// Regex for `src` attributes inside a script tag.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)src\s*=").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").unwrap());

/// Regex for one `name=value` attribute, quoted or not.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#).unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NEWLINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n").unwrap());

/// Elements followed by a line break when flattened to text.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\b[^>]*>|</(?:div|p)\s*>").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Bodies of every inline (no `src`) script, in document order.
pub fn inline_scripts(html: &str) -> Vec<&str> {
    SCRIPT_RE
        .captures_iter(html)
        .filter(|caps| !SRC_ATTR_RE.is_match(&caps[1]))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect()
}

/// Find the first balanced `{...}` object in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) are ignored.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            },
            _ => {},
        }
    }
    None
}

/// Parse the JSON object assigned after `marker` in the first inline script
/// whose trimmed body matches it.
///
/// `marker` should be anchored at the start (e.g. `^\s*window\.__STATE__\s*=`).
/// Returns `Ok(None)` when no script carries the marker.
pub fn script_json(html: &str, marker: &Regex) -> Result<Option<Value>> {
    for script in inline_scripts(html) {
        let text = script.trim();
        let Some(m) = marker.find(text) else {
            continue;
        };
        if let Some(json) = find_json_object(&text[m.end()..]) {
            debug!(bytes = json.len(), "Found embedded script JSON");
            return serde_json::from_str(json)
                .map(Some)
                .map_err(|e| Error::Parse(format!("Embedded JSON is malformed: {e}")));
        }
    }
    Ok(None)
}

/// The decoded `content` of the first `<meta>` whose `property` or `name`
/// equals `key`.
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    META_RE.captures_iter(html).find_map(|caps| {
        let mut matched = false;
        let mut content = None;
        for attr in ATTR_RE.captures_iter(&caps[1]) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" if value == key => matched = true,
                "content" => content = Some(value),
                _ => {},
            }
        }
        matched
            .then_some(content)
            .flatten()
            .map(|c| html_escape::decode_html_entities(c).into_owned())
    })
}

/// Flatten an HTML fragment to plain text.
///
/// `<br>`, `</p>` and `</div>` become line breaks; other tags are dropped and
/// entities decoded. Unless `preserve_newlines` is set, source newlines are
/// removed first so only markup produces line breaks.
pub fn to_text(html: &str, preserve_newlines: bool) -> String {
    let html = if preserve_newlines {
        html.into()
    } else {
        NEWLINE_RE.replace_all(html, "")
    };
    let broken = BREAK_RE.replace_all(&html, "\n");
    let stripped = TAG_RE.replace_all(&broken, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
<meta property="og:title" content="Tom &amp; Jerry">
<meta name='description' content='plain'>
<script src="/app.js">ignored()</script>
<script>window.__INITIAL_STATE__ = {"a":{"b":"}{"},"c":[1,2]};(function(){})()</script>
</head></html>"#;

    #[test]
    fn test_inline_scripts_skip_external() {
        let scripts = inline_scripts(PAGE);
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].starts_with("window.__INITIAL_STATE__"));
    }

    #[test]
    fn test_find_json_object_ignores_braces_in_strings() {
        assert_eq!(
            find_json_object(r#"x = {"k":"a\"}"} tail"#),
            Some(r#"{"k":"a\"}"}"#)
        );
        assert_eq!(find_json_object("{ unbalanced"), None);
        assert_eq!(find_json_object("no object"), None);
    }

    #[test]
    fn test_script_json_after_marker() {
        // Given: A marker anchored at the script start
        let marker = Regex::new(r"^\s*window\.__INITIAL_STATE__\s*=\s*").unwrap();

        // When: Extracting the embedded object
        let value = script_json(PAGE, &marker).unwrap().unwrap();

        // Then: The whole object is parsed, trailing code ignored
        assert_eq!(value["a"]["b"], "}{");
        assert_eq!(value["c"][1], 2);
    }

    #[test]
    fn test_script_json_missing_marker() {
        let marker = Regex::new(r"^\s*window\.__NOPE__\s*=").unwrap();
        assert!(script_json(PAGE, &marker).unwrap().is_none());
    }

    #[test]
    fn test_meta_content() {
        assert_eq!(meta_content(PAGE, "og:title").as_deref(), Some("Tom & Jerry"));
        assert_eq!(meta_content(PAGE, "description").as_deref(), Some("plain"));
        assert_eq!(meta_content(PAGE, "og:image"), None);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text("a<br>b<p>c</p>d", false), "a\nbc\nd");
        assert_eq!(to_text("x\ny<br/>&lt;z&gt;", false), "xy\n<z>");
        assert_eq!(to_text("x\ny", true), "x\ny");
    }
}
