//! Turn raw user input into route paths.
//!
//! Each platform contributes a [`Discover`] entry: regexes matched against
//! bare identifiers, regexes matched against normalized HTTP(S) URLs, and a
//! handler that builds a route path from a match. Input that looks like a
//! URL is normalized to `host/path?query#fragment` (scheme dropped) and only
//! the HTTP patterns are tried; anything else is tried against the bare
//! patterns. Entries are tried in registration order and a handler may
//! decline a match, in which case matching continues.

use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Builds a route path from a match of one of the entry's patterns.
///
/// The second argument is the pattern that matched; compare it with
/// [`std::ptr::eq`] against the pattern statics.
pub type DiscoverFn = fn(&Captures<'_>, &Regex) -> Option<String>;

/// A platform's discovery patterns.
#[derive(Clone)]
pub struct Discover {
    /// Human-facing name of the contributing platform.
    pub name: &'static str,
    /// Patterns tried against bare input.
    pub discover: Vec<&'static Regex>,
    /// Patterns tried against normalized URLs.
    pub discover_http: Vec<&'static Regex>,
    /// Route builder.
    pub handle: DiscoverFn,
}

impl Discover {
    /// Entry with no patterns yet.
    pub const fn new(name: &'static str, handle: DiscoverFn) -> Self {
        Self {
            name,
            discover: Vec::new(),
            discover_http: Vec::new(),
            handle,
        }
    }

    /// Add patterns for bare input.
    #[must_use]
    pub fn bare(mut self, patterns: impl IntoIterator<Item = &'static Regex>) -> Self {
        self.discover.extend(patterns);
        self
    }

    /// Add patterns for URL input.
    #[must_use]
    pub fn http(mut self, patterns: impl IntoIterator<Item = &'static Regex>) -> Self {
        self.discover_http.extend(patterns);
        self
    }
}

impl fmt::Debug for Discover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns = |list: &[&Regex]| list.iter().map(|r| r.as_str().to_string()).collect::<Vec<_>>();
        f.debug_struct("Discover")
            .field("name", &self.name)
            .field("discover", &patterns(self.discover.as_slice()))
            .field("discover_http", &patterns(self.discover_http.as_slice()))
            .finish_non_exhaustive()
    }
}

/// Scheme-less `host.tld[/...]` input.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BARE_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}(?::\d+)?(?:[/?#]|$)")
        .unwrap()
});

/// Normalize URL-like input to `host[:port]/path[?query][#fragment]`.
///
/// Accepts `http`/`https` URLs (scheme case-insensitive) and scheme-less
/// `host.tld/...` input. Returns `None` for anything else.
pub fn resolve_as_http(input: &str) -> Option<String> {
    let input = input.trim();
    let lower = input.get(..8).unwrap_or(input).to_ascii_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(input).ok()?
    } else if BARE_HOST_RE.is_match(input) {
        Url::parse(&format!("https://{input}")).ok()?
    } else {
        return None;
    };
    let mut out = url.host_str()?.to_string();
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    out.push_str(url.path());
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Some(out)
}

/// Ordered registry of discovery entries.
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    entries: Vec<Discover>,
    bare: Vec<(&'static Regex, usize)>,
    http: Vec<(&'static Regex, usize)>,
}

impl Discovery {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; its patterns are tried after all earlier ones.
    pub fn define(&mut self, discover: Discover) {
        let index = self.entries.len();
        self.bare.extend(discover.discover.iter().map(|r| (*r, index)));
        self.http.extend(discover.discover_http.iter().map(|r| (*r, index)));
        self.entries.push(discover);
    }

    /// Registered entries in order.
    pub fn entries(&self) -> &[Discover] {
        &self.entries
    }

    /// Lazily produce every route path `input` maps to.
    pub fn xresolve(&self, input: &str) -> Routes<'_> {
        let input = input.trim();
        let (input, patterns) = match resolve_as_http(input) {
            Some(url) => (url, self.http.as_slice()),
            None => (input.to_string(), self.bare.as_slice()),
        };
        Routes {
            discovery: self,
            patterns: if input.is_empty() { &[] } else { patterns },
            input,
            next: 0,
        }
    }

    /// First route path for `input`, if any.
    pub fn resolve(&self, input: &str) -> Option<String> {
        self.xresolve(input).next()
    }
}

/// Iterator over route paths produced by [`Discovery::xresolve`].
///
/// Patterns are only tried as the iterator is advanced.
pub struct Routes<'a> {
    discovery: &'a Discovery,
    patterns: &'a [(&'static Regex, usize)],
    input: String,
    next: usize,
}

impl Routes<'_> {
    /// The text patterns are matched against (normalized for URLs).
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Iterator for Routes<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some(&(pattern, index)) = self.patterns.get(self.next) {
            self.next += 1;
            let Some(caps) = pattern.captures(&self.input) else {
                continue;
            };
            let entry = &self.discovery.entries[index];
            if let Some(route) = (entry.handle)(&caps, pattern) {
                debug!(input = %self.input, %route, platform = entry.name, "Discovered route");
                return Some(route);
            }
        }
        None
    }
}
