//! `meta:/<route>` passthrough.
//!
//! Lets callers (and links such as `web+meta:/pixiv/illust/1`) address a
//! route path directly, bypassing platform discovery patterns.

use crate::discovery::Discover;
use crate::plugin::RegistryBuilder;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:web\+)?meta:/(.+)$").unwrap());

pub(crate) fn install(builder: &mut RegistryBuilder) {
    builder.define_discover(Discover::new("Route", route).bare([&*META_RE]));
}

fn route(m: &Captures<'_>, _: &Regex) -> Option<String> {
    Some(m[1].to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{Config, Registry};

    #[test]
    fn test_route_passthrough() {
        let registry = Registry::builtin(&Config::default()).unwrap();

        let info = registry.resolve("meta:/bilibili/video/av170001").unwrap();
        assert_eq!(info.id(), "av170001");

        let info = registry.resolve("web+meta:/pixiv/illust/1/2").unwrap();
        assert_eq!(info.id(), "pixiv!1-2");

        assert!(registry.resolve("meta:/no/such/route").is_none());
    }
}
