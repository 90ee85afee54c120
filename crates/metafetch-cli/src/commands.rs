//! Command implementations.

use anyhow::Result;
use metafetch_core::{Config, Error, Metadata, Pipeline, Registry, ResolvedInfo, Staged};
use serde_json::Value;
use tracing::{debug, warn};

/// Print every installed platform with its route prefix.
pub fn platforms(config: &Config) -> Result<()> {
    let registry = Registry::builtin(config)?;
    for plugin in registry.plugins() {
        println!("{}\t{}", plugin.name(), plugin.path());
    }
    Ok(())
}

/// Print the record for each input; returns the number of unknown inputs.
pub fn resolve(registry: &Registry, inputs: &[String]) -> Result<usize> {
    let mut failures = 0;
    for input in inputs {
        match registry.resolve(input) {
            Some(info) => println!("{}", serde_json::to_string(&*info)?),
            None => {
                eprintln!("unknown input: {input}");
                failures += 1;
            },
        }
    }
    Ok(failures)
}

/// Fetch and print metadata for each input; returns the number of failures.
///
/// Every input is staged and prefetched before the first result is awaited,
/// so independent fetches overlap.
pub async fn fetch(pipeline: &Pipeline, inputs: &[String]) -> usize {
    let staged: Vec<(&str, Option<Staged>)> = inputs
        .iter()
        .map(|input| (input.as_str(), pipeline.xparse(input)))
        .inspect(|(_, staged)| {
            if let Some(staged) = staged {
                staged.prefetch();
            }
        })
        .collect();

    let mut failures = 0;
    for (input, staged) in staged {
        let Some(staged) = staged else {
            eprintln!("unknown input: {input}");
            failures += 1;
            continue;
        };
        match staged.parsed().get().await {
            Ok(Some(meta)) => match render(staged.resolved(), &meta) {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    eprintln!("{input}: {e}");
                    failures += 1;
                },
            },
            Ok(None) => {
                eprintln!("{input}: no metadata");
                failures += 1;
            },
            Err(e) => {
                report(input, &e);
                failures += 1;
            },
        }
    }
    failures
}

/// Metadata as one JSON line; redirect stubs are named in `redirectedFrom`.
fn render(resolved: &ResolvedInfo, meta: &Metadata) -> Result<String> {
    let mut value = serde_json::to_value(meta)?;
    if resolved.id() != meta.id {
        if let Value::Object(map) = &mut value {
            map.insert("redirectedFrom".into(), resolved.id().into());
        }
    }
    Ok(serde_json::to_string(&value)?)
}

fn report(input: &str, error: &Error) {
    if error.is_recoverable() {
        warn!(%input, category = error.category(), "Recoverable failure");
    } else {
        debug!(%input, category = error.category(), "Failure");
    }
    eprintln!("{input}: {error}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use metafetch_core::ParsedInfo;

    #[test]
    fn test_render_marks_redirected_records() {
        // Given: A short link whose metadata belongs to its target
        let stub = ResolvedInfo::simple("@b23!abc", "", "https://b23.tv/abc");
        let target = ResolvedInfo::simple("av1", "https://b23.tv/av1", "https://www.bilibili.com/video/av1/");
        let meta = Metadata::merge(&target, ParsedInfo::new("Title"));

        // When: Rendering
        let line: Value = serde_json::from_str(&render(&stub, &meta).unwrap()).unwrap();

        // Then: The stub is reported alongside the target's metadata
        assert_eq!(line["id"], "av1");
        assert_eq!(line["title"], "Title");
        assert_eq!(line["redirectedFrom"], "@b23!abc");
    }

    #[test]
    fn test_render_direct_record() {
        let info = ResolvedInfo::simple("sm9", "https://nico.ms/sm9", "https://www.nicovideo.jp/watch/sm9");
        let meta = Metadata::merge(&info, ParsedInfo::new("Title"));

        let line: Value = serde_json::from_str(&render(&info, &meta).unwrap()).unwrap();

        assert!(line.get("redirectedFrom").is_none());
    }
}
