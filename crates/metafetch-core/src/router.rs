//! Prefix trie from route paths to resolver functions.
//!
//! A route path is a `/`-separated string such as `bilibili/video/av1`.
//! [`Router::define`] installs a resolver at a prefix (`bilibili/video`);
//! [`Router::resolve`] walks a path down the trie and, on reaching a
//! resolver, calls it with the segments that were not consumed.
//!
//! Registrations that would shadow one another fail fast: a path may not be
//! a strict prefix of another registered path, nor be registered twice.

use crate::{Error, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Resolver installed at a route prefix.
pub type RouteFn<R> = Box<dyn Fn(&[String]) -> Option<R> + Send + Sync>;

enum Node<R> {
    Branch(HashMap<String, Node<R>>),
    Leaf(RouteFn<R>),
}

/// Route trie producing values of type `R`.
pub struct Router<R> {
    root: HashMap<String, Node<R>>,
}

impl<R> Default for Router<R> {
    fn default() -> Self {
        Self {
            root: HashMap::new(),
        }
    }
}

impl<R> fmt::Debug for Router<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes())
            .finish()
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .map(|segment| {
            urlencoding::decode(segment).map_or_else(|_| segment.to_string(), Cow::into_owned)
        })
        .collect()
}

impl<R> Router<R> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RouteConflict`] if `path` is empty, already
    /// registered, a strict prefix of a registered path, or has a
    /// registered path as a strict prefix. The router is unchanged on error.
    pub fn define<F>(&mut self, path: &str, handle: F) -> Result<()>
    where
        F: Fn(&[String]) -> Option<R> + Send + Sync + 'static,
    {
        let conflict = |reason: &str| Error::RouteConflict(format!("'{path}' {reason}"));
        if path.is_empty() {
            return Err(conflict("is empty"));
        }
        let segments = segments(path);
        let Some((last, parents)) = segments.split_last() else {
            return Err(conflict("is empty"));
        };

        // Validate before mutating so a failed define leaves no empty branches.
        let mut level = &self.root;
        for segment in parents {
            match level.get(segment) {
                None => break,
                Some(Node::Branch(next)) => level = next,
                Some(Node::Leaf(_)) => {
                    return Err(conflict("extends an existing route"));
                },
            }
        }
        let mut map = &mut self.root;
        for segment in parents {
            let node = map
                .entry(segment.clone())
                .or_insert_with(|| Node::Branch(HashMap::new()));
            match node {
                Node::Branch(next) => map = next,
                Node::Leaf(_) => return Err(conflict("extends an existing route")),
            }
        }
        match map.get(last) {
            Some(Node::Leaf(_)) => Err(conflict("is already registered")),
            Some(Node::Branch(_)) => Err(conflict("is a prefix of an existing route")),
            None => {
                map.insert(last.clone(), Node::Leaf(Box::new(handle)));
                Ok(())
            },
        }
    }

    /// Walk `path` and invoke the resolver found on the way.
    ///
    /// The resolver receives the unconsumed segments (possibly none).
    /// Returns `None` when a segment is not registered or the path ends
    /// before reaching a resolver.
    pub fn resolve(&self, path: &str) -> Option<R> {
        let segments = segments(path);
        let mut map = &self.root;
        for (i, segment) in segments.iter().enumerate() {
            match map.get(segment)? {
                Node::Branch(next) => map = next,
                Node::Leaf(handle) => return handle(&segments[i + 1..]),
            }
        }
        None
    }

    /// Every registered route path, sorted.
    pub fn routes(&self) -> Vec<String> {
        fn walk<R>(map: &HashMap<String, Node<R>>, prefix: &str, out: &mut Vec<String>) {
            for (segment, node) in map {
                let path = if prefix.is_empty() {
                    segment.clone()
                } else {
                    format!("{prefix}/{segment}")
                };
                match node {
                    Node::Branch(next) => walk(next, &path, out),
                    Node::Leaf(_) => out.push(path),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root, "", &mut out);
        out.sort();
        out
    }
}
