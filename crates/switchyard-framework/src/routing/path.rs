//! Segment trie for call-style routes.
//!
//! Patterns are split on `/` and each segment becomes one edge:
//!
//! - literal segments (`users`) are keyed edges, tried first;
//! - parameter segments (`:id`) share a single unnamed edge per node, tried
//!   only when the literal branch does not produce a full match.
//!
//! Parameter names are kept on the terminal endpoint, so `/users/:id/posts`
//! and `/users/:user_id/comments` share the same parameter edge. Lookup cost
//! is proportional to the number of path segments.
//!
//! A trailing slash is a segment of its own: `/users` and `/users/` are
//! different routes. Wildcards and catch-alls are rejected at registration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use switchyard_core::{
    PathParams, RegistrationError, RegistrationResult, RouteNotFound, TriggerKind,
};
use tracing::trace;

use super::route::Route;

#[derive(Default)]
struct Node {
    literals: HashMap<Box<str>, Node>,
    param: Option<Box<Node>>,
    endpoints: HashMap<Method, Endpoint>,
}

struct Endpoint {
    pattern: Arc<str>,
    params: Vec<Arc<str>>,
    route: Route,
}

enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

/// A successful resolution.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub pattern: &'a str,
    pub params: PathParams,
}

/// Method + path router.
#[derive(Default)]
pub struct PathRouter {
    root: Node,
    routes: Vec<(Method, Arc<str>)>,
}

impl PathRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `route` for `method` and `pattern`.
    pub fn register(&mut self, method: Method, pattern: &str, route: Route) -> RegistrationResult<()> {
        let segments = parse_pattern(pattern)?;

        let mut node = &mut self.root;
        let mut params = Vec::new();
        for segment in &segments {
            node = match *segment {
                Segment::Literal(lit) => node.literals.entry(lit.into()).or_default(),
                Segment::Param(name) => {
                    params.push(Arc::<str>::from(name));
                    node.param.get_or_insert_with(Box::default)
                }
            };
        }

        if let Some(existing) = node.endpoints.get(&method) {
            return Err(RegistrationError::DuplicateRoute {
                trigger: TriggerKind::Call,
                key: if existing.pattern.as_ref() == pattern {
                    format!("{method} {pattern}")
                } else {
                    format!("{method} {pattern} (conflicts with {})", existing.pattern)
                },
            });
        }

        let pattern: Arc<str> = Arc::from(pattern);
        node.endpoints.insert(
            method.clone(),
            Endpoint {
                pattern: Arc::clone(&pattern),
                params,
                route,
            },
        );
        self.routes.push((method, pattern));
        Ok(())
    }

    /// Resolves `method` and `path` to a route and its captured parameters.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RouteNotFound> {
        let not_found = || RouteNotFound {
            trigger: TriggerKind::Call,
            target: format!("{method} {path}"),
        };

        let rest = path.strip_prefix('/').ok_or_else(not_found)?;
        let segments: Vec<&str> = rest.split('/').collect();

        let mut captured = Vec::new();
        let endpoint = find(&self.root, &segments, method, &mut captured).ok_or_else(not_found)?;
        trace!(method = %method, path, pattern = %endpoint.pattern, "Resolved call route");

        let params = endpoint
            .params
            .iter()
            .cloned()
            .zip(captured.into_iter().map(str::to_string))
            .collect();
        Ok(RouteMatch {
            route: &endpoint.route,
            pattern: &endpoint.pattern,
            params: PathParams::from_pairs(params),
        })
    }

    /// Registered `(method, pattern)` pairs, in registration order.
    pub fn routes(&self) -> &[(Method, Arc<str>)] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for PathRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|(m, p)| format!("{m} {p}")))
            .finish()
    }
}

/// Depth-first search, literal edge before parameter edge.
fn find<'n, 'p>(
    node: &'n Node,
    segments: &[&'p str],
    method: &Method,
    captured: &mut Vec<&'p str>,
) -> Option<&'n Endpoint> {
    let Some((head, tail)) = segments.split_first() else {
        return node.endpoints.get(method);
    };

    if let Some(child) = node.literals.get(*head)
        && let Some(endpoint) = find(child, tail, method, captured)
    {
        return Some(endpoint);
    }

    if let Some(child) = &node.param
        && !head.is_empty()
    {
        captured.push(head);
        if let Some(endpoint) = find(child, tail, method, captured) {
            return Some(endpoint);
        }
        captured.pop();
    }

    None
}

fn parse_pattern(pattern: &str) -> RegistrationResult<Vec<Segment<'_>>> {
    let invalid = |reason: &str| RegistrationError::invalid_pattern(pattern, reason);

    let rest = pattern
        .strip_prefix('/')
        .ok_or_else(|| invalid("pattern must start with '/'"))?;

    let raw: Vec<&str> = rest.split('/').collect();
    let last = raw.len() - 1;
    let mut segments = Vec::with_capacity(raw.len());
    let mut names: Vec<&str> = Vec::new();

    for (i, segment) in raw.into_iter().enumerate() {
        if segment.contains('*') {
            return Err(invalid("wildcard segments are not supported"));
        }
        if segment.contains('{') || segment.contains('}') {
            return Err(invalid("brace parameters are not supported, use ':name'"));
        }
        if segment.is_empty() && i != last {
            return Err(invalid("empty segment"));
        }

        match segment.strip_prefix(':') {
            Some(name) => {
                if !is_identifier(name) {
                    return Err(invalid("parameter names must be identifiers"));
                }
                if names.contains(&name) {
                    return Err(invalid("duplicate parameter name"));
                }
                names.push(name);
                segments.push(Segment::Param(name));
            }
            None => segments.push(Segment::Literal(segment)),
        }
    }

    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
