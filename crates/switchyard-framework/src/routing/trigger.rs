//! Trigger kind + source routing for non-call requests.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use switchyard_core::{
    RegistrationError, RegistrationResult, Request, RouteNotFound, TriggerKind,
};
use tracing::trace;

use super::route::Route;

/// A match pattern over a request's routing source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePattern {
    /// `*`: any source, including none.
    Any,
    /// Exact source name.
    Exact(String),
    /// `stem*`: sources starting with `stem`.
    Prefix(String),
}

impl SourcePattern {
    /// Parses `pattern` for `kind`.
    ///
    /// Prefix patterns are only accepted for kinds that
    /// [support them](TriggerKind::supports_prefix_patterns).
    pub fn parse(kind: TriggerKind, pattern: &str) -> RegistrationResult<Self> {
        let invalid = |reason: &str| RegistrationError::invalid_pattern(pattern, reason);

        if pattern.is_empty() {
            return Err(invalid("pattern must not be empty"));
        }
        if pattern == "*" {
            return Ok(Self::Any);
        }

        match pattern.strip_suffix('*') {
            Some(stem) if stem.contains('*') => Err(invalid("only a single trailing '*' is allowed")),
            Some(_) if !kind.supports_prefix_patterns() => Err(invalid(&format!(
                "prefix patterns are not supported for {kind} triggers"
            ))),
            Some(stem) => Ok(Self::Prefix(stem.to_string())),
            None if pattern.contains('*') => Err(invalid("only a single trailing '*' is allowed")),
            None => Ok(Self::Exact(pattern.to_string())),
        }
    }

    pub fn matches(&self, source: Option<&str>) -> bool {
        match (self, source) {
            (Self::Any, _) => true,
            (Self::Exact(name), Some(source)) => name == source,
            (Self::Prefix(stem), Some(source)) => source.starts_with(stem.as_str()),
            (_, None) => false,
        }
    }

    /// Sort key: exact, then longer prefixes, then catch-all.
    fn rank(&self) -> (u8, Reverse<usize>) {
        match self {
            Self::Exact(_) => (0, Reverse(0)),
            Self::Prefix(stem) => (1, Reverse(stem.len())),
            Self::Any => (2, Reverse(0)),
        }
    }
}

impl fmt::Display for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(name) => f.write_str(name),
            Self::Prefix(stem) => write!(f, "{stem}*"),
        }
    }
}

struct Entry {
    pattern: SourcePattern,
    seq: usize,
    route: Route,
}

/// Routes non-call requests by trigger kind, then by source.
///
/// Entries are kept per kind in precedence order, so resolution is a scan
/// for the first matching entry.
#[derive(Default)]
pub struct TriggerRouter {
    tables: HashMap<TriggerKind, Vec<Entry>>,
    registered: usize,
}

impl TriggerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: TriggerKind, pattern: &str, route: Route) -> RegistrationResult<()> {
        if kind.is_call() {
            return Err(RegistrationError::invalid_pattern(
                pattern,
                "call triggers are routed by method and path",
            ));
        }
        let pattern = SourcePattern::parse(kind, pattern)?;

        let table = self.tables.entry(kind).or_default();
        if table.iter().any(|entry| entry.pattern == pattern) {
            return Err(RegistrationError::DuplicateRoute {
                trigger: kind,
                key: pattern.to_string(),
            });
        }

        let entry = Entry {
            pattern,
            seq: self.registered,
            route,
        };
        let key = |e: &Entry| (e.pattern.rank(), e.seq);
        let at = table.partition_point(|e| key(e) < key(&entry));
        table.insert(at, entry);
        self.registered += 1;
        Ok(())
    }

    /// Resolves the single route for `request`'s kind and source.
    pub fn resolve(&self, request: &Request) -> Result<&Route, RouteNotFound> {
        let kind = request.trigger();
        let source = request.source();

        let found = self
            .tables
            .get(&kind)
            .and_then(|table| table.iter().find(|entry| entry.pattern.matches(source)));

        match found {
            Some(entry) => {
                trace!(trigger = %kind, source, pattern = %entry.pattern, "Resolved trigger route");
                Ok(&entry.route)
            }
            None => Err(RouteNotFound {
                trigger: kind,
                target: source.unwrap_or("<none>").to_string(),
            }),
        }
    }

    /// Registered `(kind, pattern)` pairs, in precedence order per kind.
    pub fn routes(&self) -> Vec<(TriggerKind, String)> {
        let mut routes: Vec<_> = self
            .tables
            .iter()
            .flat_map(|(kind, table)| table.iter().map(|e| (*kind, e.pattern.to_string())))
            .collect();
        routes.sort_by_key(|(kind, _)| *kind);
        routes
    }

    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }
}

impl fmt::Debug for TriggerRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes().into_iter().map(|(k, p)| format!("{k} {p}")))
            .finish()
    }
}
