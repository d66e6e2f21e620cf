//! Extractors over the normalized request.

use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::HeaderMap;
use switchyard_core::{InvocationContext, Metadata, PathParams, QueryParams, Record, Request};
use tokio_util::sync::CancellationToken;

use super::core::FromContext;
use crate::error::{ExtractError, ExtractResult};

// ─── Path parameters ─────────────────────────────────────────────────────────

/// Captured `:name` segments. Empty for trigger-routed requests.
impl FromContext for PathParams {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(ctx.request().path_params().clone())
    }
}

/// Typed access to path parameters.
pub trait PathParamsExt {
    /// Returns the captured value or [`ExtractError::MissingPathParam`].
    fn require(&self, name: &str) -> ExtractResult<&str>;

    /// Parses the captured value with [`FromStr`].
    fn parse<T>(&self, name: &str) -> ExtractResult<T>
    where
        T: FromStr,
        T::Err: Display;
}

impl PathParamsExt for PathParams {
    fn require(&self, name: &str) -> ExtractResult<&str> {
        self.get(name)
            .ok_or_else(|| ExtractError::MissingPathParam(name.to_string()))
    }

    fn parse<T>(&self, name: &str) -> ExtractResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.require(name)?
            .parse()
            .map_err(|e: T::Err| ExtractError::InvalidPathParam {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

// ─── Query / headers / body ──────────────────────────────────────────────────

/// Query string parameters.
#[derive(Debug, Clone)]
pub struct Query(pub QueryParams);

impl Deref for Query {
    type Target = QueryParams;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Query {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.request().query().clone()))
    }
}

/// Request headers.
#[derive(Debug, Clone)]
pub struct Headers(pub HeaderMap);

impl Deref for Headers {
    type Target = HeaderMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Headers {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.request().headers().clone()))
    }
}

/// Raw body bytes, already base64-decoded by the adapter when flagged.
#[derive(Debug, Clone)]
pub struct Body(pub Bytes);

impl Deref for Body {
    type Target = Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Body {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.request().body().clone()))
    }
}

/// Trigger-specific metadata.
impl FromContext for Metadata {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(ctx.request().metadata().clone())
    }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Batch records, in delivery order.
///
/// Shares the request instead of copying the records.
#[derive(Debug, Clone)]
pub struct Records(Arc<Request>);

impl Records {
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.records().iter()
    }
}

impl Deref for Records {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        self.0.records()
    }
}

impl<'a> IntoIterator for &'a Records {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromContext for Records {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.request_arc()))
    }
}

// ─── Deadline / cancellation ─────────────────────────────────────────────────

/// The deadline supplied by the host, if any.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(pub Option<Instant>);

impl Deadline {
    /// Time left; `None` when the host set no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|d| Instant::now() >= d)
    }
}

impl FromContext for Deadline {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.deadline()))
    }
}

/// The cancellation token supplied by the host.
#[derive(Debug, Clone)]
pub struct Cancellation(pub CancellationToken);

impl FromContext for Cancellation {
    fn from_context(ctx: &Arc<InvocationContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.cancellation().clone()))
    }
}
