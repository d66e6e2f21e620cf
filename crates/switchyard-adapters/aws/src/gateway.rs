//! Call-style adapters: HTTP API, load balancer, REST API, and the
//! socket lifecycle.

use std::sync::Arc;

use serde_json::Value;
use switchyard_core::{
    Adapter, AdapterError, AdapterResult, Metadata, Request, Response, TriggerKind,
};
use tracing::trace;

use crate::model::{HttpApiEvent, ProxyEvent, WebSocketEvent};
use crate::reply;
use crate::support::{
    apply_headers, decode_body, from_value, merge_query, parse_method, parse_raw_query,
};

fn request_context(raw: &Value) -> Option<&Value> {
    raw.get("requestContext").filter(|c| c.is_object())
}

// =============================================================================
// Socket
// =============================================================================

/// Socket gateway events: connect, message and disconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketAdapter;

impl WebSocketAdapter {
    fn kind(event_type: &str) -> Option<TriggerKind> {
        match event_type {
            "CONNECT" => Some(TriggerKind::StreamConnect),
            "MESSAGE" => Some(TriggerKind::StreamMessage),
            "DISCONNECT" => Some(TriggerKind::StreamDisconnect),
            _ => None,
        }
    }
}

impl Adapter for WebSocketAdapter {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        let Some(ctx) = request_context(raw) else {
            return false;
        };
        ctx.get("connectionId").is_some_and(Value::is_string)
            && ctx
                .get("eventType")
                .and_then(Value::as_str)
                .and_then(Self::kind)
                .is_some()
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let event: WebSocketEvent = from_value(raw, "requestContext")?;
        let ctx = &event.request_context;
        let kind = Self::kind(&ctx.event_type)
            .ok_or_else(|| AdapterError::invalid("requestContext.eventType", &ctx.event_type))?;
        let body = decode_body(event.body.as_deref(), event.is_base64_encoded)?;

        let mut builder = Request::builder(kind)
            .source(&ctx.route_key)
            .metadata(Metadata::CONNECTION_ID, &ctx.connection_id)
            .query(merge_query(event.query_string_parameters.as_ref(), None, false))
            .body(body)
            .raw(Arc::new(raw.clone()));
        builder = apply_headers(builder, event.headers.as_ref(), None);
        if let Some(stage) = &ctx.stage {
            builder = builder.metadata(Metadata::STAGE, stage);
        }
        if let Some(domain) = &ctx.domain_name {
            builder = builder.metadata(Metadata::DOMAIN_NAME, domain);
        }
        if let Some(time) = &ctx.request_time {
            builder = builder.metadata(Metadata::TIME, time);
        }
        if let Some(id) = &ctx.request_id {
            builder = builder.request_id(id);
        }

        trace!(route = %ctx.route_key, connection = %ctx.connection_id, "Adapted socket event");
        Ok(builder.build())
    }

    fn reply(&self, _request: &Request, response: Response) -> Value {
        reply::web_socket(response)
    }
}

// =============================================================================
// HTTP API (payload 2.0)
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpApiAdapter;

impl Adapter for HttpApiAdapter {
    fn name(&self) -> &'static str {
        "http_api"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        raw.get("version").and_then(Value::as_str) == Some("2.0")
            && request_context(raw).is_some_and(|ctx| ctx.get("http").is_some())
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let event: HttpApiEvent = from_value(raw, "requestContext.http")?;
        let ctx = &event.request_context;
        let body = decode_body(event.body.as_deref(), event.is_base64_encoded)?;

        let mut builder = Request::builder(TriggerKind::Call)
            .method(parse_method(&ctx.http.method)?)
            .path(&ctx.http.path)
            .query(parse_raw_query(event.raw_query_string.as_deref().unwrap_or("")))
            .body(body)
            .raw(Arc::new(raw.clone()));
        builder = apply_headers(builder, event.headers.as_ref(), None);
        // Payload 2.0 lifts cookies out of the header map.
        if let Some(cookies) = event.cookies.as_ref().filter(|c| !c.is_empty()) {
            builder = builder.header("cookie", &cookies.join("; "));
        }
        if let Some(stage) = &ctx.stage {
            builder = builder.metadata(Metadata::STAGE, stage);
        }
        if let Some(domain) = &ctx.domain_name {
            builder = builder.metadata(Metadata::DOMAIN_NAME, domain);
        }
        if let Some(account) = &ctx.account_id {
            builder = builder.metadata(Metadata::ACCOUNT, account);
        }
        if let Some(time) = &ctx.time {
            builder = builder.metadata(Metadata::TIME, time);
        }
        if let Some(id) = &ctx.request_id {
            builder = builder.request_id(id);
        }

        Ok(builder.build())
    }

    fn reply(&self, _request: &Request, response: Response) -> Value {
        reply::http_api(response)
    }
}

// =============================================================================
// Payload 1.0: load balancer and REST API
// =============================================================================

/// Builds a call request from a payload 1.0 event.
///
/// Load balancers forward query strings still percent-encoded.
fn adapt_proxy(raw: &Value, encoded_query: bool) -> AdapterResult<Request> {
    let event: ProxyEvent = from_value(raw, "requestContext")?;
    let ctx = &event.request_context;
    let body = decode_body(event.body.as_deref(), event.is_base64_encoded.unwrap_or(false))?;

    let mut builder = Request::builder(TriggerKind::Call)
        .method(parse_method(&event.http_method)?)
        .path(&event.path)
        .query(merge_query(
            event.query_string_parameters.as_ref(),
            event.multi_value_query_string_parameters.as_ref(),
            encoded_query,
        ))
        .body(body)
        .raw(Arc::new(raw.clone()));
    builder = apply_headers(
        builder,
        event.headers.as_ref(),
        event.multi_value_headers.as_ref(),
    );
    if let Some(stage) = &ctx.stage {
        builder = builder.metadata(Metadata::STAGE, stage);
    }
    if let Some(domain) = &ctx.domain_name {
        builder = builder.metadata(Metadata::DOMAIN_NAME, domain);
    }
    if let Some(account) = &ctx.account_id {
        builder = builder.metadata(Metadata::ACCOUNT, account);
    }
    if let Some(time) = &ctx.request_time {
        builder = builder.metadata(Metadata::TIME, time);
    }
    if let Some(elb) = &ctx.elb {
        builder = builder.source(&elb.target_group_arn);
    }
    if let Some(id) = &ctx.request_id {
        builder = builder.request_id(id);
    }

    Ok(builder.build())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadBalancerAdapter;

impl Adapter for LoadBalancerAdapter {
    fn name(&self) -> &'static str {
        "load_balancer"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        request_context(raw).is_some_and(|ctx| ctx.get("elb").is_some())
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        adapt_proxy(raw, true)
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::load_balancer(request, response)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestApiAdapter;

impl Adapter for RestApiAdapter {
    fn name(&self) -> &'static str {
        "rest_api"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        raw.get("httpMethod").is_some_and(Value::is_string)
            && request_context(raw).is_some_and(|ctx| ctx.get("elb").is_none())
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        adapt_proxy(raw, false)
    }

    fn reply(&self, _request: &Request, response: Response) -> Value {
        reply::rest_api(response)
    }
}
