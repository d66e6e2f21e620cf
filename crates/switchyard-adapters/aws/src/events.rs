//! Bus adapters: scheduled rules and custom events.

use std::sync::Arc;

use serde_json::Value;
use switchyard_core::{
    Adapter, AdapterResult, Metadata, Request, RequestBuilder, Response, TriggerKind,
};

use crate::model::BusEvent;
use crate::reply;
use crate::support::{arn_resource_name, from_value};

const SCHEDULE_SOURCE: &str = "aws.events";
const SCHEDULE_DETAIL_TYPE: &str = "Scheduled Event";

fn is_schedule(raw: &Value) -> bool {
    raw.get("source").and_then(Value::as_str) == Some(SCHEDULE_SOURCE)
        && raw.get("detail-type").and_then(Value::as_str) == Some(SCHEDULE_DETAIL_TYPE)
}

/// Fields every bus event shares.
fn bus_request(kind: TriggerKind, event: &BusEvent, raw: &Value) -> RequestBuilder {
    let mut builder = Request::builder(kind)
        .metadata(Metadata::DETAIL_TYPE, &event.detail_type)
        .raw(Arc::new(raw.clone()));
    if let Some(id) = &event.id {
        builder = builder.request_id(id);
    }
    if let Some(time) = &event.time {
        builder = builder.metadata(Metadata::TIME, time);
    }
    if let Some(region) = &event.region {
        builder = builder.metadata(Metadata::REGION, region);
    }
    if let Some(account) = &event.account {
        builder = builder.metadata(Metadata::ACCOUNT, account);
    }
    builder
}

// =============================================================================
// Schedule
// =============================================================================

/// Scheduled rule firings.
///
/// The routing source is the rule name; the full rule ARN is kept under
/// [`Metadata::RULE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleAdapter;

impl Adapter for ScheduleAdapter {
    fn name(&self) -> &'static str {
        "schedule"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        is_schedule(raw)
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let event: BusEvent = from_value(raw, "detail-type")?;
        let mut builder = bus_request(TriggerKind::Scheduled, &event, raw);
        if let Some(rule) = event.resources.first() {
            builder = builder
                .source(arn_resource_name(rule))
                .metadata(Metadata::RULE, rule);
        }
        if !event.detail.is_null() {
            builder = builder.body(event.detail.to_string());
        }
        Ok(builder.build())
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::event(request, response)
    }
}

// =============================================================================
// Custom events
// =============================================================================

/// Any other bus event. Routed by its `source`; the `detail` object is
/// the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusEventAdapter;

impl Adapter for BusEventAdapter {
    fn name(&self) -> &'static str {
        "bus_event"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        raw.get("source").is_some_and(Value::is_string)
            && raw.get("detail-type").is_some_and(Value::is_string)
            && raw.get("detail").is_some()
            && !is_schedule(raw)
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let event: BusEvent = from_value(raw, "detail")?;
        Ok(bus_request(TriggerKind::CustomEvent, &event, raw)
            .source(&event.source)
            .body(event.detail.to_string())
            .build())
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::event(request, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn schedule_uses_rule_name() {
        let raw = fixtures::schedule();
        assert!(ScheduleAdapter.can_handle(&raw));
        assert!(!BusEventAdapter.can_handle(&raw));
        let req = ScheduleAdapter.adapt(&raw).unwrap();

        assert_eq!(req.trigger(), TriggerKind::Scheduled);
        assert_eq!(req.source(), Some("nightly-report"));
        assert_eq!(
            req.metadata().get(Metadata::RULE),
            Some("arn:aws:events:eu-west-1:123456789012:rule/nightly-report")
        );
        assert_eq!(req.request_id(), "sched-1");
        assert_eq!(req.body().as_ref(), b"{}");
    }

    #[test]
    fn bus_event_body_is_detail() {
        let raw = fixtures::bus_event();
        assert!(BusEventAdapter.can_handle(&raw));
        assert!(!ScheduleAdapter.can_handle(&raw));
        let req = BusEventAdapter.adapt(&raw).unwrap();

        assert_eq!(req.trigger(), TriggerKind::CustomEvent);
        assert_eq!(req.source(), Some("orders.created"));
        assert_eq!(req.metadata().get(Metadata::DETAIL_TYPE), Some("OrderCreated"));
        let detail: Value = serde_json::from_slice(req.body()).unwrap();
        assert_eq!(detail, json!({"orderId": "o-1", "total": 30}));
    }

    #[test]
    fn bus_reply_is_body() {
        let req = BusEventAdapter.adapt(&fixtures::bus_event()).unwrap();
        let response = Response::json(StatusCode::OK, json!({"ok": true}));
        let reply = BusEventAdapter.reply(&req, response);
        assert_eq!(reply, json!({"ok": true}));
    }
}
