//! # Switchyard AWS Adapters
//!
//! Adapters for the payloads a function host on AWS delivers: gateway and
//! load balancer calls, socket lifecycle events, queue and stream batches,
//! object notifications, topic deliveries and bus events.
//!
//! [`registry`] returns all of them in an order where no two adapters
//! claim the same payload:
//!
//! | # | Adapter                  | Recognized by                                     | Kind                 |
//! |---|--------------------------|---------------------------------------------------|----------------------|
//! | 1 | [`WebSocketAdapter`]     | `requestContext.eventType` + `connectionId`       | `Stream*`            |
//! | 2 | [`HttpApiAdapter`]       | `version == "2.0"` + `requestContext.http`        | `Call`               |
//! | 3 | [`LoadBalancerAdapter`]  | `requestContext.elb`                              | `Call`               |
//! | 4 | [`RestApiAdapter`]       | `httpMethod` + `requestContext`                   | `Call`               |
//! | 5 | [`QueueAdapter`]         | `Records[0].eventSource == "aws:sqs"`             | `QueueBatch`         |
//! | 6 | [`StreamRecordsAdapter`] | `aws:kinesis` / `aws:dynamodb` records            | `QueueBatch`         |
//! | 7 | [`ObjectStorageAdapter`] | `aws:s3` records                                  | `ObjectNotification` |
//! | 8 | [`TopicAdapter`]         | `aws:sns` records                                 | `CustomEvent`        |
//! | 9 | [`ScheduleAdapter`]      | `source == "aws.events"`, `Scheduled Event`       | `Scheduled`          |
//! | 10| [`BusEventAdapter`]      | `source` + `detail-type` + `detail`               | `CustomEvent`        |
//!
//! ```rust,ignore
//! let runtime = Runtime::builder()
//!     .adapters(switchyard_adapter_aws::registry()?)
//!     .build(|app| { /* routes */ Ok(()) })?;
//! ```

mod events;
mod gateway;
pub mod model;
mod records;
mod reply;
mod support;

#[cfg(test)]
mod fixtures;

use switchyard_core::{AdapterRegistry, RegistrationResult};

pub use events::{BusEventAdapter, ScheduleAdapter};
pub use gateway::{HttpApiAdapter, LoadBalancerAdapter, RestApiAdapter, WebSocketAdapter};
pub use records::{ObjectStorageAdapter, QueueAdapter, StreamRecordsAdapter, TopicAdapter};

/// All adapters of this crate, in evaluation order.
pub fn registry() -> RegistrationResult<AdapterRegistry> {
    AdapterRegistry::new()
        .with(WebSocketAdapter)?
        .with(HttpApiAdapter)?
        .with(LoadBalancerAdapter)?
        .with(RestApiAdapter)?
        .with(QueueAdapter)?
        .with(StreamRecordsAdapter)?
        .with(ObjectStorageAdapter)?
        .with(TopicAdapter)?
        .with(ScheduleAdapter)?
        .with(BusEventAdapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_core::{Adapter, NormalizeError};

    fn every_adapter() -> Vec<Box<dyn Adapter>> {
        vec![
            Box::new(WebSocketAdapter),
            Box::new(HttpApiAdapter),
            Box::new(LoadBalancerAdapter),
            Box::new(RestApiAdapter),
            Box::new(QueueAdapter),
            Box::new(StreamRecordsAdapter),
            Box::new(ObjectStorageAdapter),
            Box::new(TopicAdapter),
            Box::new(ScheduleAdapter),
            Box::new(BusEventAdapter),
        ]
    }

    #[test]
    fn registry_order() {
        let registry = registry().unwrap();
        assert_eq!(
            registry.names(),
            [
                "websocket",
                "http_api",
                "load_balancer",
                "rest_api",
                "queue",
                "stream_records",
                "object_storage",
                "topic",
                "schedule",
                "bus_event",
            ]
        );
    }

    #[test]
    fn each_payload_has_exactly_one_claimant() {
        let adapters = every_adapter();
        for (expected, raw) in fixtures::all() {
            let claimants: Vec<_> = adapters
                .iter()
                .filter(|a| a.can_handle(&raw))
                .map(|a| a.name())
                .collect();
            assert_eq!(claimants, [expected], "payload for {expected}");
        }
    }

    #[test]
    fn registry_normalizes_every_fixture() {
        let registry = registry().unwrap();
        for (expected, raw) in fixtures::all() {
            let request = registry.detect_and_adapt(&raw).unwrap();
            assert_eq!(request.adapter(), expected);
            assert_eq!(request.raw(), &raw);
        }
    }

    #[test]
    fn unknown_payloads_are_unrecognized() {
        let registry = registry().unwrap();
        for raw in [
            json!({}),
            json!({"Records": [{"eventSource": "aws:unknown"}]}),
            json!({"source": "orders"}),
            json!("just a string"),
        ] {
            assert!(matches!(
                registry.detect_and_adapt(&raw),
                Err(NormalizeError::UnrecognizedEvent)
            ));
        }
    }

    #[test]
    fn claimed_but_broken_payload_is_malformed() {
        let registry = registry().unwrap();
        let raw = json!({"Records": [{"eventSource": "aws:sqs"}]});
        let err = registry.detect_and_adapt(&raw).unwrap_err();
        assert!(matches!(err, NormalizeError::Malformed { adapter: "queue", .. }));
    }
}
