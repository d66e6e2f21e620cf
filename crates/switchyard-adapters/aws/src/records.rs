//! Record batch adapters: queues, streams, object storage and topics.

use std::sync::Arc;

use serde_json::Value;
use switchyard_core::{
    Adapter, AdapterError, AdapterResult, Metadata, Record, Request, Response, TriggerKind,
};
use tracing::trace;

use crate::model::{ObjectRecord, QueueMessage, RecordBatch, StreamRecord, TopicRecord};
use crate::reply;
use crate::support::{
    arn_resource_name, decode_body, decode_component, first_record_source, from_value,
};

fn batch<R: serde::de::DeserializeOwned>(raw: &Value) -> AdapterResult<Vec<R>> {
    let batch: RecordBatch<R> = from_value(raw, "Records")?;
    if batch.records.is_empty() {
        return Err(AdapterError::invalid("Records", "batch is empty"));
    }
    Ok(batch.records)
}

// =============================================================================
// Queue
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueAdapter;

impl Adapter for QueueAdapter {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        first_record_source(raw) == Some("aws:sqs")
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let messages: Vec<QueueMessage> = batch(raw)?;
        let source = arn_resource_name(&messages[0].event_source_arn).to_string();
        let region = messages[0].aws_region.clone();

        let records = messages
            .into_iter()
            .map(|m| {
                let mut record = Record::new(m.message_id, m.body);
                for (key, value) in m.attributes {
                    record = record.with_attribute(key, value);
                }
                for (key, attr) in m.message_attributes {
                    if let Some(value) = attr.string_value {
                        record = record.with_attribute(key, value);
                    }
                }
                record
            })
            .collect::<Vec<_>>();

        trace!(queue = %source, records = records.len(), "Adapted queue batch");
        let mut builder = Request::builder(TriggerKind::QueueBatch)
            .source(source)
            .records(records)
            .raw(Arc::new(raw.clone()));
        if let Some(region) = region {
            builder = builder.metadata(Metadata::REGION, region);
        }
        Ok(builder.build())
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::event(request, response)
    }
}

// =============================================================================
// Streams
// =============================================================================

/// Data streams and table change streams.
///
/// Records are identified by their sequence number, which is what the
/// provider expects back in a partial failure report.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamRecordsAdapter;

impl StreamRecordsAdapter {
    fn to_record(record: StreamRecord) -> AdapterResult<Record> {
        if let Some(kinesis) = record.kinesis {
            let data = decode_body(Some(&kinesis.data), true)?;
            let mut out = Record::new(kinesis.sequence_number, data);
            if let Some(key) = kinesis.partition_key {
                out = out.with_attribute("partition_key", key);
            }
            return Ok(out);
        }

        let Some(change) = record.dynamodb else {
            return Err(AdapterError::MissingField {
                field: "Records.kinesis",
            });
        };
        let id = change
            .get("SequenceNumber")
            .and_then(Value::as_str)
            .ok_or(AdapterError::MissingField {
                field: "Records.dynamodb.SequenceNumber",
            })?
            .to_string();
        let mut out = Record::new(id, change.to_string());
        if let Some(name) = record.event_name {
            out = out.with_attribute("event_name", name);
        }
        Ok(out)
    }
}

impl Adapter for StreamRecordsAdapter {
    fn name(&self) -> &'static str {
        "stream_records"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        matches!(first_record_source(raw), Some("aws:kinesis" | "aws:dynamodb"))
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let records: Vec<StreamRecord> = batch(raw)?;
        let source = arn_resource_name(&records[0].event_source_arn).to_string();
        let region = records[0].aws_region.clone();
        let records = records
            .into_iter()
            .map(Self::to_record)
            .collect::<AdapterResult<Vec<_>>>()?;

        let mut builder = Request::builder(TriggerKind::QueueBatch)
            .source(source)
            .records(records)
            .raw(Arc::new(raw.clone()));
        if let Some(region) = region {
            builder = builder.metadata(Metadata::REGION, region);
        }
        Ok(builder.build())
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::event(request, response)
    }
}

// =============================================================================
// Object storage
// =============================================================================

/// Object change notifications. One record per object, with an empty body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectStorageAdapter;

impl Adapter for ObjectStorageAdapter {
    fn name(&self) -> &'static str {
        "object_storage"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        first_record_source(raw) == Some("aws:s3")
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let notifications: Vec<ObjectRecord> = batch(raw)?;
        let first = &notifications[0];
        let bucket = first.s3.bucket.name.clone();
        let event_name = first.event_name.clone();
        let time = first.event_time.clone();
        let region = first.aws_region.clone();

        let records = notifications
            .into_iter()
            .map(|n| {
                let key = decode_component(&n.s3.object.key).into_owned();
                let id = n
                    .s3
                    .object
                    .sequencer
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}", n.s3.bucket.name, key));
                let mut record = Record::new(id, "")
                    .with_attribute("bucket", n.s3.bucket.name)
                    .with_attribute("key", key)
                    .with_attribute("event_name", n.event_name);
                if let Some(size) = n.s3.object.size {
                    record = record.with_attribute("size", size.to_string());
                }
                if let Some(etag) = n.s3.object.e_tag {
                    record = record.with_attribute("etag", etag);
                }
                record
            })
            .collect();

        let mut builder = Request::builder(TriggerKind::ObjectNotification)
            .source(bucket)
            .metadata(Metadata::EVENT_NAME, event_name)
            .records(records)
            .raw(Arc::new(raw.clone()));
        if let Some(time) = time {
            builder = builder.metadata(Metadata::TIME, time);
        }
        if let Some(region) = region {
            builder = builder.metadata(Metadata::REGION, region);
        }
        Ok(builder.build())
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::event(request, response)
    }
}

// =============================================================================
// Topic
// =============================================================================

/// Topic deliveries. The message becomes both the body and a record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicAdapter;

impl Adapter for TopicAdapter {
    fn name(&self) -> &'static str {
        "topic"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        first_record_source(raw) == Some("aws:sns")
    }

    fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
        let deliveries: Vec<TopicRecord> = batch(raw)?;
        let first = &deliveries[0].sns;
        let topic = arn_resource_name(&first.topic_arn).to_string();
        let body = first.message.clone();
        let request_id = first.message_id.clone();
        let mut builder = Request::builder(TriggerKind::CustomEvent)
            .source(topic)
            .body(body)
            .request_id(request_id);
        if let Some(subject) = &first.subject {
            builder = builder.metadata(Metadata::DETAIL_TYPE, subject);
        }
        if let Some(time) = &first.timestamp {
            builder = builder.metadata(Metadata::TIME, time);
        }

        let records = deliveries
            .into_iter()
            .map(|d| {
                let mut record = Record::new(d.sns.message_id, d.sns.message);
                for (key, attr) in d.sns.message_attributes {
                    record = record.with_attribute(key, attr.value);
                }
                record
            })
            .collect();

        Ok(builder.records(records).raw(Arc::new(raw.clone())).build())
    }

    fn reply(&self, request: &Request, response: Response) -> Value {
        reply::event(request, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;

    #[test]
    fn queue_batch() {
        let raw = fixtures::queue();
        assert!(QueueAdapter.can_handle(&raw));
        let req = QueueAdapter.adapt(&raw).unwrap();

        assert_eq!(req.trigger(), TriggerKind::QueueBatch);
        assert_eq!(req.source(), Some("orders"));
        let ids: Vec<_> = req.records().iter().map(Record::id).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(req.records()[0].body_str(), Some(r#"{"id":1}"#));
        assert_eq!(req.records()[0].attribute("priority"), Some("high"));
        assert_eq!(req.metadata().get(Metadata::REGION), Some("eu-west-1"));
    }

    #[test]
    fn queue_reply_reports_failures() {
        let raw = fixtures::queue();
        let req = QueueAdapter.adapt(&raw).unwrap();
        let reply = QueueAdapter.reply(&req, Response::batch_report(["m2"]));
        assert_eq!(reply, json!({"batchItemFailures": [{"itemIdentifier": "m2"}]}));
    }

    #[test]
    fn empty_batch_is_malformed() {
        let raw = json!({"Records": []});
        assert!(QueueAdapter.adapt(&raw).is_err());
    }

    #[test]
    fn kinesis_data_is_decoded() {
        let raw = fixtures::kinesis();
        assert!(StreamRecordsAdapter.can_handle(&raw));
        let req = StreamRecordsAdapter.adapt(&raw).unwrap();

        assert_eq!(req.trigger(), TriggerKind::QueueBatch);
        assert_eq!(req.source(), Some("clicks"));
        assert_eq!(req.records()[0].id(), "4955");
        assert_eq!(req.records()[0].body_str(), Some("hello"));
        assert_eq!(req.records()[0].attribute("partition_key"), Some("user-1"));
    }

    #[test]
    fn table_changes_use_sequence_numbers() {
        let raw = fixtures::dynamodb();
        let req = StreamRecordsAdapter.adapt(&raw).unwrap();

        assert_eq!(req.source(), Some("Users"));
        assert_eq!(req.records()[0].id(), "111");
        assert_eq!(req.records()[0].attribute("event_name"), Some("INSERT"));
        let change: Value = serde_json::from_slice(req.records()[0].body()).unwrap();
        assert_eq!(change["Keys"]["id"]["S"], "u1");
    }

    #[test]
    fn object_notification() {
        let raw = fixtures::object_storage();
        assert!(ObjectStorageAdapter.can_handle(&raw));
        let req = ObjectStorageAdapter.adapt(&raw).unwrap();

        assert_eq!(req.trigger(), TriggerKind::ObjectNotification);
        assert_eq!(req.source(), Some("uploads"));
        assert_eq!(
            req.metadata().get(Metadata::EVENT_NAME),
            Some("ObjectCreated:Put")
        );
        let record = &req.records()[0];
        assert_eq!(record.attribute("key"), Some("reports/q1 summary.csv"));
        assert_eq!(record.attribute("size"), Some("1024"));
        assert_eq!(record.attribute("etag"), Some("abc123"));
        assert!(record.body().is_empty());
    }

    #[test]
    fn topic_delivery() {
        let raw = fixtures::topic();
        assert!(TopicAdapter.can_handle(&raw));
        let req = TopicAdapter.adapt(&raw).unwrap();

        assert_eq!(req.trigger(), TriggerKind::CustomEvent);
        assert_eq!(req.source(), Some("alerts"));
        assert_eq!(req.body().as_ref(), br#"{"level":"warn"}"#);
        assert_eq!(req.request_id(), "sns-1");
        assert_eq!(req.records()[0].attribute("team"), Some("ops"));
    }
}
