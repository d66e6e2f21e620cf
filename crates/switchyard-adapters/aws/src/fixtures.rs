//! Trimmed provider payloads used across the adapter tests.

use serde_json::{Value, json};

pub(crate) fn http_api() -> Value {
    json!({
        "version": "2.0",
        "routeKey": "POST /orders/{id}",
        "rawPath": "/orders/42",
        "rawQueryString": "tag=a&tag=b",
        "cookies": ["session=abc", "theme=dark"],
        "headers": {"content-type": "application/json", "x-trace": "t-1"},
        "requestContext": {
            "accountId": "123456789012",
            "requestId": "req-v2",
            "stage": "$default",
            "domainName": "api.example.com",
            "time": "12/Mar/2024:19:03:58 +0000",
            "http": {"method": "POST", "path": "/orders/42", "sourceIp": "10.0.0.1"}
        },
        "body": "{\"qty\":2}",
        "isBase64Encoded": false
    })
}

pub(crate) fn rest_api() -> Value {
    json!({
        "resource": "/users/{id}",
        "path": "/users/7",
        "httpMethod": "GET",
        "headers": {"accept": "text/html"},
        "multiValueHeaders": {"accept": ["text/html", "application/json"]},
        "queryStringParameters": {"sort": "name"},
        "multiValueQueryStringParameters": {"sort": ["asc", "name"]},
        "requestContext": {
            "accountId": "123456789012",
            "requestId": "req-v1",
            "stage": "prod"
        },
        "body": null,
        "isBase64Encoded": false
    })
}

pub(crate) fn load_balancer() -> Value {
    json!({
        "requestContext": {
            "elb": {
                "targetGroupArn": "arn:aws:elasticloadbalancing:eu-west-1:123456789012:targetgroup/web/abc"
            }
        },
        "httpMethod": "GET",
        "path": "/search",
        "queryStringParameters": {"q": "hello%20world"},
        "headers": {"host": "lb.example.com"},
        "body": "",
        "isBase64Encoded": false
    })
}

pub(crate) fn web_socket() -> Value {
    json!({
        "requestContext": {
            "routeKey": "sendMessage",
            "eventType": "MESSAGE",
            "connectionId": "conn-1",
            "requestId": "ws-1",
            "stage": "prod",
            "domainName": "ws.example.com"
        },
        "body": "{\"text\":\"hi\"}",
        "isBase64Encoded": false
    })
}

pub(crate) fn queue() -> Value {
    json!({
        "Records": [
            {
                "messageId": "m1",
                "body": "{\"id\":1}",
                "attributes": {"ApproximateReceiveCount": "1"},
                "messageAttributes": {
                    "priority": {"stringValue": "high", "dataType": "String"}
                },
                "eventSource": "aws:sqs",
                "eventSourceARN": "arn:aws:sqs:eu-west-1:123456789012:orders",
                "awsRegion": "eu-west-1"
            },
            {
                "messageId": "m2",
                "body": "{\"id\":2}",
                "attributes": {},
                "messageAttributes": {},
                "eventSource": "aws:sqs",
                "eventSourceARN": "arn:aws:sqs:eu-west-1:123456789012:orders",
                "awsRegion": "eu-west-1"
            }
        ]
    })
}

pub(crate) fn kinesis() -> Value {
    json!({
        "Records": [{
            "kinesis": {
                "partitionKey": "user-1",
                "sequenceNumber": "4955",
                "data": "aGVsbG8="
            },
            "eventSource": "aws:kinesis",
            "eventID": "shardId-000:4955",
            "eventName": "aws:kinesis:record",
            "eventSourceARN": "arn:aws:kinesis:eu-west-1:123456789012:stream/clicks",
            "awsRegion": "eu-west-1"
        }]
    })
}

pub(crate) fn dynamodb() -> Value {
    json!({
        "Records": [{
            "eventID": "e1",
            "eventName": "INSERT",
            "eventSource": "aws:dynamodb",
            "awsRegion": "eu-west-1",
            "dynamodb": {
                "Keys": {"id": {"S": "u1"}},
                "NewImage": {"id": {"S": "u1"}, "name": {"S": "Ada"}},
                "SequenceNumber": "111",
                "StreamViewType": "NEW_IMAGE"
            },
            "eventSourceARN": "arn:aws:dynamodb:eu-west-1:123456789012:table/Users/stream/2024-01-01T00:00:00.000"
        }]
    })
}

pub(crate) fn object_storage() -> Value {
    json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "awsRegion": "eu-west-1",
            "eventTime": "2024-03-12T19:03:58.000Z",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": "uploads", "arn": "arn:aws:s3:::uploads"},
                "object": {
                    "key": "reports/q1+summary.csv",
                    "size": 1024,
                    "eTag": "abc123",
                    "sequencer": "0055AED6DCD90281E5"
                }
            }
        }]
    })
}

pub(crate) fn topic() -> Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "EventVersion": "1.0",
            "Sns": {
                "Type": "Notification",
                "MessageId": "sns-1",
                "TopicArn": "arn:aws:sns:eu-west-1:123456789012:alerts",
                "Subject": "disk",
                "Message": "{\"level\":\"warn\"}",
                "Timestamp": "2024-03-12T19:03:58.000Z",
                "MessageAttributes": {"team": {"Type": "String", "Value": "ops"}}
            }
        }]
    })
}

pub(crate) fn schedule() -> Value {
    json!({
        "version": "0",
        "id": "sched-1",
        "detail-type": "Scheduled Event",
        "source": "aws.events",
        "account": "123456789012",
        "time": "2024-03-12T00:00:00Z",
        "region": "eu-west-1",
        "resources": ["arn:aws:events:eu-west-1:123456789012:rule/nightly-report"],
        "detail": {}
    })
}

pub(crate) fn bus_event() -> Value {
    json!({
        "version": "0",
        "id": "bus-1",
        "detail-type": "OrderCreated",
        "source": "orders.created",
        "account": "123456789012",
        "time": "2024-03-12T19:03:58Z",
        "region": "eu-west-1",
        "resources": [],
        "detail": {"orderId": "o-1", "total": 30}
    })
}

/// Every fixture with the adapter expected to claim it.
pub(crate) fn all() -> Vec<(&'static str, Value)> {
    vec![
        ("websocket", web_socket()),
        ("http_api", http_api()),
        ("load_balancer", load_balancer()),
        ("rest_api", rest_api()),
        ("queue", queue()),
        ("stream_records", kinesis()),
        ("stream_records", dynamodb()),
        ("object_storage", object_storage()),
        ("topic", topic()),
        ("schedule", schedule()),
        ("bus_event", bus_event()),
    ]
}
