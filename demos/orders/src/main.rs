//! Orders Demo
//!
//! One deployment that serves an HTTP API, settles payments from a queue,
//! audits bus events, indexes uploads, runs a nightly report and echoes
//! socket messages.
//!
//! # Routes
//!
//! ```text
//! Call                GET  /health
//! Call                GET  /orders/:id
//! Call                POST /orders                (typed, 201)
//! QueueBatch          payments                    (per record)
//! CustomEvent         orders.*
//! ObjectNotification  uploads
//! Scheduled           nightly-report
//! Stream*             *
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Serve JSON-lines payloads on stdin
//! cargo run --package orders-demo
//!
//! # Handle a single payload file
//! cargo run --package orders-demo -- --event payload.json
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use switchyard::framework::http::HeaderValue;
use switchyard::framework::{Body, PathParamsExt};
use switchyard::prelude::*;
use tracing::{info, warn};

// ============================================================================
// Domain
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Order {
    id: u64,
    customer_id: String,
    lines: Vec<OrderLine>,
    shipping: String,
    paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(crate = "::switchyard::core")]
struct OrderLine {
    #[validate(non_empty)]
    sku: String,
    #[validate(range(min = 1, max = 99))]
    quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(crate = "::switchyard::core")]
struct CreateOrder {
    #[validate(non_empty, length(max = 64))]
    customer_id: String,
    #[validate(length(min = 1), nested)]
    lines: Vec<OrderLine>,
    #[validate(one_of("standard", "express"))]
    shipping: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(crate = "::switchyard::core")]
struct PaymentSettled {
    #[validate(range(min = 1))]
    order_id: u64,
}

/// In-memory order storage, shared by every invocation.
#[derive(Default)]
struct OrderStore {
    next_id: AtomicU64,
    orders: RwLock<BTreeMap<u64, Order>>,
}

impl OrderStore {
    fn insert(&self, input: CreateOrder) -> Order {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let order = Order {
            id,
            customer_id: input.customer_id,
            lines: input.lines,
            shipping: input.shipping,
            paid: false,
        };
        self.orders.write().insert(id, order.clone());
        order
    }

    fn get(&self, id: u64) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }

    fn mark_paid(&self, id: u64) -> bool {
        match self.orders.write().get_mut(&id) {
            Some(order) => {
                order.paid = true;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Call handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn get_order(
    params: PathParams,
    store: Service<OrderStore>,
) -> Result<Json<Order>, BoxError> {
    let id: u64 = params.parse("id")?;
    match store.get(id) {
        Some(order) => Ok(Json(order)),
        None => Err(HttpError::not_found(format!("order {id} does not exist")).into()),
    }
}

async fn create_order(
    ctx: Arc<InvocationContext>,
    input: CreateOrder,
) -> Result<Order, HttpError> {
    let store = ctx
        .service::<OrderStore>()
        .ok_or_else(|| HttpError::internal("order store is not configured"))?;
    let order = store.insert(input);
    info!(order_id = order.id, customer = %order.customer_id, "Order created");
    Ok(order)
}

// ============================================================================
// Trigger handlers
// ============================================================================

/// Fails the record when the order is unknown so the queue redelivers it.
async fn settle_payment(
    ctx: Arc<InvocationContext>,
    event: PaymentSettled,
) -> Result<(), HttpError> {
    let store = ctx
        .service::<OrderStore>()
        .ok_or_else(|| HttpError::internal("order store is not configured"))?;
    if store.mark_paid(event.order_id) {
        info!(order_id = event.order_id, "Payment settled");
        Ok(())
    } else {
        warn!(order_id = event.order_id, "Payment for unknown order");
        Err(HttpError::not_found(format!("order {} does not exist", event.order_id)))
    }
}

async fn audit_order_event(metadata: Metadata, Body(body): Body) {
    info!(
        source = metadata.get(Metadata::SOURCE).unwrap_or("-"),
        detail_type = metadata.get(Metadata::DETAIL_TYPE).unwrap_or("-"),
        bytes = body.len(),
        "Order event"
    );
}

async fn index_uploads(records: Records) {
    for record in records.iter() {
        info!(
            bucket = record.attribute("bucket").unwrap_or("-"),
            key = record.attribute("key").unwrap_or("-"),
            size = record.attribute("size").unwrap_or("0"),
            "Upload indexed"
        );
    }
}

async fn nightly_report(store: Service<OrderStore>) -> serde_json::Value {
    let orders = store.orders.read();
    let paid = orders.values().filter(|o| o.paid).count();
    info!(total = orders.len(), paid, "Nightly report");
    serde_json::json!({ "total": orders.len(), "paid": paid })
}

async fn socket_event(ctx: Arc<InvocationContext>) -> Response {
    let request = ctx.request();
    let connection = request
        .metadata()
        .get(Metadata::CONNECTION_ID)
        .unwrap_or("-");
    match request.trigger() {
        TriggerKind::StreamMessage => {
            let echo = String::from_utf8_lossy(request.body()).into_owned();
            Response::text(StatusCode::OK, echo)
        }
        kind => {
            info!(connection, kind = %kind, "Socket lifecycle");
            Response::ok()
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn configure(app: &mut App) -> switchyard::core::RegistrationResult<()> {
    app.service(Arc::new(OrderStore::default()));

    app.layer(from_fn(|ctx: Arc<InvocationContext>, next: Next| async move {
        let request_id = ctx.request().request_id().to_string();
        let mut response = next.run(ctx).await?;
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }
        Ok(response)
    }));

    app.get("/health", health)?;
    app.get("/orders/:id", get_order)?;
    app.post("/orders", typed(create_order).status(StatusCode::CREATED))?;

    app.trigger(
        TriggerKind::QueueBatch,
        "payments",
        for_each_record(settle_payment),
    )?;
    app.trigger(TriggerKind::CustomEvent, "orders.*", audit_order_event)?;
    app.trigger(TriggerKind::ObjectNotification, "uploads", index_uploads)?;
    app.trigger(TriggerKind::Scheduled, "nightly-report", nightly_report)?;
    app.trigger(TriggerKind::StreamConnect, "*", socket_event)?;
    app.trigger(TriggerKind::StreamMessage, "*", socket_event)?;
    app.trigger(TriggerKind::StreamDisconnect, "*", socket_event)?;
    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "orders-demo", about = "Switchyard order service demo")]
struct Cli {
    /// Configuration file; its `<stem>.<profile>.<ext>` variant is merged too.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (development, production or a custom name).
    #[arg(short, long)]
    profile: Option<String>,

    /// Handle one payload from this file and print the reply.
    #[arg(short, long)]
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = Runtime::builder().adapters(switchyard::aws::registry()?);
    if let Some(config) = &cli.config {
        builder = builder.config_file(config);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build(configure)?;

    if let Some(path) = cli.event {
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let raw: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        let reply = runtime.invoke(&raw).await;
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    let stats = runtime.run().await?;
    info!(
        invocations = stats.invocations,
        failures = stats.failures,
        rejected = stats.rejected,
        "Shut down"
    );
    Ok(())
}
