//! Per-record binding for batch triggers.
//!
//! [`for_each_record`] decodes every record body of a batch into `I`, runs
//! the business function once per record, and reports exactly the records
//! that failed (binding or business error). The rest of the batch counts as
//! processed.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use switchyard_core::{InvocationContext, Response, Validate};
use tower::BoxError;
use tracing::{debug, warn};

use super::binder::bind;
use super::codec::{Codec, JsonCodec};
use crate::handler::Handler;

/// Marker distinguishing per-record bindings from other handlers.
pub struct RecordsMarker<I>(PhantomData<fn() -> I>);

/// See [`for_each_record`].
pub struct ForEachRecord<F, I, C = JsonCodec> {
    f: F,
    _marker: PhantomData<fn() -> (I, C)>,
}

/// Binds `f` to every record of a batch.
///
/// ```rust,ignore
/// async fn process(ctx: Arc<InvocationContext>, event: OrderPlaced) -> Result<(), StoreError> {
///     // ...
/// }
///
/// app.trigger(TriggerKind::QueueBatch, "orders", for_each_record(process))?;
/// ```
pub fn for_each_record<F, Fut, I>(f: F) -> ForEachRecord<F, I, JsonCodec>
where
    F: Fn(Arc<InvocationContext>, I) -> Fut,
{
    ForEachRecord {
        f,
        _marker: PhantomData,
    }
}

impl<F, I, C> ForEachRecord<F, I, C> {
    /// Switches the codec used for record bodies.
    pub fn codec<C2: Codec>(self) -> ForEachRecord<F, I, C2> {
        ForEachRecord {
            f: self.f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, I, C> Clone for ForEachRecord<F, I, C> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, I, E, C> Handler<RecordsMarker<I>> for ForEachRecord<F, I, C>
where
    F: Fn(Arc<InvocationContext>, I) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    I: DeserializeOwned + Validate + Send + 'static,
    E: Into<BoxError> + Send + 'static,
    C: Codec,
{
    async fn call(self, ctx: Arc<InvocationContext>) -> Result<Response, BoxError> {
        let request = ctx.request_arc();
        let mut failed = Vec::new();

        for record in request.records() {
            let input = match bind::<I, C>(record.body()) {
                Ok(input) => input,
                Err(err) => {
                    warn!(record_id = record.id(), error = %err, "Rejected batch record");
                    failed.push(record.id().to_string());
                    continue;
                }
            };

            if let Err(err) = (self.f)(Arc::clone(&ctx), input).await {
                let err: BoxError = err.into();
                warn!(record_id = record.id(), error = %err, "Batch record failed");
                failed.push(record.id().to_string());
            }
        }

        debug!(
            total = request.records().len(),
            failed = failed.len(),
            "Processed batch"
        );
        Ok(Response::batch_report(failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde::Deserialize;
    use switchyard_core::{Record, Request, TriggerKind, ValidationErrors};

    #[derive(Debug, Deserialize)]
    struct Job {
        n: u32,
    }

    impl Validate for Job {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            if self.n > 100 {
                errors.push("n", "range", "must be at most 100");
            }
            errors.into_result()
        }
    }

    fn batch(bodies: &[(&str, &'static str)]) -> Arc<InvocationContext> {
        let records = bodies
            .iter()
            .map(|(id, body)| Record::new(*id, *body))
            .collect();
        Arc::new(InvocationContext::new(Arc::new(
            Request::builder(TriggerKind::QueueBatch)
                .records(records)
                .build(),
        )))
    }

    #[tokio::test]
    async fn only_the_failing_record_is_reported() {
        let handler = for_each_record(|_ctx: Arc<InvocationContext>, job: Job| async move {
            if job.n == 3 {
                Err(HttpError::internal("record 3 exploded"))
            } else {
                Ok(())
            }
        });

        let ctx = batch(&[
            ("m1", r#"{"n":1}"#),
            ("m2", r#"{"n":2}"#),
            ("m3", r#"{"n":3}"#),
            ("m4", r#"{"n":4}"#),
            ("m5", r#"{"n":5}"#),
        ]);
        let res = handler.call(ctx).await.unwrap();
        assert_eq!(res.failed_records(), ["m3"]);
    }

    #[tokio::test]
    async fn binding_failures_are_reported_per_record() {
        let handler =
            for_each_record(|_ctx: Arc<InvocationContext>, _job: Job| async { Ok::<_, HttpError>(()) });

        let ctx = batch(&[
            ("a", r#"{"n":1}"#),
            ("b", "not json"),
            ("c", r#"{"n":500}"#),
        ]);
        let res = handler.call(ctx).await.unwrap();
        assert_eq!(res.failed_records(), ["b", "c"]);
    }
}
