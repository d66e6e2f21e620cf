//! Background work that outlives an invocation.

use std::sync::Arc;

use switchyard_core::InvocationContext;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

/// Spawns `f` on the current runtime with a [detached](InvocationContext::detach)
/// copy of `ctx`.
///
/// The task sees a snapshot of the invocation state and cannot reach the
/// response. It is cancelled when the host cancels the parent invocation's
/// token; the returned handle then resolves to `None`.
pub fn spawn_detached<F, Fut, T>(ctx: &InvocationContext, f: F) -> JoinHandle<Option<T>>
where
    F: FnOnce(Arc<InvocationContext>) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let detached = Arc::new(ctx.detach());
    let token = detached.cancellation().clone();
    let span = info_span!("detached", request_id = %detached.request().request_id());

    tokio::spawn(
        async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Detached task cancelled");
                    None
                }
                output = f(detached) => Some(output),
            }
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Request, TriggerKind};
    use tokio_util::sync::CancellationToken;

    fn ctx(token: CancellationToken) -> InvocationContext {
        InvocationContext::new(Arc::new(Request::builder(TriggerKind::Call).build()))
            .with_cancellation(token)
    }

    #[tokio::test]
    async fn runs_with_a_state_snapshot() {
        let parent = ctx(CancellationToken::new());
        parent.set("user", "alice".to_string());

        let handle = spawn_detached(&parent, |child| async move {
            assert!(child.is_detached());
            child.set("user", "bob".to_string());
            child.get::<String>("user")
        });
        assert_eq!(handle.await.unwrap(), Some(Some("bob".to_string())));
        assert_eq!(parent.get::<String>("user").as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn parent_cancellation_stops_the_task() {
        let token = CancellationToken::new();
        let parent = ctx(token.clone());

        let handle = spawn_detached(&parent, |_child| std::future::pending::<()>());
        token.cancel();
        assert_eq!(handle.await.unwrap(), None);
    }
}
