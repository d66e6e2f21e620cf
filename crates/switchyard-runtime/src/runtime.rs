//! Invocation host.
//!
//! A [`Runtime`] owns the loaded configuration and a frozen
//! [`Dispatcher`]. It supplies what the core leaves to the host: a deadline
//! and a cancellation token for every invocation, the policy for queue
//! batches that match no route, and a JSON-lines loop that serves one invocation per
//! input line.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchyard_runtime::Runtime;
//!
//! let runtime = Runtime::builder()
//!     .config_file("switchyard.toml")
//!     .build(|app| {
//!         app.get("/health", || async { "ok" })?;
//!         Ok(())
//!     })?;
//!
//! // One payload at a time, as a function host would call it
//! let reply = runtime.invoke(&payload).await;
//!
//! // Or newline-delimited payloads on stdin, replies on stdout
//! runtime.run().await?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use serde_json::Value;
use switchyard_core::integration::call_reply;
use switchyard_core::{AdapterRegistry, RegistrationResult, Response, TriggerKind};
use switchyard_framework::{App, Dispatcher, ErrorReply, Failure, InvocationScope, Outcome};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::signal;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, SwitchyardConfig, UnroutedBatch, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Counters for one [`Runtime::run_lines`] session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Lines dispatched.
    pub invocations: u64,
    /// Dispatched lines whose outcome carried a failure.
    pub failures: u64,
    /// Lines rejected before dispatch (too long or not JSON).
    pub rejected: u64,
}

impl RunStats {
    fn record(&mut self, outcome: &Outcome) {
        self.invocations += 1;
        if !outcome.is_success() {
            self.failures += 1;
        }
    }
}

/// The Switchyard host.
#[derive(Clone)]
pub struct Runtime {
    config: Arc<SwitchyardConfig>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Creates a runtime builder that searches the current directory for
    /// configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Wraps an already built dispatcher. Does not touch logging.
    pub fn new(config: SwitchyardConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Parent of every invocation's cancellation token.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Cancels in-flight invocations and stops [`run_lines`](Self::run_lines)
    /// before its next line.
    pub fn shutdown(&self) {
        info!("Runtime shutdown requested");
        self.shutdown.cancel();
    }

    /// Dispatches one payload under the configured default deadline and
    /// returns the provider reply.
    pub async fn invoke(&self, raw: &Value) -> Value {
        let outcome = self.handle(raw, None).await;
        self.dispatcher.reply(outcome)
    }

    /// Like [`invoke`](Self::invoke) with a deadline chosen by the caller,
    /// e.g. from the provider's remaining execution time.
    pub async fn invoke_with_deadline(&self, raw: &Value, deadline: Instant) -> Value {
        let outcome = self.handle(raw, Some(deadline)).await;
        self.dispatcher.reply(outcome)
    }

    /// Dispatches one payload and returns the full outcome.
    ///
    /// The invocation's token is a child of the shutdown token and is
    /// cancelled when the deadline passes. Handlers observe it and decide
    /// how to stop; the runtime keeps waiting for their response.
    pub async fn handle(&self, raw: &Value, deadline: Option<Instant>) -> Outcome {
        let deadline =
            deadline.unwrap_or_else(|| Instant::now() + self.config.dispatch.default_timeout());
        let token = self.shutdown.child_token();
        let scope = InvocationScope::new()
            .with_deadline(deadline)
            .with_cancellation(token.clone());

        let dispatch = self.dispatcher.dispatch(raw, scope);
        tokio::pin!(dispatch);

        let outcome = tokio::select! {
            outcome = &mut dispatch => outcome,
            _ = tokio::time::sleep_until(deadline.into()) => {
                warn!("Invocation deadline passed, cancelling");
                token.cancel();
                dispatch.await
            }
        };

        self.apply_unrouted_policy(outcome)
    }

    /// Replaces the not-found response of an unmatched queue batch with the
    /// configured acknowledgement.
    fn apply_unrouted_policy(&self, mut outcome: Outcome) -> Outcome {
        let Some(Failure::RouteNotFound(not_found)) = &outcome.failure else {
            return outcome;
        };
        // Only queue batches have a per-record failure reply to act on.
        let Some(request) = outcome
            .request
            .as_ref()
            .filter(|r| r.trigger() == TriggerKind::QueueBatch)
        else {
            return outcome;
        };

        let policy = self.config.dispatch.unrouted_batch;
        warn!(
            lookup = %not_found.target,
            records = request.records().len(),
            ?policy,
            "Batch matched no trigger route"
        );
        let response = match policy {
            UnroutedBatch::Drop => Response::batch_report(Vec::<String>::new()),
            UnroutedBatch::Retry => {
                Response::batch_report(request.records().iter().map(|r| r.id().to_string()))
            }
        };
        outcome.response = response;
        outcome
    }

    /// Serves newline-delimited JSON payloads from `reader`, writing one
    /// reply line per payload to `writer`.
    ///
    /// Blank lines are skipped. Lines that are too long or not JSON get an
    /// error reply and do not stop the loop. Returns at end of input or on
    /// shutdown.
    pub async fn run_lines<R, W>(&self, reader: R, writer: W) -> RuntimeResult<RunStats>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let max = self.config.runtime.max_line_bytes;
        let mut input = FramedRead::new(reader, LinesCodec::new_with_max_length(max));
        let mut output = FramedWrite::new(writer, LinesCodec::new());
        let mut stats = RunStats::default();
        // The framed reader ends its stream once after a decode error.
        let mut resume = false;

        loop {
            let line = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Input loop stopped by shutdown");
                    break;
                }
                line = input.next() => line,
            };
            let Some(line) = line else {
                if std::mem::take(&mut resume) {
                    continue;
                }
                debug!("End of input");
                break;
            };

            let reply = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => match serde_json::from_str::<Value>(&line) {
                    Ok(raw) => {
                        let outcome = self.handle(&raw, None).await;
                        stats.record(&outcome);
                        self.dispatcher.reply(outcome)
                    }
                    Err(err) => {
                        warn!(error = %err, "Input line is not JSON");
                        stats.rejected += 1;
                        rejection(StatusCode::BAD_REQUEST, "invalid_json", err.to_string())
                    }
                },
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!(max_line_bytes = max, "Input line too long, skipped");
                    stats.rejected += 1;
                    resume = true;
                    rejection(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "payload_too_large",
                        format!("input line exceeds {max} bytes"),
                    )
                }
                Err(err) => return Err(err.into()),
            };

            output.send(reply.to_string()).await?;
        }

        info!(
            invocations = stats.invocations,
            failures = stats.failures,
            rejected = stats.rejected,
            "Input loop finished"
        );
        Ok(stats)
    }

    /// Runs [`run_lines`](Self::run_lines) on stdin/stdout until end of
    /// input, Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<RunStats> {
        let shutdown = self.shutdown.clone();
        let signals = tokio::spawn(async move {
            wait_for_signal().await;
            shutdown.cancel();
        });

        info!("Switchyard runtime reading invocations from stdin");
        let result = self
            .run_lines(tokio::io::stdin(), tokio::io::stdout())
            .await;
        signals.abort();
        result
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("dispatcher", &self.dispatcher)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

fn rejection(status: StatusCode, code: &'static str, message: String) -> Value {
    call_reply(ErrorReply::new(status, code, message).into_response())
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(err) => error!(error = %err, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration, initializes logging and builds the app.
///
/// ```rust,ignore
/// let runtime = Runtime::builder()
///     .profile("production")
///     .adapters(switchyard_adapter_aws::registry()?)
///     .build(|app| {
///         app.post("/orders", typed(create_order))?;
///         Ok(())
///     })?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<SwitchyardConfig>,
    adapters: Option<AdapterRegistry>,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            adapters: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration on top of the loaded sources.
    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is instead of loading any source.
    pub fn config(mut self, config: SwitchyardConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Installs the adapters the app normalizes payloads with.
    pub fn adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads configuration, then lets `configure` register routes on an
    /// [`App`] created with the configured dispatch options.
    pub fn build<F>(self, configure: F) -> RuntimeResult<Runtime>
    where
        F: FnOnce(&mut App) -> RegistrationResult<()>,
    {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let mut app = App::with_options(config.dispatch.options());
        if let Some(adapters) = self.adapters {
            app = app.with_adapters(adapters);
        }
        configure(&mut app)?;

        let dispatcher = app.build();
        info!(
            log_level = %config.logging.level,
            timeout_ms = config.dispatch.default_timeout_ms,
            unrouted_batch = ?config.dispatch.unrouted_batch,
            "Runtime initialized from configuration"
        );
        Ok(Runtime::new(config, dispatcher))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use switchyard_core::{Adapter, AdapterResult, Record, Request, TriggerKind};
    use switchyard_framework::{Cancellation, Records};

    /// `{"path": "/x"}` → GET call, `{"queue": "q", "ids": [...]}` → batch,
    /// `{"bucket": "b", "ids": [...]}` → object notification.
    struct LineAdapter;

    impl Adapter for LineAdapter {
        fn name(&self) -> &'static str {
            "line"
        }

        fn can_handle(&self, raw: &Value) -> bool {
            ["path", "queue", "bucket"].iter().any(|key| raw.get(key).is_some())
        }

        fn adapt(&self, raw: &Value) -> AdapterResult<Request> {
            if let Some(path) = raw["path"].as_str() {
                return Ok(Request::builder(TriggerKind::Call).path(path).build());
            }
            let (kind, source) = match raw["bucket"].as_str() {
                Some(bucket) => (TriggerKind::ObjectNotification, bucket),
                None => (TriggerKind::QueueBatch, raw["queue"].as_str().unwrap_or_default()),
            };
            let records = raw["ids"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(|id| Record::new(id, id.to_string()))
                .collect();
            Ok(Request::builder(kind)
                .source(source)
                .records(records)
                .build())
        }

        fn reply(&self, request: &Request, response: Response) -> Value {
            if request.trigger().is_batch() {
                json!({ "failed": response.failed_records() })
            } else {
                call_reply(response)
            }
        }
    }

    fn runtime(config: SwitchyardConfig) -> Runtime {
        Runtime::builder()
            .config(config)
            .adapters(AdapterRegistry::new().with(LineAdapter).unwrap())
            .without_logging()
            .build(|app| {
                app.get("/ping", || async { "pong" })?;
                app.get("/slow", |Cancellation(token): Cancellation| async move {
                    token.cancelled().await;
                    "gave up"
                })?;
                app.trigger(TriggerKind::QueueBatch, "orders", |records: Records| async move {
                    let mut res = Response::ok();
                    for record in records.iter().filter(|r| r.id() == "bad") {
                        res.fail_record(record.id());
                    }
                    res
                })?;
                Ok(())
            })
            .unwrap()
    }

    #[tokio::test]
    async fn invoke_returns_the_provider_reply() {
        let rt = runtime(SwitchyardConfig::default());
        let reply = rt.invoke(&json!({"path": "/ping"})).await;
        assert_eq!(reply["statusCode"], 200);
        assert_eq!(reply["body"], "pong");

        let reply = rt.invoke(&json!({"queue": "orders", "ids": ["a", "bad", "c"]})).await;
        assert_eq!(reply, json!({"failed": ["bad"]}));
    }

    #[tokio::test]
    async fn unrouted_batches_follow_the_policy() {
        let raw = json!({"queue": "unknown", "ids": ["1", "2"]});

        let outcome = runtime(SwitchyardConfig::default()).handle(&raw, None).await;
        assert!(matches!(outcome.failure, Some(Failure::RouteNotFound(_))));
        assert_eq!(outcome.response.status(), StatusCode::OK);
        assert!(!outcome.response.has_failed_records());

        let mut config = SwitchyardConfig::default();
        config.dispatch.unrouted_batch = UnroutedBatch::Retry;
        let reply = runtime(config).invoke(&raw).await;
        assert_eq!(reply, json!({"failed": ["1", "2"]}));
    }

    #[tokio::test]
    async fn retry_policy_leaves_unrouted_object_notifications_alone() {
        let mut config = SwitchyardConfig::default();
        config.dispatch.unrouted_batch = UnroutedBatch::Retry;
        let outcome = runtime(config)
            .handle(&json!({"bucket": "uploads", "ids": ["k1"]}), None)
            .await;

        assert!(matches!(outcome.failure, Some(Failure::RouteNotFound(_))));
        assert_eq!(outcome.response.status(), StatusCode::NOT_FOUND);
        assert!(!outcome.response.has_failed_records());
    }

    #[tokio::test]
    async fn unrouted_calls_stay_not_found() {
        let rt = runtime(SwitchyardConfig::default());
        let reply = rt.invoke(&json!({"path": "/missing"})).await;
        assert_eq!(reply["statusCode"], 404);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_the_invocation_token() {
        let mut config = SwitchyardConfig::default();
        config.dispatch.default_timeout_ms = 50;
        let rt = runtime(config);

        let reply = rt.invoke(&json!({"path": "/slow"})).await;
        assert_eq!(reply["body"], "gave up");
        assert!(!rt.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn explicit_deadline_reaches_the_context() {
        let rt = runtime(SwitchyardConfig::default());
        let deadline = Instant::now() + Duration::from_millis(20);
        let reply = rt.invoke_with_deadline(&json!({"path": "/slow"}), deadline).await;
        assert_eq!(reply["body"], "gave up");
    }

    #[tokio::test]
    async fn shutdown_cancels_in_flight_invocations() {
        let rt = runtime(SwitchyardConfig::default());
        let pending = tokio::spawn({
            let rt = rt.clone();
            async move { rt.invoke(&json!({"path": "/slow"})).await }
        });
        tokio::task::yield_now().await;
        rt.shutdown();
        assert_eq!(pending.await.unwrap()["body"], "gave up");
    }

    #[tokio::test]
    async fn run_lines_replies_once_per_payload() {
        let mut config = SwitchyardConfig::default();
        config.runtime.max_line_bytes = 64;
        let rt = runtime(config);

        let input = format!(
            "{}\n\n{{\"path\": \"{}\"}}\n{}\nnot json\n",
            json!({"path": "/ping"}),
            "/x".repeat(40),
            json!({"queue": "orders", "ids": ["bad"]}),
        );
        let mut output = Vec::new();
        let stats = rt.run_lines(input.as_bytes(), &mut output).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0]["body"], "pong");
        assert_eq!(replies[1]["statusCode"], 413);
        assert_eq!(replies[2], json!({"failed": ["bad"]}));
        assert_eq!(replies[3]["statusCode"], 400);
        assert_eq!(
            stats,
            RunStats {
                invocations: 2,
                failures: 0,
                rejected: 2,
            }
        );
    }

    #[tokio::test]
    async fn run_lines_stops_on_shutdown() {
        let rt = runtime(SwitchyardConfig::default());
        rt.shutdown();

        let input = format!("{}\n", json!({"path": "/ping"}));
        let mut output = Vec::new();
        let stats = rt.run_lines(input.as_bytes(), &mut output).await.unwrap();
        assert_eq!(stats, RunStats::default());
        assert!(output.is_empty());
    }

    #[test]
    fn invalid_preset_config_is_rejected() {
        let mut config = SwitchyardConfig::default();
        config.dispatch.default_timeout_ms = 0;
        let err = Runtime::builder()
            .config(config)
            .without_logging()
            .build(|_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, crate::RuntimeError::Config(_)));
    }
}
