//! Test harness running the full pipeline against mock services.
//!
//! Every harness gets its own job store, engine and recording tap, so tests
//! never share state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use serde_json::Value;
use server_core::domains::jobs::{Job, JobRecord};
use server_core::domains::pipeline::{submit_job, Submission};
use server_core::kernel::{ServerDeps, TestDependencies};
use server_core::server::{build_engine, build_router, AppEngine};
use test_context::AsyncTestContext;
use topic_bus::testing::RecordingTap;
use topic_bus::{CorrelationId, Engine};

/// How long a test waits for a pipeline run before failing.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Test harness wiring mock dependencies into a started engine.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let submission = ctx.submit("@chan", "user@example.com").await;
///     // ... assertions on ctx.job(&submission.job_id)
/// }
/// ```
pub struct TestHarness {
    /// Mocks shared with the engine - inspect calls and sent emails here.
    pub deps: TestDependencies,
    pub engine: AppEngine,
    /// Every routed message, in routing order.
    pub tap: Arc<RecordingTap>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::with_deps(TestDependencies::new())
    }

    async fn teardown(self) {
        self.engine.abort();
    }
}

impl TestHarness {
    /// Start the production pipeline on top of `deps`.
    pub fn with_deps(deps: TestDependencies) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let tap = RecordingTap::new();
        let engine = server_core::domains::pipeline::register_pipeline(Engine::builder(
            deps.clone().into_server_deps(),
        ))
        .with_tap(tap.clone())
        .build()
        .start();

        Self { deps, engine, tap }
    }

    /// Engine built exactly as the server builds it, for tests that do not
    /// need the recording tap.
    pub fn production_engine(deps: &TestDependencies) -> AppEngine {
        build_engine(deps.clone().into_server_deps())
    }

    pub fn server_deps(&self) -> &ServerDeps {
        self.engine.deps()
    }

    /// Router around this harness's engine.
    pub fn router(&self) -> Router {
        build_router(self.engine.clone(), &[])
    }

    /// Submit a job and wait for the whole pipeline run to finish.
    pub async fn submit(&self, channel: &str, email: &str) -> Submission {
        let submission = submit_job(Some(channel), Some(email), &self.engine)
            .await
            .expect("submission should be accepted");
        self.settle(submission.correlation_id)
            .await
            .expect("pipeline should settle");
        submission
    }

    /// Wait until every message of a run has been handled.
    pub async fn settle(&self, cid: CorrelationId) -> Result<()> {
        self.engine.settled_timeout(cid, SETTLE_TIMEOUT).await
    }

    /// Publish a raw payload and wait for the cascade to finish.
    pub async fn publish(&self, topic: &str, payload: Value) -> CorrelationId {
        self.engine
            .publish_and_settle(topic, payload)
            .await
            .expect("publish should settle")
    }

    /// Wait for `n` messages on `topic`, failing after the settle timeout.
    pub async fn wait_for(&self, topic: &str, n: usize) -> Result<()> {
        tokio::time::timeout(SETTLE_TIMEOUT, self.tap.wait_for(topic, n))
            .await
            .with_context(|| format!("timed out waiting for {} message(s) on {}", n, topic))
    }

    pub async fn job(&self, job_id: &str) -> JobRecord {
        Job::find(job_id, self.server_deps().job_store.as_ref())
            .await
            .expect("job should be readable")
            .expect("job should exist")
    }

    pub async fn raw_job(&self, job_id: &str) -> Value {
        Job::find_raw(job_id, self.server_deps().job_store.as_ref())
            .await
            .expect("job store should be readable")
            .expect("job should exist")
    }
}
