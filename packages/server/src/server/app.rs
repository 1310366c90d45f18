//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use openai_client::OpenAIClient;
use resend::{ResendOptions, ResendService};
use topic_bus::{Engine, EngineHandle, TracingTap};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use youtube_client::YouTubeClient;

use crate::config::Config;
use crate::domains::pipeline::register_pipeline;
use crate::kernel::{
    InMemoryJobStore, OpenAIAdapter, ResendAdapter, ServerDeps, YouTubeAdapter,
};
use crate::server::routes::{get_job_handler, health_handler, submit_handler};

pub type AppEngine = EngineHandle<ServerDeps>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: AppEngine,
}

impl AppState {
    pub fn deps(&self) -> &ServerDeps {
        self.engine.deps()
    }
}

/// Wire the real service clients into a dependency container.
pub fn build_deps(config: &Config) -> ServerDeps {
    let youtube = YouTubeClient::new(config.youtube_api_key.clone());

    let openai = OpenAIClient::new(config.ai_api_key.clone()).with_base_url(&config.ai_base_url);

    let resend = ResendService::new(ResendOptions {
        api_key: config.resend_api_key.clone(),
        from: config.resend_from_email.clone(),
    });

    ServerDeps::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(YouTubeAdapter::new(Arc::new(youtube))),
        Arc::new(OpenAIAdapter::new(Arc::new(openai), config.ai_model.clone())),
        Arc::new(ResendAdapter::new(Arc::new(resend))),
    )
    .with_max_videos(config.max_videos)
}

/// Build and start the engine with every pipeline stage registered.
pub fn build_engine(server_deps: ServerDeps) -> AppEngine {
    register_pipeline(Engine::builder(server_deps))
        .with_tap(TracingTap)
        // Stages record their own failures
        .on_error(|error, message| {
            tracing::error!(topic = %message.topic, error = %error, "Handler failed");
        })
        .build()
        .start()
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid allowed origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
}

/// Build the Axum router around a started engine.
pub fn build_router(engine: AppEngine, allowed_origins: &[String]) -> Router {
    let app_state = AppState { engine };

    Router::new()
        .route("/submit", post(submit_handler))
        .route("/jobs/:id", get(get_job_handler))
        .route("/health", get(health_handler))
        .layer(Extension(app_state))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Build the Axum application from configuration.
///
/// Returns the router and the engine handle so the caller can keep the
/// dispatch loop alive for the lifetime of the server.
pub fn build_app(config: &Config) -> (Router, AppEngine) {
    let engine = build_engine(build_deps(config));
    let router = build_router(engine.clone(), &config.allowed_origins);
    (router, engine)
}
