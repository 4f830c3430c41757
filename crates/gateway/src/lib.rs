//! HTTP API gateway for promptline.
//!
//! Exposes the chat endpoint, profile management, usage statistics and a
//! health check under `/api`. Unknown routes get a 404 listing what exists.
//!
//! Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use promptline_agent::{ChatOrchestrator, ChatSettings};
use promptline_config::{AppConfig, AuditConfig, AuditSinkKind};
use promptline_core::{Error, Generator, NewProfile};
use promptline_profiles::ProfileRegistry;
use promptline_providers::{GeminiGenerator, WebhookSink};
use promptline_security::{AuditDispatcher, AuditSink, JsonlFileSink, NullSink, TracingSink};
use promptline_telemetry::UsageMetrics;

/// Header that selects the behavior profile for a chat request.
pub const PROFILE_HEADER: &str = "x-prompt-id";

/// Routes advertised by the 404 handler.
pub const ENDPOINTS: &[&str] = &[
    "POST /api/chat",
    "GET /api/prompts",
    "GET /api/prompts/current",
    "POST /api/prompts/switch",
    "POST /api/prompts/custom",
    "GET /api/prompts/stats",
    "GET /api/prompts/history",
    "GET /api/health",
];

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<ChatOrchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }

    pub fn registry(&self) -> &Arc<ProfileRegistry> {
        self.orchestrator.registry()
    }

    pub fn metrics(&self) -> &Arc<UsageMetrics> {
        self.orchestrator.metrics()
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with every `/api` route, without CORS or body limits.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/chat", post(api::chat_handler))
        .route("/api/prompts", get(api::overview_handler))
        .route("/api/prompts/current", get(api::current_handler))
        .route("/api/prompts/switch", post(api::switch_handler))
        .route("/api/prompts/custom", post(api::register_handler))
        .route("/api/prompts/stats", get(api::stats_handler))
        .route("/api/prompts/history", get(api::history_handler))
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Build the served router: routes plus body limit, CORS and HTTP tracing.
pub fn build_full_router(state: SharedState, config: &AppConfig) -> Router {
    build_router(state)
        .layer(DefaultBodyLimit::max(config.gateway.body_limit_bytes))
        .layer(cors_layer(&config.gateway.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(PROFILE_HEADER)])
        .max_age(Duration::from_secs(3600))
}

/// Build the profile registry, including custom profiles declared in config.
///
/// A config profile that fails registration aborts startup, as does a default
/// profile id that names nothing.
pub fn build_registry(config: &AppConfig) -> Result<ProfileRegistry, Error> {
    let registry = ProfileRegistry::with_builtins_and_capacity(config.profiles.history_capacity);

    for custom in &config.profiles.custom {
        registry.register(NewProfile {
            id: custom.id.clone(),
            name: custom.name.clone(),
            description: custom.description.clone(),
            prompt: custom.prompt.clone(),
            version: custom.version.clone(),
        })?;
    }

    if !registry.contains(&config.chat.default_profile) {
        return Err(Error::Config {
            message: format!(
                "default profile '{}' is not registered",
                config.chat.default_profile
            ),
        });
    }
    Ok(registry)
}

/// Pick the audit sink named by config. `None` when auditing is disabled.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Option<Arc<dyn AuditSink>>, Error> {
    if !config.enabled {
        return Ok(None);
    }
    let sink: Arc<dyn AuditSink> = match config.sink {
        AuditSinkKind::Tracing => Arc::new(TracingSink),
        AuditSinkKind::None => Arc::new(NullSink),
        AuditSinkKind::File => {
            let path = config.path.clone().ok_or_else(|| Error::Config {
                message: "audit.path is required for the file sink".into(),
            })?;
            Arc::new(JsonlFileSink::new(path))
        }
        AuditSinkKind::Webhook => {
            let url = config.webhook_url.clone().ok_or_else(|| Error::Config {
                message: "audit.webhook_url is required for the webhook sink".into(),
            })?;
            Arc::new(WebhookSink::new(
                url,
                Duration::from_secs(config.timeout_secs),
            )?)
        }
    };
    Ok(Some(sink))
}

/// Wire registry, metrics, generator and audit dispatcher into shared state.
///
/// Must run inside a Tokio runtime; the audit worker is spawned here and its
/// handle returned.
pub fn build_state(
    config: &AppConfig,
    generator: Arc<dyn Generator>,
    audit_sink: Option<Arc<dyn AuditSink>>,
) -> Result<(SharedState, Option<JoinHandle<()>>), Error> {
    let registry = Arc::new(build_registry(config)?);
    let metrics = Arc::new(UsageMetrics::new());

    let mut orchestrator = ChatOrchestrator::new(
        registry,
        metrics,
        generator,
        ChatSettings::from_config(config),
    );

    let mut worker = None;
    if let Some(sink) = audit_sink {
        let (dispatcher, handle) = AuditDispatcher::spawn(
            sink,
            config.audit.queue_capacity,
            Duration::from_secs(config.audit.timeout_secs),
        );
        orchestrator = orchestrator.with_audit(dispatcher);
        worker = Some(handle);
    }

    Ok((Arc::new(GatewayState::new(Arc::new(orchestrator))), worker))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let generator = Arc::new(GeminiGenerator::from_config(&config.generator)?);
    if !generator.is_configured() {
        warn!("No generator API key configured; every chat request will get the fallback reply");
    }

    let audit_sink = build_audit_sink(&config.audit)?;
    let (state, _audit_worker) = build_state(&config, generator, audit_sink)?;

    info!(
        profiles = state.registry().list().len(),
        default_profile = %config.chat.default_profile,
        audit = %config.audit.sink,
        "Profiles and audit sink ready"
    );

    let app = build_full_router(state, &config);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    uptime_secs: i64,
    services: HealthServices,
}

#[derive(Serialize)]
struct HealthServices {
    generator: &'static str,
    audit: AuditHealth,
}

#[derive(Serialize)]
struct AuditHealth {
    sink: String,
    #[serde(flatten)]
    stats: promptline_security::AuditStats,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let now = Utc::now();
    let orchestrator = &state.orchestrator;
    let audit = match orchestrator.audit() {
        Some(dispatcher) => AuditHealth {
            sink: dispatcher.sink_name().to_string(),
            stats: dispatcher.stats(),
        },
        None => AuditHealth {
            sink: "disabled".into(),
            stats: Default::default(),
        },
    };

    Json(HealthResponse {
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        uptime_secs: (now - state.started_at).num_seconds(),
        services: HealthServices {
            generator: if orchestrator.generator().is_configured() {
                "configured"
            } else {
                "not_configured"
            },
            audit,
        },
    })
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Endpoint not found",
            "available_endpoints": ENDPOINTS,
        })),
    )
}
