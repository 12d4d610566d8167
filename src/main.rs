use axum::{
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use whois_analysis::{metrics, AnalysisRecord, Config, ServiceError, WhoisAnalyzer};

#[derive(Clone)]
pub struct AppState {
    analyzer: WhoisAnalyzer,
    config: Arc<Config>,
}

// Domain validation extractor
#[derive(Debug, Clone)]
pub struct ValidatedDomain(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ValidatedDomain
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let domain = Self::extract_domain_from_path(parts.uri.path())?;
        Self::validate_domain(domain)
    }
}

impl ValidatedDomain {
    fn extract_domain_from_path(path: &str) -> Result<String, ServiceError> {
        if let Some(domain_part) = path.strip_prefix("/analysis/") {
            let domain = domain_part.split('/').next().unwrap_or("").to_string();
            if !domain.is_empty() {
                return Ok(domain);
            }
        }

        Err(ServiceError::InvalidDomain("Domain not found in path".to_string()))
    }

    pub fn validate_domain(domain: String) -> Result<Self, ServiceError> {
        let domain = domain.trim().to_lowercase();

        if domain.is_empty() {
            metrics::increment_errors("invalid_domain");
            return Err(ServiceError::InvalidDomain("Empty domain".to_string()));
        }

        if domain.len() > 253 {
            metrics::increment_errors("domain_too_long");
            return Err(ServiceError::InvalidDomain("Domain name too long".to_string()));
        }

        if !domain.contains('.') || domain.contains("..") || domain.starts_with('.') || domain.ends_with('.') {
            metrics::increment_errors("invalid_domain_format");
            return Err(ServiceError::InvalidDomain("Invalid domain format".to_string()));
        }

        if domain.split('.').any(|label| label.starts_with('-') || label.ends_with('-')) {
            metrics::increment_errors("invalid_domain_format");
            return Err(ServiceError::InvalidDomain("Invalid domain label".to_string()));
        }

        Ok(ValidatedDomain(domain))
    }
}

#[derive(Deserialize)]
struct AnalysisQuery {
    /// Domain name to analyze (e.g., "example.com")
    domain: String,
}

#[derive(Serialize)]
struct AnalysisResponse {
    domain: String,
    record: AnalysisRecord,
    summary: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "whois_analysis=info,tower_http=debug".into()),
        )
        .init();

    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");
    info!(
        "Whois executable: {} (timeout {}s, {} concurrent lookups)",
        config.whois_binary, config.whois_timeout_seconds, config.concurrent_lookups
    );

    let analyzer = WhoisAnalyzer::from_config(&config);

    metrics::init_metrics();

    let app_state = AppState {
        analyzer,
        config: config.clone(),
    };

    let app = Router::new()
        .route("/analysis", get(analysis_query).post(analysis_post))
        .route("/analysis/:domain", get(analysis_path))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Whois analysis service listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Metrics: http://{}/metrics", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal, gracefully shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

async fn run_analysis(state: &AppState, domain: String) -> Json<AnalysisResponse> {
    let start_time = std::time::Instant::now();
    metrics::increment_analyses(&domain);

    let record = state.analyzer.analyze(&domain).await;

    metrics::record_flags(&record);
    metrics::record_query_time(start_time.elapsed().as_millis() as u64);

    let summary = record.summary();
    Json(AnalysisResponse {
        domain,
        record,
        summary,
    })
}

async fn analysis_query(
    Query(params): Query<AnalysisQuery>,
    State(state): State<AppState>,
) -> Result<Json<AnalysisResponse>, ServiceError> {
    let validated_domain = ValidatedDomain::validate_domain(params.domain)?;
    Ok(run_analysis(&state, validated_domain.0).await)
}

async fn analysis_post(
    State(state): State<AppState>,
    Json(payload): Json<AnalysisQuery>,
) -> Result<Json<AnalysisResponse>, ServiceError> {
    let validated_domain = ValidatedDomain::validate_domain(payload.domain)?;
    Ok(run_analysis(&state, validated_domain.0).await)
}

async fn analysis_path(
    validated_domain: ValidatedDomain,
    State(state): State<AppState>,
) -> Json<AnalysisResponse> {
    run_analysis(&state, validated_domain.0).await
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.start_time.elapsed().as_secs(),
    })
}
