// Runner API server: health, run intake, run/step lookups, and the live
// event stream.

mod auth;
mod dto;
mod error;
mod events;
mod runs;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use runner_core::ExecutorRegistry;
use runner_worker::{create_runner, Orchestrator, RunnerConfig, WorkflowClient};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        runs::create_run,
        runs::get_run,
        runs::list_runs,
        runs::cancel_run,
        runs::list_steps,
        runs::get_step,
        events::stream_run_events,
    ),
    components(schemas(
        runner_contracts::Run,
        runner_contracts::StepRun,
        runner_contracts::CreateRunRequest,
        runner_core::RunStatus,
        runner_core::StepStatus,
    )),
    tags((name = "runs", description = "Workflow run execution endpoints")),
    info(
        title = "Runner API",
        version = "0.1.0",
        description = "Workflow run intake, lookups, and live event stream",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runner_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("runner-api starting...");

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let workflow_service_url = std::env::var("WORKFLOW_SERVICE_URL")
        .context("WORKFLOW_SERVICE_URL environment variable required")?;
    let bind_addr =
        std::env::var("RUNNER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let db = runner_storage::Database::from_url(&database_url)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;
    tracing::info!("connected to database and ran migrations");

    let registry = Arc::new(ExecutorRegistry::with_builtins());
    let bus = runner_worker::EventBus::new();
    let workflow_client = WorkflowClient::new(workflow_service_url.clone());
    let repository: Arc<dyn runner_storage::RunRepository> = Arc::new(db.clone());
    let orchestrator = Orchestrator::new(repository, registry, bus.clone(), workflow_client);

    let runner_config = RunnerConfig::from_env().context("invalid WORKFLOW_RUNNER value")?;
    let runner = create_runner(&runner_config, orchestrator);
    tracing::info!(runner_type = ?runner_config.runner_type, "workflow runner configured");

    let state = AppState { db, bus, runner };

    let app = Router::new()
        .route("/health", get(health))
        .merge(runs::routes(state.clone()))
        .merge(events::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
