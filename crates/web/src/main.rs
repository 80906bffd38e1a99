use anyhow::Context;
use storage::models::RallyId;
use storage::{Database, StandingsEngine};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod hydration;
mod middleware;
mod routes;
mod state;

use config::Config;
use features::{competitors, entries, stages, standings};
use middleware::auth::ApiKeys;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health,
        stages::handlers::list_stages,
        stages::handlers::get_stage_classification,
        stages::handlers::sync_stages,
        standings::handlers::get_overall_standings,
        entries::handlers::submit_entry,
        entries::handlers::submit_batch,
        competitors::handlers::register_competitor,
    ),
    components(
        schemas(
            routes::HealthResponse,
            storage::dto::StageResponse,
            storage::dto::StageClassificationResponse,
            storage::dto::StageResultRow,
            storage::dto::StageUnclassifiedRow,
            storage::dto::OverallStandingsResponse,
            storage::dto::OverallRow,
            storage::dto::OverallUnclassifiedRow,
            storage::dto::SubmitEntryRequest,
            storage::dto::BatchSubmitRequest,
            storage::dto::EntryOutcomeResponse,
            storage::dto::BatchOutcomeResponse,
            storage::dto::RegisterCompetitorRequest,
            storage::dto::CompetitorResponse,
            storage::models::EntryStatus,
            storage::models::StageStatus,
            storage::models::StandingStatus,
        )
    ),
    tags(
        (name = "stages", description = "Stage definitions and stage results"),
        (name = "standings", description = "Overall rally standings"),
        (name = "entries", description = "Stage result submission"),
        (name = "competitors", description = "Crew registration"),
        (name = "health", description = "Liveness"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting rally results API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let api_keys = ApiKeys::from_comma_separated(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("No API keys configured; write endpoints will refuse every request");
    }

    let state = AppState::new(db, StandingsEngine::new());
    for rally_id in &config.preload_rallies {
        let rally_id = RallyId::from(rally_id.as_str());
        match hydration::ensure_loaded(&state, &rally_id).await {
            Ok(()) => tracing::info!("Preloaded rally {}", rally_id),
            Err(e) => tracing::warn!("Could not preload rally {}: {}", rally_id, e),
        }
    }

    let app = routes::router(state, api_keys).merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    axum::serve(listener, app).await?;

    Ok(())
}
