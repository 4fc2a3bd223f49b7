use std::sync::Arc;

use anyhow::Context;
use storage::{Database, PgGateway};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;
mod state;

use config::Config;
use features::{billing, live, matches, roster, sessions};
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::sessions::handlers::create_session,
        features::sessions::handlers::get_session,
        features::sessions::handlers::my_sessions,
        features::sessions::handlers::start_session,
        features::sessions::handlers::cancel_session,
        features::roster::handlers::join_session,
        features::roster::handlers::cancel_join,
        features::roster::handlers::add_walkin,
        features::roster::handlers::check_in,
        features::roster::handlers::session_roster,
        features::roster::handlers::update_skill,
        features::matches::handlers::create_staged_match,
        features::matches::handlers::start_match,
        features::matches::handlers::start_staged_match,
        features::matches::handlers::end_match,
        features::matches::handlers::submit_result,
        features::matches::handlers::update_courts,
        features::matches::handlers::player_stats,
        features::matches::handlers::suggest_match,
        features::billing::handlers::checkout,
        features::live::handlers::get_live_state,
    ),
    components(
        schemas(
            storage::dto::session::CreateSessionRequest,
            storage::dto::session::SessionResponse,
            storage::dto::session::SessionDetailResponse,
            storage::dto::session::SessionSummary,
            storage::dto::roster::JoinSessionRequest,
            storage::dto::roster::JoinOutcome,
            storage::dto::roster::AddWalkinRequest,
            storage::dto::roster::CheckInRequest,
            storage::dto::roster::UpdateSkillRequest,
            storage::dto::roster::RosterEntry,
            storage::dto::roster::WaitingPlayer,
            storage::dto::matches::PlayerSelection,
            storage::dto::matches::CreateStagedMatchRequest,
            storage::dto::matches::StartMatchRequest,
            storage::dto::matches::StartStagedMatchRequest,
            storage::dto::matches::SubmitResultRequest,
            storage::dto::matches::UpdateCourtsRequest,
            storage::dto::matches::PlayerInMatch,
            storage::dto::matches::MatchView,
            storage::dto::matches::MatchHistoryEntry,
            storage::dto::matches::SuggestedMatch,
            storage::dto::matches::PlayerSessionStats,
            storage::dto::live::CourtStatus,
            storage::dto::live::LiveSessionState,
            storage::dto::billing::BillLine,
            storage::dto::billing::BillSummary,
            storage::models::Session,
            storage::models::SessionStatus,
            storage::models::Participant,
            storage::models::PlayerProfile,
            storage::models::ParticipantStatus,
            storage::models::GameMatch,
            storage::models::MatchStatus,
            storage::models::Team,
            storage::models::MatchOutcome,
            storage::models::MatchAssignment,
            storage::models::Bill,
            storage::models::BillStatus,
            storage::models::BillLineItem,
        )
    ),
    tags(
        (name = "sessions", description = "Session lifecycle endpoints"),
        (name = "roster", description = "Join, waitlist, and check-in endpoints"),
        (name = "matches", description = "Court and match lifecycle endpoints"),
        (name = "billing", description = "Checkout and billing endpoints"),
        (name = "live", description = "Live session state endpoints"),
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
                        .bearer_format("User id")
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

    tracing::info!("Starting drop-in session API");

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

    let app_state = AppState::new(Arc::new(PgGateway::new(&db)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let session_routes = sessions::routes::routes()
        .merge(roster::routes::routes())
        .merge(matches::routes::routes())
        .merge(live::routes::routes());
    let participant_routes = roster::routes::participant_routes().merge(billing::routes::routes());

    let app = axum::Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/sessions", session_routes)
        .nest("/api/matches", matches::routes::match_routes())
        .nest("/api/participants", participant_routes)
        .layer(cors)
        .with_state(app_state);

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
