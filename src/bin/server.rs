use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use abdm_integration_core::audit::{AuditController, AuditModule};
use abdm_integration_core::auth::{authenticate, AuthModule};
use abdm_integration_core::consent::ConsentModule;
use abdm_integration_core::core::config::AppConfig;
use abdm_integration_core::core::logger::init_tracing;
use abdm_integration_core::core::shutdown::ShutdownHandle;
use abdm_integration_core::database::Database;
use abdm_integration_core::gateway::GatewayModule;
use abdm_integration_core::hifetch::HiFetchModule;
use abdm_integration_core::models::constants::SHUTDOWN_DRAIN_DEADLINE;
use abdm_integration_core::records::{RecordsController, RecordsModule};
use abdm_integration_core::webhooksec::{verify_webhook, WebhookSecurity};
use abdm_integration_core::workers::WorkersModule;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "abdm-integration-core",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level, false);

    tracing::info!("starting abdm-integration-core");

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    let pool = database.pool().clone();

    let gateway = GatewayModule::new(config.abdm.clone())?;
    let audit = AuditModule::new(pool.clone());
    let auth = AuthModule::new(config.auth_service_url.clone(), std::time::Duration::from_secs(300));
    let records = RecordsModule::new(pool.clone(), audit.service());
    let consent = ConsentModule::new(
        pool.clone(),
        gateway.client(),
        audit.service(),
        config.callbacks.clone(),
        config.security.abdm_gateway_public_key.clone(),
    );
    let hifetch = HiFetchModule::new(
        pool.clone(),
        gateway.client(),
        audit.service(),
        consent.service(),
        records.service(),
        config.callbacks.health_record_callback_url.clone(),
    );

    // Built last: these controllers authorize against consent/hi-fetch
    // ownership, so they need both services already constructed.
    let records_controller = RecordsController::new(records.service(), consent.service(), hifetch.service());
    let audit_controller = AuditController::new(audit.service(), consent.service(), hifetch.service(), records.service());

    let shutdown = ShutdownHandle::new(SHUTDOWN_DRAIN_DEADLINE);
    shutdown.spawn_listener();
    let workers = WorkersModule::spawn(pool, consent.service(), hifetch.service(), shutdown.token());

    let webhook_security = Arc::new(WebhookSecurity::new(
        config.security.webhook_hmac_secret.clone(),
        config.security.webhook_allowed_source_ips.clone(),
    ));

    let authenticated_routes = Router::new()
        .merge(consent.routes())
        .merge(records_controller.routes())
        .merge(audit_controller.routes())
        .merge(hifetch.routes())
        .layer(middleware::from_fn_with_state(auth.service.clone(), authenticate));

    let webhook_routes = Router::new()
        .merge(consent.webhook_routes())
        .merge(hifetch.webhook_routes())
        .layer(middleware::from_fn_with_state(webhook_security, verify_webhook));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/abdm", authenticated_routes.merge(webhook_routes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    let shutdown_token = shutdown.token();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_token.cancelled().await;
    })
    .await?;

    workers.join().await;
    tracing::info!("shutdown complete");
    Ok(())
}
