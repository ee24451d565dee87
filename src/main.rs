use std::sync::Arc;

use auth_api::core::auth::jwt::DEV_SECRET;
use auth_api::core::auth::{AuthApiState, AuthService, JwtConfig, JwtService, auth_api_router};
use auth_api::core::config::Config;
use auth_api::core::db::{
    DbConfig, IdentityStore, MemoryIdentityStore, MemoryTokenStore, RefreshTokenRepository,
    TokenStore, UserRepository, create_pool_with_migrations, health_check,
};
use tower_http::compression::{CompressionLayer, CompressionLevel};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, admin_invite={}, bind_addr={}",
        config.has_database(),
        config.has_admin_invite(),
        config.bind_addr
    );

    let jwt_config = match JwtConfig::from_env() {
        Ok(jwt_config) => jwt_config,
        Err(e) if cfg!(debug_assertions) => {
            tracing::warn!("{}; using development secret", e);
            JwtConfig::new(DEV_SECRET)
        }
        Err(e) => {
            tracing::error!("Cannot start without a signing secret: {}", e);
            std::process::exit(1);
        }
    };

    let (identity, tokens): (Arc<dyn IdentityStore>, Arc<dyn TokenStore>) =
        if config.has_database() {
            let db_config = DbConfig::from_env().expect("DATABASE_URL is set");
            let pool = match create_pool_with_migrations(&db_config).await {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!("Database unavailable: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = health_check(&pool).await {
                tracing::warn!("Database health check failed: {}", e);
            }
            tracing::info!("Using PostgreSQL stores");
            let identity: Arc<dyn IdentityStore> = Arc::new(UserRepository::new(pool.clone()));
            let tokens: Arc<dyn TokenStore> = Arc::new(RefreshTokenRepository::new(pool));
            (identity, tokens)
        } else if cfg!(debug_assertions) {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            let identity: Arc<dyn IdentityStore> = Arc::new(MemoryIdentityStore::new());
            let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
            (identity, tokens)
        } else {
            tracing::error!("DATABASE_URL must be set in release builds");
            std::process::exit(1);
        };

    let auth_service = AuthService::new(JwtService::new(jwt_config), identity, tokens)
        .admin_invite_secret(config.admin_invite_secret.clone());

    let app = auth_api_router(AuthApiState { auth_service })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(
            CompressionLayer::new()
                .br(true)
                .gzip(true)
                .quality(CompressionLevel::Best),
        );

    tracing::info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
