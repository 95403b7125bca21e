//! Noteboard - private notes and public news with moderated comments

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noteboard::{api, config::Config, db};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noteboard=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Noteboard...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    pool.ping().await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let state = api::build_state(pool.clone(), &config)?;

    #[cfg(feature = "demo")]
    seed_demo(&state).await?;

    // Purge expired sessions in the background
    {
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Expired sessions purged"),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database pool");
    pool.close().await;

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

/// Demo mode: a `demo/demo123` account and a few news items to comment on
#[cfg(feature = "demo")]
async fn seed_demo(state: &api::AppState) -> Result<()> {
    use noteboard::models::{NewsInput, SignupInput};
    use noteboard::services::UserServiceError;

    let signup = SignupInput {
        username: "demo".to_string(),
        password1: "demo123".to_string(),
        password2: "demo123".to_string(),
    };
    match state.user_service.signup(&signup).await {
        Ok(_) => tracing::info!("Demo mode: created user demo/demo123"),
        Err(UserServiceError::UserExists(_)) => {}
        Err(e) => return Err(e.into()),
    }

    if state.news_service.home().await?.is_empty() {
        let today = chrono::Utc::now().date_naive();
        for (days_ago, title, text) in [
            (2, "Открытие сайта", "Мы запустились. Заметки видны только вам."),
            (1, "Комментарии", "Под новостями можно оставлять комментарии."),
            (0, "Правила", "Не ругайтесь: такие комментарии не сохраняются."),
        ] {
            state
                .news_service
                .publish(&NewsInput {
                    title: title.to_string(),
                    text: text.to_string(),
                    date: today - chrono::Duration::days(days_ago),
                })
                .await?;
        }
        tracing::info!("Demo mode: published sample news");
    }

    Ok(())
}
