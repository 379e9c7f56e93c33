mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, KnowledgeService},
    middleware::AuthState,
    scheduler::{JobContext, Schedule, SyncScheduler},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = callpilot_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = callpilot_db::PoolConfig::from_app_config(&config);
    let pool = callpilot_db::connect_pool(&config.database_url, pool_config).await?;
    callpilot_db::run_migrations(&pool).await?;

    let jobs = Arc::new(JobContext::from_app_config(pool.clone(), &config)?);
    let sync_scheduler = SyncScheduler::start(jobs, &Schedule::from_app_config(&config)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        callpilot_core::Environment::Development
    ))?;
    let knowledge = KnowledgeService::from_app_config(&config)?.map(Arc::new);
    let app = build_app(AppState { pool, knowledge }, auth);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "callpilot-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sync_scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
