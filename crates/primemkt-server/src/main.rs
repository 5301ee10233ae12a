mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(primemkt_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = primemkt_db::PoolConfig {
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
        acquire_timeout_secs: config.db_acquire_timeout_secs,
    };
    let pool = primemkt_db::connect_pool(&config.database_url, pool_config).await?;
    primemkt_db::run_migrations(&pool).await?;

    let mut scheduler = build_jobs(&config, pool.clone()).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        primemkt_core::Environment::Development
    ))?;
    let app = build_app(AppState { pool }, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}

/// Assembles the task registry and starts the job scheduler.
async fn build_jobs(
    config: &primemkt_core::AppConfig,
    pool: sqlx::PgPool,
) -> anyhow::Result<primemkt_jobs::Scheduler> {
    let oracle = Arc::new(primemkt_oracle::OracleClient::new(
        &config.oracle_base_url,
        config.oracle_api_key.as_deref(),
        config.oracle_request_timeout_secs,
    )?);
    let pinner = Arc::new(primemkt_pinner::PinClient::new(
        &config.pinner_base_url,
        config.pinner_api_key.as_deref(),
        config.pinner_request_timeout_secs,
    )?);

    let mut registry = primemkt_jobs::SchedulerRegistry::new();
    primemkt_jobs::tasks::register_all(
        &mut registry,
        &primemkt_jobs::tasks::TaskContext {
            oracle,
            pinner,
            batch_size: config.job_batch_size,
        },
    )?;

    let scheduler = primemkt_jobs::build_scheduler(registry, pool).await?;
    Ok(scheduler)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
