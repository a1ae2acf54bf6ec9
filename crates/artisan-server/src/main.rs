mod api;
mod auth;
mod inference;
mod middleware;
mod push;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState, UploadSettings},
    auth::JwtService,
    inference::InferenceClient,
    push::PushClient,
};

const PUSH_TIMEOUT_SECS: u64 = 15;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = artisan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = artisan_db::PoolConfig::from_app_config(&config);
    let pool = artisan_db::connect_pool(&config.database_url, pool_config).await?;
    artisan_db::run_migrations(&pool).await?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let inference = match config.inference_url.as_deref() {
        Some(url) => Some(Arc::new(InferenceClient::new(
            url,
            config.inference_api_key.as_deref(),
            &config.inference_model,
            config.inference_timeout_secs,
        )?)),
        None => {
            tracing::warn!("ARTISAN_INFERENCE_URL not set; recommendations disabled");
            None
        }
    };

    let push = match PushClient::new(&config.push_url, PUSH_TIMEOUT_SECS) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "push delivery disabled");
            None
        }
    };

    let state = AppState {
        pool,
        jwt: Arc::new(JwtService::new(&config.jwt_secret, config.jwt_ttl_minutes)),
        inference,
        push,
        uploads: UploadSettings {
            dir: config.upload_dir.clone(),
            max_bytes: config.upload_max_bytes,
        },
    };
    let app = build_app(state, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, env = %config.env, "artisan-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
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
