use bloglist_api::{
    config::{ConfigError, Env},
    server::{self, ServerState, auth::AuthorizationGuard},
};
use bloglist_common::token::{TokenError, TokenService};
use bloglist_db::{MemoryRepository, PgRepository, Repository, RepositoryError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error setting up tokens: {0}")]
    Token(#[from] TokenError),
    #[error("Error setting up the repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bloglist_api=debug,\
                bloglist_common=debug,\
                bloglist_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    Env::from_env().map_err(InitError::from)
}

async fn open_repository(env: &Env) -> Result<Arc<dyn Repository>, InitError> {
    let (worker_id, process_id) = env.machine_ids()?;

    let Some(database_url) = &env.database_url else {
        info!("No DATABASE_URL set, keeping data in memory");
        return Ok(Arc::new(MemoryRepository::new(worker_id, process_id)));
    };

    let repository = PgRepository::connect(database_url, worker_id, process_id).await?;
    repository.migrate().await?;
    Ok(Arc::new(repository))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!(error = %e, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let tokens = TokenService::new(env.token_config()?)?;
    let state = ServerState {
        repository: open_repository(&env).await?,
        guard: Arc::new(AuthorizationGuard::new(tokens)),
        update_policy: env.update_policy(),
    };

    let server_address = env.socket_address();
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Server listening");

    axum::serve(listener, server::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
