use {
    axum::Router,
    tokio::net::TcpListener,
    tracing::info,
    crate::{
        config::ServerConfig,
        database::Database,
        error::ServerError,
        http::{AppState, router},
    },
};

pub struct ClickerServer {
    config: ServerConfig,
    state: AppState,
}

impl ClickerServer {
    /// Opens the configured database and brings its schema up to date.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let database = open_database(&config)?;
        database.run_migrations()?;

        let state = AppState::new(database, config.password_cost);
        Ok(Self { config, state })
    }

    pub fn router(&self) -> Router {
        router(
            self.state.clone(),
            self.config.static_dir.as_ref().map(|v| self.config.resolve_path(v)),
        )
    }

    pub async fn serve(&self) -> Result<(), ServerError> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await
            .map_err(|err| ServerError::Bind { addr, reason: err.to_string() })?;

        info!("started http server on {addr:?}");
        axum::serve(listener, self.router()).await
            .map_err(|err| ServerError::Serve { reason: err.to_string() })
    }
}

fn open_database(config: &ServerConfig) -> Result<Database, ServerError> {
    Ok(match config.database_path.as_ref() {
        Some(path) => {
            let path = config.resolve_path(path);
            info!("using database at {path:?}");
            Database::new(path)?
        },
        None => {
            info!("no database_path configured, using in-memory database");
            Database::in_memory()?
        }
    })
}
