use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::repositories::{SeaOrmUserRepository, UserRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// User data access, backed by the SeaORM pool in production
    pub users: Arc<dyn UserRepository>,
    /// Root token cancelled on shutdown; handlers derive per-request children
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new AppState by connecting to PostgreSQL and applying migrations
    pub async fn new(config: Config) -> Result<Self, AppStateError> {
        let mut opt = ConnectOptions::new(&config.database_url);
        opt.sqlx_logging(true);

        let db = Database::connect(opt)
            .await
            .map_err(|e| AppStateError::Postgres(e.to_string()))?;

        // Run migrations on the pool SeaORM already holds
        sqlx::migrate!("./migrations")
            .run(db.get_postgres_connection_pool())
            .await
            .map_err(|e| AppStateError::Migration(e.to_string()))?;

        Ok(Self::with_connection(config, Arc::new(db)))
    }

    /// Create AppState around an existing connection (mock databases in tests)
    pub fn with_connection(config: Config, db: Arc<DatabaseConnection>) -> Self {
        Self::with_repository(config, Arc::new(SeaOrmUserRepository::new(db)))
    }

    /// Create AppState with a custom user repository
    pub fn with_repository(config: Config, users: Arc<dyn UserRepository>) -> Self {
        Self {
            config,
            users,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancellation token for a single request
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("PostgreSQL connection error: {0}")]
    Postgres(String),

    #[error("Migration error: {0}")]
    Migration(String),
}
