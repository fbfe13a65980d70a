use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::models::identity::AccountId;
use crate::repositories::{identity::IdentityRepository, DbResult};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Identity not found: {0}")]
    IdentityNotFound(AccountId),
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
}

impl DbError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

#[derive(Debug, Clone)]
pub struct DbPersistence {
    pub identities: IdentityRepository,

    pool: PgPool,
}

impl DbPersistence {
    pub async fn new(database_url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let identities = IdentityRepository::new(&pool);

        Self { identities, pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
