pub mod memory;
pub mod postgres;
pub mod repository;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use self::{
    memory::MemoryStore,
    postgres::PgStore,
    repository::{
        AvailabilityRepository, ColorRepository, DateRepository, GroupRepository,
        MembershipRepository, UserRepository,
    },
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} with {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound { entity, key: key.into() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store context handed to every handler through `AppState`.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub colors: Arc<dyn ColorRepository>,
    pub availabilities: Arc<dyn AvailabilityRepository>,
    pub dates: Arc<dyn DateRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    /// Present for the Postgres store; used by the health check.
    pub pool: Option<PgPool>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        let pg = Arc::new(PgStore::new(pool.clone()));
        Self {
            users: pg.clone(),
            groups: pg.clone(),
            colors: pg.clone(),
            availabilities: pg.clone(),
            dates: pg.clone(),
            memberships: pg,
            pool: Some(pool),
        }
    }

    pub fn in_memory() -> Self {
        let mem = Arc::new(MemoryStore::default());
        Self {
            users: mem.clone(),
            groups: mem.clone(),
            colors: mem.clone(),
            availabilities: mem.clone(),
            dates: mem.clone(),
            memberships: mem,
            pool: None,
        }
    }
}

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
