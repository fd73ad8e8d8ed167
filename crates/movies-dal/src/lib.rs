pub mod error;
pub mod movie;

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::{
    migrate::MigrateDatabase as _,
    sqlite::{SqlitePoolOptions, Sqlite},
};
use tracing::info;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type Pool = sqlx::Pool<ChosenDB>;

/// Opens pool to the database, creating the database file if it does not exist yet.
pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    if !Sqlite::database_exists(database_url).await? {
        Sqlite::create_database(database_url).await?;
        info!("Created database {database_url}");
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
