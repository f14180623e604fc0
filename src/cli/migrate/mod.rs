//! Migrate command - applies or reverts the PostgreSQL schema

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::DomainError;
use crate::infrastructure::logging;
use crate::infrastructure::storage::{connect_pool, Migrator, PostgresMigrator};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Revert the most recent migration instead of applying pending ones
    #[arg(long)]
    pub revert: bool,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    let postgres = config.database.postgres().ok_or_else(|| {
        DomainError::configuration("database.url is required to run migrations")
    })?;
    let pool = connect_pool(&postgres).await?;
    let migrator = PostgresMigrator::new(pool);

    if args.revert {
        migrator.revert().await?;
    } else {
        migrator.run().await?;
    }

    info!(version = ?migrator.version().await?, "Schema is up to date");

    Ok(())
}
