//! Database maintenance commands.

use clap::Subcommand;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

pub(crate) async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            callpilot_db::ping(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = callpilot_db::run_migrations(pool).await?;
            println!("migrations ok ({applied} newly applied)");
        }
    }
    Ok(())
}
