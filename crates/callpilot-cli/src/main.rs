mod analytics;
mod calendar;
mod db;
mod knowledge;
mod sentiment;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::analytics::AnalyticsCommands;
use crate::calendar::CalendarCommands;
use crate::db::DbCommands;
use crate::knowledge::KnowledgeCommands;
use crate::sentiment::SentimentCommands;

#[derive(Debug, Parser)]
#[command(name = "callpilot-cli")]
#[command(about = "CallPilot operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Build or inspect a tenant's assistant knowledge base
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
    /// Score call transcripts
    Sentiment {
        #[command(subcommand)]
        command: SentimentCommands,
    },
    /// Sync appointments from connected calendars
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// Refresh daily analytics rollups
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("callpilot-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = callpilot_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = callpilot_db::PoolConfig::from_app_config(&config);
    let pool = callpilot_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => db::run_db(&pool, command).await,
        Commands::Knowledge { command } => match command {
            KnowledgeCommands::Build { tenant, url } => {
                knowledge::run_knowledge_build(&pool, &config, tenant, url).await
            }
            KnowledgeCommands::Status { tenant } => {
                knowledge::run_knowledge_status(&pool, tenant).await
            }
        },
        Commands::Sentiment { command } => match command {
            SentimentCommands::Run { limit } => {
                sentiment::run_sentiment(&pool, &config, limit).await
            }
        },
        Commands::Calendar { command } => match command {
            CalendarCommands::Sync { tenant } => {
                calendar::run_calendar_sync(&pool, &config, tenant).await
            }
        },
        Commands::Analytics { command } => match command {
            AnalyticsCommands::Rollup { tenant, date } => {
                analytics::run_rollup(&pool, tenant, date).await
            }
        },
    }
}

#[cfg(test)]
mod tests;
