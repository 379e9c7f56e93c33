use super::*;
use chrono::NaiveDate;
use clap::Parser;
use uuid::Uuid;

const TENANT: &str = "6f1c2d3e-4a5b-4c6d-8e9f-0a1b2c3d4e5f";

fn tenant() -> Uuid {
    Uuid::parse_str(TENANT).unwrap()
}

#[test]
fn no_subcommand_parses() {
    let cli = Cli::try_parse_from(["callpilot-cli"]).unwrap();
    assert!(cli.command.is_none());
}

#[test]
fn parses_db_ping_and_migrate() {
    let ping = Cli::try_parse_from(["callpilot-cli", "db", "ping"]).unwrap();
    assert!(matches!(
        ping.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));

    let migrate = Cli::try_parse_from(["callpilot-cli", "db", "migrate"]).unwrap();
    assert!(matches!(
        migrate.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn knowledge_build_requires_tenant() {
    let result = Cli::try_parse_from(["callpilot-cli", "knowledge", "build"]);
    assert!(result.is_err());
}

#[test]
fn knowledge_build_rejects_malformed_tenant_id() {
    let result = Cli::try_parse_from(["callpilot-cli", "knowledge", "build", "--tenant", "acme"]);
    assert!(result.is_err());
}

#[test]
fn parses_knowledge_build_with_url() {
    let cli = Cli::try_parse_from([
        "callpilot-cli",
        "knowledge",
        "build",
        "--tenant",
        TENANT,
        "--url",
        "https://brightsmiles.example",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Knowledge {
            command: KnowledgeCommands::Build {
                tenant: t,
                url: Some(ref u),
            }
        }) if t == tenant() && u == "https://brightsmiles.example"
    ));
}

#[test]
fn parses_knowledge_status() {
    let cli = Cli::try_parse_from(["callpilot-cli", "knowledge", "status", "--tenant", TENANT])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Knowledge {
            command: KnowledgeCommands::Status { tenant: t }
        }) if t == tenant()
    ));
}

#[test]
fn sentiment_run_limit_is_optional() {
    let cli = Cli::try_parse_from(["callpilot-cli", "sentiment", "run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sentiment {
            command: SentimentCommands::Run { limit: None }
        })
    ));

    let cli = Cli::try_parse_from(["callpilot-cli", "sentiment", "run", "--limit", "10"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sentiment {
            command: SentimentCommands::Run { limit: Some(10) }
        })
    ));
}

#[test]
fn parses_calendar_sync_all_and_single_tenant() {
    let all = Cli::try_parse_from(["callpilot-cli", "calendar", "sync"]).unwrap();
    assert!(matches!(
        all.command,
        Some(Commands::Calendar {
            command: CalendarCommands::Sync { tenant: None }
        })
    ));

    let one = Cli::try_parse_from(["callpilot-cli", "calendar", "sync", "--tenant", TENANT])
        .unwrap();
    assert!(matches!(
        one.command,
        Some(Commands::Calendar {
            command: CalendarCommands::Sync { tenant: Some(t) }
        }) if t == tenant()
    ));
}

#[test]
fn parses_analytics_rollup_with_date() {
    let cli = Cli::try_parse_from([
        "callpilot-cli",
        "analytics",
        "rollup",
        "--tenant",
        TENANT,
        "--date",
        "2026-03-01",
    ])
    .unwrap();
    let expected = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Analytics {
            command: AnalyticsCommands::Rollup {
                tenant: Some(t),
                date: Some(d),
            }
        }) if t == tenant() && d == expected
    ));
}

#[test]
fn analytics_rollup_rejects_bad_date() {
    let result =
        Cli::try_parse_from(["callpilot-cli", "analytics", "rollup", "--date", "03/01/2026"]);
    assert!(result.is_err());
}
