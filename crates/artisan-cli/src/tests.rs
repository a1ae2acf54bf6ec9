use super::*;
use crate::admin::AdminCommands;
use crate::db::DbCommands;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["artisan-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["artisan-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn seed_defaults_to_configured_catalog() {
    let cli = Cli::try_parse_from(["artisan-cli", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed {
                catalog: None,
                dry_run: false
            }
        })
    ));
}

#[test]
fn seed_accepts_catalog_path_and_dry_run() {
    let cli = Cli::try_parse_from([
        "artisan-cli",
        "db",
        "seed",
        "--catalog",
        "config/catalog.yaml",
        "--dry-run",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed {
                catalog: Some(ref path),
                dry_run: true
            }
        }) if path.ends_with("catalog.yaml")
    ));
}

#[test]
fn parses_admin_create_command() {
    let cli = Cli::try_parse_from([
        "artisan-cli",
        "admin",
        "create",
        "--name",
        "Root",
        "--email",
        "root@example.com",
        "--password",
        "correct-horse",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Admin {
            command: AdminCommands::Create { ref name, ref email, .. }
        }) if name == "Root" && email == "root@example.com"
    ));
}

#[test]
fn admin_create_requires_an_email() {
    let result = Cli::try_parse_from([
        "artisan-cli",
        "admin",
        "create",
        "--name",
        "Root",
        "--password",
        "correct-horse",
    ]);
    assert!(result.is_err());
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["artisan-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["artisan-cli", "collect"]).is_err());
}
