mod admin;
mod db;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "artisan-cli")]
#[command(about = "Artisan shop operations: migrations, catalog seeding and admin accounts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: db::DbCommands,
    },
    /// Administrator accounts
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("artisan-cli: run with --help to list commands");
        return Ok(());
    };

    let config = artisan_core::load_app_config()?;
    let pool_config = artisan_db::PoolConfig::from_app_config(&config);
    let pool = artisan_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => db::run(&pool, &config, command).await?,
        Commands::Admin { command } => admin::run(&pool, command).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
