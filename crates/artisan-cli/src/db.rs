//! `db` subcommands: connectivity check, migrations and catalog seeding.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert categories, ingredients and products from the catalog file
    Seed {
        /// Catalog YAML to load (defaults to ARTISAN_CATALOG_PATH)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Validate and summarize the catalog without writing
        #[arg(long)]
        dry_run: bool,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &artisan_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            artisan_db::ping(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = artisan_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed { catalog, dry_run } => {
            let path = catalog.unwrap_or_else(|| config.catalog_path.clone());
            seed(pool, &path, dry_run).await?;
        }
    }
    Ok(())
}

async fn seed(pool: &sqlx::PgPool, path: &std::path::Path, dry_run: bool) -> anyhow::Result<()> {
    let catalog = artisan_core::load_catalog(path)?;

    if dry_run {
        let ingredients: usize = catalog.categories.iter().map(|c| c.ingredients.len()).sum();
        let products: usize = catalog.categories.iter().map(|c| c.products.len()).sum();
        println!(
            "dry-run: {} categories, {ingredients} ingredients, {products} products in {}",
            catalog.categories.len(),
            path.display()
        );
        return Ok(());
    }

    let summary = artisan_db::seed_catalog(pool, &catalog).await?;
    tracing::info!(
        categories = summary.categories,
        ingredients = summary.ingredients,
        products = summary.products,
        "catalog seeded"
    );
    println!(
        "seeded {} categories, {} ingredients, {} products",
        summary.categories, summary.ingredients, summary.products
    );
    Ok(())
}
