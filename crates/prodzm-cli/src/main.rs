use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prodzm-cli")]
#[command(about = "Prodzm store administration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations.
    Migrate,
    /// Upsert catalog categories from the seed file.
    Seed {
        /// Seed file; defaults to `PRODZM_CATALOG_PATH`.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Recompute stored order totals from their items.
    RecomputeTotals {
        /// Only this order.
        #[arg(long)]
        order: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("prodzm-cli: pass --help to list commands");
        return Ok(());
    };

    let config = prodzm_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = prodzm_db::PoolConfig::from_app_config(&config);
    let pool = prodzm_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Migrate => {
            let applied = prodzm_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.catalog_path.clone());
            run_seed(&pool, &path).await?;
        }
        Commands::RecomputeTotals { order } => run_recompute_totals(&pool, order).await?,
    }

    Ok(())
}

async fn run_seed(pool: &sqlx::PgPool, path: &std::path::Path) -> anyhow::Result<()> {
    let catalog = prodzm_core::load_catalog(path)?;
    let seeded = prodzm_db::seed_categories(pool, &catalog.categories).await?;
    tracing::info!(path = %path.display(), seeded, "catalog seeded");
    println!("seeded {seeded} categories from {}", path.display());
    Ok(())
}

async fn run_recompute_totals(pool: &sqlx::PgPool, order: Option<i64>) -> anyhow::Result<()> {
    if let Some(order_id) = order {
        let total = prodzm_db::recompute_order_total_now(pool, order_id).await?;
        println!("order {order_id}: total {total}");
    } else {
        let count = prodzm_db::recompute_all_order_totals(pool).await?;
        println!("recomputed totals for {count} orders");
    }
    Ok(())
}
