use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::runtime::Builder;
use townhall_cli::{cli_types::SeedSet, seed, table_counts};
use townhall_service::database::{migrator::get_current_version, Database};

#[derive(Clone, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, env = "DB_PATH", default_value = "townhall.db")]
    pub db_path: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Clone)]
pub enum Commands {
    /// Create the database if needed and apply pending migrations
    Migrate {},
    /// Insert sample towns, skipping slugs that already exist
    Seed {
        #[arg(long, value_enum, default_value = "basic")]
        set: SeedSet,
    },
    /// Print row counts for every table
    CheckDb {
        #[arg(long, help = "Seed the demo set when no towns exist")]
        seed_if_empty: bool,
    },
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(false)
        .try_init();

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let cli = Cli::parse();

    runtime.block_on(async move {
        let db = Database::connect(&cli.db_path, 1).await?;

        match cli.command {
            Commands::Migrate {} => {
                let version = get_current_version(db.pool()).await?;
                info!("Database {} at schema version {}", cli.db_path, version);
            }
            Commands::Seed { set } => {
                let created = seed::seed(&db, &seed::towns_for(set)).await?;
                info!("Seeded {} new towns into {}", created, cli.db_path);
            }
            Commands::CheckDb { seed_if_empty } => {
                let mut counts = table_counts(&db).await?;
                if counts.is_empty() && seed_if_empty {
                    info!("No towns found, seeding demo data");
                    seed::seed(&db, &seed::demo_towns()).await?;
                    counts = table_counts(&db).await?;
                }
                println!("{}", counts);
            }
        }

        db.pool().close().await;
        Ok(())
    })
}
