#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![warn(clippy::nursery)]
#![allow(clippy::multiple_crate_versions)]
mod ast;
mod cli;
mod error;
mod exec;
mod filter;
mod query;
mod schema;
mod session;
mod storage;

use crate::cli::{Cli, Commands};
use crate::session::Session;
use crate::storage::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let engine = &cli.engine_config;
    let config = Config {
        data_dir: engine.data_dir.clone(),
        write_buffer_size_mb: engine.write_buffer_size_mb,
        max_write_buffer_number: engine.max_write_buffers,
        max_background_jobs: engine.max_background_jobs,
        parallelism: engine.parallelism,
    };

    let session = Session::open(&config)?;

    match cli.command {
        Commands::Tables => {
            for table in session.schema().list_tables().await? {
                println!("{table}");
            }
        }
        Commands::CreateTable { name } => {
            session.schema().create_table(&name).await?;
            println!("created {name}");
        }
        Commands::DropTable { name } => {
            session.schema().drop_table(&name).await?;
            println!("dropped {name}");
        }
        Commands::Count { name } => {
            let count = session.table(&name).count().await?;
            println!("{count}");
        }
        Commands::Truncate { name } => {
            let outcome = session.table(&name).truncate().await?;
            println!("deleted {}", outcome.deleted);
        }
    }

    Ok(())
}
