use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    version,
    name = "FluentDB",
    about = r#"
A fluent query layer over a schemaless document store.

FluentDB stores schemaless documents and lets relational-style queries run
against them through a chainable builder. This binary administers a local
store."#
)]
pub struct Cli {
    #[command(flatten)]
    pub engine_config: EngineConfig,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the tables in the store
    Tables,
    /// Create a table
    CreateTable {
        /// Name of the table to create.
        name: String,
    },
    /// Drop a table and everything in it
    DropTable {
        /// Name of the table to drop.
        name: String,
    },
    /// Count the documents in a table
    Count {
        /// Name of the table to count.
        name: String,
    },
    /// Delete every document in a table, keeping the table
    Truncate {
        /// Name of the table to truncate.
        name: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EngineConfig {
    /// Path to the database directory.
    #[arg(long, short, env = "FLUENTDB_DATA_DIR", default_value = "./fluentdb_data")]
    pub data_dir: String,
    /// Size of the write buffer in megabytes.
    #[arg(long, env = "FLUENTDB_WRITE_BUFFER_SIZE_MB", default_value_t = 64)]
    pub write_buffer_size_mb: usize,
    /// Maximum number of write buffers.
    #[arg(long, env = "FLUENTDB_MAX_WRITE_BUFFERS", default_value_t = 3)]
    pub max_write_buffers: i32,
    /// Maximum background jobs.
    #[arg(long, env = "FLUENTDB_MAX_BACKGROUND_JOBS", default_value_t = num_cpus::get() as i32)]
    pub max_background_jobs: i32,
    /// Number of background threads for flush and compaction.
    #[arg(long, env = "FLUENTDB_PARALLELISM", default_value_t = num_cpus::get() as i32)]
    pub parallelism: i32,
}
