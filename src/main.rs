use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use deepwork_lib::config::Config;

#[derive(Debug, Parser)]
#[command(name = "deepwork", version, about = "Deep work session tracker API")]
struct Cli {
    /// JSON config file; missing means defaults.
    #[arg(short, long, default_value = "deepwork.json")]
    config: PathBuf,

    /// Address to listen on (overrides the config file).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database path (overrides the config file).
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    deepwork_lib::run(config).await
}
