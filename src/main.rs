use unimock_gateway::server;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "unimock-gateway", about = "Configurable HTTP mock/CRUD server")]
struct Cli {
    /// Path to the section/scenario configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listen address, serving both the public surface and /_uni/ admin
    #[arg(short, long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let worker_threads = server::runtime::get_container_cpu_limit();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(server::bootstrap::run(server::bootstrap::BootstrapArgs {
        config_path: cli.config,
        listen: cli.listen,
    }))
}
