use clap::Parser;
use log::info;
use server::network::Server;
use server::puzzle;
use server::registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Directory of .puzzle files
    #[arg(long, default_value = "puzzles")]
    puzzles: PathBuf,

    /// Maximum number of connections served at once
    #[arg(short, long, default_value = "64")]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let puzzles = puzzle::load_dir(&args.puzzles)?;
    let registry = Arc::new(Registry::new(puzzles));

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, registry, args.max_clients).await?;

    tokio::select! {
        _ = server.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }

    Ok(())
}
