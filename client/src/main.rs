use clap::Parser;
use client::network::Client;
use log::info;
use tokio::io::{stdin, stdout, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:7777")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    info!("Type 'r' to roll on your turn, 'exit' to leave");

    let client = Client::connect(&args.server).await?;
    client.run(BufReader::new(stdin()), stdout()).await?;

    Ok(())
}
