use clap::Parser;
use log::info;
use server::coordinator::TurnCoordinator;
use server::dice::{DiceSource, RandomDice};
use server::listener::SessionListener;
use shared::DEFAULT_PORT;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seed for the dice, for reproducible games
    #[arg(short, long)]
    seed: Option<u64>,
}

/// Parses arguments, then runs the accept loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let dice: Arc<dyn DiceSource> = match args.seed {
        Some(seed) => {
            info!("Dice seeded with {}", seed);
            Arc::new(RandomDice::seeded(seed))
        }
        None => Arc::new(RandomDice::new()),
    };

    let coordinator = Arc::new(TurnCoordinator::new(dice));
    let address = format!("{}:{}", args.host, args.port);
    let listener = SessionListener::bind(&address, coordinator).await?;

    tokio::select! {
        _ = listener.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
