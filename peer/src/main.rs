use clap::Parser;
use log::{info, warn};
use peer::{LocalCommand, LogSink, Peer, PeerConfig, PeerDriver};
use shared::{GameConfig, Variant};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short = 'r', long, default_value = "127.0.0.1:8080")]
    relay: String,

    /// Identifier sent to the relay; must be unique among waiting players
    #[arg(short = 'i', long)]
    player_id: String,

    /// Display name shown to the opponent (defaults to the player id)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Game variant: pong or space
    #[arg(short = 'v', long, default_value = "pong")]
    variant: Variant,

    /// Multiplier applied to ball, projectile and target speeds
    #[arg(short = 's', long, default_value = "1.0", value_parser = parse_speed)]
    speed: f32,

    /// Score that ends the game (defaults to the variant's threshold)
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u32).range(1..))]
    win_score: Option<u32>,

    /// Ticks per second
    #[arg(
        short = 't',
        long,
        default_value = "60",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    tick_rate: u32,

    /// Send "ready" as soon as the session is paired
    #[arg(short = 'a', long)]
    auto_start: bool,

    /// Seed for the host simulation
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_speed(value: &str) -> Result<f32, String> {
    let speed: f32 = value.parse().map_err(|e| format!("{}", e))?;
    GameConfig::default()
        .with_speed_multiplier(speed)
        .map(|config| config.speed_multiplier)
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut game = GameConfig::for_variant(args.variant).with_speed_multiplier(args.speed)?;
    if let Some(win_score) = args.win_score {
        game = game.with_win_score(win_score)?;
    }
    let name = args.name.unwrap_or_else(|| args.player_id.clone());
    let mut config = PeerConfig::new(args.player_id, name, game);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    info!("Connecting to relay at {}", args.relay);
    let stream = TcpStream::connect(&args.relay).await?;
    stream.set_nodelay(true)?;
    info!("Commands: start, press <Key>, release <Key>, pause, restart, quit");

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<LocalCommand>() {
                Ok(command) => {
                    if command_tx.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
    });

    let tick = Duration::from_secs_f32(1.0 / args.tick_rate as f32);
    let (peer, outbox) = Peer::channel(config, Box::new(LogSink));
    let peer = PeerDriver::new(peer, outbox, tick)
        .auto_start(args.auto_start)
        .run(stream, command_rx)
        .await;

    info!("Exiting: {}", peer.phase());
    Ok(())
}
