use clap::{ArgAction, Parser};
use robots::logger::Logger;
use robots::server::{self, ServerConfig};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// The "Robots" (Bomberman-style) authoritative game server (spec §4.2/§4.3).
#[derive(Parser, Debug)]
#[command(name = "robots-server", version, about = "Robots game server")]
struct Args {
    /// Turns a placed bomb stays armed before exploding.
    #[arg(short = 'b', long)]
    bomb_timer: u16,

    /// Number of players required before a game starts.
    #[arg(short = 'c', long)]
    players_count: u8,

    /// Milliseconds between turns.
    #[arg(short = 'd', long)]
    turn_duration: u64,

    /// Cells each explosion ray extends in each direction.
    #[arg(short = 'e', long)]
    explosion_radius: u16,

    /// Number of blocks scattered at game start.
    #[arg(short = 'k', long)]
    initial_blocks: u16,

    /// Turns a single game lasts.
    #[arg(short = 'l', long)]
    game_length: u16,

    /// Name advertised to clients in `Hello`.
    #[arg(short = 'n', long)]
    server_name: String,

    /// TCP port to listen on.
    #[arg(short = 'p', long)]
    port: u16,

    /// LCG seed; defaults to the current wall-clock second (spec §5/§6).
    #[arg(short = 's', long)]
    seed: Option<u32>,

    /// Grid width.
    #[arg(short = 'x', long)]
    size_x: u16,

    /// Grid height.
    #[arg(short = 'y', long)]
    size_y: u16,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(1)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let logger = Arc::new(Logger::new(args.verbose));

    let config = ServerConfig {
        bomb_timer: args.bomb_timer,
        players_count: args.players_count,
        turn_duration_ms: args.turn_duration,
        explosion_radius: args.explosion_radius,
        initial_blocks: args.initial_blocks,
        game_length: args.game_length,
        server_name: args.server_name,
        port: args.port,
        seed: args.seed.unwrap_or_else(default_seed),
        size_x: args.size_x,
        size_y: args.size_y,
    };

    logger.info(format!(
        "starting: {}x{} grid, {} player(s), seed {}",
        config.size_x, config.size_y, config.players_count, config.seed
    ));

    if let Err(err) = server::run(config, logger.clone()).await {
        logger.warn(format!("fatal: {err}"));
        std::process::exit(1);
    }
}
