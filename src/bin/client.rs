use clap::{ArgAction, Parser};
use robots::client::{self, ClientConfig};
use robots::logger::Logger;
use std::sync::Arc;

/// The "Robots" game client: proxies between the authoritative TCP server
/// and a local UDP GUI endpoint (spec §4.4).
#[derive(Parser, Debug)]
#[command(name = "robots-client", version, about = "Robots game client")]
struct Args {
    /// `host:port` of the game server.
    #[arg(short = 's', long)]
    server_endpoint: String,

    /// `host:port` the GUI listens on.
    #[arg(short = 'g', long)]
    gui_endpoint: String,

    /// Player name sent in `Join` (<=255 bytes).
    #[arg(short = 'n', long)]
    player_name: String,

    /// Local UDP port to bind for GUI traffic.
    #[arg(short = 'p', long)]
    port: u16,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let logger = Arc::new(Logger::new(args.verbose));

    let config = ClientConfig {
        server_endpoint: args.server_endpoint,
        gui_endpoint: args.gui_endpoint,
        player_name: args.player_name,
        port: args.port,
    };

    if let Err(err) = client::run(config, logger.clone()).await {
        logger.warn(format!("fatal: {err}"));
        std::process::exit(1);
    }
}
