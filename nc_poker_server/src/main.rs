// CLI entry point for the Netcat Poker server.
//
// Starts a standalone game server that players join with `nc <host> <port>`
// (or `nc-poker-client`). Runs one game: it exits after the final results,
// or earlier on Ctrl+C, in which case every player is told the server is
// shutting down before their connection closes. See `server.rs` for the
// networking architecture and `session.rs` for the game state.
//
// Configuration is layered: defaults, then an optional JSON file
// (`--config`), then flags and the `HOST` / `PORT` environment variables.
// Logging goes through env_logger; set `RUST_LOG=debug` to see every message
// sent to players.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use nc_poker_server::error::ConfigError;
use nc_poker_server::{ServerConfig, start_server};
use signal_hook::consts::{SIGINT, SIGTERM};

#[derive(Parser, Debug)]
#[command(name = "nc-poker", version, about = "Netcat Poker game server")]
struct Args {
    /// Address to listen on [default: 0.0.0.0]
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on [default: 1234]
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// JSON config file. Flags override values from the file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Players needed to start the game
    #[arg(long)]
    players: Option<usize>,

    /// Rounds per game
    #[arg(long)]
    rounds: Option<u32>,

    /// Numbers dealt to each player
    #[arg(long)]
    hand_size: Option<usize>,

    /// Countdown seconds between rounds (0 to disable)
    #[arg(long)]
    countdown: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let (handle, _addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            error!("failed to start server: {e}");
            std::process::exit(1);
        }
    };
    info!("press Ctrl+C to stop");

    let stop_requested = Arc::new(AtomicBool::new(false));
    if let Err(e) = install_signal_handler(&stop_requested) {
        warn!("failed to install signal handler, Ctrl+C will not notify players: {e}");
    }
    while !stop_requested.load(Ordering::SeqCst) && !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(100));
    }

    if handle.is_finished() {
        handle.wait();
    } else {
        info!("interrupted; shutting down");
        handle.stop();
    }
}

/// Defaults, then the JSON file, then flags.
fn build_config(args: &Args) -> Result<ServerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(players) = args.players {
        config.game.max_players = players;
    }
    if let Some(rounds) = args.rounds {
        config.game.max_rounds = rounds;
    }
    if let Some(hand_size) = args.hand_size {
        config.game.hand_size = hand_size;
    }
    if let Some(countdown) = args.countdown {
        config.game.countdown_secs = countdown;
    }
    config.game.validate()?;
    Ok(config)
}

/// Raise `stop_requested` on SIGINT or SIGTERM instead of exiting.
fn install_signal_handler(stop_requested: &Arc<AtomicBool>) -> io::Result<()> {
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(stop_requested))?;
    }
    Ok(())
}
