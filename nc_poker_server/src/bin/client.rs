// Terminal client for Netcat Poker.
//
// The same thing `nc <host> <port>` does: lines typed on stdin go to the
// server, lines from the server go to stdout. Exits when the server closes
// the connection.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::error;
use nc_poker_server::LineClient;

#[derive(Parser, Debug)]
#[command(name = "nc-poker-client", version, about = "Play Netcat Poker")]
struct Args {
    /// Server host
    #[arg(default_value = "127.0.0.1", env = "HOST")]
    host: String,

    /// Server port
    #[arg(default_value_t = 1234, env = "PORT")]
    port: u16,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut client = match LineClient::connect((args.host.as_str(), args.port)) {
        Ok(client) => client,
        Err(e) => {
            error!("failed to connect to {}:{}: {e}", args.host, args.port);
            std::process::exit(1);
        }
    };

    // Stdin reads block, so they get their own thread.
    let (tx, stdin_lines) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        match client.recv_timeout(Duration::from_millis(50)) {
            Ok(Some(line)) => println!("{line}"),
            Ok(None) => {}
            Err(_) => break,
        }
        while let Ok(line) = stdin_lines.try_recv() {
            if let Err(e) = client.send_line(&line) {
                error!("failed to send: {e}");
                return;
            }
        }
    }
}
