// Test-only player for end-to-end game tests.
//
// Wraps the real `LineClient` (from `nc_poker_server::client`) to provide a
// synchronous, test-friendly API: send a line, block until a line matching
// some text arrives, parse the options out of a prompt. Every line received
// is kept in a transcript so tests can check what a player saw after the
// fact.
//
// The only test-specific code here is the blocking wait loops around
// `LineClient::recv_timeout()`. The server side is the real `start_server`
// listening on a localhost port.
//
// See also: `tests/full_game.rs` for the scenarios.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use nc_poker_server::{GameConfig, LineClient, ServerConfig, ServerHandle, start_server};

/// Default timeout for blocking waits.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a server on a free localhost port with the given rules.
pub fn start_test_server(game: GameConfig) -> (ServerHandle, SocketAddr) {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        game,
    };
    start_server(config).expect("failed to start test server")
}

/// Game rules for fast tests: default hand and range, no countdown.
pub fn quick_rules(max_players: usize) -> GameConfig {
    GameConfig {
        max_players,
        countdown_secs: 0,
        ..GameConfig::default()
    }
}

/// Extract the bracketed number list following `options: ` or `hand: `.
pub fn parse_numbers(line: &str) -> Option<Vec<u32>> {
    let start = line.find('[')? + 1;
    let end = start + line[start..].find(']')?;
    line[start..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

/// Extract `N` from `Score: N.`-style text.
pub fn parse_score(line: &str) -> Option<u32> {
    let start = line.find("Score: ")? + "Score: ".len();
    let digits: String = line[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// A connected player driven by a test.
pub struct TestPlayer {
    client: LineClient,
    /// Every line received so far, in order.
    pub transcript: Vec<String>,
}

impl TestPlayer {
    /// Connect and wait for the lobby welcome.
    pub fn join(addr: SocketAddr) -> Self {
        let mut player = Self::connect(addr);
        player.wait_for("Welcome to Netcat Poker");
        player
    }

    /// Connect without waiting for anything.
    pub fn connect(addr: SocketAddr) -> Self {
        let client = LineClient::connect(addr).expect("TestPlayer::connect failed");
        Self {
            client,
            transcript: Vec::new(),
        }
    }

    /// The address the server knows this player by.
    pub fn id(&self) -> SocketAddr {
        self.client.local_addr()
    }

    pub fn send(&mut self, line: &str) {
        self.client.send_line(line).expect("send_line failed");
    }

    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    /// Block until a line containing `needle` arrives; returns that line.
    /// Lines before it are recorded but otherwise skipped.
    pub fn wait_for(&mut self, needle: &str) -> String {
        self.wait_for_where(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("timed out waiting for {needle:?}; saw {:#?}", self.transcript))
    }

    /// Block until the prompt for `round` arrives; returns the offered
    /// options.
    pub fn wait_for_round(&mut self, round: u32) -> Vec<u32> {
        let prefix = format!("Round {round}/");
        let line = self
            .wait_for_where(|line| line.starts_with(&prefix) && line.ends_with("Pick a number:"))
            .unwrap_or_else(|| {
                panic!("timed out waiting for round {round}; saw {:#?}", self.transcript)
            });
        parse_numbers(&line).expect("prompt without options")
    }

    /// Block until the server closes the connection.
    pub fn wait_for_close(&mut self) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            match self.client.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(line)) => self.transcript.push(line),
                Ok(None) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        panic!("connection still open; saw {:#?}", self.transcript);
    }

    /// Lines in the transcript containing `needle`.
    pub fn seen(&self, needle: &str) -> Vec<&str> {
        self.transcript
            .iter()
            .map(String::as_str)
            .filter(|line| line.contains(needle))
            .collect()
    }

    fn wait_for_where(&mut self, pred: impl Fn(&str) -> bool) -> Option<String> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            match self.client.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(line)) => {
                    let hit = pred(&line);
                    self.transcript.push(line.clone());
                    if hit {
                        return Some(line);
                    }
                }
                Ok(None) => {}
                Err(_) => return None,
            }
        }
        None
    }
}
