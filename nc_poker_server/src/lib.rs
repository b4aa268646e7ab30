// nc_poker_server — game server for Netcat Poker.
//
// Netcat Poker is a tiny multiplayer number game played over raw TCP with a
// plain `nc` client. Each player is dealt a few distinct numbers, plays one
// per round, and the highest number takes the round; after the last round the
// highest score wins. Ties share the win at both levels.
//
// Module overview:
// - `config.rs`:    `ServerConfig` / `GameConfig`, JSON loading, validation.
// - `error.rs`:     Error taxonomy (config, admission, input, invariant).
// - `hand.rs`:      Hand generation from a seeded-or-entropy RNG.
// - `player.rs`:    Per-player record (hand, played numbers, score).
// - `choice.rs`:    Validation of a raw input line into a choice.
// - `resolver.rs`:  Highest-wins-with-ties, for rounds and for the game.
// - `transport.rs`: The outbound `Transport` trait and its TCP implementation.
// - `session.rs`:   The session state machine. The core data structure that
//                   `server.rs` drives.
// - `server.rs`:    TCP listener, reader threads (one per player), and the
//                   main event loop. Uses `std::net` with a thread-per-reader
//                   architecture and an `mpsc` channel to funnel events into
//                   the single-threaded `Session`.
// - `client.rs`:    `LineClient`, a programmatic stand-in for `nc`.
//
// Dependencies: `nc_poker_protocol` (message rendering and line framing).
//
// The server can run as a standalone binary (`main.rs`) or be embedded via
// the library API (`start_server`), which is how the integration tests use it.

pub mod choice;
pub mod client;
pub mod config;
pub mod error;
pub mod hand;
pub mod player;
pub mod resolver;
pub mod server;
pub mod session;
pub mod transport;

pub use client::LineClient;
pub use config::{GameConfig, ServerConfig};
pub use server::{ServerHandle, start_server};
