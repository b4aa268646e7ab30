// nc_poker_protocol — wire protocol for Netcat Poker.
//
// Shared by the game server (`nc_poker_server`) and its line client. Players
// can equally well connect with plain `nc`, which dictates the format: one
// UTF-8 text line per message, no binary framing, no handshake.
//
// Module overview:
// - `types.rs`:    Identity types — `PlayerId` (peer address), `RoundNumber`.
// - `message.rs`:  `ServerMessage`, every server-to-player notification, and
//                  its single-line terminal rendering.
// - `framing.rs`:  Newline-terminated framing over any `BufRead`/`Write`
//                  stream, with a maximum line length.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_LINE_LEN, read_line, write_line};
pub use message::{CLEAR_SCREEN, ServerMessage};
pub use types::{PlayerId, RoundNumber};
