// Outbound side of player connections.
//
// `Session` never touches sockets directly. It addresses players by
// `PlayerId` and calls into a `Transport`, which owns the write halves. The
// TCP implementation keeps a `BufWriter<TcpStream>` per player; session unit
// tests substitute an in-memory recorder.
//
// Sends are best effort. A failed write is logged and otherwise ignored: the
// player's reader thread will hit the same broken socket and report a
// disconnect, which is the single path for removing players.

use std::collections::BTreeMap;
use std::io::{self, BufWriter};
use std::net::{Shutdown, TcpStream};

use log::{debug, warn};
use nc_poker_protocol::{PlayerId, ServerMessage, write_line};

/// The send/close capability the session needs from the network layer.
pub trait Transport {
    /// Connection handle handed over at admission.
    type Connection;

    /// Start routing messages for `player` to `conn`.
    fn attach(&mut self, player: PlayerId, conn: Self::Connection);

    /// Deliver one message to one player.
    fn send(&mut self, player: PlayerId, msg: &ServerMessage) -> io::Result<()>;

    /// Forget a player's connection, closing it.
    fn detach(&mut self, player: PlayerId);

    /// Close every connection.
    fn close_all(&mut self);
}

/// `Transport` over the write halves of accepted TCP streams.
#[derive(Default)]
pub struct TcpTransport {
    writers: BTreeMap<PlayerId, BufWriter<TcpStream>>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpStream;

    fn attach(&mut self, player: PlayerId, conn: TcpStream) {
        self.writers.insert(player, BufWriter::new(conn));
    }

    fn send(&mut self, player: PlayerId, msg: &ServerMessage) -> io::Result<()> {
        let writer = self.writers.get_mut(&player).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, format!("no connection for {player}"))
        })?;
        debug!("-> {player}: {msg:?}");
        write_line(writer, &msg.to_string())
    }

    fn detach(&mut self, player: PlayerId) {
        if let Some(writer) = self.writers.remove(&player) {
            close(player, writer.get_ref());
        }
    }

    fn close_all(&mut self) {
        for (player, writer) in std::mem::take(&mut self.writers) {
            close(player, writer.get_ref());
        }
    }
}

/// Shut down both directions so the player's reader thread unblocks.
fn close(player: PlayerId, stream: &TcpStream) {
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        // Already closed by the peer.
        if e.kind() != io::ErrorKind::NotConnected {
            warn!("failed to close connection for {player}: {e}");
        }
    }
}

/// In-memory transport for session tests: records every message and close.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Vec<(PlayerId, ServerMessage)>,
    pub attached: Vec<PlayerId>,
    pub detached: Vec<PlayerId>,
    pub closed_all: bool,
    /// Sends to these players fail.
    pub broken: Vec<PlayerId>,
}

#[cfg(test)]
impl RecordingTransport {
    /// Messages delivered to `player`, in order.
    pub fn inbox(&self, player: PlayerId) -> Vec<&ServerMessage> {
        self.sent
            .iter()
            .filter(|(to, _)| *to == player)
            .map(|(_, msg)| msg)
            .collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

#[cfg(test)]
impl Transport for RecordingTransport {
    type Connection = ();

    fn attach(&mut self, player: PlayerId, _conn: ()) {
        self.attached.push(player);
    }

    fn send(&mut self, player: PlayerId, msg: &ServerMessage) -> io::Result<()> {
        if self.broken.contains(&player) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"));
        }
        self.sent.push((player, msg.clone()));
        Ok(())
    }

    fn detach(&mut self, player: PlayerId) {
        self.detached.push(player);
    }

    fn close_all(&mut self) {
        self.closed_all = true;
    }
}
