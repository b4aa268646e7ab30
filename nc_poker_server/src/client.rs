// Line-oriented TCP client for a Netcat Poker server.
//
// Does what `nc host port` does for a human player, with an API a program
// can drive. Architecture:
// - `connect()` opens the TCP connection and spawns a background reader
//   thread.
// - The reader thread calls `read_line()` in a loop and pushes every line
//   into an `mpsc` channel. When the server closes the connection the
//   channel is closed too.
// - The caller holds the write half and sends lines synchronously.
// - `poll()` drains the inbox without blocking; `recv_timeout()` waits for
//   the next line.
//
// Used by the `nc-poker-client` binary and by the integration tests.

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use nc_poker_protocol::{read_line, write_line};

/// TCP client that sends and receives newline-terminated text lines.
pub struct LineClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<String>,
    local_addr: SocketAddr,
    _reader_thread: Option<JoinHandle<()>>,
}

impl LineClient {
    /// Connect to a server and start reading from it in the background.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let local_addr = stream.local_addr()?;
        let reader = BufReader::new(stream.try_clone()?);

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            local_addr,
            _reader_thread: Some(reader_thread),
        })
    }

    /// This end's address. The server identifies the player by it.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send one line (without the trailing newline).
    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        write_line(&mut self.writer, line)
    }

    /// Drain all queued lines (non-blocking).
    pub fn poll(&self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.inbox.try_recv() {
            lines.push(line);
        }
        lines
    }

    /// Wait up to `timeout` for the next line. `Ok(None)` on timeout;
    /// `UnexpectedEof` once the server has closed the connection and every
    /// line has been consumed.
    pub fn recv_timeout(&self, timeout: Duration) -> io::Result<Option<String>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(line) => Ok(Some(line)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )),
        }
    }

    /// Close the connection.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.writer.get_ref().shutdown(Shutdown::Both) {
            debug!("disconnect: {e}");
        }
    }
}

/// Reader thread: read lines in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<String>) {
    loop {
        match read_line(&mut reader) {
            Ok(line) => {
                if tx.send(line).is_err() {
                    break; // Caller dropped the client
                }
            }
            Err(e) => {
                debug!("connection closed: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn sends_and_receives_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = LineClient::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, peer) = listener.accept().unwrap();
        assert_eq!(peer, client.local_addr());

        server.write_all(b"hello\r\nworld\n").unwrap();
        assert_eq!(client.recv_timeout(WAIT).unwrap().as_deref(), Some("hello"));
        assert_eq!(client.recv_timeout(WAIT).unwrap().as_deref(), Some("world"));

        client.send_line("7").unwrap();
        let mut reader = BufReader::new(server);
        assert_eq!(read_line(&mut reader).unwrap(), "7");
    }

    #[test]
    fn server_close_surfaces_as_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = LineClient::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(server);

        let err = client.recv_timeout(WAIT).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn poll_is_empty_when_nothing_arrived() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = LineClient::connect(listener.local_addr().unwrap()).unwrap();
        let _server = listener.accept().unwrap();
        assert!(client.poll().is_empty());
        assert_eq!(client.recv_timeout(Duration::from_millis(20)).unwrap(), None);
    }
}
