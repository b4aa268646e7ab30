// TCP server and main event loop for a Netcat Poker game.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per admitted player): call `framing::read_line()`
//   in a loop and send each line as `InternalEvent::Line`. On error/EOF, send
//   `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session` and applies events one at a time, so
//   no two session operations ever overlap. Uses `recv_timeout` as its clock:
//   after every wakeup it calls `Session::tick`, which drives the countdown
//   between rounds without any thread sleeping on it.
//
// The main thread is the only writer to player streams (via the session's
// `TcpTransport`). Reader threads only read from their own clone of the
// stream.
//
// Shutdown: the main loop exits when `ServerHandle::stop` clears
// `keep_running`, when the game ends, or after an internal-consistency
// violation (logged, then the same teardown as `stop`). On the way out it
// notifies and disconnects every player, then stops the listener thread,
// which drops the listening socket.

use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use nc_poker_protocol::{PlayerId, ServerMessage, read_line, write_line};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::ServerConfig;
use crate::error::{AdmitError, InvariantViolation, SessionError};
use crate::session::Session;
use crate::transport::TcpTransport;

/// How often the main loop wakes up with no events, to advance timers and
/// check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Listener back-off when no connection is pending.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

type TcpSession = Session<TcpTransport, StdRng>;

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection { stream: TcpStream, addr: SocketAddr },
    Line { player_id: PlayerId, line: String },
    Disconnected { player_id: PlayerId },
}

/// Handle returned by `start_server` to control the running server.
#[derive(Debug)]
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to shut down (notifying any connected players) and
    /// wait for it to finish.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Wait for the server to finish on its own (the game ended).
    pub fn wait(mut self) {
        self.join();
    }

    /// Whether the server thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("server thread panicked");
            }
        }
    }
}

/// Validate the configuration, bind the listener and start the server on a
/// background thread. Returns a handle for stopping it and the actual bound
/// address (useful when port 0 is used to let the OS pick a free port).
pub fn start_server(config: ServerConfig) -> io::Result<(ServerHandle, SocketAddr)> {
    let bind_addr = config.bind_addr();
    let session = Session::new(config.game, TcpTransport::new(), StdRng::from_entropy())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let listener = TcpListener::bind(bind_addr)?;
    let addr = listener.local_addr()?;
    // Non-blocking so the accept thread can notice shutdown.
    listener.set_nonblocking(true)?;
    info!("listening on {addr}");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let thread = thread::spawn(move || {
        run_server(listener, session, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main server loop. Runs until stopped or the session ends.
fn run_server(listener: TcpListener, mut session: TcpSession, keep_running: Arc<AtomicBool>) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let accepting = Arc::new(AtomicBool::new(true));
    let accepting_listener = accepting.clone();
    let tx_listener = tx.clone();
    let listener_thread = thread::spawn(move || {
        accept_loop(listener, tx_listener, accepting_listener);
    });

    while keep_running.load(Ordering::SeqCst) && !session.is_over() {
        let result = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => process_events(&mut session, event, &rx, &tx, &keep_running),
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Err(RecvTimeoutError::Disconnected) => break,
        }
        .and_then(|()| session.tick(Instant::now()));

        if let Err(violation) = result {
            session.abort(&violation);
        }
    }

    // No-op if the game already ended.
    session.shutdown("the server is shutting down");

    accepting.store(false, Ordering::SeqCst);
    if listener_thread.join().is_err() {
        error!("listener thread panicked");
    }
    info!("server stopped");
}

/// Handle `first`, then drain any events that arrived in the meantime.
fn process_events(
    session: &mut TcpSession,
    first: InternalEvent,
    rx: &Receiver<InternalEvent>,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) -> Result<(), InvariantViolation> {
    handle_event(session, first, tx, keep_running)?;
    while let Ok(event) = rx.try_recv() {
        handle_event(session, event, tx, keep_running)?;
    }
    Ok(())
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut TcpSession,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) -> Result<(), InvariantViolation> {
    match event {
        InternalEvent::NewConnection { stream, addr } => {
            handle_new_connection(session, stream, addr, tx, keep_running)
        }
        InternalEvent::Line { player_id, line } => session.submit_choice(player_id, &line),
        InternalEvent::Disconnected { player_id } => session.disconnect(player_id),
    }
}

/// Seat a new connection, or tell it why not and close it.
fn handle_new_connection(
    session: &mut TcpSession,
    stream: TcpStream,
    addr: SocketAddr,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) -> Result<(), InvariantViolation> {
    let player_id = PlayerId(addr);
    info!("connection from {player_id}");

    // The session's transport gets the write half.
    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to clone stream for {player_id}: {e}");
            return Ok(());
        }
    };

    match session.admit(player_id, write_stream) {
        Ok(()) => {
            let tx_reader = tx.clone();
            let keep_running_reader = keep_running.clone();
            thread::spawn(move || {
                reader_loop(BufReader::new(stream), player_id, tx_reader, keep_running_reader);
            });
            Ok(())
        }
        Err(SessionError::Admit(reason)) => {
            reject(stream, player_id, &reason);
            Ok(())
        }
        Err(SessionError::Fatal(violation)) => Err(violation),
    }
}

/// Send the rejection line and close the connection.
fn reject(mut stream: TcpStream, player_id: PlayerId, reason: &AdmitError) {
    let msg = ServerMessage::Rejected {
        reason: reason.to_string(),
    };
    if let Err(e) = write_line(&mut stream, &msg.to_string()) {
        debug!("failed to send rejection to {player_id}: {e}");
    }
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!("failed to close rejected connection {player_id}: {e}");
    }
}

/// Accept connections until `accepting` is cleared. The listening socket is
/// released when this returns.
fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, accepting: Arc<AtomicBool>) {
    while accepting.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("dropping connection from {addr}: {e}");
                    continue;
                }
                if tx.send(InternalEvent::NewConnection { stream, addr }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!("accept failed: {e}");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
    debug!("listener closed");
}

/// Reader loop for a single player. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    player_id: PlayerId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_line(&mut reader) {
            Ok(line) => {
                if tx.send(InternalEvent::Line { player_id, line }).is_err() {
                    return;
                }
            }
            Err(e) => {
                // EOF, reset, or an oversized/garbled line: drop the player.
                debug!("read from {player_id} ended: {e}");
                let _ = tx.send(InternalEvent::Disconnected { player_id });
                return;
            }
        }
    }
}
