// Newline-terminated line framing over TCP.
//
// Players connect with plain `nc`, so there is no binary framing: each message
// in either direction is one UTF-8 text line ending in `\n`. Clients may send
// `\r\n` (telnet, Windows netcat); the trailing `\r` is stripped on read.
//
// `MAX_LINE_LEN` bounds how much a single read may buffer, so a client that
// never sends a newline cannot make the server allocate without limit.

use std::io::{self, BufRead, Read, Write};

/// Maximum accepted line length in bytes, excluding the terminator.
pub const MAX_LINE_LEN: usize = 1024;

/// Write `line` followed by `\n` and flush.
///
/// Returns `InvalidInput` if `line` itself contains a newline (it would be
/// seen as two messages on the other end) or exceeds `MAX_LINE_LEN`.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    if line.contains('\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "line payload must not contain a newline",
        ));
    }
    if line.len() > MAX_LINE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("line too long: {} bytes (max {MAX_LINE_LEN})", line.len()),
        ));
    }
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Read one line, without its `\n` / `\r\n` terminator.
///
/// Returns `UnexpectedEof` if the stream is closed before any byte arrives.
/// A final unterminated line before EOF is returned as-is. Returns
/// `InvalidData` for lines longer than `MAX_LINE_LEN` or not valid UTF-8.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut buf = Vec::new();
    // One extra byte for the terminator, one more to detect overflow.
    let limit = (MAX_LINE_LEN + 2) as u64;
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed",
        ));
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line too long (max {MAX_LINE_LEN} bytes)"),
        ));
    }
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
