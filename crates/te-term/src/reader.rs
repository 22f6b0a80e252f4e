// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Stdin key source: turns raw terminal bytes into key events.
//
// The editor is strictly single-threaded: it blocks waiting for a key,
// handles it, redraws. So instead of a background thread, StdinKeys polls
// stdin directly with a short timeout. The timeout matters for one thing
// only: a lone ESC byte. If nothing follows it within POLL_TIMEOUT_MS, the
// parser is flushed and the ESC becomes a real Escape key instead of the
// start of an arrow-key sequence.

use std::collections::VecDeque;
use std::io;

use crate::input::{KeyEvent, KeySource, Parser};

/// Byte chunk read from stdin.
///
/// A single keypress is 1-6 bytes, a paste can be kilobytes.
const READ_BUF_SIZE: usize = 4096;

/// How long to wait for more bytes before flushing a partial sequence.
#[cfg(unix)]
const POLL_TIMEOUT_MS: i32 = 100;

/// Outcome of waiting on stdin once.
enum Wait {
    Bytes(usize),
    Timeout,
    Eof,
}

/// Blocking key source backed by the process's stdin.
///
/// # Example
///
/// ```no_run
/// use te_term::input::KeySource;
/// use te_term::reader::StdinKeys;
///
/// let mut keys = StdinKeys::new();
/// let key = keys.read_key()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct StdinKeys {
    parser: Parser,
    queue: VecDeque<KeyEvent>,
    buf: Box<[u8; READ_BUF_SIZE]>,
}

impl StdinKeys {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            queue: VecDeque::new(),
            buf: Box::new([0; READ_BUF_SIZE]),
        }
    }

    /// Feed raw bytes through the parser and queue any completed keys.
    fn feed(&mut self, bytes: &[u8]) {
        self.queue.extend(self.parser.advance(bytes));
    }

    /// No more bytes arrived in time. Whatever the parser is holding is
    /// as complete as it is going to get.
    fn expire(&mut self) {
        if self.parser.has_pending() {
            self.queue.extend(self.parser.flush());
        }
    }

    #[cfg(unix)]
    fn wait(&mut self) -> io::Result<Wait> {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: libc::STDIN_FILENO,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
        };

        if ready < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(Wait::Timeout)
            } else {
                Err(err)
            };
        }
        if ready == 0 {
            return Ok(Wait::Timeout);
        }

        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                self.buf.as_mut_ptr().cast(),
                self.buf.len(),
            )
        };

        match n {
            0 => Ok(Wait::Eof),
            n if n < 0 => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(Wait::Timeout),
                    _ => Err(err),
                }
            }
            #[allow(clippy::cast_sign_loss)] // n > 0 guaranteed above.
            n => Ok(Wait::Bytes(n as usize)),
        }
    }

    /// Non-unix fallback: plain blocking reads, so a lone ESC is only
    /// resolved when the next key arrives.
    #[cfg(not(unix))]
    fn wait(&mut self) -> io::Result<Wait> {
        use std::io::Read;

        match io::stdin().lock().read(&mut self.buf[..])? {
            0 => Ok(Wait::Eof),
            n => Ok(Wait::Bytes(n)),
        }
    }
}

impl Default for StdinKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for StdinKeys {
    fn read_key(&mut self) -> io::Result<KeyEvent> {
        loop {
            if let Some(key) = self.queue.pop_front() {
                return Ok(key);
            }

            match self.wait()? {
                Wait::Bytes(n) => {
                    let chunk = self.buf[..n].to_vec();
                    self.feed(&chunk);
                }
                Wait::Timeout => self.expire(),
                Wait::Eof => {
                    self.expire();
                    if let Some(key) = self.queue.pop_front() {
                        return Ok(key);
                    }
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stdin closed",
                    ));
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyCode;

    #[test]
    fn feed_queues_complete_keys() {
        let mut keys = StdinKeys::new();
        keys.feed(b"ab");
        assert_eq!(keys.queue.len(), 2);
        assert_eq!(keys.queue[0].code, KeyCode::Char(b'a'));
        assert_eq!(keys.queue[1].code, KeyCode::Char(b'b'));
    }

    #[test]
    fn split_arrow_sequence_joins_across_reads() {
        let mut keys = StdinKeys::new();
        keys.feed(b"\x1b[");
        assert!(keys.queue.is_empty());
        keys.feed(b"A");
        assert_eq!(keys.queue.len(), 1);
        assert_eq!(keys.queue[0].code, KeyCode::Up);
    }

    #[test]
    fn lone_escape_resolves_on_timeout() {
        let mut keys = StdinKeys::new();
        keys.feed(b"\x1b");
        assert!(keys.queue.is_empty());
        keys.expire();
        assert_eq!(keys.queue.len(), 1);
        assert_eq!(keys.queue[0].code, KeyCode::Escape);
        assert!(keys.queue[0].modifiers.is_empty());
    }

    #[test]
    fn expire_without_pending_is_noop() {
        let mut keys = StdinKeys::new();
        keys.expire();
        assert!(keys.queue.is_empty());
    }
}
