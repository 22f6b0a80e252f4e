// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, window size, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, poll, and raw fd reads/writes.
// These are the standard POSIX interfaces for terminal control and there is
// no safe alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. It enters raw mode via termios
// and guarantees the original settings come back on drop, even if the
// editor panics mid-frame.
//
// The panic hook writes a pre-built restore sequence straight to fd 1,
// bypassing Rust's stdout lock. A panic raised while a frame is being
// flushed would otherwise deadlock on that lock. One raw write, termios
// restored, then the original panic handler prints to a sane terminal.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;
use crate::frame::{Frame, RenderSink};
use crate::output::OutputBuffer;

/// How long to wait for each byte of a cursor-position report.
#[cfg(unix)]
const REPORT_TIMEOUT_MS: i32 = 100;

/// Longest cursor-position report we are willing to read.
const REPORT_MAX_LEN: usize = 32;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Window size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal, the query fails, or the
/// kernel reports zero columns.
#[cfg(unix)]
#[must_use]
pub fn ioctl_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn ioctl_size() -> Option<Size> {
    None
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

/// Parse a cursor-position report (`ESC [ rows ; cols R`).
///
/// The trailing `R` is optional so the caller can stop reading at it
/// without including it. Returns `None` for anything malformed.
#[must_use]
pub fn parse_cursor_report(report: &[u8]) -> Option<Size> {
    let body = report.strip_prefix(b"\x1b[")?;
    let body = body.strip_suffix(b"R").unwrap_or(body);
    let text = std::str::from_utf8(body).ok()?;
    let (rows, cols) = text.split_once(';')?;
    let size = Size {
        rows: rows.parse().ok()?,
        cols: cols.parse().ok()?,
    };
    (size.cols > 0 && size.rows > 0).then_some(size)
}

/// Read a cursor-position report from stdin, one byte at a time, stopping
/// at `R`. Must be called in raw mode or the reply is line-buffered.
#[cfg(unix)]
fn read_cursor_report() -> io::Result<Vec<u8>> {
    let mut report = Vec::with_capacity(REPORT_MAX_LEN);

    while report.len() < REPORT_MAX_LEN - 1 {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: libc::STDIN_FILENO,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, REPORT_TIMEOUT_MS)
        };
        if ready <= 0 {
            break;
        }

        let mut byte = 0u8;
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast(), 1) };
        if n != 1 || byte == b'R' {
            break;
        }
        report.push(byte);
    }

    Ok(report)
}

#[cfg(not(unix))]
fn read_cursor_report() -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "cursor position reports need a unix terminal",
    ))
}

/// Determine the window size.
///
/// Tries `TIOCGWINSZ` first. If that fails, pushes the cursor to the
/// bottom-right corner and asks the terminal where it ended up.
///
/// # Errors
///
/// Returns an error if neither method yields a usable size.
pub fn window_size() -> io::Result<Size> {
    if let Some(size) = ioctl_size() {
        return Ok(size);
    }

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    ansi::cursor_to_bottom_right(&mut lock)?;
    ansi::query_cursor_position(&mut lock)?;
    lock.flush()?;
    drop(lock);

    let report = read_cursor_report()?;
    parse_cursor_report(&report).ok_or_else(|| {
        io::Error::other("could not determine the terminal window size")
    })
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Saved cooked-mode termios for the panic hook.
///
/// [`Terminal`] keeps its own copy, but the panic hook can't
/// access it. This global backup, behind a [`Mutex`] rather than `static mut`,
/// lets the hook restore cooked mode without the struct.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Put the saved termios back. Errors are ignored; we are already panicking.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original);
            }
        }
    }
}

/// Restore sequence for emergency use: reset attributes, clear the screen,
/// home the cursor, show it.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[m\
    \x1b[2J\
    \x1b[H\
    \x1b[?25h";

/// Panic hook guard: ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Chain a hook that restores the tty in front of the existing panic hook.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Owner of the tty's raw-mode state.
///
/// Call [`enter`](Self::enter) to switch to raw mode and measure the
/// window. The original mode is restored when the handle is dropped,
/// even on panic.
///
/// # Example
///
/// ```no_run
/// use te_term::terminal::Terminal;
///
/// let mut term = Terminal::new();
/// term.enter()?;
/// // ... draw frames, read keys ...
/// // Terminal is restored automatically on drop.
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    /// Window size measured by the last [`enter`](Self::enter).
    size: Option<Size>,

    /// Frame bytes waiting for the single write per redraw.
    out: OutputBuffer,

    /// Whether raw mode is on.
    active: bool,
}

impl Terminal {
    /// Create a terminal handle. Does **not** touch the terminal yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            size: None,
            out: OutputBuffer::new(),
            active: false,
        }
    }

    /// Window size, if [`enter`](Self::enter) has measured it.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Option<Size> {
        self.size
    }

    /// Whether raw mode is on.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enter raw mode and measure the window.
    ///
    /// The size is measured after raw mode is on so the cursor-report
    /// fallback can read the terminal's reply without echo. Idempotent:
    /// calling `enter()` while already active just returns the size.
    ///
    /// # Errors
    ///
    /// Returns an error if termios cannot be read or set, or if the window
    /// size cannot be determined. Both are fatal for the editor.
    pub fn enter(&mut self) -> io::Result<Size> {
        if !self.active {
            install_panic_hook();
            self.enable_raw_mode()?;
            self.active = true;
        }

        let size = window_size()?;
        self.size = Some(size);
        Ok(size)
    }

    /// Leave raw mode. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    /// Clear the screen and home the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn clear(&mut self) -> io::Result<()> {
        self.out.clear();
        ansi::clear_screen(&mut self.out)?;
        ansi::cursor_home(&mut self.out)?;
        self.out.flush_stdout()
    }

    // ── Raw Mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Ok(());
        }

        let fd = libc::STDIN_FILENO;

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            self.original_termios = Some(termios);

            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            termios.c_iflag &=
                !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_cflag |= libc::CS8;
            termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN);

            // VMIN=1, VTIME=0: read() blocks until at least 1 byte. Timeouts
            // come from poll() in the key reader instead.
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some(ref original) = self.original_termios {
            unsafe {
                if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            self.original_termios = None;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for Terminal {
    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        self.out.clear();
        frame.encode(&mut self.out)?;
        self.out.flush_stdout()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Cursor reports ───────────────────────────────────────────────

    #[test]
    fn cursor_report_without_terminator() {
        assert_eq!(
            parse_cursor_report(b"\x1b[24;80"),
            Some(Size { cols: 80, rows: 24 })
        );
    }

    #[test]
    fn cursor_report_with_terminator() {
        assert_eq!(
            parse_cursor_report(b"\x1b[50;132R"),
            Some(Size { cols: 132, rows: 50 })
        );
    }

    #[test]
    fn cursor_report_rejects_garbage() {
        assert_eq!(parse_cursor_report(b""), None);
        assert_eq!(parse_cursor_report(b"24;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[24,80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[x;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[24;"), None);
    }

    #[test]
    fn cursor_report_rejects_zero() {
        assert_eq!(parse_cursor_report(b"\x1b[0;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[24;0"), None);
    }

    // ── Terminal queries ─────────────────────────────────────────────

    #[test]
    fn ioctl_size_does_not_panic() {
        let _ = ioctl_size();
    }

    #[test]
    fn is_tty_does_not_panic() {
        let _ = is_tty();
    }

    // ── Emergency restore sequence ──────────────────────────────────

    #[test]
    fn emergency_restore_clears_and_shows_cursor() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.contains("\x1b[2J"), "must clear the screen");
        assert!(s.contains("\x1b[H"), "must home the cursor");
        assert!(s.ends_with("\x1b[?25h"), "must show the cursor last");
    }

    // ── Terminal struct ─────────────────────────────────────────────

    #[test]
    fn terminal_new_is_inactive() {
        let term = Terminal::new();
        assert!(!term.is_active());
        assert_eq!(term.size(), None);
    }

    #[test]
    fn terminal_leave_without_enter() {
        let mut term = Terminal::new();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn terminal_drop_without_enter() {
        let term = Terminal::new();
        drop(term);
    }
}
