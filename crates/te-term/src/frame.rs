// SPDX-License-Identifier: MIT
//
// Frames: the unit of screen output.
//
// The editor never issues partial updates. Every refresh produces a Frame:
// one entry per screen row plus where the hardware cursor should sit. The
// encoder turns that into a single burst of bytes that repaints the whole
// screen with the cursor hidden, so the user never sees it jump around
// mid-paint.

use std::io::{self, Write};

use crate::ansi;
use crate::output::OutputBuffer;

// ─── Line ────────────────────────────────────────────────────────────────────

/// One screen row of output.
///
/// `text` is written verbatim; the caller is responsible for clipping it to
/// the screen width. `inverse` paints it in reverse video (status bar).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub text: Vec<u8>,
    pub inverse: bool,
}

impl Line {
    /// A plain line.
    #[must_use]
    pub fn plain(text: impl Into<Vec<u8>>) -> Self {
        Self {
            text: text.into(),
            inverse: false,
        }
    }

    /// A reverse-video line.
    #[must_use]
    pub fn inverse(text: impl Into<Vec<u8>>) -> Self {
        Self {
            text: text.into(),
            inverse: true,
        }
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// A full-screen redraw request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Screen rows from top to bottom.
    pub lines: Vec<Line>,
    /// 0-indexed `(x, y)` cell for the hardware cursor.
    pub cursor: (u16, u16),
}

impl Frame {
    /// Create an empty frame with room for `rows` lines.
    #[must_use]
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            lines: Vec::with_capacity(rows),
            cursor: (0, 0),
        }
    }

    /// Append a line at the bottom.
    pub fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Encode the frame as ANSI bytes.
    ///
    /// Layout: hide cursor, home, then every line followed by an
    /// erase-to-end-of-line so stale content from the previous frame is
    /// wiped, lines separated by `\r\n` (no trailing newline, which would
    /// scroll the screen), cursor placement, show cursor.
    ///
    /// # Errors
    ///
    /// Propagates errors from the writer.
    pub fn encode(&self, w: &mut impl Write) -> io::Result<()> {
        ansi::cursor_hide(w)?;
        ansi::cursor_home(w)?;

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                w.write_all(b"\r\n")?;
            }
            if line.inverse {
                ansi::inverse(w)?;
                w.write_all(&line.text)?;
                ansi::reset(w)?;
            } else {
                w.write_all(&line.text)?;
            }
            ansi::clear_line(w)?;
        }

        let (x, y) = self.cursor;
        ansi::cursor_to(w, x, y)?;
        ansi::cursor_show(w)
    }
}

// ─── RenderSink ──────────────────────────────────────────────────────────────

/// Something that can display a [`Frame`].
///
/// The real implementation is [`Terminal`](crate::terminal::Terminal); tests
/// use a recording sink.
pub trait RenderSink {
    /// Replace the whole screen with `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying output fails.
    fn draw(&mut self, frame: &Frame) -> io::Result<()>;
}

/// Encode into an `OutputBuffer`, the way [`Terminal`](crate::terminal::Terminal) does.
impl RenderSink for OutputBuffer {
    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        frame.encode(self)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
