//! Rows: one logical line of the document.
//!
//! A [`Row`] owns two byte strings: `chars`, the line exactly as stored in
//! the file, and `render`, what the terminal should show for it. The only
//! difference between the two is tab expansion: every `\t` becomes one to
//! [`TAB_STOP`] spaces so that the next byte lands on a tab stop.
//!
//! `render` is never edited directly. Every mutation of `chars` goes through
//! a method that re-derives `render` before returning, so the two can never
//! disagree.
//!
//! # Coordinate spaces
//!
//! - **cx** indexes `chars` (buffer space).
//! - **rx** indexes `render` (render space).
//!
//! [`Row::cx_to_rx`] and [`Row::rx_to_cx`] convert between them. Neither is
//! cached; both walk the row from the start.

/// Width of a tab stop in render columns.
pub const TAB_STOP: usize = 8;

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One line of text plus its tab-expanded render form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    chars: Vec<u8>,
    render: Vec<u8>,
}

impl Row {
    /// Build a row from raw line content (no trailing newline).
    #[must_use]
    pub fn new(chars: impl Into<Vec<u8>>) -> Self {
        let chars = chars.into();
        let render = expand_tabs(&chars);
        Self { chars, render }
    }

    /// Raw bytes of the line.
    #[inline]
    #[must_use]
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// Tab-expanded bytes for display.
    #[inline]
    #[must_use]
    pub fn render(&self) -> &[u8] {
        &self.render
    }

    /// Number of bytes in `chars`.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    // -- Coordinate mapping -------------------------------------------------

    /// Render column of buffer column `cx`.
    ///
    /// `cx` past the end of the row is treated as the end of the row.
    #[must_use]
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        self.chars
            .iter()
            .take(cx)
            .fold(0, |rx, &b| advance(rx, b))
    }

    /// Buffer column whose expansion covers render column `rx`.
    ///
    /// Inside a tab's expansion this is the tab itself, the smallest `cx`
    /// that reaches `rx`. Past the end of the row, returns the row length.
    #[must_use]
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur_rx = 0;
        for (cx, &b) in self.chars.iter().enumerate() {
            cur_rx = advance(cur_rx, b);
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    // -- Mutation -------------------------------------------------------------
    //
    // Crate-private: the document wraps these so every edit also bumps its
    // dirty counter.

    /// Insert `byte` at `at`, clamped to the end of the row.
    pub(crate) fn insert(&mut self, at: usize, byte: u8) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, byte);
        self.update();
    }

    /// Remove the byte at `at`. Returns `false` if `at` is out of range.
    pub(crate) fn remove(&mut self, at: usize) -> bool {
        if at >= self.chars.len() {
            return false;
        }
        self.chars.remove(at);
        self.update();
        true
    }

    /// Append `bytes` to the end of the row.
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.chars.extend_from_slice(bytes);
        self.update();
    }

    /// Shorten the row to `len` bytes. No-op if it is already shorter.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.chars.truncate(len);
        self.update();
    }

    fn update(&mut self) {
        self.render = expand_tabs(&self.chars);
    }
}

// ---------------------------------------------------------------------------
// Tab expansion
// ---------------------------------------------------------------------------

/// Render column after drawing `byte` starting at column `rx`.
#[inline]
const fn advance(rx: usize, byte: u8) -> usize {
    if byte == b'\t' {
        rx + (TAB_STOP - rx % TAB_STOP)
    } else {
        rx + 1
    }
}

/// Expand every tab in `chars` to spaces up to the next tab stop.
#[must_use]
pub fn expand_tabs(chars: &[u8]) -> Vec<u8> {
    let tabs = chars.iter().filter(|&&b| b == b'\t').count();
    let mut render = Vec::with_capacity(chars.len() + tabs * (TAB_STOP - 1));

    for &b in chars {
        if b == b'\t' {
            render.push(b' ');
            while render.len() % TAB_STOP != 0 {
                render.push(b' ');
            }
        } else {
            render.push(b);
        }
    }

    render
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
