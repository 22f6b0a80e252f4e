//! Incremental search over rendered rows.
//!
//! [`IncrementalSearch`] is a [`PromptHandler`]: the editor feeds it every
//! keystroke typed into the `Search:` prompt and it moves the cursor to the
//! next match as the query changes.
//!
//! # Protocol
//!
//! - Enter / Escape end the search and reset the state. Restoring the
//!   cursor on cancel is the caller's job.
//! - Right / Down search forward from the last match, Left / Up backward.
//! - Any other key (the query changed) starts over from the top, forward.
//!
//! Matching is a literal substring test against each row's render form, so
//! a query containing spaces can match tab expansion. The scan visits every
//! row at most once, wrapping around the ends of the document, and stops at
//! the first hit. No match leaves the cursor where it was. An empty query
//! matches column 0 of the next row scanned.

use te_term::input::{KeyCode, KeyEvent};
use tracing::debug;

use crate::prompt::PromptHandler;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// IncrementalSearch
// ---------------------------------------------------------------------------

/// Search state for one `Search:` prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IncrementalSearch {
    last_match: Option<usize>,
    direction: SearchDirection,
}

impl IncrementalSearch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Row of the most recent match.
    #[must_use]
    pub const fn last_match(&self) -> Option<usize> {
        self.last_match
    }

    #[must_use]
    pub const fn direction(&self) -> SearchDirection {
        self.direction
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Scan for `query` starting after the last match.
    ///
    /// On a hit, puts the cursor on the match and pushes `rowoff` past the
    /// end of the document so the next scroll brings the match to the top
    /// of the screen. Returns the matching row.
    pub fn find_next(&mut self, session: &mut Session, query: &[u8]) -> Option<usize> {
        if self.last_match.is_none() {
            self.direction = SearchDirection::Forward;
        }

        let numrows = session.doc.numrows();
        let mut current = self.last_match;

        for _ in 0..numrows {
            let row = step(current, self.direction, numrows);
            current = Some(row);

            let Some(render) = session.doc.row(row).map(|r| r.render()) else {
                continue;
            };
            if let Some(offset) = find_bytes(render, query) {
                let cx = session.doc.row(row).map_or(0, |r| r.rx_to_cx(offset));
                self.last_match = Some(row);
                session.cursor.cy = row;
                session.cursor.cx = cx;
                session.view.rowoff = numrows;
                debug!(row, cx, "search hit");
                return Some(row);
            }
        }

        None
    }
}

impl PromptHandler for IncrementalSearch {
    fn on_keystroke(&mut self, session: &mut Session, input: &str, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Escape => {
                self.reset();
                return;
            }
            KeyCode::Right | KeyCode::Down => self.direction = SearchDirection::Forward,
            KeyCode::Left | KeyCode::Up => self.direction = SearchDirection::Backward,
            _ => self.reset(),
        }

        self.find_next(session, input.as_bytes());
    }
}

/// Next row index in `direction`, wrapping at both ends.
/// `None` means "before the first row".
fn step(current: Option<usize>, direction: SearchDirection, numrows: usize) -> usize {
    match (current, direction) {
        (None, SearchDirection::Forward) => 0,
        (None | Some(0), SearchDirection::Backward) => numrows - 1,
        (Some(row), SearchDirection::Forward) if row + 1 >= numrows => 0,
        (Some(row), SearchDirection::Forward) => row + 1,
        (Some(row), SearchDirection::Backward) => row - 1,
    }
}

/// Byte offset of the first occurrence of `needle` in `haystack`.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
