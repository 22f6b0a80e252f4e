//! Session: one document, its cursor, and the viewport onto it.
//!
//! All editing state lives here and is passed around by `&mut`. The
//! [`Editor`](crate::editor::Editor) owns a `Session`; prompt handlers such
//! as incremental search get temporary `&mut` access to it.
//!
//! # Coordinates
//!
//! - `cursor.cx` is a buffer column in row `cursor.cy`.
//! - `cursor.cy` ranges over `0..=numrows`. `cy == numrows` is the virtual
//!   row past the end, where typing appends a new line.
//! - `view.rx` is the cursor's render column, recomputed by
//!   [`scroll`](Session::scroll).
//! - `view.rowoff`/`view.coloff` are the first visible row and render
//!   column. After `scroll`, the cursor is inside
//!   `[rowoff, rowoff + rows) × [coloff, coloff + cols)`.

use crate::document::Document;
use crate::row::Row;

// ---------------------------------------------------------------------------
// Cursor and viewport
// ---------------------------------------------------------------------------

/// Buffer-space cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub cx: usize,
    pub cy: usize,
}

impl Cursor {
    #[must_use]
    pub const fn new(cy: usize, cx: usize) -> Self {
        Self { cx, cy }
    }
}

/// Visible window onto the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// First visible row.
    pub rowoff: usize,
    /// First visible render column.
    pub coloff: usize,
    /// Text area height in screen rows.
    pub rows: usize,
    /// Text area width in screen columns.
    pub cols: usize,
    /// Cursor's render column.
    pub rx: usize,
}

/// Single-step cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Session {
    pub doc: Document,
    pub cursor: Cursor,
    pub view: Viewport,
}

impl Session {
    /// Start at the top of `doc` with a `rows × cols` text area.
    #[must_use]
    pub fn new(doc: Document, rows: usize, cols: usize) -> Self {
        Self {
            doc,
            cursor: Cursor::default(),
            view: Viewport {
                rows,
                cols,
                ..Viewport::default()
            },
        }
    }

    /// The row under the cursor, `None` on the virtual row.
    #[must_use]
    pub fn current_row(&self) -> Option<&Row> {
        self.doc.row(self.cursor.cy)
    }

    // -- Movement -------------------------------------------------------------

    /// Move one step, then clamp `cx` to the new row.
    ///
    /// Left at column 0 wraps to the end of the previous row; right at the
    /// end of a row wraps to the start of the next one. `cy` never goes
    /// past the virtual row.
    pub fn move_cursor(&mut self, motion: Motion) {
        let numrows = self.doc.numrows();
        let cur = &mut self.cursor;
        let on_row = cur.cy < numrows;

        match motion {
            Motion::Left => {
                if cur.cx > 0 {
                    cur.cx -= 1;
                } else if cur.cy > 0 {
                    cur.cy -= 1;
                    cur.cx = self.doc.row_len(cur.cy);
                }
            }
            Motion::Right => {
                if on_row {
                    if cur.cx < self.doc.row_len(cur.cy) {
                        cur.cx += 1;
                    } else {
                        cur.cy += 1;
                        cur.cx = 0;
                    }
                }
            }
            Motion::Up => cur.cy = cur.cy.saturating_sub(1),
            Motion::Down => {
                if cur.cy < numrows {
                    cur.cy += 1;
                }
            }
        }

        cur.cx = cur.cx.min(self.doc.row_len(cur.cy));
    }

    /// Column 0 of the current row.
    pub const fn home(&mut self) {
        self.cursor.cx = 0;
    }

    /// End of the current row. No-op on the virtual row.
    pub fn end(&mut self) {
        if self.cursor.cy < self.doc.numrows() {
            self.cursor.cx = self.doc.row_len(self.cursor.cy);
        }
    }

    /// Jump to the top of the viewport, then a screenful up.
    pub fn page_up(&mut self) {
        let cy = self.view.rowoff.min(self.doc.numrows());
        self.cursor.cy = cy;
        self.cursor.cx = self.cursor.cx.min(self.doc.row_len(cy));
        for _ in 0..self.view.rows {
            self.move_cursor(Motion::Up);
        }
    }

    /// Jump to the bottom of the viewport, then a screenful down.
    pub fn page_down(&mut self) {
        let bottom = (self.view.rowoff + self.view.rows).saturating_sub(1);
        self.cursor.cy = bottom.min(self.doc.numrows());
        for _ in 0..self.view.rows {
            self.move_cursor(Motion::Down);
        }
    }

    // -- Scrolling ------------------------------------------------------------

    /// Recompute `rx` and shift the viewport so the cursor is visible.
    ///
    /// Vertical and horizontal are independent one-sided clamps. Horizontal
    /// compares in render space so a tab-heavy line can't leave the cursor
    /// off screen.
    pub fn scroll(&mut self) {
        let Cursor { cx, cy } = self.cursor;
        let rx = self.doc.row(cy).map_or(0, |row| row.cx_to_rx(cx));

        let Viewport {
            rowoff,
            coloff,
            rows,
            cols,
            rx: view_rx,
        } = &mut self.view;
        *view_rx = rx;

        if cy < *rowoff {
            *rowoff = cy;
        }
        if cy >= *rowoff + *rows {
            *rowoff = (cy + 1).saturating_sub(*rows);
        }
        if rx < *coloff {
            *coloff = rx;
        }
        if rx >= *coloff + *cols {
            *coloff = (rx + 1).saturating_sub(*cols);
        }
    }

    /// Render bytes of document row `filerow` visible in the viewport.
    /// Empty past the end of the row or document.
    #[must_use]
    pub fn visible_slice(&self, filerow: usize) -> &[u8] {
        let Some(row) = self.doc.row(filerow) else {
            return &[];
        };
        let render = row.render();
        let start = self.view.coloff.min(render.len());
        let end = (start + self.view.cols).min(render.len());
        &render[start..end]
    }

    // -- Editing --------------------------------------------------------------

    /// Insert `byte` at the cursor. On the virtual row, a new row is
    /// appended first.
    pub fn insert_char(&mut self, byte: u8) {
        let Cursor { cx, cy } = self.cursor;
        if cy == self.doc.numrows() {
            self.doc.insert_row(cy, b"");
        }
        if self.doc.insert_char(cy, cx, byte) {
            self.cursor.cx += 1;
        }
    }

    /// Split the current row at the cursor; the cursor moves to the start
    /// of the new line.
    pub fn insert_newline(&mut self) {
        let Cursor { cx, cy } = self.cursor;

        if cx == 0 {
            self.doc.insert_row(cy, b"");
        } else {
            let tail = self
                .doc
                .row(cy)
                .map(|row| row.chars()[cx.min(row.len())..].to_vec())
                .unwrap_or_default();
            self.doc.insert_row(cy + 1, &tail);
            self.doc.truncate_row(cy, cx);
        }

        self.cursor.cy += 1;
        self.cursor.cx = 0;
    }

    /// Backspace: delete the byte before the cursor, or join the current
    /// row onto the previous one at column 0.
    pub fn delete_char(&mut self) {
        let Cursor { cx, cy } = self.cursor;
        if cy == self.doc.numrows() || (cx == 0 && cy == 0) {
            return;
        }

        if cx > 0 {
            if self.doc.delete_char(cy, cx - 1) {
                self.cursor.cx -= 1;
            }
        } else {
            let prev_len = self.doc.row_len(cy - 1);
            let line = self
                .doc
                .row(cy)
                .map(|row| row.chars().to_vec())
                .unwrap_or_default();
            self.doc.append_to_row(cy - 1, &line);
            self.doc.delete_row(cy);
            self.cursor.cy -= 1;
            self.cursor.cx = prev_len;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn session(text: &str) -> Session {
        Session::new(Document::from_bytes(text.as_bytes()), 10, 20)
    }

    fn lines(s: &Session) -> Vec<String> {
        s.doc
            .rows()
            .iter()
            .map(|r| String::from_utf8_lossy(r.chars()).into_owned())
            .collect()
    }

    // -- Movement -------------------------------------------------------------

    #[test]
    fn left_at_column_zero_wraps_to_previous_row_end() {
        let mut s = session("hello\nworld\n");
        s.cursor = Cursor::new(1, 0);
        s.move_cursor(Motion::Left);
        assert_eq!(s.cursor, Cursor::new(0, 5));
    }

    #[test]
    fn left_at_origin_stays() {
        let mut s = session("hello\n");
        s.move_cursor(Motion::Left);
        assert_eq!(s.cursor, Cursor::new(0, 0));
    }

    #[test]
    fn right_at_row_end_wraps_to_next_row() {
        let mut s = session("hi\nthere\n");
        s.cursor = Cursor::new(0, 2);
        s.move_cursor(Motion::Right);
        assert_eq!(s.cursor, Cursor::new(1, 0));
    }

    #[test]
    fn right_on_virtual_row_does_nothing() {
        let mut s = session("hi\n");
        s.cursor = Cursor::new(1, 0);
        s.move_cursor(Motion::Right);
        assert_eq!(s.cursor, Cursor::new(1, 0));
    }

    #[test]
    fn down_stops_at_virtual_row() {
        let mut s = session("a\nb\n");
        for _ in 0..5 {
            s.move_cursor(Motion::Down);
        }
        assert_eq!(s.cursor.cy, 2);
    }

    #[test]
    fn up_stops_at_top() {
        let mut s = session("a\nb\n");
        s.move_cursor(Motion::Up);
        assert_eq!(s.cursor.cy, 0);
    }

    #[test]
    fn vertical_move_clamps_cx() {
        let mut s = session("long line\nab\n");
        s.cursor = Cursor::new(0, 9);
        s.move_cursor(Motion::Down);
        assert_eq!(s.cursor, Cursor::new(1, 2));
        s.move_cursor(Motion::Down);
        assert_eq!(s.cursor, Cursor::new(2, 0));
    }

    #[test]
    fn home_and_end() {
        let mut s = session("hello\n");
        s.end();
        assert_eq!(s.cursor.cx, 5);
        s.home();
        assert_eq!(s.cursor.cx, 0);
    }

    #[test]
    fn end_on_virtual_row_is_noop() {
        let mut s = session("hello\n");
        s.cursor = Cursor::new(1, 0);
        s.end();
        assert_eq!(s.cursor.cx, 0);
    }

    #[test]
    fn page_down_then_up() {
        let text: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let mut s = session(&text);

        s.page_down();
        // Bottom of the viewport (9), then 10 more.
        assert_eq!(s.cursor.cy, 19);
        s.scroll();
        assert_eq!(s.view.rowoff, 10);

        s.page_up();
        // Top of the viewport (10), then 10 up.
        assert_eq!(s.cursor.cy, 0);
    }

    #[test]
    fn page_down_clamps_to_virtual_row() {
        let mut s = session("a\nb\n");
        s.page_down();
        assert_eq!(s.cursor.cy, 2);
    }

    #[test]
    fn page_up_with_no_text_rows_stays_in_document() {
        let mut s = Session::new(Document::from_bytes(b"ab\ncd\n"), 0, 20);
        s.cursor = Cursor::new(1, 2);
        s.scroll();
        assert_eq!(s.view.rowoff, 2);

        s.page_up();
        assert_eq!(s.cursor, Cursor::new(2, 0));
    }

    // -- Scrolling ------------------------------------------------------------

    #[test]
    fn scroll_down_keeps_cursor_on_last_visible_row() {
        let text: String = (0..30).map(|i| format!("{i}\n")).collect();
        let mut s = session(&text);
        s.cursor.cy = 15;
        s.scroll();
        assert_eq!(s.view.rowoff, 6);
    }

    #[test]
    fn scroll_up_puts_cursor_on_first_row() {
        let text: String = (0..30).map(|i| format!("{i}\n")).collect();
        let mut s = session(&text);
        s.view.rowoff = 20;
        s.cursor.cy = 5;
        s.scroll();
        assert_eq!(s.view.rowoff, 5);
    }

    #[test]
    fn scroll_right_uses_render_column() {
        let mut s = session("\t\t\tx\n");
        s.cursor.cx = 3;
        s.scroll();
        assert_eq!(s.view.rx, 24);
        assert_eq!(s.view.coloff, 5);
    }

    #[test]
    fn scroll_left_snaps_to_cursor() {
        let mut s = session("abcdefghijklmnopqrstuvwxyz\n");
        s.view.coloff = 15;
        s.cursor.cx = 3;
        s.scroll();
        assert_eq!(s.view.coloff, 3);
    }

    #[test]
    fn scroll_on_virtual_row_has_rx_zero() {
        let mut s = session("abc\n");
        s.cursor = Cursor::new(1, 0);
        s.scroll();
        assert_eq!(s.view.rx, 0);
    }

    #[test]
    fn scroll_snaps_out_of_range_rowoff() {
        let text: String = (0..30).map(|i| format!("{i}\n")).collect();
        let mut s = session(&text);
        s.cursor.cy = 12;
        s.view.rowoff = 30;
        s.scroll();
        assert_eq!(s.view.rowoff, 12);
    }

    #[test]
    fn visible_slice_honours_coloff_and_width() {
        let mut s = session("0123456789abcdefghijKLMNOP\n");
        assert_eq!(s.visible_slice(0), b"0123456789abcdefghij");
        s.view.coloff = 20;
        assert_eq!(s.visible_slice(0), b"KLMNOP");
        s.view.coloff = 40;
        assert!(s.visible_slice(0).is_empty());
        assert!(s.visible_slice(7).is_empty());
    }

    // -- Editing --------------------------------------------------------------

    #[test]
    fn insert_char_advances_cursor() {
        let mut s = session("ac\n");
        s.cursor.cx = 1;
        s.insert_char(b'b');
        assert_eq!(lines(&s), vec!["abc"]);
        assert_eq!(s.cursor, Cursor::new(0, 2));
        assert!(s.doc.is_dirty());
    }

    #[test]
    fn insert_char_on_virtual_row_appends_row() {
        let mut s = session("");
        s.insert_char(b'x');
        assert_eq!(lines(&s), vec!["x"]);
        assert_eq!(s.cursor, Cursor::new(0, 1));
    }

    #[test]
    fn newline_splits_row() {
        let mut s = session("hello\nworld\n");
        s.cursor = Cursor::new(0, 5);
        s.insert_newline();
        assert_eq!(lines(&s), vec!["hello", "", "world"]);
        assert_eq!(s.cursor, Cursor::new(1, 0));
    }

    #[test]
    fn newline_in_middle() {
        let mut s = session("hello\n");
        s.cursor.cx = 2;
        s.insert_newline();
        assert_eq!(lines(&s), vec!["he", "llo"]);
        assert_eq!(s.cursor, Cursor::new(1, 0));
    }

    #[test]
    fn newline_at_column_zero_inserts_above() {
        let mut s = session("hello\n");
        s.insert_newline();
        assert_eq!(lines(&s), vec!["", "hello"]);
        assert_eq!(s.cursor, Cursor::new(1, 0));
    }

    #[test]
    fn backspace_removes_previous_byte() {
        let mut s = session("abc\n");
        s.cursor.cx = 2;
        s.delete_char();
        assert_eq!(lines(&s), vec!["ac"]);
        assert_eq!(s.cursor.cx, 1);
    }

    #[test]
    fn backspace_at_row_start_joins() {
        let mut s = session("foo\nbar\n");
        s.cursor = Cursor::new(1, 0);
        s.delete_char();
        assert_eq!(lines(&s), vec!["foobar"]);
        assert_eq!(s.cursor, Cursor::new(0, 3));
    }

    #[test]
    fn backspace_at_origin_is_noop() {
        let mut s = session("abc\n");
        s.delete_char();
        assert_eq!(lines(&s), vec!["abc"]);
        assert!(!s.doc.is_dirty());
    }

    #[test]
    fn backspace_on_virtual_row_is_noop() {
        let mut s = session("abc\n");
        s.cursor = Cursor::new(1, 0);
        s.delete_char();
        assert_eq!(lines(&s), vec!["abc"]);
        assert_eq!(s.cursor, Cursor::new(1, 0));
    }

    // -- Laws -----------------------------------------------------------------

    fn text() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z\t ]{0,12}", 1..6)
    }

    proptest! {
        #[test]
        fn newline_then_backspace_restores_row(line in "[a-z\t ]{0,20}", pick in any::<prop::sample::Index>()) {
            let mut s = session(&format!("{line}\n"));
            s.cursor.cx = pick.index(line.len() + 1);
            s.insert_newline();
            s.delete_char();
            prop_assert_eq!(lines(&s), vec![line]);
        }

        #[test]
        fn backspacing_everything_leaves_one_empty_row(rows in text()) {
            let mut s = session(&(rows.join("\n") + "\n"));
            let last = s.doc.numrows() - 1;
            s.cursor = Cursor::new(last, s.doc.row_len(last));

            let total: usize = rows.iter().map(String::len).sum::<usize>() + rows.len();
            for _ in 0..total {
                s.delete_char();
                prop_assert!(s.cursor.cy < s.doc.numrows().max(1));
                prop_assert!(s.cursor.cx <= s.doc.row_len(s.cursor.cy));
            }

            prop_assert_eq!(s.doc.numrows(), 1);
            prop_assert!(s.doc.row(0).is_some_and(Row::is_empty));
            prop_assert_eq!(s.cursor, Cursor::new(0, 0));
        }

        #[test]
        fn cursor_stays_visible_after_scroll(rows in text(), moves in prop::collection::vec(0u8..4, 0..60)) {
            let mut s = Session::new(Document::from_bytes((rows.join("\n") + "\n").as_bytes()), 3, 5);
            for m in moves {
                let motion = match m {
                    0 => Motion::Left,
                    1 => Motion::Right,
                    2 => Motion::Up,
                    _ => Motion::Down,
                };
                s.move_cursor(motion);
                s.scroll();
                prop_assert!(s.cursor.cy <= s.doc.numrows());
                prop_assert!(s.cursor.cx <= s.doc.row_len(s.cursor.cy));
                prop_assert!(s.view.rowoff <= s.cursor.cy && s.cursor.cy < s.view.rowoff + 3);
                prop_assert!(s.view.coloff <= s.view.rx && s.view.rx < s.view.coloff + 5);
            }
        }
    }
}
