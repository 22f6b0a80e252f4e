//! Editor: the control loop.
//!
//! An [`Editor`] ties a [`Session`] to a key source and a render sink and
//! runs the refresh → read key → process cycle until the user quits.
//!
//! # Screen layout
//!
//! ```text
//! ┌────────────────────────────────┐
//! │ text rows (height - 2)         │
//! │ ~                              │
//! ├────────────────────────────────┤
//! │ name - N lines (modified)  y/N │  ← inverse video
//! │ status message                 │
//! └────────────────────────────────┘
//! ```
//!
//! # Key bindings
//!
//! | Key                 | Action                                  |
//! |---------------------|-----------------------------------------|
//! | printable, Tab      | insert                                  |
//! | Enter               | split line                              |
//! | Backspace, Ctrl-H   | delete before cursor                    |
//! | Delete              | delete under cursor                     |
//! | arrows, Home, End   | move                                    |
//! | PageUp, PageDown    | move a screenful                        |
//! | Ctrl-S              | save (prompts for a name if needed)     |
//! | Ctrl-F              | incremental search                      |
//! | Ctrl-Q              | quit (repeat to discard changes)        |
//! | other Ctrl-letter   | insert the raw control byte             |
//!
//! Ctrl-L, Escape and Alt combinations are ignored.

use std::time::Instant;

use te_term::frame::{Frame, Line, RenderSink};
use te_term::input::{KeyCode, KeyEvent, KeySource};
use te_term::terminal::Size;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::Result;
use crate::options::EditorOptions;
use crate::prompt::{NoopHandler, PromptHandler};
use crate::search::IncrementalSearch;
use crate::session::{Motion, Session};

/// Centered on an empty document.
pub const WELCOME: &str = concat!("Teditor -- version ", env!("CARGO_PKG_VERSION"));

/// Shown at startup.
pub const HELP_MESSAGE: &str = "HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find";

/// Lines below the text area: status bar and message bar.
const CHROME_ROWS: usize = 2;

/// Longest file name shown in the status bar.
const STATUS_NAME_MAX: usize = 20;

/// What the loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Message bar text and when it was set.
#[derive(Debug, Default)]
struct StatusMessage {
    text: String,
    set_at: Option<Instant>,
}

pub struct Editor<K, S> {
    session: Session,
    keys: K,
    sink: S,
    options: EditorOptions,
    status: StatusMessage,
    quit_times: u32,
    screen_cols: usize,
}

impl<K: KeySource, S: RenderSink> Editor<K, S> {
    /// Build an editor for a `size` terminal.
    #[must_use]
    pub fn new(doc: Document, size: Size, keys: K, sink: S, options: EditorOptions) -> Self {
        let rows = usize::from(size.rows).saturating_sub(CHROME_ROWS);
        let cols = usize::from(size.cols);
        Self {
            session: Session::new(doc, rows, cols),
            keys,
            sink,
            options,
            status: StatusMessage::default(),
            quit_times: options.quit_times,
            screen_cols: cols,
        }
    }

    // -- Accessors ------------------------------------------------------------

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub const fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Current message bar text, expired or not.
    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.status.text
    }

    /// Show `text` on the message bar for the configured timeout.
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = StatusMessage {
            text: text.into(),
            set_at: Some(Instant::now()),
        };
    }

    // -- Main loop ------------------------------------------------------------

    /// Redraw and handle keys until the user quits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminal`](crate::error::Error::Terminal) when the
    /// key source or render sink fails. Save failures are not errors; they
    /// show up on the message bar.
    pub fn run(&mut self) -> Result<()> {
        info!(
            rows = self.session.view.rows,
            cols = self.screen_cols,
            "editor started"
        );
        loop {
            self.refresh()?;
            let key = self.keys.read_key()?;
            if self.process_key(key)? == Action::Quit {
                info!("quit");
                return Ok(());
            }
        }
    }

    /// Scroll the cursor into view and draw a full frame.
    ///
    /// # Errors
    ///
    /// Propagates render sink failures.
    pub fn refresh(&mut self) -> Result<()> {
        self.session.scroll();
        let frame = self.compose_frame();
        self.sink.draw(&frame)?;
        Ok(())
    }

    /// Apply one key.
    ///
    /// # Errors
    ///
    /// Only terminal failures inside a prompt (save-as, search).
    pub fn process_key(&mut self, key: KeyEvent) -> Result<Action> {
        match key.code {
            KeyCode::Char(b'q') if key.is_ctrl(b'q') => {
                if self.session.doc.is_dirty() && self.quit_times > 0 {
                    self.set_status(format!(
                        "WARNING: File has unsaved changes. Press Ctrl-Q {} more times to quit.",
                        self.quit_times
                    ));
                    self.quit_times -= 1;
                    return Ok(Action::Continue);
                }
                return Ok(Action::Quit);
            }
            KeyCode::Char(b's') if key.is_ctrl(b's') => self.save()?,
            KeyCode::Char(b'f') if key.is_ctrl(b'f') => self.find()?,
            KeyCode::Enter => self.session.insert_newline(),
            KeyCode::Backspace => self.session.delete_char(),
            KeyCode::Delete => {
                self.session.move_cursor(Motion::Right);
                self.session.delete_char();
            }
            KeyCode::Home => self.session.home(),
            KeyCode::End => self.session.end(),
            KeyCode::PageUp => self.session.page_up(),
            KeyCode::PageDown => self.session.page_down(),
            KeyCode::Up => self.session.move_cursor(Motion::Up),
            KeyCode::Down => self.session.move_cursor(Motion::Down),
            KeyCode::Left => self.session.move_cursor(Motion::Left),
            KeyCode::Right => self.session.move_cursor(Motion::Right),
            KeyCode::Escape => {}
            KeyCode::Char(b'l') if key.is_ctrl(b'l') => {}
            KeyCode::Char(_) | KeyCode::Tab => {
                if let Some(byte) = key.insertable_byte().or_else(|| key.control_byte()) {
                    self.session.insert_char(byte);
                }
            }
        }

        self.quit_times = self.options.quit_times;
        Ok(Action::Continue)
    }

    // -- Commands -------------------------------------------------------------

    fn save(&mut self) -> Result<()> {
        if self.session.doc.path().is_none() {
            let Some(name) = self.prompt("Save as: {} (ESC to cancel)", &mut NoopHandler)? else {
                self.set_status("Save aborted");
                return Ok(());
            };
            self.session.doc.set_path(name);
        }

        match self.session.doc.save() {
            Ok(bytes) => self.set_status(format!("{bytes} bytes written to disk")),
            Err(err) => {
                warn!(%err, "save failed");
                let reason = err
                    .io_source()
                    .map_or_else(|| err.to_string(), ToString::to_string);
                self.set_status(format!("Can't save! I/O error: {reason}"));
            }
        }
        Ok(())
    }

    fn find(&mut self) -> Result<()> {
        let saved_cursor = self.session.cursor;
        let saved_rowoff = self.session.view.rowoff;
        let saved_coloff = self.session.view.coloff;

        let mut search = IncrementalSearch::new();
        let query = self.prompt("Search: {} (ESC/Enter to cancel)", &mut search)?;

        if query.is_none() {
            debug!("search cancelled");
            self.session.cursor = saved_cursor;
            self.session.view.rowoff = saved_rowoff;
            self.session.view.coloff = saved_coloff;
        }
        Ok(())
    }

    /// Read a line of input on the message bar.
    ///
    /// `template` is shown with `{}` replaced by the input so far. `handler`
    /// sees every key, including the Enter or Escape that ends the prompt.
    /// Returns `None` if the user pressed Escape. Enter on empty input is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Propagates key source and render sink failures.
    pub fn prompt(
        &mut self,
        template: &str,
        handler: &mut dyn PromptHandler,
    ) -> Result<Option<String>> {
        let mut input = String::new();

        loop {
            self.set_status(template.replace("{}", &input));
            self.refresh()?;

            let key = self.keys.read_key()?;
            match key.code {
                KeyCode::Backspace | KeyCode::Delete => {
                    input.pop();
                }
                KeyCode::Escape => {
                    self.set_status("");
                    handler.on_keystroke(&mut self.session, &input, key);
                    return Ok(None);
                }
                KeyCode::Enter if !input.is_empty() => {
                    self.set_status("");
                    handler.on_keystroke(&mut self.session, &input, key);
                    return Ok(Some(input));
                }
                _ => {
                    if let Some(byte) = key.insertable_byte() {
                        if byte.is_ascii() && !byte.is_ascii_control() {
                            input.push(char::from(byte));
                        }
                    }
                }
            }

            handler.on_keystroke(&mut self.session, &input, key);
        }
    }

    // -- Screen composition ---------------------------------------------------

    /// Build the frame for the current state. Call after
    /// [`Session::scroll`].
    #[must_use]
    pub fn compose_frame(&self) -> Frame {
        let view = &self.session.view;
        let mut frame = Frame::with_capacity(view.rows + CHROME_ROWS);

        self.draw_rows(&mut frame);
        frame.push(self.status_bar());
        frame.push(self.message_bar());

        let x = view.rx.saturating_sub(view.coloff);
        let y = self.session.cursor.cy.saturating_sub(view.rowoff);
        frame.cursor = (
            u16::try_from(x).unwrap_or(u16::MAX),
            u16::try_from(y).unwrap_or(u16::MAX),
        );
        frame
    }

    fn draw_rows(&self, frame: &mut Frame) {
        let view = &self.session.view;
        let numrows = self.session.doc.numrows();

        for y in 0..view.rows {
            let filerow = y + view.rowoff;
            if filerow < numrows {
                frame.push(Line::plain(self.session.visible_slice(filerow)));
            } else if numrows == 0 && y == view.rows / 3 {
                frame.push(Line::plain(welcome_line(self.screen_cols)));
            } else {
                frame.push(Line::plain("~"));
            }
        }
    }

    fn status_bar(&self) -> Line {
        let doc = &self.session.doc;
        let cols = self.screen_cols;

        let name: String = doc.path().map_or_else(
            || "[No Name]".to_string(),
            |p| p.display().to_string().chars().take(STATUS_NAME_MAX).collect(),
        );
        let modified = if doc.is_dirty() { "(modified)" } else { "" };
        let mut bar = format!("{name} - {} lines {modified}", doc.numrows()).into_bytes();
        let right = format!("{}/{}", self.session.cursor.cy + 1, doc.numrows());

        bar.truncate(cols);
        while bar.len() < cols {
            if cols - bar.len() == right.len() {
                bar.extend_from_slice(right.as_bytes());
                break;
            }
            bar.push(b' ');
        }
        Line::inverse(bar)
    }

    fn message_bar(&self) -> Line {
        let fresh = self
            .status
            .set_at
            .is_some_and(|at| at.elapsed() < self.options.message_timeout);
        if !fresh {
            return Line::plain("");
        }
        let text = self.status.text.as_bytes();
        Line::plain(&text[..text.len().min(self.screen_cols)])
    }
}

/// The welcome banner, centered, with the usual `~` in the left margin.
fn welcome_line(cols: usize) -> Vec<u8> {
    let msg = &WELCOME.as_bytes()[..WELCOME.len().min(cols)];
    let mut padding = (cols - msg.len()) / 2;
    let mut line = Vec::with_capacity(cols);
    if padding > 0 {
        line.push(b'~');
        padding -= 1;
    }
    line.resize(line.len() + padding, b' ');
    line.extend_from_slice(msg);
    line
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Cursor;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::io;
    use std::time::Duration;

    /// Replays a fixed list of keys, then reports EOF.
    struct Keys(VecDeque<KeyEvent>);

    impl KeySource for Keys {
        fn read_key(&mut self) -> io::Result<KeyEvent> {
            self.0
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
        }
    }

    /// Counts frames.
    #[derive(Default)]
    struct Frames(usize);

    impl RenderSink for Frames {
        fn draw(&mut self, _frame: &Frame) -> io::Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    fn editor(text: &str, keys: Vec<KeyEvent>) -> Editor<Keys, Frames> {
        Editor::new(
            Document::from_bytes(text.as_bytes()),
            Size { cols: 40, rows: 8 },
            Keys(keys.into()),
            Frames::default(),
            EditorOptions {
                quit_times: 3,
                message_timeout: Duration::from_secs(3600),
            },
        )
    }

    fn chars(s: &str) -> Vec<KeyEvent> {
        s.bytes().map(|b| KeyEvent::new(KeyCode::Char(b))).collect()
    }

    fn text_of(line: &Line) -> String {
        String::from_utf8_lossy(&line.text).into_owned()
    }

    // -- Layout ---------------------------------------------------------------

    #[test]
    fn text_area_leaves_two_rows() {
        let ed = editor("", vec![]);
        assert_eq!(ed.session().view.rows, 6);
        assert_eq!(ed.compose_frame().lines.len(), 8);
    }

    #[test]
    fn welcome_on_empty_document() {
        let ed = editor("", vec![]);
        let frame = ed.compose_frame();
        let line = text_of(&frame.lines[2]);
        assert!(line.starts_with('~'));
        assert!(line.trim_start_matches(['~', ' ']).starts_with("Teditor -- version "));
        assert_eq!(text_of(&frame.lines[0]), "~");
    }

    #[test]
    fn welcome_line_centering() {
        let line = welcome_line(40);
        let pad = (40 - WELCOME.len()) / 2;
        assert_eq!(line.len(), pad + WELCOME.len());
        assert_eq!(line[0], b'~');
    }

    #[test]
    fn welcome_line_truncates_to_width() {
        assert_eq!(welcome_line(7), &WELCOME.as_bytes()[..7]);
    }

    #[test]
    fn no_welcome_once_there_is_text() {
        let ed = editor("x\n", vec![]);
        let frame = ed.compose_frame();
        assert_eq!(text_of(&frame.lines[0]), "x");
        assert!(frame.lines[1..6].iter().all(|l| text_of(l) == "~"));
    }

    #[test]
    fn status_bar_layout() {
        let ed = editor("a\nb\n", vec![]);
        let frame = ed.compose_frame();
        let bar = &frame.lines[6];
        assert!(bar.inverse);
        assert_eq!(bar.text.len(), 40);
        let s = text_of(bar);
        assert!(s.starts_with("[No Name] - 2 lines "), "{s}");
        assert!(s.ends_with("1/2"), "{s}");
    }

    #[test]
    fn status_bar_shows_modified() {
        let mut ed = editor("a\n", vec![]);
        ed.process_key(KeyEvent::new(KeyCode::Char(b'z'))).unwrap();
        let s = text_of(&ed.compose_frame().lines[6]);
        assert!(s.contains("- 1 lines (modified)"), "{s}");
    }

    #[test]
    fn message_bar_respects_timeout() {
        let mut ed = editor("", vec![]);
        ed.set_status("hi");
        assert_eq!(text_of(&ed.compose_frame().lines[7]), "hi");

        ed.options.message_timeout = Duration::ZERO;
        assert_eq!(text_of(&ed.compose_frame().lines[7]), "");
        assert_eq!(ed.status_message(), "hi");
    }

    #[test]
    fn cursor_position_is_viewport_relative() {
        let mut ed = editor("\tx\n", vec![]);
        ed.process_key(KeyEvent::new(KeyCode::Right)).unwrap();
        ed.session_mut().scroll();
        assert_eq!(ed.compose_frame().cursor, (8, 0));
    }

    // -- Keys -----------------------------------------------------------------

    #[test]
    fn typing_inserts() {
        let mut ed = editor("", vec![]);
        for key in chars("hi") {
            ed.process_key(key).unwrap();
        }
        ed.process_key(KeyEvent::new(KeyCode::Tab)).unwrap();
        assert_eq!(ed.session().doc.row(0).unwrap().chars(), b"hi\t");
    }

    #[test]
    fn unbound_ctrl_letter_inserts_control_byte() {
        let mut ed = editor("", vec![]);
        ed.process_key(KeyEvent::ctrl(b'x')).unwrap();
        ed.process_key(KeyEvent::ctrl(b'a')).unwrap();
        assert_eq!(ed.session().doc.row(0).unwrap().chars(), b"\x18\x01");
        assert_eq!(ed.session().cursor, Cursor::new(0, 2));
        assert!(ed.session().doc.is_dirty());
    }

    #[test]
    fn ctrl_l_escape_and_alt_keys_do_not_insert() {
        let mut ed = editor("", vec![]);
        ed.process_key(KeyEvent::ctrl(b'l')).unwrap();
        ed.process_key(KeyEvent::with(
            KeyCode::Char(b'a'),
            te_term::input::Modifiers::ALT,
        ))
        .unwrap();
        ed.process_key(KeyEvent::new(KeyCode::Escape)).unwrap();
        assert_eq!(ed.session().doc.numrows(), 0);
    }

    #[test]
    fn delete_removes_under_cursor() {
        let mut ed = editor("abc\n", vec![]);
        ed.process_key(KeyEvent::new(KeyCode::Delete)).unwrap();
        assert_eq!(ed.session().doc.row(0).unwrap().chars(), b"bc");
        assert_eq!(ed.session().cursor, Cursor::new(0, 0));
    }

    #[test]
    fn delete_at_row_end_joins_next() {
        let mut ed = editor("ab\ncd\n", vec![]);
        ed.process_key(KeyEvent::new(KeyCode::End)).unwrap();
        ed.process_key(KeyEvent::new(KeyCode::Delete)).unwrap();
        assert_eq!(ed.session().doc.row(0).unwrap().chars(), b"abcd");
        assert_eq!(ed.session().cursor, Cursor::new(0, 2));
    }

    // -- Quit guard -----------------------------------------------------------

    #[test]
    fn clean_document_quits_immediately() {
        let mut ed = editor("x\n", vec![]);
        assert_eq!(ed.process_key(KeyEvent::ctrl(b'q')).unwrap(), Action::Quit);
    }

    #[test]
    fn dirty_document_needs_repeated_quit() {
        let mut ed = editor("", vec![]);
        ed.process_key(KeyEvent::new(KeyCode::Char(b'x'))).unwrap();

        for left in [3, 2, 1] {
            assert_eq!(ed.process_key(KeyEvent::ctrl(b'q')).unwrap(), Action::Continue);
            assert_eq!(
                ed.status_message(),
                format!("WARNING: File has unsaved changes. Press Ctrl-Q {left} more times to quit.")
            );
        }
        assert_eq!(ed.process_key(KeyEvent::ctrl(b'q')).unwrap(), Action::Quit);
    }

    #[test]
    fn other_key_resets_quit_counter() {
        let mut ed = editor("", vec![]);
        ed.process_key(KeyEvent::new(KeyCode::Char(b'x'))).unwrap();
        ed.process_key(KeyEvent::ctrl(b'q')).unwrap();
        ed.process_key(KeyEvent::ctrl(b'q')).unwrap();
        ed.process_key(KeyEvent::new(KeyCode::Left)).unwrap();
        ed.process_key(KeyEvent::ctrl(b'q')).unwrap();
        assert!(ed.status_message().contains("Press Ctrl-Q 3 more times"));
    }

    // -- Prompt ---------------------------------------------------------------

    #[test]
    fn prompt_collects_and_edits_input() {
        let mut keys = chars("abx");
        keys.push(KeyEvent::new(KeyCode::Backspace));
        keys.push(KeyEvent::new(KeyCode::Tab));
        keys.push(KeyEvent::ctrl(b'z'));
        keys.push(KeyEvent::new(KeyCode::Enter));
        let mut ed = editor("", keys);

        let got = ed.prompt("Name: {}", &mut NoopHandler).unwrap();
        assert_eq!(got.as_deref(), Some("ab"));
        assert_eq!(ed.status_message(), "");
    }

    #[test]
    fn prompt_ignores_enter_on_empty_input() {
        let mut keys = vec![KeyEvent::new(KeyCode::Enter)];
        keys.extend(chars("q"));
        keys.push(KeyEvent::new(KeyCode::Enter));
        let mut ed = editor("", keys);
        assert_eq!(
            ed.prompt("{}", &mut NoopHandler).unwrap().as_deref(),
            Some("q")
        );
    }

    #[test]
    fn prompt_escape_returns_none() {
        let mut keys = chars("abc");
        keys.push(KeyEvent::new(KeyCode::Escape));
        let mut ed = editor("", keys);
        assert_eq!(ed.prompt("{}", &mut NoopHandler).unwrap(), None);
    }

    #[test]
    fn prompt_shows_template_while_typing() {
        struct Spy(Vec<String>);
        impl PromptHandler for Spy {
            fn on_keystroke(&mut self, _: &mut Session, input: &str, _: KeyEvent) {
                self.0.push(input.to_string());
            }
        }

        let mut keys = chars("ab");
        keys.push(KeyEvent::new(KeyCode::Escape));
        let mut ed = editor("", keys);
        let mut spy = Spy(Vec::new());
        ed.prompt("Find: {}", &mut spy).unwrap();

        assert_eq!(spy.0, vec!["a", "ab", "ab"]);
        assert_eq!(ed.sink().0, 3);
    }

    #[test]
    fn prompt_propagates_eof() {
        let mut ed = editor("", chars("ab"));
        assert!(ed.prompt("{}", &mut NoopHandler).is_err());
    }
}
