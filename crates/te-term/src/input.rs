// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw stdin bytes into key events. Handles what a VT100-style
// terminal sends in raw mode:
//
// - Printable bytes and Ctrl+letter combinations
// - Legacy CSI sequences (arrows, Home/End, editing keys, with optional
//   xterm modifier parameters)
// - SS3 sequences (arrows and Home/End in application cursor mode)
// - Alt+key (ESC followed by a printable byte)
//
// Bytes at or above 0x80 are delivered one at a time as `Char(byte)`. The
// editor stores rows as bytes, so a UTF-8 sequence typed by the user lands
// in the document unchanged, byte by byte.
//
// # Design
//
// The parser keeps a small internal byte buffer because escape sequences
// can span multiple `read()` calls. Feed bytes with [`Parser::advance`],
// retrieve events from the returned `Vec`. After a timeout with no new
// bytes, call [`Parser::flush`] to emit any pending lone ESC as a real
// Escape keypress.

use std::io;

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// A key with the given modifiers.
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Ctrl + a lowercase ASCII letter.
    #[must_use]
    pub const fn ctrl(letter: u8) -> Self {
        Self {
            code: KeyCode::Char(letter),
            modifiers: Modifiers::CTRL,
        }
    }

    /// True for exactly Ctrl + `letter` (no other modifiers).
    #[must_use]
    pub fn is_ctrl(&self, letter: u8) -> bool {
        self.code == KeyCode::Char(letter) && self.modifiers == Modifiers::CTRL
    }

    /// The byte this key inserts into a document, if it inserts anything.
    ///
    /// Plain characters insert themselves and Tab inserts `\t`. Anything
    /// with Ctrl or Alt held inserts nothing.
    #[must_use]
    pub fn insertable_byte(&self) -> Option<u8> {
        if self.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) {
            return None;
        }
        match self.code {
            KeyCode::Char(b) => Some(b),
            KeyCode::Tab => Some(b'\t'),
            _ => None,
        }
    }

    /// The control byte a plain `Ctrl+letter` stands for (`Ctrl-A` is
    /// `0x01`, `Ctrl-@` is `0x00`). `None` for anything else.
    #[must_use]
    pub const fn control_byte(&self) -> Option<u8> {
        if self.modifiers.bits() != Modifiers::CTRL.bits() {
            return None;
        }
        match self.code {
            KeyCode::Char(c @ (b'@' | b'a'..=b'z')) => Some(c & 0x1F),
            _ => None,
        }
    }
}

/// Identity of a key.
///
/// Named keys have dedicated variants; everything else is a raw byte in
/// [`Char`](KeyCode::Char).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A raw input byte (printable ASCII, or one byte of a UTF-8 sequence).
    Char(u8),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Matches the xterm CSI modifier encoding where `param = 1 + bitmask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

// ─── KeySource ──────────────────────────────────────────────────────────────

/// A blocking stream of key events.
///
/// The editor pulls exactly one event at a time and does all of its work
/// for that key before asking for the next one.
pub trait KeySource {
    /// Block until the next key event is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying input fails or reaches EOF.
    fn read_key(&mut self) -> io::Result<KeyEvent>;
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Terminal input parser.
///
/// Feed raw bytes via [`advance`](Parser::advance) and collect
/// [`KeyEvent`]s. The parser buffers incomplete sequences internally and
/// resumes parsing when more bytes arrive.
///
/// # Escape vs escape-sequence ambiguity
///
/// A bare `ESC` byte (0x1B) could be either a standalone Escape keypress
/// or the start of a multi-byte escape sequence. The parser holds a lone
/// ESC as pending. The caller should wait a short timeout and then call
/// [`flush`](Parser::flush) to emit it as a real Escape key event.
pub struct Parser {
    /// Accumulated raw bytes waiting to be parsed.
    buf: Vec<u8>,
}

impl Parser {
    /// Create a new parser with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(16),
        }
    }

    /// Feed raw bytes from stdin and return all events that can be parsed.
    ///
    /// Bytes that form an incomplete sequence are kept in the internal
    /// buffer and will be combined with future calls.
    pub fn advance(&mut self, data: &[u8]) -> Vec<KeyEvent> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match try_parse(&self.buf[pos..]) {
                Parsed::Event(event, consumed) => {
                    events.push(event);
                    pos += consumed;
                }
                Parsed::Incomplete => break,
                Parsed::Skip(n) => pos += n,
            }
        }

        if pos > 0 {
            self.buf.drain(..pos);
        }

        events
    }

    /// Are there unconsumed bytes that might complete with more data?
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Flush pending bytes as literal key events.
    ///
    /// Called after a read timeout to resolve the ESC ambiguity: a lone ESC
    /// becomes an Escape key and any bytes after it (the start of a sequence
    /// that never completed) are decoded on their own.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        let pending = std::mem::take(&mut self.buf);
        let mut events = Vec::new();
        for &byte in &pending {
            if byte == 0x1B {
                events.push(KeyEvent::new(KeyCode::Escape));
            } else if let Parsed::Event(event, _) = parse_single(byte) {
                events.push(event);
            }
        }
        events
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Stateless Parsing Functions ────────────────────────────────────────────
//
// All parse functions are pure: they read from the slice they are given
// and return what they found plus how many bytes to consume.

/// Result of trying to parse one event from the buffer.
enum Parsed {
    /// Successfully parsed an event, consuming `usize` bytes.
    Event(KeyEvent, usize),
    /// Sequence is incomplete; need more bytes.
    Incomplete,
    /// Unrecognized byte(s), skip `usize` bytes.
    Skip(usize),
}

/// Try to parse a single event from the front of `buf` (non-empty).
fn try_parse(buf: &[u8]) -> Parsed {
    if buf[0] == 0x1B {
        parse_escape(buf)
    } else {
        parse_single(buf[0])
    }
}

/// Decode one non-ESC byte.
fn parse_single(byte: u8) -> Parsed {
    let event = match byte {
        0x00 => KeyEvent::with(KeyCode::Char(b'@'), Modifiers::CTRL),
        0x08 | 0x7F => KeyEvent::new(KeyCode::Backspace),
        0x09 => KeyEvent::new(KeyCode::Tab),
        0x0A | 0x0D => KeyEvent::new(KeyCode::Enter),
        b @ 0x01..=0x1A => KeyEvent::ctrl(b + b'a' - 1),
        // FS, GS, RS, US (Ctrl+\ ] ^ _) have no binding.
        0x1B..=0x1F => return Parsed::Skip(1),
        b => KeyEvent::new(KeyCode::Char(b)),
    };
    Parsed::Event(event, 1)
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    debug_assert_eq!(buf[0], 0x1B);

    if buf.len() < 2 {
        return Parsed::Incomplete;
    }

    match buf[1] {
        // CSI: ESC [
        b'[' => parse_csi(buf),
        // SS3: ESC O
        b'O' => parse_ss3(buf),
        // Alt+printable character.
        b @ 0x20..=0x7E => Parsed::Event(KeyEvent::with(KeyCode::Char(b), Modifiers::ALT), 2),
        // Anything else (including a second ESC): emit standalone Escape
        // and let the following byte parse on its own.
        _ => Parsed::Event(KeyEvent::new(KeyCode::Escape), 1),
    }
}

// ── CSI (Control Sequence Introducer) ───────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[0] == 0x1B && buf[1] == b'[');

    // Scan for the final byte (0x40..=0x7E).
    // CSI parameter bytes are in 0x30..=0x3F, intermediate in 0x20..=0x2F.
    let mut end = 2;
    while end < buf.len() {
        let b = buf[end];
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            // Invalid byte in CSI sequence: abort.
            return Parsed::Skip(end + 1);
        }
        end += 1;
    }

    if end >= buf.len() {
        return Parsed::Incomplete;
    }

    let final_byte = buf[end];
    let params = parse_csi_params(&buf[2..end]);
    let consumed = end + 1;
    let modifiers = params
        .get(1)
        .map_or(Modifiers::empty(), |&p| decode_modifiers(p));

    // ── Tilde-terminated sequences (editing keys) ───────────────────
    if final_byte == b'~' {
        let code = match params.first().copied().unwrap_or(0) {
            1 | 7 => KeyCode::Home,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            _ => return Parsed::Skip(consumed),
        };
        return Parsed::Event(KeyEvent::with(code, modifiers), consumed);
    }

    // ── Letter-terminated sequences ─────────────────────────────────
    let code = match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return Parsed::Skip(consumed),
    };

    Parsed::Event(KeyEvent::with(code, modifiers), consumed)
}

// ── SS3 (Single Shift 3) ───────────────────────────────────────────────────

fn parse_ss3(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[0] == 0x1B && buf[1] == b'O');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    let code = match buf[2] {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return Parsed::Skip(3),
    };

    Parsed::Event(KeyEvent::new(code), 3)
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Parse semicolon-separated CSI parameters. Empty fields read as 0.
///
/// - `1;5` → `[1, 5]`
/// - (empty) → `[]`
fn parse_csi_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';').map(parse_u16).collect()
}

/// Parse the leading decimal digits of `buf`, saturating at `u16::MAX`.
fn parse_u16(buf: &[u8]) -> u16 {
    buf.iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u16, |val, &b| {
            val.saturating_mul(10).saturating_add(u16::from(b - b'0'))
        })
}

/// Decode an xterm modifier parameter (`1 + bitmask`).
fn decode_modifiers(param: u16) -> Modifiers {
    let mask = u8::try_from(param.saturating_sub(1) & 0xFF).unwrap_or_default();
    Modifiers::from_bits_truncate(mask)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
