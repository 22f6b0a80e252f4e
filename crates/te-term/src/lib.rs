// SPDX-License-Identifier: MIT
//
// te-term: Terminal layer for teditor.
//
// Raw-mode termios control, VT100 escape output, and a key parser for the
// bytes a terminal sends in raw mode. The editor draws whole frames and
// reads one key at a time; this crate is everything between that and the
// tty. No TUI framework underneath, just termios and ANSI sequences.

pub mod ansi;
pub mod frame;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;
