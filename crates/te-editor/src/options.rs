//! Editor options.
//!
//! | Option            | Default | Meaning                                        |
//! |-------------------|---------|------------------------------------------------|
//! | `quit_times`      | 3       | Extra Ctrl-Q presses needed to drop changes    |
//! | `message_timeout` | 5 s     | How long a status message stays on screen      |
//!
//! The tab stop is fixed at [`TAB_STOP`](crate::row::TAB_STOP).

use std::time::Duration;

pub const DEFAULT_QUIT_TIMES: u32 = 3;
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for an [`Editor`](crate::editor::Editor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    /// How many times Ctrl-Q is refused while there are unsaved changes.
    pub quit_times: u32,
    /// Lifetime of a status message.
    pub message_timeout: Duration,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            quit_times: DEFAULT_QUIT_TIMES,
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
        }
    }
}
