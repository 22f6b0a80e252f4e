//! Prompt handlers: per-keystroke hooks for the message-bar prompt.
//!
//! [`Editor::prompt`](crate::editor::Editor::prompt) collects a line of
//! input on the message bar. After every key, including the Enter or
//! Escape that ends the prompt, it calls the handler with the input so far.
//! That is what makes search-as-you-type work: the handler moves the
//! cursor while the user is still typing.

use te_term::input::KeyEvent;

use crate::session::Session;

/// Reacts to each keystroke typed into a prompt.
pub trait PromptHandler {
    /// Called after `key` has been applied to `input`.
    fn on_keystroke(&mut self, session: &mut Session, input: &str, key: KeyEvent);
}

/// Handler for prompts that only need the final answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl PromptHandler for NoopHandler {
    fn on_keystroke(&mut self, _session: &mut Session, _input: &str, _key: KeyEvent) {}
}
