//! # te-editor: Editor core for teditor
//!
//! - **[`row`]**: `Row`: raw line bytes plus the tab-expanded render form,
//!   and the cx ↔ rx coordinate mapping
//! - **[`document`]**: `Document`: the ordered row store, dirty counter,
//!   load and save
//! - **[`session`]**: `Session`: cursor, viewport, movement, scrolling, and
//!   the edit engine
//! - **[`search`]**: incremental search as a prompt handler
//! - **[`prompt`]**: the per-keystroke prompt handler trait
//! - **[`editor`]**: `Editor`: key dispatch, quit guard, save, and frame
//!   composition on top of `te-term`

pub mod document;
pub mod editor;
pub mod error;
pub mod options;
pub mod prompt;
pub mod row;
pub mod search;
pub mod session;

pub use document::Document;
pub use editor::{Action, Editor};
pub use error::{Error, Result};
pub use options::EditorOptions;
pub use session::Session;
