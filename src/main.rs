// SPDX-License-Identifier: MIT
//
// teditor: a small terminal text editor.
//
// This binary wires the two crates together:
//
//   te-term   → raw mode, window size, key decoding, frame output
//   te-editor → rows, cursor, viewport, edits, search, save
//
// Startup order matters: the document is loaded before the terminal goes
// raw, so a bad path is reported on a sane terminal. Once raw mode is on,
// every exit path (quit, fatal error, panic) clears the screen and
// restores the original termios before anything is printed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use te_editor::editor::HELP_MESSAGE;
use te_editor::options::{DEFAULT_MESSAGE_TIMEOUT, DEFAULT_QUIT_TIMES};
use te_editor::{Document, Editor, EditorOptions};
use te_term::reader::StdinKeys;
use te_term::terminal::Terminal;

/// Env var holding the log filter directives.
const LOG_ENV: &str = "TEDITOR_LOG";

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "teditor", version, about = "A small terminal text editor")]
struct Args {
    /// File to edit. Created on first save if it does not exist.
    file: Option<PathBuf>,

    /// Write logs to this file (filter with TEDITOR_LOG, default "info").
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Extra Ctrl-Q presses needed to quit with unsaved changes.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_QUIT_TIMES)]
    quit_times: u32,

    /// Seconds a status message stays visible.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_MESSAGE_TIMEOUT.as_secs())]
    message_timeout: u64,
}

impl Args {
    const fn options(&self) -> EditorOptions {
        EditorOptions {
            quit_times: self.quit_times,
            message_timeout: Duration::from_secs(self.message_timeout),
        }
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Log to `path` if given. The terminal is in raw mode while the editor
/// runs, so logs never go to stdout or stderr.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("cannot install the log subscriber")
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(args: &Args) -> Result<()> {
    init_logging(args.log_file.as_deref())?;

    let doc = match &args.file {
        Some(path) => {
            Document::open(path).with_context(|| format!("cannot open {}", path.display()))?
        }
        None => Document::new(),
    };

    let mut term = Terminal::new();
    let size = match term.enter() {
        Ok(size) => size,
        Err(e) => {
            let _ = term.clear();
            return Err(e).context("cannot set up the terminal");
        }
    };
    info!(cols = size.cols, rows = size.rows, file = ?args.file, "starting");

    let mut editor = Editor::new(doc, size, StdinKeys::new(), term, args.options());
    editor.set_status(HELP_MESSAGE);

    let result = editor.run();
    let _ = editor.sink_mut().clear();
    // Dropping the editor drops the terminal, which leaves raw mode.
    drop(editor);

    result.context("editor failed")
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("teditor: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
