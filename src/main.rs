//! marksync - Keep a markdown file and a rich-editor session in sync.
//!
//! # Usage
//!
//! ```bash
//! marksync notes.md
//! marksync --watch --show-preamble notes.md
//! echo "- new item" | marksync notes.md
//! ```

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use marksync::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use marksync::editor::EditorBuffer;
use marksync::host::{FileBuffer, HostBuffer, HostController};
use marksync::perf;
use marksync::sync::{EditorSession, SessionState};

/// Longest the loop sleeps before polling the file watcher again.
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const WATCH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Bind a markdown file to a headless editor session
#[derive(Parser, Debug)]
#[command(name = "marksync", version, about, long_about = None)]
struct Cli {
    /// Markdown file to edit
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Watch the file and pull in writes from other processes
    #[arg(short, long)]
    watch: bool,

    /// Print the rendered preamble after each applied update
    #[arg(long)]
    show_preamble: bool,

    /// Editor edit coalescing window in milliseconds
    #[arg(long, value_name = "MS")]
    outbound_ms: Option<u64>,

    /// Host update coalescing window in milliseconds
    #[arg(long, value_name = "MS")]
    inbound_ms: Option<u64>,

    /// Typing idle time before external updates apply, in milliseconds
    #[arg(long, value_name = "MS")]
    idle_ms: Option<u64>,

    /// Enable timing output on stderr
    #[arg(long)]
    perf: bool,

    /// Write detailed sync debug events to a file
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

/// Forward stdin lines on a channel; the channel closes at EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_preamble(session: &EditorSession<EditorBuffer>) {
    let tree = session.preamble_display();
    if tree.is_empty() {
        println!("(no preamble)");
        return;
    }
    for line in tree.to_lines() {
        println!("{line}");
    }
}

fn run(file: PathBuf, effective: &ConfigFlags) -> Result<()> {
    let mut buffer = FileBuffer::open(&file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    if effective.watch {
        buffer = buffer
            .with_watch(WATCH_DEBOUNCE)
            .with_context(|| format!("Failed to watch {}", file.display()))?;
    }

    let mut host = HostController::new(buffer);
    let (view, surface) = host.open_view();
    let mut session: EditorSession<EditorBuffer> =
        EditorSession::open(surface, effective.timings());
    tracing::info!(%view, file = %file.display(), "session started");

    let input = spawn_stdin_reader();
    let mut input_open = true;
    let mut seen_applies = 0;

    loop {
        let now = Instant::now();
        host.tick();
        session.tick(now);

        let applies = session.stats().applies;
        if effective.show_preamble && applies != seen_applies {
            print_preamble(&session);
        }
        seen_applies = applies;

        if !input_open && !effective.watch && session.next_deadline().is_none() {
            break;
        }

        let wake = [session.next_deadline(), host.buffer().next_deadline()]
            .into_iter()
            .flatten()
            .min()
            .map_or(POLL_INTERVAL, |deadline| {
                deadline.saturating_duration_since(now).min(POLL_INTERVAL)
            });

        // Hold typed lines until the first update has loaded the editor.
        if !input_open || session.state() != SessionState::Ready {
            std::thread::sleep(wake);
            continue;
        }
        match input.recv_timeout(wake) {
            Ok(line) => {
                session.edit(Instant::now(), |editor| {
                    editor.move_to_end();
                    if !editor.text().is_empty() && !editor.text().ends_with('\n') {
                        editor.split_line();
                    }
                    editor.insert_str(&line);
                    editor.split_line();
                });
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("stdin closed");
                input_open = false;
            }
        }
    }

    session.dispose();
    host.tick();
    let stats = session.stats();
    tracing::info!(?stats, version = host.buffer().version(), "session finished");
    if perf::is_enabled() {
        eprintln!("[perf] {stats:?}");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let debug_log_path = effective
        .debug_log
        .clone()
        .or_else(|| std::env::var_os("MARKSYNC_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize debug log {}: {}",
            debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    run(cli.file, &effective).context("Sync error")
}
