//! File watcher: scans on startup, then rescans whenever the file changes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use reviewtag::{Config, Error, diagnostics};

use crate::commands;

/// Debounce delay between filesystem events and rescan.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that signals changes to `target` on the channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    target: PathBuf,
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, Error> {
    let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
            && event.paths.iter().any(|p| return p.file_name() == target.file_name())
        {
            let _ = tx.send(());
        }
    })?;
    return Ok(watcher);
}

/// Entry point for the watch command.
///
/// Runs an initial scan, then watches the file's directory and rescans on
/// changes. A scan that repairs markers saves the file, which triggers one
/// more (clean) rescan.
///
/// # Errors
///
/// Returns errors from config loading or watcher setup.
pub fn run(file: &str, format: &str) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let path = PathBuf::from(file);

    eprintln!("watch: initial scan");
    let mut last_code = run_scan(&path, &config, format);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => root,
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(path.clone(), tx)?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", path.display());

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, rescanning...");
        last_code = run_scan(&path, &config, format);
    }

    return Ok(last_code);
}

/// Scan once and print the result. Returns the exit code from scan.
fn run_scan(path: &Path, config: &Config, format: &str) -> ExitCode {
    return match commands::scan_path(path, config, format) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2_u8)
        },
    };
}
