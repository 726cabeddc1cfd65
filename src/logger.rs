//! Diagnostics for the decoder.
//!
//! Every message goes to `tracing` under the `sas7bdat_reader` target, tagged
//! with the file currently being opened on this thread. Warnings and errors
//! can additionally be mirrored into a plain log file.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static MIRROR: OnceLock<Mutex<BufWriter<File>>> = OnceLock::new();

thread_local! {
    static SOURCE: RefCell<Option<String>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Warn,
    Error,
}

impl Level {
    const fn mirrored_as(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Warn => Some("warning"),
            Self::Error => Some("error"),
        }
    }
}

fn tagged(message: &str) -> String {
    SOURCE.with(|source| match source.borrow().as_deref() {
        Some(source) => format!("{source}: {message}"),
        None => message.to_owned(),
    })
}

fn emit(level: Level, message: &str) {
    let message = tagged(message);
    match level {
        Level::Debug => tracing::debug!(target: "sas7bdat_reader", "{message}"),
        Level::Warn => tracing::warn!(target: "sas7bdat_reader", "{message}"),
        Level::Error => tracing::error!(target: "sas7bdat_reader", "{message}"),
    }
    if let Some(tag) = level.mirrored_as()
        && let Some(mirror) = MIRROR.get()
        && let Ok(mut file) = mirror.lock()
    {
        // Diagnostics never fail a read.
        let _ = writeln!(file, "{tag}: {message}").and_then(|()| file.flush());
    }
}

/// Mirrors warnings and errors into `path` as well as `tracing`.
///
/// Only the first call installs a file; later calls still create their file
/// but leave the mirror unchanged.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created.
pub fn set_log_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let _ = MIRROR.set(Mutex::new(BufWriter::new(file)));
    Ok(())
}

/// Tags messages emitted on this thread with `source` until the guard drops.
pub fn set_log_prefix(source: impl Into<String>) -> LogPrefixGuard {
    let previous = SOURCE.with(|slot| slot.replace(Some(source.into())));
    LogPrefixGuard { previous }
}

/// Restores the previous source tag on drop.
#[derive(Debug)]
#[must_use = "the tag is removed as soon as the guard is dropped"]
pub struct LogPrefixGuard {
    previous: Option<String>,
}

impl Drop for LogPrefixGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        SOURCE.with(|slot| *slot.borrow_mut() = previous);
    }
}

pub fn log_debug(message: &str) {
    emit(Level::Debug, message);
}

pub fn log_warn(message: &str) {
    emit(Level::Warn, message);
}

pub fn log_error(message: &str) {
    emit(Level::Error, message);
}
