//! Regenerating the output when the input file changes

use anyhow::{bail, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether `event` is a write to (or an atomic replace of) `input`
fn touches(event: &Event, input: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event.paths.iter().any(|p| p == input)
}

/// Collapses a burst of file system events into one change
///
/// A change counts once no further event for the input has arrived for the
/// whole quiet period.
struct Debouncer {
    events: Receiver<notify::Result<Event>>,
    input: PathBuf,
    quiet: Duration,
}

impl Debouncer {
    fn wait(&self) -> Result<()> {
        let mut dirty = false;
        loop {
            let received = if dirty {
                match self.events.recv_timeout(self.quiet) {
                    Ok(received) => received,
                    Err(RecvTimeoutError::Timeout) => return Ok(()),
                    Err(RecvTimeoutError::Disconnected) => bail!("File watcher stopped"),
                }
            } else {
                self.events.recv().context("File watcher stopped")?
            };

            match received {
                Ok(event) if touches(&event, &self.input) => dirty = true,
                Ok(_) => {}
                Err(e) => log::warn!("watch error for {}: {e}", self.input.display()),
            }
        }
    }
}

/// Watches the input HTML file and blocks until it has settled after a change
pub struct InputWatcher {
    _watcher: RecommendedWatcher,
    debouncer: Debouncer,
}

impl InputWatcher {
    pub fn new(path: &Path, quiet: Duration) -> Result<Self> {
        let input = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .context("Failed to create file watcher")?;

        // The directory, not the file, so editors that save by rename are seen
        let dir = input.parent().unwrap_or(input.as_path());
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;

        Ok(Self {
            _watcher: watcher,
            debouncer: Debouncer {
                events: rx,
                input,
                quiet,
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.debouncer.input
    }

    /// Block until the input changed and then stayed quiet for a while
    pub fn wait_for_change(&self) -> Result<()> {
        self.debouncer.wait()
    }
}
