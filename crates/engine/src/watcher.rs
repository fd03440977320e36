// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounced change watcher over a jobs root.
//!
//! Filesystem events are reduced to the name of the top-level job folder they
//! touch. Names collect in a pending set behind one re-armed deadline, so a
//! burst of writes yields one notification per job once the burst quiets
//! down. A single task owns the pending set, the deadline, and the OS watcher;
//! the notify callback only forwards into its channel.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Quiet period before pending changes are delivered.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Delay before re-checking a missing root or recreating a failed watcher.
pub const DEFAULT_RETRY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTiming {
    pub debounce: Duration,
    pub retry: Duration,
}

impl Default for WatchTiming {
    fn default() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, retry: DEFAULT_RETRY }
    }
}

/// Lists the job names to re-announce whenever the watcher (re)starts.
pub type JobNames = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Pending job names behind a single re-armed deadline.
#[derive(Debug)]
pub struct Debouncer {
    period: Duration,
    pending: BTreeSet<String>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(period: Duration) -> Self {
        Self { period, pending: BTreeSet::new(), deadline: None }
    }

    /// Add `name` and push the deadline out by a full period.
    pub fn mark(&mut self, name: String, now: Instant) {
        self.pending.insert(name);
        self.deadline = Some(now + self.period);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drain the pending names if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                std::mem::take(&mut self.pending).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
enum WatchEvent {
    Changed(String),
    Failed(String),
}

/// Handle to a running watcher task.
pub struct DebouncedWatcher {
    root: PathBuf,
    events: mpsc::UnboundedSender<WatchEvent>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedWatcher {
    /// Start watching `root`, delivering changed job names to `out`.
    pub fn spawn(
        root: PathBuf,
        timing: WatchTiming,
        job_names: JobNames,
        out: mpsc::UnboundedSender<String>,
    ) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_loop(
            root.clone(),
            timing,
            job_names,
            out,
            events.clone(),
            events_rx,
            cancel.clone(),
        ));
        Self { root, events, cancel, task: Mutex::new(Some(task)) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record a change to `name` as if the filesystem had reported it.
    pub fn mark_changed(&self, name: &str) {
        let _ = self.events.send(WatchEvent::Changed(name.to_string()));
    }

    #[cfg(test)]
    fn report_failure(&self, reason: &str) {
        let _ = self.events.send(WatchEvent::Failed(reason.to_string()));
    }

    /// Stop watching. Pending changes are discarded.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for DebouncedWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn watch_loop(
    root: PathBuf,
    timing: WatchTiming,
    job_names: JobNames,
    out: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedSender<WatchEvent>,
    mut events_rx: mpsc::UnboundedReceiver<WatchEvent>,
    cancel: CancellationToken,
) {
    let mut debouncer = Debouncer::new(timing.debounce);
    let mut watcher: Option<RecommendedWatcher> = None;
    let mut retry_at = Some(Instant::now());

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            Some(event) = events_rx.recv() => match event {
                WatchEvent::Changed(name) => debouncer.mark(name, Instant::now()),
                WatchEvent::Failed(reason) => {
                    // Failures reported while a restart is already pending are dropped.
                    if watcher.take().is_some() {
                        tracing::warn!(
                            root = %root.display(),
                            reason,
                            retry_secs = timing.retry.as_secs(),
                            "job watcher failed, restarting"
                        );
                        retry_at = Some(Instant::now() + timing.retry);
                    }
                }
            },
            () = sleep_until(retry_at) => {
                retry_at = None;
                match start_watcher(&root, events.clone()) {
                    Ok(started) => {
                        tracing::info!(root = %root.display(), "watching jobs root");
                        watcher = Some(started);
                        let now = Instant::now();
                        for name in job_names() {
                            debouncer.mark(name, now);
                        }
                    }
                    Err(e) => {
                        if root.is_dir() {
                            tracing::warn!(root = %root.display(), error = %e, "failed to start job watcher");
                        } else {
                            tracing::debug!(root = %root.display(), "jobs root does not exist yet");
                        }
                        retry_at = Some(Instant::now() + timing.retry);
                    }
                }
            }
            () = sleep_until(debouncer.deadline()) => {
                for name in debouncer.take_due(Instant::now()) {
                    tracing::debug!(job = %name, "job changed");
                    if out.send(name).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn start_watcher(
    root: &Path,
    events: mpsc::UnboundedSender<WatchEvent>,
) -> Result<RecommendedWatcher, notify::Error> {
    if !root.is_dir() {
        return Err(notify::Error::path_not_found().add_path(root.to_path_buf()));
    }
    let callback_root = root.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for message in classify(&callback_root, &event) {
                let _ = events.send(message);
            }
        }
        Err(e) => {
            let _ = events.send(WatchEvent::Failed(e.to_string()));
        }
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

fn classify(root: &Path, event: &Event) -> Vec<WatchEvent> {
    if event.need_rescan() {
        return vec![WatchEvent::Failed("event queue overflowed".to_string())];
    }
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }
    let mut messages = Vec::new();
    for path in &event.paths {
        if path == root {
            if matches!(event.kind, EventKind::Remove(_)) {
                messages.push(WatchEvent::Failed("jobs root was removed".to_string()));
            }
            continue;
        }
        if let Some(name) = job_name_for(root, path, &event.kind) {
            messages.push(WatchEvent::Changed(name));
        }
    }
    messages
}

/// Name of the job folder a changed path belongs to.
///
/// A change to a top-level entry itself counts only when the entry appeared,
/// disappeared, or was renamed.
pub fn job_name_for(root: &Path, path: &Path, kind: &EventKind) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?.as_os_str().to_str()?.to_string();
    let top_level = components.next().is_none();
    if top_level {
        if let EventKind::Modify(modify) = kind {
            if !matches!(modify, ModifyKind::Name(_)) {
                return None;
            }
        }
    }
    Some(first)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
