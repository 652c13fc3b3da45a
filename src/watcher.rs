//! Watches the scanned folder and asks for a rescan when supported images
//! appear, change or disappear.
//!
//! `notify` events are collected on a background thread and coalesced: a
//! rescan is only requested once the folder has been quiet for the debounce
//! delay, so copying a batch of files triggers a single scan.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use eframe::egui::Context;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::crawler;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to the running watcher. Drop to stop.
pub struct FolderWatcher {
    folder: PathBuf,
    quit: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FolderWatcher {
    /// Starts watching `folder` recursively. The receiver yields the folder
    /// each time a rescan is due.
    pub fn start(
        folder: &Path,
        debounce: Duration,
        ctx: Context,
    ) -> std::io::Result<(Self, mpsc::Receiver<PathBuf>)> {
        let (tx, rx) = mpsc::channel();
        let quit = Arc::new(AtomicBool::new(false));
        let quit2 = quit.clone();
        let watched = folder.to_path_buf();

        let thread = thread::Builder::new()
            .name("folder-watcher".into())
            .spawn(move || {
                run_watcher(watched, debounce, tx, quit2, ctx);
            })?;

        Ok((
            FolderWatcher {
                folder: folder.to_path_buf(),
                quit,
                thread: Some(thread),
            },
            rx,
        ))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn stop(&mut self) {
        self.quit.store(true, Ordering::Release);
        if let Some(t) = self.thread.take() {
            t.join().ok();
        }
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Trailing edge debounce: due once `delay` passed since the last touch.
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    pending: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.pending = Some(now);
    }

    /// Returns true once per burst of touches.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(last) if now.duration_since(last) >= self.delay => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

/// Only content changes of files the scanner would pick up matter.
pub fn is_relevant(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| crawler::is_supported(p))
}

fn run_watcher(
    folder: PathBuf,
    debounce: Duration,
    tx: mpsc::Sender<PathBuf>,
    quit: Arc<AtomicBool>,
    ctx: Context,
) {
    let (ntx, nrx) = mpsc::channel();

    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(move |res| {
        match res {
            Ok(event) => {
                ntx.send(event).ok();
            }
            Err(e) => tracing::warn!("Watcher error -> {e}"),
        }
    }) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to create folder watcher -> {e}");
            return;
        }
    };

    if let Err(e) = watcher.watch(&folder, RecursiveMode::Recursive) {
        tracing::error!("Failed to watch {} -> {e}", folder.display());
        return;
    }
    tracing::info!("Watching {}", folder.display());

    let mut debounce = Debounce::new(debounce);

    while !quit.load(Ordering::Acquire) {
        match nrx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if is_relevant(&event) {
                    tracing::debug!("Change in {:?}", event.paths);
                    debounce.touch(Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if debounce.fire(Instant::now()) {
            if tx.send(folder.clone()).is_err() {
                break;
            }
            ctx.request_repaint();
        }
    }

    tracing::info!("Stopped watching {}", folder.display());
}
