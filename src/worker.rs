use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use eframe::egui::{Context, Id};
use eframe::epaint::ColorImage;

use crate::inspect;
use crate::report::{ImageReport, ScanFailure};
use crate::thumbnail;
use crate::WORKER_MESSAGE_MEMORY_KEY;

#[derive(Debug)]
pub enum Job {
    Scan {
        folder: PathBuf,
        generation: u64,
        /// Longest thumbnail side, `None` skips thumbnails.
        thumbnails: Option<u32>,
    },
}

/// Everything the worker reports back, tagged with the scan it belongs to
/// so the UI can drop results of a scan it already replaced.
pub enum ScanEvent {
    Started {
        generation: u64,
        folder: PathBuf,
    },
    Report {
        generation: u64,
        report: ImageReport,
    },
    Failed {
        generation: u64,
        failure: ScanFailure,
    },
    Thumbnail {
        generation: u64,
        path: PathBuf,
        image: ColorImage,
    },
    Finished {
        generation: u64,
        elapsed: Duration,
        timing: String,
    },
}

impl ScanEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ScanEvent::Started { generation, .. }
            | ScanEvent::Report { generation, .. }
            | ScanEvent::Failed { generation, .. }
            | ScanEvent::Thumbnail { generation, .. }
            | ScanEvent::Finished { generation, .. } => *generation,
        }
    }
}

pub struct Worker {
    job_tx: Sender<Job>,
    event_rx: Receiver<ScanEvent>,
    latest_generation: Arc<AtomicU64>,
}

impl Worker {
    pub fn new(ctx: Context) -> Self {
        let (job_tx, job_rx) = channel();
        let (event_tx, event_rx) = channel();
        let latest_generation = Arc::new(AtomicU64::new(0));

        let worker_latest = latest_generation.clone();
        thread::spawn(move || {
            worker_loop(ctx, job_rx, event_tx, worker_latest);
        });

        Self {
            job_tx,
            event_rx,
            latest_generation,
        }
    }

    /// Queues a scan of `folder` and returns its generation. Any scan still
    /// running stops at its next file.
    pub fn scan(&self, folder: PathBuf, thumbnails: Option<u32>) -> u64 {
        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.send_job(Job::Scan {
            folder,
            generation,
            thumbnails,
        });
        generation
    }

    pub fn send_job(&self, job: Job) {
        if let Err(e) = self.job_tx.send(job) {
            tracing::error!("Failed to send job to worker -> {e}");
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.latest_generation.load(Ordering::SeqCst)
    }

    /// Drains pending events that belong to the current scan.
    pub fn events(&self) -> Vec<ScanEvent> {
        let current = self.current_generation();
        self.event_rx
            .try_iter()
            .filter(|event| event.generation() == current)
            .collect()
    }
}

fn worker_loop(
    ctx: Context,
    job_rx: Receiver<Job>,
    event_tx: Sender<ScanEvent>,
    latest_generation: Arc<AtomicU64>,
) {
    let send = |event: ScanEvent| -> ControlFlow<()> {
        match event_tx.send(event) {
            Ok(_) => {
                ctx.request_repaint();
                ControlFlow::Continue(())
            }
            Err(e) => {
                tracing::error!("Worker lost its receiver -> {e}");
                ControlFlow::Break(())
            }
        }
    };

    while let Ok(job) = job_rx.recv() {
        match job {
            Job::Scan {
                folder,
                generation,
                thumbnails,
            } => {
                if latest_generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("Skipping stale scan of {}", folder.display());
                    continue;
                }

                worker_set_msg(&ctx, &format!("Scanning {}", folder.display()));
                if send(ScanEvent::Started {
                    generation,
                    folder: folder.clone(),
                })
                .is_break()
                {
                    return;
                }

                let summary = inspect::scan_folder_with(&folder, |result| {
                    let flow = match result {
                        Ok(report) => {
                            let flow = send(ScanEvent::Report {
                                generation,
                                report: report.clone(),
                            });
                            match thumbnails {
                                Some(max_side) if flow.is_continue() => {
                                    send_thumbnail(&send, generation, &report.path, max_side)
                                }
                                _ => flow,
                            }
                        }
                        Err(e) => send(ScanEvent::Failed {
                            generation,
                            failure: ScanFailure {
                                path: e.path().clone(),
                                reason: e.to_string(),
                            },
                        }),
                    };

                    if latest_generation.load(Ordering::SeqCst) != generation {
                        return ControlFlow::Break(());
                    }
                    flow
                });

                let timing = summary.timing_line();
                worker_set_msg(&ctx, &timing);
                if send(ScanEvent::Finished {
                    generation,
                    elapsed: summary.elapsed,
                    timing,
                })
                .is_break()
                {
                    return;
                }
            }
        }
    }
}

fn send_thumbnail(
    send: &impl Fn(ScanEvent) -> ControlFlow<()>,
    generation: u64,
    path: &std::path::Path,
    max_side: u32,
) -> ControlFlow<()> {
    match thumbnail::make_thumbnail(path, max_side) {
        Ok(image) => send(ScanEvent::Thumbnail {
            generation,
            path: path.to_path_buf(),
            image,
        }),
        Err(e) => {
            tracing::debug!("No thumbnail for {} -> {e}", path.display());
            ControlFlow::Continue(())
        }
    }
}

fn worker_set_msg(ctx: &Context, msg: &str) {
    ctx.memory_mut(|mem| {
        let worker_msgs = mem
            .data
            .get_temp_mut_or_default::<Vec<Arc<String>>>(Id::new(WORKER_MESSAGE_MEMORY_KEY));

        worker_msgs.push(Arc::new(msg.to_string()));
    });
}

/// Takes the messages posted by the worker since the last call.
pub fn take_worker_messages(ctx: &Context) -> Vec<Arc<String>> {
    ctx.memory_mut(|mem| {
        mem.data
            .get_temp_mut_or_default::<Vec<Arc<String>>>(Id::new(WORKER_MESSAGE_MEMORY_KEY))
            .drain(..)
            .collect()
    })
}
