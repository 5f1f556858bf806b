//! The job tracker: per-file state machines, polling, and narration.
//!
//! Every observation about a job (upload bytes, server acceptance, poll
//! results, narration ticks) funnels through one update function,
//! [`TrackerInner::apply`], which holds the ledger lock for the duration of
//! a single synchronous mutation. The polling and narration schedulers run
//! as independent tasks and only ever communicate through that function, so
//! cosmetic narration can never corrupt authoritative status.
//!
//! Each event carries the attempt sequence of the lifecycle that produced
//! it; `apply` drops events whose sequence is stale, so a response from an
//! attempt superseded by a manual retry (or a removed job) lands nowhere.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use csift_client::{ApiClient, UploadProgressFn};
use csift_models::{CorrelationId, JobId, JobRecord, JobState, RemoteStatus, SubmitOptions};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::ledger::Ledger;
use crate::narrator::ProgressNarrator;
use crate::quota::{self, QuotaDecision};
use crate::validate::{FileCandidate, FileValidator};

/// Shown when the server reports failure without a message.
const GENERIC_PROCESSING_FAILURE: &str = "Processing failed on the server";

/// One observation about a job, applied to the ledger by [`TrackerInner::apply`].
#[derive(Debug)]
enum JobEvent {
    UploadStarted,
    UploadProgress(u8),
    Accepted(JobId),
    /// A successful non-terminal poll; carries server progress when reported
    PollTick(Option<u8>),
    Narration { phase: String, percent: u8 },
    Completed { download_url: Option<String> },
    Failed(String),
}

/// Tracks every submission from file selection to terminal state.
///
/// Cheap to clone; all clones share the same ledger.
#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    config: TrackerConfig,
    client: ApiClient,
    validator: FileValidator,
    ledger: RwLock<Ledger>,
    changed: Notify,
}

impl JobTracker {
    pub fn new(config: TrackerConfig, client: ApiClient) -> Self {
        let validator = FileValidator::new(config.validator.clone());
        Self {
            inner: Arc::new(TrackerInner {
                config,
                client,
                validator,
                ledger: RwLock::new(Ledger::new()),
                changed: Notify::new(),
            }),
        }
    }

    /// Fetch a fresh usage snapshot and decide whether submission may
    /// proceed. When the decision carries a warning, obtain explicit user
    /// confirmation before calling [`Self::submit`].
    pub async fn check_quota(&self) -> QuotaDecision {
        quota::check_quota(&self.inner.client).await
    }

    /// Validate a file, gate on quota, register it in the ledger, and start
    /// its upload/poll lifecycle.
    ///
    /// Validation happens before any network call. The quota snapshot is
    /// fetched fresh; only a confirmed exhausted quota blocks here. A
    /// near-limit warning is assumed to have been confirmed already via
    /// [`Self::check_quota`].
    pub async fn submit(
        &self,
        candidate: FileCandidate,
        options: SubmitOptions,
    ) -> TrackerResult<CorrelationId> {
        self.inner.validator.validate(&candidate)?;

        let decision = self.check_quota().await;
        if let Some(reason) = decision.block_reason() {
            return Err(TrackerError::QuotaExceeded(reason.to_string()));
        }
        if let Some(warning) = decision.warning() {
            warn!(warning = %warning, file = %candidate.file_name, "Submitting near quota limit");
        }

        let record = JobRecord::new(
            candidate.file_name,
            candidate.path,
            candidate.size_bytes,
            candidate.content_type,
            options,
        );
        let id = record.id.clone();
        let seq = record.attempt_seq;

        info!(job = %id, file = %record.file_name, bytes = record.size_bytes, "Job registered");
        self.inner.ledger_write().insert(record);
        self.inner.changed.notify_waiters();

        self.spawn_lifecycle(id.clone(), seq);
        Ok(id)
    }

    /// Reset a failed job and run it again with the same correlation id.
    ///
    /// Clears the prior attempt's error and progress, bumps the attempt
    /// sequence (so stragglers from the old attempt are discarded), and
    /// re-checks quota like any other submission.
    pub async fn resubmit(&self, id: &CorrelationId) -> TrackerResult<()> {
        {
            let ledger = self.inner.ledger_read();
            let record = ledger.get(id).ok_or_else(|| TrackerError::UnknownJob(id.clone()))?;
            if record.state != JobState::Failed {
                return Err(TrackerError::NotRetryable {
                    id: id.clone(),
                    state: record.state,
                });
            }
        }

        let decision = self.check_quota().await;
        if let Some(reason) = decision.block_reason() {
            return Err(TrackerError::QuotaExceeded(reason.to_string()));
        }

        let seq = {
            let mut ledger = self.inner.ledger_write();
            let record = ledger.get_mut(id).ok_or_else(|| TrackerError::UnknownJob(id.clone()))?;
            if !record.reset_for_retry() {
                return Err(TrackerError::NotRetryable {
                    id: id.clone(),
                    state: record.state,
                });
            }
            record.attempt_seq
        };

        info!(job = %id, attempt = seq, "Resubmitting failed job");
        self.inner.changed.notify_waiters();
        self.spawn_lifecycle(id.clone(), seq);
        Ok(())
    }

    /// Snapshot of all records in insertion order.
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.inner.ledger_read().snapshot()
    }

    /// Snapshot of one record.
    pub fn job(&self, id: &CorrelationId) -> Option<JobRecord> {
        self.inner.ledger_read().get(id).cloned()
    }

    /// Remove a job from the ledger.
    ///
    /// Its poll and narration loops notice the missing record before their
    /// next tick and stop. The server is not notified; any in-flight work
    /// there simply completes unobserved.
    pub fn remove(&self, id: &CorrelationId) -> bool {
        let removed = self.inner.ledger_write().remove(id).is_some();
        if removed {
            debug!(job = %id, "Job removed from ledger");
            self.inner.changed.notify_waiters();
        }
        removed
    }

    /// Download the artifact of a completed job and save it next to the
    /// given directory as `<prefix><original name>`.
    ///
    /// A failed download leaves the record untouched; the job stays
    /// completed and the download can be retried.
    pub async fn download_result(
        &self,
        id: &CorrelationId,
        dest_dir: &Path,
    ) -> TrackerResult<PathBuf> {
        let (job_id, file_name) = {
            let ledger = self.inner.ledger_read();
            let record = ledger.get(id).ok_or_else(|| TrackerError::UnknownJob(id.clone()))?;
            match (&record.state, &record.job_id) {
                (JobState::Completed, Some(job_id)) => (job_id.clone(), record.file_name.clone()),
                _ => return Err(TrackerError::ResultUnavailable(id.clone())),
            }
        };

        let bytes = self.inner.client.download(&job_id).await?;
        let dest = dest_dir.join(format!("{}{}", self.inner.config.download_prefix, file_name));
        tokio::fs::write(&dest, &bytes).await?;

        info!(job = %id, path = %dest.display(), bytes = bytes.len(), "Artifact saved");
        Ok(dest)
    }

    /// Wait until the job reaches a terminal state and return its final
    /// record, or `None` if it was removed from the ledger first.
    pub async fn wait_until_terminal(&self, id: &CorrelationId) -> Option<JobRecord> {
        loop {
            // Register for the next notification before inspecting the
            // record, otherwise a notification landing in between is lost.
            let mut notified = std::pin::pin!(self.inner.changed.notified());
            notified.as_mut().enable();
            match self.job(id) {
                None => return None,
                Some(record) if record.is_terminal() => return Some(record),
                Some(_) => {}
            }
            notified.await;
        }
    }

    fn spawn_lifecycle(&self, id: CorrelationId, seq: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            run_lifecycle(inner, id, seq).await;
        });
    }
}

impl TrackerInner {
    fn ledger_read(&self) -> RwLockReadGuard<'_, Ledger> {
        match self.ledger.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn ledger_write(&self) -> RwLockWriteGuard<'_, Ledger> {
        match self.ledger.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// True while the record exists, belongs to this attempt, and has not
    /// reached a terminal state. Schedulers check this before every tick.
    fn is_current(&self, id: &CorrelationId, seq: u64) -> bool {
        self.ledger_read()
            .get(id)
            .map(|r| r.attempt_seq == seq && !r.is_terminal())
            .unwrap_or(false)
    }

    /// The single JobRecord update function: one synchronous, atomic
    /// mutation per event, stale and orphaned events discarded.
    fn apply(&self, id: &CorrelationId, seq: u64, event: JobEvent) {
        let applied = {
            let mut ledger = self.ledger_write();
            let Some(record) = ledger.get_mut(id) else {
                debug!(job = %id, ?event, "Dropping event for removed job");
                return;
            };
            if record.attempt_seq != seq {
                debug!(job = %id, seq, current = record.attempt_seq, "Dropping stale event");
                return;
            }

            match event {
                JobEvent::UploadStarted => record.begin_upload(),
                JobEvent::UploadProgress(percent) => record.set_upload_progress(percent),
                JobEvent::Accepted(job_id) => record.begin_processing(job_id),
                JobEvent::PollTick(server_percent) => {
                    // Refresh even when nothing changed so the record never
                    // looks stalled between phase advances.
                    let phase = record
                        .phase
                        .clone()
                        .unwrap_or_else(|| "Processing".to_string());
                    let percent = server_percent.unwrap_or(record.display_percent);
                    record.set_narration(phase, percent)
                }
                JobEvent::Narration { phase, percent } => record.set_narration(phase, percent),
                JobEvent::Completed { download_url } => record.complete(download_url),
                JobEvent::Failed(message) => record.fail(message),
            }
        };

        if applied {
            self.changed.notify_waiters();
        }
    }
}

fn upload_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent.saturating_mul(100) / total).min(100) as u8
}

/// One attempt's full lifecycle: upload, then poll to a terminal state.
async fn run_lifecycle(inner: Arc<TrackerInner>, id: CorrelationId, seq: u64) {
    let submission = inner.ledger_read().get(&id).filter(|r| r.attempt_seq == seq).map(|r| {
        (
            r.file_path.clone(),
            r.file_name.clone(),
            r.content_type.clone(),
            r.options.clone(),
        )
    });
    let Some((path, file_name, content_type, options)) = submission else {
        return;
    };

    inner.apply(&id, seq, JobEvent::UploadStarted);

    let progress: UploadProgressFn = {
        let inner = Arc::clone(&inner);
        let id = id.clone();
        Arc::new(move |sent, total| {
            inner.apply(&id, seq, JobEvent::UploadProgress(upload_percent(sent, total)));
        })
    };

    let job_id = match inner
        .client
        .submit(&path, &file_name, content_type.as_deref(), &options, Some(progress))
        .await
    {
        Ok(job_id) => job_id,
        Err(e) => {
            warn!(job = %id, error = %e, "Upload failed");
            inner.apply(&id, seq, JobEvent::Failed(e.to_string()));
            return;
        }
    };

    info!(job = %id, server_job = %job_id, "Upload accepted, processing started");
    inner.apply(&id, seq, JobEvent::Accepted(job_id.clone()));

    {
        let inner = Arc::clone(&inner);
        let id = id.clone();
        tokio::spawn(async move {
            run_narrator(inner, id, seq).await;
        });
    }

    run_poll_loop(inner, id, seq, job_id).await;
}

/// Narration scheduler: advances the cosmetic phase label and percentage on
/// its own clock, independent of polling.
async fn run_narrator(inner: Arc<TrackerInner>, id: CorrelationId, seq: u64) {
    let narrator = ProgressNarrator::new(inner.config.expected_processing);
    let started = Instant::now();

    loop {
        tokio::time::sleep(inner.config.narrate_interval).await;
        if !inner.is_current(&id, seq) {
            return;
        }
        let narration = narrator.narrate(started.elapsed());
        inner.apply(
            &id,
            seq,
            JobEvent::Narration {
                phase: narration.phase,
                percent: narration.percent,
            },
        );
    }
}

/// Polling scheduler: the only source of authoritative status while the
/// server processes.
async fn run_poll_loop(inner: Arc<TrackerInner>, id: CorrelationId, seq: u64, job_id: JobId) {
    let mut attempts: u32 = 0;

    loop {
        // Removal from the ledger (or a manual retry bumping the sequence)
        // ends this loop without touching the record.
        if !inner.is_current(&id, seq) {
            return;
        }

        if attempts >= inner.config.max_poll_attempts {
            inner.apply(
                &id,
                seq,
                JobEvent::Failed(format!(
                    "Timed out after {attempts} status checks without a result; the job may still finish on the server"
                )),
            );
            return;
        }
        attempts += 1;

        match inner.client.job_status(&job_id).await {
            Ok(status) => match status.status {
                RemoteStatus::Completed => {
                    inner.apply(
                        &id,
                        seq,
                        JobEvent::Completed {
                            download_url: status.download_url,
                        },
                    );
                    return;
                }
                RemoteStatus::Failed => {
                    let message = status
                        .error_message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_PROCESSING_FAILURE.to_string());
                    inner.apply(&id, seq, JobEvent::Failed(message));
                    return;
                }
                RemoteStatus::Pending | RemoteStatus::Processing | RemoteStatus::Unknown => {
                    let server_percent = status.progress.map(|p| p.clamp(0.0, 100.0) as u8);
                    inner.apply(&id, seq, JobEvent::PollTick(server_percent));
                    tokio::time::sleep(inner.config.poll_interval).await;
                }
            },
            Err(e) => {
                // Transient fetch failures never fail the job on their own;
                // the attempt ceiling is the backstop.
                warn!(job = %id, attempt = attempts, error = %e, "Status poll failed, retrying");
                tokio::time::sleep(inner.config.poll_retry_interval).await;
            }
        }
    }
}
