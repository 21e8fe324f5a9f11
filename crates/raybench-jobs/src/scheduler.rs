//! Background job scheduler.
//!
//! Two independent FIFO queues (sim, ris) with per-queue concurrency caps.
//! Submission resolves and snapshots the config, allocates the run
//! directory and returns immediately; dispatcher threads spawn worker
//! subprocesses, capture their output into the progress journal, and record
//! terminal status on reap. The job table lives only in memory; run
//! artifacts are the durable record.

use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use raybench_artifacts::snapshot_config;
use raybench_core::errors::{ErrorInfo, RbError};
use raybench_core::provenance::utc_timestamp_millis;
use raybench_core::serde::to_canonical_json_pretty;
use raybench_ris::RisConfig;
use raybench_store::layout::JOB_JSON;
use raybench_store::{ProgressJournal, ProgressRecord, RunKind, RunStore};

use crate::progress_line::parse_progress_line;
use crate::simcfg::{SimConfig, SimProfile};
use crate::vram::{apply_vram_guard, VramGuardReport, VramProbe};
use crate::worker::{RisAction, RisMode};

const ALLOCATE_RETRIES: usize = 3;

/// Scheduler lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker slot.
    Queued,
    /// Worker subprocess is alive.
    Running,
    /// Worker exited zero.
    Completed,
    /// Worker failed, or the job failed before dispatch.
    Failed,
}

/// One scheduled unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Fresh UUID assigned at submission.
    pub job_id: String,
    /// Run the job owns.
    pub run_id: String,
    /// Job family.
    pub kind: RunKind,
    /// RIS action (`run` for sim jobs).
    pub action: RisAction,
    /// RIS pattern-family mode, absent for sim jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RisMode>,
    /// Submission timestamp; monotone within a queue.
    pub created_at: String,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Failure reason once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// VRAM guard outcome (sim jobs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram_guard: Option<VramGuardReport>,
    /// Submission payload as received, for post-mortems.
    pub payload_snapshot: Value,
    /// Reference file for validate actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,
}

/// Submission receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTicket {
    /// Job identifier.
    pub job_id: String,
    /// Run identifier.
    pub run_id: String,
}

/// Sim job submission.
#[derive(Debug, Clone)]
pub struct SimJobRequest {
    /// Profile applied on top of the base config.
    pub profile: SimProfile,
    /// Base configuration (pre profile, pre guard).
    pub config: SimConfig,
    /// Raw submission payload, snapshotted onto the job.
    pub payload_snapshot: Value,
}

/// RIS job submission.
#[derive(Debug, Clone)]
pub struct RisJobRequest {
    /// Run or validate.
    pub action: RisAction,
    /// Pattern or link mode.
    pub mode: RisMode,
    /// Accepted config.
    pub config: RisConfig,
    /// Reference file for validate actions.
    pub reference: Option<PathBuf>,
    /// Raw submission payload, snapshotted onto the job.
    pub payload_snapshot: Value,
}

/// Worker process invocation template.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Arguments placed before the per-job flags (e.g. `["worker"]`).
    pub args: Vec<String>,
}

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Concurrent sim workers (default 1; the jobs are heavy).
    pub sim_concurrency: usize,
    /// Concurrent RIS workers (default 1).
    pub ris_concurrency: usize,
    /// Worker invocation template.
    pub worker: WorkerCommand,
}

impl SchedulerOptions {
    /// Options with default caps for the given worker command.
    pub fn new(worker: WorkerCommand) -> Self {
        Self {
            sim_concurrency: 1,
            ris_concurrency: 1,
            worker,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<String>,
    running: usize,
}

#[derive(Debug, Default)]
struct State {
    jobs: BTreeMap<String, JobRecord>,
    sim: QueueState,
    ris: QueueState,
    shutdown: bool,
}

impl State {
    fn lane_mut(&mut self, kind: RunKind) -> &mut QueueState {
        match kind {
            RunKind::Sim => &mut self.sim,
            RunKind::Ris => &mut self.ris,
        }
    }
}

struct Shared {
    store: Arc<RunStore>,
    journal: Arc<ProgressJournal>,
    options: SchedulerOptions,
    state: Mutex<State>,
    wake: Condvar,
}

/// The scheduler. Dropping it stops dispatching new jobs; in-flight workers
/// run to completion.
pub struct JobScheduler {
    shared: Arc<Shared>,
    dispatchers: Mutex<Vec<thread::JoinHandle<()>>>,
    vram: Box<dyn VramProbe>,
}

impl JobScheduler {
    /// Creates a scheduler and starts one dispatcher per queue.
    pub fn new(
        store: Arc<RunStore>,
        journal: Arc<ProgressJournal>,
        options: SchedulerOptions,
        vram: Box<dyn VramProbe>,
    ) -> Self {
        let shared = Arc::new(Shared {
            store,
            journal,
            options,
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        });
        let mut dispatchers = Vec::new();
        for kind in [RunKind::Sim, RunKind::Ris] {
            let shared = Arc::clone(&shared);
            dispatchers.push(thread::spawn(move || dispatcher_loop(shared, kind)));
        }
        Self {
            shared,
            dispatchers: Mutex::new(dispatchers),
            vram,
        }
    }

    /// Enqueues a sim job. Config errors surface synchronously and create no
    /// run; failures after the run exists mark the job failed and still
    /// return the ticket.
    pub fn submit_sim(&self, request: SimJobRequest) -> Result<JobTicket, RbError> {
        let mut config = request.config;
        config.apply_profile(request.profile);
        config.validate()?;

        let run = self.allocate_with_retry(RunKind::Sim)?;
        let guard = apply_vram_guard(&mut config, self.vram.as_ref());
        if guard.applied {
            tracing::info!(run_id = %run.run_id, vram_mb = ?guard.vram_mb, "vram guard downgraded job");
        }

        let record = JobRecord {
            job_id: Uuid::new_v4().to_string(),
            run_id: run.run_id.clone(),
            kind: RunKind::Sim,
            action: RisAction::Run,
            mode: None,
            created_at: utc_timestamp_millis(),
            status: JobStatus::Queued,
            error: None,
            vram_guard: Some(guard),
            payload_snapshot: request.payload_snapshot,
            reference: None,
        };
        self.finish_submission(record, &config)
    }

    /// Enqueues a RIS job.
    pub fn submit_ris(&self, request: RisJobRequest) -> Result<JobTicket, RbError> {
        request.config.validate()?;
        if request.action == RisAction::Validate && request.reference.is_none() {
            return Err(RbError::Config(ErrorInfo::new(
                "ris_reference_missing",
                "validate action requires a reference file",
            )));
        }

        let run = self.allocate_with_retry(RunKind::Ris)?;
        let record = JobRecord {
            job_id: Uuid::new_v4().to_string(),
            run_id: run.run_id.clone(),
            kind: RunKind::Ris,
            action: request.action,
            mode: Some(request.mode),
            created_at: utc_timestamp_millis(),
            status: JobStatus::Queued,
            error: None,
            vram_guard: None,
            payload_snapshot: request.payload_snapshot,
            reference: request.reference,
        };
        self.finish_submission(record, &request.config)
    }

    /// Jobs in submission order, optionally filtered by family.
    pub fn jobs(&self, kind: Option<RunKind>) -> Vec<JobRecord> {
        let state = self.shared.state.lock().expect("scheduler state poisoned");
        let mut jobs: Vec<JobRecord> = state
            .jobs
            .values()
            .filter(|job| kind.map_or(true, |k| job.kind == k))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| (&a.created_at, &a.run_id).cmp(&(&b.created_at, &b.run_id)));
        jobs
    }

    /// Looks up one job.
    pub fn job(&self, job_id: &str) -> Option<JobRecord> {
        let state = self.shared.state.lock().expect("scheduler state poisoned");
        state.jobs.get(job_id).cloned()
    }

    /// Discards a job that is still queued. Running jobs are not cancellable.
    pub fn discard_queued(&self, job_id: &str) -> Result<(), RbError> {
        let run_id = {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            let Some(job) = state.jobs.get(job_id).cloned() else {
                return Err(RbError::NotFound(
                    ErrorInfo::new("job_missing", "unknown job id").with_context("job_id", job_id),
                ));
            };
            if job.status != JobStatus::Queued {
                return Err(RbError::Worker(
                    ErrorInfo::new("job_not_queued", "only queued jobs can be discarded")
                        .with_context("job_id", job_id),
                ));
            }
            let lane = state.lane_mut(job.kind);
            lane.queue.retain(|queued| queued != job_id);
            let record = state.jobs.get_mut(job_id).expect("job vanished");
            record.status = JobStatus::Failed;
            record.error = Some("discarded before dispatch".to_string());
            record.run_id.clone()
        };
        let _ = self
            .shared
            .journal
            .update(&run_id, &ProgressRecord::failed("discarded before dispatch"));
        Ok(())
    }

    /// Blocks until both queues are empty and no worker is running, or the
    /// timeout elapses. Returns true when idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock().expect("scheduler state poisoned");
        loop {
            let idle = state.sim.queue.is_empty()
                && state.ris.queue.is_empty()
                && state.sim.running == 0
                && state.ris.running == 0;
            if idle {
                return true;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            let (next, _timed_out) = self
                .shared
                .wake
                .wait_timeout(state, remaining)
                .expect("scheduler state poisoned");
            state = next;
        }
    }

    /// Stops dispatching and joins the dispatcher threads. In-flight workers
    /// run to completion first.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            state.shutdown = true;
        }
        self.shared.wake.notify_all();
        let mut dispatchers = self.dispatchers.lock().expect("dispatcher handles poisoned");
        for handle in dispatchers.drain(..) {
            let _ = handle.join();
        }
    }

    fn allocate_with_retry(&self, kind: RunKind) -> Result<raybench_store::Run, RbError> {
        let mut last = None;
        for _ in 0..ALLOCATE_RETRIES {
            match self.shared.store.allocate(kind) {
                Ok(run) => return Ok(run),
                Err(err @ RbError::Collision(_)) => last = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last.unwrap_or_else(|| {
            RbError::Collision(ErrorInfo::new("run_allocate", "run id allocation failed"))
        }))
    }

    fn finish_submission<T: serde::Serialize>(
        &self,
        mut record: JobRecord,
        config: &T,
    ) -> Result<JobTicket, RbError> {
        let ticket = JobTicket {
            job_id: record.job_id.clone(),
            run_id: record.run_id.clone(),
        };

        // Effective config and job record must be on disk before dispatch;
        // if that fails the job is failed and no worker is spawned.
        let persisted = snapshot_config(&self.shared.store, &record.run_id, config)
            .and_then(|_| self.write_job_record(&record))
            .and_then(|_| {
                self.shared
                    .journal
                    .update(&record.run_id, &ProgressRecord::queued())
                    .map(|_| ())
            });
        if let Err(err) = persisted {
            tracing::error!(run_id = %record.run_id, error = %err, "submission persistence failed");
            record.status = JobStatus::Failed;
            record.error = Some(err.to_string());
            let _ = self
                .shared
                .journal
                .update(&record.run_id, &ProgressRecord::failed(err.to_string()));
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            state.jobs.insert(record.job_id.clone(), record);
            return Ok(ticket);
        }

        let mut state = self.shared.state.lock().expect("scheduler state poisoned");
        let kind = record.kind;
        state.jobs.insert(record.job_id.clone(), record);
        state.lane_mut(kind).queue.push_back(ticket.job_id.clone());
        drop(state);
        self.shared.wake.notify_all();
        Ok(ticket)
    }

    fn write_job_record(&self, record: &JobRecord) -> Result<(), RbError> {
        let bytes = to_canonical_json_pretty(record)?;
        self.shared.store.write_atomic(&record.run_id, JOB_JSON, &bytes)
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatcher_loop(shared: Arc<Shared>, kind: RunKind) {
    let cap = match kind {
        RunKind::Sim => shared.options.sim_concurrency.max(1),
        RunKind::Ris => shared.options.ris_concurrency.max(1),
    };
    let mut supervisors: Vec<thread::JoinHandle<()>> = Vec::new();
    loop {
        let job_id = {
            let mut state = shared.state.lock().expect("scheduler state poisoned");
            loop {
                if state.shutdown {
                    drop(state);
                    for handle in supervisors.drain(..) {
                        let _ = handle.join();
                    }
                    return;
                }
                let lane = state.lane_mut(kind);
                if lane.running < cap && !lane.queue.is_empty() {
                    let job_id = lane.queue.pop_front().expect("queue emptied");
                    lane.running += 1;
                    if let Some(job) = state.jobs.get_mut(&job_id) {
                        job.status = JobStatus::Running;
                    }
                    break job_id;
                }
                state = shared.wake.wait(state).expect("scheduler state poisoned");
            }
        };
        supervisors.retain(|handle| !handle.is_finished());
        let shared_for_job = Arc::clone(&shared);
        supervisors.push(thread::spawn(move || supervise(shared_for_job, kind, job_id)));
    }
}

fn supervise(shared: Arc<Shared>, kind: RunKind, job_id: String) {
    let job = {
        let state = shared.state.lock().expect("scheduler state poisoned");
        state.jobs.get(&job_id).cloned()
    };
    let Some(job) = job else {
        finalize(&shared, kind, &job_id, JobStatus::Failed, Some("job record vanished".into()));
        return;
    };

    let _ = shared
        .journal
        .update(&job.run_id, &ProgressRecord::running(0, "Starting worker", 0));

    let outcome = run_worker_process(&shared, &job);
    match outcome {
        Ok(()) => finalize(&shared, kind, &job_id, JobStatus::Completed, None),
        Err(message) => finalize(&shared, kind, &job_id, JobStatus::Failed, Some(message)),
    }
}

fn run_worker_process(shared: &Shared, job: &JobRecord) -> Result<(), String> {
    let run_dir = shared.store.root().join(&job.run_id);
    let mut command = Command::new(&shared.options.worker.program);
    command
        .args(&shared.options.worker.args)
        .arg("--run-dir")
        .arg(&run_dir)
        .arg("--kind")
        .arg(match job.kind {
            RunKind::Sim => "sim",
            RunKind::Ris => "ris",
        })
        .arg("--action")
        .arg(match job.action {
            RisAction::Run => "run",
            RisAction::Validate => "validate",
        });
    if let Some(mode) = job.mode {
        command.arg("--mode").arg(match mode {
            RisMode::Pattern => "pattern",
            RisMode::Link => "link",
        });
    }
    if let Some(reference) = &job.reference {
        command.arg("--ref").arg(reference);
    }
    command
        .current_dir(&run_dir)
        .env_clear()
        .envs(
            std::env::var_os("PATH").map(|path| (std::ffi::OsString::from("PATH"), path)),
        )
        .env("RAYBENCH_RUN_ID", &job.run_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|err| format!("worker spawn failed: {err}"))?;

    let stdout = child.stdout.take().expect("stdout piped");
    let journal = Arc::clone(&shared.journal);
    let run_id = job.run_id.clone();
    let stdout_reader = thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            match parse_progress_line(&line) {
                Some(record) => {
                    let _ = journal.update(&run_id, &record);
                }
                None => {
                    let _ = journal.append_log(&run_id, &line);
                }
            }
        }
    });

    let stderr = child.stderr.take().expect("stderr piped");
    let journal = Arc::clone(&shared.journal);
    let run_id = job.run_id.clone();
    let stderr_reader = thread::spawn(move || {
        let mut last = None;
        for line in BufReader::new(stderr).lines() {
            let Ok(line) = line else { break };
            let _ = journal.append_log(&run_id, &line);
            if !line.trim().is_empty() {
                last = Some(line);
            }
        }
        last
    });

    let status = child.wait().map_err(|err| format!("worker wait failed: {err}"))?;
    let _ = stdout_reader.join();
    let last_stderr = stderr_reader.join().unwrap_or(None);

    if status.success() {
        Ok(())
    } else {
        let code = status.code();
        let message = match (last_stderr, code) {
            (Some(line), _) => line,
            (None, Some(code)) => format!("exit {code}"),
            (None, None) => "terminated by signal".to_string(),
        };
        Err(message)
    }
}

fn finalize(shared: &Shared, kind: RunKind, job_id: &str, status: JobStatus, error: Option<String>) {
    let run_id = {
        let mut state = shared.state.lock().expect("scheduler state poisoned");
        let lane = state.lane_mut(kind);
        lane.running = lane.running.saturating_sub(1);
        match state.jobs.get_mut(job_id) {
            Some(job) => {
                job.status = status;
                job.error = error.clone();
                Some(job.run_id.clone())
            }
            None => None,
        }
    };
    shared.wake.notify_all();

    if let Some(run_id) = run_id {
        // Boundary transition in case the worker never reported one; the
        // journal latches whatever terminal state arrived first.
        let record = match (status, error) {
            (JobStatus::Completed, _) => ProgressRecord::completed(0),
            (_, Some(message)) => ProgressRecord::failed(message),
            (_, None) => ProgressRecord::failed("worker failed"),
        };
        let _ = shared.journal.update(&run_id, &record);
        let job = {
            let state = shared.state.lock().expect("scheduler state poisoned");
            state.jobs.get(job_id).cloned()
        };
        if let Some(job) = job {
            if let Ok(bytes) = to_canonical_json_pretty(&job) {
                let _ = shared.store.write_atomic(&run_id, JOB_JSON, &bytes);
            }
        }
    }
}
