#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use raybench_jobs::{
    JobScheduler, JobStatus, NoDeviceProbe, RisAction, RisJobRequest, RisMode, SchedulerOptions,
    SimJobRequest, SimProfile, WorkerCommand,
};
use raybench_ris::RisConfig;
use raybench_store::{ProgressJournal, RunKind, RunStatus, RunStore};

fn shell_worker(script: &str) -> WorkerCommand {
    WorkerCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".to_string(), script.to_string(), "worker".to_string()],
    }
}

fn scheduler_with(script: &str) -> (tempfile::TempDir, Arc<RunStore>, Arc<ProgressJournal>, JobScheduler) {
    let temp = tempfile::tempdir().expect("tmp");
    let store = Arc::new(RunStore::new(temp.path()).expect("store"));
    let journal = Arc::new(ProgressJournal::new(temp.path()));
    let scheduler = JobScheduler::new(
        Arc::clone(&store),
        Arc::clone(&journal),
        SchedulerOptions::new(shell_worker(script)),
        Box::new(NoDeviceProbe),
    );
    (temp, store, journal, scheduler)
}

fn sim_request() -> SimJobRequest {
    SimJobRequest {
        profile: SimProfile::QuickTrace,
        config: serde_json::from_value(serde_json::json!({
            "scene": {
                "tx": {"position": [0.0, 0.0, 10.0]},
                "rx": {"position": [20.0, 0.0, 1.5]}
            }
        }))
        .expect("config"),
        payload_snapshot: serde_json::json!({"kind": "run", "profile": "quick_trace"}),
    }
}

fn ris_request() -> RisJobRequest {
    RisJobRequest {
        action: RisAction::Run,
        mode: RisMode::Pattern,
        config: RisConfig::from_yaml(
            b"geometry: {nx: 4, ny: 4, dx: 4.9e-3, dy: 4.9e-3, normal: [1.0, 0.0, 0.0], x_axis_hint: [0.0, 1.0, 0.0]}",
        )
        .expect("config"),
        reference: None,
        payload_snapshot: serde_json::json!({"action": "run", "mode": "pattern"}),
    }
}

const OK_WORKER: &str = r#"
echo 'PROGRESS {"status":"running","step_index":1,"step_name":"Trace","total_steps":2,"progress":0.5}'
echo 'worker log line'
sleep 0.3
echo 'PROGRESS {"status":"completed","step_index":2,"step_name":"Complete","total_steps":2,"progress":1.0}'
"#;

#[test]
fn two_sim_jobs_share_one_slot_in_order() {
    let (_temp, store, journal, scheduler) = scheduler_with(OK_WORKER);
    let first = scheduler.submit_sim(sim_request()).expect("first");
    let second = scheduler.submit_sim(sim_request()).expect("second");
    assert_ne!(first.run_id, second.run_id);
    assert!(first.run_id < second.run_id, "run ids not creation ordered");

    // With a single slot the second job may only run once the first one is
    // terminal.
    let mut saw_second_queued_while_first_active = false;
    for _ in 0..2_000 {
        let job1 = scheduler.job(&first.job_id).expect("job 1");
        let job2 = scheduler.job(&second.job_id).expect("job 2");
        if matches!(job2.status, JobStatus::Running | JobStatus::Completed) {
            assert_eq!(job1.status, JobStatus::Completed, "second ran before first finished");
        }
        if job2.status == JobStatus::Queued
            && matches!(job1.status, JobStatus::Queued | JobStatus::Running)
        {
            saw_second_queued_while_first_active = true;
        }
        if job2.status == JobStatus::Completed {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(
        scheduler.job(&second.job_id).unwrap().status,
        JobStatus::Completed,
        "second job never completed"
    );
    assert!(saw_second_queued_while_first_active);
    assert!(scheduler.wait_idle(Duration::from_secs(10)));

    for ticket in [&first, &second] {
        let snap = journal.snapshot(&ticket.run_id).expect("progress");
        assert_eq!(snap.status, RunStatus::Completed);
        let handle = store.open(&ticket.run_id).expect("open");
        assert!(handle.exists("config.yaml"));
        assert!(handle.exists("config.json"));
        assert!(handle.exists("config_hash"));
        assert!(handle.exists("job.json"));
        let log = String::from_utf8(handle.read("run.log").expect("log")).unwrap();
        assert!(log.contains("worker log line"));
    }

    // Completion order equals submission order: the first run reached its
    // terminal record no later than the second.
    let first_done = journal.snapshot(&first.run_id).unwrap().updated_at;
    let second_done = journal.snapshot(&second.run_id).unwrap().updated_at;
    assert!(first_done <= second_done);
}

#[test]
fn progress_lines_update_the_journal() {
    let (_temp, _store, journal, scheduler) = scheduler_with(OK_WORKER);
    let ticket = scheduler.submit_sim(sim_request()).expect("submit");
    assert!(scheduler.wait_idle(Duration::from_secs(10)));

    let snap = journal.snapshot(&ticket.run_id).expect("progress");
    assert_eq!(snap.status, RunStatus::Completed);
    assert_eq!(snap.step_index, 2);
    assert_eq!(snap.progress, Some(1.0));
}

#[test]
fn failing_worker_records_last_stderr_line() {
    let script = r#"
echo 'starting up'
echo 'RIS geometry rejected' 1>&2
exit 2
"#;
    let (_temp, _store, journal, scheduler) = scheduler_with(script);
    let ticket = scheduler.submit_ris(ris_request()).expect("submit");
    assert!(scheduler.wait_idle(Duration::from_secs(10)));

    let job = scheduler.job(&ticket.job_id).expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("RIS geometry rejected"));

    let snap = journal.snapshot(&ticket.run_id).expect("progress");
    assert_eq!(snap.status, RunStatus::Failed);
    assert_eq!(snap.error.as_deref(), Some("RIS geometry rejected"));
}

#[test]
fn silent_failure_reports_the_exit_code() {
    let (_temp, _store, _journal, scheduler) = scheduler_with("exit 7");
    let ticket = scheduler.submit_ris(ris_request()).expect("submit");
    assert!(scheduler.wait_idle(Duration::from_secs(10)));
    let job = scheduler.job(&ticket.job_id).expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("exit 7"));
}

#[test]
fn queues_run_independently() {
    let (_temp, _store, _journal, scheduler) = scheduler_with(OK_WORKER);
    let sim = scheduler.submit_sim(sim_request()).expect("sim");
    let ris = scheduler.submit_ris(ris_request()).expect("ris");
    assert!(scheduler.wait_idle(Duration::from_secs(10)));
    assert_eq!(scheduler.job(&sim.job_id).unwrap().status, JobStatus::Completed);
    assert_eq!(scheduler.job(&ris.job_id).unwrap().status, JobStatus::Completed);

    let sim_jobs = scheduler.jobs(Some(RunKind::Sim));
    assert_eq!(sim_jobs.len(), 1);
    assert_eq!(sim_jobs[0].job_id, sim.job_id);
}

#[test]
fn queued_jobs_can_be_discarded() {
    // A worker slow enough to keep the second submission queued.
    let (_temp, _store, _journal, scheduler) = scheduler_with("sleep 0.5");
    let _running = scheduler.submit_ris(ris_request()).expect("first");
    let queued = scheduler.submit_ris(ris_request()).expect("second");

    scheduler.discard_queued(&queued.job_id).expect("discard");
    let job = scheduler.job(&queued.job_id).expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("discarded before dispatch"));
    assert!(scheduler.wait_idle(Duration::from_secs(10)));
}

#[test]
fn invalid_sim_config_is_rejected_synchronously() {
    let (temp, _store, _journal, scheduler) = scheduler_with(OK_WORKER);
    let mut request = sim_request();
    request.config.simulation.frequency_hz = -1.0;
    let err = scheduler.submit_sim(request).unwrap_err();
    assert!(matches!(err, raybench_core::RbError::Config(_)));
    // No run directory was created for the rejected submission.
    let runs = std::fs::read_dir(temp.path())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .count();
    assert_eq!(runs, 0);
}
