#![doc = "Job scheduling for the workbench: dual FIFO queues with worker subprocess supervision, the stdout progress protocol, the VRAM guard, the tracer facade, and the sim/RIS worker bodies."]

pub mod progress_line;
pub mod scheduler;
pub mod simcfg;
pub mod tracer;
pub mod vram;
pub mod worker;

pub use progress_line::{format_progress_line, parse_progress_line, PROGRESS_PREFIX};
pub use scheduler::{
    JobRecord, JobScheduler, JobStatus, JobTicket, RisJobRequest, SchedulerOptions, SimJobRequest,
    WorkerCommand,
};
pub use simcfg::{
    DeviceConfig, QualityPreset, RadioMapConfig, RisPanelConfig, RuntimeConfig, SceneConfig,
    SimConfig, SimProfile, SimulationConfig, VramGuardConfig,
};
pub use tracer::{AnalyticTracer, RtBackend, TracedPath, Tracer};
pub use vram::{apply_vram_guard, Adjustment, FixedProbe, NoDeviceProbe, VramGuardReport, VramProbe};
pub use worker::{
    run_ris_worker, run_sim_worker, JournalSink, ProgressSink, RisAction, RisMode, StdoutSink,
    WorkerOutcome,
};
