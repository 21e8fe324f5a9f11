use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use raybench_artifacts::{snapshot_config, SvgRenderer};
use raybench_core::fsio::read_bytes;
use raybench_core::serde::from_yaml_slice;
use raybench_jobs::{
    run_ris_worker, run_sim_worker, AnalyticTracer, JournalSink, RisAction, RisMode, RtBackend,
    SimConfig, StdoutSink, WorkerOutcome,
};
use raybench_ris::RisConfig;
use raybench_store::{ProgressJournal, RunKind, RunStore};

#[derive(Parser, Debug)]
#[command(name = "raybench-sim", about = "Raybench workbench CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Worker process entry point, spawned by the scheduler.
    Worker(WorkerArgs),
    /// Execute a sim run directly, without the scheduler.
    Run(RunArgs),
    /// Execute a RIS Lab run directly, without the scheduler.
    Ris(RisArgs),
    /// List runs discovered under the output root.
    List(ListArgs),
}

#[derive(ClapArgs, Debug)]
struct WorkerArgs {
    /// Run directory allocated by the scheduler.
    #[arg(long)]
    run_dir: PathBuf,
    /// Job family.
    #[arg(long, value_enum)]
    kind: KindArg,
    /// Job action.
    #[arg(long, value_enum, default_value = "run")]
    action: ActionArg,
    /// RIS mode.
    #[arg(long, value_enum, default_value = "pattern")]
    mode: ModeArg,
    /// Reference CSV for validate actions.
    #[arg(long = "ref")]
    reference: Option<PathBuf>,
    /// Ray-tracing backend to report.
    #[arg(long, value_enum, default_value = "cpu")]
    backend: BackendArg,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// YAML sim configuration.
    #[arg(long)]
    config: PathBuf,
    /// Output root for run directories.
    #[arg(long, default_value = "outputs")]
    root: PathBuf,
    /// Ray-tracing backend to report.
    #[arg(long, value_enum, default_value = "cpu")]
    backend: BackendArg,
}

#[derive(ClapArgs, Debug)]
struct RisArgs {
    /// YAML RIS Lab configuration.
    #[arg(long)]
    config: PathBuf,
    /// Output root for run directories.
    #[arg(long, default_value = "outputs")]
    root: PathBuf,
    /// Mode to execute.
    #[arg(long, value_enum, default_value = "pattern")]
    mode: ModeArg,
    /// Validate against this reference CSV instead of running.
    #[arg(long = "ref")]
    reference: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Output root to scan.
    #[arg(long, default_value = "outputs")]
    root: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Sim,
    Ris,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Run,
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Pattern,
    Link,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Cpu,
    Cuda,
}

impl From<ActionArg> for RisAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Run => RisAction::Run,
            ActionArg::Validate => RisAction::Validate,
        }
    }
}

impl From<ModeArg> for RisMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Pattern => RisMode::Pattern,
            ModeArg::Link => RisMode::Link,
        }
    }
}

impl From<BackendArg> for RtBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Cpu => RtBackend::CpuLlvm,
            BackendArg::Cuda => RtBackend::CudaOptix,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Worker(args) => worker_main(args),
        Command::Run(args) => map_exit(run_main(args)),
        Command::Ris(args) => map_exit(ris_main(args)),
        Command::List(args) => map_exit(list_main(args)),
    };
    std::process::exit(code);
}

fn map_exit(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err:#}");
            1
        }
    }
}

fn worker_main(args: WorkerArgs) -> i32 {
    let run_id = match args.run_dir.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.to_string(),
        None => {
            eprintln!("run dir has no usable name: {}", args.run_dir.display());
            return 2;
        }
    };
    let root = match args.run_dir.parent() {
        Some(parent) => parent.to_path_buf(),
        None => {
            eprintln!("run dir has no parent: {}", args.run_dir.display());
            return 2;
        }
    };
    let store = match RunStore::new(&root) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };
    let renderer = SvgRenderer::default();
    let sink = StdoutSink;

    let outcome = match args.kind {
        KindArg::Sim => {
            let tracer = AnalyticTracer::new(args.backend.into());
            run_sim_worker(&store, &run_id, &tracer, &renderer, &sink)
        }
        KindArg::Ris => run_ris_worker(
            &store,
            &run_id,
            args.action.into(),
            args.mode.into(),
            args.reference.as_deref(),
            &renderer,
            &sink,
        ),
    };
    if let WorkerOutcome::InvalidConfig(message)
    | WorkerOutcome::ResourceExhausted(message)
    | WorkerOutcome::Failure(message) = &outcome
    {
        eprintln!("{message}");
    }
    outcome.exit_code()
}

fn run_main(args: RunArgs) -> Result<()> {
    let bytes = read_bytes(&args.config)
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| format!("loading {}", args.config.display()))?;
    let config: SimConfig = from_yaml_slice(&bytes).map_err(|err| anyhow!("{err}"))?;
    config.validate().map_err(|err| anyhow!("{err}"))?;

    let store = Arc::new(RunStore::new(&args.root).map_err(|err| anyhow!("{err}"))?);
    let journal = ProgressJournal::new(&args.root);
    let run = store.allocate(RunKind::Sim).map_err(|err| anyhow!("{err}"))?;
    snapshot_config(&store, &run.run_id, &config).map_err(|err| anyhow!("{err}"))?;

    let sink = JournalSink::new(&journal, &run.run_id);
    let tracer = AnalyticTracer::new(args.backend.into());
    let outcome = run_sim_worker(&store, &run.run_id, &tracer, &SvgRenderer::default(), &sink);
    tracing::info!(run_id = %run.run_id, "run finished");
    finish_direct(run.paths.dir(), outcome)
}

fn ris_main(args: RisArgs) -> Result<()> {
    let bytes = read_bytes(&args.config)
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| format!("loading {}", args.config.display()))?;
    let config = RisConfig::from_yaml(&bytes).map_err(|err| anyhow!("{err}"))?;

    let store = Arc::new(RunStore::new(&args.root).map_err(|err| anyhow!("{err}"))?);
    let journal = ProgressJournal::new(&args.root);
    let run = store.allocate(RunKind::Ris).map_err(|err| anyhow!("{err}"))?;
    snapshot_config(&store, &run.run_id, &config).map_err(|err| anyhow!("{err}"))?;

    let action = if args.reference.is_some() {
        RisAction::Validate
    } else {
        RisAction::Run
    };
    let sink = JournalSink::new(&journal, &run.run_id);
    let outcome = run_ris_worker(
        &store,
        &run.run_id,
        action,
        args.mode.into(),
        args.reference.as_deref(),
        &SvgRenderer::default(),
        &sink,
    );
    finish_direct(run.paths.dir(), outcome)
}

fn finish_direct(run_dir: &Path, outcome: WorkerOutcome) -> Result<()> {
    match outcome {
        WorkerOutcome::Success => {
            println!("{}", run_dir.display());
            Ok(())
        }
        WorkerOutcome::InvalidConfig(message) => bail!("invalid config: {message}"),
        WorkerOutcome::ResourceExhausted(message) => bail!("resource exhausted: {message}"),
        WorkerOutcome::Failure(message) => bail!("run failed: {message}"),
    }
}

fn list_main(args: ListArgs) -> Result<()> {
    let store = RunStore::new(&args.root).map_err(|err| anyhow!("{err}"))?;
    let entries = store.list(None).map_err(|err| anyhow!("{err}"))?;
    for entry in entries {
        let kind = entry
            .kind
            .map(|kind| match kind {
                RunKind::Sim => "sim",
                RunKind::Ris => "ris",
            })
            .unwrap_or("?");
        let status = serde_json::to_value(entry.status)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();
        println!(
            "{}  {:4}  {:12}  viewer={}",
            entry.run_id, kind, status, entry.has_viewer
        );
    }
    Ok(())
}
