//! Request routing.
//!
//! The gateway is a synchronous facade: the embedded HTTP server parses
//! framing and hands over `(method, path, body)`; everything after that —
//! dispatch, status codes, payloads — is decided here and unit-testable
//! without a socket.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_jobs::{
    JobScheduler, QualityPreset, RadioMapConfig, RisAction, RisJobRequest, RisMode, RuntimeConfig,
    SceneConfig, SimConfig, SimJobRequest, SimProfile, SimulationConfig,
};
use raybench_ris::RisConfig;
use raybench_store::{ProgressJournal, RunKind, RunStore};

use crate::paths::safe_resolve;

/// HTTP method subset the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read endpoints.
    Get,
    /// Submission endpoints.
    Post,
}

/// A parsed request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Method.
    pub method: Method,
    /// Path with no query string.
    pub path: String,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

/// Response payload: JSON or a resolved file to stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    /// JSON document.
    Json(Value),
    /// Absolute path of a file to serve.
    File(PathBuf),
}

/// A routed response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body.
    pub payload: ApiPayload,
}

impl ApiResponse {
    fn ok(value: Value) -> Self {
        Self {
            status: 200,
            payload: ApiPayload::Json(value),
        }
    }

    fn file(path: PathBuf) -> Self {
        Self {
            status: 200,
            payload: ApiPayload::File(path),
        }
    }

    fn not_found(message: &str) -> Self {
        Self {
            status: 404,
            payload: ApiPayload::Json(json!({ "error": message })),
        }
    }
}

/// The JSON gateway.
pub struct JobGateway {
    store: Arc<RunStore>,
    journal: Arc<ProgressJournal>,
    scheduler: Arc<JobScheduler>,
    config_root: PathBuf,
}

impl JobGateway {
    /// Creates a gateway over the given collaborators.
    pub fn new(
        store: Arc<RunStore>,
        journal: Arc<ProgressJournal>,
        scheduler: Arc<JobScheduler>,
        config_root: PathBuf,
    ) -> Self {
        Self {
            store,
            journal,
            scheduler,
            config_root,
        }
    }

    /// Routes one request.
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let result = match (request.method, request.path.as_str()) {
            (Method::Get, "/api/ping") => Ok(ApiResponse::ok(json!({ "ok": true }))),
            (Method::Get, "/api/configs") => self.list_configs(),
            (Method::Get, "/api/runs") => self.list_runs(),
            (Method::Get, "/api/jobs") => self.list_jobs(RunKind::Sim),
            (Method::Get, "/api/ris/jobs") => self.list_jobs(RunKind::Ris),
            (Method::Post, "/api/jobs") => self.submit_sim(request.body.as_ref()),
            (Method::Post, "/api/ris/jobs") => self.submit_ris(request.body.as_ref()),
            (Method::Get, path) => {
                if let Some(run_id) = path.strip_prefix("/api/run/") {
                    self.run_detail(run_id)
                } else if let Some(run_id) = path.strip_prefix("/api/progress/") {
                    self.progress(run_id)
                } else if let Some(rest) = path.strip_prefix("/runs/") {
                    self.run_file(rest)
                } else {
                    return ApiResponse::not_found("unknown endpoint");
                }
            }
            (Method::Post, _) => return ApiResponse::not_found("unknown endpoint"),
        };
        result.unwrap_or_else(|err| error_response(&err))
    }

    fn list_configs(&self) -> Result<ApiResponse, RbError> {
        let mut configs = Vec::new();
        if self.config_root.is_dir() {
            let mut paths: Vec<PathBuf> = fs::read_dir(&self.config_root)
                .map_err(|err| RbError::io("config_root", err))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("yaml"))
                .collect();
            paths.sort();
            for path in paths {
                let data = fs::read(&path)
                    .ok()
                    .and_then(|bytes| serde_yaml::from_slice::<Value>(&bytes).ok());
                configs.push(json!({
                    "name": path.file_name().and_then(|n| n.to_str()),
                    "path": path.display().to_string(),
                    "data": data,
                }));
            }
        }
        Ok(ApiResponse::ok(json!({ "configs": configs })))
    }

    fn list_runs(&self) -> Result<ApiResponse, RbError> {
        let entries = self.store.list(None)?;
        Ok(ApiResponse::ok(json!({ "runs": entries })))
    }

    fn list_jobs(&self, kind: RunKind) -> Result<ApiResponse, RbError> {
        let jobs = self.scheduler.jobs(Some(kind));
        Ok(ApiResponse::ok(json!({ "jobs": jobs })))
    }

    fn run_detail(&self, run_id: &str) -> Result<ApiResponse, RbError> {
        let handle = self.store.open(run_id)?;
        let config = handle.read_json("config.json").ok();
        let summary = handle.read_json("summary.json").ok();
        let progress = self.journal.snapshot(run_id).ok();
        Ok(ApiResponse::ok(json!({
            "run_id": run_id,
            "config": config,
            "summary": summary,
            "progress": progress,
        })))
    }

    fn progress(&self, run_id: &str) -> Result<ApiResponse, RbError> {
        let record = self.journal.snapshot(run_id)?;
        Ok(ApiResponse::ok(serde_json::to_value(record).map_err(
            |err| RbError::Serde(ErrorInfo::new("progress_encode", err.to_string())),
        )?))
    }

    fn run_file(&self, rest: &str) -> Result<ApiResponse, RbError> {
        let Some((run_id, rel_path)) = rest.split_once('/') else {
            return Ok(ApiResponse::not_found("missing run file path"));
        };
        let handle = self.store.open(run_id)?;
        let path = safe_resolve(handle.paths.dir(), rel_path)?;
        Ok(ApiResponse::file(path))
    }

    fn submit_sim(&self, body: Option<&Value>) -> Result<ApiResponse, RbError> {
        let body = body.ok_or_else(|| config_error("body_missing", "request body required"))?;
        let payload: SimJobPayload = serde_json::from_value(body.clone())
            .map_err(|err| config_error("sim_payload", err.to_string()))?;
        if payload.kind != "run" {
            return Err(config_error("sim_kind", "kind must be \"run\""));
        }

        let base = match &payload.base_config {
            Some(name) => self.load_base_config(name)?,
            None => None,
        };
        let mut config = match (base, payload.scene) {
            (Some(mut config), scene) => {
                if let Some(scene) = scene {
                    config.scene = scene;
                }
                config
            }
            (None, Some(scene)) => SimConfig {
                scene,
                simulation: SimulationConfig::default(),
                radio_map: RadioMapConfig::default(),
                runtime: RuntimeConfig::default(),
            },
            (None, None) => {
                return Err(config_error(
                    "sim_scene_missing",
                    "scene section (or a base_config providing one) is required",
                ))
            }
        };
        if let Some(preset) = payload.preset {
            config.apply_quality_preset(preset);
        }
        if let Some(simulation) = payload.simulation {
            config.simulation = simulation;
        }
        if let Some(radio_map) = payload.radio_map {
            config.radio_map = radio_map;
        }
        if let Some(runtime) = payload.runtime {
            config.runtime = runtime;
        }
        if let Some(ris) = &payload.ris {
            if !ris.is_object() {
                return Err(config_error("sim_ris", "ris section must be a mapping"));
            }
        }

        let ticket = self.scheduler.submit_sim(SimJobRequest {
            profile: payload.profile,
            config,
            payload_snapshot: body.clone(),
        })?;
        Ok(ApiResponse::ok(json!({
            "run_id": ticket.run_id,
            "job_id": ticket.job_id,
        })))
    }

    fn submit_ris(&self, body: Option<&Value>) -> Result<ApiResponse, RbError> {
        let body = body.ok_or_else(|| config_error("body_missing", "request body required"))?;
        let payload: RisJobPayload = serde_json::from_value(body.clone())
            .map_err(|err| config_error("ris_payload", err.to_string()))?;

        let action = match payload.action.as_str() {
            "run" => RisAction::Run,
            "validate" => RisAction::Validate,
            other => {
                return Err(config_error(
                    "ris_action",
                    format!("unsupported action {other:?}"),
                ))
            }
        };
        let mode = match payload.mode.as_deref() {
            None | Some("pattern") => RisMode::Pattern,
            Some("link") => RisMode::Link,
            Some(other) => {
                return Err(config_error("ris_mode", format!("unsupported mode {other:?}")))
            }
        };

        let config = match (&payload.config_data, &payload.config_path) {
            (Some(data), _) => parse_ris_config(data)?,
            (None, Some(path)) => {
                let resolved = safe_resolve(&self.config_root, path)?;
                let bytes = fs::read(&resolved).map_err(|err| RbError::io("ris_config_read", err))?;
                RisConfig::from_yaml(&bytes)?
            }
            (None, None) => {
                return Err(config_error(
                    "ris_config_missing",
                    "config_data or config_path required",
                ))
            }
        };

        let reference = match &payload.reference {
            Some(path) => Some(safe_resolve(&self.config_root, path)?),
            None => None,
        };

        let ticket = self.scheduler.submit_ris(RisJobRequest {
            action,
            mode,
            config,
            reference,
            payload_snapshot: body.clone(),
        })?;
        Ok(ApiResponse::ok(json!({
            "run_id": ticket.run_id,
            "job_id": ticket.job_id,
        })))
    }

    fn load_base_config(&self, name: &str) -> Result<Option<SimConfig>, RbError> {
        let resolved = safe_resolve(&self.config_root, name)?;
        let bytes = fs::read(&resolved).map_err(|err| RbError::io("base_config_read", err))?;
        let config: SimConfig = raybench_core::serde::from_yaml_slice(&bytes)
            .map_err(|err| config_error("base_config_parse", err.to_string()))?;
        Ok(Some(config))
    }
}

fn parse_ris_config(data: &Value) -> Result<RisConfig, RbError> {
    let config: RisConfig = match data {
        Value::String(yaml) => RisConfig::from_yaml(yaml.as_bytes())?,
        other => {
            let config: RisConfig = serde_json::from_value(other.clone())
                .map_err(|err| config_error("ris_config_parse", err.to_string()))?;
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn config_error(code: &str, message: impl Into<String>) -> RbError {
    RbError::Config(ErrorInfo::new(code, message))
}

fn error_response(err: &RbError) -> ApiResponse {
    let status = match err {
        RbError::Config(_) | RbError::Grid(_) => 400,
        RbError::NotFound(_) => 404,
        _ => 500,
    };
    if status == 500 {
        tracing::error!(error = %err, "gateway internal error");
    }
    ApiResponse {
        status,
        payload: ApiPayload::Json(json!({ "error": err.to_string() })),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimJobPayload {
    kind: String,
    profile: SimProfile,
    #[serde(default)]
    base_config: Option<String>,
    #[serde(default)]
    preset: Option<QualityPreset>,
    #[serde(default)]
    runtime: Option<RuntimeConfig>,
    #[serde(default)]
    simulation: Option<SimulationConfig>,
    #[serde(default)]
    radio_map: Option<RadioMapConfig>,
    #[serde(default)]
    scene: Option<SceneConfig>,
    #[serde(default)]
    ris: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RisJobPayload {
    action: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    config_path: Option<String>,
    #[serde(default)]
    config_data: Option<Value>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}
