//! Structured error types shared across Raybench crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`RbError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (run ids, paths, limits, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the Raybench control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum RbError {
    /// Schema or invariant violation in a submitted configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Unknown run id or missing artifact.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// A freshly allocated run id already exists on disk.
    #[error("collision: {0}")]
    Collision(ErrorInfo),
    /// The grid aligner rejected its inputs.
    #[error("grid error: {0}")]
    Grid(ErrorInfo),
    /// A required ray-tracing backend is unavailable and fallback is forbidden.
    #[error("backend error: {0}")]
    Backend(ErrorInfo),
    /// A worker process failed without a structured reason.
    #[error("worker error: {0}")]
    Worker(ErrorInfo),
    /// Artifact write or other filesystem failure.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl RbError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            RbError::Config(info)
            | RbError::NotFound(info)
            | RbError::Collision(info)
            | RbError::Grid(info)
            | RbError::Backend(info)
            | RbError::Worker(info)
            | RbError::Io(info)
            | RbError::Serde(info) => info,
        }
    }

    /// Builds an I/O error from an underlying failure.
    pub fn io(code: &str, err: impl ToString) -> Self {
        RbError::Io(ErrorInfo::new(code, err.to_string()))
    }

    /// Builds a config error with the provided code and message.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        RbError::Config(ErrorInfo::new(code, message))
    }
}
