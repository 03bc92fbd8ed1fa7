mod client;
mod encoding;
mod status;
mod transport;

pub use client::ExecutionClient;
pub use encoding::{decode_lenient, encode};
pub use status::{LAST_PENDING_STATUS, StatusClass, classify, is_terminal};
pub use transport::{DirectTransport, ExecutionTransport, ProxiedTransport};

use serde::{Deserialize, Serialize};

use crate::config::{ExecutionConfig, TransportKind};
use crate::error::GradingResult;

/// Body of a create-submission call, payloads already encoded
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    pub cpu_time_limit: f64,
    pub memory_limit: u64,
    pub wall_time_limit: f64,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SubmissionToken {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

/// Numeric field the service sends either as a number or as a decimal string
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Measurement {
    Number(f64),
    Text(String),
}

impl Measurement {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Measurement::Number(n) => Some(*n),
            Measurement::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Result of a fetch call, payloads possibly still encoded
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteResult {
    pub status: RemoteStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds
    #[serde(default)]
    pub time: Option<Measurement>,
    /// Kilobytes
    #[serde(default)]
    pub memory: Option<Measurement>,
    #[serde(default)]
    pub exit_code: Option<i64>,
}

/// Normalized result of one run
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub terminal: bool,
    pub status_class: StatusClass,
    pub status_description: String,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub time_ms: Option<u64>,
    pub memory_kb: Option<u64>,
    pub exit_code: Option<i64>,
}

impl ExecutionOutcome {
    pub fn from_remote(result: RemoteResult) -> Self {
        let status_class = classify(result.status.id);
        let decode = |field: Option<String>| field.as_deref().map(decode_lenient).unwrap_or_default();

        let mut stderr = decode(result.stderr);
        if matches!(
            status_class,
            StatusClass::RuntimeError | StatusClass::InternalError
        ) {
            let message = decode(result.message);
            for detail in [result.status.description.as_str(), message.as_str()] {
                if !detail.is_empty() && !stderr.contains(detail) {
                    if !stderr.is_empty() && !stderr.ends_with('\n') {
                        stderr.push('\n');
                    }
                    stderr.push_str(detail);
                }
            }
        }

        Self {
            terminal: is_terminal(result.status.id),
            status_class,
            status_description: result.status.description,
            stdout: decode(result.stdout),
            stderr,
            compile_output: decode(result.compile_output),
            time_ms: result
                .time
                .and_then(|t| t.as_f64())
                .map(|secs| (secs * 1000.0).round() as u64),
            memory_kb: result.memory.and_then(|m| m.as_f64()).map(|kb| kb as u64),
            exit_code: result.exit_code,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status_class == StatusClass::Accepted
    }
}

/// Creates the transport strategy named by the configuration
pub fn create_transport(config: &ExecutionConfig) -> GradingResult<Box<dyn ExecutionTransport>> {
    match config.transport {
        TransportKind::Direct => {
            log::info!("Using direct execution transport at {}", config.base_url);
            Ok(Box::new(DirectTransport::build(config)?))
        }
        TransportKind::Proxied => {
            log::info!("Using proxied execution transport at {}", config.base_url);
            Ok(Box::new(ProxiedTransport::build(config)?))
        }
    }
}
