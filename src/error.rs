/// Errors raised by the grading core.
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    /// Scaffold does not contain exactly one placeholder.
    #[error("malformed scaffold: expected exactly one placeholder, found {occurrences}")]
    MalformedScaffold { occurrences: usize },

    /// Missing credentials or endpoint for the execution service.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Network failure or service down.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Polling exhausted without a terminal status.
    #[error("execution timed out after {attempts} polling attempts")]
    ExecutionTimeout { attempts: u32 },

    /// Non-2xx reply from the execution service.
    #[error("execution service replied with HTTP {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// Reply body could not be decoded.
    #[error("invalid response from execution service: {message}")]
    InvalidResponse { message: String },

    #[error("question {question_id} not found")]
    QuestionNotFound { question_id: u32 },
}

pub type GradingResult<T> = Result<T, GradingError>;

impl GradingError {
    /// Whether the failure means the service cannot be used at all, so the
    /// submission should be reviewed heuristically instead.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Transport { .. })
    }

    /// Whether a poll attempt that failed this way may simply be retried by
    /// the next attempt of the same loop.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::RemoteService { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GradingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse {
                message: e.to_string(),
            }
        } else {
            Self::Transport {
                message: e.to_string(),
            }
        }
    }
}
