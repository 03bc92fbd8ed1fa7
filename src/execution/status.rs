use serde::{Deserialize, Serialize};

/// Highest status id that still means "queued or processing"
pub const LAST_PENDING_STATUS: u32 = 2;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Accepted,
    WrongAnswer,
    TimeLimit,
    CompileError,
    RuntimeError,
    InternalError,
    Unknown,
}

pub fn is_terminal(status_id: u32) -> bool {
    status_id > LAST_PENDING_STATUS
}

/// Maps a service status id onto its class
///
/// The signal-based failures (SIGSEGV, SIGXFSZ, SIGFPE, SIGABRT, NZEC and
/// "other") all collapse into [`StatusClass::RuntimeError`].
pub fn classify(status_id: u32) -> StatusClass {
    match status_id {
        3 => StatusClass::Accepted,
        4 => StatusClass::WrongAnswer,
        5 => StatusClass::TimeLimit,
        6 => StatusClass::CompileError,
        7..=12 => StatusClass::RuntimeError,
        13 | 14 => StatusClass::InternalError, // internal error, exec format error
        _ => StatusClass::Unknown,
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StatusClass::Accepted => "Accepted",
            StatusClass::WrongAnswer => "Wrong Answer",
            StatusClass::TimeLimit => "Time Limit Exceeded",
            StatusClass::CompileError => "Compilation Error",
            StatusClass::RuntimeError => "Runtime Error",
            StatusClass::InternalError => "Internal Error",
            StatusClass::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_statuses() {
        assert!(!is_terminal(1));
        assert!(!is_terminal(2));
        assert!(is_terminal(3));
        assert!(is_terminal(14));
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify(3), StatusClass::Accepted);
        assert_eq!(classify(4), StatusClass::WrongAnswer);
        assert_eq!(classify(5), StatusClass::TimeLimit);
        assert_eq!(classify(6), StatusClass::CompileError);
        for id in 7..=12 {
            assert_eq!(classify(id), StatusClass::RuntimeError);
        }
        assert_eq!(classify(13), StatusClass::InternalError);
        assert_eq!(classify(14), StatusClass::InternalError);
        assert_eq!(classify(99), StatusClass::Unknown);
    }
}
