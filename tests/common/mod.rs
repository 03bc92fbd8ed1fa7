#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use grader::config::ExecutionConfig;
use grader::error::{GradingError, GradingResult};
use grader::execution::{
    ExecutionClient, ExecutionTransport, RemoteResult, RemoteStatus, SubmissionRequest,
    decode_lenient, encode,
};

/// One poll answer
pub enum Step {
    Pending,
    Done(RemoteResult),
    Fail(GradingError),
}

/// What happens to one submission: rejected at submit, or polled through steps
pub type Script = Result<Vec<Step>, GradingError>;

/// When one submission was created and when its result came back
#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub submitted: Instant,
    pub finished: Option<Instant>,
}

/// In-process stand-in for the execution service
pub struct ScriptedTransport {
    configured: bool,
    scripts: Mutex<VecDeque<Script>>,
    polls: Mutex<HashMap<String, VecDeque<Step>>>,
    submitted: Arc<Mutex<Vec<SubmissionRequest>>>,
    timeline: Arc<Mutex<Vec<Span>>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> (Self, Arc<Mutex<Vec<SubmissionRequest>>>) {
        let submitted = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            configured: true,
            scripts: Mutex::new(scripts.into()),
            polls: Mutex::new(HashMap::new()),
            submitted: Arc::clone(&submitted),
            timeline: Arc::new(Mutex::new(Vec::new())),
        };
        (transport, submitted)
    }

    /// Spans of accepted submissions, in submission order
    pub fn timeline(&self) -> Arc<Mutex<Vec<Span>>> {
        Arc::clone(&self.timeline)
    }

    pub fn unconfigured() -> Self {
        let (mut transport, _) = Self::new(Vec::new());
        transport.configured = false;
        transport
    }
}

#[async_trait]
impl ExecutionTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn ensure_configured(&self) -> GradingResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(GradingError::Configuration {
                message: "no api key".to_string(),
            })
        }
    }

    async fn create_submission(&self, request: &SubmissionRequest) -> GradingResult<String> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![Step::Done(accepted(""))]));
        let steps = script?;

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        let token = format!("token-{}", submitted.len());
        self.timeline.lock().unwrap().push(Span {
            submitted: Instant::now(),
            finished: None,
        });
        self.polls
            .lock()
            .unwrap()
            .insert(token.clone(), steps.into());
        Ok(token)
    }

    async fn fetch_submission(&self, token: &str) -> GradingResult<RemoteResult> {
        let step = self
            .polls
            .lock()
            .unwrap()
            .get_mut(token)
            .and_then(|steps| steps.pop_front())
            .unwrap_or(Step::Pending);

        match step {
            Step::Pending => Ok(remote(1, "In Queue")),
            Step::Done(result) => {
                let index = token
                    .trim_start_matches("token-")
                    .parse::<usize>()
                    .unwrap();
                self.timeline.lock().unwrap()[index - 1].finished = Some(Instant::now());
                Ok(result)
            }
            Step::Fail(e) => Err(e),
        }
    }
}

pub fn fast_config() -> ExecutionConfig {
    ExecutionConfig {
        base_url: "http://exec.invalid".to_string(),
        max_attempts: 3,
        poll_interval_ms: 0,
        test_case_delay_ms: 0,
        ..ExecutionConfig::default()
    }
}

pub fn scripted_client(
    scripts: Vec<Script>,
) -> (ExecutionClient, Arc<Mutex<Vec<SubmissionRequest>>>) {
    let (transport, submitted) = ScriptedTransport::new(scripts);
    (
        ExecutionClient::with_transport(fast_config(), Box::new(transport)),
        submitted,
    )
}

pub fn remote(id: u32, description: &str) -> RemoteResult {
    RemoteResult {
        status: RemoteStatus {
            id,
            description: description.to_string(),
        },
        stdout: None,
        stderr: None,
        compile_output: None,
        message: None,
        time: None,
        memory: None,
        exit_code: None,
    }
}

pub fn accepted(stdout: &str) -> RemoteResult {
    RemoteResult {
        stdout: Some(encode(stdout)),
        ..remote(3, "Accepted")
    }
}

pub fn compile_error(message: &str) -> RemoteResult {
    RemoteResult {
        stdout: Some(encode("3\n")),
        compile_output: Some(encode(message)),
        ..remote(6, "Compilation Error")
    }
}

/// Decoded source of a recorded submission
pub fn submitted_source(request: &SubmissionRequest) -> String {
    decode_lenient(&request.source_code)
}

pub fn count_lines_scaffold_lines() -> Vec<&'static str> {
    vec![
        "import java.io.*;",
        "public class Main {",
        "    public static int countLinesWithWord(BufferedReader reader, String word) throws IOException {",
        "        {{CODE}}",
        "    }",
        "    public static void main(String[] args) throws IOException {",
        "        BufferedReader reader = new BufferedReader(new InputStreamReader(System.in));",
        "        System.out.println(countLinesWithWord(reader, \"java\"));",
        "    }",
        "}",
    ]
}

pub const COUNT_LINES_SIGNATURE: &str = "public static int countLinesWithWord(BufferedReader reader, String word) throws IOException {";

pub const COUNT_LINES_BODY: &str = "int count = 0;\nString line;\nwhile ((line = reader.readLine()) != null) {\n    if (line.toLowerCase().contains(word.toLowerCase())) {\n        count++;\n    }\n}\nreturn count;";
