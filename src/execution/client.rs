use std::time::Duration;

use crate::config::ExecutionConfig;
use crate::error::{GradingError, GradingResult};
use crate::template::ComposedProgram;

use super::{
    ExecutionOutcome, ExecutionTransport, SubmissionRequest, create_transport, encode, is_terminal,
};

/// Runs composed programs on the remote execution service
///
/// Each run is a create-submission call followed by bounded polling until
/// the service reports a terminal status.
pub struct ExecutionClient {
    transport: Box<dyn ExecutionTransport>,
    config: ExecutionConfig,
}

impl ExecutionClient {
    /// Builds the client with the transport named in `config`
    pub fn new(config: ExecutionConfig) -> GradingResult<Self> {
        let transport = create_transport(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ExecutionConfig, transport: Box<dyn ExecutionTransport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Fails with a configuration error when the service cannot be called at all
    pub fn ensure_configured(&self) -> GradingResult<()> {
        self.transport.ensure_configured()
    }

    /// Pause between consecutive test-case runs
    pub fn test_case_delay(&self) -> Duration {
        Duration::from_millis(self.config.test_case_delay_ms)
    }

    /// Creates a remote submission and returns its token
    pub async fn submit(&self, program: &ComposedProgram, stdin: &str) -> GradingResult<String> {
        self.transport.ensure_configured()?;

        let request = SubmissionRequest {
            source_code: encode(program.source()),
            language_id: self.config.language_id,
            stdin: encode(stdin),
            cpu_time_limit: self.config.cpu_time_limit_secs,
            memory_limit: self.config.memory_limit_kb,
            wall_time_limit: self.config.wall_time_limit_secs,
        };

        let token = self.transport.create_submission(&request).await?;
        log::debug!("Created submission {token} via {} transport", self.transport.name());
        Ok(token)
    }

    /// Polls `token` until its status is terminal
    ///
    /// Sleeps `poll_interval` between attempts. Transport failures and
    /// overloaded-service replies use up an attempt and polling continues;
    /// any other error is returned at once. Gives up with
    /// [`GradingError::ExecutionTimeout`] after `max_attempts`.
    pub async fn await_result(
        &self,
        token: &str,
        max_attempts: u32,
        poll_interval: Duration,
    ) -> GradingResult<ExecutionOutcome> {
        for attempt in 1..=max_attempts {
            match self.transport.fetch_submission(token).await {
                Ok(result) if is_terminal(result.status.id) => {
                    log::debug!(
                        "Submission {token} finished with status {} ({}) after {attempt} attempts",
                        result.status.id,
                        result.status.description
                    );
                    return Ok(ExecutionOutcome::from_remote(result));
                }
                Ok(result) => {
                    log::debug!(
                        "Submission {token} is {} (attempt {attempt}/{max_attempts})",
                        result.status.description
                    );
                }
                Err(e) if e.is_transient() => {
                    log::warn!("Polling submission {token} failed (attempt {attempt}/{max_attempts}): {e}");
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                tokio::time::sleep(poll_interval).await;
            }
        }

        log::warn!("Submission {token} did not finish within {max_attempts} attempts");
        Err(GradingError::ExecutionTimeout {
            attempts: max_attempts,
        })
    }

    /// Submits `program` and waits for its outcome with the configured limits
    ///
    /// Every call creates a new remote submission.
    pub async fn execute(
        &self,
        program: &ComposedProgram,
        stdin: &str,
    ) -> GradingResult<ExecutionOutcome> {
        let token = self.submit(program, stdin).await?;
        self.await_result(
            &token,
            self.config.max_attempts,
            Duration::from_millis(self.config.poll_interval_ms),
        )
        .await
    }
}
