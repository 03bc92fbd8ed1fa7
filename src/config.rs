use clap::Parser;
use serde::Deserialize;

use crate::template::TestCase;

#[derive(Parser)]
#[command(name = "grader", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: String,
}

impl CliArgs {
    /// Load the configuration from the specified file
    pub fn to_config(&self) -> std::io::Result<Config> {
        let file = std::fs::File::open(&self.config_path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| e.into())
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub questions: Vec<QuestionConfig>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
    /// Upper bound on one grading request, enforced outside the core
    pub request_timeout_secs: Option<u64>,
}

/// Everything the execution client needs, passed in explicitly
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub base_url: String,
    pub api_key: Option<String>,
    /// Host header value required by the proxy
    pub api_host: Option<String>,
    #[serde(default = "default_language_id")]
    pub language_id: u32,
    #[serde(default = "default_cpu_time_limit")]
    pub cpu_time_limit_secs: f64,
    #[serde(default = "default_wall_time_limit")]
    pub wall_time_limit_secs: f64,
    #[serde(default = "default_memory_limit")]
    pub memory_limit_kb: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_test_case_delay")]
    pub test_case_delay_ms: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Direct,
    Proxied,
}

#[derive(Deserialize, Debug, Clone)]
pub struct QuestionConfig {
    pub id: u32,
    pub name: String,
    pub scaffold: Vec<String>,
    pub signature: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

fn default_language_id() -> u32 {
    62 // Java (OpenJDK)
}

fn default_cpu_time_limit() -> f64 {
    5.0
}

fn default_wall_time_limit() -> f64 {
    10.0
}

fn default_memory_limit() -> u64 {
    128_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_test_case_delay() -> u64 {
    500
}

fn default_http_timeout() -> u64 {
    15
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            base_url: String::new(),
            api_key: None,
            api_host: None,
            language_id: default_language_id(),
            cpu_time_limit_secs: default_cpu_time_limit(),
            wall_time_limit_secs: default_wall_time_limit(),
            memory_limit_kb: default_memory_limit(),
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval(),
            test_case_delay_ms: default_test_case_delay(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}
