use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::ExecutionConfig;
use crate::error::{GradingError, GradingResult};

use super::{RemoteResult, SubmissionRequest, SubmissionToken};

const USER_AGENT_VALUE: &str = concat!("grader/", env!("CARGO_PKG_VERSION"));

/// How requests reach the execution service
///
/// Implementations differ only in endpoint and credentials; the client
/// above them owns retries and status interpretation.
#[async_trait]
pub trait ExecutionTransport: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Checks credentials and endpoint without touching the network
    fn ensure_configured(&self) -> GradingResult<()>;

    /// Creates a submission and returns its token
    async fn create_submission(&self, request: &SubmissionRequest) -> GradingResult<String>;

    /// Fetches the current state of a submission
    async fn fetch_submission(&self, token: &str) -> GradingResult<RemoteResult>;
}

/// Plain HTTP plumbing shared by both transports
#[derive(Debug, Clone)]
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
}

impl Endpoint {
    fn build(config: &ExecutionConfig) -> GradingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| GradingError::Configuration {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn ensure_base_url(&self) -> GradingResult<()> {
        if self.base_url.is_empty() {
            return Err(GradingError::Configuration {
                message: "execution service base URL is not set".to_string(),
            });
        }
        Ok(())
    }

    async fn create(&self, headers: HeaderMap, request: &SubmissionRequest) -> GradingResult<String> {
        let url = format!("{}/submissions", self.base_url);
        log::debug!("Creating submission at {url}");

        let response = self
            .client
            .post(&url)
            .query(&[("base64_encoded", "true"), ("wait", "false")])
            .headers(headers)
            .json(request)
            .send()
            .await?;

        let token: SubmissionToken = check_status(response).await?.json().await?;
        Ok(token.token)
    }

    async fn fetch(&self, headers: HeaderMap, token: &str) -> GradingResult<RemoteResult> {
        let url = format!("{}/submissions/{}", self.base_url, token);

        let response = self
            .client
            .get(&url)
            .query(&[("base64_encoded", "true"), ("fields", "*")])
            .headers(headers)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

/// Turns a non-2xx reply into [`GradingError::RemoteService`], keeping the body.
async fn check_status(response: reqwest::Response) -> GradingResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::warn!("Execution service replied {status}: {body}");
    Err(GradingError::RemoteService {
        status: status.as_u16(),
        body,
    })
}

fn header_value(value: &str, what: &str) -> GradingResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| GradingError::Configuration {
        message: format!("invalid {what}: {e}"),
    })
}

/// Talks to a self-hosted service, optionally authenticated by token
#[derive(Debug, Clone)]
pub struct DirectTransport {
    endpoint: Endpoint,
    auth_token: Option<String>,
}

impl DirectTransport {
    pub fn build(config: &ExecutionConfig) -> GradingResult<Self> {
        Ok(Self {
            endpoint: Endpoint::build(config)?,
            auth_token: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn headers(&self) -> GradingResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_token {
            headers.insert(
                HeaderName::from_static("x-auth-token"),
                header_value(token, "auth token")?,
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl ExecutionTransport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn ensure_configured(&self) -> GradingResult<()> {
        self.endpoint.ensure_base_url()
    }

    async fn create_submission(&self, request: &SubmissionRequest) -> GradingResult<String> {
        self.ensure_configured()?;
        self.endpoint.create(self.headers()?, request).await
    }

    async fn fetch_submission(&self, token: &str) -> GradingResult<RemoteResult> {
        self.ensure_configured()?;
        self.endpoint.fetch(self.headers()?, token).await
    }
}

/// Talks to the service through an API gateway that needs a key and host
#[derive(Debug, Clone)]
pub struct ProxiedTransport {
    endpoint: Endpoint,
    api_key: Option<String>,
    api_host: Option<String>,
}

impl ProxiedTransport {
    pub fn build(config: &ExecutionConfig) -> GradingResult<Self> {
        Ok(Self {
            endpoint: Endpoint::build(config)?,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_host: config.api_host.clone().filter(|h| !h.is_empty()),
        })
    }

    fn headers(&self) -> GradingResult<HeaderMap> {
        let (Some(key), Some(host)) = (&self.api_key, &self.api_host) else {
            return Err(GradingError::Configuration {
                message: "proxied transport requires api_key and api_host".to_string(),
            });
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-rapidapi-key"),
            header_value(key, "api key")?,
        );
        headers.insert(
            HeaderName::from_static("x-rapidapi-host"),
            header_value(host, "api host")?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl ExecutionTransport for ProxiedTransport {
    fn name(&self) -> &'static str {
        "proxied"
    }

    fn ensure_configured(&self) -> GradingResult<()> {
        self.endpoint.ensure_base_url()?;
        self.headers().map(|_| ())
    }

    async fn create_submission(&self, request: &SubmissionRequest) -> GradingResult<String> {
        self.endpoint.ensure_base_url()?;
        let headers = self.headers()?;
        self.endpoint.create(headers, request).await
    }

    async fn fetch_submission(&self, token: &str) -> GradingResult<RemoteResult> {
        self.endpoint.ensure_base_url()?;
        let headers = self.headers()?;
        self.endpoint.fetch(headers, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportKind;

    fn proxied_config(api_key: Option<&str>, api_host: Option<&str>) -> ExecutionConfig {
        ExecutionConfig {
            transport: TransportKind::Proxied,
            base_url: "https://exec.example.com/".to_string(),
            api_key: api_key.map(str::to_string),
            api_host: api_host.map(str::to_string),
            ..ExecutionConfig::default()
        }
    }

    #[test]
    fn test_proxied_requires_credentials() {
        let transport = ProxiedTransport::build(&proxied_config(None, Some("exec.example.com"))).unwrap();
        assert!(matches!(
            transport.ensure_configured(),
            Err(GradingError::Configuration { .. })
        ));

        let transport = ProxiedTransport::build(&proxied_config(Some(""), Some("h"))).unwrap();
        assert!(transport.ensure_configured().is_err());

        let transport = ProxiedTransport::build(&proxied_config(Some("k"), Some("h"))).unwrap();
        assert!(transport.ensure_configured().is_ok());
        assert_eq!(transport.endpoint.base_url, "https://exec.example.com");
    }

    #[test]
    fn test_direct_requires_base_url() {
        let transport = DirectTransport::build(&ExecutionConfig::default()).unwrap();
        assert!(matches!(
            transport.ensure_configured(),
            Err(GradingError::Configuration { .. })
        ));
        assert!(transport.headers().unwrap().is_empty());
    }
}
