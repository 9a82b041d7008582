//! Async client for a remote raster evaluation service.

use std::time::Duration;

use aridex_algorithms::result::IndexResult;
use tracing::{debug, info};

use crate::auth::{BearerToken, CloudAuth, NoAuth};
use crate::error::{CloudError, Result};
use crate::http::HttpClient;
use crate::request::SubmitRequest;

/// Configuration for [`RemoteEvaluator`].
pub struct RemoteEvaluatorOptions {
    /// Upper bound on one submission (default 120 s).
    pub request_timeout: Duration,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub token: Option<String>,
}

impl Default for RemoteEvaluatorOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            token: None,
        }
    }
}

/// Submits index graphs to one endpoint.
pub struct RemoteEvaluator {
    endpoint: String,
    http: HttpClient,
    auth: Box<dyn CloudAuth>,
}

impl RemoteEvaluator {
    pub fn new(endpoint: impl Into<String>, options: RemoteEvaluatorOptions) -> Result<Self> {
        let endpoint = endpoint.into();
        check_endpoint(&endpoint)?;
        let auth: Box<dyn CloudAuth> = match options.token {
            Some(token) => Box::new(BearerToken::new(token)),
            None => Box::new(NoAuth),
        };
        Ok(Self {
            endpoint,
            http: HttpClient::new(options.request_timeout)?,
            auth,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit every layer of `result` and return the service's reply.
    ///
    /// The reply is parsed as JSON when it is JSON and otherwise returned
    /// as a JSON string.
    pub async fn submit(&self, result: &IndexResult) -> Result<serde_json::Value> {
        let request = SubmitRequest::from_result(result);
        self.submit_request(&request).await
    }

    pub async fn submit_request(&self, request: &SubmitRequest) -> Result<serde_json::Value> {
        info!(
            "Submitting {} layer(s), {} graph nodes, to {}",
            request.layers.len(),
            request.node_count(),
            self.endpoint
        );
        let resp = self
            .http
            .post_json(&self.endpoint, request, self.auth.as_ref())
            .await?;
        debug!("reply: {} bytes", resp.body.len());
        Ok(parse_reply(&resp.body))
    }
}

fn check_endpoint(url: &str) -> Result<()> {
    let reason = match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => return Ok(()),
        Ok(parsed) => format!("unsupported scheme '{}'", parsed.scheme()),
        Err(e) => e.to_string(),
    };
    Err(CloudError::InvalidEndpoint {
        url: url.to_string(),
        reason,
    })
}

fn parse_reply(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_validation() {
        assert!(RemoteEvaluator::new("https://eval.example.org/v1/layers", Default::default()).is_ok());
        assert!(matches!(
            RemoteEvaluator::new("ftp://eval.example.org", Default::default()),
            Err(CloudError::InvalidEndpoint { .. })
        ));
        assert!(RemoteEvaluator::new("not a url", Default::default()).is_err());
    }

    #[test]
    fn test_reply_parsing() {
        assert_eq!(parse_reply(r#"{"task":"42"}"#)["task"], "42");
        assert_eq!(parse_reply("accepted"), serde_json::Value::String("accepted".into()));
    }
}
