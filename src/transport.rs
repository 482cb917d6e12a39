//! Delivery of payloads to the ingestion endpoint
//!
use crate::{ClientConfig, Error, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Url;
use serde::Deserialize;
use tracing::trace;

/// Header carrying the rendered tag string
pub const TAG_HEADER: &str = "X-LOGGLY-TAG";

/// Response value for success
const SUCCESS_VALUE: &str = "ok";

/// Sends one payload to the log service.
///
/// Implemented by [HttpTransport]; tests and embedders may supply their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers `body` with the given customer token and tag string.
    /// Returns an error if the payload was not accepted.
    async fn send(&self, token: &str, tags: &str, body: String) -> Result<()>;
}

/// Response from the ingestion endpoint, a json object containing only a
/// `response` key whose value is normally `"ok"`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogglyResponse {
    response: String,
}

impl LogglyResponse {
    /// Text value of the response
    pub fn text(&self) -> &str {
        &self.response
    }

    /// Returns true if the response indicates success
    pub fn is_ok(&self) -> bool {
        self.response == SUCCESS_VALUE
    }
}

/// Transport posting to `{endpoint}/inputs/{token}` over http(s)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the http client from configuration.
    /// Fails if the endpoint is not an absolute base URL.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| Error::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: "not a base url".to_string(),
            });
        }
        let mut headers = HeaderMap::new();
        // events are raw text, one per line
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { endpoint, client })
    }

    // the token is one percent-encoded path segment, even if it contains '/', '?' or '#'
    fn url(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("inputs").push(token);
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, token: &str, tags: &str, body: String) -> Result<()> {
        let mut request = self.client.post(self.url(token)).body(body);
        if !tags.is_empty() {
            let value =
                HeaderValue::from_str(tags).map_err(|_| Error::InvalidTags(tags.to_string()))?;
            request = request.header(TAG_HEADER, value);
        }
        let resp = request.send().await?;
        check_response(resp).await
    }
}

// Instead of just returning error for non-2xx status (via resp.error_for_status)
// include response body which may have additional diagnostic info
async fn check_response(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body = resp.text().await?;
    trace!(status = status.as_u16(), %body, "endpoint response");
    parse_response(&body)
}

fn parse_response(body: &str) -> Result<()> {
    let parsed: LogglyResponse = serde_json::from_str(body).map_err(|source| Error::Decode {
        source,
        body: body.to_string(),
    })?;
    if parsed.is_ok() {
        Ok(())
    } else {
        Err(Error::Rejected(parsed.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ok() {
        let resp: LogglyResponse = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.text(), "ok");
    }

    #[test]
    fn test_parse_response() {
        assert!(parse_response(r#"{"response":"ok"}"#).is_ok());
        assert!(matches!(
            parse_response(r#"{"response":"throttled"}"#),
            Err(Error::Rejected(ref s)) if s == "throttled"
        ));
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(Error::Decode { .. })
        ));
        assert!(matches!(parse_response("{}"), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let config = ClientConfig {
            endpoint: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url("abc").as_str(),
            "http://localhost:8080/inputs/abc"
        );
    }

    #[test]
    fn test_url_encodes_token() {
        let config = ClientConfig {
            endpoint: "http://localhost:8080/relay".to_string(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url("abc#def/ghi?x").as_str(),
            "http://localhost:8080/relay/inputs/abc%23def%2Fghi%3Fx"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        for endpoint in ["not a url", "mailto:ops@example.com"] {
            let config = ClientConfig {
                endpoint: endpoint.to_string(),
                ..Default::default()
            };
            assert!(matches!(
                HttpTransport::new(&config),
                Err(Error::InvalidEndpoint { .. })
            ));
        }
    }
}
