//! HTTP transport for the EDS wire protocol
//!
//! One call to [`Transport::send`] issues one HTTP request and either returns
//! the parsed response document or a typed failure. HTTP statuses other than
//! 200 are mapped onto [`EdsError::ApiError`]: a 400 carries the remote error
//! code and description when the body has them, everything else gets a fixed
//! message and [`ErrorCode::Critical`].

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::eds::parser::XmlNode;
use crate::eds::query::QueryPlan;
use crate::error::{EdsError, ErrorCode, Result};

/// Target of the request/response log lines
pub const API_LOG_TARGET: &str = "eds_client_rs::api";

const MESSAGE_400: &str = "HTTP 400 : The request could not be understood by the server due to malformed syntax. Modify your search before retrying.";
const MESSAGE_404: &str = "HTTP 404 : The resource you are looking for might have been removed, had its name changed, or is temporarily unavailable.";
const MESSAGE_500: &str = "HTTP 500 : The server encountered an unexpected condition which prevented it from fulfilling the request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Method-specific request data
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    /// Sent as the query string
    Query(QueryPlan),
    /// Sent as the request body
    Body(String),
}

impl Payload {
    pub fn is_none(&self) -> bool {
        match self {
            Payload::None => true,
            Payload::Query(plan) => plan.is_empty(),
            Payload::Body(body) => body.is_empty(),
        }
    }
}

/// Thin wrapper around a reqwest client
#[derive(Clone)]
pub struct Transport {
    client: Client,
    log_requests: bool,
}

impl Transport {
    /// Build a transport from the client configuration
    ///
    /// Applies the per-call timeout, the user agent and a ten-hop redirect limit.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.effective_user_agent())
            .redirect(Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            log_requests: config.log_requests,
        })
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: Client, log_requests: bool) -> Self {
        Self {
            client,
            log_requests,
        }
    }

    /// Issue one request and classify the response
    ///
    /// # Arguments
    ///
    /// * `url` - Full endpoint URL
    /// * `payload` - Query parameters or body
    /// * `headers` - Extra headers (token headers)
    /// * `method` - HTTP method
    ///
    /// # Errors
    ///
    /// * `EdsError::RequestError` - Network failure or timeout
    /// * `EdsError::MalformedResponse` - 200 response whose body is not XML
    /// * `EdsError::ApiError` - Any non-200 status
    #[instrument(skip(self, payload, headers))]
    pub async fn send(
        &self,
        url: &str,
        payload: &Payload,
        headers: &[(&str, &str)],
        method: Method,
    ) -> Result<XmlNode> {
        let target = match payload {
            Payload::Query(plan) if !plan.is_empty() => {
                let separator = if url.contains('?') { '&' } else { '?' };
                format!("{}{}{}", url, separator, plan.to_query_string())
            }
            _ => url.to_string(),
        };

        let mut request = self
            .client
            .request(method.as_reqwest(), &target)
            .header(CONTENT_TYPE, "text/xml");

        // DELETE carries the token headers only alongside a payload
        if method != Method::Delete || !payload.is_none() {
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
        }
        if let Payload::Body(body) = payload {
            request = request.body(body.clone());
        }

        debug!(url = %target, "Sending EDS request");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if self.log_requests {
            let request_body = match payload {
                Payload::Body(b) => redact_password(b),
                _ => String::new(),
            };
            info!(
                target: API_LOG_TARGET,
                method = ?method,
                url = %target,
                request_body = %request_body,
                status,
                response_body = %body,
                "EDS API exchange"
            );
        }

        classify_response(status, &body)
    }

    /// GET a JSON document (used for the autocomplete endpoint)
    #[instrument(skip(self, plan))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, plan: &QueryPlan) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(&plan.iter().collect::<Vec<_>>())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if self.log_requests {
            info!(target: API_LOG_TARGET, url, status = status.as_u16(), response_body = %body, "EDS API exchange");
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "JSON request failed");
            return Err(http_failure(status.as_u16()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Mask the credential in an authentication request body
fn redact_password(body: &str) -> String {
    static PASSWORD: OnceLock<Regex> = OnceLock::new();
    let password = PASSWORD.get_or_init(|| {
        Regex::new(r"(?s)<Password>.*?</Password>").expect("Failed to compile password regex")
    });
    password
        .replace_all(body, "<Password>***</Password>")
        .into_owned()
}

/// Map an HTTP status and body onto a document or an error
pub fn classify_response(status: u16, body: &str) -> Result<XmlNode> {
    match status {
        200 => XmlNode::parse(body),
        400 => Err(remote_error(body).unwrap_or_else(|| http_failure(400))),
        other => {
            warn!(status = other, "EDS request failed");
            Err(http_failure(other))
        }
    }
}

/// Error code and description from a 400 body, when it has them
fn remote_error(body: &str) -> Option<EdsError> {
    let root = XmlNode::parse(body).ok()?;
    let code = ["ErrorNumber", "ErrorCode"]
        .iter()
        .map(|name| root.child_text(name))
        .find(|c| !c.is_empty())?;
    let message = ["DetailedErrorDescription", "ErrorDescription", "Reason"]
        .iter()
        .map(|name| root.child_text(name))
        .find(|m| !m.is_empty())
        .unwrap_or_default();

    let error = match code.parse::<u32>() {
        Ok(number) => EdsError::api(number, message),
        Err(_) => EdsError::ApiError {
            code: ErrorCode::Critical,
            message: if message.is_empty() { code } else { message },
        },
    };
    warn!(error = %error, "EDS reported an error");
    Some(error)
}

fn http_failure(status: u16) -> EdsError {
    let message = match status {
        400 => MESSAGE_400.to_string(),
        404 => MESSAGE_404.to_string(),
        500 => MESSAGE_500.to_string(),
        other => format!("HTTP {} : Unexpected HTTP error.", other),
    };
    EdsError::ApiError {
        code: ErrorCode::Critical,
        message,
    }
}
