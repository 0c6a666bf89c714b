use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::build_headers;
use crate::payload::{ChatRequest, ChatResponse};
use crate::url::normalize_chat_url;

/// Optional cancellation signal polled while a request is in flight.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

/// One completed exchange: the parsed reply plus the JSON it was parsed from.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub raw: Value,
    pub response: ChatResponse,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        validate_request(request)?;

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(request))
    }

    /// Sends one request and waits for the full reply. No retries.
    pub async fn complete(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatCompletion, ChatApiError> {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        let response = await_or_cancel(self.build_request(request)?.send(), cancellation).await??;
        let status = response.status();
        let body = await_or_cancel(response.text(), cancellation).await??;

        if !status.is_success() {
            return Err(ChatApiError::Status(status, parse_error_message(status, &body)));
        }

        parse_completion(&body)
    }
}

/// Parses a successful response body, keeping the raw JSON alongside.
pub fn parse_completion(body: &str) -> Result<ChatCompletion, ChatApiError> {
    let raw: Value = serde_json::from_str(body)?;
    let response: ChatResponse = serde_json::from_value(raw.clone())?;
    if response.choices.is_empty() {
        return Err(ChatApiError::MalformedResponse(
            "response carried no choices".to_owned(),
        ));
    }
    Ok(ChatCompletion { raw, response })
}

fn validate_request(request: &ChatRequest) -> Result<(), ChatApiError> {
    if request.model.trim().is_empty() {
        return Err(ChatApiError::InvalidRequest(
            "model must not be empty".to_owned(),
        ));
    }
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_completion_keeps_raw_json() {
        let body = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}]}"#;

        let completion = parse_completion(body).expect("valid completion");

        assert_eq!(completion.raw["id"], "c1");
        assert_eq!(
            completion.response.first_message().and_then(|m| m.text()),
            Some("hi")
        );
    }

    #[test]
    fn parse_completion_rejects_empty_choices() {
        let error = parse_completion(r#"{"choices":[]}"#).expect_err("no choices");
        assert!(matches!(error, ChatApiError::MalformedResponse(_)));
    }

    #[test]
    fn parse_completion_surfaces_invalid_json() {
        let error = parse_completion("not json").expect_err("invalid JSON");
        assert!(matches!(error, ChatApiError::Serde(_)));
    }

    #[tokio::test]
    async fn cancelled_signal_short_circuits_before_sending() {
        let client = ChatApiClient::new(ChatApiConfig::new("key")).expect("client");
        let cancel: CancellationSignal = Arc::new(AtomicBool::new(true));
        let request = ChatRequest::new("gpt-5", Vec::new());

        let error = client
            .complete(&request, Some(&cancel))
            .await
            .expect_err("cancelled");

        assert!(matches!(error, ChatApiError::Cancelled));
    }
}
