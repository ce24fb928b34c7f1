use crate::config::Settings;
use crate::domain::settings::ApiConfig;
use crate::llm::error::AnalysisError;
use crate::llm::{CompletionRequest, LlmClient, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 2500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const OPENROUTER_TITLE: &str = "Equity Intelligence Platform";

/// HTTP settings shared by every analysis a process runs.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    pub http: reqwest::Client,
    /// Replaces the provider's chat-completions URL.
    pub endpoint: Option<String>,
    /// Public URL of this deployment, sent to OpenRouter as `HTTP-Referer`.
    pub app_url: Option<String>,
}

impl Transport {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: None,
            app_url: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(settings.timeout_secs)?,
            endpoint: settings.base_url.clone(),
            app_url: settings.app_url.clone(),
        })
    }

    /// Client for `config`, with this transport's overrides applied.
    pub fn connect(&self, config: &ApiConfig) -> Result<ChatCompletionsClient, AnalysisError> {
        let mut client = ChatCompletionsClient::from_config(self.http.clone(), config)?;
        if let Some(endpoint) = &self.endpoint {
            client = client.with_endpoint(endpoint.clone());
        }
        if let Some(url) = &self.app_url {
            client = client.with_referer(url);
        }
        Ok(client)
    }
}

/// OpenAI-compatible chat-completions client (OpenAI, Perplexity, OpenRouter).
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    provider: Provider,
    auth: HeaderValue,
    referer: Option<HeaderValue>,
    endpoint: String,
}

impl ChatCompletionsClient {
    /// Builds a client for the configured provider.
    ///
    /// Fails before anything touches the network: [`AnalysisError::MissingCredential`] for
    /// an empty key, [`AnalysisError::InvalidCredential`] for one that cannot be sent as a
    /// header.
    pub fn from_config(
        http: reqwest::Client,
        config: &ApiConfig,
    ) -> Result<Self, AnalysisError> {
        if !config.has_api_key() {
            return Err(AnalysisError::MissingCredential {
                provider: config.provider,
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|e| AnalysisError::InvalidCredential {
                provider: config.provider,
                detail: e.to_string(),
            })?;
        auth.set_sensitive(true);

        Ok(Self {
            http,
            provider: config.provider,
            auth,
            referer: None,
            endpoint: config.provider.endpoint().to_string(),
        })
    }

    /// Points the client at a different chat-completions URL (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the `HTTP-Referer` OpenRouter attributes traffic to. Invalid values are dropped.
    pub fn with_referer(mut self, url: &str) -> Self {
        match HeaderValue::from_str(url.trim()) {
            Ok(value) => self.referer = Some(value),
            Err(e) => tracing::warn!(error = %e, "ignoring app url that is not a valid header value"),
        }
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.auth.clone());
        if self.provider == Provider::OpenRouter {
            if let Some(referer) = &self.referer {
                headers.insert("HTTP-Referer", referer.clone());
            }
            headers.insert("X-Title", HeaderValue::from_static(OPENROUTER_TITLE));
        }
        headers
    }

    fn body(req: CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: req.model,
            messages: vec![
                Message {
                    role: "system",
                    content: req.system_prompt,
                },
                Message {
                    role: "user",
                    content: req.user_prompt,
                },
            ],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: false,
        }
    }

    fn network_error(&self, err: impl std::fmt::Display) -> AnalysisError {
        AnalysisError::Network {
            provider: self.provider,
            detail: err.to_string(),
        }
    }
}

/// Shared HTTP client with the default request timeout.
pub fn http_client(timeout_secs: Option<u64>) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)))
        .build()
        .context("failed to build reqwest client")
}

#[async_trait::async_trait]
impl LlmClient for ChatCompletionsClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(&self, req: CompletionRequest) -> Result<String, AnalysisError> {
        let headers = self.headers();
        let model = req.model.clone();

        tracing::debug!(provider = self.provider.key(), %model, endpoint = %self.endpoint, "sending chat completion");

        let res = self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .json(&Self::body(req))
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| self.network_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|env| env.error)
                .and_then(|e| e.message);
            tracing::warn!(provider = self.provider.key(), %model, status = status.as_u16(), "provider returned an error status");
            return Err(AnalysisError::Http {
                provider: self.provider,
                status: status.as_u16(),
                message,
            });
        }

        let parsed = serde_json::from_str::<ChatResponse>(&text).map_err(|e| AnalysisError::Parse {
            provider: Some(self.provider),
            detail: format!("failed to decode chat completion envelope: {e}"),
            raw_output: Some(text.clone()),
        })?;

        Ok(parsed.first_content())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatResponse {
    fn first_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;

    fn config(provider: Provider) -> ApiConfig {
        ApiConfig {
            api_key: "sk-test".to_string(),
            ..ApiConfig::default().with_provider(provider)
        }
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let err = ChatCompletionsClient::from_config(reqwest::Client::new(), &ApiConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingCredential {
                provider: Provider::OpenRouter
            }
        ));
    }

    #[test]
    fn request_body_matches_wire_format() {
        let body = ChatCompletionsClient::body(CompletionRequest {
            model: "sonar-pro".to_string(),
            system_prompt: "sys".to_string(),
            user_prompt: "usr".to_string(),
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "sonar-pro",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"},
                ],
                "temperature": 0.2,
                "max_tokens": 2500,
                "stream": false,
            })
        );
    }

    #[test]
    fn only_openrouter_gets_attribution_headers() {
        let transport = Transport {
            app_url: Some("https://research.example.com/app".to_string()),
            ..Transport::default()
        };
        let router = transport.connect(&config(Provider::OpenRouter)).unwrap();
        let headers = router.headers();
        assert_eq!(headers.get("X-Title").unwrap(), OPENROUTER_TITLE);
        assert_eq!(headers.get("HTTP-Referer").unwrap(), "https://research.example.com/app");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());

        let openai = transport.connect(&config(Provider::OpenAI)).unwrap();
        let headers = openai.headers();
        assert!(headers.get("X-Title").is_none());
        assert!(headers.get("HTTP-Referer").is_none());
        assert_eq!(openai.endpoint(), Provider::OpenAI.endpoint());
    }

    #[test]
    fn referer_is_omitted_without_an_app_url() {
        let router = Transport::default().connect(&config(Provider::OpenRouter)).unwrap();
        let headers = router.headers();
        assert!(headers.get("HTTP-Referer").is_none());
        assert_eq!(headers.get("X-Title").unwrap(), OPENROUTER_TITLE);
    }

    #[test]
    fn unsendable_key_is_a_credential_error() {
        let bad = ApiConfig {
            api_key: "sk-\nsplit".to_string(),
            ..ApiConfig::default()
        };
        let err = ChatCompletionsClient::from_config(reqwest::Client::new(), &bad).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidCredential {
                provider: Provider::OpenRouter,
                ..
            }
        ));
        assert_eq!(err.stage(), "credentials");
        assert!(!err.user_message().contains("Network"));
    }

    #[test]
    fn transport_endpoint_overrides_provider_url() {
        let transport = Transport {
            endpoint: Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            ..Transport::default()
        };
        let client = transport.connect(&config(Provider::Perplexity)).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/v1/chat/completions");
    }

    #[test]
    fn first_choice_content_or_empty() {
        let res: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"verdict\":\"BULLISH\"}"}}]
        }))
        .unwrap();
        assert_eq!(res.first_content(), "{\"verdict\":\"BULLISH\"}");

        let empty: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(empty.first_content(), "");
    }

    #[test]
    fn error_envelope_message_is_extracted() {
        let env: ErrorEnvelope =
            serde_json::from_str(r#"{"error":{"message":"Rate limit exceeded","code":429}}"#).unwrap();
        assert_eq!(env.error.unwrap().message.as_deref(), Some("Rate limit exceeded"));
    }

    /// Answers exactly one request on a loopback port with a canned response.
    ///
    /// The handle yields the raw request so tests can inspect what was sent.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        (format!("http://{addr}/v1/chat/completions"), handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn local_client(provider: Provider, endpoint: String) -> ChatCompletionsClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        Transport {
            endpoint: Some(endpoint),
            app_url: Some("https://research.example.com".to_string()),
            ..Transport::new(http)
        }
        .connect(&config(provider))
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openai/gpt-4o".to_string(),
            system_prompt: "sys".to_string(),
            user_prompt: "Analyze Ticker: NVDA.".to_string(),
        }
    }

    #[tokio::test]
    async fn success_returns_first_choice_content() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"verdict\":\"BULLISH\"}"}}]}"#,
        );
        let text = local_client(Provider::OpenRouter, url)
            .complete(request())
            .await
            .unwrap();
        assert_eq!(text, "{\"verdict\":\"BULLISH\"}");

        let sent = server.join().unwrap();
        let lower = sent.to_lowercase();
        assert!(sent.starts_with("POST /v1/chat/completions"));
        assert!(lower.contains("authorization: bearer sk-test"));
        assert!(lower.contains("http-referer: https://research.example.com"));
        assert!(lower.contains("x-title: equity intelligence platform"));
        assert!(sent.contains("\"stream\":false"));
    }

    #[tokio::test]
    async fn error_status_carries_provider_message() {
        let (url, server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Invalid key","code":401}}"#,
        );
        let err = local_client(Provider::OpenAI, url)
            .complete(request())
            .await
            .unwrap_err();
        server.join().unwrap();

        match &err {
            AnalysisError::Http {
                provider,
                status,
                message,
            } => {
                assert_eq!(*provider, Provider::OpenAI);
                assert_eq!(*status, 401);
                assert_eq!(message.as_deref(), Some("Invalid key"));
            }
            other => panic!("expected an http error, got {other:?}"),
        }
        assert_eq!(err.user_message(), "Invalid key");
    }

    #[tokio::test]
    async fn error_status_without_json_falls_back_to_code() {
        let (url, server) = serve_once("500 Internal Server Error", "upstream exploded");
        let err = local_client(Provider::Perplexity, url)
            .complete(request())
            .await
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, AnalysisError::Http { status: 500, message: None, .. }));
        assert_eq!(err.user_message(), "API Error: 500");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let err = local_client(Provider::OpenAI, "http://127.0.0.1:1/v1/chat/completions".to_string())
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Network { provider: Provider::OpenAI, .. }));
        assert_eq!(err.user_message(), crate::llm::error::NETWORK_MESSAGE);
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_parse_error() {
        let (url, server) = serve_once("200 OK", "<html>gateway</html>");
        let err = local_client(Provider::OpenRouter, url)
            .complete(request())
            .await
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, AnalysisError::Parse { .. }));
        assert_eq!(err.raw_output(), Some("<html>gateway</html>"));
    }
}
