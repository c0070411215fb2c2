//! Bridge between pipeline steps and the `llm` crate.

use std::time::Duration;

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use super::error::ModelError;

/// One text-generation request issued by a step.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub user_context: String,
    /// Budget for this call, supplied by the caller of the run.
    pub timeout: Option<Duration>,
}

/// Anything able to turn an instruction and a context into text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError>;
}

/// Settings used to build providers for [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub backend: LLMBackend,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// [`ModelClient`] backed by a hosted model through the `llm` crate.
///
/// A provider is built for every call so that each step gets its own system
/// instruction and timeout budget.
pub struct LlmClient {
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self { settings }
    }
}

/// Whole-second HTTP timeout for the provider; the exact budget is enforced
/// around the call itself.
fn http_timeout_secs(budget: Duration) -> u64 {
    budget.as_secs().max(1)
}

#[async_trait]
impl ModelClient for LlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let s = &self.settings;
        let mut builder = LLMBuilder::new()
            .backend(s.backend.clone())
            .model(&s.model)
            .system(&request.system_instruction);

        if !s.api_key.is_empty() {
            builder = builder.api_key(&s.api_key);
        }
        if let Some(base_url) = &s.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(max_tokens) = s.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = s.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout_seconds(http_timeout_secs(timeout));
        }

        let provider = builder.build()?;
        let messages = vec![ChatMessage::user().content(&request.user_context).build()];

        let call = provider.chat(&messages);
        let response = match request.timeout {
            Some(budget) => tokio::time::timeout(budget, call)
                .await
                .map_err(|_| ModelError::Timeout(budget))??,
            None => call.await?,
        };

        // Blank text is still a reply and is stored as-is.
        response.text().ok_or(ModelError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn client_for(addr: std::net::SocketAddr) -> LlmClient {
        LlmClient::new(LlmSettings {
            backend: LLMBackend::Groq,
            model: "test-model".to_string(),
            api_key: "test-key".to_string(),
            base_url: Some(format!("http://{}/", addr)),
            max_tokens: None,
            temperature: None,
        })
    }

    fn request(timeout: Option<Duration>) -> GenerateRequest {
        GenerateRequest {
            system_instruction: "Summarize.".to_string(),
            user_context: "Some text".to_string(),
            timeout,
        }
    }

    /// Reads one HTTP request (headers plus `Content-Length` body).
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if !name.trim().eq_ignore_ascii_case("content-length") {
                            return None;
                        }
                        value.trim().parse::<usize>().ok()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serves a single chat completion whose message content is `content`.
    async fn serve_completion(content: serde_json::Value) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let body = serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }],
                "usage": null
            })
            .to_string();
            let reply = format!(
                "HTTP/1.1 200 OK\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        addr
    }

    #[tokio::test]
    async fn silent_backend_hits_the_call_budget() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let budget = Duration::from_millis(200);
        let started = std::time::Instant::now();
        let err = client_for(addr)
            .generate(&request(Some(budget)))
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::Timeout(d) if d == budget), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn missing_content_is_an_empty_response() {
        let addr = serve_completion(serde_json::Value::Null).await;
        let err = client_for(addr)
            .generate(&request(Some(Duration::from_secs(5))))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse), "{:?}", err);
    }

    #[tokio::test]
    async fn whitespace_reply_is_returned_verbatim() {
        let addr = serve_completion(serde_json::json!("   ")).await;
        let text = client_for(addr)
            .generate(&request(Some(Duration::from_secs(5))))
            .await
            .unwrap();
        assert_eq!(text, "   ");
    }

    #[test]
    fn http_timeout_rounds_sub_second_budgets_up() {
        assert_eq!(http_timeout_secs(Duration::from_millis(200)), 1);
        assert_eq!(http_timeout_secs(Duration::ZERO), 1);
        assert_eq!(http_timeout_secs(Duration::from_millis(2500)), 2);
    }
}
