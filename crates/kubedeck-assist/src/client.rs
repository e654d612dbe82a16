//! Chat completions client that drafts manifests

use serde::{Deserialize, Serialize};

use crate::config::{API_KEY_ENV, AssistConfig};
use crate::error::{AssistError, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Asks a language model for a manifest of a given kind
pub struct DraftClient {
    client: reqwest::Client,
    config: AssistConfig,
    api_key: String,
}

impl DraftClient {
    /// Create a client; fails when the config carries no API key
    pub fn new(config: AssistConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(AssistError::MissingApiKey { env: API_KEY_ENV })?;

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Draft a `yaml_type` manifest matching `query`
    pub async fn draft(&self, yaml_type: &str, query: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt(yaml_type, query),
            }],
        };

        tracing::debug!(model = %self.config.model, yaml_type, "requesting manifest draft");

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "drafting assistant rejected the request");
            return Err(AssistError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| strip_fences(&content).to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AssistError::EmptyResponse)
    }
}

fn prompt(yaml_type: &str, query: &str) -> String {
    format!(
        "only provide the yaml, and no extra text / formatting (i.e. ```) for the following - \
         create a {} yaml for: {}. if you are unsure, just provide a basic sample yaml.",
        yaml_type, query
    )
}

/// Drop a surrounding markdown code fence, if the model added one anyway
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DraftClient {
        let config = AssistConfig::default()
            .with_base_url(format!("{}/openai/v1", server.uri()))
            .with_api_key("gsk_test");
        DraftClient::new(config).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_missing_api_key() {
        let err = DraftClient::new(AssistConfig::default()).err().unwrap();
        assert!(matches!(err, AssistError::MissingApiKey { env: "GROQ_API_KEY" }));
    }

    #[test]
    fn test_prompt() {
        let text = prompt("deployment", "nginx with 3 replicas");
        assert!(text.starts_with("only provide the yaml"));
        assert!(text.contains("create a deployment yaml for: nginx with 3 replicas."));
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("kind: Pod\n"), "kind: Pod");
        assert_eq!(strip_fences("```yaml\nkind: Pod\n```"), "kind: Pod");
        assert_eq!(strip_fences("```\nkind: Pod\n```\n"), "kind: Pod");
    }

    #[tokio::test]
    async fn test_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(bearer_token("gsk_test"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.3-70b-versatile"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "apiVersion: v1\nkind: Pod\nmetadata:\n  name: web\n",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let manifest = client_for(&server).draft("pod", "an nginx pod").await.unwrap();
        assert!(manifest.starts_with("apiVersion: v1"));
        assert!(manifest.contains("kind: Pod"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server).draft("pod", "x").await.unwrap_err();
        match err {
            AssistError::Status { code, body } => {
                assert_eq!(code, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).draft("pod", "x").await.unwrap_err();
        assert!(matches!(err, AssistError::EmptyResponse));
    }
}
