//! Gemini API client
//!
//! Chat completion with function calling, and batch text embeddings.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::agent::ChatModel;
use crate::config::AgentConfig;
use crate::conversation::{Conversation, MessageContent};
use crate::error::AgentError;
use crate::index::EmbeddingProvider;
use crate::models::{EmbeddingVector, ModelReply, ToolSpec};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

const MAX_OUTPUT_TOKENS: i32 = 1024;

/// The key travels in a header so it never shows up in URLs or error text.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    /// POST a JSON body and decode the JSON reply. Errors come back as text
    /// so callers can file them under the right service.
    async fn post_json<B, R>(&self, url: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("{}: {}", status, error_text));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| format!("invalid response: {}", e))
    }

    /// Generate the next step of the conversation.
    pub async fn generate(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<ModelReply> {
        let request = GenerateRequest {
            contents: contents_from(conversation),
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(conversation.system_prompt())],
            },
            tools: if tools.is_empty() {
                Vec::new()
            } else {
                vec![ToolDeclarations {
                    function_declarations: tools.iter().map(FunctionDeclaration::from).collect(),
                }]
            },
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        debug!(
            model = %self.chat_model,
            messages = conversation.message_count(),
            "Calling Gemini generateContent"
        );

        let url = self.endpoint(&self.chat_model, "generateContent");
        let response: GenerateResponse = self.post_json(&url, &request).await.map_err(|e| {
            error!("Gemini generateContent failed: {}", e);
            AgentError::ModelServiceError(format!("Gemini API error: {}", e))
        })?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        parse_reply(response)
    }

    /// Embed a batch of texts with the embedding model.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = format!("models/{}", self.embedding_model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model.clone(),
                    content: Content {
                        role: None,
                        parts: vec![Part::text(text)],
                    },
                })
                .collect(),
        };

        debug!(
            model = %self.embedding_model,
            texts = texts.len(),
            "Calling Gemini batchEmbedContents"
        );

        let url = self.endpoint(&self.embedding_model, "batchEmbedContents");
        let response: BatchEmbedResponse =
            self.post_json(&url, &request).await.map_err(|e| {
                error!("Gemini batchEmbedContents failed: {}", e);
                AgentError::EmbeddingServiceError(format!("Gemini API error: {}", e))
            })?;

        if response.embeddings.len() != texts.len() {
            return Err(AgentError::EmbeddingServiceError(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|e| EmbeddingVector(e.values))
            .collect())
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn respond(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Result<ModelReply> {
        self.generate(conversation, tools).await
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        self.embed_batch(texts).await
    }
}

/// Map the turn's conversation onto Gemini `contents`.
fn contents_from(conversation: &Conversation) -> Vec<Content> {
    conversation
        .messages()
        .map(|message| match &message.content {
            MessageContent::Text { text } => Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(text)],
            },
            MessageContent::ToolCall { name, args } => Content {
                role: Some("model".to_string()),
                parts: vec![Part {
                    function_call: Some(FunctionCall {
                        name: name.clone(),
                        args: args.clone(),
                    }),
                    ..Part::default()
                }],
            },
            MessageContent::ToolResult { name, content } => Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    function_response: Some(FunctionResponse {
                        name: name.clone(),
                        response: json!({ "content": content }),
                    }),
                    ..Part::default()
                }],
            },
        })
        .collect()
}

/// A function call anywhere in the first candidate wins over its text.
fn parse_reply(response: GenerateResponse) -> Result<ModelReply> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        AgentError::ModelServiceError("No candidates in Gemini response".to_string())
    })?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    if let Some(call) = parts.iter().find_map(|p| p.function_call.as_ref()) {
        let argument = call
            .args
            .get("query")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| call.args.to_string());

        return Ok(ModelReply::ToolRequest {
            name: call.name.clone(),
            argument,
            args: call.args.clone(),
        });
    }

    let text = parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(AgentError::ModelServiceError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(ModelReply::FinalAnswer(text.trim().to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolSpec> for FunctionDeclaration {
    fn from(spec: &ToolSpec) -> Self {
        let mut properties = serde_json::Map::new();
        properties.insert(
            spec.argument.clone(),
            json!({
                "type": "STRING",
                "description": spec.argument_description,
            }),
        );

        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: json!({
                "type": "OBJECT",
                "properties": properties,
                "required": [spec.argument],
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
