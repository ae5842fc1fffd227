use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;

use crate::conversation::{AssistantReply, ChatBackend, ChatMessage, ToolCall, ToolSpec};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

pub fn chat_completions_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/chat/completions")
}

pub fn embeddings_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/embeddings")
}

/// Shared HTTP plumbing for the chat and embeddings endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        // Only the connect phase is bounded here; request deadlines belong to the caller.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let mut request = self.http.post(endpoint).json(body);
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))?;

        let status = response.status();
        let raw = response.text().await.context("read OpenAI response body")?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("OpenAI API error ({status}): {message}");
        }

        serde_json::from_str(&raw).context("parse OpenAI response")
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        temperature: f32,
    ) -> anyhow::Result<AssistantReply> {
        let endpoint = chat_completions_endpoint(&self.base_url);
        let body = chat_request_body(model, messages, tools, temperature);
        let value = self.post_json(&endpoint, &body).await?;
        extract_assistant_reply(value).context("extract assistant message")
    }

    pub async fn embeddings(&self, model: &str, inputs: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let endpoint = embeddings_endpoint(&self.base_url);
        let body = serde_json::json!({
            "model": model,
            "input": inputs,
        });
        let value = self.post_json(&endpoint, &body).await?;
        extract_embeddings(value).context("extract embeddings")
    }
}

fn chat_request_body(
    model: &str,
    messages: &[ChatMessage],
    tools: &[ToolSpec],
    temperature: f32,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
    });
    let Some(obj) = body.as_object_mut() else {
        return body;
    };

    // NOTE: Some GPT-5 models reject sampling params like `temperature`.
    if !model.starts_with("gpt-5") {
        obj.insert("temperature".to_owned(), serde_json::json!(temperature));
    }

    if !tools.is_empty() {
        let tools = tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect::<Vec<_>>();
        obj.insert("tools".to_owned(), serde_json::Value::Array(tools));
        obj.insert("tool_choice".to_owned(), serde_json::json!("auto"));
    }

    body
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

fn extract_assistant_reply(value: serde_json::Value) -> anyhow::Result<AssistantReply> {
    let response: ChatCompletionResponse =
        serde_json::from_value(value).context("decode chat completion")?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing `choices[0]` in response"))?;
    Ok(AssistantReply {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

fn extract_embeddings(value: serde_json::Value) -> anyhow::Result<Vec<Vec<f32>>> {
    let mut response: EmbeddingResponse =
        serde_json::from_value(value).context("decode embeddings response")?;
    response.data.sort_by_key(|item| item.index);
    Ok(response
        .data
        .into_iter()
        .map(|item| item.embedding)
        .collect())
}

/// [`ChatBackend`] over the Chat Completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> anyhow::Result<AssistantReply> {
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "openai chat completion"
        );
        self.client
            .chat_completion(&self.model, messages, tools, self.temperature)
            .await
    }
}
