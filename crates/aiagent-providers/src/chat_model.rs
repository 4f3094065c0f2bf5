//! OpenAI-compatible chat-completions client.
//!
//! Both adapters talk to their endpoint through a [`ChatModel`]: Gemini via
//! Google's OpenAI-compatible surface, Ollama via its `/v1` API.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{future, stream, Stream, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use aiagent_core::config::clone_secret;
use aiagent_core::{
    Message, ProviderError, ProviderSettings, Result, Role, TokenUsage, ToolCall, ToolDefinition,
};

use crate::retry::RetryPolicy;
use crate::sse::{SseDecoder, SseFrame};

/// Stream of parsed completion chunks; consumed once.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Request for one chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Conversation so far
    pub messages: Vec<Message>,
    /// Tools the model may call
    pub tools: Vec<ToolDefinition>,
    /// Overrides the model's configured temperature
    pub temperature: Option<f32>,
    /// Stop sequences
    pub stop: Vec<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// A single user turn.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }
}

/// A complete chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Text content (empty when the model only called tools)
    pub content: String,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// `{token_usage, model_name, finish_reason}`
    pub response_metadata: Value,
}

impl ChatResponse {
    /// Token usage reported with this response.
    pub fn usage(&self) -> TokenUsage {
        TokenUsage::from_metadata_path(&self.response_metadata, &["token_usage"])
    }
}

/// One content frame of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    /// Text delta, absent when the frame carried none
    pub content: Option<String>,
    /// Partial tool calls
    pub tool_calls: Vec<ToolCallDelta>,
    /// Set on the last content frame
    pub finish_reason: Option<String>,
    /// Usage, when the endpoint reports it
    pub usage: Option<TokenUsage>,
}

impl ChatChunk {
    /// A trailing frame that only reports usage and carries no choice.
    pub fn is_usage_only(&self) -> bool {
        self.content.is_none()
            && self.tool_calls.is_empty()
            && self.finish_reason.is_none()
            && self.usage.is_some()
    }
}

/// Fragment of a streamed tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    /// Position of the call within the response
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Fragment of the JSON arguments string
    pub arguments: Option<String>,
}

/// One candidate of a batch generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    /// `{finish_reason}`
    pub generation_info: Value,
}

/// Result of [`ChatModel::generate`].
#[derive(Debug, Clone)]
pub struct LlmResult {
    /// One list of candidates per prompt, in prompt order
    pub generations: Vec<Vec<Generation>>,
    /// `{token_usage, model_name}` aggregated over the batch
    pub llm_output: Value,
}

/// Handle to one remote chat model.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct ChatModel {
    provider: String,
    model: String,
    temperature: f32,
    base_url: String,
    api_key: SecretString,
    fold_system_messages: bool,
    retry: RetryPolicy,
    client: Client,
}

impl ChatModel {
    /// Create a model handle from provider settings.
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            provider: settings.provider_name.clone(),
            model: settings.model_name.clone(),
            temperature: settings.temperature,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: clone_secret(&settings.api_key),
            fold_system_messages: false,
            retry: RetryPolicy::new(settings.max_retries),
            client: Client::new(),
        }
    }

    /// Send system instructions as part of the first user message.
    pub fn with_system_folding(mut self, fold: bool) -> Self {
        self.fold_system_messages = fold;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn folds_system_messages(&self) -> bool {
        self.fold_system_messages
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Generate a full completion.
    #[instrument(skip(self, request), fields(provider = %self.provider, model = %self.model))]
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = self.wire_request(&request, false);
        debug!("Sending chat completion request");

        let response = self
            .retry
            .run("chat completion", |_| self.send(&body))
            .await?;

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse {
                provider: self.provider.clone(),
                message: e.to_string(),
            })?;

        Ok(self.parse_response(parsed))
    }

    /// Generate a completion as a stream of chunks.
    ///
    /// Only the initial request is retried; once bytes flow, a transport
    /// failure is surfaced as a stream item and ends the stream.
    #[instrument(skip(self, request), fields(provider = %self.provider, model = %self.model))]
    pub async fn stream(&self, request: ChatRequest) -> Result<ChunkStream> {
        let body = self.wire_request(&request, true);
        debug!("Sending streaming chat completion request");

        let response = self
            .retry
            .run("streaming chat completion", |_| self.send(&body))
            .await?;

        Ok(decode_chunks(
            Box::pin(response.bytes_stream()),
            self.provider.clone(),
        ))
    }

    /// Complete a batch of independent prompts.
    pub async fn generate(&self, prompts: &[String]) -> Result<LlmResult> {
        let responses = future::try_join_all(
            prompts
                .iter()
                .map(|prompt| self.complete(ChatRequest::from_prompt(prompt.clone()))),
        )
        .await?;

        let mut usage = TokenUsage::default();
        let generations = responses
            .into_iter()
            .map(|response| {
                usage += response.usage();
                vec![Generation {
                    generation_info: json!({
                        "finish_reason": response.response_metadata["finish_reason"].clone(),
                    }),
                    text: response.content,
                }]
            })
            .collect();

        Ok(LlmResult {
            generations,
            llm_output: json!({
                "token_usage": usage.to_value(),
                "model_name": self.model,
            }),
        })
    }

    async fn send(&self, body: &WireRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&self.provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text);
            error!("{} API error: {} - {}", self.provider, status, message);
            return Err(ProviderError::api_error(&self.provider, status.as_u16(), message).into());
        }

        Ok(response)
    }

    fn wire_request(&self, request: &ChatRequest, stream: bool) -> WireRequest {
        let messages = if self.fold_system_messages {
            fold_system_messages(&request.messages)
        } else {
            request.messages.iter().map(WireMessage::from).collect()
        };

        WireRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            tools: request.tools.iter().map(WireTool::from).collect(),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
            stop: request.stop.clone(),
        }
    }

    fn parse_response(&self, response: WireResponse) -> ChatResponse {
        let choice = response.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());

        let (content, tool_calls) = match choice {
            Some(choice) => {
                let tool_calls = choice
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| {
                        ToolCall::new(
                            tc.id,
                            tc.function.name,
                            serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
                        )
                    })
                    .collect();
                (choice.message.content.unwrap_or_default(), tool_calls)
            }
            None => (String::new(), Vec::new()),
        };

        let usage = response.usage.map(TokenUsage::from).unwrap_or_default();

        ChatResponse {
            content,
            tool_calls,
            response_metadata: json!({
                "token_usage": usage.to_value(),
                "model_name": response.model.unwrap_or_else(|| self.model.clone()),
                "finish_reason": finish_reason,
            }),
        }
    }
}

impl std::fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatModel")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("fold_system_messages", &self.fold_system_messages)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Turn a byte stream carrying SSE into completion chunks.
pub fn decode_chunks<S, B, E>(bytes: S, provider: String) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
        provider,
    };

    let chunks = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.pending.pop_front() {
                return Some((Ok(chunk), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => match state.decoder.push(bytes.as_ref()) {
                    Ok(frames) => {
                        for frame in frames {
                            state.accept(frame);
                        }
                    }
                    Err(e) => {
                        state.done = true;
                        error!("{} stream error: {}", state.provider, e);
                        let err = ProviderError::StreamError {
                            provider: state.provider.clone(),
                            message: e.to_string(),
                        };
                        return Some((Err(err.into()), state));
                    }
                },
                Some(Err(e)) => {
                    state.done = true;
                    error!("{} stream error: {}", state.provider, e);
                    let err = ProviderError::StreamError {
                        provider: state.provider.clone(),
                        message: e.to_string(),
                    };
                    return Some((Err(err.into()), state));
                }
                None => {
                    if let Some(frame) = state.decoder.finish() {
                        state.accept(frame);
                    }
                    state.done = true;
                }
            }
        }
    });

    Box::pin(chunks)
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<ChatChunk>,
    done: bool,
    provider: String,
}

impl<S> DecodeState<S> {
    fn accept(&mut self, frame: SseFrame) {
        if self.done {
            return;
        }
        if frame.is_done() {
            self.done = true;
            return;
        }

        match parse_chunk(&frame.data) {
            Ok(Some(chunk)) => self.pending.push_back(chunk),
            Ok(None) => {}
            Err(e) => warn!("Skipping unparsable SSE frame from {}: {}", self.provider, e),
        }
    }
}

/// Parse one `chat.completion.chunk` payload.
fn parse_chunk(data: &str) -> serde_json::Result<Option<ChatChunk>> {
    let chunk: WireChunk = serde_json::from_str(data)?;
    let usage = chunk.usage.map(TokenUsage::from);

    let Some(choice) = chunk.choices.unwrap_or_default().into_iter().next() else {
        return Ok(usage.map(|usage| ChatChunk {
            usage: Some(usage),
            ..Default::default()
        }));
    };

    let delta = choice.delta.unwrap_or_default();
    let tool_calls = delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            }
        })
        .collect();

    Ok(Some(ChatChunk {
        content: delta.content,
        tool_calls,
        finish_reason: choice.finish_reason,
        usage,
    }))
}

/// Merge system instructions into the first user message.
///
/// Some endpoints reject the system role; the instructions are prepended to
/// the first user turn instead, or become a user turn of their own when the
/// conversation has none.
fn fold_system_messages(messages: &[Message]) -> Vec<WireMessage> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let mut wire: Vec<WireMessage> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(WireMessage::from)
        .collect();

    if system.is_empty() {
        return wire;
    }
    let instructions = system.join("\n\n");

    match wire.iter_mut().find(|m| m.role == Role::User.as_str()) {
        Some(first_user) => {
            first_user.content = format!("{}\n\n{}", instructions, first_user.content);
        }
        None => wire.insert(0, WireMessage::text(Role::User, instructions)),
    }
    wire
}

fn transport_error(provider: &str, e: reqwest::Error) -> aiagent_core::Error {
    if e.is_timeout() {
        ProviderError::Timeout {
            provider: provider.to_string(),
        }
        .into()
    } else {
        ProviderError::NetworkError {
            provider: provider.to_string(),
            message: e.to_string(),
        }
        .into()
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.pointer("/0/error/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// Wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: Role, content: String) -> Self {
        Self {
            role: role.as_str(),
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    tool_type: "function".to_string(),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction,
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default)]
    tool_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens, usage.total_tokens)
    }
}

// Streaming types

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Option<Vec<WireChunkChoice>>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    #[serde(default)]
    delta: Option<WireDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiagent_core::ProviderOverrides;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            provider_name: "test".to_string(),
            model_name: "m".to_string(),
            base_url: "http://localhost:9/v1/".to_string(),
            api_key: SecretString::from("k".to_string()),
            temperature: 0.5,
            max_retries: 1,
        }
    }

    fn collect(stream: ChunkStream) -> Vec<Result<ChatChunk>> {
        futures::executor::block_on(stream.collect())
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let model = ChatModel::new(&settings());
        assert_eq!(model.base_url(), "http://localhost:9/v1");
        assert_eq!(model.retry_policy().max_retries, 1);
        assert!(!model.folds_system_messages());
    }

    #[test]
    fn test_request_uses_configured_temperature_unless_overridden() {
        let model = ChatModel::new(&settings().with_overrides(ProviderOverrides::none().temperature(0.2)));

        let body = model.wire_request(&ChatRequest::from_prompt("hi"), false);
        assert_eq!(body.temperature, 0.2);
        assert!(body.stream_options.is_none());

        let body = model.wire_request(&ChatRequest::from_prompt("hi").with_temperature(Some(0.9)), true);
        assert_eq!(body.temperature, 0.9);
        assert!(body.stream_options.is_some());
    }

    #[test]
    fn test_fold_system_into_first_user_message() {
        let messages = vec![
            Message::system("Be brief."),
            Message::assistant("earlier"),
            Message::user("Hi"),
            Message::user("Again"),
        ];

        let wire = fold_system_messages(&messages);
        assert_eq!(wire.len(), 3);
        assert!(wire.iter().all(|m| m.role != "system"));
        assert_eq!(wire[1].content, "Be brief.\n\nHi");
        assert_eq!(wire[2].content, "Again");
    }

    #[test]
    fn test_fold_system_without_user_message() {
        let wire = fold_system_messages(&[Message::system("Only instructions")]);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[0].content, "Only instructions");
    }

    #[test]
    fn test_parse_response_builds_metadata() {
        let model = ChatModel::new(&settings());
        let response: WireResponse = serde_json::from_value(json!({
            "model": "served-model",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "how_many_jokes", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        }))
        .unwrap();

        let parsed = model.parse_response(response);
        assert_eq!(parsed.content, "");
        assert_eq!(parsed.tool_calls[0].name, "how_many_jokes");
        assert_eq!(parsed.response_metadata["model_name"], "served-model");
        assert_eq!(parsed.response_metadata["finish_reason"], "tool_calls");
        assert_eq!(parsed.usage(), TokenUsage::new(5, 7, 12));
    }

    #[test]
    fn test_parse_chunk_variants() {
        let chunk = parse_chunk(r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.content.as_deref(), Some("Hi"));

        let chunk = parse_chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.content, None);
        assert_eq!(chunk.finish_reason.as_deref(), Some("stop"));

        let chunk = parse_chunk(r#"{"choices":[],"usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#)
            .unwrap()
            .unwrap();
        assert!(chunk.is_usage_only());

        assert!(parse_chunk(r#"{"choices":[]}"#).unwrap().is_none());
        assert!(parse_chunk("not json").is_err());
    }

    #[test]
    fn test_decode_stops_at_done_and_skips_garbage() {
        let body: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: nonsense\n\n".to_vec()),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\ndata: [DONE]\n\n".to_vec()),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n".to_vec()),
        ];

        let chunks = collect(decode_chunks(stream::iter(body), "test".to_string()));
        let text: Vec<_> = chunks
            .into_iter()
            .map(|c| c.unwrap().content.unwrap_or_default())
            .collect();
        assert_eq!(text, ["a", "b"]);
    }

    #[test]
    fn test_decode_surfaces_transport_error_once() {
        let body: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n".to_vec()),
        ];

        let chunks = collect(decode_chunks(stream::iter(body), "test".to_string()));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(chunks[1].as_ref().unwrap_err().to_string().contains("reset"));
    }

    #[test]
    fn test_decode_ends_on_unterminated_oversized_line() {
        let mut body: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![Ok(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".to_vec(),
        )];
        body.extend((0..20).map(|_| Ok(vec![b'x'; 64 * 1024])));

        let chunks = collect(decode_chunks(stream::iter(body), "test".to_string()));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        let message = chunks[1].as_ref().unwrap_err().to_string();
        assert!(message.contains("exceeds"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(error_message(r#"[{"error":{"message":"quota"}}]"#), "quota");
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }
}
