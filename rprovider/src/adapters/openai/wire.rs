//! OpenAI-compatible HTTP payload models and conversion helpers. Shared by
//! every adapter speaking this wire dialect; nothing here leaks outside the
//! adapter modules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AdapterError, ChatRequest, ContentPart, FinishReason, ImageSize, Message, ProviderKind,
    RequestInput, StreamFrame, ToolCall, ToolChoice, ToolDefinition, stream::FrameDecoder,
};

/// Builds the endpoint path and JSON body for one canonical request:
/// message input targets the chat endpoint, prompt input the legacy
/// completions endpoint.
pub(crate) fn request_body(
    request: &ChatRequest,
    stream: bool,
) -> Result<(&'static str, Value), AdapterError> {
    match &request.input {
        RequestInput::Messages(messages) => {
            let body = ApiChatBody {
                model: request.model.clone(),
                messages: messages.iter().map(api_message).collect(),
                stream,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
                presence_penalty: request.presence_penalty,
                frequency_penalty: request.frequency_penalty,
                tools: api_tools(&request.tools),
                tool_choice: request.tool_choice.as_ref().map(tool_choice_value),
            };

            Ok(("chat/completions", to_body(&body)?))
        }
        RequestInput::Prompt(prompt) => {
            let body = ApiCompletionBody {
                model: request.model.clone(),
                prompt: prompt.clone(),
                stream,
                max_tokens: request.max_tokens,
            };

            Ok(("completions", to_body(&body)?))
        }
    }
}

pub(crate) fn image_body(model: Option<&str>, prompt: &str, size: ImageSize) -> Value {
    let mut body = serde_json::json!({
        "prompt": prompt,
        "size": size.as_str(),
        "n": 1,
    });

    if let Some(model) = model {
        body["model"] = Value::String(model.to_string());
    }

    body
}

pub(crate) fn parse_chat_response(
    provider: ProviderKind,
    fallback_model: &str,
    value: Value,
) -> Result<crate::Completion, AdapterError> {
    let parsed: ApiChatResponse = serde_json::from_value(value)
        .map_err(|err| AdapterError::provider(provider, format!("cannot parse response: {err}")))?;

    if let Some(error) = parsed.error {
        return Err(AdapterError::provider(provider, error.message));
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdapterError::provider(provider, "response did not include choices"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(ToolCall::from)
        .collect::<Vec<_>>();

    Ok(crate::Completion {
        model: parsed.model.unwrap_or_else(|| fallback_model.to_string()),
        text: flatten_content(choice.message.content),
        tool_calls,
        finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
    })
}

pub(crate) fn parse_completion_response(
    provider: ProviderKind,
    fallback_model: &str,
    value: Value,
) -> Result<crate::Completion, AdapterError> {
    let parsed: ApiCompletionResponse = serde_json::from_value(value)
        .map_err(|err| AdapterError::provider(provider, format!("cannot parse response: {err}")))?;

    if let Some(error) = parsed.error {
        return Err(AdapterError::provider(provider, error.message));
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdapterError::provider(provider, "response did not include choices"))?;

    Ok(crate::Completion {
        model: parsed.model.unwrap_or_else(|| fallback_model.to_string()),
        text: choice.text,
        tool_calls: Vec::new(),
        finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
    })
}

pub(crate) fn parse_image_response(
    provider: ProviderKind,
    value: Value,
) -> Result<String, AdapterError> {
    let parsed: ApiImageResponse = serde_json::from_value(value)
        .map_err(|err| AdapterError::provider(provider, format!("cannot parse response: {err}")))?;

    if let Some(error) = parsed.error {
        return Err(AdapterError::provider(provider, error.message));
    }

    parsed
        .data
        .into_iter()
        .next()
        .map(|datum| datum.url)
        .ok_or_else(|| AdapterError::provider(provider, "image response contained no data"))
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> FinishReason {
    match value {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}

/// Decodes one SSE `data:` payload of the chat or completions dialect.
/// An error envelope (bare, or nested under `data` the way some proxies
/// wrap it) becomes a terminal provider error rather than a text delta.
pub(crate) struct ChunkDecoder {
    provider: ProviderKind,
}

impl ChunkDecoder {
    pub(crate) fn new(provider: ProviderKind) -> Self {
        Self { provider }
    }
}

impl FrameDecoder for ChunkDecoder {
    fn decode(&mut self, payload: &str) -> Result<Vec<StreamFrame>, AdapterError> {
        if let Some(message) = stream_error_message(payload) {
            return Err(AdapterError::provider(self.provider, message));
        }

        let parsed: ApiStreamChunk = serde_json::from_str(payload).map_err(|err| {
            AdapterError::provider(self.provider, format!("cannot parse stream chunk: {err}"))
        })?;

        let mut frames = Vec::new();
        if let Some(choice) = parsed.choices.into_iter().next() {
            let delta_text = choice
                .delta
                .and_then(|delta| delta.content)
                .or(choice.text)
                .unwrap_or_default();

            if !delta_text.is_empty() {
                frames.push(StreamFrame::Delta(delta_text));
            }

            if choice.finish_reason.is_some() {
                frames.push(StreamFrame::Finish(parse_finish_reason(
                    choice.finish_reason.as_deref(),
                )));
            }
        }

        Ok(frames)
    }
}

fn stream_error_message(payload: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(payload).ok()?;
    let envelope = parsed.get("error").or_else(|| parsed.get("data")?.get("error"))?;
    envelope.get("message")?.as_str().map(str::to_string)
}

fn to_body<T: Serialize>(body: &T) -> Result<Value, AdapterError> {
    serde_json::to_value(body).map_err(|err| AdapterError::invalid_request(err.to_string()))
}

fn api_message(message: &Message) -> ApiMessage {
    ApiMessage {
        role: message.role.as_str(),
        content: message.content.clone(),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls: message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| ApiToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: ApiToolFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        }),
    }
}

fn api_tools(tools: &[ToolDefinition]) -> Option<Vec<ApiTool>> {
    if tools.is_empty() {
        return None;
    }

    Some(
        tools
            .iter()
            .map(|tool| ApiTool {
                kind: "function".to_string(),
                function: ApiFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect(),
    )
}

fn tool_choice_value(tool_choice: &ToolChoice) -> Value {
    match tool_choice {
        ToolChoice::Mode(mode) => Value::String(mode.clone()),
        ToolChoice::Function { name } => serde_json::json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}

fn flatten_content(content: Option<Value>) -> String {
    match content {
        Some(Value::String(text)) => text,
        Some(Value::Array(parts)) => {
            let mut out = String::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
            out
        }
        _ => String::new(),
    }
}

#[derive(Debug, Serialize)]
struct ApiChatBody {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ApiCompletionBody {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    arguments: String,
}

impl From<ApiToolCall> for ToolCall {
    fn from(value: ApiToolCall) -> Self {
        Self {
            id: value.id,
            name: value.function.name,
            arguments: value.function.arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiAssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAssistantMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiCompletionChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiCompletionChoice {
    #[serde(default)]
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiImageResponse {
    #[serde(default)]
    data: Vec<ApiImageDatum>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiImageDatum {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    #[serde(default)]
    delta: Option<ApiStreamDelta>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamDelta {
    #[serde(default)]
    content: Option<String>,
}
