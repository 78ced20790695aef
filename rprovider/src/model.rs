//! Provider-agnostic message, request, and completion types.
//!
//! ```rust
//! use rprovider::{ChatRequest, Message, RequestInput};
//!
//! let ok = ChatRequest::new(
//!     "gpt-4o-mini",
//!     RequestInput::Messages(vec![Message::user("Summarize this diff")]),
//! );
//! assert!(ok.validate().is_ok());
//!
//! let err = ChatRequest::new("gpt-4o-mini", RequestInput::Messages(Vec::new()));
//! assert!(err.validate().is_err());
//! ```

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One ordered piece of message content. The serde shape matches the
/// OpenAI-style wire format so persisted transcripts and request payloads
/// share a single representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlPart },
}

impl ContentPart {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text { text: value.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrlPart {
                url: url.into(),
                detail: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrlPart {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A tool invocation requested by the assistant. `arguments` carries the raw
/// JSON argument string as emitted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Canonical representation of one conversational turn. Immutable once
/// appended to a conversation except for whole-message insertion/removal.
/// `Message::default()` is the zero-value sentinel returned by out-of-range
/// removal; check it with [`Message::is_empty`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn from_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::text(text)],
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::from_text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::from_text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::from_text(Role::Assistant, text)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::text(output)],
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    /// Concatenates the text parts in order, skipping image references.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.content {
            if let ContentPart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_call_id.is_none() && self.tool_calls.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool-selection directive: either a mode keyword (`"auto"`, `"none"`,
/// `"required"`) or a specific function by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Mode(String),
    Function { name: String },
}

/// Request body: a full message sequence for chat backends, or a bare prompt
/// for legacy completion endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestInput {
    Messages(Vec<Message>),
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub input: RequestInput,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, input: RequestInput) -> Self {
        Self {
            model: model.into(),
            input,
            max_tokens: None,
            temperature: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            tools: Vec::new(),
            tool_choice: None,
            stream: false,
        }
    }

    pub fn from_messages(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self::new(model, RequestInput::Messages(messages))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn enable_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.model.trim().is_empty() {
            return Err(AdapterError::invalid_request("model must not be empty"));
        }

        match &self.input {
            RequestInput::Messages(messages) if messages.is_empty() => {
                return Err(AdapterError::invalid_request(
                    "at least one message is required",
                ));
            }
            RequestInput::Prompt(prompt) if prompt.trim().is_empty() => {
                return Err(AdapterError::invalid_request("prompt must not be empty"));
            }
            _ => {}
        }

        if let Some(max_tokens) = self.max_tokens
            && max_tokens == 0
        {
            return Err(AdapterError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(AdapterError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

/// Normalized non-streaming completion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub model: String,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Square256,
    Square512,
    Square1024,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square256 => "256x256",
            Self::Square512 => "512x512",
            Self::Square1024 => "1024x1024",
        }
    }
}

impl Display for ImageSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default size rule: the high-tier image model renders at the largest
/// square, everything else at 512x512, unless the caller overrides.
pub fn default_image_size(model: &str) -> ImageSize {
    if model.starts_with("dall-e-3") {
        ImageSize::Square1024
    } else {
        ImageSize::Square512
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub size: Option<ImageSize>,
}

impl ImageRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn resolved_size(&self) -> ImageSize {
        self.size.unwrap_or_else(|| default_image_size(&self.model))
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.prompt.trim().is_empty() {
            return Err(AdapterError::invalid_request("prompt must not be empty"));
        }
        Ok(())
    }
}

/// Normalized image-generation result. A content-safety refusal is a
/// successful outcome carrying the refusal text, so callers can surface it
/// to the user as the assistant's reply instead of failing the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Url(String),
    Refused(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdapterErrorKind;

    #[test]
    fn message_text_concatenates_parts_in_order() {
        let message = Message {
            role: Role::User,
            content: vec![
                ContentPart::text("look at "),
                ContentPart::image_url("https://cdn.example/cat.png"),
                ContentPart::text("this"),
            ],
            tool_call_id: None,
            tool_calls: None,
        };

        assert_eq!(message.text(), "look at this");
    }

    #[test]
    fn default_message_is_the_empty_sentinel() {
        let sentinel = Message::default();
        assert!(sentinel.is_empty());
        assert!(!Message::user("hi").is_empty());
    }

    #[test]
    fn message_serde_round_trips_wire_shape() {
        let message = Message::user("hello");
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "hello");

        let back: Message = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, message);
    }

    #[test]
    fn chat_request_validate_enforces_contract() {
        let empty_model = ChatRequest::from_messages("   ", vec![Message::user("hi")]);
        let err = empty_model.validate().expect_err("empty model must fail");
        assert_eq!(err.kind, AdapterErrorKind::InvalidRequest);

        let empty_messages = ChatRequest::from_messages("gpt", Vec::new());
        assert!(empty_messages.validate().is_err());

        let empty_prompt = ChatRequest::new("gpt", RequestInput::Prompt("   ".to_string()));
        assert!(empty_prompt.validate().is_err());

        let bad_temperature =
            ChatRequest::from_messages("gpt", vec![Message::user("hi")]).with_temperature(2.5);
        assert!(bad_temperature.validate().is_err());

        let valid = ChatRequest::from_messages("gpt", vec![Message::user("hi")])
            .with_temperature(0.4)
            .with_max_tokens(128)
            .enable_streaming();
        assert!(valid.validate().is_ok());
        assert!(valid.stream);
    }

    #[test]
    fn image_size_defaults_follow_model_tier() {
        assert_eq!(default_image_size("dall-e-3"), ImageSize::Square1024);
        assert_eq!(default_image_size("dall-e-2"), ImageSize::Square512);

        let request = ImageRequest::new("dall-e-3", "a cat");
        assert_eq!(request.resolved_size(), ImageSize::Square1024);

        let overridden = ImageRequest::new("dall-e-3", "a cat").with_size(ImageSize::Square256);
        assert_eq!(overridden.resolved_size(), ImageSize::Square256);
    }
}
