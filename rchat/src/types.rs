//! Turn form input applied to a conversation each user turn.

use serde::{Deserialize, Serialize};

use crate::ChatError;

/// Caller-supplied settings for one chat turn. Mirrors the JSON body a
/// front end submits per message: the turn text plus any model, web-search,
/// and context-window overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnForm {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub web: bool,
    #[serde(default)]
    pub ignore_context: bool,
    #[serde(default)]
    pub context: i32,
}

impl TurnForm {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_web(mut self, web: bool) -> Self {
        self.web = web;
        self
    }

    pub fn with_context(mut self, context: i32) -> Self {
        self.context = context;
        self
    }

    pub fn ignoring_context(mut self) -> Self {
        self.ignore_context = true;
        self
    }

    /// Parses a raw JSON form body. Malformed JSON is a validation error,
    /// rejected before any conversation state changes.
    pub fn from_json(data: &str) -> Result<Self, ChatError> {
        serde_json::from_str(data)
            .map_err(|err| ChatError::validation(format!("malformed turn form: {err}")))
    }

    pub fn trimmed_message(&self) -> &str {
        self.message.trim()
    }
}
