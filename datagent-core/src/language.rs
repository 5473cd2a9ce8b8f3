//! # Agent Language
//!
//! Translation between the agent's state and the model's tool-calling
//! protocol. Outbound, goals, memory and actions are folded into a fresh
//! [`Prompt`] on every iteration. Inbound, the raw model response is decoded
//! into an [`Invocation`]; anything that does not decode becomes the
//! escalation invocation instead of an error.

use crate::action::Action;
use crate::environment::Environment;
use crate::goal::Goal;
use crate::memory::{EntryKind, Memory, MemoryEntry};
use crate::provider::{ChatMessage, Role, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Tool name marking a response that could not be decoded
pub const ESCALATE_TOOL: &str = "escalate_incorrect_response";

/// Maximum description length surfaced to the model, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 1024;

const GOAL_SEPARATOR: &str = "\n-------------------\n";

// ============================================================================
// Prompt and Invocation
// ============================================================================

/// A model-ready prompt: role-tagged messages plus the tools on offer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// A decoded model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl Invocation {
    pub fn new(tool: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    /// The escalation invocation carrying the undecodable response
    pub fn escalation(raw: &str) -> Self {
        let mut args = Map::new();
        args.insert("message".into(), Value::String(raw.to_string()));
        Self::new(ESCALATE_TOOL, args)
    }

    pub fn is_escalation(&self) -> bool {
        self.tool == ESCALATE_TOOL
    }
}

// ============================================================================
// Language trait
// ============================================================================

/// Prompt construction and response parsing
pub trait AgentLanguage: Send + Sync {
    /// Build the prompt for one iteration. `environment` is available to
    /// languages that want to describe it; it is not required.
    fn construct_prompt(
        &self,
        actions: &[Action],
        environment: &Environment,
        goals: &[Goal],
        memory: &Memory,
    ) -> Prompt;

    /// Decode a raw response. Never fails: undecodable input yields
    /// [`Invocation::escalation`].
    fn parse_response(&self, raw: &str) -> Invocation;
}

/// Language for models with native function calling. Responses are expected
/// as `{"tool": name, "args": {...}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionCallingLanguage;

impl FunctionCallingLanguage {
    pub fn new() -> Self {
        Self
    }

    /// All goals as one system message, in the order given
    pub fn format_goals(&self, goals: &[Goal]) -> Vec<ChatMessage> {
        let instructions = goals
            .iter()
            .map(|g| format!("{}:{}{}{}", g.name, GOAL_SEPARATOR, g.description, GOAL_SEPARATOR))
            .collect::<Vec<_>>()
            .join("\n\n");
        vec![ChatMessage::system(instructions)]
    }

    /// One message per entry. Assistant and environment entries are shown as
    /// assistant turns, everything else as user turns.
    pub fn format_memory(&self, memory: &Memory) -> Vec<ChatMessage> {
        memory.entries().iter().map(entry_message).collect()
    }

    pub fn format_actions(&self, actions: &[Action]) -> Vec<ToolDefinition> {
        actions
            .iter()
            .map(|action| {
                ToolDefinition::new(action.name(), truncate_chars(action.description(), MAX_DESCRIPTION_CHARS))
                    .with_parameters(action.parameters().clone())
            })
            .collect()
    }
}

impl AgentLanguage for FunctionCallingLanguage {
    fn construct_prompt(
        &self,
        actions: &[Action],
        _environment: &Environment,
        goals: &[Goal],
        memory: &Memory,
    ) -> Prompt {
        let mut messages = self.format_goals(goals);
        messages.extend(self.format_memory(memory));

        Prompt {
            messages,
            tools: self.format_actions(actions),
        }
    }

    fn parse_response(&self, raw: &str) -> Invocation {
        match decode_invocation(raw) {
            Some(invocation) => invocation,
            None => {
                debug!(response = raw, "response is not a valid invocation");
                Invocation::escalation(raw)
            }
        }
    }
}

fn entry_message(entry: &MemoryEntry) -> ChatMessage {
    let role = match entry.kind {
        EntryKind::Assistant | EntryKind::Environment => Role::Assistant,
        EntryKind::User => Role::User,
    };

    if entry.content.is_empty() {
        let serialized = serde_json::to_string_pretty(entry).unwrap_or_default();
        ChatMessage::new(role, serialized)
    } else {
        ChatMessage::new(role, entry.content.clone())
    }
}

/// Strict decode: a JSON object with a string `tool` and an object `args`.
/// Absent or null `args` count as no arguments.
fn decode_invocation(raw: &str) -> Option<Invocation> {
    let value: Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    let mut object = match value {
        Value::Object(map) => map,
        _ => return None,
    };

    let tool = match object.remove("tool")? {
        Value::String(tool) if !tool.trim().is_empty() => tool,
        _ => return None,
    };

    let args = match object.remove("args") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return None,
    };

    Some(Invocation::new(tool, args))
}

/// Remove a surrounding markdown code fence, if present
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
