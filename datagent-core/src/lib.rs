//! # Datagent Core
//!
//! Building blocks of a tool-calling agent loop over local tabular data.
//!
//! ## Core Concepts
//! - **Actions**: Named, schema-described capabilities held in an `ActionRegistry`
//! - **Memory**: Append-only transcript of user, assistant and environment entries
//! - **Environment**: Runs one action and always yields a `ResultEnvelope`
//! - **Language**: Builds prompts and decodes model responses into invocations
//! - **Generator**: Turns a prompt into a response through an `LlmProvider`
//! - **Tabular**: CSV-backed frames and the data actions that operate on them

pub mod action;
pub mod cache;
pub mod data_actions;
pub mod envelope;
pub mod environment;
pub mod error;
pub mod generator;
pub mod goal;
pub mod language;
pub mod memory;
pub mod provider;
pub mod schema;
pub mod tabular;

pub use action::{Action, ActionArgs, ActionHandler, ActionRegistry, TERMINATE_ACTION};
pub use cache::ResponseCache;
pub use envelope::ResultEnvelope;
pub use environment::{ActionContext, Environment};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use generator::{
    CachedGenerator, GeneratedResponse, GenerationOptions, MaybeCached, ProviderGenerator,
    ResponseGenerator,
};
pub use goal::Goal;
pub use language::{AgentLanguage, FunctionCallingLanguage, Invocation, Prompt, ESCALATE_TOOL};
pub use memory::{EntryKind, Memory, MemoryEntry};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, OpenAIProvider,
    ProviderConfig, ProviderError, ProviderType, Role, ToolCall, ToolDefinition, Usage,
    UsageTracker,
};
pub use schema::{ParamType, ParameterSchema, ParameterSpec};
pub use tabular::{DataFrame, FrameStore};
