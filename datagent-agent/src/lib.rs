//! # Datagent Agent
//!
//! The agent drives the model <-> environment loop:
//! 1. Goals, memory and available actions are rendered into a prompt
//! 2. The response generator produces one response
//! 3. The language decodes it into an invocation, or escalates
//! 4. The environment runs the action and records a result envelope
//! 5. Repeat until a terminal action, an unknown action, cancellation or
//!    the iteration limit
//!
//! The model chooses, the environment acts, memory remembers.

mod agent;

pub use agent::{Agent, AgentConfig, AgentRun, RunOutcome, UnknownActionPolicy};
