//! # Execution Environment
//!
//! The environment runs one action invocation at a time and turns whatever
//! happens into a [`ResultEnvelope`]. It is the single place where a failing
//! handler, including one that panics, becomes a failure envelope; nothing
//! escapes to the control loop.

use crate::action::{Action, ActionArgs};
use crate::envelope::ResultEnvelope;
use crate::tabular::FrameStore;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Default directory data actions resolve relative paths against
pub const DEFAULT_DATA_DIR: &str = "data/";

/// Session-scoped state handed to every action handler
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub data_dir: PathBuf,
    pub frames: FrameStore,
}

impl ActionContext {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            frames: FrameStore::new(),
        }
    }

    /// Resolve a path argument against the data directory. Absolute paths
    /// are used unchanged.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.data_dir.join(candidate)
        }
    }
}

impl Default for ActionContext {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

/// The execution sandbox
#[derive(Debug, Clone, Default)]
pub struct Environment {
    context: ActionContext,
}

impl Environment {
    pub fn new(context: ActionContext) -> Self {
        Self { context }
    }

    /// Environment over a data directory with an empty frame store
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(ActionContext::new(data_dir))
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ActionContext {
        &mut self.context
    }

    /// Execute an action and wrap the outcome. Never fails.
    pub fn execute(&mut self, action: &Action, args: &ActionArgs) -> ResultEnvelope {
        debug!(action = action.name(), args = ?args.as_map(), "executing action");

        let ctx = &mut self.context;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| action.execute(ctx, args)));

        match outcome {
            Ok(Ok(value)) => ResultEnvelope::success(value),
            Ok(Err(err)) => {
                error!(action = action.name(), error = %err, "action failed");
                let message = err.message().to_string();
                let traceback = err.with_operation("environment::execute").traceback();
                ResultEnvelope::failure(message, traceback)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(action = action.name(), panic = %message, "action panicked");
                let traceback = format!(
                    "ActionPanicked at environment::execute\n\n    Message: {}\n\n    Context:\n        action: {}\n",
                    message,
                    action.name()
                );
                ResultEnvelope::failure(message, traceback)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "action panicked".to_string()
    }
}
