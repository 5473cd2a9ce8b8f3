//! Agent implementation - orchestrates the model <-> environment loop

use datagent_core::{
    ActionArgs, ActionRegistry, AgentLanguage, Environment, Error, Goal, Memory, MemoryEntry,
    ResponseGenerator, Result, ResultEnvelope,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to do when the model names an action that is not registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownActionPolicy {
    /// Record a failure envelope and stop the run
    #[default]
    Terminate,
    /// Record a failure envelope and let the model try again
    Retry,
}

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on model calls per run
    pub max_iterations: usize,
    pub unknown_action_policy: UnknownActionPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            unknown_action_policy: UnknownActionPolicy::Terminate,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A terminal action ran; its envelope carries the answer
    Terminated { envelope: ResultEnvelope },
    /// The iteration limit was reached without termination
    Exhausted,
    /// The model named an action that is not registered
    UnknownAction { tool: String },
    Cancelled,
}

/// Result from agent execution
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Full transcript, including any memory the run resumed from
    pub memory: Memory,
    pub outcome: RunOutcome,
    /// Number of model calls made
    pub iterations: usize,
}

impl AgentRun {
    pub fn is_terminated(&self) -> bool {
        matches!(self.outcome, RunOutcome::Terminated { .. })
    }

    /// The terminal action's result, when the run terminated successfully
    pub fn answer(&self) -> Option<&Value> {
        match &self.outcome {
            RunOutcome::Terminated { envelope } => envelope.result(),
            _ => None,
        }
    }

    /// The most recent successful action result in the transcript
    pub fn best_effort_answer(&self) -> Option<Value> {
        if let Some(answer) = self.answer() {
            return Some(answer.clone());
        }
        self.memory
            .entries()
            .iter()
            .rev()
            .filter_map(|entry| ResultEnvelope::from_json(&entry.content).ok())
            .find_map(|envelope| envelope.result().cloned())
    }
}

/// The agent orchestrator
pub struct Agent<G> {
    goals: Vec<Goal>,
    language: Box<dyn AgentLanguage>,
    registry: ActionRegistry,
    generator: G,
    environment: Environment,
    config: AgentConfig,
}

impl<G: ResponseGenerator> Agent<G> {
    /// Create a new agent with default configuration
    pub fn new(
        goals: Vec<Goal>,
        language: impl AgentLanguage + 'static,
        registry: ActionRegistry,
        generator: G,
        environment: Environment,
    ) -> Self {
        Self {
            goals,
            language: Box::new(language),
            registry,
            generator,
            environment,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run a task to completion.
    ///
    /// `memory` resumes a previous transcript; the task is appended to it as
    /// a new user entry. Only a response generator failure is an error.
    pub async fn run(&mut self, task: &str, memory: Option<Memory>) -> Result<AgentRun> {
        self.run_with_cancellation(task, memory, CancellationToken::new())
            .await
    }

    /// Like [`Agent::run`], stopping with [`RunOutcome::Cancelled`] once
    /// `cancel` fires. A generation in flight is abandoned without touching
    /// memory.
    pub async fn run_with_cancellation(
        &mut self,
        task: &str,
        memory: Option<Memory>,
        cancel: CancellationToken,
    ) -> Result<AgentRun> {
        let mut memory = memory.unwrap_or_default();
        memory.add(MemoryEntry::user(task));

        info!(
            task,
            goals = self.goals.len(),
            actions = self.registry.len(),
            max_iterations = self.config.max_iterations,
            "agent run started"
        );

        let mut iterations = 0;
        while iterations < self.config.max_iterations {
            if cancel.is_cancelled() {
                return Ok(self.finish(memory, RunOutcome::Cancelled, iterations));
            }
            iterations += 1;

            let prompt = self.language.construct_prompt(
                self.registry.get_actions(),
                &self.environment,
                &self.goals,
                &memory,
            );

            info!(iteration = iterations, "agent thinking");
            let generated = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(self.finish(memory, RunOutcome::Cancelled, iterations));
                }
                generated = self.generator.generate(&prompt) => {
                    generated.map_err(|e| {
                        e.with_operation("agent::run")
                            .with_context("iteration", iterations.to_string())
                    })?
                }
            };
            let raw = generated.into_raw();
            debug!(response = %raw, "agent response");

            let invocation = self.language.parse_response(&raw);
            if invocation.is_escalation() {
                warn!(iteration = iterations, "response could not be processed, escalating");
                memory.add(MemoryEntry::assistant(raw.clone()));
                memory.add(MemoryEntry::user(escalation_message(&raw)));
                continue;
            }

            let Some(action) = self.registry.get_action(&invocation.tool) else {
                warn!(tool = %invocation.tool, "model requested an unknown action");
                let err = Error::action_not_found(invocation.tool.as_str()).with_operation("agent::run");
                let envelope = ResultEnvelope::failure(err.message(), err.traceback());
                memory.add(MemoryEntry::assistant(raw));
                memory.add(MemoryEntry::user(envelope.to_json()?));

                match self.config.unknown_action_policy {
                    UnknownActionPolicy::Terminate => {
                        let outcome = RunOutcome::UnknownAction { tool: invocation.tool };
                        return Ok(self.finish(memory, outcome, iterations));
                    }
                    UnknownActionPolicy::Retry => continue,
                }
            };

            let terminal = action.is_terminal();
            debug!(action = action.name(), args = ?invocation.args, "invoking action");
            let args = ActionArgs::from_map(invocation.args);
            let envelope = self.environment.execute(action, &args);

            memory.add(MemoryEntry::assistant(raw));
            memory.add(MemoryEntry::user(envelope.to_json()?));

            if terminal {
                return Ok(self.finish(memory, RunOutcome::Terminated { envelope }, iterations));
            }
        }

        warn!(max_iterations = self.config.max_iterations, "iteration limit reached");
        Ok(self.finish(memory, RunOutcome::Exhausted, iterations))
    }

    fn finish(&self, memory: Memory, outcome: RunOutcome, iterations: usize) -> AgentRun {
        info!(iterations, entries = memory.len(), outcome = ?outcome, "agent run finished");
        AgentRun {
            memory,
            outcome,
            iterations,
        }
    }
}

fn escalation_message(raw: &str) -> String {
    format!(
        "The following response could not be processed: {}. Please ensure you provide only one, correct action.",
        raw
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagent_core::data_actions;
    use datagent_core::{
        Action, ActionContext, EntryKind, ErrorKind, FunctionCallingLanguage, GeneratedResponse,
        ParamType, ParameterSchema, ParameterSpec, Prompt,
    };
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Replays scripted responses and records every prompt it is given
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<GeneratedResponse>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<GeneratedResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn raw(responses: &[&str]) -> Self {
            Self::new(responses.iter().map(|r| Ok(GeneratedResponse::text(*r))).collect())
        }

        fn prompts(&self) -> Vec<Prompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl ResponseGenerator for ScriptedGenerator {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &Prompt) -> Result<GeneratedResponse> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::inference_failed("script exhausted")))
        }
    }

    fn terminate(message: &str) -> String {
        json!({"tool": "terminate", "args": {"message": message}}).to_string()
    }

    /// A registry with `terminate` plus an `echo` action counting its calls
    fn echo_registry(calls: Arc<AtomicUsize>) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        let echo = Action::new(
            "echo",
            "Echo the given text back.",
            ParameterSchema::new(vec![ParameterSpec::required("text", ParamType::String, "Text to echo")]),
            move |_: &mut ActionContext, args: &ActionArgs| -> Result<Value> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::String(args.str("text")?.to_string()))
            },
        )
        .unwrap();
        registry.register(echo).unwrap();
        registry
    }

    fn goals() -> Vec<Goal> {
        vec![
            Goal::new(1, "Gather Information", "Echo something."),
            Goal::new(1, "Terminate", "Call terminate when done."),
        ]
    }

    fn agent(generator: ScriptedGenerator, registry: ActionRegistry) -> Agent<ScriptedGenerator> {
        Agent::new(
            goals(),
            FunctionCallingLanguage::new(),
            registry,
            generator,
            Environment::default(),
        )
    }

    fn envelope_at(run: &AgentRun, index: usize) -> ResultEnvelope {
        let entry = &run.memory.entries()[index];
        assert_eq!(entry.kind, EntryKind::User);
        ResultEnvelope::from_json(&entry.content).unwrap()
    }

    #[tokio::test]
    async fn test_normal_termination() {
        let calls = Arc::new(AtomicUsize::new(0));
        let echo = json!({"tool": "echo", "args": {"text": "hi"}}).to_string();
        let generator = ScriptedGenerator::raw(&[echo.as_str(), terminate("done").as_str()]);
        let mut agent = agent(generator, echo_registry(calls.clone()));

        let run = agent.run("Say hi, then stop.", None).await.unwrap();

        assert!(run.is_terminated());
        assert_eq!(run.answer(), Some(&json!("done\nTerminating...")));
        assert_eq!(run.iterations, 2);
        assert_eq!(run.memory.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let kinds: Vec<_> = run.memory.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EntryKind::User, EntryKind::Assistant, EntryKind::User, EntryKind::Assistant, EntryKind::User]
        );
        assert_eq!(run.memory.entries()[1].content, echo);
        assert_eq!(envelope_at(&run, 2).result(), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn test_memory_grows_two_entries_per_iteration() {
        let calls = Arc::new(AtomicUsize::new(0));
        let echo = json!({"tool": "echo", "args": {"text": "again"}}).to_string();
        let generator = ScriptedGenerator::raw(&[echo.as_str(), "garbage", echo.as_str(), echo.as_str()]);
        let mut agent = agent(generator, echo_registry(calls)).with_config(AgentConfig {
            max_iterations: 4,
            ..Default::default()
        });

        let run = agent.run("loop", None).await.unwrap();

        assert_eq!(run.outcome, RunOutcome::Exhausted);
        assert_eq!(run.iterations, 4);
        assert_eq!(run.memory.len(), 1 + 2 * 4);
    }

    #[tokio::test]
    async fn test_escalation_then_recovery() {
        let generator = ScriptedGenerator::raw(&["I will now list the files.", terminate("ok").as_str()]);
        let mut agent = agent(generator, ActionRegistry::new());

        let run = agent.run("task", None).await.unwrap();

        assert!(run.is_terminated());
        assert_eq!(run.memory.len(), 5);
        assert_eq!(run.memory.entries()[1].content, "I will now list the files.");
        assert_eq!(
            run.memory.entries()[2].content,
            "The following response could not be processed: I will now list the files.. \
             Please ensure you provide only one, correct action."
        );
    }

    #[tokio::test]
    async fn test_single_unparseable_iteration_exhausts() {
        let generator = ScriptedGenerator::raw(&["not json at all"]);
        let mut agent = agent(generator, ActionRegistry::new()).with_config(AgentConfig {
            max_iterations: 1,
            ..Default::default()
        });

        let run = agent.run("task", None).await.unwrap();

        assert_eq!(run.outcome, RunOutcome::Exhausted);
        assert_eq!(run.memory.len(), 3);
        assert!(run.answer().is_none());
    }

    #[tokio::test]
    async fn test_unknown_action_stops_without_executing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let unknown = json!({"tool": "delete_everything", "args": {}}).to_string();
        let echo = json!({"tool": "echo", "args": {"text": "x"}}).to_string();
        let generator = ScriptedGenerator::raw(&[unknown.as_str(), echo.as_str()]);
        let mut agent = agent(generator, echo_registry(calls.clone()));

        let run = agent.run("task", None).await.unwrap();

        assert_eq!(
            run.outcome,
            RunOutcome::UnknownAction {
                tool: "delete_everything".into()
            }
        );
        assert_eq!(run.iterations, 1);
        assert_eq!(run.memory.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let envelope = envelope_at(&run, 2);
        assert!(!envelope.tool_executed());
        assert!(envelope.error().unwrap().contains("delete_everything"));
    }

    #[tokio::test]
    async fn test_unknown_action_retry_policy() {
        let unknown = json!({"tool": "nope", "args": {}}).to_string();
        let generator = ScriptedGenerator::raw(&[unknown.as_str(), terminate("recovered").as_str()]);
        let mut agent = agent(generator, ActionRegistry::new()).with_config(AgentConfig {
            unknown_action_policy: UnknownActionPolicy::Retry,
            ..Default::default()
        });

        let run = agent.run("task", None).await.unwrap();

        assert!(run.is_terminated());
        assert_eq!(run.memory.len(), 5);
        assert_eq!(run.answer(), Some(&json!("recovered\nTerminating...")));
    }

    #[tokio::test]
    async fn test_action_failure_is_recorded_and_loop_continues() {
        let dir = TempDir::new().unwrap();
        let mut registry = ActionRegistry::new();
        data_actions::register_data_actions(&mut registry).unwrap();

        let describe = json!({"tool": "describe_dataframe", "args": {"path": "missing.csv"}}).to_string();
        let generator = ScriptedGenerator::raw(&[describe.as_str(), terminate("gave up").as_str()]);
        let mut agent = Agent::new(
            goals(),
            FunctionCallingLanguage::new(),
            registry,
            generator,
            Environment::with_data_dir(dir.path()),
        );

        let run = agent.run("Describe the data in this directory.", None).await.unwrap();

        assert!(run.is_terminated());
        let failure = envelope_at(&run, 2);
        assert!(!failure.tool_executed());
        let expected = format!("File not found at path: {}", dir.path().join("missing.csv").display());
        assert_eq!(failure.error(), Some(expected.as_str()));
        match failure {
            ResultEnvelope::Failure { traceback, .. } => assert!(!traceback.is_empty()),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generator_error_aborts_run() {
        let generator = ScriptedGenerator::new(vec![Err(Error::new(ErrorKind::RateLimited, "slow down"))]);
        let mut agent = agent(generator, ActionRegistry::new());

        let err = agent.run("task", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.operation(), "agent::run");
    }

    #[tokio::test]
    async fn test_cancelled_before_first_iteration() {
        let generator = ScriptedGenerator::raw(&[terminate("never").as_str()]);
        let mut agent = agent(generator, ActionRegistry::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let run = agent.run_with_cancellation("task", None, cancel).await.unwrap();

        assert_eq!(run.outcome, RunOutcome::Cancelled);
        assert_eq!(run.iterations, 0);
        assert_eq!(run.memory.len(), 1);
        assert!(agent.generator().prompts().is_empty());
    }

    #[tokio::test]
    async fn test_resumed_memory_is_extended() {
        let mut previous = Memory::new();
        previous.add(MemoryEntry::user("first task"));
        previous.add(MemoryEntry::assistant("{}"));

        let generator = ScriptedGenerator::raw(&[terminate("second").as_str()]);
        let mut agent = agent(generator, ActionRegistry::new());

        let run = agent.run("second task", Some(previous)).await.unwrap();

        assert_eq!(run.memory.len(), 2 + 1 + 2);
        assert_eq!(run.memory.entries()[0].content, "first task");
        assert_eq!(run.memory.entries()[2].content, "second task");

        // The prompt replays the resumed transcript after the goals
        let prompt = &agent.generator().prompts()[0];
        assert_eq!(prompt.messages.len(), 1 + 3);
        assert_eq!(prompt.messages[1].text(), "first task");
    }

    #[tokio::test]
    async fn test_prompt_carries_goals_and_tools() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = ScriptedGenerator::raw(&[terminate("bye").as_str()]);
        let mut agent = agent(generator, echo_registry(calls));

        agent.run("task", None).await.unwrap();

        let prompt = &agent.generator().prompts()[0];
        assert!(prompt.messages[0].text().starts_with("Gather Information:"));
        let tools: Vec<_> = prompt.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tools, vec!["terminate", "echo"]);
    }

    #[tokio::test]
    async fn test_best_effort_answer_after_exhaustion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let echo = json!({"tool": "echo", "args": {"text": "partial"}}).to_string();
        let generator = ScriptedGenerator::raw(&[echo.as_str(), "???"]);
        let mut agent = agent(generator, echo_registry(calls)).with_config(AgentConfig {
            max_iterations: 2,
            ..Default::default()
        });

        let run = agent.run("task", None).await.unwrap();

        assert_eq!(run.outcome, RunOutcome::Exhausted);
        assert!(run.answer().is_none());
        assert_eq!(run.best_effort_answer(), Some(json!("partial")));
    }

    #[tokio::test]
    async fn test_tool_call_response_is_rendered() {
        let generator = ScriptedGenerator::new(vec![Ok(GeneratedResponse::tool_call(
            "terminate",
            r#"{"message": "via tool call"}"#,
        ))]);
        let mut agent = agent(generator, ActionRegistry::new());

        let run = agent.run("task", None).await.unwrap();

        assert_eq!(run.answer(), Some(&json!("via tool call\nTerminating...")));
        let recorded: Value = serde_json::from_str(&run.memory.entries()[1].content).unwrap();
        assert_eq!(recorded["tool"], "terminate");
    }
}
