use super::*;

use schemars::JsonSchema;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One call observed by a [`ScriptedSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionCall {
    Open,
    Close,
    SendCommand { command: String },
    LoadCandidate,
    CompareMerge,
    CompareReplace,
    CommitMerge,
    CommitReplace,
    Discard,
    Rollback,
}

/// Shared, cloneable log of session calls.
///
/// A clone taken before the session is handed to a driver keeps observing
/// calls afterwards, so tests can assert exact device-interaction sequences.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<SessionCall>>>,
}

impl CallLog {
    fn push(&self, call: SessionCall) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(call);
        }
    }

    /// Snapshot of all recorded calls.
    pub fn snapshot(&self) -> Result<Vec<SessionCall>, DriverError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| DriverError::Internal(format!("call log lock error: {e}")))?;
        Ok(guard.clone())
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_matching(&self, predicate: impl Fn(&SessionCall) -> bool) -> usize {
        self.snapshot()
            .map(|calls| calls.iter().filter(|call| predicate(call)).count())
            .unwrap_or(0)
    }

    /// Export the call log as JSONL, one call per line.
    pub fn to_jsonl(&self) -> Result<String, DriverError> {
        let calls = self.snapshot()?;
        let mut lines = Vec::with_capacity(calls.len());
        for call in calls {
            let line = serde_json::to_string(&call)
                .map_err(|e| DriverError::Internal(format!("call log encode error: {e}")))?;
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

/// Offline [`CliSession`] backed by canned command outputs.
///
/// Built for tests and demos: outputs are queued per command, commit and
/// open failures can be scripted, and every call lands in the [`CallLog`].
pub struct ScriptedSession {
    outputs: HashMap<String, VecDeque<String>>,
    candidate: Option<Vec<String>>,
    merge_diff: String,
    replace_diff: String,
    open_error: Option<String>,
    commit_error: Option<(String, String)>,
    rollback_error: Option<String>,
    alive: bool,
    log: CallLog,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            candidate: None,
            merge_diff: String::new(),
            replace_diff: String::new(),
            open_error: None,
            commit_error: None,
            rollback_error: None,
            alive: false,
            log: CallLog::default(),
        }
    }

    /// Queues one output for `command`; repeated calls queue in order.
    pub fn with_output(mut self, command: &str, output: &str) -> Self {
        self.outputs
            .entry(command.to_string())
            .or_default()
            .push_back(output.to_string());
        self
    }

    pub fn with_merge_diff(mut self, diff: &str) -> Self {
        self.merge_diff = diff.to_string();
        self
    }

    pub fn with_replace_diff(mut self, diff: &str) -> Self {
        self.replace_diff = diff.to_string();
        self
    }

    /// Makes the next `open` fail with the given underlying message.
    pub fn fail_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    /// Makes the next commit (either mode) fail as a rejected command.
    pub fn fail_next_commit(mut self, command: &str, output: &str) -> Self {
        self.commit_error = Some((command.to_string(), output.to_string()));
        self
    }

    /// Makes the next rollback fail as a rejected command.
    pub fn fail_next_rollback(mut self, message: &str) -> Self {
        self.rollback_error = Some(message.to_string());
        self
    }

    /// Handle to the call log; stays valid after the session is moved.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    fn take_commit_error(&mut self) -> Result<(), DriverError> {
        if let Some((command, output)) = self.commit_error.take() {
            return Err(DriverError::CommandFailed { command, output });
        }
        self.candidate = None;
        Ok(())
    }
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CliSession for ScriptedSession {
    async fn open(&mut self) -> Result<(), DriverError> {
        self.log.push(SessionCall::Open);
        if let Some(message) = self.open_error.take() {
            return Err(DriverError::Internal(message));
        }
        self.alive = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.log.push(SessionCall::Close);
        self.alive = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn send_command(&mut self, command: &str) -> Result<String, DriverError> {
        self.log.push(SessionCall::SendCommand {
            command: command.to_string(),
        });
        self.outputs
            .get_mut(command)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| DriverError::ScriptExhausted(command.to_string()))
    }

    async fn load_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError> {
        self.log.push(SessionCall::LoadCandidate);
        let text = match source {
            ConfigSource::Text(text) => text,
            ConfigSource::Path(path) => tokio::fs::read_to_string(path).await?,
        };
        self.candidate = Some(text.lines().map(String::from).collect());
        Ok(())
    }

    async fn compare_merge_config(&mut self) -> Result<String, DriverError> {
        self.log.push(SessionCall::CompareMerge);
        Ok(self.merge_diff.clone())
    }

    async fn compare_replace_config(&mut self) -> Result<String, DriverError> {
        self.log.push(SessionCall::CompareReplace);
        Ok(self.replace_diff.clone())
    }

    async fn commit_merge_config(&mut self) -> Result<(), DriverError> {
        self.log.push(SessionCall::CommitMerge);
        self.take_commit_error()
    }

    async fn commit_replace_config(&mut self) -> Result<(), DriverError> {
        self.log.push(SessionCall::CommitReplace);
        self.take_commit_error()
    }

    async fn discard_config(&mut self) -> Result<(), DriverError> {
        self.log.push(SessionCall::Discard);
        self.candidate = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.log.push(SessionCall::Rollback);
        if let Some(message) = self.rollback_error.take() {
            return Err(DriverError::CommandFailed {
                command: "rollback".to_string(),
                output: message,
            });
        }
        Ok(())
    }
}
