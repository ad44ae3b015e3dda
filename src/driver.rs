//! Driver for Extreme Networks EXOS switches.
//!
//! The driver owns exactly one CLI session and layers the
//! candidate-configuration lifecycle on top of it: load a candidate in
//! merge or replace mode, inspect the diff, commit with automatic rollback
//! on failure, or discard. Getter operations (facts, interfaces, raw CLI)
//! go through the same session.

use async_trait::async_trait;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::error::DriverError;
use crate::facts::{self, Facts};
use crate::interfaces::{self, Interface};
use crate::session::{
    CliSession, ConfigSource, ConnectionSecurityOptions, ExosSession, SessionParams,
};
use crate::templates;

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How a loaded candidate will be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    /// Candidate lines are applied on top of the running configuration.
    Merge,
    /// Candidate becomes the entire configuration.
    Replace,
}

/// Candidate lifecycle state.
///
/// A candidate is either absent or loaded with a known mode; the mode is
/// fixed at load time and governs compare and commit until the candidate
/// is committed or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConfigState {
    /// No candidate is loaded.
    Idle,
    /// A candidate is staged and waiting for compare, commit, or discard.
    CandidateLoaded { mode: ConfigMode },
}

/// Optional driver settings beyond host and credentials.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// SSH port, 22 unless overridden.
    pub port: u16,
    /// SSH algorithm policy and host key verification.
    pub security: ConnectionSecurityOptions,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            security: ConnectionSecurityOptions::default(),
        }
    }
}

/// Operations every network driver exposes, independent of vendor.
#[async_trait]
pub trait NetworkDriver: Send {
    /// Connects to the device and prepares the session for use.
    async fn open(&mut self) -> Result<(), DriverError>;

    /// Releases the session. Loaded-but-uncommitted candidates are dropped.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Whether the underlying session is currently usable.
    fn is_alive(&self) -> bool;

    /// Runs each command and returns raw outputs keyed by the command string.
    async fn cli(&mut self, commands: &[&str]) -> Result<HashMap<String, String>, DriverError>;

    /// Device identity summary.
    async fn get_facts(&mut self) -> Result<Facts, DriverError>;

    /// Interface inventory keyed by port name.
    async fn get_interfaces(&mut self) -> Result<BTreeMap<String, Interface>, DriverError>;

    /// Stages a candidate to be merged into the running configuration.
    async fn load_merge_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError>;

    /// Stages a candidate to replace the running configuration.
    async fn load_replace_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError>;

    /// Diff between the candidate and the running configuration.
    async fn compare_config(&mut self) -> Result<String, DriverError>;

    /// Applies the loaded candidate, rolling back once on failure.
    async fn commit_config(&mut self) -> Result<(), DriverError>;

    /// Drops the loaded candidate without touching the device.
    async fn discard_config(&mut self) -> Result<(), DriverError>;

    /// Undoes the last committed change, if one was made in this session.
    async fn rollback(&mut self) -> Result<(), DriverError>;
}

/// Driver for Extreme Networks EXOS devices.
pub struct ExosDriver {
    hostname: String,
    username: String,
    password: String,
    timeout: Duration,
    options: DriverOptions,
    device: Option<Box<dyn CliSession>>,
    state: ConfigState,
    changed: bool,
}

impl ExosDriver {
    /// Creates a driver with default port, timeout, and security profile.
    pub fn new(hostname: &str, username: &str, password: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout: DEFAULT_TIMEOUT,
            options: DriverOptions::default(),
            device: None,
            state: ConfigState::Idle,
            changed: false,
        }
    }

    /// Overrides the timeout applied to connection setup and command reads.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the SSH session with a caller-supplied one.
    ///
    /// Used to drive the lifecycle against a
    /// [`ScriptedSession`](crate::session::ScriptedSession) without a device.
    pub fn with_session(mut self, session: Box<dyn CliSession>) -> Self {
        self.device = Some(session);
        self
    }

    /// Current candidate lifecycle state.
    pub fn config_state(&self) -> ConfigState {
        self.state
    }

    /// Whether this session has committed a change that can be rolled back.
    pub fn has_pending_changes(&self) -> bool {
        self.changed
    }

    fn device(&mut self) -> Result<&mut (dyn CliSession + 'static), DriverError> {
        self.device
            .as_deref_mut()
            .ok_or(DriverError::SessionNotOpen)
    }

    fn session_params(&self) -> SessionParams {
        SessionParams {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            port: self.options.port,
            timeout: self.timeout,
            security: self.options.security.clone(),
        }
    }

    async fn commit_loaded(&mut self, mode: ConfigMode) -> Result<(), DriverError> {
        let hostname = self.hostname.clone();
        let device = self.device()?;
        let commit = match mode {
            ConfigMode::Merge => device.commit_merge_config().await,
            ConfigMode::Replace => device.commit_replace_config().await,
        };

        if let Err(commit_err) = commit {
            debug!("commit failed on {hostname}: {commit_err}");
            if let Err(rollback_err) = device.rollback().await {
                return Err(DriverError::RollbackFailed {
                    commit: commit_err.to_string(),
                    rollback: rollback_err.to_string(),
                });
            }
            return Err(match mode {
                ConfigMode::Merge => DriverError::MergeConfigFailed(commit_err.to_string()),
                ConfigMode::Replace => DriverError::ReplaceConfigFailed(commit_err.to_string()),
            });
        }

        info!("committed {mode:?} configuration on {hostname}");
        self.state = ConfigState::Idle;
        self.changed = true;
        Ok(())
    }
}

#[async_trait]
impl NetworkDriver for ExosDriver {
    async fn open(&mut self) -> Result<(), DriverError> {
        if self.device.is_none() {
            self.device = Some(Box::new(ExosSession::new(self.session_params())));
        }
        let hostname = self.hostname.clone();
        if let Err(err) = self.device()?.open().await {
            debug!("connection to {hostname} failed: {err}");
            return Err(DriverError::ConnectionFailed(hostname));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.state = ConfigState::Idle;
        if let Some(device) = self.device.as_deref_mut() {
            device.close().await?;
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.device.as_deref().is_some_and(CliSession::is_alive)
    }

    async fn cli(&mut self, commands: &[&str]) -> Result<HashMap<String, String>, DriverError> {
        let device = self.device()?;
        let mut outputs = HashMap::with_capacity(commands.len());
        for command in commands {
            let output = device.send_command(command).await?;
            outputs.insert((*command).to_string(), output);
        }
        Ok(outputs)
    }

    async fn get_facts(&mut self) -> Result<Facts, DriverError> {
        let mut outputs = self.cli(&["show switch", "show version"]).await?;
        let show_switch = outputs.remove("show switch").unwrap_or_default();
        let show_version = outputs.remove("show version").unwrap_or_default();
        Ok(facts::facts_from_cli_output(&show_switch, &show_version))
    }

    async fn get_interfaces(&mut self) -> Result<BTreeMap<String, Interface>, DriverError> {
        let template = templates::show_port_information_detail()?;
        let output = self.device()?.send_command(&template.spec().command).await?;
        let rows = template.parse_rows(&output);
        Ok(interfaces::interfaces_from_rows(&rows))
    }

    async fn load_merge_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError> {
        self.device()?.load_candidate(source).await?;
        self.state = ConfigState::CandidateLoaded {
            mode: ConfigMode::Merge,
        };
        Ok(())
    }

    async fn load_replace_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError> {
        self.device()?.load_candidate(source).await?;
        self.state = ConfigState::CandidateLoaded {
            mode: ConfigMode::Replace,
        };
        Ok(())
    }

    async fn compare_config(&mut self) -> Result<String, DriverError> {
        match self.state {
            ConfigState::Idle => Ok(String::new()),
            ConfigState::CandidateLoaded {
                mode: ConfigMode::Merge,
            } => self.device()?.compare_merge_config().await,
            ConfigState::CandidateLoaded {
                mode: ConfigMode::Replace,
            } => self.device()?.compare_replace_config().await,
        }
    }

    async fn commit_config(&mut self) -> Result<(), DriverError> {
        match self.state {
            ConfigState::Idle => Err(DriverError::NoCandidateLoaded),
            ConfigState::CandidateLoaded { mode } => self.commit_loaded(mode).await,
        }
    }

    async fn discard_config(&mut self) -> Result<(), DriverError> {
        if let ConfigState::CandidateLoaded { .. } = self.state {
            self.device()?.discard_config().await?;
            self.state = ConfigState::Idle;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        if !self.changed {
            return Ok(());
        }
        self.device()?.rollback().await?;
        self.changed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ScriptedSession, SessionCall};

    fn driver_with(session: ScriptedSession) -> ExosDriver {
        ExosDriver::new("sw1.example.net", "admin", "secret").with_session(Box::new(session))
    }

    #[tokio::test]
    async fn commit_without_candidate_never_touches_the_device() {
        let session = ScriptedSession::new();
        let log = session.call_log();
        let mut driver = driver_with(session);

        let err = driver.commit_config().await.unwrap_err();
        assert!(matches!(err, DriverError::NoCandidateLoaded));
        assert!(log.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_fixes_the_mode_until_discard() {
        let session = ScriptedSession::new()
            .with_merge_diff("+ create vlan blue")
            .with_replace_diff("- configure snmp sysName old");
        let mut driver = driver_with(session);

        driver
            .load_merge_candidate(ConfigSource::Text("create vlan blue".to_string()))
            .await
            .unwrap();
        assert_eq!(
            driver.config_state(),
            ConfigState::CandidateLoaded {
                mode: ConfigMode::Merge
            }
        );
        assert_eq!(driver.compare_config().await.unwrap(), "+ create vlan blue");

        driver.discard_config().await.unwrap();
        assert_eq!(driver.config_state(), ConfigState::Idle);
        assert_eq!(driver.compare_config().await.unwrap(), "");
    }

    #[tokio::test]
    async fn failed_merge_commit_rolls_back_exactly_once() {
        let session = ScriptedSession::new().fail_next_commit("create vlan blue", "Error: busy");
        let log = session.call_log();
        let mut driver = driver_with(session);

        driver
            .load_merge_candidate(ConfigSource::Text("create vlan blue".to_string()))
            .await
            .unwrap();
        let err = driver.commit_config().await.unwrap_err();

        assert!(matches!(err, DriverError::MergeConfigFailed(_)));
        let rollbacks = log.count_matching(|call| *call == SessionCall::Rollback);
        assert_eq!(rollbacks, 1);
        // The candidate survives a failed commit so the caller can retry.
        assert_eq!(
            driver.config_state(),
            ConfigState::CandidateLoaded {
                mode: ConfigMode::Merge
            }
        );
    }

    #[tokio::test]
    async fn failed_replace_commit_reports_replace_error() {
        let session = ScriptedSession::new().fail_next_commit("configure vlan", "Error: rejected");
        let mut driver = driver_with(session);

        driver
            .load_replace_candidate(ConfigSource::Text("configure vlan".to_string()))
            .await
            .unwrap();
        let err = driver.commit_config().await.unwrap_err();
        assert!(matches!(err, DriverError::ReplaceConfigFailed(_)));
    }

    #[tokio::test]
    async fn failed_compensating_rollback_reports_both_errors() {
        let session = ScriptedSession::new()
            .fail_next_commit("create vlan blue", "Error: busy")
            .fail_next_rollback("Error: link down");
        let mut driver = driver_with(session);

        driver
            .load_merge_candidate(ConfigSource::Text("create vlan blue".to_string()))
            .await
            .unwrap();
        let err = driver.commit_config().await.unwrap_err();

        match err {
            DriverError::RollbackFailed { commit, rollback } => {
                assert!(commit.contains("busy"));
                assert!(rollback.contains("link down"));
            }
            other => panic!("expected RollbackFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_commit_enables_one_rollback() {
        let session = ScriptedSession::new();
        let log = session.call_log();
        let mut driver = driver_with(session);

        driver
            .load_merge_candidate(ConfigSource::Text("create vlan blue".to_string()))
            .await
            .unwrap();
        driver.commit_config().await.unwrap();
        assert_eq!(driver.config_state(), ConfigState::Idle);
        assert!(driver.has_pending_changes());

        driver.rollback().await.unwrap();
        assert!(!driver.has_pending_changes());

        // A second rollback is a no-op.
        driver.rollback().await.unwrap();
        let rollbacks = log.count_matching(|call| *call == SessionCall::Rollback);
        assert_eq!(rollbacks, 1);
    }

    #[tokio::test]
    async fn rollback_without_committed_change_skips_the_device() {
        let session = ScriptedSession::new();
        let log = session.call_log();
        let mut driver = driver_with(session);

        driver.rollback().await.unwrap();
        assert!(log.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_failure_is_reported_as_connection_failure() {
        let session = ScriptedSession::new().fail_open("kex negotiation failed");
        let mut driver = driver_with(session);

        let err = driver.open().await.unwrap_err();
        match err {
            DriverError::ConnectionFailed(host) => assert_eq!(host, "sw1.example.net"),
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cli_keys_outputs_by_command() {
        let session = ScriptedSession::new()
            .with_output("show switch", "SysName: sw1\n")
            .with_output("show version", "Switch : 800776-00-09 1624G-31415 Rev 9 IMG: 22.5.1.7\n");
        let mut driver = driver_with(session);

        let outputs = driver.cli(&["show switch", "show version"]).await.unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs["show switch"].contains("SysName"));
        assert!(outputs["show version"].contains("IMG:"));
    }

    #[tokio::test]
    async fn operations_before_open_fail_without_a_session() {
        let mut driver = ExosDriver::new("sw1.example.net", "admin", "secret");
        assert!(!driver.is_alive());
        let err = driver.cli(&["show switch"]).await.unwrap_err();
        assert!(matches!(err, DriverError::SessionNotOpen));
    }
}
