//! EXOS CLI session over SSH.
//!
//! This module owns the interactive shell channel to one device and the
//! candidate-configuration lifecycle built on top of it. A session is
//! exclusively owned by a single driver instance: opened once, used for
//! every command round-trip, released on close. There is no pooling and no
//! sharing between drivers.
//!
//! # Main Components
//!
//! - [`CliSession`] - The operation contract consumed by the driver
//! - [`ExosSession`] - SSH implementation with prompt detection
//! - [`ScriptedSession`] - Offline implementation for tests and replay
//! - [`ConfigSource`] - Candidate configuration input (file or inline text)

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::Config;
use async_trait::async_trait;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use russh::ChannelMsg;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::error::DriverError;
use crate::templates;

pub use replay::{CallLog, ScriptedSession, SessionCall};
pub use security::{ConnectionSecurityOptions, SecurityLevel};

/// Source of a candidate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read the candidate from a local file.
    Path(PathBuf),
    /// Use the given text directly.
    Text(String),
}

/// Operations the driver needs from a CLI session.
///
/// [`ExosSession`] implements this over SSH; [`ScriptedSession`] implements
/// it over canned outputs so driver behavior can be exercised offline.
#[async_trait]
pub trait CliSession: Send {
    /// Establishes the session. Must be called before any other operation.
    async fn open(&mut self) -> Result<(), DriverError>;

    /// Releases the session unconditionally.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Reports current liveness without side effects.
    fn is_alive(&self) -> bool;

    /// Executes one command and returns its raw textual output.
    async fn send_command(&mut self, command: &str) -> Result<String, DriverError>;

    /// Stages a candidate configuration without touching the device.
    async fn load_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError>;

    /// Diff of the candidate against the running configuration, merge view.
    async fn compare_merge_config(&mut self) -> Result<String, DriverError>;

    /// Diff of the candidate against the running configuration, replace view.
    async fn compare_replace_config(&mut self) -> Result<String, DriverError>;

    /// Applies the candidate on top of the running configuration.
    async fn commit_merge_config(&mut self) -> Result<(), DriverError>;

    /// Makes the candidate the entire configuration.
    async fn commit_replace_config(&mut self) -> Result<(), DriverError>;

    /// Drops the staged candidate.
    async fn discard_config(&mut self) -> Result<(), DriverError>;

    /// Undoes the commands applied by the most recent commit attempt.
    async fn rollback(&mut self) -> Result<(), DriverError>;
}

/// Connection parameters for one device, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    /// Single timeout applied to connection setup and each command read.
    pub timeout: Duration,
    pub security: ConnectionSecurityOptions,
}

/// One applied configuration command with the command that restores the
/// state it replaced, when one could be inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub command: String,
    pub restore: Option<String>,
}

/// SSH session to one EXOS device.
pub struct ExosSession {
    params: SessionParams,
    link: Option<ShellLink>,
    candidate: Option<Vec<String>>,
    journal: Vec<JournalEntry>,
}

/// Live shell channel state.
struct ShellLink {
    client: Client,
    to_shell: Sender<String>,
    from_shell: Receiver<String>,
    prompt: String,
}

impl ExosSession {
    /// Creates an unconnected session; call [`CliSession::open`] to connect.
    pub fn new(params: SessionParams) -> Self {
        Self {
            params,
            link: None,
            candidate: None,
            journal: Vec::new(),
        }
    }

    /// The staged candidate lines, if any.
    pub fn candidate(&self) -> Option<&[String]> {
        self.candidate.as_deref()
    }

    /// The journal of applied commands from the last commit attempt.
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }
}

mod client;
mod config_ops;
mod replay;
mod security;
