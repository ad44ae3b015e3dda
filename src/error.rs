//! Error types for driver operations, the CLI session, and the
//! candidate-configuration lifecycle.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors that can occur while driving an EXOS device.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device could not be reached or the session could not be set up.
    ///
    /// `open` collapses every underlying cause (TCP, authentication, prompt
    /// detection) into this one variant; the cause is logged at debug level.
    #[error("unable to connect to {0}")]
    ConnectionFailed(String),

    /// `commit_config` was called without a prior candidate load.
    #[error("no configuration loaded")]
    NoCandidateLoaded,

    /// A merge commit failed on the device; the compensating rollback ran.
    #[error("merge commit failed: {0}")]
    MergeConfigFailed(String),

    /// A replace commit failed on the device; the compensating rollback ran.
    #[error("replace commit failed: {0}")]
    ReplaceConfigFailed(String),

    /// A commit failed and the compensating rollback failed too.
    ///
    /// The device may be left partially configured; callers should not retry
    /// before inspecting it.
    #[error("commit failed ({commit}) and rollback failed ({rollback}); device state unknown")]
    RollbackFailed { commit: String, rollback: String },

    /// An operation was attempted before `open` or after `close`.
    #[error("session not open")]
    SessionNotOpen,

    /// The device reported an error for a configuration command.
    #[error("command '{command}' rejected by device: {output}")]
    CommandFailed { command: String, output: String },

    /// Command execution timed out.
    ///
    /// Contains the partial output received before the timeout.
    #[error("exec command timeout: {0}")]
    ExecTimeout(String),

    /// The device never presented a recognizable prompt during `open`.
    #[error("timed out waiting for device prompt: {0}")]
    InitTimeout(String),

    /// The SSH channel was closed while waiting for output.
    #[error("channel disconnect while waiting for output")]
    ChannelDisconnect,

    /// A text-table template could not be parsed or compiled.
    #[error("invalid table template: {0}")]
    InvalidTemplate(String),

    /// A scripted session had no output programmed for a command.
    #[error("no scripted output for: {0}")]
    ScriptExhausted(String),

    /// Internal invariant violation (lock poisoning, encoding failures).
    #[error("internal error: {0}")]
    Internal(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Failed to send data through the shell channel.
    #[error("failed to send data: {0}")]
    SendDataError(#[from] SendError<String>),

    /// Candidate file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
