//! Session capability consumed by the discovery engine
//!
//! The engine never talks to a transport directly. It asks a
//! [`SessionGateway`] for a [`DeviceSession`], runs commands on it, and
//! closes it. Implementations decide how commands are carried.

use async_trait::async_trait;
use netwalk_core::CredentialAttempt;
use thiserror::Error;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default connect and per-command timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Host unreachable, refused, or not resolvable
    #[error("Connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },
    /// Credentials rejected
    #[error("Authentication as {username} on {host} failed: {reason}")]
    Authentication {
        host: String,
        username: String,
        reason: String,
    },
    /// Connect or command exceeded the configured timeout
    #[error("Timed out talking to {host}: {reason}")]
    Timeout { host: String, reason: String },
    /// Device reachable but the command failed
    #[error("Command '{command}' failed on {host}: {reason}")]
    Command {
        host: String,
        command: String,
        reason: String,
    },
    /// Session used after close
    #[error("Session to {0} is closed")]
    Closed(String),
}

impl SessionError {
    /// Whether another credential might succeed where this one failed
    pub fn is_authentication(&self) -> bool {
        matches!(self, SessionError::Authentication { .. })
    }

    /// Whether the device could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            SessionError::Connection { .. } | SessionError::Timeout { .. }
        )
    }
}

/// An open, authenticated session to one device
#[async_trait]
pub trait DeviceSession: Send {
    /// Run a command and return its raw text output
    async fn run_command(&mut self, command: &str) -> Result<String, SessionError>;

    /// Release the session; later commands fail with [`SessionError::Closed`]
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions to devices
#[async_trait]
pub trait SessionGateway: Send + Sync {
    type Session: DeviceSession + 'static;

    /// Open a session to `host` using one login attempt
    async fn open(
        &self,
        host: &str,
        login: &CredentialAttempt,
    ) -> Result<Self::Session, SessionError>;
}
