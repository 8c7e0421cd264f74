//! netwalk Session - Device session capability and SSH transport
//!
//! This crate provides:
//! - The [`SessionGateway`] / [`DeviceSession`] capability the discovery engine runs on
//! - A transport-independent error taxonomy ([`SessionError`])
//! - An ssh2-backed gateway with optional privileged-mode execution

pub mod gateway;
pub mod transport;

pub use gateway::{
    DeviceSession, SessionError, SessionGateway, DEFAULT_SSH_PORT, DEFAULT_TIMEOUT_MS,
};
pub use transport::{privileged_script, SshGateway, SshSession};
