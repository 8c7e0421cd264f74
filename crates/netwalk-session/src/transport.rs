//! SSH transport for device sessions
//!
//! libssh2 is blocking, so every call is moved onto the blocking pool and the
//! session handle is shared through a mutex.

use async_trait::async_trait;
use netwalk_core::CredentialAttempt;
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::gateway::{
    DeviceSession, SessionError, SessionGateway, DEFAULT_SSH_PORT, DEFAULT_TIMEOUT_MS,
};

/// libssh2 error code for an expired blocking timeout
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// Opens password-authenticated SSH sessions
#[derive(Debug, Clone)]
pub struct SshGateway {
    port: u16,
    timeout_ms: u64,
    privileged: bool,
}

impl Default for SshGateway {
    fn default() -> Self {
        Self::new(DEFAULT_SSH_PORT, DEFAULT_TIMEOUT_MS)
    }
}

impl SshGateway {
    /// Create a gateway connecting to `port` with a connect/command timeout
    pub fn new(port: u16, timeout_ms: u64) -> Self {
        Self {
            port,
            timeout_ms,
            privileged: false,
        }
    }

    /// Run commands from privileged mode (enable + secret) instead of a plain exec channel
    pub fn privileged(mut self, enabled: bool) -> Self {
        self.privileged = enabled;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

#[async_trait]
impl SessionGateway for SshGateway {
    type Session = SshSession;

    async fn open(
        &self,
        host: &str,
        login: &CredentialAttempt,
    ) -> Result<SshSession, SessionError> {
        debug!(host = %host, port = self.port, login = %login.label, "Opening SSH session");

        let target = host.to_string();
        let port = self.port;
        let timeout_ms = self.timeout_ms;
        let attempt = login.clone();
        let session = tokio::task::spawn_blocking(move || {
            connect_sync(&target, port, timeout_ms, &attempt)
        })
        .await
        .map_err(|e| SessionError::Connection {
            host: host.to_string(),
            reason: e.to_string(),
        })??;

        Ok(SshSession {
            host: host.to_string(),
            session: Some(Arc::new(Mutex::new(session))),
            privileged: self.privileged,
            secret: login.secret.clone(),
        })
    }
}

/// An authenticated SSH session to one device
pub struct SshSession {
    host: String,
    session: Option<Arc<Mutex<Session>>>,
    privileged: bool,
    secret: String,
}

#[async_trait]
impl DeviceSession for SshSession {
    async fn run_command(&mut self, command: &str) -> Result<String, SessionError> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| SessionError::Closed(self.host.clone()))?;

        trace!(host = %self.host, command = %command, "Running command");

        let host = self.host.clone();
        let cmd = command.to_string();
        let secret = self.secret.clone();
        let privileged = self.privileged;
        tokio::task::spawn_blocking(move || {
            let session = session.blocking_lock();
            if privileged {
                shell_sync(&session, &host, &secret, &cmd)
            } else {
                exec_sync(&session, &host, &cmd)
            }
        })
        .await
        .map_err(|e| SessionError::Command {
            host: self.host.clone(),
            command: command.to_string(),
            reason: e.to_string(),
        })?
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let session = session.lock().await;
        session
            .disconnect(Some(ssh2::DisconnectCode::ByApplication), "", None)
            .map_err(|e| SessionError::Connection {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;
        debug!(host = %self.host, "SSH session closed");
        Ok(())
    }
}

fn connect_sync(
    host: &str,
    port: u16,
    timeout_ms: u64,
    login: &CredentialAttempt,
) -> Result<Session, SessionError> {
    let connection = |reason: String| SessionError::Connection {
        host: host.to_string(),
        reason,
    };

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| connection(format!("address resolution failed: {}", e)))?
        .next()
        .ok_or_else(|| connection("host resolved to no addresses".to_string()))?;

    let tcp = TcpStream::connect_timeout(&addr, Duration::from_millis(timeout_ms)).map_err(
        |e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                SessionError::Timeout {
                    host: host.to_string(),
                    reason: e.to_string(),
                }
            }
            _ => connection(e.to_string()),
        },
    )?;

    let mut session = Session::new().map_err(|e| connection(e.to_string()))?;
    session.set_timeout(timeout_ms.min(u32::MAX as u64) as u32);
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| ssh_error(host, e, connection))?;

    session
        .userauth_password(&login.username, &login.password)
        .map_err(|e| {
            ssh_error(host, e, |reason| SessionError::Authentication {
                host: host.to_string(),
                username: login.username.clone(),
                reason,
            })
        })?;

    if !session.authenticated() {
        return Err(SessionError::Authentication {
            host: host.to_string(),
            username: login.username.clone(),
            reason: "server did not accept the password".to_string(),
        });
    }

    Ok(session)
}

/// Run one command on an exec channel
fn exec_sync(session: &Session, host: &str, command: &str) -> Result<String, SessionError> {
    let failed = |reason: String| SessionError::Command {
        host: host.to_string(),
        command: command.to_string(),
        reason,
    };

    let mut channel = session
        .channel_session()
        .map_err(|e| ssh_error(host, e, failed))?;
    channel.exec(command).map_err(|e| ssh_error(host, e, failed))?;

    let mut output = Vec::new();
    channel
        .read_to_end(&mut output)
        .map_err(|e| io_error(host, e, failed))?;
    channel.wait_close().map_err(|e| ssh_error(host, e, failed))?;
    Ok(decode_output(&output))
}

/// Run one command from privileged mode on an interactive shell
fn shell_sync(
    session: &Session,
    host: &str,
    secret: &str,
    command: &str,
) -> Result<String, SessionError> {
    let failed = |reason: String| SessionError::Command {
        host: host.to_string(),
        command: command.to_string(),
        reason,
    };

    let mut channel = session
        .channel_session()
        .map_err(|e| ssh_error(host, e, failed))?;
    channel
        .request_pty("vt100", None, None)
        .map_err(|e| ssh_error(host, e, failed))?;
    channel.shell().map_err(|e| ssh_error(host, e, failed))?;
    channel
        .write_all(privileged_script(secret, command).as_bytes())
        .map_err(|e| io_error(host, e, failed))?;
    channel.send_eof().map_err(|e| ssh_error(host, e, failed))?;

    let mut output = Vec::new();
    channel
        .read_to_end(&mut output)
        .map_err(|e| io_error(host, e, failed))?;
    channel.wait_close().map_err(|e| ssh_error(host, e, failed))?;
    Ok(decode_output(&output))
}

/// Device output as text; bytes that are not UTF-8 become U+FFFD
fn decode_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Keystrokes that enter privileged mode, disable paging, run `command`, and leave
pub fn privileged_script(secret: &str, command: &str) -> String {
    let mut script = String::from("enable\n");
    if !secret.is_empty() {
        script.push_str(secret);
        script.push('\n');
    }
    script.push_str("terminal length 0\n");
    script.push_str(command);
    script.push_str("\nexit\n");
    script
}

fn ssh_error<F>(host: &str, e: ssh2::Error, otherwise: F) -> SessionError
where
    F: FnOnce(String) -> SessionError,
{
    if e.code() == ssh2::ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) {
        SessionError::Timeout {
            host: host.to_string(),
            reason: e.to_string(),
        }
    } else {
        otherwise(e.to_string())
    }
}

fn io_error<F>(host: &str, e: std::io::Error, otherwise: F) -> SessionError
where
    F: FnOnce(String) -> SessionError,
{
    match e.kind() {
        std::io::ErrorKind::TimedOut => SessionError::Timeout {
            host: host.to_string(),
            reason: e.to_string(),
        },
        _ => otherwise(e.to_string()),
    }
}
