//! Device credentials and the labels attached to discovered devices

use serde::{Deserialize, Serialize};

/// Marker for neighbor attributes missing from the advertisement text
pub const NOT_AVAILABLE: &str = "not available";

/// Marker for version fields that could not be determined
pub const UNKNOWN: &str = "unknown";

/// One way of logging in to a device
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttempt {
    /// Short name used in logs ("primary", "fallback-1", ...)
    #[serde(default = "default_label")]
    pub label: String,
    pub username: String,
    pub password: String,
    /// Privileged-mode (enable) secret
    #[serde(default)]
    pub secret: String,
}

fn default_label() -> String {
    "fallback".to_string()
}

impl CredentialAttempt {
    pub fn new(label: &str, username: &str, password: &str, secret: &str) -> Self {
        Self {
            label: label.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            secret: secret.to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAttempt")
            .field("label", &self.label)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A device waiting in (or taken from) the frontier
///
/// Created when a host is seeded or first advertised by a neighbor, and
/// consumed by a single processing attempt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCredential {
    /// Host identifier (IP address or hostname)
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub secret: String,
    /// Platform string, known when the device was discovered as a neighbor
    #[serde(default)]
    pub platform: Option<String>,
}

impl DeviceCredential {
    pub fn new(host: &str, username: &str, password: &str, secret: &str) -> Self {
        Self {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            secret: secret.to_string(),
            platform: None,
        }
    }

    /// Credential for a neighbor, inheriting this device's login family
    pub fn for_neighbor(&self, host: &str, platform: &str) -> Self {
        Self {
            host: host.to_string(),
            username: self.username.clone(),
            password: self.password.clone(),
            secret: self.secret.clone(),
            platform: Some(platform.to_string()),
        }
    }

    /// The primary login for this device
    pub fn primary(&self) -> CredentialAttempt {
        CredentialAttempt::new("primary", &self.username, &self.password, &self.secret)
    }

    /// Login attempts in the order they should be tried: primary first, then fallbacks
    pub fn attempts(&self, fallbacks: &[CredentialAttempt]) -> Vec<CredentialAttempt> {
        let mut attempts = Vec::with_capacity(fallbacks.len() + 1);
        attempts.push(self.primary());
        attempts.extend(fallbacks.iter().cloned());
        attempts
    }
}

impl std::fmt::Debug for DeviceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCredential")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("platform", &self.platform)
            .finish()
    }
}

/// Coarse device category derived from the advertised platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Switch,
    AccessPoint,
    VideoEndpoint,
    Phone,
    Unknown,
}

impl Category {
    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Category::Switch => "Switch",
            Category::AccessPoint => "AP",
            Category::VideoEndpoint => "VC",
            Category::Phone => "IP Phone",
            Category::Unknown => "N/A",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Whether a session was (or will be) opened to a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Neighbor is crawled
    Connected,
    /// Neighbor is recorded but never visited
    Omitted,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Omitted => write!(f, "Omitted"),
        }
    }
}
