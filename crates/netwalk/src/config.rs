//! Configuration loading

use anyhow::{Context, Result};
use netwalk_core::{CredentialAttempt, DeviceCredential, Policy};
use netwalk_discovery::{CommandSet, WalkerConfig};
use netwalk_session::{SshGateway, DEFAULT_SSH_PORT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default, rename = "seed")]
    pub seeds: Vec<SeedConfig>,
    #[serde(default, rename = "fallback")]
    pub fallbacks: Vec<CredentialAttempt>,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Login used for seeds and inherited by every discovered neighbor
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Enable secret for privileged mode
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Starting device; unset login fields come from `[credentials]`
#[derive(Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Known platform, checked against the omission policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect and per-command timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Run commands from privileged mode using the enable secret
    #[serde(default)]
    pub privileged: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_secs: default_timeout(),
            privileged: false,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Devices walked at once (1 = strictly sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub commands: CommandSet,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            commands: CommandSet::default(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Classification policy file; built-in lists when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Addresses never crawled, added to the policy's own list
    #[serde(default)]
    pub excluded_addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> String {
    "./netwalk-report.json".to_string()
}

impl Config {
    /// Credential for a host given on the command line
    pub fn credential_for(&self, host: &str) -> DeviceCredential {
        DeviceCredential::new(
            host,
            &self.credentials.username,
            &self.credentials.password,
            &self.credentials.secret,
        )
    }

    /// Configured seeds, filling unset login fields from `[credentials]`
    pub fn seed_credentials(&self) -> Vec<DeviceCredential> {
        self.seeds
            .iter()
            .map(|seed| {
                let mut credential = self.credential_for(&seed.host);
                if let Some(username) = &seed.username {
                    credential.username = username.clone();
                }
                if let Some(password) = &seed.password {
                    credential.password = password.clone();
                }
                if let Some(secret) = &seed.secret {
                    credential.secret = secret.clone();
                }
                credential.platform = seed.platform.clone();
                credential
            })
            .collect()
    }

    /// Classification policy with the configured exclusions applied
    pub fn load_policy(&self) -> Result<Policy> {
        let policy = match &self.policy.path {
            Some(path) => Policy::from_file(Path::new(path))
                .with_context(|| format!("loading policy from {}", path))?,
            None => Policy::default(),
        };
        Ok(policy.with_excluded_addresses(self.policy.excluded_addresses.iter().cloned()))
    }

    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            fallbacks: self.fallbacks.clone(),
            commands: self.discovery.commands.clone(),
        }
    }

    pub fn gateway(&self) -> SshGateway {
        SshGateway::new(self.ssh.port, self.ssh.timeout_secs.saturating_mul(1000))
            .privileged(self.ssh.privileged)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(
            path = %path.display(),
            seeds = config.seeds.len(),
            fallbacks = config.fallbacks.len(),
            "Loaded configuration"
        );
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        credentials: CredentialsConfig {
            username: "netops".to_string(),
            password: "change-me".to_string(),
            secret: "change-me".to_string(),
        },
        seeds: vec![SeedConfig {
            host: "10.0.0.1".to_string(),
            username: None,
            password: None,
            secret: None,
            platform: None,
        }],
        fallbacks: vec![CredentialAttempt::new(
            "break-glass",
            "backup",
            "change-me",
            "change-me",
        )],
        ..Config::default()
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}
