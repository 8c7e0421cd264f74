//! Classification policy - platform patterns and crawl exclusions
//!
//! A policy decides which category a platform string belongs to and which
//! neighbors must never be crawled. The built-in default carries the curated
//! lists for common Cisco campus gear; a TOML file can replace any list.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::device::NOT_AVAILABLE;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse policy file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize policy: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Immutable set of patterns consulted by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Platform prefixes identifying switches and routers
    #[serde(default = "default_switch")]
    pub switch: Vec<String>,
    /// Platform prefixes identifying wireless access points
    #[serde(default = "default_access_point")]
    pub access_point: Vec<String>,
    /// Platform prefixes identifying IP phones
    #[serde(default = "default_phone")]
    pub phone: Vec<String>,
    /// Platform prefixes identifying video endpoints
    #[serde(default = "default_video_endpoint")]
    pub video_endpoint: Vec<String>,
    /// Platform substrings (case-insensitive) that are never crawled
    #[serde(default = "default_omit_platforms")]
    pub omit_platforms: Vec<String>,
    /// Addresses that are never crawled
    #[serde(default)]
    pub excluded_addresses: Vec<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            switch: default_switch(),
            access_point: default_access_point(),
            phone: default_phone(),
            video_endpoint: default_video_endpoint(),
            omit_platforms: default_omit_platforms(),
            excluded_addresses: Vec::new(),
        }
        .normalized()
    }
}

impl Policy {
    /// An empty policy: everything is Unknown and only neighbors without an
    /// address are omitted
    pub fn empty() -> Self {
        Self {
            switch: Vec::new(),
            access_point: Vec::new(),
            phone: Vec::new(),
            video_endpoint: Vec::new(),
            omit_platforms: Vec::new(),
            excluded_addresses: Vec::new(),
        }
        .normalized()
    }

    /// Load a policy from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        let policy = Self::from_toml(&content)?;
        info!(
            path = %path.display(),
            omit = policy.omit_platforms.len(),
            excluded = policy.excluded_addresses.len(),
            "Loaded classification policy"
        );
        Ok(policy)
    }

    /// Load a policy from a TOML string; missing lists keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, PolicyError> {
        let policy: Policy = toml::from_str(content)?;
        Ok(policy.normalized())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, PolicyError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Add more excluded addresses, e.g. from the main configuration
    pub fn with_excluded_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_addresses
            .extend(addresses.into_iter().map(Into::into));
        self.normalized()
    }

    /// Whether an address is on the exclusion list
    pub fn is_excluded_address(&self, address: &str) -> bool {
        self.excluded_addresses.iter().any(|a| a == address)
    }

    // Neighbors without a resolvable address can never be crawled
    fn normalized(mut self) -> Self {
        if !self.is_excluded_address(NOT_AVAILABLE) {
            self.excluded_addresses.push(NOT_AVAILABLE.to_string());
        }
        dedup_in_order(&mut self.switch);
        dedup_in_order(&mut self.access_point);
        dedup_in_order(&mut self.phone);
        dedup_in_order(&mut self.video_endpoint);
        dedup_in_order(&mut self.omit_platforms);
        dedup_in_order(&mut self.excluded_addresses);
        self
    }
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_switch() -> Vec<String> {
    strings(&[
        "cisco C9300-48UXM",
        "cisco C9200L-24P-4G",
        "cisco C9200-48P",
        "cisco C9300-24T",
        "cisco WS-C3850-48P",
        "cisco IE-3400-8P2S",
        "cisco C9500-16X",
        "cisco C8300-2N2S-4T2X",
        "cisco WS-C2960X-48FPS-L",
        "cisco WS-C3850-24P",
        "cisco WS-C2960X-48FPD-L",
        "cisco C9500-48Y4C",
        "cisco C9500-40X",
        "cisco C9300L-24P-4G",
        "cisco ISR4351/K9",
        "cisco C9300-48P",
        "cisco C9200-24PXG",
        "cisco C9200L-24P-4X",
        "cisco C9300-24P",
        "cisco C9300L-24P-4X",
        "cisco C9300L-24T-4G",
        "cisco C9300L-48P-4G",
        "cisco IE-2000-8TC-G-L",
        "cisco IE-4010-16S12P",
        "cisco WS-C2960-24PC-L",
        "cisco WS-C2960-48PST-L",
        "cisco WS-C2960X-24PS-L",
        "cisco WS-C3560CX-12PC-S",
        "cisco WS-C3560CX-8PC-S",
        "cisco C9200-24P",
        "cisco IE-3400-8T2S",
        "cisco C9200L-24T-4G",
        "cisco IE-4000-8T4G-E",
        "cisco IE-2000-16TC-G-L",
    ])
}

fn default_access_point() -> Vec<String> {
    strings(&[
        "cisco AIR-AP2802I-A-K9",
        "cisco C9130AXI-A",
        "cisco AIR-AP3802I-A-K9",
        "IW-6300H-DC-A-K9",
        "cisco AIR-AP1852E-A-K9",
        "cisco AIR-AP3802I-H-K9",
        "cisco AIR-AP3802I-N-K9",
        "cisco IW-6300H-DC-A-K9",
        "MikroTik",
        "cisco AIR-AP1562I-A-K9",
    ])
}

fn default_phone() -> Vec<String> {
    strings(&[
        "Cisco IP Phone 7821",
        "Cisco IP Phone 7841",
        "CTS-CODEC-DX80",
        "CTS-CODEC-MX300 G2",
    ])
}

fn default_video_endpoint() -> Vec<String> {
    strings(&[
        "Board Pro 75",
        "Board Pro 55",
        "Desk Pro",
        "Room 70D",
        "Room 55",
        "Room 70S G2",
        "Room Bar",
        "Room Kit Mini",
    ])
}

fn default_omit_platforms() -> Vec<String> {
    strings(&[
        "Cisco IP Phone 7841",
        "Cisco IP Phone 7821",
        "Cisco IP Phone 7942",
        "Board Pro 55",
        "Room 55",
        "CTS-CODEC-DX80",
        "cisco AIR-AP3802I-A-K9",
        "cisco AIR-AP2802I-A-K9",
        "cisco AIR-AP3802E-A-K9",
        "cisco AIR-CAP2702I-A-K9",
        "Room 70D",
        "CTS-CODEC-MX200 G2",
        "CTS-CODEC-inTouch",
        "Desk Pro",
        "cisco C9130AXI-A",
        "Board Pro eth0",
        "Board Pro 75",
        "IW-6300H-DC-A-K9",
        "Cisco-VM-SPID",
        "CTS-CODEC-MX300 G2",
        "ISE-VM-K9",
        "MikroTik",
        "Room 70S G2",
        "Room Bar",
        "Room Kit Mini",
        "cisco AIR-AP3802I-N-K9",
        "cisco AIR-AP1852E-A-K9",
        "cisco AIR-AP3802I-H-K9",
        "cisco AIR-AP1562I-A-K9",
    ])
}
