//! Neighbor classification and crawl omission

use netwalk_core::{Category, Policy};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Why a neighbor is recorded but never crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmitReason {
    /// Platform contains a denylisted pattern
    Platform(String),
    /// Address is on the exclusion list
    Address,
}

impl fmt::Display for OmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmitReason::Platform(pattern) => write!(f, "platform matches '{}'", pattern),
            OmitReason::Address => write!(f, "address is excluded"),
        }
    }
}

/// Labels platforms and decides which neighbors are terminal
#[derive(Debug, Clone)]
pub struct Classifier {
    policy: Arc<Policy>,
    omit_lower: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Arc::new(Policy::default()))
    }
}

impl Classifier {
    pub fn new(policy: Arc<Policy>) -> Self {
        let omit_lower = policy
            .omit_platforms
            .iter()
            .map(|p| p.to_lowercase())
            .collect();
        Self { policy, omit_lower }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Category of a platform string
    ///
    /// Patterns are case-sensitive prefixes. Categories are tried in the
    /// order Switch, AccessPoint, Phone, VideoEndpoint and the first match
    /// wins.
    pub fn classify(&self, platform: &str) -> Category {
        let ordered = [
            (&self.policy.switch, Category::Switch),
            (&self.policy.access_point, Category::AccessPoint),
            (&self.policy.phone, Category::Phone),
            (&self.policy.video_endpoint, Category::VideoEndpoint),
        ];
        ordered
            .into_iter()
            .find(|(patterns, _)| patterns.iter().any(|p| platform.starts_with(p.as_str())))
            .map(|(_, category)| category)
            .unwrap_or_default()
    }

    /// Which omission rule, if any, applies to a neighbor
    pub fn omission_reason(&self, platform: &str, ip: &str) -> Option<OmitReason> {
        let lowered = platform.to_lowercase();
        if let Some(idx) = self
            .omit_lower
            .iter()
            .position(|pattern| lowered.contains(pattern.as_str()))
        {
            return Some(OmitReason::Platform(self.policy.omit_platforms[idx].clone()));
        }
        if self.policy.is_excluded_address(ip) {
            return Some(OmitReason::Address);
        }
        None
    }

    /// Whether a neighbor must be recorded without being crawled
    pub fn should_omit(&self, platform: &str, ip: &str) -> bool {
        match self.omission_reason(platform, ip) {
            Some(reason) => {
                info!(platform = %platform, ip = %ip, reason = %reason, "Omitting device");
                true
            }
            None => false,
        }
    }
}
