//! netwalk Discovery - Topology discovery over CDP neighbor advertisements
//!
//! This crate provides:
//! - Parsers for CDP neighbor detail and version banner output
//! - Policy-driven classification of neighbor platforms
//! - A shared frontier with atomic claim for de-duplicated visits
//! - The breadth-first discovery walker, sequential or with concurrent workers

pub mod cdp;
pub mod classify;
pub mod frontier;
pub mod version;
pub mod walker;

pub use cdp::parse_neighbors;
pub use classify::{Classifier, OmitReason};
pub use frontier::{Claim, CompletionGuard, Frontier};
pub use version::{parse_hostname, parse_version};
pub use walker::{
    CommandSet, DiscoveryWalker, FailedDevice, RunOutcome, WalkEvent, WalkerConfig,
};
