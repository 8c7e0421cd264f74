//! netwalk Core - Core types, classification policy, and report views
//!
//! This crate provides the foundational types for netwalk:
//! - Device credentials and login attempts
//! - Neighbor, version, and topology edge records produced by a walk
//! - The classification policy (platform patterns, crawl exclusions)
//! - Read-only report projections (inventory, stack expansion, attached devices)

pub mod device;
pub mod policy;
pub mod report;
pub mod topology;

pub use device::{
    Category, ConnectionStatus, CredentialAttempt, DeviceCredential, NOT_AVAILABLE, UNKNOWN,
};
pub use policy::{Policy, PolicyError};
pub use report::{AttachedDevice, InventoryRow};
pub use topology::{Chassis, NeighborRecord, TopologyEdge, VersionRecord};
