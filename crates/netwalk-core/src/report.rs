//! Read-only report views over a finished walk
//!
//! Every view is a pure projection of the edge sequence; none of them
//! mutates or reorders the edges themselves.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::device::Category;
use crate::topology::TopologyEdge;

/// One visited device (or one chassis of a stack) with its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub device_name: String,
    pub device_ip: String,
    pub mac_address: String,
    pub serial_number: String,
    pub model: String,
    pub firmware_version: String,
    pub software_image: String,
}

impl InventoryRow {
    fn from_edge(edge: &TopologyEdge) -> Self {
        Self {
            device_name: edge.source_name.clone(),
            device_ip: edge.source_ip.clone(),
            mac_address: edge.version.mac_addresses.clone(),
            serial_number: edge.version.serial_numbers.clone(),
            model: edge.version.model.clone(),
            firmware_version: edge.version.firmware_version.clone(),
            software_image: edge.version.software_image.clone(),
        }
    }
}

/// A terminal device together with the switch port it hangs off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDevice {
    pub name: String,
    pub ip: String,
    /// Advertised platform of the terminal device
    pub model: String,
    pub uplink_name: String,
    pub uplink_port: String,
    pub uplink_ip: String,
}

/// One row per visited device, deduplicated by (name, IP); first occurrence wins
pub fn inventory(edges: &[TopologyEdge]) -> Vec<InventoryRow> {
    dedup_by_identity(edges.iter().map(InventoryRow::from_edge))
}

/// Inventory rows of stacked devices only
pub fn stacks(edges: &[TopologyEdge]) -> Vec<InventoryRow> {
    dedup_by_identity(
        edges
            .iter()
            .filter(|edge| edge.version.is_stacked())
            .map(InventoryRow::from_edge),
    )
}

/// One row per physical chassis
///
/// A stacked device becomes one row per member, named `<device>-1`,
/// `<device>-2`, ... and pairing MAC addresses with serial numbers in order
/// (see [`crate::VersionRecord::chassis`]). Other devices pass through unchanged.
pub fn stack_expansion(edges: &[TopologyEdge]) -> Vec<InventoryRow> {
    let rows = edges.iter().flat_map(|edge| {
        let row = InventoryRow::from_edge(edge);
        if !edge.version.is_stacked() {
            return vec![row];
        }
        edge.version
            .chassis()
            .into_iter()
            .enumerate()
            .map(|(idx, member)| InventoryRow {
                device_name: format!("{}-{}", row.device_name, idx + 1),
                mac_address: member.mac_address,
                serial_number: member.serial_number,
                ..row.clone()
            })
            .collect()
    });
    dedup_by_identity(rows)
}

/// Terminal devices of one category with their uplinks
pub fn attached(edges: &[TopologyEdge], category: Category) -> Vec<AttachedDevice> {
    edges
        .iter()
        .filter(|edge| edge.category == category)
        .map(|edge| AttachedDevice {
            name: edge.neighbor.name.clone(),
            ip: edge.neighbor.ip.clone(),
            model: edge.neighbor.platform.clone(),
            uplink_name: edge.source_name.clone(),
            uplink_port: edge.neighbor.local_interface.clone(),
            uplink_ip: edge.source_ip.clone(),
        })
        .collect()
}

fn dedup_by_identity<I>(rows: I) -> Vec<InventoryRow>
where
    I: IntoIterator<Item = InventoryRow>,
{
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert((row.device_name.clone(), row.device_ip.clone())))
        .collect()
}
