//! Topology records produced by a discovery walk

use serde::{Deserialize, Serialize};

use crate::device::{Category, ConnectionStatus, NOT_AVAILABLE, UNKNOWN};

/// Separator used when a field carries one value per stack member
pub const LIST_SEPARATOR: &str = ", ";

/// One neighbor advertisement entry as seen from a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    /// Name of the device that reported this neighbor
    pub local_device: String,
    /// Neighbor device name
    pub name: String,
    /// Neighbor IP address
    pub ip: String,
    /// Interface on the reporting device
    pub local_interface: String,
    /// Interface on the neighbor
    pub neighbor_interface: String,
    /// Neighbor platform string
    pub platform: String,
}

impl NeighborRecord {
    /// A record with every attribute set to the "not available" marker
    pub fn unavailable(local_device: &str, name: &str) -> Self {
        Self {
            local_device: local_device.to_string(),
            name: name.to_string(),
            ip: NOT_AVAILABLE.to_string(),
            local_interface: NOT_AVAILABLE.to_string(),
            neighbor_interface: NOT_AVAILABLE.to_string(),
            platform: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Hardware and software identity of a visited device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Base MAC addresses, one per stack member
    pub mac_addresses: String,
    /// Serial numbers, one per stack member
    pub serial_numbers: String,
    pub model: String,
    pub firmware_version: String,
    pub software_image: String,
}

impl Default for VersionRecord {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One physical chassis of a (possibly stacked) device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chassis {
    pub mac_address: String,
    pub serial_number: String,
}

impl VersionRecord {
    /// A record where nothing could be determined
    pub fn unknown() -> Self {
        Self {
            mac_addresses: UNKNOWN.to_string(),
            serial_numbers: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            firmware_version: UNKNOWN.to_string(),
            software_image: UNKNOWN.to_string(),
        }
    }

    /// True when the device reported more than one MAC or serial number
    pub fn is_stacked(&self) -> bool {
        self.mac_addresses.contains(',') || self.serial_numbers.contains(',')
    }

    /// Pair MAC addresses with serial numbers, member by member
    ///
    /// The longer list decides the member count; a member missing from the
    /// other list gets the unknown marker.
    pub fn chassis(&self) -> Vec<Chassis> {
        let macs = split_members(&self.mac_addresses);
        let serials = split_members(&self.serial_numbers);
        (0..macs.len().max(serials.len()))
            .map(|idx| Chassis {
                mac_address: macs.get(idx).copied().unwrap_or(UNKNOWN).to_string(),
                serial_number: serials.get(idx).copied().unwrap_or(UNKNOWN).to_string(),
            })
            .collect()
    }
}

fn split_members(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).collect()
}

/// The unit of output: one (device, neighbor) observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEdge {
    /// Name of the visited device
    pub source_name: String,
    /// Host identifier used to reach the visited device
    pub source_ip: String,
    pub neighbor: NeighborRecord,
    /// Category of the neighbor
    pub category: Category,
    pub status: ConnectionStatus,
    /// Version of the visited device (not of the neighbor)
    pub version: VersionRecord,
}
