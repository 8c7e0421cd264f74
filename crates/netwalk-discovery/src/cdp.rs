//! CDP (Cisco Discovery Protocol) neighbor detail parsing
//!
//! `show cdp neighbors detail` prints one block per neighbor, each starting
//! with a `Device ID:` line. Attribute lines are matched by marker substring,
//! so indentation and firmware-specific extra lines do not matter.

use netwalk_core::{NeighborRecord, NOT_AVAILABLE};
use tracing::debug;

const DEVICE_ID: &str = "Device ID: ";
const IP_ADDRESS: &str = "IP address: ";
const INTERFACE: &str = "Interface: ";
const PORT_ID: &str = "Port ID (outgoing port): ";
const PLATFORM: &str = "Platform: ";

/// Parse CDP neighbor detail output into one record per advertised neighbor
///
/// Never fails: attributes that do not appear in a block keep the
/// "not available" marker, and lines before the first `Device ID:` are
/// ignored.
pub fn parse_neighbors(output: &str, local_device: &str) -> Vec<NeighborRecord> {
    let mut neighbors = Vec::new();
    let mut current: Option<NeighborRecord> = None;

    for line in output.lines() {
        if let Some(name) = after(line, DEVICE_ID) {
            // New block, save the previous neighbor
            if let Some(done) = current.take() {
                neighbors.push(done);
            }
            current = Some(NeighborRecord::unavailable(local_device, name.trim()));
            continue;
        }

        let Some(neighbor) = current.as_mut() else {
            continue;
        };

        if let Some(ip) = after(line, IP_ADDRESS) {
            // Later entries (management address) replace earlier ones
            neighbor.ip = ip.trim().to_string();
        } else if let Some(rest) = after(line, INTERFACE) {
            neighbor.local_interface = first_field(rest);
            neighbor.neighbor_interface = after(line, PORT_ID)
                .map(|port| port.trim().to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        } else if let Some(rest) = after(line, PLATFORM) {
            neighbor.platform = first_field(rest);
        }
    }

    // Don't forget the last neighbor
    if let Some(done) = current {
        neighbors.push(done);
    }

    debug!(device = %local_device, count = neighbors.len(), "Parsed CDP neighbors");
    neighbors
}

fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|idx| &line[idx + marker.len()..])
}

/// Text up to the first comma
fn first_field(rest: &str) -> String {
    rest.split(',').next().unwrap_or_default().trim().to_string()
}
