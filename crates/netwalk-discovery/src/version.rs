//! Version banner parsing
//!
//! Extracts hardware identity (MAC, serial, model) and software version from
//! `show version` output. Stacks report one MAC and one serial per member,
//! which are joined in member order.

use netwalk_core::topology::LIST_SEPARATOR;
use netwalk_core::VersionRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Base ethernet MAC Address\s*:\s*(\S+)").expect("valid MAC regex")
});

static SERIAL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)System serial number\s*:\s*(\S+)").expect("valid serial regex")
});

// Active member row of the switch table, e.g.
// `*    1 52    C9300-48P    17.03.04    CAT9K_IOSXE    INSTALL`
static ACTIVE_MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\*\s+(.*)$").expect("valid banner regex"));

static UPTIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(\S+)\s+uptime is\b").expect("valid uptime regex"));

const BANNER_MODEL: usize = 2;
const BANNER_FIRMWARE: usize = 3;
const BANNER_IMAGE: usize = 4;
const LINE2_IMAGE: usize = 7;
const LINE2_FIRMWARE: usize = 9;

/// Parse version output into a [`VersionRecord`]
///
/// Never fails; anything that cannot be found stays "unknown". When the
/// second line of the output is long enough, its word 7 (image) and word 9
/// (firmware) take precedence over the switch table values.
pub fn parse_version(output: &str) -> VersionRecord {
    let mut record = VersionRecord::unknown();

    if let Some(macs) = collect(&MAC_ADDRESS, output) {
        record.mac_addresses = macs;
    }
    if let Some(serials) = collect(&SERIAL_NUMBER, output) {
        record.serial_numbers = serials;
    }

    if let Some(banner) = ACTIVE_MEMBER.captures(output).and_then(|c| c.get(1)) {
        let tokens: Vec<&str> = banner.as_str().split_whitespace().collect();
        if let Some(model) = tokens.get(BANNER_MODEL) {
            record.model = model.to_string();
        }
        if let Some(firmware) = tokens.get(BANNER_FIRMWARE) {
            record.firmware_version = firmware.to_string();
        }
        if let Some(image) = tokens.get(BANNER_IMAGE) {
            record.software_image = image.to_string();
        }
    }

    if let Some(line) = output.split('\n').nth(1) {
        let words: Vec<&str> = line.split_whitespace().collect();
        if let Some(image) = words.get(LINE2_IMAGE) {
            record.software_image = image.to_string();
        }
        if let Some(firmware) = words.get(LINE2_FIRMWARE) {
            record.firmware_version = firmware.to_string();
        }
    }

    record
}

/// Device hostname from the `<name> uptime is ...` line
pub fn parse_hostname(output: &str) -> Option<String> {
    UPTIME
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn collect(pattern: &Regex, output: &str) -> Option<String> {
    let values: Vec<&str> = pattern
        .captures_iter(output)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(LIST_SEPARATOR))
    }
}
