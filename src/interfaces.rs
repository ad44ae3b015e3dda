//! Interface inventory model and speed-code mapping.
//!
//! This driver only collects the link speed per port; every other interface
//! attribute is reported as `None`, an explicit "not collected" marker that
//! callers can tell apart from an observed empty value.

use std::collections::{BTreeMap, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Textual speed codes as printed by EXOS, with their Mbps values.
pub const SPEED_CODES: &[(&str, u64)] = &[
    ("100M", 100),
    ("1G", 1_000),
    ("10G", 10_000),
    ("25G", 25_000),
    ("40G", 40_000),
    ("100G", 100_000),
];

/// One interface as reported by the driver.
///
/// `None` fields are not queried by this driver at all; only `speed_mbps`
/// is observed (0 when the port reports no recognized speed code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Interface {
    pub is_up: Option<bool>,
    pub is_enabled: Option<bool>,
    pub description: Option<String>,
    /// Seconds since the last link flap, when collected.
    pub last_flapped: Option<i64>,
    pub speed_mbps: u64,
    pub mtu: Option<u32>,
    pub mac_address: Option<String>,
}

impl Interface {
    /// An interface record carrying only an observed speed.
    pub fn with_speed(speed_mbps: u64) -> Self {
        Self {
            is_up: None,
            is_enabled: None,
            description: None,
            last_flapped: None,
            speed_mbps,
            mtu: None,
            mac_address: None,
        }
    }
}

/// Maps a textual speed code to Mbps. Total: unrecognized codes map to 0.
pub fn speed_from_code(code: &str) -> u64 {
    SPEED_CODES
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(_, mbps)| *mbps)
        .unwrap_or(0)
}

/// Builds the interface inventory from template rows of `(port, speed)`.
///
/// Rows missing a port name are dropped; duplicate ports keep the last row.
pub fn interfaces_from_rows(rows: &[HashMap<String, String>]) -> BTreeMap<String, Interface> {
    let mut interfaces = BTreeMap::new();
    for row in rows {
        let Some(port) = row.get("port").filter(|p| !p.is_empty()) else {
            continue;
        };
        let speed = row.get("speed").map(String::as_str).unwrap_or_default();
        interfaces.insert(port.clone(), Interface::with_speed(speed_from_code(speed)));
    }
    interfaces
}
