//! Device identity extraction from `show switch` and `show version` output.
//!
//! Each field has its own extraction function anchored to the label text
//! EXOS prints, so a firmware-induced format change fails one specific test
//! instead of silently emptying a field. Extraction is best-effort: a
//! pattern that does not match yields an empty string, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Vendor string reported for every EXOS device.
pub const VENDOR: &str = "Extreme Networks";

/// Standardized identity record for a managed device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Facts {
    pub hostname: String,
    pub vendor: String,
    pub model: String,
    pub os_version: String,
    pub serial_number: String,
}

static SYSNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SysName:\s+(.*?)\r?\n").expect("sysname pattern"));

static SYSTEM_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"System Type:\s+(.*?)\r?\n").expect("system type pattern"));

// One line carries part number, serial, hardware revision and image version:
// "Switch : 800550-00-03 1624G-31415 Rev 03 BootROM: 1.0.1.9 IMG: 22.5.1.7"
static SERIAL_AND_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Switch\s+:\s(\S+)\s(?<serial>\S+)\sRev(.*?)IMG:\s(?<version>.*?)\r?\n")
        .expect("serial/version pattern")
});

/// Extracts the configured system name from `show switch` output.
pub fn sysname_from_show_switch(show_switch: &str) -> String {
    SYSNAME
        .captures(show_switch)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Extracts the hardware model from `show switch` output.
pub fn system_type_from_show_switch(show_switch: &str) -> String {
    SYSTEM_TYPE
        .captures(show_switch)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Extracts (serial number, OS version) from `show version` output.
pub fn serial_and_version_from_show_version(show_version: &str) -> (String, String) {
    match SERIAL_AND_VERSION.captures(show_version) {
        Some(caps) => (
            caps.name("serial")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
            caps.name("version")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    }
}

/// Assembles a [`Facts`] record from the two command outputs.
pub fn facts_from_cli_output(show_switch: &str, show_version: &str) -> Facts {
    let (serial_number, os_version) = serial_and_version_from_show_version(show_version);
    Facts {
        hostname: sysname_from_show_switch(show_switch),
        vendor: VENDOR.to_string(),
        model: system_type_from_show_switch(show_switch),
        os_version,
        serial_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_SWITCH: &str = "\
SysName:          sw1
SysLocation:      rack 4
SysContact:       noc@example.net
System MAC:       00:04:96:98:87:40
System Type:      X870-32c

SysHealth check:  Enabled (Normal)
Recovery Mode:    All
";

    const SHOW_VERSION: &str = "\
Switch          : 800550-00-03 1624G-31415 Rev 03 BootROM: 1.0.1.9    IMG: 22.5.1.7
Image   : ExtremeXOS version 22.5.1.7 by release-manager
          on Thu Jun 21 13:34:42 EDT 2018
BootROM : 1.0.1.9
";

    #[test]
    fn sysname_is_extracted_from_show_switch() {
        assert_eq!(sysname_from_show_switch(SHOW_SWITCH), "sw1");
    }

    #[test]
    fn system_type_is_extracted_from_show_switch() {
        assert_eq!(system_type_from_show_switch(SHOW_SWITCH), "X870-32c");
    }

    #[test]
    fn serial_and_version_are_extracted_from_show_version() {
        let (serial, version) = serial_and_version_from_show_version(SHOW_VERSION);
        assert_eq!(serial, "1624G-31415");
        assert_eq!(version, "22.5.1.7");
    }

    #[test]
    fn sysname_handles_crlf_line_endings() {
        let output = "SysName:          core-sw2\r\nSysLocation:      \r\n";
        assert_eq!(sysname_from_show_switch(output), "core-sw2");
    }

    #[test]
    fn non_matching_output_yields_empty_fields_not_errors() {
        let facts = facts_from_cli_output("garbage output\n", "more garbage\n");
        assert_eq!(facts.hostname, "");
        assert_eq!(facts.model, "");
        assert_eq!(facts.serial_number, "");
        assert_eq!(facts.os_version, "");
        assert_eq!(facts.vendor, VENDOR);
    }

    #[test]
    fn facts_assemble_all_fields() {
        let facts = facts_from_cli_output(SHOW_SWITCH, SHOW_VERSION);
        assert_eq!(
            facts,
            Facts {
                hostname: "sw1".to_string(),
                vendor: "Extreme Networks".to_string(),
                model: "X870-32c".to_string(),
                os_version: "22.5.1.7".to_string(),
                serial_number: "1624G-31415".to_string(),
            }
        );
    }
}
