//! Declarative text-table templates for fixed-format CLI output, plus
//! EXOS-specific command inversion rules.
//!
//! A template describes one command's tabular output as a named row pattern
//! with capture groups, stored as a versioned JSON file under `templates/`
//! and compiled to a [`regex::Regex`] at load time. Parsing is best-effort:
//! rows are whatever the pattern matches, and an optional group that did
//! not participate yields an empty field.

use std::collections::HashMap;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Names of templates shipped with this crate.
pub const BUILTIN_TEMPLATES: &[&str] = &["exos_show_port_information_detail"];

const SHOW_PORT_INFORMATION_DETAIL: &str =
    include_str!("../templates/exos_show_port_information_detail.json");

/// A versioned, declarative description of one command's text table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableTemplate {
    /// Template identifier (matches the file name).
    pub name: String,
    /// Version of the template, bumped on firmware format drift.
    pub template_version: String,
    /// The exact CLI command whose output this template parses.
    pub command: String,
    /// Fields extracted per row, in declaration order.
    pub fields: Vec<String>,
    /// Row pattern with one named capture group per extracted field.
    pub row_pattern: String,
}

/// A template whose row pattern has been compiled and validated.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    spec: TableTemplate,
    row: Regex,
}

impl TableTemplate {
    /// Loads a template from its JSON representation.
    pub fn from_json(json: &str) -> Result<TableTemplate, DriverError> {
        serde_json::from_str(json)
            .map_err(|err| DriverError::InvalidTemplate(format!("decode template json: {err}")))
    }

    /// Compiles the row pattern and checks that every declared field has a
    /// matching capture group.
    pub fn compile(self) -> Result<CompiledTemplate, DriverError> {
        if self.fields.is_empty() {
            return Err(DriverError::InvalidTemplate(format!(
                "template '{}' declares no fields",
                self.name
            )));
        }
        let row = Regex::new(&self.row_pattern).map_err(|err| {
            DriverError::InvalidTemplate(format!(
                "template '{}' row pattern: {err}",
                self.name
            ))
        })?;
        let groups: Vec<&str> = row.capture_names().flatten().collect();
        for field in &self.fields {
            if !groups.iter().any(|g| g == field) {
                return Err(DriverError::InvalidTemplate(format!(
                    "template '{}' field '{}' has no capture group",
                    self.name, field
                )));
            }
        }
        Ok(CompiledTemplate { spec: self, row })
    }
}

impl CompiledTemplate {
    /// The declarative template this was compiled from.
    pub fn spec(&self) -> &TableTemplate {
        &self.spec
    }

    /// Extracts one map per matched row, keyed by the declared field names.
    ///
    /// Optional groups that did not participate in a match yield empty
    /// strings, so downstream mapping stays total.
    pub fn parse_rows(&self, text: &str) -> Vec<HashMap<String, String>> {
        self.row
            .captures_iter(text)
            .map(|caps| {
                self.spec
                    .fields
                    .iter()
                    .map(|field| {
                        let value = caps
                            .name(field)
                            .map(|m| m.as_str().trim().to_string())
                            .unwrap_or_default();
                        (field.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Loads and compiles a built-in template by name.
pub fn by_name(name: &str) -> Result<CompiledTemplate, DriverError> {
    match name {
        "exos_show_port_information_detail" => show_port_information_detail(),
        _ => Err(DriverError::InvalidTemplate(format!(
            "unknown template '{name}'"
        ))),
    }
}

/// The template for `show port information detail` output.
pub fn show_port_information_detail() -> Result<CompiledTemplate, DriverError> {
    TableTemplate::from_json(SHOW_PORT_INFORMATION_DETAIL)?.compile()
}

/// Infers the EXOS command that undoes `command`, if one can be derived.
///
/// Best-effort inversion used for compensating rollback:
/// - `create X` / `delete X` swap
/// - `enable X` / `disable X` swap
/// - `configure ... add ...` becomes `configure ... delete ...`
/// - other `configure X` becomes `unconfigure X`
///
/// Read-only commands and commands that are already removals have no
/// inferred inverse.
pub fn infer_undo_command(command: &str) -> Option<String> {
    let cmd = command.trim();
    let lower = cmd.to_ascii_lowercase();

    if ["show ", "ping ", "traceroute ", "save ", "delete ", "unconfigure "]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return None;
    }

    if let Some(rest) = cmd.strip_prefix("create ") {
        return Some(format!("delete {rest}"));
    }
    if let Some(rest) = cmd.strip_prefix("enable ") {
        return Some(format!("disable {rest}"));
    }
    if let Some(rest) = cmd.strip_prefix("disable ") {
        return Some(format!("enable {rest}"));
    }
    if lower.starts_with("configure ") {
        if let Some(pos) = cmd.find(" add ") {
            return Some(format!("{}{}{}", &cmd[..pos], " delete ", &cmd[pos + 5..]));
        }
        return cmd
            .strip_prefix("configure ")
            .map(|rest| format!("unconfigure {rest}"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_PORT_OUTPUT: &str = "\
Port:   1
        Virtual-router: VR-Default
        Type:           UTP
        Random Early drop:      Unsupported
        Admin state:    Enabled with auto-speed sensing auto-duplex
        Link State:     Active, 1Gbps, full-duplex
        Link Ups:       1        Last: Thu Aug 27 10:11:02 2026
Port:   2
        Virtual-router: VR-Default
        Type:           UTP
        Admin state:    Enabled with auto-speed sensing auto-duplex
        Link State:     Ready
Port:   49
        Virtual-router: VR-Default
        Type:           SF+_SR
        Admin state:    Enabled
        Link State:     Active, 10Gbps, full-duplex
";

    #[test]
    fn builtin_template_compiles() {
        let template = show_port_information_detail().expect("compile builtin template");
        assert_eq!(template.spec().command, "show port information detail");
        assert_eq!(template.spec().fields, vec!["port", "speed"]);
    }

    #[test]
    fn by_name_rejects_unknown_template() {
        let err = match by_name("exos_show_vlan") {
            Ok(_) => panic!("unknown template should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DriverError::InvalidTemplate(_)));
    }

    #[test]
    fn parse_rows_extracts_port_and_speed_code() {
        let template = show_port_information_detail().expect("template");
        let rows = template.parse_rows(SHOW_PORT_OUTPUT);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["port"], "1");
        assert_eq!(rows[0]["speed"], "1G");
        assert_eq!(rows[2]["port"], "49");
        assert_eq!(rows[2]["speed"], "10G");
    }

    #[test]
    fn parse_rows_yields_empty_speed_for_link_down_port() {
        let template = show_port_information_detail().expect("template");
        let rows = template.parse_rows(SHOW_PORT_OUTPUT);

        assert_eq!(rows[1]["port"], "2");
        assert_eq!(rows[1]["speed"], "");
    }

    #[test]
    fn template_with_missing_capture_group_fails_compile() {
        let template = TableTemplate {
            name: "broken".to_string(),
            template_version: "1.0.0".to_string(),
            command: "show x".to_string(),
            fields: vec!["port".to_string()],
            row_pattern: r"^Port:\s+(\S+)".to_string(),
        };
        let err = match template.compile() {
            Ok(_) => panic!("missing capture group should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DriverError::InvalidTemplate(_)));
    }

    #[test]
    fn template_json_roundtrip_preserves_version() {
        let template = TableTemplate::from_json(SHOW_PORT_INFORMATION_DETAIL).expect("decode");
        assert_eq!(template.template_version, "1.0.0");
        let encoded = serde_json::to_string(&template).expect("encode");
        let decoded = TableTemplate::from_json(&encoded).expect("re-decode");
        assert_eq!(decoded, template);
    }

    #[test]
    fn infer_undo_swaps_create_and_enable() {
        assert_eq!(
            infer_undo_command("create vlan blue").as_deref(),
            Some("delete vlan blue")
        );
        assert_eq!(
            infer_undo_command("enable sharing 1 grouping 1-2").as_deref(),
            Some("disable sharing 1 grouping 1-2")
        );
        assert_eq!(
            infer_undo_command("disable igmp snooping").as_deref(),
            Some("enable igmp snooping")
        );
    }

    #[test]
    fn infer_undo_inverts_configure_add_to_delete() {
        assert_eq!(
            infer_undo_command("configure vlan blue add ports 1-4 untagged").as_deref(),
            Some("configure vlan blue delete ports 1-4 untagged")
        );
    }

    #[test]
    fn infer_undo_falls_back_to_unconfigure() {
        assert_eq!(
            infer_undo_command("configure vlan blue ipaddress 10.1.2.1/24").as_deref(),
            Some("unconfigure vlan blue ipaddress 10.1.2.1/24")
        );
    }

    #[test]
    fn infer_undo_skips_read_only_and_removal_commands() {
        assert_eq!(infer_undo_command("show vlan"), None);
        assert_eq!(infer_undo_command("delete vlan blue"), None);
        assert_eq!(infer_undo_command("unconfigure vlan blue ipaddress"), None);
        assert_eq!(infer_undo_command("save configuration"), None);
    }
}
