//! Field-name normalization between parse and validation.
//!
//! Producers drift between snake_case and camelCase and between synonyms for
//! the same field. The validator only ever sees canonical names; this module
//! is the single place aliases are known.

use dredge_schema::is_container_tag;
use serde_yaml::{Mapping, Value};

/// Accepted alias, canonical name.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("file_path", "path"),
    ("old_string", "oldString"),
    ("new_string", "newString"),
    ("replace_all", "replaceAll"),
    ("timeout_secs", "timeout"),
    ("agent_type", "agentType"),
    ("context_refs", "contextRefs"),
    ("auto_launch", "autoLaunch"),
    ("task_id", "taskId"),
    ("command", "cmd"),
];

fn canonical(name: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canon)| *canon)
        .unwrap_or(name)
}

/// Rewrite a payload's keys to canonical form.
///
/// For container tags the `action` discriminator has already been consumed by
/// kind resolution and is dropped here. Elements of an `edits` list get the
/// same alias treatment as top-level keys. Non-string keys pass through
/// unchanged for the validator to report.
pub fn normalize(tag: &str, data: Mapping) -> Mapping {
    let drop_discriminator = is_container_tag(tag);
    let mut out = Mapping::new();

    for (key, value) in data {
        let Some(name) = key.as_str() else {
            out.insert(key, value);
            continue;
        };
        if drop_discriminator && name == "action" {
            continue;
        }
        let canon = canonical(name);
        let value = if canon == "edits" {
            normalize_edits(value)
        } else {
            value
        };
        out.insert(Value::String(canon.to_string()), value);
    }

    out
}

fn normalize_edits(value: Value) -> Value {
    let Value::Sequence(items) = value else {
        return value;
    };
    Value::Sequence(
        items
            .into_iter()
            .map(|item| match item {
                Value::Mapping(map) => {
                    let mut out = Mapping::new();
                    for (key, value) in map {
                        match key.as_str() {
                            Some(name) => {
                                out.insert(Value::String(canonical(name).to_string()), value)
                            }
                            None => out.insert(key, value),
                        };
                    }
                    Value::Mapping(out)
                }
                other => other,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_aliases_are_rewritten() {
        let out = normalize("bash", mapping("command: ls\ntimeout_secs: 30"));
        assert!(out.get("cmd").is_some());
        assert!(out.get("timeout").is_some());
        assert!(out.get("command").is_none());
    }

    #[test]
    fn test_canonical_names_pass_through() {
        let out = normalize("bash", mapping("cmd: ls\ntimeout: 30"));
        assert_eq!(out.get("cmd").unwrap().as_str(), Some("ls"));
        assert_eq!(out.get("timeout").unwrap().as_i64(), Some(30));
    }

    #[test]
    fn test_container_discriminator_dropped() {
        let out = normalize("file_op", mapping("action: read\nfile_path: /tmp/x"));
        assert!(out.get("action").is_none());
        assert_eq!(out.get("path").unwrap().as_str(), Some("/tmp/x"));
    }

    #[test]
    fn test_plain_tag_keeps_action_field() {
        // Only container tags own an `action` discriminator.
        let out = normalize("bash", mapping("action: read\ncmd: ls"));
        assert!(out.get("action").is_some());
    }

    #[test]
    fn test_edit_elements_normalized() {
        let out = normalize(
            "file_op",
            mapping(
                "action: edit\npath: /tmp/x\nedits:\n  - old_string: a\n    new_string: b\n    replace_all: true",
            ),
        );
        let edits = out.get("edits").unwrap().as_sequence().unwrap();
        let first = edits[0].as_mapping().unwrap();
        assert!(first.get("oldString").is_some());
        assert!(first.get("newString").is_some());
        assert_eq!(first.get("replaceAll").unwrap().as_bool(), Some(true));
        assert!(first.get("old_string").is_none());
    }

    #[test]
    fn test_unknown_keys_untouched() {
        let out = normalize("bash", mapping("cmd: ls\nmystery_field: 1"));
        assert!(out.get("mystery_field").is_some());
    }
}
