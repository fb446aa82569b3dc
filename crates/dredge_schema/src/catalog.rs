//! Action contract catalog and validator.
//!
//! A contract is the declarative set of expected fields, types and defaults
//! for one action kind. The catalog is process-wide immutable configuration:
//! built once behind a `OnceLock`, never mutated afterwards.
//!
//! Validation is the only way to obtain a `ParsedAction`. Payloads arrive as
//! `serde_yaml` mappings with canonical field names (the key normalizer runs
//! upstream); the validator checks required fields, coerces lenient scalar
//! spellings, applies defaults, and rejects unexpected fields.

use crate::actions::{ActionKind, EditOp, ParsedAction};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Expected type of a contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Bool,
    Int,
    StrList,
    EditList,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Str => "string",
            FieldType::Bool => "boolean",
            FieldType::Int => "integer",
            FieldType::StrList => "list of strings",
            FieldType::EditList => "list of edit operations",
        };
        write!(f, "{}", s)
    }
}

/// One expected field in an action contract.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Canonical field name.
    pub name: &'static str,
    /// Expected type.
    pub ty: FieldType,
    /// Whether the field must be present.
    pub required: bool,
    /// Default applied when an optional field is absent.
    pub default: Option<Value>,
}

impl FieldSpec {
    /// A required field with no default.
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            default: None,
        }
    }

    /// An optional field with a default value.
    pub fn optional(name: &'static str, ty: FieldType, default: Value) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: Some(default),
        }
    }
}

/// The field contract for one action kind, plus a canned example used by
/// diagnostics when validation fails.
#[derive(Debug, Clone)]
pub struct ActionContract {
    pub kind: ActionKind,
    pub fields: Vec<FieldSpec>,
    pub example: &'static str,
}

impl ActionContract {
    /// Canonical names of all expected fields.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Names of all required fields.
    pub fn required_names(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect()
    }

    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single contract violation, addressed by field path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct FieldViolation {
    /// Path to the offending field (e.g. `description`, `edits[1].newString`).
    pub path: String,
    /// What went wrong.
    pub message: String,
}

impl FieldViolation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The full catalog, one contract per `ActionKind`, in `ActionKind::ALL` order.
pub fn catalog() -> &'static [ActionContract] {
    static CATALOG: OnceLock<Vec<ActionContract>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

/// Look up the contract for an action kind.
pub fn contract(kind: ActionKind) -> &'static ActionContract {
    catalog()
        .iter()
        .find(|c| c.kind == kind)
        .expect("catalog covers every ActionKind")
}

fn build_catalog() -> Vec<ActionContract> {
    vec![
        ActionContract {
            kind: ActionKind::Bash,
            fields: vec![
                FieldSpec::required("cmd", FieldType::Str),
                FieldSpec::optional("timeout", FieldType::Int, Value::from(120)),
            ],
            example: "<bash>\ncmd: cargo test --workspace\ntimeout: 300\n</bash>",
        },
        ActionContract {
            kind: ActionKind::Finish,
            fields: vec![FieldSpec::required("message", FieldType::Str)],
            example: "<finish>\nmessage: All tests pass.\n</finish>",
        },
        ActionContract {
            kind: ActionKind::TaskCreate,
            fields: vec![
                FieldSpec::required("description", FieldType::Str),
                FieldSpec::optional("contextRefs", FieldType::StrList, Value::Sequence(vec![])),
                FieldSpec::optional("autoLaunch", FieldType::Bool, Value::from(false)),
            ],
            example: "<task_create>\ndescription: Fix the flaky integration test\ncontext_refs:\n  - tests/e2e.rs\n</task_create>",
        },
        ActionContract {
            kind: ActionKind::TaskComplete,
            fields: vec![
                FieldSpec::required("taskId", FieldType::Str),
                FieldSpec::optional("comments", FieldType::Str, Value::from("")),
            ],
            example: "<task_complete>\ntask_id: task-42\ncomments: Verified on CI.\n</task_complete>",
        },
        ActionContract {
            kind: ActionKind::FileRead,
            fields: vec![FieldSpec::required("path", FieldType::Str)],
            example: "<file_op>\naction: read\npath: src/lib.rs\n</file_op>",
        },
        ActionContract {
            kind: ActionKind::FileWrite,
            fields: vec![
                FieldSpec::required("path", FieldType::Str),
                FieldSpec::required("content", FieldType::Str),
            ],
            example: "<file_op>\naction: write\npath: notes.md\ncontent: |\n  release checklist\n</file_op>",
        },
        ActionContract {
            kind: ActionKind::FileEdit,
            fields: vec![
                FieldSpec::required("path", FieldType::Str),
                FieldSpec::required("edits", FieldType::EditList),
            ],
            example: "<file_op>\naction: edit\npath: src/main.rs\nedits:\n  - old_string: foo\n    new_string: bar\n</file_op>",
        },
        ActionContract {
            kind: ActionKind::SearchGrep,
            fields: vec![
                FieldSpec::required("pattern", FieldType::Str),
                FieldSpec::optional("path", FieldType::Str, Value::from(".")),
            ],
            example: "<search_op>\naction: grep\npattern: TODO\npath: src\n</search_op>",
        },
        ActionContract {
            kind: ActionKind::SearchGlob,
            fields: vec![FieldSpec::required("pattern", FieldType::Str)],
            example: "<search_op>\naction: glob\npattern: \"**/*.rs\"\n</search_op>",
        },
        ActionContract {
            kind: ActionKind::NoteAdd,
            fields: vec![FieldSpec::required("content", FieldType::Str)],
            example: "<scratchpad>\naction: add\ncontent: remember to bump the version\n</scratchpad>",
        },
        ActionContract {
            kind: ActionKind::NoteClear,
            fields: vec![],
            example: "<scratchpad>\naction: clear\n</scratchpad>",
        },
        ActionContract {
            kind: ActionKind::SpawnAgent,
            fields: vec![
                FieldSpec::required("agentType", FieldType::Str),
                FieldSpec::required("prompt", FieldType::Str),
                FieldSpec::optional("autoLaunch", FieldType::Bool, Value::from(true)),
            ],
            example: "<spawn_agent>\nagent_type: reviewer\nprompt: Review the diff for correctness\n</spawn_agent>",
        },
    ]
}

/// Coerced field values, keyed by canonical name, ready for construction.
#[derive(Debug, Clone)]
enum Coerced {
    Str(String),
    Bool(bool),
    Int(i64),
    StrList(Vec<String>),
    Edits(Vec<EditOp>),
}

/// Validate a normalized payload against the contract for `kind`.
///
/// Returns the typed action on success, or every violation found - missing
/// required fields, type mismatches, unexpected fields - so diagnostics can
/// report them all at once.
pub fn validate(kind: ActionKind, data: &Mapping) -> Result<ParsedAction, Vec<FieldViolation>> {
    let contract = contract(kind);
    let mut violations = Vec::new();
    let mut coerced: HashMap<&'static str, Coerced> = HashMap::new();

    for spec in &contract.fields {
        match data.get(spec.name) {
            Some(value) => match coerce_field(value, spec, spec.name) {
                Ok(v) => {
                    coerced.insert(spec.name, v);
                }
                Err(mut errs) => violations.append(&mut errs),
            },
            None => {
                if spec.required {
                    violations.push(FieldViolation::new(
                        spec.name,
                        format!("required field is missing (expected {})", spec.ty),
                    ));
                } else if let Some(default) = &spec.default {
                    if let Ok(v) = coerce_field(default, spec, spec.name) {
                        coerced.insert(spec.name, v);
                    }
                }
            }
        }
    }

    for (key, _) in data {
        match key.as_str() {
            Some(name) => {
                if contract.field(name).is_none() {
                    violations.push(FieldViolation::new(name, "unexpected field"));
                }
            }
            None => violations.push(FieldViolation::new(
                format!("{:?}", key),
                "field names must be strings",
            )),
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(build_action(kind, coerced))
}

fn coerce_field(
    value: &Value,
    spec: &FieldSpec,
    path: &str,
) -> Result<Coerced, Vec<FieldViolation>> {
    let mismatch = |got: &Value| {
        vec![FieldViolation::new(
            path,
            format!("expected {}, got {}", spec.ty, type_name(got)),
        )]
    };

    match spec.ty {
        FieldType::Str => match value {
            Value::String(s) => Ok(Coerced::Str(s.clone())),
            // Producers routinely emit bare numbers and booleans where the
            // contract wants text; accept the scalar spelling.
            Value::Number(n) => Ok(Coerced::Str(n.to_string())),
            Value::Bool(b) => Ok(Coerced::Str(b.to_string())),
            other => Err(mismatch(other)),
        },
        FieldType::Bool => match value {
            Value::Bool(b) => Ok(Coerced::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Coerced::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Coerced::Bool(false)),
            other => Err(mismatch(other)),
        },
        FieldType::Int => match value {
            Value::Number(n) => n
                .as_i64()
                .map(Coerced::Int)
                .ok_or_else(|| mismatch(value)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Coerced::Int)
                .map_err(|_| mismatch(value)),
            other => Err(mismatch(other)),
        },
        FieldType::StrList => match value {
            Value::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut errs = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        Value::Number(n) => out.push(n.to_string()),
                        other => errs.push(FieldViolation::new(
                            format!("{}[{}]", path, i),
                            format!("expected string, got {}", type_name(other)),
                        )),
                    }
                }
                if errs.is_empty() {
                    Ok(Coerced::StrList(out))
                } else {
                    Err(errs)
                }
            }
            // A lone scalar is a one-element list.
            Value::String(s) => Ok(Coerced::StrList(vec![s.clone()])),
            Value::Null => Ok(Coerced::StrList(Vec::new())),
            other => Err(mismatch(other)),
        },
        FieldType::EditList => match value {
            Value::Sequence(items) => coerce_edits(items, path).map(Coerced::Edits),
            other => Err(mismatch(other)),
        },
    }
}

fn coerce_edits(items: &[Value], base: &str) -> Result<Vec<EditOp>, Vec<FieldViolation>> {
    let mut edits = Vec::with_capacity(items.len());
    let mut errs = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let Some(map) = item.as_mapping() else {
            errs.push(FieldViolation::new(
                format!("{}[{}]", base, i),
                format!("expected mapping, got {}", type_name(item)),
            ));
            continue;
        };

        let mut edit_str = |name: &str| -> Option<String> {
            match map.get(name) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    errs.push(FieldViolation::new(
                        format!("{}[{}].{}", base, i, name),
                        format!("expected string, got {}", type_name(other)),
                    ));
                    None
                }
                None => {
                    errs.push(FieldViolation::new(
                        format!("{}[{}].{}", base, i, name),
                        "required field is missing (expected string)",
                    ));
                    None
                }
            }
        };

        let old_string = edit_str("oldString");
        let new_string = edit_str("newString");
        let replace_all = match map.get("replaceAll") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(other) => {
                errs.push(FieldViolation::new(
                    format!("{}[{}].replaceAll", base, i),
                    format!("expected boolean, got {}", type_name(other)),
                ));
                false
            }
            None => false,
        };

        if let (Some(old_string), Some(new_string)) = (old_string, new_string) {
            edits.push(EditOp {
                old_string,
                new_string,
                replace_all,
            });
        }
    }

    if errs.is_empty() {
        Ok(edits)
    } else {
        Err(errs)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn take_str(fields: &mut HashMap<&'static str, Coerced>, name: &str) -> String {
    match fields.remove(name) {
        Some(Coerced::Str(s)) => s,
        _ => String::new(),
    }
}

fn build_action(kind: ActionKind, mut fields: HashMap<&'static str, Coerced>) -> ParsedAction {
    // All lookups below are backed by validation: required fields are present
    // and typed, optional fields were filled from defaults.
    let fields = &mut fields;

    match kind {
        ActionKind::Bash => {
            let cmd = take_str(fields, "cmd");
            let timeout = match fields.remove("timeout") {
                Some(Coerced::Int(n)) => n,
                _ => 120,
            };
            ParsedAction::Bash { cmd, timeout }
        }
        ActionKind::Finish => ParsedAction::Finish {
            message: take_str(fields, "message"),
        },
        ActionKind::TaskCreate => {
            let description = take_str(fields, "description");
            let context_refs = match fields.remove("contextRefs") {
                Some(Coerced::StrList(v)) => v,
                _ => Vec::new(),
            };
            let auto_launch = matches!(fields.remove("autoLaunch"), Some(Coerced::Bool(true)));
            ParsedAction::TaskCreate {
                description,
                context_refs,
                auto_launch,
            }
        }
        ActionKind::TaskComplete => ParsedAction::TaskComplete {
            task_id: take_str(fields, "taskId"),
            comments: take_str(fields, "comments"),
        },
        ActionKind::FileRead => ParsedAction::FileRead {
            path: take_str(fields, "path"),
        },
        ActionKind::FileWrite => ParsedAction::FileWrite {
            path: take_str(fields, "path"),
            content: take_str(fields, "content"),
        },
        ActionKind::FileEdit => {
            let path = take_str(fields, "path");
            let edits = match fields.remove("edits") {
                Some(Coerced::Edits(v)) => v,
                _ => Vec::new(),
            };
            ParsedAction::FileEdit { path, edits }
        }
        ActionKind::SearchGrep => ParsedAction::SearchGrep {
            pattern: take_str(fields, "pattern"),
            path: take_str(fields, "path"),
        },
        ActionKind::SearchGlob => ParsedAction::SearchGlob {
            pattern: take_str(fields, "pattern"),
        },
        ActionKind::NoteAdd => ParsedAction::NoteAdd {
            content: take_str(fields, "content"),
        },
        ActionKind::NoteClear => ParsedAction::NoteClear,
        ActionKind::SpawnAgent => {
            let agent_type = take_str(fields, "agentType");
            let prompt = take_str(fields, "prompt");
            let auto_launch = !matches!(fields.remove("autoLaunch"), Some(Coerced::Bool(false)));
            ParsedAction::SpawnAgent {
                agent_type,
                prompt,
                auto_launch,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_catalog_covers_all_kinds() {
        for kind in ActionKind::ALL {
            let c = contract(kind);
            assert_eq!(c.kind, kind);
            assert!(!c.example.is_empty());
        }
    }

    #[test]
    fn test_validate_bash_applies_timeout_default() {
        let action = validate(ActionKind::Bash, &mapping("cmd: ls -la")).unwrap();
        assert_eq!(
            action,
            ParsedAction::Bash {
                cmd: "ls -la".to_string(),
                timeout: 120
            }
        );
    }

    #[test]
    fn test_validate_bash_lenient_scalars() {
        let action = validate(ActionKind::Bash, &mapping("cmd: ls\ntimeout: '45'")).unwrap();
        assert_eq!(
            action,
            ParsedAction::Bash {
                cmd: "ls".to_string(),
                timeout: 45
            }
        );
    }

    #[test]
    fn test_validate_missing_required_field() {
        let errs = validate(ActionKind::TaskCreate, &mapping("autoLaunch: true")).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "description");
        assert!(errs[0].message.contains("required field is missing"));
    }

    #[test]
    fn test_validate_unexpected_field() {
        let errs = validate(ActionKind::Finish, &mapping("message: done\npriority: 1")).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "priority");
        assert_eq!(errs[0].message, "unexpected field");
    }

    #[test]
    fn test_validate_type_mismatch() {
        let errs = validate(ActionKind::Bash, &mapping("cmd:\n  - ls\n  - pwd")).unwrap_err();
        assert_eq!(errs[0].path, "cmd");
        assert!(errs[0].message.contains("expected string, got list"));
    }

    #[test]
    fn test_validate_edit_list() {
        let yaml = "\
path: src/lib.rs
edits:
  - oldString: foo
    newString: bar
  - oldString: baz
    newString: qux
    replaceAll: true
";
        let action = validate(ActionKind::FileEdit, &mapping(yaml)).unwrap();
        let ParsedAction::FileEdit { path, edits } = action else {
            panic!("expected FileEdit");
        };
        assert_eq!(path, "src/lib.rs");
        assert_eq!(edits.len(), 2);
        assert!(!edits[0].replace_all);
        assert!(edits[1].replace_all);
    }

    #[test]
    fn test_validate_edit_list_paths_in_violations() {
        let yaml = "\
path: src/lib.rs
edits:
  - oldString: foo
";
        let errs = validate(ActionKind::FileEdit, &mapping(yaml)).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "edits[0].newString");
    }

    #[test]
    fn test_validate_scalar_promoted_to_list() {
        let yaml = "description: investigate\ncontextRefs: src/main.rs";
        let action = validate(ActionKind::TaskCreate, &mapping(yaml)).unwrap();
        let ParsedAction::TaskCreate { context_refs, .. } = action else {
            panic!("expected TaskCreate");
        };
        assert_eq!(context_refs, vec!["src/main.rs".to_string()]);
    }

    #[test]
    fn test_spawn_agent_auto_launch_defaults_true() {
        let yaml = "agentType: reviewer\nprompt: review the diff";
        let action = validate(ActionKind::SpawnAgent, &mapping(yaml)).unwrap();
        let ParsedAction::SpawnAgent { auto_launch, .. } = action else {
            panic!("expected SpawnAgent");
        };
        assert!(auto_launch);
    }

    #[test]
    fn test_note_clear_accepts_empty_payload() {
        let action = validate(ActionKind::NoteClear, &Mapping::new()).unwrap();
        assert_eq!(action, ParsedAction::NoteClear);
    }

    #[test]
    fn test_violation_display() {
        let v = FieldViolation::new("description", "required field is missing");
        assert_eq!(v.to_string(), "description: required field is missing");
    }
}
