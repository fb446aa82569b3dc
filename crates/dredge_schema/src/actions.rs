//! Action kinds and the validated action union.
//!
//! `ParsedAction` is a closed tagged union: one variant per action kind the
//! producer may request. A variant is only ever constructed by the validator
//! in `catalog`, so holding a `ParsedAction` means the payload passed its
//! contract - there are no partially-populated actions.

use serde::Serialize;
use std::fmt;

/// Every action kind the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Bash,
    Finish,
    TaskCreate,
    TaskComplete,
    FileRead,
    FileWrite,
    FileEdit,
    SearchGrep,
    SearchGlob,
    NoteAdd,
    NoteClear,
    SpawnAgent,
}

impl ActionKind {
    pub const ALL: [ActionKind; 12] = [
        ActionKind::Bash,
        ActionKind::Finish,
        ActionKind::TaskCreate,
        ActionKind::TaskComplete,
        ActionKind::FileRead,
        ActionKind::FileWrite,
        ActionKind::FileEdit,
        ActionKind::SearchGrep,
        ActionKind::SearchGlob,
        ActionKind::NoteAdd,
        ActionKind::NoteClear,
        ActionKind::SpawnAgent,
    ];

    /// Canonical kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Bash => "bash",
            ActionKind::Finish => "finish",
            ActionKind::TaskCreate => "task_create",
            ActionKind::TaskComplete => "task_complete",
            ActionKind::FileRead => "file_read",
            ActionKind::FileWrite => "file_write",
            ActionKind::FileEdit => "file_edit",
            ActionKind::SearchGrep => "search_grep",
            ActionKind::SearchGlob => "search_glob",
            ActionKind::NoteAdd => "note_add",
            ActionKind::NoteClear => "note_clear",
            ActionKind::SpawnAgent => "spawn_agent",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve a block's tag name (plus the inner `action` discriminator for
/// container tags) to an action kind.
///
/// Returns `None` for unknown tags and for container tags with a missing or
/// unrecognized discriminator - the caller reports those as unknown-action
/// errors rather than guessing.
pub fn resolve_kind(tag: &str, discriminator: Option<&str>) -> Option<ActionKind> {
    match tag {
        "bash" => Some(ActionKind::Bash),
        "finish" => Some(ActionKind::Finish),
        "task_create" => Some(ActionKind::TaskCreate),
        "task_complete" => Some(ActionKind::TaskComplete),
        "spawn_agent" => Some(ActionKind::SpawnAgent),
        "file_op" => match discriminator? {
            "read" => Some(ActionKind::FileRead),
            "write" => Some(ActionKind::FileWrite),
            "edit" => Some(ActionKind::FileEdit),
            _ => None,
        },
        "search_op" => match discriminator? {
            "grep" => Some(ActionKind::SearchGrep),
            "glob" => Some(ActionKind::SearchGlob),
            _ => None,
        },
        "scratchpad" => match discriminator? {
            "add" => Some(ActionKind::NoteAdd),
            "clear" => Some(ActionKind::NoteClear),
            _ => None,
        },
        _ => None,
    }
}

/// Tags that dispatch through an inner `action` discriminator field.
pub fn is_container_tag(tag: &str) -> bool {
    matches!(tag, "file_op" | "search_op" | "scratchpad")
}

/// A single edit operation inside a `file_edit` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOp {
    #[serde(rename = "oldString")]
    pub old_string: String,
    #[serde(rename = "newString")]
    pub new_string: String,
    #[serde(rename = "replaceAll")]
    pub replace_all: bool,
}

/// A validated, typed action record. Defaults are already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedAction {
    Bash {
        cmd: String,
        timeout: i64,
    },
    Finish {
        message: String,
    },
    TaskCreate {
        description: String,
        #[serde(rename = "contextRefs")]
        context_refs: Vec<String>,
        #[serde(rename = "autoLaunch")]
        auto_launch: bool,
    },
    TaskComplete {
        #[serde(rename = "taskId")]
        task_id: String,
        comments: String,
    },
    FileRead {
        path: String,
    },
    FileWrite {
        path: String,
        content: String,
    },
    FileEdit {
        path: String,
        edits: Vec<EditOp>,
    },
    SearchGrep {
        pattern: String,
        path: String,
    },
    SearchGlob {
        pattern: String,
    },
    NoteAdd {
        content: String,
    },
    NoteClear,
    SpawnAgent {
        #[serde(rename = "agentType")]
        agent_type: String,
        prompt: String,
        #[serde(rename = "autoLaunch")]
        auto_launch: bool,
    },
}

impl ParsedAction {
    /// The kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            ParsedAction::Bash { .. } => ActionKind::Bash,
            ParsedAction::Finish { .. } => ActionKind::Finish,
            ParsedAction::TaskCreate { .. } => ActionKind::TaskCreate,
            ParsedAction::TaskComplete { .. } => ActionKind::TaskComplete,
            ParsedAction::FileRead { .. } => ActionKind::FileRead,
            ParsedAction::FileWrite { .. } => ActionKind::FileWrite,
            ParsedAction::FileEdit { .. } => ActionKind::FileEdit,
            ParsedAction::SearchGrep { .. } => ActionKind::SearchGrep,
            ParsedAction::SearchGlob { .. } => ActionKind::SearchGlob,
            ParsedAction::NoteAdd { .. } => ActionKind::NoteAdd,
            ParsedAction::NoteClear => ActionKind::NoteClear,
            ParsedAction::SpawnAgent { .. } => ActionKind::SpawnAgent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_tags() {
        assert_eq!(resolve_kind("bash", None), Some(ActionKind::Bash));
        assert_eq!(resolve_kind("finish", None), Some(ActionKind::Finish));
        assert_eq!(resolve_kind("task_create", None), Some(ActionKind::TaskCreate));
        assert_eq!(resolve_kind("spawn_agent", None), Some(ActionKind::SpawnAgent));
        assert_eq!(resolve_kind("unknown_tag", None), None);
    }

    #[test]
    fn test_resolve_container_tags() {
        assert_eq!(resolve_kind("file_op", Some("read")), Some(ActionKind::FileRead));
        assert_eq!(resolve_kind("file_op", Some("write")), Some(ActionKind::FileWrite));
        assert_eq!(resolve_kind("file_op", Some("edit")), Some(ActionKind::FileEdit));
        assert_eq!(resolve_kind("search_op", Some("grep")), Some(ActionKind::SearchGrep));
        assert_eq!(resolve_kind("search_op", Some("glob")), Some(ActionKind::SearchGlob));
        assert_eq!(resolve_kind("scratchpad", Some("add")), Some(ActionKind::NoteAdd));
        assert_eq!(resolve_kind("scratchpad", Some("clear")), Some(ActionKind::NoteClear));
    }

    #[test]
    fn test_resolve_container_without_discriminator() {
        assert_eq!(resolve_kind("file_op", None), None);
        assert_eq!(resolve_kind("file_op", Some("delete")), None);
        assert_eq!(resolve_kind("scratchpad", Some("")), None);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in ActionKind::ALL {
            assert!(!kind.as_str().is_empty());
        }
        let action = ParsedAction::Bash {
            cmd: "ls".to_string(),
            timeout: 120,
        };
        assert_eq!(action.kind(), ActionKind::Bash);
    }

    #[test]
    fn test_action_serialization_uses_canonical_names() {
        let action = ParsedAction::FileEdit {
            path: "src/main.rs".to_string(),
            edits: vec![EditOp {
                old_string: "foo".to_string(),
                new_string: "bar".to_string(),
                replace_all: false,
            }],
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"kind\":\"file_edit\""));
        assert!(json.contains("\"oldString\":\"foo\""));
        assert!(json.contains("\"replaceAll\":false"));
    }
}
