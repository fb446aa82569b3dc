//! Response-level orchestration: extract, repair, validate, collect.
//!
//! Each block runs the tier ladder independently; one mangled block never
//! costs the others. All outcomes land in a single `ParseResult` - parse
//! problems are data for the caller, not process failures.

use serde::Serialize;
use serde_yaml::Mapping;

use dredge_schema::{contract, resolve_kind, validate, ParsedAction};

use crate::diagnose;
use crate::extract::{self, ExtractedBlock};
use crate::normalize::normalize;
use crate::recover::{self, Recovery};
use crate::sanitize::sanitize;

/// Everything extracted from one response.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    /// Validated actions, in document order.
    pub actions: Vec<ParsedAction>,
    /// One entry per failed block, prefixed with the block's tag.
    pub errors: Vec<String>,
    /// Whether anything action-shaped was attempted at all. Lets the caller
    /// tell "chose not to act" from "tried and failed".
    #[serde(rename = "foundActionAttempt")]
    pub found_action_attempt: bool,
}

/// Parse a raw response into typed actions.
pub fn parse_response(response: &str) -> ParseResult {
    let found_action_attempt = extract::detect_tag_attempts(response);
    let blocks = extract::extract_blocks(response);

    let mut result = ParseResult {
        actions: Vec::new(),
        errors: Vec::new(),
        found_action_attempt,
    };

    if blocks.is_empty() {
        if found_action_attempt {
            tracing::warn!("tag-shaped syntax present but no block extracted");
            result.errors.push(
                "[response] tag syntax was detected but no action block could be extracted; \
                 open each action with <tag> at the start of a line and close it with </tag>"
                    .to_string(),
            );
        }
        return result;
    }

    for block in &blocks {
        match process_block(block) {
            Ok(action) => {
                tracing::debug!(tag = %block.tag, kind = %action.kind(), "block accepted");
                result.actions.push(action);
            }
            Err(message) => {
                tracing::warn!(tag = %block.tag, "block rejected");
                result.errors.push(format!("[{}] {}", block.tag, message));
            }
        }
    }

    result
}

/// Run one block down the tier ladder: entity decoding, strict parse and rule
/// recovery, then sanitizer passes with a re-parse, then (for shell blocks
/// only) bare command extraction. The first tier to produce a mapping wins.
fn process_block(block: &ExtractedBlock) -> Result<ParsedAction, String> {
    let content = crate::sanitize::decode_entities(&block.content);
    let data = match recover::try_recover(&content) {
        Recovery::Recovered { data, applied } => {
            if !applied.is_empty() {
                tracing::debug!(
                    tag = %block.tag,
                    repairs = applied.len(),
                    "payload recovered"
                );
            }
            data
        }
        Recovery::Failed { diagnostic, .. } => {
            let cleaned = sanitize(&content);
            match recover::strict_parse(&cleaned) {
                Ok(data) => {
                    tracing::debug!(tag = %block.tag, "payload recovered by sanitizer");
                    data
                }
                Err(_) if block.tag == "bash" => recover::command_salvage(&cleaned)
                    .ok_or(diagnostic)?,
                Err(_) => return Err(diagnostic),
            }
        }
    };

    typecheck_block(&block.tag, data)
}

fn typecheck_block(tag: &str, data: Mapping) -> Result<ParsedAction, String> {
    let discriminator = data
        .get("action")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let Some(kind) = resolve_kind(tag, discriminator.as_deref()) else {
        return Err(unknown_action_message(tag, discriminator.as_deref()));
    };

    let normalized = normalize(tag, data);
    validate(kind, &normalized).map_err(|violations| {
        diagnose::validation_hint(contract(kind), &violations)
    })
}

fn unknown_action_message(tag: &str, discriminator: Option<&str>) -> String {
    match discriminator {
        Some(action) => format!(
            "unknown action '{action}' for tag '{tag}'; known tags: bash, finish, task_create, \
             task_complete, file_op, search_op, scratchpad, spawn_agent"
        ),
        None => format!(
            "unknown or incomplete action tag '{tag}'; known tags: bash, finish, task_create, \
             task_complete, file_op (action: read|write|edit), search_op (action: grep|glob), \
             scratchpad (action: add|clear), spawn_agent"
        ),
    }
}
