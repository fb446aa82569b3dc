//! Strict parse plus the rule-cascade recovery engine.

mod rules;
mod salvage;

pub use rules::{recovery_rules, RecoveryRule};
pub use salvage::{command_salvage, line_salvage};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Why a payload failed the strict parse.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("payload is not a key/value mapping")]
    NotAMapping,
}

/// Outcome of the recovery cascade.
#[derive(Debug)]
pub enum Recovery {
    /// A parseable mapping was obtained, possibly after repairs.
    Recovered {
        data: Mapping,
        /// Descriptions of the rules that fired, in application order.
        applied: Vec<String>,
    },
    /// Nothing worked. `diagnostic` explains the final parse error.
    Failed {
        applied: Vec<String>,
        diagnostic: String,
    },
}

/// Parse a payload as YAML and require a top-level mapping.
pub fn strict_parse(content: &str) -> Result<Mapping, ParseFailure> {
    let value: Value = serde_yaml::from_str(content)?;
    match value {
        Value::Mapping(map) => Ok(map),
        _ => Err(ParseFailure::NotAMapping),
    }
}

/// Eager rules, then a strict parse, then the rule cascade on failure.
///
/// Each rule is applied to the current baseline. When a rule changes the
/// content, the result is re-parsed immediately and the rewrite is kept as the
/// new baseline whether or not the parse succeeded, so later rules build on
/// earlier repairs. If the whole table runs dry, the salvage heuristics get
/// one shot at the accumulated baseline.
pub fn try_recover(content: &str) -> Recovery {
    let mut current = content.to_string();
    let mut applied = Vec::new();

    // Eager rules fix constructs that parse cleanly into the wrong value, so
    // they run before the first strict attempt.
    for rule in recovery_rules().iter().filter(|r| r.eager) {
        if let Some(rewritten) = rule.apply(&current) {
            tracing::debug!(rule = rule.description, "eager rule fired");
            current = rewritten;
            applied.push(rule.description.to_string());
        }
    }

    let mut last_error = match strict_parse(&current) {
        Ok(data) => return Recovery::Recovered { data, applied },
        Err(err) => err.to_string(),
    };

    for rule in recovery_rules() {
        let Some(rewritten) = rule.apply(&current) else {
            continue;
        };
        tracing::debug!(rule = rule.description, "recovery rule fired");
        current = rewritten;
        applied.push(rule.description.to_string());

        match strict_parse(&current) {
            Ok(data) => return Recovery::Recovered { data, applied },
            Err(err) => last_error = err.to_string(),
        }
    }

    if let Some(data) = line_salvage(&current).or_else(|| command_salvage(&current)) {
        tracing::debug!("payload recovered by salvage");
        return Recovery::Recovered { data, applied };
    }

    let diagnostic = crate::diagnose::parse_hint(content, &last_error);
    Recovery::Failed {
        applied,
        diagnostic,
    }
}
