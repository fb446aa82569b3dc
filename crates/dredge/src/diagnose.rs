//! Human-oriented hints for parse and validation failures.
//!
//! Error strings flow back to the producer, which gets one chance to retry.
//! A hint that names the offending construct and shows the expected shape
//! converts far more retries than the raw parser message alone.

use dredge_schema::{ActionContract, FieldViolation};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

/// Suggestion distance cutoff. Anything further is noise, not a typo.
const SUGGESTION_MAX_DISTANCE: usize = 3;

fn duplicate_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"duplicate[^"]*"([^"]+)""#).unwrap())
}

fn colon_no_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*[A-Za-z_][\w.-]*:\S").unwrap())
}

fn dash_no_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*-[^\s-]").unwrap())
}

/// Build the diagnostic for a payload that defeated parse and recovery.
/// Classifies the parser's error, adds structural observations about the
/// content itself, and closes with a minimal well-formed example.
pub fn parse_hint(content: &str, error: &str) -> String {
    let mut out = format!("could not parse payload ({error})");
    let lower = error.to_ascii_lowercase();

    if lower.contains("end of stream") || lower.contains("unexpected end") {
        push_hint(
            &mut out,
            "the payload ends mid-construct; check for an unclosed quote or a truncated final line",
        );
    } else if let Some(caps) = duplicate_key_re().captures(error) {
        push_hint(
            &mut out,
            &format!(
                "the key '{}' appears more than once; keep only one occurrence",
                &caps[1]
            ),
        );
    } else if lower.contains("duplicate") {
        push_hint(&mut out, "a key appears more than once; keep only one occurrence");
    } else if lower.contains("not a key/value mapping") {
        push_hint(
            &mut out,
            "the payload must be key: value lines, one field per line",
        );
    } else if lower.contains("indent") || lower.contains("cannot start any token") {
        push_hint(
            &mut out,
            "inconsistent indentation; nested lines must be indented consistently, with spaces",
        );
    } else if lower.contains("unexpected") {
        push_hint(
            &mut out,
            "the parser hit a construct it did not expect; keep each field on its own key: value line",
        );
    }

    if content.contains('\t') {
        push_hint(&mut out, "indentation uses tabs; use spaces only");
    }
    if colon_no_space_re().is_match(content) {
        push_hint(&mut out, "a key's colon needs a space after it (key: value)");
    }
    if dash_no_space_re().is_match(content) {
        push_hint(&mut out, "a list-item dash needs a space after it (- item)");
    }
    if content
        .lines()
        .any(|l| l.len() > 80 && l.contains(':') && !l.trim_start().starts_with('#'))
    {
        push_hint(
            &mut out,
            "long values with punctuation should use a literal block (key: | then indented lines)",
        );
    }

    let _ = write!(
        out,
        "\nexpected shape:\ncmd: echo hello\ntimeout: 60"
    );
    out
}

/// Build the diagnostic for a payload that parsed but failed its contract.
pub fn validation_hint(contract: &ActionContract, violations: &[FieldViolation]) -> String {
    let mut out = format!("invalid {} action", contract.kind);
    let expected = contract.field_names();

    let missing: Vec<&str> = violations
        .iter()
        .filter(|v| v.message.contains("required field is missing"))
        .map(|v| v.path.as_str())
        .collect();
    if !missing.is_empty() {
        push_hint(&mut out, &format!("missing required: {}", missing.join(", ")));
    }

    for violation in violations {
        if violation.message == "unexpected field" {
            match crate::distance::closest(&violation.path, &expected) {
                Some((suggestion, distance)) if distance <= SUGGESTION_MAX_DISTANCE => {
                    push_hint(
                        &mut out,
                        &format!(
                            "unexpected field '{}'; did you mean '{}'?",
                            violation.path, suggestion
                        ),
                    );
                }
                _ => {
                    push_hint(
                        &mut out,
                        &format!(
                            "unexpected field '{}'; expected fields: {}",
                            violation.path,
                            expected.join(", ")
                        ),
                    );
                }
            }
        } else if !violation.message.contains("required field is missing") {
            push_hint(&mut out, &violation.to_string());
        }
    }

    let _ = write!(out, "\nexample:\n{}", contract.example);
    out
}

fn push_hint(out: &mut String, hint: &str) {
    let _ = write!(out, "\n- {hint}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dredge_schema::{contract, validate, ActionKind};

    #[test]
    fn test_parse_hint_flags_tabs() {
        let hint = parse_hint("\tcmd: ls", "found character that cannot start any token");
        assert!(hint.contains("tabs"));
        assert!(hint.contains("expected shape"));
    }

    #[test]
    fn test_parse_hint_classifies_truncation() {
        let hint = parse_hint("cmd: \"ls", "unexpected end of stream");
        assert!(hint.contains("unclosed quote"));
    }

    #[test]
    fn test_parse_hint_extracts_duplicate_key() {
        let hint = parse_hint("cmd: a\ncmd: b", "duplicate entry with key \"cmd\"");
        assert!(hint.contains("'cmd' appears more than once"));
    }

    #[test]
    fn test_parse_hint_classifies_indentation() {
        let hint = parse_hint(
            "cmd: ls\n   stray: 1",
            "found bad indentation of a mapping entry",
        );
        assert!(hint.contains("indented consistently"));
    }

    #[test]
    fn test_parse_hint_classifies_unexpected_construct() {
        let hint = parse_hint("cmd: ls ???", "unexpected event during parsing");
        assert!(hint.contains("did not expect"));
    }

    #[test]
    fn test_parse_hint_flags_missing_colon_space() {
        let hint = parse_hint("cmd:ls", "mapping values are not allowed in this context");
        assert!(hint.contains("space after it"));
    }

    #[test]
    fn test_validation_hint_lists_missing_fields() {
        let violations = validate(ActionKind::Bash, &serde_yaml::Mapping::new()).unwrap_err();
        let hint = validation_hint(contract(ActionKind::Bash), &violations);
        assert!(hint.contains("missing required: cmd"));
        assert!(hint.contains("example:"));
    }

    #[test]
    fn test_validation_hint_suggests_near_miss() {
        let data: serde_yaml::Mapping = serde_yaml::from_str("cmd: ls\ntimout: 5").unwrap();
        let violations = validate(ActionKind::Bash, &data).unwrap_err();
        let hint = validation_hint(contract(ActionKind::Bash), &violations);
        assert!(hint.contains("did you mean 'timeout'"));
    }

    #[test]
    fn test_validation_hint_far_miss_lists_fields() {
        let data: serde_yaml::Mapping = serde_yaml::from_str("cmd: ls\nbananas: 5").unwrap();
        let violations = validate(ActionKind::Bash, &data).unwrap_err();
        let hint = validation_hint(contract(ActionKind::Bash), &violations);
        assert!(hint.contains("expected fields: cmd, timeout"));
    }
}
