//! Ordered table of targeted recovery rules.
//!
//! Each rule pairs a detector regex with a rewriter. The rewriter receives the
//! captures plus the full content (some rules need to look past the matched
//! line) and may decline by returning `None`. Rules are ordered by priority
//! and every rule is idempotent: applying it to its own output changes
//! nothing, so the cascade in `try_recover` cannot oscillate.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Characters that make a bare scalar unsafe to leave unquoted.
const SPECIAL: &[char] = &[
    '@', '#', '%', '&', '*', '!', '?', '[', ']', '{', '}', '|', '>', '<', '=', '`',
];

/// A single targeted repair.
pub struct RecoveryRule {
    /// Human-readable, recorded in `applied_recoveries` when the rule fires.
    pub description: &'static str,
    /// Eager rules run before the initial strict parse. A trailing comma is
    /// valid YAML (it lands inside the value) but never intended, so waiting
    /// for a parse failure would let it through silently.
    pub eager: bool,
    detector: Regex,
    rewrite: fn(&Captures<'_>, &str) -> Option<String>,
}

impl RecoveryRule {
    /// Apply this rule everywhere it matches. Returns the rewritten content,
    /// or `None` when nothing changed.
    pub fn apply(&self, content: &str) -> Option<String> {
        let mut out = String::with_capacity(content.len());
        let mut last = 0usize;
        let mut changed = false;

        for caps in self.detector.captures_iter(content) {
            let m = caps.get(0).unwrap();
            if let Some(replacement) = (self.rewrite)(&caps, content) {
                if replacement != m.as_str() {
                    out.push_str(&content[last..m.start()]);
                    out.push_str(&replacement);
                    last = m.end();
                    changed = true;
                }
            }
        }

        if changed {
            out.push_str(&content[last..]);
            Some(out)
        } else {
            None
        }
    }
}

/// The rule table, in priority order.
pub fn recovery_rules() -> &'static [RecoveryRule] {
    static RULES: OnceLock<Vec<RecoveryRule>> = OnceLock::new();
    RULES.get_or_init(build_rules)
}

fn build_rules() -> Vec<RecoveryRule> {
    vec![
        RecoveryRule {
            description: "quoted a bare value containing special characters",
            eager: false,
            detector: Regex::new(r"(?m)^([ \t]*)([A-Za-z_][\w.-]*):[ \t]+(.+)$").unwrap(),
            rewrite: quote_special_value,
        },
        RecoveryRule {
            description: "replaced leading tabs with spaces",
            eager: false,
            detector: Regex::new(r"(?m)^\t+").unwrap(),
            rewrite: |caps, _| Some("  ".repeat(caps.get(0).unwrap().as_str().len())),
        },
        RecoveryRule {
            description: "removed a trailing comma",
            eager: true,
            detector: Regex::new(r"(?m),[ \t]*$").unwrap(),
            rewrite: strip_trailing_comma,
        },
        RecoveryRule {
            description: "inserted a space after a key's colon",
            eager: false,
            detector: Regex::new(r"(?m)^([ \t]*(?:- )?)([A-Za-z_][\w.-]*):([^\s])").unwrap(),
            rewrite: space_after_colon,
        },
        RecoveryRule {
            description: "closed an unterminated quoted value",
            eager: false,
            detector: Regex::new(r#"(?m)^([ \t]*[A-Za-z_][\w.-]*:[ \t]+)("[^"\n]*|'[^'\n]*)$"#)
                .unwrap(),
            rewrite: close_quote,
        },
        RecoveryRule {
            description: "normalized a boolean or null literal",
            eager: false,
            detector: Regex::new(r"(?m)(:[ \t]+|^[ \t]*-[ \t]+)((?i)true|false|none|null)[ \t]*$")
                .unwrap(),
            rewrite: normalize_literal,
        },
        RecoveryRule {
            description: "inserted a space after a list-item dash",
            eager: false,
            detector: Regex::new(r"(?m)^([ \t]*)-([^\s-])").unwrap(),
            rewrite: |caps, _| Some(format!("{}- {}", &caps[1], &caps[2])),
        },
        RecoveryRule {
            description: "gave an empty-valued key an explicit empty string",
            eager: false,
            detector: Regex::new(r"(?m)^([ \t]*)([A-Za-z_][\w.-]*):[ \t]*$").unwrap(),
            rewrite: fill_empty_value,
        },
        RecoveryRule {
            description: "escaped a backslash in an unquoted value",
            eager: false,
            detector: Regex::new(r#"(?m)^([ \t]*[A-Za-z_][\w.-]*:[ \t]+)([^"'|>\s][^\n]*)$"#)
                .unwrap(),
            rewrite: escape_backslashes,
        },
        RecoveryRule {
            description: "converted a long bare scalar to a literal block",
            eager: false,
            detector: Regex::new(r#"(?m)^([ \t]*)([A-Za-z_][\w.-]*):[ \t]+([^"'|>#\n][^\n]{49,})$"#)
                .unwrap(),
            rewrite: |caps, _| {
                let indent = &caps[1];
                Some(format!(
                    "{indent}{}: |\n{indent}  {}",
                    &caps[2],
                    caps[3].trim_end()
                ))
            },
        },
    ]
}

fn quote_special_value(caps: &Captures<'_>, _content: &str) -> Option<String> {
    let value = caps[3].trim_end();
    if value.starts_with('"')
        || value.starts_with('\'')
        || value.starts_with('|')
        || value.starts_with('>')
    {
        return None;
    }
    if is_plain_literal(value) || !value.contains(SPECIAL) {
        return None;
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Some(format!("{}{}: \"{}\"", &caps[1], &caps[2], escaped))
}

fn is_plain_literal(value: &str) -> bool {
    matches!(value, "true" | "false" | "null")
        || value.parse::<i64>().is_ok()
        || value.parse::<f64>().is_ok()
}

/// A comma ending a block-scalar body line is part of the value, not a
/// syntax slip. The rule only fires outside block-scalar bodies.
fn strip_trailing_comma(caps: &Captures<'_>, content: &str) -> Option<String> {
    let m = caps.get(0).unwrap();
    if inside_block_scalar(content, m.start()) {
        return None;
    }
    Some(String::new())
}

fn block_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ \t]*(?:- )?[A-Za-z_][\w.-]*:[ \t]*[|>][-+0-9]*[ \t]*$").unwrap()
    })
}

/// True when `offset` falls on a line belonging to a block-scalar body: a
/// preceding `key: |` or `key: >` header at lower indentation with no
/// intervening dedent back to the header's level.
fn inside_block_scalar(content: &str, offset: usize) -> bool {
    let mut header_indent: Option<usize> = None;
    let mut pos = 0usize;

    for line in content.split_inclusive('\n') {
        let start = pos;
        pos += line.len();
        let on_target = offset >= start && offset < pos;

        let line = line.trim_end_matches(['\n', '\r']);
        let blank = line.trim().is_empty();
        let indent = line.len() - line.trim_start().len();

        if let Some(h) = header_indent {
            if blank || indent > h {
                if on_target {
                    return true;
                }
                continue;
            }
            header_indent = None;
        }
        if on_target {
            return false;
        }
        if block_header_re().is_match(line) {
            header_indent = Some(indent);
        }
    }

    false
}

fn space_after_colon(caps: &Captures<'_>, _content: &str) -> Option<String> {
    // A bare URL line looks like a key with a missing space: `https://x`.
    if matches!(&caps[2], "http" | "https" | "ftp" | "ssh" | "git") && &caps[3] == "/" {
        return None;
    }
    Some(format!("{}{}: {}", &caps[1], &caps[2], &caps[3]))
}

fn close_quote(caps: &Captures<'_>, _content: &str) -> Option<String> {
    let value = &caps[2];
    let quote = value.chars().next()?;
    Some(format!("{}{}{}", &caps[1], value, quote))
}

fn normalize_literal(caps: &Captures<'_>, _content: &str) -> Option<String> {
    let canonical = match caps[2].to_ascii_lowercase().as_str() {
        "true" => "true",
        "false" => "false",
        _ => "null",
    };
    Some(format!("{}{}", &caps[1], canonical))
}

/// `key:` with nothing after it is only an error when no nested structure
/// follows. A more-indented next line or a list item means the key already has
/// a value.
fn fill_empty_value(caps: &Captures<'_>, content: &str) -> Option<String> {
    let m = caps.get(0).unwrap();
    let indent = caps[1].len();
    for line in content[m.end()..].lines() {
        if line.trim().is_empty() {
            continue;
        }
        let line_indent = line.len() - line.trim_start().len();
        if line_indent > indent || line.trim_start().starts_with('-') {
            return None;
        }
        break;
    }
    Some(format!("{}{}: \"\"", &caps[1], &caps[2]))
}

fn escape_backslashes(caps: &Captures<'_>, _content: &str) -> Option<String> {
    let value = &caps[2];
    if !value.contains('\\') {
        return None;
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if chars.peek() == Some(&'\\') {
                chars.next();
            }
            escaped.push_str("\\\\");
        } else {
            escaped.push(c);
        }
    }
    if escaped == *value {
        return None;
    }
    Some(format!("{}{}", &caps[1], escaped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(description: &str) -> &'static RecoveryRule {
        recovery_rules()
            .iter()
            .find(|r| r.description == description)
            .unwrap()
    }

    fn assert_idempotent(r: &RecoveryRule, input: &str) -> String {
        let once = r.apply(input).unwrap();
        assert_eq!(r.apply(&once), None, "rule not idempotent: {}", r.description);
        once
    }

    #[test]
    fn test_rule_order_is_stable() {
        let descriptions: Vec<&str> = recovery_rules().iter().map(|r| r.description).collect();
        assert_eq!(descriptions.len(), 10);
        assert!(descriptions[0].starts_with("quoted a bare value"));
        assert!(descriptions[9].starts_with("converted a long bare scalar"));
    }

    #[test]
    fn test_quote_special_value() {
        let r = rule("quoted a bare value containing special characters");
        let out = assert_idempotent(r, "pattern: *.rs");
        assert_eq!(out, "pattern: \"*.rs\"");
        assert_eq!(r.apply("cmd: echo hi"), None);
        assert_eq!(r.apply("flag: true"), None);
        assert_eq!(r.apply("count: 42"), None);
        assert_eq!(r.apply("pattern: \"*.rs\""), None);
        assert_eq!(r.apply("content: |"), None);
    }

    #[test]
    fn test_leading_tabs_become_spaces() {
        let r = rule("replaced leading tabs with spaces");
        let out = assert_idempotent(r, "cmd: ls\n\t\ttimeout: 5");
        assert_eq!(out, "cmd: ls\n    timeout: 5");
    }

    #[test]
    fn test_trailing_comma_removed() {
        let r = rule("removed a trailing comma");
        let out = assert_idempotent(r, "cmd: ls,\ntimeout: 5");
        assert_eq!(out, "cmd: ls\ntimeout: 5");
    }

    #[test]
    fn test_trailing_comma_kept_in_block_scalar() {
        let r = rule("removed a trailing comma");
        assert_eq!(r.apply("cmd: |\n  echo a,\n  echo b"), None);
        assert_eq!(r.apply("content: >\n  one,\n  two,"), None);
        // Dedenting back to the header's level ends the body.
        let out = r.apply("cmd: |\n  echo a,\ntimeout: 5,").unwrap();
        assert_eq!(out, "cmd: |\n  echo a,\ntimeout: 5");
    }

    #[test]
    fn test_space_after_colon() {
        let r = rule("inserted a space after a key's colon");
        let out = assert_idempotent(r, "cmd:ls -la");
        assert_eq!(out, "cmd: ls -la");
        // Bare URLs are not keys.
        assert_eq!(r.apply("https://example.com/x"), None);
    }

    #[test]
    fn test_close_unterminated_quote() {
        let r = rule("closed an unterminated quoted value");
        let out = assert_idempotent(r, "message: \"all done");
        assert_eq!(out, "message: \"all done\"");
        let out = assert_idempotent(r, "message: 'all done");
        assert_eq!(out, "message: 'all done'");
        assert_eq!(r.apply("message: \"all done\""), None);
    }

    #[test]
    fn test_normalize_literals() {
        let r = rule("normalized a boolean or null literal");
        let out = assert_idempotent(r, "replaceAll: True\ncomments: None");
        assert_eq!(out, "replaceAll: true\ncomments: null");
        let out = r.apply("flags:\n  - TRUE\n  - NULL").unwrap();
        assert_eq!(out, "flags:\n  - true\n  - null");
    }

    #[test]
    fn test_space_after_dash() {
        let r = rule("inserted a space after a list-item dash");
        let out = assert_idempotent(r, "edits:\n  -oldString: a");
        assert_eq!(out, "edits:\n  - oldString: a");
        // Document markers and long flags are untouched.
        assert_eq!(r.apply("---\ncmd: ls"), None);
        assert_eq!(r.apply("args:\n  - --verbose"), None);
    }

    #[test]
    fn test_fill_empty_value() {
        let r = rule("gave an empty-valued key an explicit empty string");
        let out = assert_idempotent(r, "comments:\ntaskId: t1");
        assert_eq!(out, "comments: \"\"\ntaskId: t1");
        let out = assert_idempotent(r, "cmd: ls\ntimeout:");
        assert_eq!(out, "cmd: ls\ntimeout: \"\"");
        // Parents of nested structure keep their structure.
        assert_eq!(r.apply("edits:\n  - oldString: a"), None);
        assert_eq!(r.apply("edits:\n- oldString: a"), None);
    }

    #[test]
    fn test_escape_backslashes() {
        let r = rule("escaped a backslash in an unquoted value");
        let out = assert_idempotent(r, r"path: C:\Users\dev");
        assert_eq!(out, r"path: C:\\Users\\dev");
        assert_eq!(r.apply(r"path: C:\\Users\\dev"), None);
        assert_eq!(r.apply("cmd: echo hi"), None);
    }

    #[test]
    fn test_long_scalar_becomes_block() {
        let r = rule("converted a long bare scalar to a literal block");
        let long = "a".repeat(60);
        let input = format!("description: {long}");
        let out = assert_idempotent(r, &input);
        assert_eq!(out, format!("description: |\n  {long}"));
        assert_eq!(r.apply("description: short"), None);
    }
}
