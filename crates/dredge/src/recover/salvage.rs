//! Aggressive last-resort extraction for payloads no rule could repair.
//!
//! Salvage trades fidelity for coverage: it reads `key: value` lines directly,
//! ignoring YAML structure entirely. Nested payloads come out flattened and
//! malformed lines are skipped, which is still more useful than discarding the
//! whole block.

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

fn cmd_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([ \t]*)(cmd|command)[ \t]*:[ \t]*(.*)$").unwrap())
}

fn keyish_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t]*[A-Za-z_][\w.-]*[ \t]*:([ \t]|$)").unwrap())
}

/// Scan every line for a `key: value` shape and coerce the value by
/// inspection. A block-scalar indicator value adopts the following
/// non-key-shaped lines as its body. Returns `None` when not a single line
/// yields a pair.
pub fn line_salvage(content: &str) -> Option<Mapping> {
    let mut map = Mapping::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0usize;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        i += 1;
        if trimmed.is_empty() {
            continue;
        }
        let Some(idx) = trimmed.find(':') else {
            continue;
        };
        if idx == 0 {
            continue;
        }
        let key = trimmed[..idx].trim_end();
        let raw = trimmed[idx + 1..].trim();
        let value = if raw == "|" || raw == ">" || raw == "|-" || raw == "|+" {
            let mut body: Vec<&str> = Vec::new();
            while i < lines.len() && !keyish_re().is_match(lines[i]) {
                body.push(lines[i]);
                i += 1;
            }
            while body.last().map(|l| l.trim().is_empty()) == Some(true) {
                body.pop();
            }
            Value::String(dedent(&body))
        } else {
            coerce_scalar(raw)
        };
        map.insert(Value::String(key.to_string()), value);
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn dedent(body: &[&str]) -> String {
    let min_indent = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    body.iter()
        .map(|l| if l.trim().is_empty() { "" } else { &l[min_indent..] })
        .collect::<Vec<_>>()
        .join("\n")
}

fn coerce_scalar(raw: &str) -> Value {
    if raw.is_empty() || raw == "null" {
        return Value::Null;
    }
    if raw == "true" {
        return Value::Bool(true);
    }
    if raw == "false" {
        return Value::Bool(false);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if looks_like_float(raw) {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Number(f.into());
        }
    }
    if let Some(inner) = quoted_inner(raw) {
        return Value::String(inner.to_string());
    }
    if raw.starts_with('[') || raw.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
            if let Ok(value) = serde_yaml::to_value(&json) {
                return value;
            }
        }
    }
    Value::String(raw.trim_matches(|c| c == '"' || c == '\'').to_string())
}

fn looks_like_float(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let mut parts = digits.splitn(2, '.');
    match (parts.next(), parts.next()) {
        (Some(int), Some(frac)) => {
            !int.is_empty()
                && !frac.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

fn quoted_inner(raw: &str) -> Option<&str> {
    if raw.len() < 2 {
        return None;
    }
    let first = raw.chars().next()?;
    if (first == '"' || first == '\'') && raw.ends_with(first) {
        return Some(&raw[1..raw.len() - 1]);
    }
    None
}

/// Extract just the command from a shell-style payload. Understands a plain
/// scalar, a quoted scalar, and a block-scalar header followed by indented
/// body lines. Everything else in the payload is dropped.
pub fn command_salvage(content: &str) -> Option<Mapping> {
    let caps = cmd_line_re().captures(content)?;
    let m = caps.get(0)?;
    let indent = caps[1].len();
    let value = caps[3].trim();

    let cmd = if value.is_empty() || value.starts_with('|') || value.starts_with('>') {
        let body = block_body(&content[m.end()..], indent);
        if body.is_empty() {
            return None;
        }
        body
    } else {
        value.trim_matches(|c| c == '"' || c == '\'').to_string()
    };

    let mut map = Mapping::new();
    map.insert(Value::String("cmd".to_string()), Value::String(cmd));
    Some(map)
}

/// Collect the more-indented lines following a block-scalar header, dedented
/// by their minimum indentation.
fn block_body(rest: &str, header_indent: usize) -> String {
    let mut body: Vec<&str> = Vec::new();
    for line in rest.lines() {
        if line.trim().is_empty() {
            if !body.is_empty() {
                body.push("");
            }
            continue;
        }
        let line_indent = line.len() - line.trim_start().len();
        if line_indent <= header_indent {
            break;
        }
        body.push(line);
    }
    while body.last() == Some(&"") {
        body.pop();
    }
    if body.is_empty() {
        return String::new();
    }

    let min_indent = body
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    body.iter()
        .map(|l| if l.is_empty() { *l } else { &l[min_indent..] })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(map: &'a Mapping, key: &str) -> &'a Value {
        map.get(key).unwrap()
    }

    #[test]
    fn test_line_salvage_coerces_scalars() {
        let content = "cmd: \"ls -la\"\ntimeout: 30\nratio: 1.5\nok: true\nnote: null\nempty:";
        let map = line_salvage(content).unwrap();
        assert_eq!(get(&map, "cmd"), &Value::String("ls -la".to_string()));
        assert_eq!(get(&map, "timeout"), &Value::Number(30.into()));
        assert_eq!(get(&map, "ok"), &Value::Bool(true));
        assert_eq!(get(&map, "note"), &Value::Null);
        assert_eq!(get(&map, "empty"), &Value::Null);
    }

    #[test]
    fn test_line_salvage_parses_inline_json() {
        let map = line_salvage("contextRefs: [\"a\", \"b\"]").unwrap();
        let refs = get(&map, "contextRefs").as_sequence().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], Value::String("a".to_string()));
    }

    #[test]
    fn test_line_salvage_skips_junk_lines() {
        let map = line_salvage("some prose here\npath: /tmp/x\n: nothing").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(get(&map, "path"), &Value::String("/tmp/x".to_string()));
    }

    #[test]
    fn test_line_salvage_block_scalar_value() {
        let content = "path: /tmp/x\ncontent: |\nfn main() {\n    println!(\"hi\");\n}";
        let map = line_salvage(content).unwrap();
        assert_eq!(
            get(&map, "content"),
            &Value::String("fn main() {\n    println!(\"hi\");\n}".to_string())
        );
        assert_eq!(get(&map, "path"), &Value::String("/tmp/x".to_string()));
    }

    #[test]
    fn test_line_salvage_none_without_pairs() {
        assert!(line_salvage("no pairs at all\njust words").is_none());
        assert!(line_salvage("").is_none());
    }

    #[test]
    fn test_command_salvage_plain_scalar() {
        let map = command_salvage("cmd: ls -la\ngarbage [[[ here").unwrap();
        assert_eq!(get(&map, "cmd"), &Value::String("ls -la".to_string()));
    }

    #[test]
    fn test_command_salvage_accepts_command_alias() {
        let map = command_salvage("command: 'echo hi'").unwrap();
        assert_eq!(get(&map, "cmd"), &Value::String("echo hi".to_string()));
    }

    #[test]
    fn test_command_salvage_block_scalar() {
        let content = "cmd: |\n  for f in *.rs; do\n    wc -l $f\n  done\ntimeout: 5";
        let map = command_salvage(content).unwrap();
        assert_eq!(
            get(&map, "cmd"),
            &Value::String("for f in *.rs; do\n  wc -l $f\ndone".to_string())
        );
    }

    #[test]
    fn test_command_salvage_none_without_cmd() {
        assert!(command_salvage("path: /tmp/x").is_none());
        assert!(command_salvage("cmd:").is_none());
    }
}
