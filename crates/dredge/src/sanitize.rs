//! Structural cleanup for payloads the rule cascade could not repair.
//!
//! These passes rewrite whole regions rather than single lines, so they are
//! riskier than the targeted rules and only run as a later tier. Order
//! matters: entities first (so later passes see real characters), known
//! free-text fields next, then the generic colon quoting, then command blocks,
//! then continuation re-indent.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Inline values longer than this get pushed into block-scalar form.
const LONG_VALUE: usize = 60;

/// Fields whose values are prose or file content rather than short tokens.
fn free_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)(description|content|comments|oldString|newString):[ \t]+(.+)$")
            .unwrap()
    })
}

fn keyed_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([ \t]*)([A-Za-z_][\w.-]*):[ \t]+(.+)$").unwrap())
}

fn cmd_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([ \t]*)(cmd|command):[ \t]*(.*)$").unwrap())
}

fn block_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([ \t]*)content:[ \t]*\|[+-]?[ \t]*$").unwrap())
}

fn top_level_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][\w.-]*:([ \t]|$)").unwrap())
}

/// Run every sanitizer pass in order.
pub fn sanitize(content: &str) -> String {
    let content = decode_entities(content);
    let content = block_scalarize_free_text(&content);
    let content = quote_embedded_colons(&content);
    let content = convert_cmd_blocks(&content);
    reindent_content_blocks(&content)
}

/// Decode the HTML entities producers leak into payloads. `&amp;` goes last
/// so `&amp;lt;` decodes to `&lt;` and not `<`. Also runs ahead of the
/// recovery engine: an entity-laden payload often parses cleanly into wrong
/// values, which no parse-failure-driven tier would ever see.
pub(crate) fn decode_entities(content: &str) -> String {
    content
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn is_protected(value: &str) -> bool {
    value.starts_with('|') || value.starts_with('>') || is_fully_quoted(value)
}

fn is_fully_quoted(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    (first == '"' || first == '\'') && value.len() >= 2 && value.ends_with(first)
}

/// Free-text fields routinely contain colons and other structure that breaks
/// inline YAML. Move their values into literal blocks wholesale.
fn block_scalarize_free_text(content: &str) -> String {
    free_text_re()
        .replace_all(content, |caps: &Captures<'_>| {
            let indent = &caps[1];
            let value = caps[3].trim_end();
            if is_protected(value) || (!value.contains(':') && value.len() <= LONG_VALUE) {
                return caps[0].to_string();
            }
            format!("{indent}{}: |\n{indent}  {}", &caps[2], value)
        })
        .into_owned()
}

/// Quote any remaining inline value with an embedded colon. Command fields
/// are excluded: they get block-scalar treatment in the next pass.
fn quote_embedded_colons(content: &str) -> String {
    keyed_value_re()
        .replace_all(content, |caps: &Captures<'_>| {
            let key = &caps[2];
            let value = caps[3].trim_end();
            if key == "cmd" || key == "command" || is_protected(value) || !value.contains(':') {
                return caps[0].to_string();
            }
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            format!("{}{}: \"{}\"", &caps[1], key, escaped)
        })
        .into_owned()
}

/// Rewrite `cmd:` fields into literal blocks, adopting any immediately
/// following more-indented lines as part of the command.
fn convert_cmd_blocks(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        let Some(caps) = cmd_key_re().captures(line) else {
            out.push(line.to_string());
            i += 1;
            continue;
        };

        let indent = caps[1].to_string();
        let key = caps[2].to_string();
        let value = caps[3].trim().to_string();
        if value.starts_with('|') || value.starts_with('>') {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        let mut body: Vec<String> = Vec::new();
        if !value.is_empty() {
            let unquoted = if is_fully_quoted(&value) {
                value[1..value.len() - 1].to_string()
            } else {
                value
            };
            body.push(unquoted);
        }
        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if next.trim().is_empty() {
                break;
            }
            let next_indent = next.len() - next.trim_start().len();
            if next_indent <= indent.len() {
                break;
            }
            body.push(next.trim_start().to_string());
            j += 1;
        }

        if body.is_empty() {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        out.push(format!("{indent}{key}: |"));
        for b in &body {
            out.push(format!("{indent}  {b}"));
        }
        i = j.max(i + 1);
    }

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// After a `content: |` header, pull every continuation line up to the next
/// top-level key (or tag line) into the block. The whole region is shifted by
/// one uniform delta so its internal indentation survives the move.
fn reindent_content_blocks(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        out.push(line.to_string());
        let Some(caps) = block_header_re().captures(line) else {
            i += 1;
            continue;
        };
        let indent = caps[1].len();

        let mut region: Vec<&str> = Vec::new();
        i += 1;
        while i < lines.len() {
            let next = lines[i];
            if top_level_key_re().is_match(next) || next.starts_with('<') {
                break;
            }
            region.push(next);
            i += 1;
        }

        let min_indent = region
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min();
        let shift = match min_indent {
            Some(min) if min <= indent => indent + 2 - min,
            _ => 0,
        };
        let pad = " ".repeat(shift);
        for r in region {
            if r.trim().is_empty() {
                out.push(String::new());
            } else {
                out.push(format!("{pad}{r}"));
            }
        }
    }

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}
