//! Tagged-block extraction from raw response text.
//!
//! Producers reliably open tags but unreliably close them, so extraction is
//! two-tier: an exact scan for balanced `<name>...</name>` pairs, and a repair
//! scan that infers a block's end from the next sibling tag (or end of input)
//! when every closing delimiter is missing or mangled. Optimizing purely for
//! well-formed input would silently drop most real attempts.

use regex::Regex;
use std::sync::OnceLock;

/// Tags recognized as free-form reasoning containers. They are never actions
/// and never count as an action attempt.
pub const IGNORED_TAGS: &[&str] = &["think", "thinking", "reasoning", "reflection", "commentary"];

/// One tagged region of text, the unit of independent parse/recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
    /// Tag name, case-sensitive.
    pub tag: String,
    /// Raw payload between the delimiters.
    pub content: String,
    /// First-occurrence position among extracted blocks.
    pub order: usize,
}

fn open_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^<([A-Za-z_][A-Za-z0-9_-]*)>").unwrap())
}

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Za-z_][A-Za-z0-9_-]*)>").unwrap())
}

fn stray_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^</[A-Za-z_][A-Za-z0-9_-]*>?[ \t]*\z").unwrap())
}

fn is_ignored(tag: &str) -> bool {
    IGNORED_TAGS.contains(&tag)
}

/// True when the response contains any opening-tag-shaped token that is not an
/// ignored reasoning container. Distinguishes "no action was attempted" from
/// "an action was attempted but nothing could be extracted".
pub fn detect_tag_attempts(response: &str) -> bool {
    any_tag_re()
        .captures_iter(response)
        .any(|caps| !is_ignored(&caps[1]))
}

/// Extract tagged blocks in document order.
pub fn extract_blocks(response: &str) -> Vec<ExtractedBlock> {
    let mut blocks = balanced_blocks(response);
    if blocks.is_empty() {
        blocks = repaired_blocks(response);
    }

    blocks
        .into_iter()
        .filter(|(tag, _)| !is_ignored(tag))
        .enumerate()
        .map(|(order, (tag, content))| ExtractedBlock {
            tag,
            content,
            order,
        })
        .collect()
}

/// Exact scan: `<name>` at a line start, closed by the first matching
/// `</name>`. Requiring the close to repeat the open's name rejects cross-tag
/// mismatches like `<bash>...</finish>`.
fn balanced_blocks(response: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut cursor = 0usize;

    for caps in open_tag_re().captures_iter(response) {
        let open = caps.get(0).unwrap();
        if open.start() < cursor {
            continue;
        }
        let name = &caps[1];
        let close_token = format!("</{}>", name);
        if let Some(rel) = response[open.end()..].find(&close_token) {
            let close_start = open.end() + rel;
            let content = response[open.end()..close_start].trim();
            out.push((name.to_string(), content.to_string()));
            cursor = close_start + close_token.len();
        }
    }

    out
}

/// Repair scan: every `<name>` at a line start opens a block; its content runs
/// to the next opening tag at a line start, or end of input. Stray closing
/// tags left dangling at the end of the captured content (well formed or
/// truncated) are stripped.
fn repaired_blocks(response: &str) -> Vec<(String, String)> {
    let opens: Vec<(usize, usize, String)> = open_tag_re()
        .captures_iter(response)
        .map(|caps| {
            let m = caps.get(0).unwrap();
            (m.start(), m.end(), caps[1].to_string())
        })
        .collect();

    let mut out = Vec::new();
    for (i, (_, end, name)) in opens.iter().enumerate() {
        let content_end = opens
            .get(i + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(response.len());
        let content = strip_stray_close(response[*end..content_end].trim());
        out.push((name.clone(), content));
    }

    out
}

fn strip_stray_close(content: &str) -> String {
    let mut trimmed = content.trim_end();
    while let Some(m) = stray_close_re().find(trimmed) {
        trimmed = trimmed[..m.start()].trim_end();
    }
    trimmed.to_string()
}
