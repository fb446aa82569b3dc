//! Dredge: resilient extraction of typed actions from free-form model output.
//!
//! A producer emits prose mixed with `<tag>`-delimited YAML-ish payloads.
//! Dredge finds the payloads, repairs what it can (targeted recovery rules,
//! structural sanitization, last-resort salvage), normalizes field names, and
//! validates each payload against its action contract. The caller gets typed
//! [`ParsedAction`] records plus per-block diagnostics; malformed input is
//! never a process error.
//!
//! ```
//! let result = dredge::parse_response("<bash>\ncmd: ls -la\n</bash>");
//! assert_eq!(result.actions.len(), 1);
//! assert!(result.errors.is_empty());
//! ```

pub mod diagnose;
pub mod distance;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod recover;
pub mod sanitize;

pub use extract::{detect_tag_attempts, extract_blocks, ExtractedBlock, IGNORED_TAGS};
pub use pipeline::{parse_response, ParseResult};
pub use recover::{strict_parse, try_recover, ParseFailure, Recovery};

pub use dredge_schema::{ActionKind, EditOp, ParsedAction};
