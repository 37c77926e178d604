//! Structured markup embedded in assistant prose.
//!
//! Two syntaxes carry pointers into the artifact store:
//!
//! - **Block mode** ([`reference`]): `<references><reference>…</reference></references>`
//!   envelopes, safe to scan while the text is still streaming.
//! - **Inline mode** ([`citation`]): `[title](TYPE:id)` markers, parsed line by
//!   line over settled text.
//!
//! Both sit on top of [`scanner::MarkerScanner`], which classifies a buffer
//! into plain spans, complete markers and a trailing incomplete marker.
//!
//! # Example
//!
//! ```rust
//! use chat_transcript::markup::{clean_references, extract_references};
//!
//! let text = "前 <references><reference><artifactId>x1</artifactId><title>T1</title></reference></references>后";
//! assert_eq!(extract_references(text)[0].artifact_id, "x1");
//! assert_eq!(clean_references(text), "前 后");
//! ```

pub mod citation;
pub mod reference;
pub mod scanner;

pub use citation::{TextPart, parse_citations, parse_text_parts};
pub use reference::{clean_references, extract_references, resolve_block};
pub use scanner::{MarkerScanner, Span, SpanKind};
