//! `docfill` - placeholder discovery and substitution for legal document
//! templates.
//!
//! A template arrives as two renditions of the same document: plain text
//! and WordprocessingML markup. `docfill` finds the fields a user must fill
//! (bracketed placeholders like `[Company Name]` and anonymous blanks like
//! `$[_____]`), labels each one from its surrounding text, and substitutes
//! answers back into the markup without breaking it.
//!
//! # Modules
//!
//! - [`extract`] - placeholder discovery, key normalization, blank labels
//! - [`fill`] - substitution engine with an ordered matcher chain
//! - [`reconcile`] - blank occurrence ↔ key mapping for live previews
//! - [`session`] - one loaded template, its answers, and the question flow
//! - [`server`] / [`tools`] - MCP over stdio (JSON-RPC 2.0)
//!
//! # Architecture
//!
//! ```text
//! plain text ─┐
//!             ├→ extract → DocumentSchema ─┐
//! markup ─────┘                            ├→ substitute → filled body
//!                   answers (AnswerMap) ───┘        ↓ (preview)
//!                                               reconcile → highlighted body
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fill;
pub mod markup;
pub mod reconcile;
pub mod schema;
pub mod server;
pub mod session;
pub mod tools;
pub mod util;

pub use config::{FillConfig, Marker};
pub use error::{FillError, FillResult};
pub use extract::extract;
pub use fill::{FillIssue, FillMode, FillOutcome, FillReport, substitute};
pub use reconcile::{Reconciliation, reconcile};
pub use schema::{AnswerMap, DocumentSchema, PlaceholderKey, PlaceholderRecord};
pub use server::run_mcp_server;
pub use session::FillSession;
