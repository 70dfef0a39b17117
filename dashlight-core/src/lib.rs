//! Dashlight Core - dash discovery and highlighting over a live document tree
//!
//! This crate contains everything except the command line:
//! - Arena document model with ordered mutation records
//! - Scanner for eligible text nodes, with tag and marker exclusion
//! - Annotator (windowed marker spans or block marking)
//! - Mutation bridge for the initial sweep and incremental updates
//! - Configuration management
//! - HTML parsing and serialization

pub mod annotator;
pub mod bridge;
pub mod config;
pub mod dom;
pub mod error;
pub mod html;
pub mod layout;
pub mod pattern;
pub mod policy;
pub mod processed;
pub mod scanner;

// Re-export commonly used types
pub use annotator::{Annotator, Outcome};
pub use bridge::{BridgeStats, MutationBridge};
pub use config::{Config, PatternConfig, Strategy};
pub use dom::{Document, MutationRecord, NodeId};
pub use error::DomError;
pub use scanner::scan;
