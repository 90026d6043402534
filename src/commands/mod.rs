//! Command implementations
//!
//! Each module backs one binary.

pub mod drafts;
pub mod squash;

pub use drafts::{filter_drafts, run as drafts_run, ConversationSummary, DraftEntry, DraftSource};
pub use squash::{parse_command, run as squash_run, SquashCommand, SquashPlan};
