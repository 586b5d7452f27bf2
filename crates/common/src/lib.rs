//! Shared error definitions and identifier helpers used across all agentdesk crates.

pub mod error;
pub mod ids;

pub use {
    error::{Error, FromMessage, Result},
    ids::{ensure_canonical, is_canonical_id, new_id},
};
