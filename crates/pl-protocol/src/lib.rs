//! Protocol-level definitions shared across the dial engine.
//!
//! Tunnel protocols, QUIC versions, TLS profiles and Conjure transports are
//! represented as string constants with predicate helpers, not enums:
//! persisted dial parameter records may carry names written by older or newer
//! clients, and replay arbitration must be able to hold and reject unknown
//! names rather than fail to deserialize them.

pub mod bpf;
pub mod conjure;
pub mod quic;
pub mod server_entry;
pub mod tls;
pub mod tunnel;

pub use bpf::RawInstruction;
pub use server_entry::{ServerEntry, ServerEntryError};

/// Convenience membership test used throughout selection code.
pub fn contains(values: &[&str], value: &str) -> bool {
    values.iter().any(|v| *v == value)
}

/// Membership test over owned string lists (tactics-delivered sets).
pub fn contains_str(values: &[String], value: &str) -> bool {
    values.iter().any(|v| v == value)
}
