//! Raw classic-BPF instruction representation.
//!
//! Programs arrive assembled from tactics; the engine carries them opaquely
//! into the dial configuration where a platform socket layer may attach them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInstruction {
    pub op: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}
