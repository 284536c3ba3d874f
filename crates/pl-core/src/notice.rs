//! Operator-facing notices, layered over `tracing`.
//!
//! Skip-server-entry notices are deduplicated per session: each distinct skip
//! reason is emitted at most once, regardless of how many candidates hit it.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

static SKIP_REASONS: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

pub fn notice_info(message: impl AsRef<str>) {
    tracing::info!("{}", message.as_ref());
}

pub fn notice_warning(message: impl AsRef<str>) {
    tracing::warn!("{}", message.as_ref());
}

/// Emit a candidate-skip notice, once per distinct reason per session.
pub fn notice_skip_server_entry(reason: impl Into<String>) {
    let reason = reason.into();
    if SKIP_REASONS.lock().insert(reason.clone()) {
        tracing::info!(reason = %reason, "skipping server entry");
    }
}

/// Forget deduplicated skip reasons; called when an establishment session
/// starts.
pub fn reset_skip_notices() {
    SKIP_REASONS.lock().clear();
}
