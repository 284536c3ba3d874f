//! Upstream fragmentor configuration.
//!
//! The fragmentor itself lives with the dialers; the engine only decides,
//! per candidate, whether to fragment and with which bounds and seed.

use std::time::Duration;

use pl_tactics::{names, ParametersAccessor};

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentorConfig {
    pub seed: pl_prng::Seed,
    pub min_total_bytes: i64,
    pub max_total_bytes: i64,
    pub min_write_bytes: i64,
    pub max_write_bytes: i64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

/// Derive the fragmentor config for an upstream dial, or `None` when
/// fragmentation is disabled for this protocol or loses the coin flip.
pub fn new_upstream_config(
    p: &ParametersAccessor,
    tunnel_protocol: &str,
    seed: Option<pl_prng::Seed>,
) -> Option<FragmentorConfig> {
    let seed = seed?;

    let limit_protocols = p.tunnel_protocols(names::FRAGMENTOR_LIMIT_PROTOCOLS);
    if !limit_protocols.is_empty()
        && !pl_protocol::contains_str(&limit_protocols, tunnel_protocol)
    {
        return None;
    }

    if !p.weighted_coin_flip(names::FRAGMENTOR_PROBABILITY) {
        return None;
    }

    let max_total_bytes = p.int(names::FRAGMENTOR_MAX_TOTAL_BYTES);
    if max_total_bytes <= 0 {
        return None;
    }

    Some(FragmentorConfig {
        seed,
        min_total_bytes: p.int(names::FRAGMENTOR_MIN_TOTAL_BYTES),
        max_total_bytes,
        min_write_bytes: p.int(names::FRAGMENTOR_MIN_WRITE_BYTES),
        max_write_bytes: p.int(names::FRAGMENTOR_MAX_WRITE_BYTES),
        min_delay: p.duration(names::FRAGMENTOR_MIN_DELAY),
        max_delay: p.duration(names::FRAGMENTOR_MAX_DELAY),
    })
}
