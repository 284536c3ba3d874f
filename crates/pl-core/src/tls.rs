//! TLS profile selection.

use pl_protocol::tls as tls_profiles;
use pl_tactics::{names, ParametersAccessor};

use crate::error::{DialError, Result};

/// Outcome of profile selection; `None` when no candidate survives the
/// filters. Whether that is fatal depends on the caller's requirements.
#[derive(Debug, Clone)]
pub struct SelectedTlsProfile {
    pub profile: String,
    pub version: String,
    pub randomized_seed: Option<pl_prng::Seed>,
}

/// Choose a TLS ClientHello profile honoring tactics limits, fronting
/// provider exclusions, and protocol handshake requirements.
pub fn select_tls_profile(
    require_tls12_session_tickets: bool,
    require_tls13_support: bool,
    is_fronted: bool,
    fronting_provider_id: &str,
    p: &ParametersAccessor,
) -> Result<Option<SelectedTlsProfile>> {
    let limit = p.strings(names::LIMIT_TLS_PROFILES);

    let disabled = if is_fronted && !fronting_provider_id.is_empty() {
        p.labeled_strings(
            names::DISABLE_FRONTING_PROVIDER_TLS_PROFILES,
            fronting_provider_id,
        )
    } else {
        Vec::new()
    };

    let candidates: Vec<&str> = tls_profiles::SUPPORTED_TLS_PROFILES
        .iter()
        .copied()
        .filter(|profile| limit.is_empty() || pl_protocol::contains_str(&limit, profile))
        .filter(|profile| !pl_protocol::contains_str(&disabled, profile))
        .filter(|profile| {
            !require_tls12_session_tickets
                || tls_profiles::supports_obfuscated_session_tickets(profile)
        })
        .filter(|profile| !require_tls13_support || tls_profiles::supports_tls13(profile))
        .collect();

    if candidates.is_empty() {
        return Ok(None);
    }

    let profile = candidates[pl_prng::intn(candidates.len())].to_string();

    let randomized_seed = if tls_profiles::is_randomized(&profile) {
        Some(pl_prng::Seed::new().map_err(DialError::Prng)?)
    } else {
        None
    };

    let version = tls_profiles::profile_version(&profile).to_string();

    Ok(Some(SelectedTlsProfile {
        profile,
        version,
        randomized_seed,
    }))
}

/// Metrics string for the negotiated TLS version; the suffix marks dials
/// that suppressed the default session ID.
pub fn tls_version_for_metrics(tls_version: &str, no_default_session_id: bool) -> String {
    if no_default_session_id {
        format!("{}-no_def_id", tls_version)
    } else {
        tls_version.to_string()
    }
}
