//! Stateless parameter sub-selectors.
//!
//! Each selector draws one protocol knob from tactics and server entry
//! inputs. They may be called in any order; the composer gates them by
//! tunnel protocol and replay flags.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use pl_protocol::{conjure, quic, ServerEntry};
use pl_tactics::{
    names, HttpHeaders, ParametersAccessor, TransformerParameters, SCOPE_ANY,
};

use crate::config::Config;
use crate::error::{DialError, Result};
use crate::notice::notice_warning;
use crate::values;

/// A prefix prepended to the OSSH stream to mimic another protocol's
/// preamble. Mutually exclusive with the OSSH seed transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsshPrefixSpec {
    pub name: String,
    pub spec: pl_tactics::TransformSpec,
    pub seed: pl_prng::Seed,
}

/// Write-splitting behavior applied after an OSSH prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsshPrefixSplitConfig {
    pub seed: pl_prng::Seed,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

/// Select the fronting dial host and Host-header host for a fronted meek
/// dial: `(dial_host, host)`.
pub fn select_fronting_parameters(server_entry: &ServerEntry) -> Result<(String, String)> {
    let fronting_dial_host = if !server_entry.meek_fronting_addresses_regex.is_empty() {
        pl_prng::regen::generate(&server_entry.meek_fronting_addresses_regex)
            .map_err(DialError::Prng)?
    } else {
        if server_entry.meek_fronting_addresses.is_empty() {
            return Err(DialError::Fronting(pl_tactics::FrontingError::Empty));
        }
        let index = pl_prng::intn(server_entry.meek_fronting_addresses.len());
        server_entry.meek_fronting_addresses[index].clone()
    };

    let fronting_host = if !server_entry.meek_fronting_hosts.is_empty() {
        let index = pl_prng::intn(server_entry.meek_fronting_hosts.len());
        server_entry.meek_fronting_hosts[index].clone()
    } else {
        // Legacy scalar field.
        server_entry.meek_fronting_host.clone()
    };

    Ok((fronting_dial_host, fronting_host))
}

/// Select a QUIC version, or `None` when tactics and server entry limits
/// leave nothing to dial. The caller skips the candidate in that case.
pub fn select_quic_version(
    is_fronted: bool,
    server_entry: &ServerEntry,
    p: &ParametersAccessor,
) -> Option<String> {
    let limit_quic_versions = p.quic_versions(names::LIMIT_QUIC_VERSIONS);

    let disable_quic_versions: Vec<String> = if is_fronted {
        if server_entry.fronting_provider_id.is_empty() {
            // Legacy server entries predate per-provider labels; v1 variants
            // are known not to traverse those fronts.
            vec![
                quic::QUIC_VERSION_V1.to_string(),
                quic::QUIC_VERSION_RANDOMIZED_V1.to_string(),
                quic::QUIC_VERSION_OBFUSCATED_V1.to_string(),
                quic::QUIC_VERSION_DECOY_V1.to_string(),
            ]
        } else {
            p.labeled_quic_versions(
                names::DISABLE_FRONTING_PROVIDER_QUIC_VERSIONS,
                &server_entry.fronting_provider_id,
            )
        }
    } else {
        Vec::new()
    };

    let supported: &[&str] = if server_entry.supports_only_quic_v1() {
        quic::SUPPORTED_QUIC_V1_VERSIONS
    } else {
        quic::SUPPORTED_QUIC_VERSIONS
    };

    let candidates: Vec<&str> = supported
        .iter()
        .copied()
        .filter(|version| {
            limit_quic_versions.is_empty()
                || pl_protocol::contains_str(&limit_quic_versions, version)
        })
        .filter(|version| {
            server_entry.limit_quic_versions.is_empty()
                || pl_protocol::contains_str(&server_entry.limit_quic_versions, version)
        })
        .filter(|version| !(is_fronted && quic::is_obfuscated(version)))
        .filter(|version| !pl_protocol::contains_str(&disable_quic_versions, version))
        .collect();

    if candidates.is_empty() {
        return None;
    }

    Some(candidates[pl_prng::intn(candidates.len())].to_string())
}

/// Select a Conjure transport from the supported set, intersected with the
/// tactics limit. `None` when the intersection is empty.
pub fn select_conjure_transport(p: &ParametersAccessor) -> Option<String> {
    let limit = p.conjure_transports(names::CONJURE_LIMIT_TRANSPORTS);

    let candidates: Vec<&str> = conjure::SUPPORTED_CONJURE_TRANSPORTS
        .iter()
        .copied()
        .filter(|transport| limit.is_empty() || pl_protocol::contains_str(&limit, transport))
        .collect();

    if candidates.is_empty() {
        return None;
    }

    Some(candidates[pl_prng::intn(candidates.len())].to_string())
}

/// Select a host name for SNI/Host-header use: a custom generated name when
/// tactics enable it for this protocol, the canned value otherwise. Never
/// fails; generation errors fall back to the canned name.
pub fn select_host_name(tunnel_protocol: &str, p: &ParametersAccessor) -> String {
    let limit_protocols = p.tunnel_protocols(names::CUSTOM_HOST_NAME_LIMIT_PROTOCOLS);
    if !limit_protocols.is_empty()
        && !pl_protocol::contains_str(&limit_protocols, tunnel_protocol)
    {
        return values::get_host_name();
    }

    if !p.weighted_coin_flip(names::CUSTOM_HOST_NAME_PROBABILITY) {
        return values::get_host_name();
    }

    let regexes = p.regex_strings(names::CUSTOM_HOST_NAME_REGEXES);
    if regexes.is_empty() {
        return values::get_host_name();
    }

    let pattern = &regexes[pl_prng::intn(regexes.len())];
    match pl_prng::regen::generate(pattern) {
        Ok(host_name) => host_name,
        Err(e) => {
            notice_warning(format!("custom host name generation failed: {}", e));
            values::get_host_name()
        }
    }
}

/// Select a User-Agent when the caller hasn't provided one.
///
/// Returns `(selected, user_agent)`: `selected` is false when a caller
/// header already exists; otherwise the agent is either a canned value or
/// explicitly empty, by coin flip.
pub fn select_user_agent_if_unset(
    p: &ParametersAccessor,
    headers: &HttpHeaders,
) -> (bool, String) {
    if headers.contains_key("User-Agent") {
        return (false, String::new());
    }

    let user_agent = if p.weighted_coin_flip(names::PICK_USER_AGENT_PROBABILITY) {
        values::get_user_agent()
    } else {
        String::new()
    };

    (true, user_agent)
}

/// Select an HTTP protocol transform. Fronted requests scope specs by
/// fronting provider ID; direct requests use the catch-all scope.
pub fn make_http_transformer_parameters(
    p: &ParametersAccessor,
    fronting_provider_id: &str,
    is_fronted: bool,
) -> Result<Option<TransformerParameters>> {
    let (use_transform, scope, specs_name, scoped_name) = if is_fronted {
        (
            p.weighted_coin_flip(names::FRONTED_HTTP_PROTOCOL_TRANSFORM_PROBABILITY),
            fronting_provider_id,
            names::FRONTED_HTTP_PROTOCOL_TRANSFORM_SPECS,
            names::FRONTED_HTTP_PROTOCOL_TRANSFORM_SCOPED_SPEC_NAMES,
        )
    } else {
        (
            p.weighted_coin_flip(names::DIRECT_HTTP_PROTOCOL_TRANSFORM_PROBABILITY),
            SCOPE_ANY,
            names::DIRECT_HTTP_PROTOCOL_TRANSFORM_SPECS,
            names::DIRECT_HTTP_PROTOCOL_TRANSFORM_SCOPED_SPEC_NAMES,
        )
    };

    if !use_transform {
        return Ok(None);
    }

    let specs = p.protocol_transform_specs(specs_name);
    let scoped_names = p.protocol_transform_scoped_spec_names(scoped_name);

    match specs.select(scope, &scoped_names) {
        Some((transform_name, transform_spec)) => Ok(Some(TransformerParameters {
            transform_name,
            transform_spec,
            transform_seed: pl_prng::Seed::new().map_err(DialError::Prng)?,
        })),
        None => Ok(None),
    }
}

/// Select an obfuscator seed transform from the named spec family.
pub fn make_seed_transformer_parameters(
    p: &ParametersAccessor,
    probability_name: &str,
    specs_name: &str,
    scoped_specs_name: &str,
) -> Result<Option<TransformerParameters>> {
    if !p.weighted_coin_flip(probability_name) {
        return Ok(None);
    }

    let seed = pl_prng::Seed::new().map_err(DialError::Prng)?;

    let specs = p.protocol_transform_specs(specs_name);
    let scoped_names = p.protocol_transform_scoped_spec_names(scoped_specs_name);

    match specs.select(SCOPE_ANY, &scoped_names) {
        Some((transform_name, transform_spec)) => Ok(Some(TransformerParameters {
            transform_name,
            transform_spec,
            transform_seed: seed,
        })),
        None => Ok(None),
    }
}

/// Select an OSSH prefix spec, scoped by the dial port string.
pub fn make_ossh_prefix_spec_parameters(
    p: &ParametersAccessor,
    dial_port_number: &str,
) -> Result<Option<OsshPrefixSpec>> {
    if !p.weighted_coin_flip(names::OSSH_PREFIX_PROBABILITY) {
        return Ok(None);
    }

    let specs = p.protocol_transform_specs(names::OSSH_PREFIX_SPECS);
    let scoped_names = p.protocol_transform_scoped_spec_names(names::OSSH_PREFIX_SCOPED_SPEC_NAMES);

    match specs.select(dial_port_number, &scoped_names) {
        Some((name, spec)) => Ok(Some(OsshPrefixSpec {
            name,
            spec,
            seed: pl_prng::Seed::new().map_err(DialError::Prng)?,
        })),
        None => Ok(None),
    }
}

pub fn make_ossh_prefix_split_config(p: &ParametersAccessor) -> Result<OsshPrefixSplitConfig> {
    Ok(OsshPrefixSplitConfig {
        seed: pl_prng::Seed::new().map_err(DialError::Prng)?,
        min_delay: p.duration(names::OSSH_PREFIX_SPLIT_MIN_DELAY),
        max_delay: p.duration(names::OSSH_PREFIX_SPLIT_MAX_DELAY),
    })
}

/// Combined custom headers: config-supplied headers overlaid with tactics
/// additions.
pub fn make_dial_custom_headers(config: &Config, p: &ParametersAccessor) -> HttpHeaders {
    let mut headers = config.custom_headers.clone();
    for (name, value) in p.http_headers(names::ADDITIONAL_CUSTOM_HEADERS) {
        headers.insert(name, value);
    }
    headers
}
