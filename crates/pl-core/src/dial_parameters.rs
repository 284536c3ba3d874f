//! Dial parameter selection and replay.
//!
//! [`make_dial_parameters`] materializes a [`DialParameters`] record for one
//! candidate server: a tunnel protocol plus every protocol-level knob the
//! downstream dialers need. Values are chosen at random within tactics
//! constraints, or replayed from a stored record of a previously successful
//! dial on the same network.
//!
//! A record is built by one task and then owned by the dialer task that
//! receives it; nothing here is shared except the resolved-IP cell.

use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use pl_protocol::{quic, tls as tls_profiles, tunnel, RawInstruction, ServerEntry};
use pl_tactics::{names, TransformerParameters};

use crate::config::Config;
use crate::dial_config::{
    CustomTlsConfig, DialConfig, MeekConfig, MeekMode, ResolveIpFn, ResolvedIpCell,
    TlsTunnelConfig, UpstreamProxyErrorCallback,
};
use crate::error::{DialError, Result};
use crate::fragmentor;
use crate::hashes::dial_state_hashes;
use crate::net::{is_ip_address, join_host_port, split_host_port};
use crate::notice::{notice_info, notice_skip_server_entry, notice_warning};
use crate::resolver::{ResolveParameters, Resolver};
use crate::selectors::{
    make_dial_custom_headers, make_http_transformer_parameters, make_ossh_prefix_spec_parameters,
    make_ossh_prefix_split_config, make_seed_transformer_parameters, select_conjure_transport,
    select_fronting_parameters, select_host_name, select_quic_version,
    select_user_agent_if_unset, OsshPrefixSpec, OsshPrefixSplitConfig,
};
use crate::store;
use crate::tls::select_tls_profile;
use crate::values;
use crate::{platform, tls};

/// A selected tunnel protocol and all related dial attributes.
///
/// Used to configure dialers, persisted for replay on success, and read for
/// dial metrics. Fields marked `serde(skip)` are transient and rebuilt each
/// composition.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialParameters {
    #[serde(skip)]
    pub server_entry: Option<Arc<ServerEntry>>,
    #[serde(skip)]
    pub network_id: String,
    #[serde(skip)]
    pub is_replay: bool,
    #[serde(skip)]
    pub candidate_number: i32,
    #[serde(skip)]
    pub established_tunnels_count: i32,

    pub is_exchanged: bool,

    /// `None` means replay is disabled and this record must not be persisted.
    pub last_used_timestamp: Option<SystemTime>,
    pub last_used_config_state_hash: Vec<u8>,
    pub last_used_server_entry_hash: Vec<u8>,

    pub network_latency_multiplier: f64,

    pub tunnel_protocol: String,

    pub direct_dial_address: String,
    pub dial_port_number: String,
    #[serde(skip)]
    pub upstream_proxy_type: String,
    #[serde(skip)]
    pub upstream_proxy_custom_header_names: Vec<String>,

    pub bpf_program_name: String,
    pub bpf_program_instructions: Vec<RawInstruction>,

    pub selected_ssh_client_version: bool,
    pub ssh_client_version: String,
    pub ssh_kex_seed: Option<pl_prng::Seed>,

    pub obfuscator_padding_seed: Option<pl_prng::Seed>,
    pub ossh_obfuscator_seed_transformer_parameters: Option<TransformerParameters>,

    pub ossh_prefix_spec: Option<OsshPrefixSpec>,
    pub ossh_prefix_split_config: Option<OsshPrefixSplitConfig>,

    pub fragmentor_seed: Option<pl_prng::Seed>,

    pub fronting_provider_id: String,

    pub meek_fronting_dial_address: String,
    pub meek_fronting_host: String,
    pub meek_dial_address: String,
    pub meek_transformed_host_name: bool,
    pub meek_sni_server_name: String,
    pub meek_verify_server_name: String,
    pub meek_verify_pins: Vec<String>,
    pub meek_host_header: String,
    pub meek_obfuscator_padding_seed: Option<pl_prng::Seed>,
    /// Reserved for the meek dialer's TLS record padding.
    pub meek_tls_padding_size: i32,
    #[serde(skip)]
    pub meek_resolved_ip_address: ResolvedIpCell,

    pub tls_ossh_transformed_sni_server_name: bool,
    pub tls_ossh_sni_server_name: String,
    pub tls_ossh_obfuscator_padding_seed: Option<pl_prng::Seed>,

    pub selected_user_agent: bool,
    pub user_agent: String,

    pub selected_tls_profile: bool,
    pub tls_profile: String,
    pub no_default_tls_session_id: bool,
    pub tls_version: String,
    pub randomized_tls_profile_seed: Option<pl_prng::Seed>,
    pub tls_fragment_client_hello: bool,

    pub quic_version: String,
    pub quic_dial_sni_address: String,
    pub quic_client_hello_seed: Option<pl_prng::Seed>,
    pub obfuscated_quic_padding_seed: Option<pl_prng::Seed>,
    pub obfuscated_quic_nonce_transformer_parameters: Option<TransformerParameters>,
    pub quic_disable_path_mtu_discovery: bool,

    pub conjure_cached_registration_ttl: std::time::Duration,
    pub conjure_api_registration: bool,
    pub conjure_api_registrar_bidirectional_url: String,
    pub conjure_api_registrar_delay: std::time::Duration,
    pub conjure_decoy_registration: bool,
    pub conjure_decoy_registrar_delay: std::time::Duration,
    pub conjure_decoy_registrar_width: i32,
    pub conjure_transport: String,
    pub conjure_stun_server_address: String,
    pub conjure_dtls_empty_initial_packet: bool,

    // Conjure enablement flags always reflect current tactics, never replay.
    #[serde(skip)]
    pub conjure_enable_ipv6_dials: bool,
    #[serde(skip)]
    pub conjure_enable_port_randomization: bool,
    #[serde(skip)]
    pub conjure_enable_registration_overrides: bool,

    pub liveness_test_seed: Option<pl_prng::Seed>,

    pub api_request_padding_seed: Option<pl_prng::Seed>,

    pub hold_off_tunnel_duration: std::time::Duration,

    pub resolve_parameters: Option<ResolveParameters>,

    pub http_transformer_parameters: Option<TransformerParameters>,

    #[serde(skip)]
    resolver: Option<Arc<dyn Resolver>>,
    #[serde(skip)]
    dial_config: Option<DialConfig>,
    #[serde(skip)]
    meek_config: Option<MeekConfig>,
}

/// Create dial parameters for one candidate server entry.
///
/// `select_protocol` applies the establishment controller's protocol
/// constraints; `can_replay` vetoes replay of a stored protocol. Returns
/// `Ok(None)` when the candidate should be skipped without an error.
///
/// On success the caller must invoke [`DialParameters::succeeded`]; on a
/// failed dial or activation, [`DialParameters::failed`] — except when
/// establishment was cancelled.
#[allow(clippy::too_many_arguments)]
pub fn make_dial_parameters(
    config: &Config,
    upstream_proxy_error_callback: Option<UpstreamProxyErrorCallback>,
    can_replay: &dyn Fn(&ServerEntry, &str) -> bool,
    select_protocol: &dyn Fn(&ServerEntry) -> Option<String>,
    server_entry: Arc<ServerEntry>,
    is_tactics: bool,
    candidate_number: i32,
    established_tunnels_count: i32,
) -> Result<Option<DialParameters>> {
    let network_id = config.get_network_id();

    let mut p = config.get_parameters().get();

    let ttl = p.duration(names::REPLAY_DIAL_PARAMETERS_TTL);
    let replay_ignore_changed_config_state = p.bool(names::REPLAY_IGNORE_CHANGED_CONFIG_STATE);
    let replay_bpf = p.bool(names::REPLAY_BPF);
    let replay_ssh = p.bool(names::REPLAY_SSH);
    let replay_obfuscator_padding = p.bool(names::REPLAY_OBFUSCATOR_PADDING);
    let replay_fragmentor = p.bool(names::REPLAY_FRAGMENTOR);
    let replay_tls_profile = p.bool(names::REPLAY_TLS_PROFILE);
    let replay_tls_fragment_client_hello = p.bool(names::REPLAY_TLS_FRAGMENT_CLIENT_HELLO);
    let replay_fronting = p.bool(names::REPLAY_FRONTING);
    let replay_hostname = p.bool(names::REPLAY_HOSTNAME);
    let replay_quic_version = p.bool(names::REPLAY_QUIC_VERSION);
    let replay_obfuscated_quic = p.bool(names::REPLAY_OBFUSCATED_QUIC);
    let replay_obfuscated_quic_nonce_transformer =
        p.bool(names::REPLAY_OBFUSCATED_QUIC_NONCE_TRANSFORMER);
    let replay_conjure_registration = p.bool(names::REPLAY_CONJURE_REGISTRATION);
    let replay_conjure_transport = p.bool(names::REPLAY_CONJURE_TRANSPORT);
    let replay_liveness_test = p.bool(names::REPLAY_LIVENESS_TEST);
    let replay_user_agent = p.bool(names::REPLAY_USER_AGENT);
    let replay_api_request_padding = p.bool(names::REPLAY_API_REQUEST_PADDING);
    let replay_hold_off_tunnel = p.bool(names::REPLAY_HOLD_OFF_TUNNEL);
    let replay_resolve_parameters = p.bool(names::REPLAY_RESOLVE_PARAMETERS);
    let replay_http_transformer_parameters =
        p.bool(names::REPLAY_HTTP_TRANSFORMER_PARAMETERS);
    let replay_ossh_seed_transformer_parameters =
        p.bool(names::REPLAY_OSSH_SEED_TRANSFORMER_PARAMETERS);
    let replay_ossh_prefix = p.bool(names::REPLAY_OSSH_PREFIX);

    // Check for a stored record for this server/network.

    let mut dial_params =
        store::get_dial_parameters(config.store().as_ref(), &server_entry.ip_address, &network_id);

    // When the TTL is zero replay is disabled; the timestamp stays unset and
    // `succeeded` will refuse to persist the output record.

    let mut current_timestamp = None;
    let mut config_state_hash = Vec::new();
    let mut server_entry_hash = Vec::new();

    if !ttl.is_zero() {
        current_timestamp = Some(SystemTime::now());
        let (config_hash, entry_hash) = dial_state_hashes(config, &p, &server_entry);
        config_state_hash = config_hash;
        server_entry_hash = entry_hash;
    }

    // A stored record is eligible for replay only while it is inside the TTL,
    // the config state and server entry are unchanged, and its TLS/QUIC
    // selections are still supported. Stale records are deleted so they are
    // not rechecked on every attempt. Records that carry a Conjure API
    // registration without a registrar URL were written by a client
    // generation whose URL field no longer applies; these are reset too.

    if let Some(record) = &dial_params {
        let expired = ttl.is_zero()
            || record
                .last_used_timestamp
                .map_or(true, |t| match current_timestamp {
                    Some(now) => t + ttl < now,
                    None => true,
                })
            || (!replay_ignore_changed_config_state
                && record.last_used_config_state_hash != config_state_hash)
            || record.last_used_server_entry_hash != server_entry_hash
            || (!record.tls_profile.is_empty()
                && !pl_protocol::contains(
                    tls_profiles::SUPPORTED_TLS_PROFILES,
                    &record.tls_profile,
                ))
            || (!record.quic_version.is_empty()
                && !pl_protocol::contains(quic::SUPPORTED_QUIC_VERSIONS, &record.quic_version))
            || (record.conjure_api_registration
                && record.conjure_api_registrar_bidirectional_url.is_empty());

        if expired {
            if let Err(e) = store::delete_dial_parameters(
                config.store().as_ref(),
                &server_entry.ip_address,
                &network_id,
            ) {
                notice_warning(format!("delete dial parameters failed: {}", e));
            }
            dial_params = None;
        }
    }

    if let Some(record) = &dial_params {
        if config.disable_replay || !can_replay(&server_entry, &record.tunnel_protocol) {
            // The stored record may still apply to a later establishment
            // phase, so it is discarded only in memory.
            dial_params = None;
        }
    }

    // Exchanged records are partially initialized: only the exchange fields
    // are trusted, everything else must be generated this pass. This is not
    // treated or logged as a replay. The completed record clears the
    // exchanged flag so a success persists it as a normal record.

    let mut is_replay = dial_params.is_some();
    let is_exchanged = is_replay && dial_params.as_ref().is_some_and(|d| d.is_exchanged);

    let mut dial_params = dial_params.unwrap_or_default();

    let resolver = config.get_resolver().ok_or(DialError::MissingResolver)?;
    dial_params.resolver = Some(resolver.clone());

    if is_exchanged {
        is_replay = false;
    }

    dial_params.is_exchanged = false;

    dial_params.server_entry = Some(server_entry.clone());
    dial_params.network_id = network_id.clone();
    dial_params.is_replay = is_replay;
    dial_params.candidate_number = candidate_number;
    dial_params.established_tunnels_count = established_tunnels_count;

    // The timestamp is refreshed even on replay, extending the TTL of the
    // record that will be re-persisted on success.

    dial_params.last_used_timestamp = current_timestamp;
    dial_params.last_used_config_state_hash = config_state_hash;
    dial_params.last_used_server_entry_hash = server_entry_hash;

    // Per-candidate network latency multiplier, drawn from an exponential
    // distribution bounded by tactics so that values near the minimum
    // dominate. A replayed value is redrawn when it has fallen outside the
    // current tactics range.

    let multiplier_min = p.float(names::NETWORK_LATENCY_MULTIPLIER_MIN);
    let multiplier_max = p.float(names::NETWORK_LATENCY_MULTIPLIER_MAX);

    if !is_replay
        || (dial_params.network_latency_multiplier != 0.0
            && (dial_params.network_latency_multiplier < multiplier_min
                || dial_params.network_latency_multiplier > multiplier_max))
    {
        dial_params.network_latency_multiplier = pl_prng::exp_float64_range(
            multiplier_min,
            multiplier_max,
            p.float(names::NETWORK_LATENCY_MULTIPLIER_LAMBDA),
        );
    }

    // Re-snapshot: every subsequent duration read reflects this candidate's
    // latency multiplier.
    p = config
        .get_parameters()
        .get_custom(dial_params.network_latency_multiplier);

    if !is_replay && !is_exchanged {
        match select_protocol(&server_entry) {
            Some(protocol) => dial_params.tunnel_protocol = protocol,
            None => return Ok(None),
        }
    }

    // Honor client-side restrictions on fronting provider usage; the server
    // side enforces the same list on tactics requests.
    if tunnel::uses_fronted_meek(&dial_params.tunnel_protocol)
        && pl_protocol::contains_str(
            &p.strings(names::RESTRICT_FRONTING_PROVIDER_IDS),
            &server_entry.fronting_provider_id,
        )
        && p.weighted_coin_flip(names::RESTRICT_FRONTING_PROVIDER_IDS_CLIENT_PROBABILITY)
    {
        notice_skip_server_entry(format!(
            "restricted fronting provider ID: {}",
            server_entry.fronting_provider_id
        ));
        return Ok(None);
    }

    if config.use_upstream_proxy() {
        // Protocol selection filters upstream-proxy-incompatible protocols;
        // this catches callers that don't apply that filter.
        if !tunnel::supports_upstream_proxy(&dial_params.tunnel_protocol) {
            notice_skip_server_entry(format!(
                "protocol does not support upstream proxy: {}",
                dial_params.tunnel_protocol
            ));
            return Ok(None);
        }

        // Only server entries from hard-to-enumerate sources are exposed to
        // the proxy, so a malicious proxy cannot harvest the server pool.
        let source = &server_entry.local_source;
        if !tunnel::allow_server_entry_source_with_upstream_proxy(source)
            && !p.bool(names::UPSTREAM_PROXY_ALLOW_ALL_SERVER_ENTRY_SOURCES)
        {
            notice_skip_server_entry(format!(
                "server entry source disallowed with upstream proxy: {}",
                source
            ));
            return Ok(None);
        }
    }

    if (!is_replay || !replay_bpf)
        && platform::client_bpf_enabled()
        && tunnel::uses_tcp(&dial_params.tunnel_protocol)
        && p.weighted_coin_flip(names::BPF_CLIENT_TCP_PROBABILITY)
    {
        dial_params.bpf_program_name = String::new();
        dial_params.bpf_program_instructions = Vec::new();
        if let Some((name, instructions)) = p.bpf_program(names::BPF_CLIENT_TCP_PROGRAM) {
            dial_params.bpf_program_name = name;
            dial_params.bpf_program_instructions = instructions;
        }
    }

    if !is_replay || !replay_ssh {
        dial_params.selected_ssh_client_version = true;
        dial_params.ssh_client_version = values::get_ssh_client_version();
        dial_params.ssh_kex_seed = Some(pl_prng::Seed::new()?);
    }

    if !is_replay || !replay_obfuscator_padding {
        dial_params.obfuscator_padding_seed = Some(pl_prng::Seed::new()?);
        if tunnel::uses_meek(&dial_params.tunnel_protocol) {
            dial_params.meek_obfuscator_padding_seed = Some(pl_prng::Seed::new()?);
        } else if tunnel::uses_tls_ossh(&dial_params.tunnel_protocol) {
            dial_params.tls_ossh_obfuscator_padding_seed = Some(pl_prng::Seed::new()?);
        }
    }

    if !is_replay || !replay_fragmentor {
        dial_params.fragmentor_seed = Some(pl_prng::Seed::new()?);
    }

    if (!is_replay || !replay_conjure_registration)
        && tunnel::uses_conjure(&dial_params.tunnel_protocol)
    {
        dial_params.conjure_cached_registration_ttl =
            p.duration(names::CONJURE_CACHED_REGISTRATION_TTL);

        let api_url = p.string(names::CONJURE_API_REGISTRAR_BIDIRECTIONAL_URL);
        let decoy_width = p.int(names::CONJURE_DECOY_REGISTRAR_WIDTH);

        dial_params.conjure_api_registration = !api_url.is_empty();
        dial_params.conjure_decoy_registration = decoy_width != 0;

        // Exactly one registration scheme per candidate; establishment
        // retries cover the other scheme, keeping the attempted proportions
        // under tactics control.
        if dial_params.conjure_api_registration && dial_params.conjure_decoy_registration {
            if p.weighted_coin_flip(names::CONJURE_DECOY_REGISTRAR_PROBABILITY) {
                dial_params.conjure_api_registration = false;
            }
        }

        if dial_params.conjure_api_registration {
            // API registration runs over a fronted meek round-tripper whose
            // address and SNI are configured here, not in the shared meek
            // blocks below; the fronting/hostname replay flags don't apply.

            dial_params.conjure_api_registrar_bidirectional_url = api_url;

            let fronting_specs = p.fronting_specs(names::CONJURE_API_REGISTRAR_FRONTING_SPECS);
            let selected = fronting_specs.select_parameters()?;
            dial_params.fronting_provider_id = selected.fronting_provider_id;
            dial_params.meek_fronting_dial_address = selected.dial_address;
            dial_params.meek_sni_server_name = selected.sni_server_name;
            dial_params.meek_verify_server_name = selected.verify_server_name;
            dial_params.meek_verify_pins = selected.verify_pins;
            dial_params.meek_fronting_host = selected.host;

            if config.disable_system_root_cas {
                return Err(DialError::ConjureApiRequiresVerification);
            }

            dial_params.meek_dial_address =
                join_host_port(&dial_params.meek_fronting_dial_address, 443);
            dial_params.meek_host_header = dial_params.meek_fronting_host.clone();

            // An empty SNI in the fronting spec disables SNI outright; never
            // transform in that case.
            if !dial_params.meek_sni_server_name.is_empty()
                && p.weighted_coin_flip(names::TRANSFORM_HOST_NAME_PROBABILITY)
            {
                dial_params.meek_sni_server_name =
                    select_host_name(&dial_params.tunnel_protocol, &p);
                dial_params.meek_transformed_host_name = true;
            }

            // The delay floor comes from the station's liveness test against
            // the selected phantoms; the jitter avoids a fixed inter-flow
            // fingerprint.
            let min_delay = p.duration(names::CONJURE_API_REGISTRAR_MIN_DELAY);
            let max_delay = p.duration(names::CONJURE_API_REGISTRAR_MAX_DELAY);
            dial_params.conjure_api_registrar_delay = pl_prng::period(min_delay, max_delay);
        } else if dial_params.conjure_decoy_registration {
            dial_params.conjure_decoy_registrar_width = decoy_width as i32;
            let min_delay = p.duration(names::CONJURE_DECOY_REGISTRAR_MIN_DELAY);
            let max_delay = p.duration(names::CONJURE_DECOY_REGISTRAR_MAX_DELAY);
            dial_params.conjure_decoy_registrar_delay = pl_prng::period(min_delay, max_delay);
        } else {
            return Err(DialError::NoConjureRegistrar);
        }
    }

    if tunnel::uses_conjure(&dial_params.tunnel_protocol) {
        // Enablement flags are never replayed; the current tactics values
        // always apply.
        dial_params.conjure_enable_ipv6_dials = p.bool(names::CONJURE_ENABLE_IPV6_DIALS);
        dial_params.conjure_enable_port_randomization =
            p.bool(names::CONJURE_ENABLE_PORT_RANDOMIZATION);
        dial_params.conjure_enable_registration_overrides =
            p.bool(names::CONJURE_ENABLE_REGISTRATION_OVERRIDES);

        if !is_replay || !replay_conjure_transport {
            dial_params.conjure_transport =
                select_conjure_transport(&p).unwrap_or_default();
            if pl_protocol::conjure::transport_uses_stun(&dial_params.conjure_transport) {
                let stun_servers = p.strings(names::CONJURE_STUN_SERVER_ADDRESSES);
                if stun_servers.is_empty() {
                    return Err(DialError::MissingStunServers(
                        dial_params.conjure_transport.clone(),
                    ));
                }
                dial_params.conjure_stun_server_address =
                    stun_servers[pl_prng::intn(stun_servers.len())].clone();
                dial_params.conjure_dtls_empty_initial_packet =
                    p.weighted_coin_flip(names::CONJURE_DTLS_EMPTY_INITIAL_PACKET_PROBABILITY);
            }
        }
    }

    let using_tls = tunnel::uses_meek_https(&dial_params.tunnel_protocol)
        || tunnel::uses_tls_ossh(&dial_params.tunnel_protocol)
        || dial_params.conjure_api_registration;

    if (!is_replay || !replay_tls_profile) && using_tls {
        dial_params.selected_tls_profile = true;

        let require_tls12_session_tickets =
            tunnel::requires_tls12_session_tickets(&dial_params.tunnel_protocol);
        let require_tls13_support =
            tunnel::requires_tls13_support(&dial_params.tunnel_protocol);
        let is_fronted = tunnel::uses_fronted_meek(&dial_params.tunnel_protocol)
            || dial_params.conjure_api_registration;

        match select_tls_profile(
            require_tls12_session_tickets,
            require_tls13_support,
            is_fronted,
            &server_entry.fronting_provider_id,
            &p,
        )? {
            Some(selected) => {
                dial_params.tls_profile = selected.profile;
                dial_params.tls_version = selected.version;
                dial_params.randomized_tls_profile_seed = selected.randomized_seed;
            }
            None => {
                if require_tls12_session_tickets || require_tls13_support {
                    return Err(DialError::RequiredTlsProfileNotFound);
                }
                dial_params.tls_profile = String::new();
                dial_params.tls_version = String::new();
                dial_params.randomized_tls_profile_seed = None;
            }
        }

        dial_params.no_default_tls_session_id =
            p.weighted_coin_flip(names::NO_DEFAULT_TLS_SESSION_ID_PROBABILITY);
    }

    if (!is_replay || !replay_fronting)
        && tunnel::uses_fronted_meek(&dial_params.tunnel_protocol)
    {
        dial_params.fronting_provider_id = server_entry.fronting_provider_id.clone();
        let (dial_address, host) = select_fronting_parameters(&server_entry)?;
        dial_params.meek_fronting_dial_address = dial_address;
        dial_params.meek_fronting_host = host;
    }

    if !is_replay || !replay_hostname {
        // Host header selections here are overridden below for fronted
        // dispatch cases.

        if tunnel::uses_meek_https(&dial_params.tunnel_protocol)
            || tunnel::uses_fronted_meek_quic(&dial_params.tunnel_protocol)
        {
            dial_params.meek_sni_server_name = String::new();
            let hostname;
            if p.weighted_coin_flip(names::TRANSFORM_HOST_NAME_PROBABILITY) {
                dial_params.meek_sni_server_name =
                    select_host_name(&dial_params.tunnel_protocol, &p);
                hostname = dial_params.meek_sni_server_name.clone();
                dial_params.meek_transformed_host_name = true;
            } else {
                // The Host header is encrypted on the wire here, so a host
                // name is always selected: presenting the server IP gains
                // nothing and can leak it if traffic is rerouted to a
                // different HTTPS server.
                hostname = select_host_name(&dial_params.tunnel_protocol, &p);
            }
            dial_params.meek_host_header = if server_entry.meek_server_port == 443 {
                hostname
            } else {
                join_host_port(&hostname, server_entry.meek_server_port)
            };
        } else if tunnel::uses_tls_ossh(&dial_params.tunnel_protocol) {
            dial_params.tls_ossh_sni_server_name = String::new();
            if p.weighted_coin_flip(names::TRANSFORM_HOST_NAME_PROBABILITY) {
                dial_params.tls_ossh_sni_server_name =
                    select_host_name(&dial_params.tunnel_protocol, &p);
                dial_params.tls_ossh_transformed_sni_server_name = true;
            }
        } else if tunnel::uses_meek_http(&dial_params.tunnel_protocol) {
            dial_params.meek_host_header = String::new();
            let mut hostname = server_entry.ip_address.clone();
            if p.weighted_coin_flip(names::TRANSFORM_HOST_NAME_PROBABILITY) {
                hostname = select_host_name(&dial_params.tunnel_protocol, &p);
                dial_params.meek_transformed_host_name = true;
            }
            dial_params.meek_host_header = if server_entry.meek_server_port == 80 {
                hostname
            } else {
                join_host_port(&hostname, server_entry.meek_server_port)
            };
        } else if tunnel::uses_quic(&dial_params.tunnel_protocol) {
            dial_params.quic_dial_sni_address =
                select_host_name(&dial_params.tunnel_protocol, &p);
        }
    }

    if (!is_replay || !replay_quic_version) && tunnel::uses_quic(&dial_params.tunnel_protocol) {
        let is_fronted = tunnel::uses_fronted_meek_quic(&dial_params.tunnel_protocol);

        // Tactics may leave no viable QUIC version; skip the candidate
        // without an error so no failed_tunnel is logged for it.
        dial_params.quic_version = match select_quic_version(is_fronted, &server_entry, &p) {
            Some(version) => version,
            None => return Ok(None),
        };

        if quic::has_randomized_client_hello(&dial_params.quic_version) {
            dial_params.quic_client_hello_seed = Some(pl_prng::Seed::new()?);
        }

        dial_params.quic_disable_path_mtu_discovery =
            quic::uses_path_mtu_discovery(&dial_params.quic_version)
                && p.weighted_coin_flip(names::QUIC_DISABLE_CLIENT_PATH_MTU_DISCOVERY_PROBABILITY);
    }

    if (!is_replay || !replay_obfuscated_quic) && quic::is_obfuscated(&dial_params.quic_version)
    {
        dial_params.obfuscated_quic_padding_seed = Some(pl_prng::Seed::new()?);
    }

    if quic::is_obfuscated(&dial_params.quic_version) {
        if server_entry.disable_obfuscated_quic_transforms {
            dial_params.obfuscated_quic_nonce_transformer_parameters = None;
        } else if !is_replay || !replay_obfuscated_quic_nonce_transformer {
            dial_params.obfuscated_quic_nonce_transformer_parameters =
                make_seed_transformer_parameters(
                    &p,
                    names::OBFUSCATED_QUIC_NONCE_TRANSFORM_PROBABILITY,
                    names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SPECS,
                    names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SCOPED_SPEC_NAMES,
                )?;
        }
    }

    if !is_replay || !replay_liveness_test {
        // Generated even when the liveness test is disabled, keeping
        // persisted records byte-stable across versions.
        dial_params.liveness_test_seed = Some(pl_prng::Seed::new()?);
    }

    if !is_replay || !replay_api_request_padding {
        dial_params.api_request_padding_seed = Some(pl_prng::Seed::new()?);
    }

    // Resolve parameters exist only for dials that will resolve a domain:
    // fronted meek or Conjure API registration with a non-IP dial address.
    // They stay unset otherwise so DNS values are never reported for dials
    // that resolved nothing.

    let use_resolver = (tunnel::uses_fronted_meek(&dial_params.tunnel_protocol)
        || dial_params.conjure_api_registration)
        && !is_ip_address(&dial_params.meek_fronting_dial_address);

    if (!is_replay || !replay_resolve_parameters) && use_resolver {
        dial_params.resolve_parameters = Some(
            resolver
                .make_resolve_parameters(
                    &p,
                    &dial_params.fronting_provider_id,
                    &dial_params.meek_fronting_dial_address,
                )
                .map_err(|e| DialError::Resolve(e.to_string()))?,
        );
    }

    if !is_replay || !replay_hold_off_tunnel {
        if (pl_protocol::contains_str(
            &p.tunnel_protocols(names::HOLD_OFF_TUNNEL_PROTOCOLS),
            &dial_params.tunnel_protocol,
        ) || (tunnel::uses_fronted_meek(&dial_params.tunnel_protocol)
            && pl_protocol::contains_str(
                &p.strings(names::HOLD_OFF_TUNNEL_FRONTING_PROVIDER_IDS),
                &dial_params.fronting_provider_id,
            )))
            && p.weighted_coin_flip(names::HOLD_OFF_TUNNEL_PROBABILITY)
        {
            dial_params.hold_off_tunnel_duration = pl_prng::period(
                p.duration(names::HOLD_OFF_TUNNEL_MIN_DURATION),
                p.duration(names::HOLD_OFF_TUNNEL_MAX_DURATION),
            );
        }
    }

    // The OSSH prefix and seed transform apply only to the plain OSSH
    // protocol, never to protocols layered over OSSH.
    if dial_params.tunnel_protocol == tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH {
        if server_entry.disable_ossh_transforms {
            dial_params.ossh_obfuscator_seed_transformer_parameters = None;
        } else if !is_replay || !replay_ossh_seed_transformer_parameters {
            dial_params.ossh_obfuscator_seed_transformer_parameters =
                make_seed_transformer_parameters(
                    &p,
                    names::OSSH_OBFUSCATOR_SEED_TRANSFORM_PROBABILITY,
                    names::OSSH_OBFUSCATOR_SEED_TRANSFORM_SPECS,
                    names::OSSH_OBFUSCATOR_SEED_TRANSFORM_SCOPED_SPEC_NAMES,
                )?;
        }

        if server_entry.disable_ossh_prefix {
            dial_params.ossh_prefix_spec = None;
            dial_params.ossh_prefix_split_config = None;
        } else if !is_replay || !replay_ossh_prefix {
            let dial_port_number =
                server_entry.dial_port_number(&dial_params.tunnel_protocol)?;
            let prefix_spec =
                make_ossh_prefix_spec_parameters(&p, &dial_port_number.to_string())?;
            match prefix_spec {
                Some(spec) => {
                    dial_params.ossh_prefix_spec = Some(spec);
                    dial_params.ossh_prefix_split_config =
                        Some(make_ossh_prefix_split_config(&p)?);
                }
                None => {
                    dial_params.ossh_prefix_spec = None;
                    dial_params.ossh_prefix_split_config = None;
                }
            }
        }

        // The prefix and the seed transform are wire-incompatible; a
        // selected prefix supersedes the transform.
        if dial_params.ossh_prefix_spec.is_some() {
            dial_params.ossh_obfuscator_seed_transformer_parameters = None;
        }
    }

    if tunnel::uses_meek_http(&dial_params.tunnel_protocol) {
        if server_entry.disable_http_transforms {
            dial_params.http_transformer_parameters = None;
        } else if !is_replay || !replay_http_transformer_parameters {
            let is_fronted = tunnel::uses_fronted_meek(&dial_params.tunnel_protocol);
            dial_params.http_transformer_parameters = make_http_transformer_parameters(
                &config.get_parameters().get(),
                &server_entry.fronting_provider_id,
                is_fronted,
            )?;
        }
    }

    // Dial address assembly. Deterministic given the selections above.

    let dial_port_number = server_entry.dial_port_number(&dial_params.tunnel_protocol)?;
    dial_params.dial_port_number = dial_port_number.to_string();

    match dial_params.tunnel_protocol.as_str() {
        tunnel::TUNNEL_PROTOCOL_SSH
        | tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH
        | tunnel::TUNNEL_PROTOCOL_TAPDANCE_OBFUSCATED_SSH
        | tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH
        | tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH
        | tunnel::TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH => {
            dial_params.direct_dial_address =
                join_host_port(&server_entry.ip_address, dial_port_number);
        }

        tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK
        | tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH => {
            dial_params.meek_dial_address =
                join_host_port(&dial_params.meek_fronting_dial_address, dial_port_number);
            dial_params.meek_host_header = dial_params.meek_fronting_host.clone();
            if server_entry.meek_fronting_disable_sni {
                dial_params.meek_sni_server_name = String::new();
                // Without SNI there is no transformed host name on the wire.
                dial_params.meek_transformed_host_name = false;
            } else if !dial_params.meek_transformed_host_name {
                dial_params.meek_sni_server_name =
                    dial_params.meek_fronting_dial_address.clone();
            }
        }

        tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK_HTTP => {
            dial_params.meek_dial_address =
                join_host_port(&dial_params.meek_fronting_dial_address, dial_port_number);
            dial_params.meek_host_header = dial_params.meek_fronting_host.clone();
            // The fronted HTTP Host header routes the request; it cannot be
            // transformed.
            dial_params.meek_transformed_host_name = false;
        }

        tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK => {
            dial_params.meek_dial_address =
                join_host_port(&server_entry.ip_address, dial_port_number);
        }

        tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS
        | tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET => {
            dial_params.meek_dial_address =
                join_host_port(&server_entry.ip_address, dial_port_number);
            if !dial_params.meek_transformed_host_name {
                // An IP literal here is blanked below.
                dial_params.meek_sni_server_name = server_entry.ip_address.clone();
            }
        }

        other => {
            return Err(DialError::UnknownTunnelProtocol(other.to_string()));
        }
    }

    if tunnel::uses_meek(&dial_params.tunnel_protocol) {
        let host = split_host_port(&dial_params.meek_dial_address)
            .map(|(host, _)| host)
            .unwrap_or_default();

        if p.bool(names::MEEK_DIAL_DOMAINS_ONLY) && is_ip_address(&host) {
            // Not an error: the candidate just isn't usable under this
            // tactic.
            return Ok(None);
        }

        // The TLS layer omits SNI for IP literals; blank the field so
        // metrics report what actually goes on the wire.
        if is_ip_address(&dial_params.meek_sni_server_name) {
            dial_params.meek_sni_server_name = String::new();
        }
    }

    // ClientHello fragmentation is decided only once SNI is final.
    if (!is_replay || !replay_tls_fragment_client_hello) && using_tls {
        let limit_protocols =
            p.tunnel_protocols(names::TLS_FRAGMENT_CLIENT_HELLO_LIMIT_PROTOCOLS);
        if limit_protocols.is_empty()
            || pl_protocol::contains_str(&limit_protocols, &dial_params.tunnel_protocol)
        {
            let using_sni = if !dial_params.tls_ossh_sni_server_name.is_empty() {
                !is_ip_address(&dial_params.tls_ossh_sni_server_name)
            } else if !dial_params.meek_sni_server_name.is_empty() {
                !is_ip_address(&dial_params.meek_sni_server_name)
            } else {
                false
            };

            // The fragmentor needs an SNI extension to split around.
            if using_sni {
                dial_params.tls_fragment_client_hello =
                    p.weighted_coin_flip(names::TLS_FRAGMENT_CLIENT_HELLO_PROBABILITY);
            }
        }
    }

    // User-Agent and upstream proxy headers.

    if config.use_upstream_proxy() {
        // Full URL validation happens at dial time; only the scheme is
        // needed here, for metrics.
        if let Ok(proxy_url) = url::Url::parse(&config.upstream_proxy_url) {
            dial_params.upstream_proxy_type = proxy_url.scheme().to_string();
        }
    }

    let mut dial_custom_headers = make_dial_custom_headers(config, &p);

    if tunnel::uses_meek(&dial_params.tunnel_protocol)
        || dial_params.upstream_proxy_type == "http"
        || dial_params.conjure_api_registration
    {
        if !is_replay || !replay_user_agent {
            let (selected, user_agent) = select_user_agent_if_unset(&p, &dial_custom_headers);
            dial_params.selected_user_agent = selected;
            dial_params.user_agent = user_agent;
        }

        if dial_params.selected_user_agent {
            dial_custom_headers.insert(
                "User-Agent".to_string(),
                vec![dial_params.user_agent.clone()],
            );
        }
    }

    // Only header names are reported, and not a selected User-Agent's name,
    // since that selection is value-derived.
    if !config.custom_headers.is_empty() {
        dial_params.upstream_proxy_custom_header_names = dial_custom_headers
            .keys()
            .filter(|name| !(name.as_str() == "User-Agent" && dial_params.selected_user_agent))
            .cloned()
            .collect();
    }

    // Assemble the dialer configurations.

    // ResolveIP is wired unconditionally: dials without custom resolve
    // parameters fall back to resolver defaults.
    let resolve_ip: ResolveIpFn = {
        let resolver = resolver.clone();
        let resolve_parameters = dial_params.resolve_parameters.clone();
        let network_id = network_id.clone();
        Arc::new(move |hostname: String| {
            let resolver = resolver.clone();
            let resolve_parameters = resolve_parameters.clone();
            let network_id = network_id.clone();
            Box::pin(async move {
                resolver
                    .resolve_ip(&network_id, resolve_parameters.as_ref(), &hostname)
                    .await
            })
        })
    };

    let mut fragmentor_config = fragmentor::new_upstream_config(
        &p,
        &dial_params.tunnel_protocol,
        dial_params.fragmentor_seed,
    );
    if !p.bool(names::OSSH_PREFIX_ENABLE_FRAGMENTOR) && dial_params.ossh_prefix_spec.is_some() {
        fragmentor_config = None;
    }

    dial_params.meek_resolved_ip_address = ResolvedIpCell::new();

    let mut resolved_ip_callback = None;
    if tunnel::uses_meek(&dial_params.tunnel_protocol) || dial_params.conjure_api_registration {
        // Recorded asynchronously: the resolved IP isn't known until the
        // dial is underway.
        let cell = dial_params.meek_resolved_ip_address.clone();
        resolved_ip_callback = Some(Arc::new(move |ip_address: String| {
            cell.store(ip_address);
        }) as Arc<dyn Fn(String) + Send + Sync>);
    }

    dial_params.dial_config = Some(DialConfig {
        diagnostic_id: server_entry.diagnostic_id(),
        upstream_proxy_url: config.upstream_proxy_url.clone(),
        custom_headers: dial_custom_headers,
        bpf_program_instructions: dial_params.bpf_program_instructions.clone(),
        device_binder: config.device_binder.clone(),
        ipv6_synthesizer: config.ipv6_synthesizer.clone(),
        resolve_ip,
        trusted_ca_certificates_filename: config.trusted_ca_certificates_filename.clone(),
        fragmentor_config,
        upstream_proxy_error_callback,
        resolved_ip_callback,
    });

    if tunnel::uses_meek(&dial_params.tunnel_protocol) || dial_params.conjure_api_registration {
        let add_fronting_header = !dial_params.fronting_provider_id.is_empty()
            && pl_protocol::contains_str(
                &p.labeled_tunnel_protocols(
                    names::ADD_FRONTING_PROVIDER_FRONTING_HEADER,
                    &dial_params.fronting_provider_id,
                ),
                &dial_params.tunnel_protocol,
            );

        let mode = if is_tactics {
            MeekMode::ObfuscatedRoundTrip
        } else if dial_params.conjure_api_registration {
            MeekMode::PlaintextRoundTrip
        } else {
            MeekMode::Relay
        };

        dial_params.meek_config = Some(MeekConfig {
            diagnostic_id: server_entry.diagnostic_id(),
            parameters: config.get_parameters(),
            mode,
            dial_address: dial_params.meek_dial_address.clone(),
            use_quic: tunnel::uses_fronted_meek_quic(&dial_params.tunnel_protocol),
            quic_version: dial_params.quic_version.clone(),
            quic_client_hello_seed: dial_params.quic_client_hello_seed,
            quic_disable_path_mtu_discovery: dial_params.quic_disable_path_mtu_discovery,
            use_https: using_tls,
            tls_profile: dial_params.tls_profile.clone(),
            tls_fragment_client_hello: dial_params.tls_fragment_client_hello,
            legacy_passthrough: server_entry
                .protocol_uses_legacy_passthrough(&dial_params.tunnel_protocol),
            no_default_tls_session_id: dial_params.no_default_tls_session_id,
            randomized_tls_profile_seed: dial_params.randomized_tls_profile_seed,
            use_obfuscated_session_tickets: dial_params.tunnel_protocol
                == tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET,
            sni_server_name: dial_params.meek_sni_server_name.clone(),
            add_fronting_header,
            verify_server_name: dial_params.meek_verify_server_name.clone(),
            verify_pins: dial_params.meek_verify_pins.clone(),
            disable_system_root_cas: config.disable_system_root_cas,
            host_header: dial_params.meek_host_header.clone(),
            transformed_host_name: dial_params.meek_transformed_host_name,
            client_tunnel_protocol: dial_params.tunnel_protocol.clone(),
            meek_cookie_encryption_public_key: server_entry
                .meek_cookie_encryption_public_key
                .clone(),
            meek_obfuscated_key: server_entry.meek_obfuscated_key.clone(),
            meek_obfuscator_padding_seed: dial_params.meek_obfuscator_padding_seed,
            network_latency_multiplier: dial_params.network_latency_multiplier,
            http_transformer_parameters: dial_params.http_transformer_parameters.clone(),
        });
    }

    Ok(Some(dial_params))
}

impl DialParameters {
    pub fn get_dial_config(&self) -> Option<&DialConfig> {
        self.dial_config.as_ref()
    }

    pub fn get_meek_config(&self) -> Option<&MeekConfig> {
        self.meek_config.as_ref()
    }

    /// TLS-layer configuration for a TLS-OSSH dial.
    pub fn get_tls_ossh_config(&self, config: &Config) -> TlsTunnelConfig {
        TlsTunnelConfig {
            custom_tls_config: CustomTlsConfig {
                parameters: config.get_parameters(),
                dial_addr: self.direct_dial_address.clone(),
                sni_server_name: self.tls_ossh_sni_server_name.clone(),
                skip_verify: true,
                verify_server_name: String::new(),
                verify_pins: Vec::new(),
                tls_profile: self.tls_profile.clone(),
                no_default_tls_session_id: Some(self.no_default_tls_session_id),
                randomized_tls_profile_seed: self.randomized_tls_profile_seed,
                fragment_client_hello: self.tls_fragment_client_hello,
            },
            // TLS-OSSH negotiates TLS 1.3; obfuscated session tickets don't
            // apply.
            use_obfuscated_session_tickets: false,
            obfuscated_key: self
                .server_entry
                .as_ref()
                .map(|entry| entry.meek_obfuscated_key.clone())
                .unwrap_or_default(),
            obfuscator_padding_seed: self.tls_ossh_obfuscator_padding_seed,
        }
    }

    /// Network type for metrics, derived from the network ID prefix.
    ///
    /// Prefix matching, not everything-before-the-dash: platforms without
    /// network detection stub in arbitrary IDs to enable tactics.
    pub fn get_network_type(&self) -> &'static str {
        if self.network_id.starts_with("VPN") {
            "VPN"
        } else if self.network_id.starts_with("WIFI") {
            "WIFI"
        } else if self.network_id.starts_with("MOBILE") {
            "MOBILE"
        } else {
            "UNKNOWN"
        }
    }

    pub fn get_tls_version_for_metrics(&self) -> String {
        tls::tls_version_for_metrics(&self.tls_version, self.no_default_tls_session_id)
    }

    /// Persist this record for replay. A record composed with replay
    /// disabled (zero TTL) is not persisted.
    pub fn succeeded(&self, config: &Config) {
        if self.last_used_timestamp.is_none() {
            return;
        }

        let Some(server_entry) = &self.server_entry else {
            return;
        };

        notice_info(format!(
            "set dial parameters for {}",
            server_entry.diagnostic_id()
        ));
        if let Err(e) = store::set_dial_parameters(
            config.store().as_ref(),
            &server_entry.ip_address,
            &self.network_id,
            self,
        ) {
            notice_warning(format!("set dial parameters failed: {}", e));
        }
    }

    /// Handle a failed dial. A replayed record is presumed blocked or
    /// impaired and is evicted, except with a configured retain probability
    /// that absorbs transient network failures. A fresh record was never
    /// persisted, so there is nothing to evict.
    pub fn failed(&self, config: &Config) {
        if self.is_replay
            && !config
                .get_parameters()
                .get()
                .weighted_coin_flip(names::REPLAY_RETAIN_FAILED_PROBABILITY)
        {
            let Some(server_entry) = &self.server_entry else {
                return;
            };
            notice_info(format!(
                "delete dial parameters for {}",
                server_entry.diagnostic_id()
            ));
            if let Err(e) = store::delete_dial_parameters(
                config.store().as_ref(),
                &server_entry.ip_address,
                &self.network_id,
            ) {
                notice_warning(format!("delete dial parameters failed: {}", e));
            }
        }
    }
}
