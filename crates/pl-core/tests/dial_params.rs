//! End-to-end composition scenarios: fresh selection, replay arbitration,
//! exchange import, and lifecycle persistence.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use pl_core::dial_parameters::make_dial_parameters;
use pl_core::resolver::{ResolveError, ResolveParameters, Resolver};
use pl_core::store::MemoryStore;
use pl_core::{Config, DialParameters, ExchangedDialParameters, NetworkIdGetter};
use pl_protocol::{quic, tunnel, ServerEntry};
use pl_tactics::{names, ParametersAccessor, Parameters};

struct StubResolver;

#[async_trait]
impl Resolver for StubResolver {
    fn make_resolve_parameters(
        &self,
        _p: &ParametersAccessor,
        _fronting_provider_id: &str,
        _fronting_dial_address: &str,
    ) -> Result<ResolveParameters, ResolveError> {
        Ok(ResolveParameters {
            attempts_per_server: 2,
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        })
    }

    async fn resolve_ip(
        &self,
        _network_id: &str,
        _params: Option<&ResolveParameters>,
        _hostname: &str,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        Ok(vec!["203.0.113.1".parse().unwrap()])
    }
}

struct StaticNetworkId(&'static str);

impl NetworkIdGetter for StaticNetworkId {
    fn network_id(&self) -> String {
        self.0.to_string()
    }
}

fn test_config(store: Arc<MemoryStore>, tactics: serde_json::Value) -> Config {
    let mut config = Config::new(store);
    config.resolver = Some(Arc::new(StubResolver));
    config.network_id_getter = Some(Arc::new(StaticNetworkId("WIFI-test")));
    config.set_parameters(Parameters::from_tactics("test-tag", tactics).unwrap());
    config
}

fn ossh_entry() -> Arc<ServerEntry> {
    Arc::new(ServerEntry {
        ip_address: "192.0.2.10".to_string(),
        tag: "ossh-entry-tag".to_string(),
        configuration_version: 1,
        local_timestamp: "2025-05-01T00:00:00Z".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH.to_string()],
        ssh_obfuscated_port: 443,
        ..Default::default()
    })
}

fn fronted_meek_entry() -> Arc<ServerEntry> {
    Arc::new(ServerEntry {
        ip_address: "192.0.2.20".to_string(),
        tag: "fronted-entry-tag".to_string(),
        configuration_version: 2,
        local_timestamp: "2025-05-01T00:00:00Z".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK.to_string()],
        fronting_provider_id: "provider-1".to_string(),
        meek_server_port: 443,
        meek_fronting_addresses: vec!["front.example.com".to_string()],
        meek_fronting_hosts: vec!["origin.example.com".to_string()],
        meek_cookie_encryption_public_key: "meek-public-key".to_string(),
        meek_obfuscated_key: "meek-obfuscated-key".to_string(),
        ..Default::default()
    })
}

fn unfronted_meek_https_entry() -> Arc<ServerEntry> {
    Arc::new(ServerEntry {
        ip_address: "192.0.2.30".to_string(),
        tag: "unfronted-entry-tag".to_string(),
        configuration_version: 1,
        local_timestamp: "2025-05-01T00:00:00Z".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS.to_string()],
        meek_server_port: 443,
        ..Default::default()
    })
}

fn compose(
    config: &Config,
    entry: &Arc<ServerEntry>,
    protocol: &'static str,
) -> Result<Option<DialParameters>, pl_core::DialError> {
    make_dial_parameters(
        config,
        None,
        &|_, _| true,
        &|_| Some(protocol.to_string()),
        entry.clone(),
        false,
        0,
        0,
    )
}

// Fresh direct OSSH: prefix and seed transform are both enabled in tactics,
// and the selected prefix supersedes the transform.
#[test]
fn test_fresh_direct_ossh_with_prefix() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(
        store,
        json!({
            (names::OSSH_PREFIX_PROBABILITY): 1.0,
            (names::OSSH_PREFIX_SPECS): { "tls-preamble": [["^", "\\x16\\x03\\x01"]] },
            (names::OSSH_PREFIX_SCOPED_SPEC_NAMES): { "443": ["tls-preamble"] },
            (names::OSSH_OBFUSCATOR_SEED_TRANSFORM_PROBABILITY): 1.0,
            (names::OSSH_OBFUSCATOR_SEED_TRANSFORM_SPECS): { "xor": [["a", "b"]] },
            (names::OSSH_OBFUSCATOR_SEED_TRANSFORM_SCOPED_SPEC_NAMES): { "": ["xor"] },
        }),
    );
    let entry = ossh_entry();

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();

    assert_eq!(
        dial_params.tunnel_protocol,
        tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH
    );
    assert!(!dial_params.is_replay);
    assert_eq!(dial_params.direct_dial_address, "192.0.2.10:443");
    assert_eq!(dial_params.dial_port_number, "443");
    assert!(dial_params.ossh_prefix_spec.is_some());
    assert!(dial_params.ossh_prefix_split_config.is_some());
    assert!(dial_params
        .ossh_obfuscator_seed_transformer_parameters
        .is_none());
    assert!(dial_params.ssh_kex_seed.is_some());
    assert!(dial_params.obfuscator_padding_seed.is_some());
    assert!(dial_params.liveness_test_seed.is_some());
    assert!(dial_params.get_dial_config().is_some());
    assert!(dial_params.get_meek_config().is_none());
    assert!(dial_params.last_used_timestamp.is_some());
    assert!(dial_params.network_latency_multiplier >= 1.0);
    assert!(dial_params.network_latency_multiplier <= 3.0);
}

// Fronted meek replay hit: the stored record's selections are preserved and
// the timestamp is refreshed.
#[test]
fn test_fronted_meek_replay_hit() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = fronted_meek_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    assert!(!first.is_replay);
    first.succeeded(&config);
    assert_eq!(store.len(), 1);

    let second = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    assert!(second.is_replay);
    assert!(!second.is_exchanged);
    assert_eq!(second.tunnel_protocol, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK);
    assert_eq!(second.meek_sni_server_name, first.meek_sni_server_name);
    assert_eq!(second.meek_dial_address, first.meek_dial_address);
    assert_eq!(second.meek_host_header, "origin.example.com");
    assert_eq!(second.tls_profile, first.tls_profile);
    assert_eq!(second.ssh_kex_seed, first.ssh_kex_seed);
    assert!(second.last_used_timestamp >= first.last_used_timestamp);

    // Fronted meek resolves a domain, so resolve parameters are populated.
    assert!(second.resolve_parameters.is_some());
    assert!(second.get_meek_config().is_some());
}

// No viable QUIC version: silent skip, no error.
#[test]
fn test_quic_no_viable_version_skips() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.40".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH.to_string()],
        quic_port: 443,
        limit_quic_versions: vec!["NONEXISTENT-VERSION".to_string()],
        ..Default::default()
    });

    let result = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH).unwrap();
    assert!(result.is_none());
}

// Conjure API registration requires certificate verification.
#[test]
fn test_conjure_api_requires_root_cas() {
    let store = Arc::new(MemoryStore::new());
    let mut config = test_config(
        store,
        json!({
            (names::CONJURE_API_REGISTRAR_BIDIRECTIONAL_URL): "https://registrar.example.org/api",
            (names::CONJURE_DECOY_REGISTRAR_WIDTH): 0,
            (names::CONJURE_API_REGISTRAR_FRONTING_SPECS): [{
                "fronting_provider_id": "provider-2",
                "addresses": ["registrar-front\\.example\\.org"],
                "verify_server_name": "registrar.example.org",
                "verify_pins": [],
                "host": "registrar.example.org",
            }],
        }),
    );
    config.disable_system_root_cas = true;

    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.50".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH.to_string()],
        ssh_obfuscated_port: 443,
        ..Default::default()
    });

    let result = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH);
    assert!(matches!(
        result,
        Err(pl_core::DialError::ConjureApiRequiresVerification)
    ));
}

// Conjure decoy registration and transport selection.
#[test]
fn test_conjure_decoy_registration() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(
        store,
        json!({
            (names::CONJURE_DECOY_REGISTRAR_WIDTH): 7,
            (names::CONJURE_DECOY_REGISTRAR_MIN_DELAY): 50u64,
            (names::CONJURE_DECOY_REGISTRAR_MAX_DELAY): 50u64,
            (names::CONJURE_LIMIT_TRANSPORTS): [pl_protocol::conjure::CONJURE_TRANSPORT_MIN_OSSH],
        }),
    );
    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.51".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH.to_string()],
        ssh_obfuscated_port: 443,
        ..Default::default()
    });

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();

    assert!(!dial_params.conjure_api_registration);
    assert!(dial_params.conjure_decoy_registration);
    assert_eq!(dial_params.conjure_decoy_registrar_width, 7);
    assert!(dial_params.conjure_decoy_registrar_delay >= Duration::from_millis(50));
    assert_eq!(
        dial_params.conjure_transport,
        pl_protocol::conjure::CONJURE_TRANSPORT_MIN_OSSH
    );
    assert!(dial_params.conjure_stun_server_address.is_empty());
}

// A STUN-based Conjure transport with no configured STUN servers is a hard
// error; with servers configured, one is selected.
#[test]
fn test_conjure_stun_transport() {
    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.52".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH.to_string()],
        ssh_obfuscated_port: 443,
        ..Default::default()
    });

    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::CONJURE_LIMIT_TRANSPORTS): [pl_protocol::conjure::CONJURE_TRANSPORT_DTLS_OSSH],
        }),
    );
    let result = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH);
    assert!(matches!(
        result,
        Err(pl_core::DialError::MissingStunServers(_))
    ));

    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::CONJURE_LIMIT_TRANSPORTS): [pl_protocol::conjure::CONJURE_TRANSPORT_DTLS_OSSH],
            (names::CONJURE_STUN_SERVER_ADDRESSES): ["stun.example.org:3478"],
        }),
    );
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert_eq!(
        dial_params.conjure_stun_server_address,
        "stun.example.org:3478"
    );
}

// Exchanged record import: only the tunnel protocol carries across; the
// completed record is a fresh, non-exchanged, non-replay record.
#[test]
fn test_exchanged_record_import() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = fronted_meek_entry();

    let original = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();

    let exchanged = ExchangedDialParameters::new(&original);
    exchanged.validate(&entry).unwrap();

    let imported = exchanged.make_dial_parameters(
        &config,
        &config.get_parameters().get(),
        &entry,
    );
    assert!(imported.is_exchanged);
    pl_core::store::set_dial_parameters(
        config.store().as_ref(),
        &entry.ip_address,
        &config.get_network_id(),
        &imported,
    )
    .unwrap();

    let completed = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();

    assert!(!completed.is_exchanged);
    assert!(!completed.is_replay);
    assert_eq!(
        completed.tunnel_protocol,
        tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK
    );
    // All non-exchanged values are freshly generated.
    assert!(completed.ssh_kex_seed.is_some());
    assert_ne!(completed.ssh_kex_seed, original.ssh_kex_seed);
    assert!(!completed.meek_dial_address.is_empty());
    assert!(completed.selected_tls_profile);
}

// Failed replay: with retain probability zero, exactly one delete.
#[test]
fn test_failed_replay_deletes_record() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(
        store.clone(),
        json!({ (names::REPLAY_RETAIN_FAILED_PROBABILITY): 0.0 }),
    );
    let entry = ossh_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.succeeded(&config);

    let second = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(second.is_replay);

    let deletes_before = store.operation_counts().deletes;
    second.failed(&config);
    assert_eq!(store.operation_counts().deletes, deletes_before + 1);
    assert!(store.is_empty());
}

// A failed fresh dial evicts nothing.
#[test]
fn test_failed_fresh_dial_retains_nothing() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(
        store.clone(),
        json!({ (names::REPLAY_RETAIN_FAILED_PROBABILITY): 0.0 }),
    );
    let entry = ossh_entry();

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    let deletes_before = store.operation_counts().deletes;
    dial_params.failed(&config);
    assert_eq!(store.operation_counts().deletes, deletes_before);
}

// Replay eligibility: zero TTL disables replay and persistence.
#[test]
fn test_replay_ttl_zero() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = ossh_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.succeeded(&config);
    assert_eq!(store.len(), 1);

    let config = test_config(
        store.clone(),
        json!({ (names::REPLAY_DIAL_PARAMETERS_TTL): 0 }),
    );
    let second = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();

    assert!(!second.is_replay);
    // The stale record was deleted from the store.
    assert!(store.is_empty());
    // Zero TTL leaves the timestamp unset, so success does not persist.
    assert!(second.last_used_timestamp.is_none());
    second.succeeded(&config);
    assert!(store.is_empty());
}

// Replay eligibility: an expired record is deleted and a fresh one composed.
#[test]
fn test_replay_ttl_expired() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(
        store.clone(),
        json!({ (names::REPLAY_DIAL_PARAMETERS_TTL): 1 }),
    );
    let entry = ossh_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.succeeded(&config);

    std::thread::sleep(Duration::from_millis(20));

    let deletes_before = store.operation_counts().deletes;
    let second = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(!second.is_replay);
    assert_eq!(store.operation_counts().deletes, deletes_before + 1);
}

// Replay eligibility: a changed server entry invalidates the record.
#[test]
fn test_replay_server_entry_changed() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = ossh_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.succeeded(&config);

    let mut reimported = (*entry).clone();
    reimported.configuration_version += 1;
    let reimported = Arc::new(reimported);

    let second = compose(&config, &reimported, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(!second.is_replay);
    assert!(store.is_empty());
}

// Replay eligibility: a changed config state blocks replay unless
// ReplayIgnoreChangedConfigState is set.
#[test]
fn test_replay_config_state_changed() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = ossh_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.succeeded(&config);

    // New tactics tag: the config state hash changes.
    let mut config2 = test_config(store.clone(), json!({}));
    config2.set_parameters(Parameters::from_tactics("other-tag", json!({})).unwrap());
    let second = compose(&config2, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(!second.is_replay);
    assert!(store.is_empty());

    // Re-persist, then change the tag again with the ignore flag set.
    second.succeeded(&config2);
    let mut config3 = test_config(store.clone(), json!({}));
    config3.set_parameters(
        Parameters::from_tactics(
            "third-tag",
            json!({ (names::REPLAY_IGNORE_CHANGED_CONFIG_STATE): true }),
        )
        .unwrap(),
    );
    let third = compose(&config3, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(third.is_replay);
}

// Replay eligibility: a stored TLS profile that is no longer supported
// invalidates the record.
#[test]
fn test_replay_unsupported_tls_profile() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = unfronted_meek_https_entry();

    let mut first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS)
        .unwrap()
        .unwrap();
    first.tls_profile = "Obsolete-Profile".to_string();
    first.succeeded(&config);

    let second = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS)
        .unwrap()
        .unwrap();
    assert!(!second.is_replay);
    assert!(store.is_empty());
}

// Replay eligibility: a Conjure API record without a registrar URL was
// written by an older client generation and is reset.
#[test]
fn test_replay_legacy_conjure_url_corruption() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = ossh_entry();

    let mut first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.conjure_api_registration = true;
    first.conjure_api_registrar_bidirectional_url = String::new();
    first.succeeded(&config);

    let second = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(!second.is_replay);
    assert!(store.is_empty());
}

// Replay vetoes from the controller or config discard the record in memory
// but retain it in the store for future attempts.
#[test]
fn test_replay_vetoes_retain_record() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = ossh_entry();

    let first = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    first.succeeded(&config);

    // canReplay false.
    let second = make_dial_parameters(
        &config,
        None,
        &|_, _| false,
        &|_| Some(tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH.to_string()),
        entry.clone(),
        false,
        0,
        0,
    )
    .unwrap()
    .unwrap();
    assert!(!second.is_replay);
    assert_eq!(store.len(), 1);

    // DisableReplay.
    let mut config2 = test_config(store.clone(), json!({}));
    config2.disable_replay = true;
    let third = compose(&config2, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(!third.is_replay);
    assert_eq!(store.len(), 1);
}

// Invariant: the meek SNI field never holds an IP literal.
#[test]
fn test_sni_never_ip_literal() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(
        store,
        json!({ (names::TRANSFORM_HOST_NAME_PROBABILITY): 0.0 }),
    );
    let entry = unfronted_meek_https_entry();

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS)
        .unwrap()
        .unwrap();

    // The untransformed SNI would be the server IP; it is blanked so metrics
    // reflect what goes on the wire.
    assert_eq!(dial_params.meek_sni_server_name, "");
    assert_eq!(dial_params.meek_dial_address, "192.0.2.30:443");
    // Host header always carries a selected host name, not the IP.
    assert!(!dial_params.meek_host_header.is_empty());
    assert!(!dial_params.meek_host_header.contains("192.0.2.30"));
}

// Invariant: no QUIC fields without a QUIC protocol.
#[test]
fn test_no_quic_fields_for_non_quic_protocol() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let entry = ossh_entry();

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();

    assert_eq!(dial_params.quic_version, "");
    assert_eq!(dial_params.quic_dial_sni_address, "");
    assert!(dial_params.quic_client_hello_seed.is_none());
    assert!(dial_params.obfuscated_quic_padding_seed.is_none());
    assert!(dial_params
        .obfuscated_quic_nonce_transformer_parameters
        .is_none());
    assert!(!dial_params.quic_disable_path_mtu_discovery);
}

// Invariant: resolve parameters only when a domain will be resolved.
#[test]
fn test_resolve_parameters_only_for_domains() {
    // IP fronting address: no resolve parameters.
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let mut entry = (*fronted_meek_entry()).clone();
    entry.meek_fronting_addresses = vec!["203.0.113.50".to_string()];
    let entry = Arc::new(entry);

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    assert!(dial_params.resolve_parameters.is_none());

    // Domain fronting address: resolve parameters populated.
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let entry = fronted_meek_entry();
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    assert!(dial_params.resolve_parameters.is_some());
}

// Invariant: ClientHello fragmentation only with a real SNI host name.
#[test]
fn test_tls_fragment_requires_sni() {
    // SNI suppressed (IP literal): no fragmentation even at probability 1.
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::TRANSFORM_HOST_NAME_PROBABILITY): 0.0,
            (names::TLS_FRAGMENT_CLIENT_HELLO_PROBABILITY): 1.0,
        }),
    );
    let entry = unfronted_meek_https_entry();
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS)
        .unwrap()
        .unwrap();
    assert!(!dial_params.tls_fragment_client_hello);

    // Transformed host name SNI: fragmentation applies.
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::TRANSFORM_HOST_NAME_PROBABILITY): 1.0,
            (names::TLS_FRAGMENT_CLIENT_HELLO_PROBABILITY): 1.0,
        }),
    );
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS)
        .unwrap()
        .unwrap();
    assert!(!dial_params.meek_sni_server_name.is_empty());
    assert!(dial_params.tls_fragment_client_hello);
}

// Persist-then-load yields an identical record, modulo transient fields.
#[test]
fn test_persist_load_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store.clone(), json!({}));
    let entry = fronted_meek_entry();

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    dial_params.succeeded(&config);

    let loaded = pl_core::store::get_dial_parameters(
        config.store().as_ref(),
        &entry.ip_address,
        &config.get_network_id(),
    )
    .unwrap();

    assert_eq!(loaded.tunnel_protocol, dial_params.tunnel_protocol);
    assert_eq!(loaded.meek_sni_server_name, dial_params.meek_sni_server_name);
    assert_eq!(loaded.ssh_kex_seed, dial_params.ssh_kex_seed);
    assert_eq!(loaded.last_used_timestamp, dial_params.last_used_timestamp);
    assert_eq!(
        loaded.last_used_config_state_hash,
        dial_params.last_used_config_state_hash
    );

    // Serialization is byte-stable: encoding the loaded record reproduces
    // the stored blob.
    let blob = config
        .store()
        .get(&entry.ip_address, &config.get_network_id())
        .unwrap()
        .unwrap();
    assert_eq!(serde_json::to_vec(&loaded).unwrap(), blob);
}

// Restricted fronting providers are skipped silently.
#[test]
fn test_restricted_fronting_provider_skips() {
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::RESTRICT_FRONTING_PROVIDER_IDS): ["provider-1"],
            (names::RESTRICT_FRONTING_PROVIDER_IDS_CLIENT_PROBABILITY): 1.0,
        }),
    );
    let entry = fronted_meek_entry();
    let result = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK).unwrap();
    assert!(result.is_none());
}

// Upstream proxy compatibility gates.
#[test]
fn test_upstream_proxy_gates() {
    // QUIC cannot traverse an upstream proxy.
    let mut config = test_config(Arc::new(MemoryStore::new()), json!({}));
    config.upstream_proxy_url = "http://127.0.0.1:8080".to_string();
    config.commit_dial_parameters_hash();
    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.60".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH.to_string()],
        quic_port: 443,
        ..Default::default()
    });
    assert!(compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH)
        .unwrap()
        .is_none());

    // Easily enumerated server entry sources are withheld from the proxy.
    let mut config = test_config(Arc::new(MemoryStore::new()), json!({}));
    config.upstream_proxy_url = "http://127.0.0.1:8080".to_string();
    config.commit_dial_parameters_hash();
    let mut discovered = (*ossh_entry()).clone();
    discovered.local_source = tunnel::SERVER_ENTRY_SOURCE_DISCOVERY.to_string();
    let discovered = Arc::new(discovered);
    assert!(compose(&config, &discovered, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .is_none());

    // The allow-all tactic overrides the source restriction.
    let mut config = test_config(
        Arc::new(MemoryStore::new()),
        json!({ (names::UPSTREAM_PROXY_ALLOW_ALL_SERVER_ENTRY_SOURCES): true }),
    );
    config.upstream_proxy_url = "http://127.0.0.1:8080".to_string();
    config.commit_dial_parameters_hash();
    let dial_params = compose(&config, &discovered, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert_eq!(dial_params.upstream_proxy_type, "http");
}

// Meek dial restricted to domains skips IP-fronted candidates.
#[test]
fn test_meek_dial_domains_only() {
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({ (names::MEEK_DIAL_DOMAINS_ONLY): true }),
    );
    let mut entry = (*fronted_meek_entry()).clone();
    entry.meek_fronting_addresses = vec!["203.0.113.50".to_string()];
    let entry = Arc::new(entry);
    assert!(compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .is_none());
}

// Fronting disable-SNI forces an empty SNI and unsets the transform flag.
#[test]
fn test_fronting_disable_sni() {
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::TRANSFORM_HOST_NAME_PROBABILITY): 1.0,
            (names::TLS_FRAGMENT_CLIENT_HELLO_PROBABILITY): 1.0,
        }),
    );
    let mut entry = (*fronted_meek_entry()).clone();
    entry.meek_fronting_disable_sni = true;
    let entry = Arc::new(entry);

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    assert_eq!(dial_params.meek_sni_server_name, "");
    assert!(!dial_params.meek_transformed_host_name);
    assert!(!dial_params.tls_fragment_client_hello);
}

// Hold-off tunnel durations scale with the candidate latency multiplier.
#[test]
fn test_hold_off_tunnel() {
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::HOLD_OFF_TUNNEL_PROBABILITY): 1.0,
            (names::HOLD_OFF_TUNNEL_MIN_DURATION): 100u64,
            (names::HOLD_OFF_TUNNEL_MAX_DURATION): 100u64,
            (names::HOLD_OFF_TUNNEL_PROTOCOLS): [tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH],
        }),
    );
    let entry = ossh_entry();
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();

    // The bound reflects the 1.0..=3.0 multiplier range.
    assert!(dial_params.hold_off_tunnel_duration >= Duration::from_millis(100));
    assert!(dial_params.hold_off_tunnel_duration <= Duration::from_millis(300));
}

// User-Agent selection for meek, and header-name metrics that exclude the
// selected agent.
#[test]
fn test_user_agent_and_header_names() {
    let store = Arc::new(MemoryStore::new());
    let mut config = test_config(
        store,
        json!({ (names::PICK_USER_AGENT_PROBABILITY): 1.0 }),
    );
    config
        .custom_headers
        .insert("X-Custom".to_string(), vec!["value".to_string()]);
    config.commit_dial_parameters_hash();

    let entry = fronted_meek_entry();
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();

    assert!(dial_params.selected_user_agent);
    assert!(!dial_params.user_agent.is_empty());

    let dial_config = dial_params.get_dial_config().unwrap();
    assert_eq!(
        dial_config.custom_headers["User-Agent"],
        vec![dial_params.user_agent.clone()]
    );

    assert!(dial_params
        .upstream_proxy_custom_header_names
        .contains(&"X-Custom".to_string()));
    assert!(!dial_params
        .upstream_proxy_custom_header_names
        .contains(&"User-Agent".to_string()));
}

// The dial config's resolve hook reaches the injected resolver, and the
// resolved-IP callback lands in the record's cell.
#[tokio::test]
async fn test_dial_config_resolution_wiring() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let entry = fronted_meek_entry();

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    let dial_config = dial_params.get_dial_config().unwrap();

    let ips = (dial_config.resolve_ip)("front.example.com".to_string())
        .await
        .unwrap();
    assert_eq!(ips, vec!["203.0.113.1".parse::<IpAddr>().unwrap()]);

    assert_eq!(dial_params.meek_resolved_ip_address.load(), "");
    let callback = dial_config.resolved_ip_callback.as_ref().unwrap();
    callback("203.0.113.1".to_string());
    assert_eq!(dial_params.meek_resolved_ip_address.load(), "203.0.113.1");
}

// Network type classification for metrics.
#[test]
fn test_network_type() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let entry = ossh_entry();
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert_eq!(dial_params.get_network_type(), "WIFI");
}

// QUIC composition populates version-appropriate fields.
#[test]
fn test_quic_composition() {
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({ (names::LIMIT_QUIC_VERSIONS): [quic::QUIC_VERSION_RANDOMIZED_V1] }),
    );
    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.70".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH.to_string()],
        quic_port: 443,
        ..Default::default()
    });

    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();

    assert_eq!(dial_params.quic_version, quic::QUIC_VERSION_RANDOMIZED_V1);
    assert!(dial_params.quic_client_hello_seed.is_some());
    assert!(!dial_params.quic_dial_sni_address.is_empty());
    assert_eq!(dial_params.direct_dial_address, "192.0.2.70:443");
    // Not obfuscated QUIC: no obfuscation fields.
    assert!(dial_params.obfuscated_quic_padding_seed.is_none());
}

// Obfuscated QUIC gets a padding seed; the server entry can opt out of
// nonce transforms.
#[test]
fn test_obfuscated_quic_composition() {
    let entry = Arc::new(ServerEntry {
        ip_address: "192.0.2.71".to_string(),
        local_source: tunnel::SERVER_ENTRY_SOURCE_EMBEDDED.to_string(),
        capabilities: vec![tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH.to_string()],
        quic_port: 443,
        ..Default::default()
    });

    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::LIMIT_QUIC_VERSIONS): [quic::QUIC_VERSION_OBFUSCATED_V1],
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_PROBABILITY): 1.0,
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SPECS): { "nonce": [["a", "b"]] },
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SCOPED_SPEC_NAMES): { "": ["nonce"] },
        }),
    );
    let dial_params = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(dial_params.obfuscated_quic_padding_seed.is_some());
    assert!(dial_params
        .obfuscated_quic_nonce_transformer_parameters
        .is_some());

    let mut opted_out = (*entry).clone();
    opted_out.disable_obfuscated_quic_transforms = true;
    let opted_out = Arc::new(opted_out);
    let config = test_config(
        Arc::new(MemoryStore::new()),
        json!({
            (names::LIMIT_QUIC_VERSIONS): [quic::QUIC_VERSION_OBFUSCATED_V1],
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_PROBABILITY): 1.0,
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SPECS): { "nonce": [["a", "b"]] },
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SCOPED_SPEC_NAMES): { "": ["nonce"] },
        }),
    );
    let dial_params = compose(&config, &opted_out, tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH)
        .unwrap()
        .unwrap();
    assert!(dial_params
        .obfuscated_quic_nonce_transformer_parameters
        .is_none());
}

// Tactics meek requests use the obfuscated round trip mode.
#[test]
fn test_meek_mode_selection() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(store, json!({}));
    let entry = fronted_meek_entry();

    let tactics_dial = make_dial_parameters(
        &config,
        None,
        &|_, _| true,
        &|_| Some(tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK.to_string()),
        entry.clone(),
        true,
        0,
        0,
    )
    .unwrap()
    .unwrap();
    assert_eq!(
        tactics_dial.get_meek_config().unwrap().mode,
        pl_core::MeekMode::ObfuscatedRoundTrip
    );

    let relay_dial = compose(&config, &entry, tunnel::TUNNEL_PROTOCOL_FRONTED_MEEK)
        .unwrap()
        .unwrap();
    assert_eq!(
        relay_dial.get_meek_config().unwrap().mode,
        pl_core::MeekMode::Relay
    );
}
