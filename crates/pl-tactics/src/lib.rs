//! Tactics: the remotely delivered parameter bundle steering dial behavior.
//!
//! A [`Parameters`] value holds one immutable overlay of remote tactics on
//! top of built-in defaults. [`Parameters::get`] produces a frozen
//! [`ParametersAccessor`] snapshot for the duration of one composition;
//! [`Parameters::get_custom`] produces a second view in which every
//! duration-typed read is scaled by a per-candidate network latency
//! multiplier. Snapshots are `Arc`-shared and never mutated, so accessors
//! taken before a tactics update keep reading the values they started with.

#![recursion_limit = "512"]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub mod fronting;
pub mod names;
pub mod transforms;

pub use fronting::{FrontingError, FrontingSpec, FrontingSpecs, SelectedFronting};
pub use transforms::{
    ScopedSpecNames, TransformSpec, TransformSpecs, TransformerParameters, SCOPE_ANY,
};

use pl_protocol::RawInstruction;

/// HTTP header multimap, canonical header names as keys.
pub type HttpHeaders = HashMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum TacticsError {
    #[error("tactics payload must be a JSON object")]
    InvalidPayload,
}

#[derive(Debug, Deserialize)]
struct BpfProgramValue {
    #[serde(default)]
    name: String,
    #[serde(default)]
    instructions: Vec<RawInstruction>,
}

struct Snapshot {
    values: Map<String, Value>,
    tag: String,
}

/// Handle to the current tactics state. Cheap to clone; immutable.
#[derive(Clone)]
pub struct Parameters {
    snapshot: Arc<Snapshot>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameters {
    /// Built-in defaults only; the empty tag marks "no tactics applied".
    pub fn new() -> Self {
        Parameters {
            snapshot: Arc::new(Snapshot {
                values: Map::new(),
                tag: String::new(),
            }),
        }
    }

    /// Overlay a remote tactics payload. `tag` identifies the payload
    /// version and feeds the config state hash.
    pub fn from_tactics(
        tag: impl Into<String>,
        payload: Value,
    ) -> Result<Self, TacticsError> {
        let values = match payload {
            Value::Object(map) => map,
            _ => return Err(TacticsError::InvalidPayload),
        };
        Ok(Parameters {
            snapshot: Arc::new(Snapshot {
                values,
                tag: tag.into(),
            }),
        })
    }

    /// Frozen view for one composition.
    pub fn get(&self) -> ParametersAccessor {
        ParametersAccessor {
            snapshot: self.snapshot.clone(),
            latency_multiplier: self.singleton_latency_multiplier(),
        }
    }

    /// Frozen view scaling every duration read by `latency_multiplier`.
    ///
    /// A non-positive multiplier falls back to the singleton
    /// `NetworkLatencyMultiplier` tactics value, matching records persisted
    /// before per-candidate multipliers existed.
    pub fn get_custom(&self, latency_multiplier: f64) -> ParametersAccessor {
        let multiplier = if latency_multiplier > 0.0 {
            latency_multiplier
        } else {
            self.singleton_latency_multiplier()
        };
        ParametersAccessor {
            snapshot: self.snapshot.clone(),
            latency_multiplier: multiplier,
        }
    }

    fn singleton_latency_multiplier(&self) -> f64 {
        let accessor = ParametersAccessor {
            snapshot: self.snapshot.clone(),
            latency_multiplier: 1.0,
        };
        let value = accessor.float(names::NETWORK_LATENCY_MULTIPLIER);
        if value > 0.0 {
            value
        } else {
            1.0
        }
    }
}

/// Immutable snapshot of tactics values with typed getters.
///
/// Missing or ill-typed remote values fall back to the built-in default for
/// the name; reading a name outside [`names`] is a programming error.
#[derive(Clone)]
pub struct ParametersAccessor {
    snapshot: Arc<Snapshot>,
    latency_multiplier: f64,
}

impl ParametersAccessor {
    fn lookup<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        if let Some(value) = self.snapshot.values.get(name) {
            match serde_json::from_value(value.clone()) {
                Ok(typed) => return Some(typed),
                Err(_) => {
                    tracing::warn!(parameter = name, "ill-typed tactics value, using default");
                }
            }
        }
        let default = defaults().get(name);
        debug_assert!(default.is_some(), "unknown tactics parameter: {}", name);
        default.and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Tag of the applied tactics payload; empty when running on defaults.
    pub fn tag(&self) -> String {
        self.snapshot.tag.clone()
    }

    pub fn latency_multiplier(&self) -> f64 {
        self.latency_multiplier
    }

    pub fn bool(&self, name: &str) -> bool {
        self.lookup(name).unwrap_or(false)
    }

    pub fn int(&self, name: &str) -> i64 {
        self.lookup(name).unwrap_or(0)
    }

    pub fn float(&self, name: &str) -> f64 {
        self.lookup(name).unwrap_or(0.0)
    }

    pub fn string(&self, name: &str) -> String {
        self.lookup(name).unwrap_or_default()
    }

    pub fn strings(&self, name: &str) -> Vec<String> {
        self.lookup(name).unwrap_or_default()
    }

    /// Duration parameters are stored as integer milliseconds and scaled by
    /// this accessor's latency multiplier.
    pub fn duration(&self, name: &str) -> Duration {
        let millis: u64 = self.lookup(name).unwrap_or(0);
        Duration::from_millis(millis).mul_f64(self.latency_multiplier)
    }

    pub fn weighted_coin_flip(&self, name: &str) -> bool {
        pl_prng::weighted_coin_flip(self.float(name))
    }

    pub fn tunnel_protocols(&self, name: &str) -> Vec<String> {
        self.strings(name)
    }

    pub fn quic_versions(&self, name: &str) -> Vec<String> {
        self.strings(name)
    }

    pub fn conjure_transports(&self, name: &str) -> Vec<String> {
        self.strings(name)
    }

    pub fn regex_strings(&self, name: &str) -> Vec<String> {
        self.strings(name)
    }

    /// Entry for `label` in a labeled string-list parameter.
    pub fn labeled_strings(&self, name: &str, label: &str) -> Vec<String> {
        let table: HashMap<String, Vec<String>> = self.lookup(name).unwrap_or_default();
        table.get(label).cloned().unwrap_or_default()
    }

    pub fn labeled_quic_versions(&self, name: &str, label: &str) -> Vec<String> {
        self.labeled_strings(name, label)
    }

    pub fn labeled_tunnel_protocols(&self, name: &str, label: &str) -> Vec<String> {
        self.labeled_strings(name, label)
    }

    pub fn http_headers(&self, name: &str) -> HttpHeaders {
        self.lookup(name).unwrap_or_default()
    }

    pub fn protocol_transform_specs(&self, name: &str) -> TransformSpecs {
        self.lookup(name).unwrap_or_default()
    }

    pub fn protocol_transform_scoped_spec_names(&self, name: &str) -> ScopedSpecNames {
        self.lookup(name).unwrap_or_default()
    }

    pub fn fronting_specs(&self, name: &str) -> FrontingSpecs {
        self.lookup(name).unwrap_or_default()
    }

    /// BPF program from tactics; `None` when no program is configured.
    pub fn bpf_program(&self, name: &str) -> Option<(String, Vec<RawInstruction>)> {
        let program: BpfProgramValue = self.lookup(name)?;
        if program.name.is_empty() || program.instructions.is_empty() {
            return None;
        }
        Some((program.name, program.instructions))
    }
}

fn defaults() -> &'static Map<String, Value> {
    static DEFAULTS: Lazy<Map<String, Value>> = Lazy::new(|| {
        let Value::Object(map) = json!({
            (names::REPLAY_DIAL_PARAMETERS_TTL): 86_400_000u64,
            (names::REPLAY_IGNORE_CHANGED_CONFIG_STATE): false,
            (names::REPLAY_RETAIN_FAILED_PROBABILITY): 0.5,
            (names::REPLAY_BPF): true,
            (names::REPLAY_SSH): true,
            (names::REPLAY_OBFUSCATOR_PADDING): true,
            (names::REPLAY_FRAGMENTOR): true,
            (names::REPLAY_TLS_PROFILE): true,
            (names::REPLAY_TLS_FRAGMENT_CLIENT_HELLO): true,
            (names::REPLAY_FRONTING): true,
            (names::REPLAY_HOSTNAME): true,
            (names::REPLAY_QUIC_VERSION): true,
            (names::REPLAY_OBFUSCATED_QUIC): true,
            (names::REPLAY_OBFUSCATED_QUIC_NONCE_TRANSFORMER): true,
            (names::REPLAY_CONJURE_REGISTRATION): true,
            (names::REPLAY_CONJURE_TRANSPORT): true,
            (names::REPLAY_LIVENESS_TEST): true,
            (names::REPLAY_USER_AGENT): true,
            (names::REPLAY_API_REQUEST_PADDING): true,
            (names::REPLAY_HOLD_OFF_TUNNEL): true,
            (names::REPLAY_RESOLVE_PARAMETERS): true,
            (names::REPLAY_HTTP_TRANSFORMER_PARAMETERS): true,
            (names::REPLAY_OSSH_SEED_TRANSFORMER_PARAMETERS): true,
            (names::REPLAY_OSSH_PREFIX): true,

            (names::NETWORK_LATENCY_MULTIPLIER): 1.0,
            (names::NETWORK_LATENCY_MULTIPLIER_MIN): 1.0,
            (names::NETWORK_LATENCY_MULTIPLIER_MAX): 3.0,
            (names::NETWORK_LATENCY_MULTIPLIER_LAMBDA): 2.0,

            (names::RESTRICT_FRONTING_PROVIDER_IDS): [],
            (names::RESTRICT_FRONTING_PROVIDER_IDS_CLIENT_PROBABILITY): 0.0,

            (names::UPSTREAM_PROXY_ALLOW_ALL_SERVER_ENTRY_SOURCES): false,
            (names::ADDITIONAL_CUSTOM_HEADERS): {},

            (names::BPF_CLIENT_TCP_PROBABILITY): 0.5,
            (names::BPF_CLIENT_TCP_PROGRAM): {"name": "", "instructions": []},

            (names::TRANSFORM_HOST_NAME_PROBABILITY): 0.5,
            (names::CUSTOM_HOST_NAME_PROBABILITY): 0.0,
            (names::CUSTOM_HOST_NAME_REGEXES): [],
            (names::CUSTOM_HOST_NAME_LIMIT_PROTOCOLS): [],
            (names::PICK_USER_AGENT_PROBABILITY): 0.5,

            (names::LIMIT_TLS_PROFILES): [],
            (names::DISABLE_FRONTING_PROVIDER_TLS_PROFILES): {},
            (names::NO_DEFAULT_TLS_SESSION_ID_PROBABILITY): 0.5,
            (names::TLS_FRAGMENT_CLIENT_HELLO_PROBABILITY): 0.0,
            (names::TLS_FRAGMENT_CLIENT_HELLO_LIMIT_PROTOCOLS): [],

            (names::LIMIT_QUIC_VERSIONS): [],
            (names::DISABLE_FRONTING_PROVIDER_QUIC_VERSIONS): {},
            (names::QUIC_DISABLE_CLIENT_PATH_MTU_DISCOVERY_PROBABILITY): 0.0,
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_PROBABILITY): 0.0,
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SPECS): {},
            (names::OBFUSCATED_QUIC_NONCE_TRANSFORM_SCOPED_SPEC_NAMES): {},

            (names::CONJURE_CACHED_REGISTRATION_TTL): 0u64,
            (names::CONJURE_API_REGISTRAR_BIDIRECTIONAL_URL): "",
            (names::CONJURE_API_REGISTRAR_FRONTING_SPECS): [],
            (names::CONJURE_API_REGISTRAR_MIN_DELAY): 0u64,
            (names::CONJURE_API_REGISTRAR_MAX_DELAY): 10_000u64,
            (names::CONJURE_DECOY_REGISTRAR_PROBABILITY): 0.5,
            (names::CONJURE_DECOY_REGISTRAR_WIDTH): 5,
            (names::CONJURE_DECOY_REGISTRAR_MIN_DELAY): 0u64,
            (names::CONJURE_DECOY_REGISTRAR_MAX_DELAY): 10_000u64,
            (names::CONJURE_LIMIT_TRANSPORTS): [],
            (names::CONJURE_STUN_SERVER_ADDRESSES): [],
            (names::CONJURE_DTLS_EMPTY_INITIAL_PACKET_PROBABILITY): 0.5,
            (names::CONJURE_ENABLE_IPV6_DIALS): true,
            (names::CONJURE_ENABLE_PORT_RANDOMIZATION): true,
            (names::CONJURE_ENABLE_REGISTRATION_OVERRIDES): false,

            (names::HOLD_OFF_TUNNEL_PROBABILITY): 0.0,
            (names::HOLD_OFF_TUNNEL_MIN_DURATION): 0u64,
            (names::HOLD_OFF_TUNNEL_MAX_DURATION): 0u64,
            (names::HOLD_OFF_TUNNEL_PROTOCOLS): [],
            (names::HOLD_OFF_TUNNEL_FRONTING_PROVIDER_IDS): [],

            (names::OSSH_OBFUSCATOR_SEED_TRANSFORM_PROBABILITY): 0.0,
            (names::OSSH_OBFUSCATOR_SEED_TRANSFORM_SPECS): {},
            (names::OSSH_OBFUSCATOR_SEED_TRANSFORM_SCOPED_SPEC_NAMES): {},
            (names::OSSH_PREFIX_PROBABILITY): 0.0,
            (names::OSSH_PREFIX_SPECS): {},
            (names::OSSH_PREFIX_SCOPED_SPEC_NAMES): {},
            (names::OSSH_PREFIX_SPLIT_MIN_DELAY): 0u64,
            (names::OSSH_PREFIX_SPLIT_MAX_DELAY): 0u64,
            (names::OSSH_PREFIX_ENABLE_FRAGMENTOR): false,

            (names::FRONTED_HTTP_PROTOCOL_TRANSFORM_PROBABILITY): 0.0,
            (names::FRONTED_HTTP_PROTOCOL_TRANSFORM_SPECS): {},
            (names::FRONTED_HTTP_PROTOCOL_TRANSFORM_SCOPED_SPEC_NAMES): {},
            (names::DIRECT_HTTP_PROTOCOL_TRANSFORM_PROBABILITY): 0.0,
            (names::DIRECT_HTTP_PROTOCOL_TRANSFORM_SPECS): {},
            (names::DIRECT_HTTP_PROTOCOL_TRANSFORM_SCOPED_SPEC_NAMES): {},

            (names::MEEK_DIAL_DOMAINS_ONLY): false,
            (names::ADD_FRONTING_PROVIDER_FRONTING_HEADER): {},

            (names::FRAGMENTOR_PROBABILITY): 0.0,
            (names::FRAGMENTOR_LIMIT_PROTOCOLS): [],
            (names::FRAGMENTOR_MIN_TOTAL_BYTES): 0,
            (names::FRAGMENTOR_MAX_TOTAL_BYTES): 0,
            (names::FRAGMENTOR_MIN_WRITE_BYTES): 1,
            (names::FRAGMENTOR_MAX_WRITE_BYTES): 1500,
            (names::FRAGMENTOR_MIN_DELAY): 0u64,
            (names::FRAGMENTOR_MAX_DELAY): 0u64,
        }) else {
            unreachable!("defaults literal is an object")
        };
        map
    });
    &DEFAULTS
}
