//! Derived dialer configuration structs.
//!
//! `DialConfig` and `MeekConfig` are assembled once at the end of
//! composition and handed to downstream dialers; they are never persisted.

use std::future::Future;
use std::net::IpAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;

use pl_protocol::RawInstruction;
use pl_tactics::{HttpHeaders, Parameters, TransformerParameters};

use crate::fragmentor::FragmentorConfig;
use crate::platform::{DeviceBinder, Ipv6Synthesizer};
use crate::resolver::ResolveError;

pub type ResolveIpFuture =
    Pin<Box<dyn Future<Output = Result<Vec<IpAddr>, ResolveError>> + Send>>;

/// Resolution hook handed to dialers. Invoked later, on the dialer's task;
/// dropping the returned future cancels the lookup.
pub type ResolveIpFn = Arc<dyn Fn(String) -> ResolveIpFuture + Send + Sync>;

pub type ResolvedIpCallback = Arc<dyn Fn(String) + Send + Sync>;

pub type UpstreamProxyErrorCallback = Arc<dyn Fn(&std::io::Error) + Send + Sync>;

/// Single-cell resolved-IP address, written once by the resolver callback
/// and read by metrics collection. Initialized to the empty string so a
/// valid value can always be loaded.
#[derive(Clone, Debug, Default)]
pub struct ResolvedIpCell(Arc<RwLock<String>>);

impl ResolvedIpCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, ip_address: String) {
        *self.0.write() = ip_address;
    }

    pub fn load(&self) -> String {
        self.0.read().clone()
    }
}

/// Everything a low-level dialer needs beyond the dial address itself.
#[derive(Clone)]
pub struct DialConfig {
    pub diagnostic_id: String,
    pub upstream_proxy_url: String,
    pub custom_headers: HttpHeaders,
    pub bpf_program_instructions: Vec<RawInstruction>,
    pub device_binder: Option<Arc<dyn DeviceBinder>>,
    pub ipv6_synthesizer: Option<Arc<dyn Ipv6Synthesizer>>,
    pub resolve_ip: ResolveIpFn,
    pub trusted_ca_certificates_filename: Option<PathBuf>,
    pub fragmentor_config: Option<FragmentorConfig>,
    pub upstream_proxy_error_callback: Option<UpstreamProxyErrorCallback>,
    pub resolved_ip_callback: Option<ResolvedIpCallback>,
}

/// Meek relay modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeekMode {
    /// Tunnel relay traffic over the meek connection.
    #[default]
    Relay,
    /// Obfuscated request/response round trips (tactics requests).
    ObfuscatedRoundTrip,
    /// Plain HTTPS round trips (Conjure API registration).
    PlaintextRoundTrip,
}

#[derive(Clone)]
pub struct MeekConfig {
    pub diagnostic_id: String,
    pub parameters: Parameters,
    pub mode: MeekMode,
    pub dial_address: String,
    pub use_quic: bool,
    pub quic_version: String,
    pub quic_client_hello_seed: Option<pl_prng::Seed>,
    pub quic_disable_path_mtu_discovery: bool,
    pub use_https: bool,
    pub tls_profile: String,
    pub tls_fragment_client_hello: bool,
    pub legacy_passthrough: bool,
    pub no_default_tls_session_id: bool,
    pub randomized_tls_profile_seed: Option<pl_prng::Seed>,
    pub use_obfuscated_session_tickets: bool,
    pub sni_server_name: String,
    pub add_fronting_header: bool,
    pub verify_server_name: String,
    pub verify_pins: Vec<String>,
    pub disable_system_root_cas: bool,
    pub host_header: String,
    pub transformed_host_name: bool,
    pub client_tunnel_protocol: String,
    pub meek_cookie_encryption_public_key: String,
    pub meek_obfuscated_key: String,
    pub meek_obfuscator_padding_seed: Option<pl_prng::Seed>,
    pub network_latency_multiplier: f64,
    pub http_transformer_parameters: Option<TransformerParameters>,
}

/// TLS-layer configuration for TLS-OSSH dials.
#[derive(Clone)]
pub struct CustomTlsConfig {
    pub parameters: Parameters,
    pub dial_addr: String,
    pub sni_server_name: String,
    pub skip_verify: bool,
    pub verify_server_name: String,
    pub verify_pins: Vec<String>,
    pub tls_profile: String,
    pub no_default_tls_session_id: Option<bool>,
    pub randomized_tls_profile_seed: Option<pl_prng::Seed>,
    pub fragment_client_hello: bool,
}

#[derive(Clone)]
pub struct TlsTunnelConfig {
    pub custom_tls_config: CustomTlsConfig,
    pub use_obfuscated_session_tickets: bool,
    /// Allows legacy passthrough-capable server entries to demultiplex
    /// TLS-OSSH on their meek-https port.
    pub obfuscated_key: String,
    pub obfuscator_padding_seed: Option<pl_prng::Seed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_ip_cell() {
        let cell = ResolvedIpCell::new();
        assert_eq!(cell.load(), "");

        let shared = cell.clone();
        shared.store("203.0.113.7".to_string());
        assert_eq!(cell.load(), "203.0.113.7");
    }

    #[test]
    fn test_meek_mode_default_is_relay() {
        assert_eq!(MeekMode::default(), MeekMode::Relay);
    }
}
