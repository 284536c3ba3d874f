//! Candidate server entry.
//!
//! Only the surface the dial engine consumes is modeled here; full entry
//! validation and signature checking happen in the server entry store before
//! a candidate ever reaches the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{contains_str, quic, tunnel};

#[derive(Debug, Error)]
pub enum ServerEntryError {
    #[error("no dial port for protocol: {0}")]
    NoDialPort(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEntry {
    pub ip_address: String,
    pub tag: String,

    /// Monotonic version of this entry's contents; bumped on every import.
    pub configuration_version: u64,
    pub local_timestamp: String,
    pub local_source: String,

    /// Tunnel protocol names this server accepts.
    pub capabilities: Vec<String>,

    pub ssh_port: u16,
    pub ssh_obfuscated_port: u16,
    pub quic_port: u16,
    pub tls_ossh_port: u16,
    pub meek_server_port: u16,

    pub fronting_provider_id: String,
    pub meek_fronting_addresses: Vec<String>,
    pub meek_fronting_addresses_regex: String,
    pub meek_fronting_hosts: Vec<String>,
    /// Legacy scalar predecessor of `meek_fronting_hosts`.
    pub meek_fronting_host: String,
    pub meek_fronting_disable_sni: bool,
    pub meek_cookie_encryption_public_key: String,
    pub meek_obfuscated_key: String,

    pub limit_quic_versions: Vec<String>,
    pub legacy_passthrough: bool,

    pub disable_http_transforms: bool,
    pub disable_obfuscated_quic_transforms: bool,
    pub disable_ossh_transforms: bool,
    pub disable_ossh_prefix: bool,
}

impl ServerEntry {
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        contains_str(&self.capabilities, protocol)
    }

    /// The TCP/UDP port a dial to this server uses for the given protocol.
    pub fn dial_port_number(&self, protocol: &str) -> Result<u16, ServerEntryError> {
        let port = match protocol {
            tunnel::TUNNEL_PROTOCOL_SSH => self.ssh_port,
            tunnel::TUNNEL_PROTOCOL_OBFUSCATED_SSH
            | tunnel::TUNNEL_PROTOCOL_TAPDANCE_OBFUSCATED_SSH
            | tunnel::TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH => self.ssh_obfuscated_port,
            tunnel::TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH => self.quic_port,
            tunnel::TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH => self.tls_ossh_port,
            p if tunnel::uses_meek(p) => self.meek_server_port,
            _ => 0,
        };
        if port == 0 {
            return Err(ServerEntryError::NoDialPort(protocol.to_string()));
        }
        Ok(port)
    }

    /// True when the entry's QUIC restriction list names only IETF v1
    /// variants, so legacy gQUIC must not be offered.
    pub fn supports_only_quic_v1(&self) -> bool {
        !self.limit_quic_versions.is_empty()
            && self
                .limit_quic_versions
                .iter()
                .all(|v| crate::contains(quic::SUPPORTED_QUIC_V1_VERSIONS, v))
    }

    /// Passthrough demultiplexing predates the current scheme on some
    /// deployments; TLS-fronted protocols must mimic the legacy shape there.
    pub fn protocol_uses_legacy_passthrough(&self, protocol: &str) -> bool {
        self.legacy_passthrough
            && matches!(
                protocol,
                tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS
                    | tunnel::TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET
                    | tunnel::TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH
            )
    }

    /// Short stable identifier for notices and diagnostics; never the IP.
    pub fn diagnostic_id(&self) -> String {
        if self.tag.len() >= 8 {
            self.tag[..8].to_string()
        } else if !self.tag.is_empty() {
            self.tag.clone()
        } else {
            "(untagged)".to_string()
        }
    }
}
