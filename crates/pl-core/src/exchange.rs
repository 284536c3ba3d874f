//! Client-to-client exchanged dial parameters.
//!
//! One connected user can share their working configuration with a user who
//! cannot connect. There is no trust anchor certifying shared data, and a
//! peer's trust may be misplaced: imported values could be chosen to trace
//! the importer, or to make the importer appear to contact a banned service.
//! So only the tunnel protocol — a key connection success factor with no
//! addressing content — crosses the exchange; everything else is regenerated
//! locally. The peers may also sit on networks with different blocking
//! behavior, which is a second reason to keep exchanged values broad.

use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use pl_protocol::{tunnel, ServerEntry};
use pl_tactics::ParametersAccessor;

use crate::config::Config;
use crate::dial_parameters::DialParameters;
use crate::error::{DialError, Result};
use crate::hashes::dial_state_hashes;

/// The subset of dial parameters shared in a client-to-client exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangedDialParameters {
    pub tunnel_protocol: String,
}

impl ExchangedDialParameters {
    /// Extract the exchanged subset from a fully composed record.
    pub fn new(dial_params: &DialParameters) -> Self {
        ExchangedDialParameters {
            tunnel_protocol: dial_params.tunnel_protocol.clone(),
        }
    }

    /// Check that the exchanged values are valid and compatible with the
    /// server entry they arrived with.
    pub fn validate(&self, server_entry: &ServerEntry) -> Result<()> {
        if !pl_protocol::contains(tunnel::SUPPORTED_TUNNEL_PROTOCOLS, &self.tunnel_protocol) {
            return Err(DialError::UnknownTunnelProtocol(
                self.tunnel_protocol.clone(),
            ));
        }
        if !server_entry.supports_protocol(&self.tunnel_protocol) {
            return Err(DialError::UnknownTunnelProtocol(format!(
                "unsupported by server entry: {}",
                self.tunnel_protocol
            )));
        }
        Ok(())
    }

    /// Build a partially initialized record carrying only the exchanged
    /// values. Not usable for dialing directly: it is stored, then fully
    /// initialized by a later [`crate::make_dial_parameters`] pass.
    pub fn make_dial_parameters(
        &self,
        config: &Config,
        p: &ParametersAccessor,
        server_entry: &Arc<ServerEntry>,
    ) -> DialParameters {
        let (config_state_hash, server_entry_hash) = dial_state_hashes(config, p, server_entry);

        let mut dial_params = DialParameters::default();
        dial_params.is_exchanged = true;
        dial_params.last_used_timestamp = Some(SystemTime::now());
        dial_params.last_used_config_state_hash = config_state_hash;
        dial_params.last_used_server_entry_hash = server_entry_hash;
        dial_params.tunnel_protocol = self.tunnel_protocol.clone();
        dial_params
    }

    /// Compact wire form for the exchange payload.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| DialError::Exchange(format!("invalid payload: {}", e)))
    }
}
