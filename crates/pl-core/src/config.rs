//! Client configuration surface consumed by the dial engine.
//!
//! A `Config` is immutable for the duration of one composition. Hosts build
//! it once, install tactics snapshots as they arrive, and call
//! [`Config::commit_dial_parameters_hash`] after changing any dial-relevant
//! field so stored records are correctly invalidated.

use std::path::PathBuf;
use std::sync::Arc;

use md5::{Digest, Md5};

use pl_tactics::{HttpHeaders, Parameters};

use crate::platform::{DeviceBinder, Ipv6Synthesizer};
use crate::resolver::Resolver;
use crate::store::DialParametersStore;

/// Supplies the current network identifier, e.g. `WIFI-<ssid-hash>`.
/// Platforms without network detection may return a stub value.
pub trait NetworkIdGetter: Send + Sync {
    fn network_id(&self) -> String;
}

pub struct Config {
    store: Arc<dyn DialParametersStore>,
    parameters: Parameters,

    pub resolver: Option<Arc<dyn Resolver>>,
    pub network_id_getter: Option<Arc<dyn NetworkIdGetter>>,
    pub device_binder: Option<Arc<dyn DeviceBinder>>,
    pub ipv6_synthesizer: Option<Arc<dyn Ipv6Synthesizer>>,

    pub disable_replay: bool,
    pub disable_system_root_cas: bool,
    pub upstream_proxy_url: String,
    pub custom_headers: HttpHeaders,
    pub trusted_ca_certificates_filename: Option<PathBuf>,

    dial_parameters_hash: Vec<u8>,
}

impl Config {
    pub fn new(store: Arc<dyn DialParametersStore>) -> Self {
        let mut config = Config {
            store,
            parameters: Parameters::new(),
            resolver: None,
            network_id_getter: None,
            device_binder: None,
            ipv6_synthesizer: None,
            disable_replay: false,
            disable_system_root_cas: false,
            upstream_proxy_url: String::new(),
            custom_headers: HttpHeaders::new(),
            trusted_ca_certificates_filename: None,
            dial_parameters_hash: Vec::new(),
        };
        config.commit_dial_parameters_hash();
        config
    }

    /// Recompute the digest of dial-relevant config fields. Stored dial
    /// parameter records are invalidated when this digest changes; fields
    /// reflecting pure user preference (e.g. egress region) are excluded.
    pub fn commit_dial_parameters_hash(&mut self) {
        let mut hash = Md5::new();
        hash.update(self.upstream_proxy_url.as_bytes());
        hash.update([u8::from(self.disable_system_root_cas)]);

        let mut header_names: Vec<&String> = self.custom_headers.keys().collect();
        header_names.sort();
        for name in header_names {
            hash.update(name.as_bytes());
            for value in &self.custom_headers[name] {
                hash.update(value.as_bytes());
            }
        }

        self.dial_parameters_hash = hash.finalize().to_vec();
    }

    pub fn get_parameters(&self) -> Parameters {
        self.parameters.clone()
    }

    /// Install a new tactics snapshot. Compositions already holding an
    /// accessor keep reading their frozen view.
    pub fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    pub fn get_resolver(&self) -> Option<Arc<dyn Resolver>> {
        self.resolver.clone()
    }

    pub fn get_network_id(&self) -> String {
        self.network_id_getter
            .as_ref()
            .map(|getter| getter.network_id())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }

    pub fn use_upstream_proxy(&self) -> bool {
        !self.upstream_proxy_url.is_empty()
    }

    pub fn store(&self) -> &Arc<dyn DialParametersStore> {
        &self.store
    }

    pub fn dial_parameters_hash(&self) -> &[u8] {
        &self.dial_parameters_hash
    }
}
