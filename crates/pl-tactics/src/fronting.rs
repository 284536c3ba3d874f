//! Fronting specs: CDN entry points for API-registration style dials.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontingError {
    #[error("no fronting specs configured")]
    Empty,

    #[error("fronting address generation failed: {0}")]
    Address(#[from] pl_prng::PrngError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontingSpec {
    pub fronting_provider_id: String,
    /// Regex patterns; a dial address is generated from one of them.
    pub addresses: Vec<String>,
    /// When set, SNI is omitted entirely for this front.
    pub disable_sni: bool,
    pub verify_server_name: String,
    pub verify_pins: Vec<String>,
    pub host: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontingSpecs(pub Vec<FrontingSpec>);

/// The concrete fronting selection for one dial.
#[derive(Debug, Clone)]
pub struct SelectedFronting {
    pub fronting_provider_id: String,
    pub dial_address: String,
    /// Empty means SNI is disabled/omitted, never transformed.
    pub sni_server_name: String,
    pub verify_server_name: String,
    pub verify_pins: Vec<String>,
    pub host: String,
}

impl FrontingSpecs {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pick a spec uniformly, then generate a dial address from one of its
    /// address patterns.
    pub fn select_parameters(&self) -> Result<SelectedFronting, FrontingError> {
        if self.0.is_empty() {
            return Err(FrontingError::Empty);
        }
        let spec = &self.0[pl_prng::intn(self.0.len())];
        if spec.addresses.is_empty() {
            return Err(FrontingError::Empty);
        }

        let pattern = &spec.addresses[pl_prng::intn(spec.addresses.len())];
        let dial_address = pl_prng::regen::generate(pattern)?;

        let sni_server_name = if spec.disable_sni {
            String::new()
        } else {
            dial_address.clone()
        };

        Ok(SelectedFronting {
            fronting_provider_id: spec.fronting_provider_id.clone(),
            dial_address,
            sni_server_name,
            verify_server_name: spec.verify_server_name.clone(),
            verify_pins: spec.verify_pins.clone(),
            host: spec.host.clone(),
        })
    }
}
