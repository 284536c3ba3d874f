//! Resolver seam.
//!
//! The engine never resolves names itself: it derives per-dial resolve
//! parameters during composition and hands downstream dialers a closure that
//! performs the actual lookup later. Dropping the returned future cancels an
//! in-flight resolution.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pl_tactics::{ParametersAccessor, TransformerParameters};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolve failed: {0}")]
    Failed(String),
}

/// Per-dial DNS behavior, selected once during composition so that metrics
/// can report what the dial actually did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveParameters {
    pub attempts_per_server: u32,
    pub request_timeout: Duration,
    /// When non-empty, skip DNS entirely and use this address.
    pub preresolved_ip_address: String,
    pub alternate_dns_server: String,
    pub prefer_alternate_dns_server: bool,
    pub transform_parameters: Option<TransformerParameters>,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Derive resolve parameters for a dial to `fronting_dial_address`,
    /// scoped by fronting provider for preresolved-IP tactics.
    fn make_resolve_parameters(
        &self,
        p: &ParametersAccessor,
        fronting_provider_id: &str,
        fronting_dial_address: &str,
    ) -> Result<ResolveParameters, ResolveError>;

    /// Resolve `hostname` on the given network. `params` is `None` for
    /// default behavior.
    async fn resolve_ip(
        &self,
        network_id: &str,
        params: Option<&ResolveParameters>,
        hostname: &str,
    ) -> Result<Vec<IpAddr>, ResolveError>;
}
