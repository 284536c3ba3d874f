//! Dial parameter selection and replay engine for a censorship-circumvention
//! tunnel client.
//!
//! For each candidate server, [`make_dial_parameters`] produces a fully
//! materialized [`DialParameters`] record: the tunnel protocol plus every
//! protocol-level knob the downstream dialers need, randomized within
//! tactics constraints or replayed from a previously successful dial. The
//! record's [`DialParameters::succeeded`]/[`DialParameters::failed`]
//! lifecycle feeds the replay store.

pub mod config;
pub mod dial_config;
pub mod dial_parameters;
pub mod error;
pub mod exchange;
pub mod fragmentor;
pub mod hashes;
pub mod net;
pub mod notice;
pub mod platform;
pub mod resolver;
pub mod selectors;
pub mod store;
pub mod tls;
pub mod values;

pub use config::{Config, NetworkIdGetter};
pub use dial_config::{
    DialConfig, MeekConfig, MeekMode, ResolveIpFn, ResolvedIpCell, TlsTunnelConfig,
    UpstreamProxyErrorCallback,
};
pub use dial_parameters::{make_dial_parameters, DialParameters};
pub use error::{DialError, Result};
pub use exchange::ExchangedDialParameters;
pub use resolver::{ResolveError, ResolveParameters, Resolver};
pub use store::{DialParametersStore, MemoryStore, StoreError};
