//! Engine error type.
//!
//! The composer distinguishes three outcomes: `Ok(Some(_))` is a usable
//! record, `Ok(None)` means "skip this candidate silently", and `Err(_)` is a
//! hard error reported upward. Storage failures never surface here; they are
//! logged and composition continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialError {
    #[error("missing resolver")]
    MissingResolver,

    #[error(transparent)]
    Prng(#[from] pl_prng::PrngError),

    #[error("required TLS profile not found")]
    RequiredTlsProfileNotFound,

    #[error("no STUN server addresses configured for transport {0}")]
    MissingStunServers(String),

    #[error("no Conjure registrar configured")]
    NoConjureRegistrar,

    #[error("TLS certificates must be verified in Conjure API registration")]
    ConjureApiRequiresVerification,

    #[error("unknown tunnel protocol: {0}")]
    UnknownTunnelProtocol(String),

    #[error(transparent)]
    ServerEntry(#[from] pl_protocol::ServerEntryError),

    #[error("fronting selection failed: {0}")]
    Fronting(#[from] pl_tactics::FrontingError),

    #[error("resolver: {0}")]
    Resolve(String),

    #[error("exchange: {0}")]
    Exchange(String),
}

pub type Result<T, E = DialError> = std::result::Result<T, E>;
