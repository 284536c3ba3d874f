//! Equality digests for replay invalidation.
//!
//! MD5 here is a data checksum, never an authentication primitive: the
//! digests are only compared for equality to detect that the config dial
//! state or the server entry changed since a record was stored.

use md5::{Digest, Md5};

use pl_protocol::ServerEntry;
use pl_tactics::ParametersAccessor;

use crate::config::Config;

/// Returns `(config_state_hash, server_entry_hash)`.
///
/// The config state hash covers the config's dial-relevant fields and the
/// active tactics tag; the server entry hash covers the entry's version and
/// local import timestamp.
pub fn dial_state_hashes(
    config: &Config,
    p: &ParametersAccessor,
    server_entry: &ServerEntry,
) -> (Vec<u8>, Vec<u8>) {
    let mut hash = Md5::new();
    hash.update(config.dial_parameters_hash());
    hash.update(p.tag().as_bytes());
    let config_state_hash = hash.finalize().to_vec();

    let mut hash = Md5::new();
    hash.update(server_entry.configuration_version.to_be_bytes());
    hash.update(server_entry.local_timestamp.as_bytes());
    let server_entry_hash = hash.finalize().to_vec();

    (config_state_hash, server_entry_hash)
}
