//! QUIC version names and capabilities.

pub const QUIC_VERSION_GQUIC: &str = "gQUICv39";
pub const QUIC_VERSION_OBFUSCATED: &str = "OBFUSCATED";
pub const QUIC_VERSION_V1: &str = "QUICv1";
pub const QUIC_VERSION_RANDOMIZED_V1: &str = "RANDOMIZED-QUICv1";
pub const QUIC_VERSION_OBFUSCATED_V1: &str = "OBFUSCATED-QUICv1";
pub const QUIC_VERSION_DECOY_V1: &str = "DECOY-QUICv1";

pub const SUPPORTED_QUIC_VERSIONS: &[&str] = &[
    QUIC_VERSION_GQUIC,
    QUIC_VERSION_OBFUSCATED,
    QUIC_VERSION_V1,
    QUIC_VERSION_RANDOMIZED_V1,
    QUIC_VERSION_OBFUSCATED_V1,
    QUIC_VERSION_DECOY_V1,
];

/// Versions usable against servers that only speak IETF QUIC v1.
pub const SUPPORTED_QUIC_V1_VERSIONS: &[&str] = &[
    QUIC_VERSION_V1,
    QUIC_VERSION_RANDOMIZED_V1,
    QUIC_VERSION_OBFUSCATED_V1,
    QUIC_VERSION_DECOY_V1,
];

/// Obfuscated variants wrap the QUIC payload in an additional stream cipher
/// layer; fronting providers won't pass them.
pub fn is_obfuscated(version: &str) -> bool {
    matches!(
        version,
        QUIC_VERSION_OBFUSCATED | QUIC_VERSION_OBFUSCATED_V1 | QUIC_VERSION_DECOY_V1
    )
}

pub fn has_randomized_client_hello(version: &str) -> bool {
    version == QUIC_VERSION_RANDOMIZED_V1
}

/// Path MTU discovery is only implemented for the IETF v1 stack.
pub fn uses_path_mtu_discovery(version: &str) -> bool {
    crate::contains(SUPPORTED_QUIC_V1_VERSIONS, version)
}
