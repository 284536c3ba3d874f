//! Tunnel protocol names and classification predicates.

pub const TUNNEL_PROTOCOL_SSH: &str = "SSH";
pub const TUNNEL_PROTOCOL_OBFUSCATED_SSH: &str = "OSSH";
pub const TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH: &str = "TLS-OSSH";
pub const TUNNEL_PROTOCOL_TAPDANCE_OBFUSCATED_SSH: &str = "TAPDANCE-OSSH";
pub const TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH: &str = "CONJURE-OSSH";
pub const TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH: &str = "QUIC-OSSH";
pub const TUNNEL_PROTOCOL_UNFRONTED_MEEK: &str = "UNFRONTED-MEEK";
pub const TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS: &str = "UNFRONTED-MEEK-HTTPS";
pub const TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET: &str =
    "UNFRONTED-MEEK-SESSION-TICKET";
pub const TUNNEL_PROTOCOL_FRONTED_MEEK: &str = "FRONTED-MEEK";
pub const TUNNEL_PROTOCOL_FRONTED_MEEK_HTTP: &str = "FRONTED-MEEK-HTTP";
pub const TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH: &str = "FRONTED-MEEK-QUIC-OSSH";

/// Every protocol this client can dial.
pub const SUPPORTED_TUNNEL_PROTOCOLS: &[&str] = &[
    TUNNEL_PROTOCOL_SSH,
    TUNNEL_PROTOCOL_OBFUSCATED_SSH,
    TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH,
    TUNNEL_PROTOCOL_TAPDANCE_OBFUSCATED_SSH,
    TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH,
    TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH,
    TUNNEL_PROTOCOL_UNFRONTED_MEEK,
    TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS,
    TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET,
    TUNNEL_PROTOCOL_FRONTED_MEEK,
    TUNNEL_PROTOCOL_FRONTED_MEEK_HTTP,
    TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH,
];

/// Server entry sources which may be dialed through an upstream proxy.
///
/// Sources that are relatively easy to enumerate are excluded so a malicious
/// upstream proxy cannot harvest the server pool.
pub const ALLOWED_SERVER_ENTRY_SOURCES_WITH_UPSTREAM_PROXY: &[&str] =
    &[SERVER_ENTRY_SOURCE_EMBEDDED, SERVER_ENTRY_SOURCE_REMOTE];

pub const SERVER_ENTRY_SOURCE_EMBEDDED: &str = "EMBEDDED";
pub const SERVER_ENTRY_SOURCE_REMOTE: &str = "REMOTE";
pub const SERVER_ENTRY_SOURCE_DISCOVERY: &str = "DISCOVERY";
pub const SERVER_ENTRY_SOURCE_TARGET: &str = "TARGET";
pub const SERVER_ENTRY_SOURCE_EXCHANGED: &str = "EXCHANGED";

pub fn uses_meek(protocol: &str) -> bool {
    matches!(
        protocol,
        TUNNEL_PROTOCOL_UNFRONTED_MEEK
            | TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS
            | TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET
            | TUNNEL_PROTOCOL_FRONTED_MEEK
            | TUNNEL_PROTOCOL_FRONTED_MEEK_HTTP
            | TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH
    )
}

/// Meek carried over plaintext HTTP.
pub fn uses_meek_http(protocol: &str) -> bool {
    matches!(
        protocol,
        TUNNEL_PROTOCOL_UNFRONTED_MEEK | TUNNEL_PROTOCOL_FRONTED_MEEK_HTTP
    )
}

/// Meek carried over TLS.
pub fn uses_meek_https(protocol: &str) -> bool {
    matches!(
        protocol,
        TUNNEL_PROTOCOL_UNFRONTED_MEEK_HTTPS
            | TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET
            | TUNNEL_PROTOCOL_FRONTED_MEEK
    )
}

pub fn uses_fronted_meek(protocol: &str) -> bool {
    matches!(
        protocol,
        TUNNEL_PROTOCOL_FRONTED_MEEK
            | TUNNEL_PROTOCOL_FRONTED_MEEK_HTTP
            | TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH
    )
}

pub fn uses_fronted_meek_quic(protocol: &str) -> bool {
    protocol == TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH
}

pub fn uses_quic(protocol: &str) -> bool {
    matches!(
        protocol,
        TUNNEL_PROTOCOL_QUIC_OBFUSCATED_SSH | TUNNEL_PROTOCOL_FRONTED_MEEK_QUIC_OBFUSCATED_SSH
    )
}

pub fn uses_tls_ossh(protocol: &str) -> bool {
    protocol == TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH
}

pub fn uses_conjure(protocol: &str) -> bool {
    protocol == TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH
}

/// Refraction-networking protocols hand the dial to an external station and
/// cannot be tunneled through a local upstream proxy.
pub fn uses_refraction_networking(protocol: &str) -> bool {
    matches!(
        protocol,
        TUNNEL_PROTOCOL_TAPDANCE_OBFUSCATED_SSH | TUNNEL_PROTOCOL_CONJURE_OBFUSCATED_SSH
    )
}

pub fn uses_tcp(protocol: &str) -> bool {
    !uses_quic(protocol)
}

pub fn supports_upstream_proxy(protocol: &str) -> bool {
    !uses_quic(protocol) && !uses_refraction_networking(protocol)
}

/// Obfuscated session tickets only exist in the TLS 1.2 handshake.
pub fn requires_tls12_session_tickets(protocol: &str) -> bool {
    protocol == TUNNEL_PROTOCOL_UNFRONTED_MEEK_SESSION_TICKET
}

pub fn requires_tls13_support(protocol: &str) -> bool {
    protocol == TUNNEL_PROTOCOL_TLS_OBFUSCATED_SSH
}

pub fn allow_server_entry_source_with_upstream_proxy(source: &str) -> bool {
    crate::contains(ALLOWED_SERVER_ENTRY_SOURCES_WITH_UPSTREAM_PROXY, source)
}
