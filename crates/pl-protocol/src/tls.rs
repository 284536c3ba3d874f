//! TLS ClientHello profile names.
//!
//! A profile mimics the handshake shape of a mainstream client. The
//! randomized profile derives cipher and extension ordering from a seed
//! carried in the dial parameters.

pub const TLS_PROFILE_CHROME_58: &str = "Chrome-58";
pub const TLS_PROFILE_CHROME_102: &str = "Chrome-102";
pub const TLS_PROFILE_CHROME_112: &str = "Chrome-112";
pub const TLS_PROFILE_FIREFOX_105: &str = "Firefox-105";
pub const TLS_PROFILE_IOS_SAFARI_16: &str = "iOS-Safari-16";
pub const TLS_PROFILE_ANDROID_6: &str = "Android-6.0";
pub const TLS_PROFILE_ANDROID_11: &str = "Android-11";
pub const TLS_PROFILE_RANDOMIZED: &str = "Randomized-v2";

pub const SUPPORTED_TLS_PROFILES: &[&str] = &[
    TLS_PROFILE_CHROME_58,
    TLS_PROFILE_CHROME_102,
    TLS_PROFILE_CHROME_112,
    TLS_PROFILE_FIREFOX_105,
    TLS_PROFILE_IOS_SAFARI_16,
    TLS_PROFILE_ANDROID_6,
    TLS_PROFILE_ANDROID_11,
    TLS_PROFILE_RANDOMIZED,
];

pub const TLS_VERSION_12: &str = "TLSv1.2";
pub const TLS_VERSION_13: &str = "TLSv1.3";

pub fn is_randomized(profile: &str) -> bool {
    profile == TLS_PROFILE_RANDOMIZED
}

/// Profiles whose TLS 1.2 handshake carries a session ticket extension that
/// can host an obfuscated ticket.
pub fn supports_obfuscated_session_tickets(profile: &str) -> bool {
    matches!(profile, TLS_PROFILE_CHROME_58 | TLS_PROFILE_ANDROID_6)
}

pub fn supports_tls13(profile: &str) -> bool {
    !matches!(profile, TLS_PROFILE_CHROME_58 | TLS_PROFILE_ANDROID_6)
}

/// Negotiated TLS version implied by the profile, for metrics.
///
/// Randomized profiles settle their version during the handshake; until then
/// the version is unknown and reported empty.
pub fn profile_version(profile: &str) -> &'static str {
    if is_randomized(profile) {
        ""
    } else if supports_tls13(profile) {
        TLS_VERSION_13
    } else {
        TLS_VERSION_12
    }
}
