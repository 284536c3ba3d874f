//! Platform seams the engine carries into dial configurations.
//!
//! Device binding and IPv6 synthesis are platform services injected by the
//! host application; the engine only threads them through.

use std::io;

/// Client-side socket BPF attachment is only implemented on Linux.
pub fn client_bpf_enabled() -> bool {
    cfg!(target_os = "linux")
}

/// Binds a socket to the active network device, bypassing any VPN routing.
/// Returns the device name bound to.
pub trait DeviceBinder: Send + Sync {
    fn bind_to_device(&self, socket_fd: i64) -> io::Result<String>;
}

/// Synthesizes an IPv6 address from an IPv4 address on NAT64 networks.
/// Returns `None` when no synthesis applies.
pub trait Ipv6Synthesizer: Send + Sync {
    fn ipv6_synthesize(&self, ipv4_address: &str) -> Option<String>;
}
