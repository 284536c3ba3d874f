//! Canned plausible values: host names, user agents, SSH client versions.
//!
//! These are the fallbacks used when tactics don't supply custom generation
//! rules. Deployments replace them with remotely delivered value sets; the
//! built-ins just have to look unremarkable.

const HOST_NAME_PATTERN: &str = r"[a-z]{3,12}";

const HOST_NAME_SUFFIXES: &[&str] = &[".com", ".net", ".org", ".info"];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Mobile/15E148 Safari/604.1",
];

const SSH_CLIENT_VERSIONS: &[&str] = &[
    "SSH-2.0-OpenSSH_8.9",
    "SSH-2.0-OpenSSH_9.3",
    "SSH-2.0-OpenSSH_9.6",
];

/// A plausible host name with a random label and common TLD.
pub fn get_host_name() -> String {
    let label = pl_prng::regen::generate(HOST_NAME_PATTERN)
        .unwrap_or_else(|_| "www".to_string());
    let suffix = HOST_NAME_SUFFIXES[pl_prng::intn(HOST_NAME_SUFFIXES.len())];
    format!("{}{}", label, suffix)
}

pub fn get_user_agent() -> String {
    USER_AGENTS[pl_prng::intn(USER_AGENTS.len())].to_string()
}

pub fn get_ssh_client_version() -> String {
    SSH_CLIENT_VERSIONS[pl_prng::intn(SSH_CLIENT_VERSIONS.len())].to_string()
}
