//! The closed set of tactics parameter names.
//!
//! Every value the dial engine reads from tactics is keyed by one of these
//! constants. Reading a name outside this set is a programming error caught
//! by a debug assertion in the accessor.

// Replay control.
pub const REPLAY_DIAL_PARAMETERS_TTL: &str = "ReplayDialParametersTTL";
pub const REPLAY_IGNORE_CHANGED_CONFIG_STATE: &str = "ReplayIgnoreChangedConfigState";
pub const REPLAY_RETAIN_FAILED_PROBABILITY: &str = "ReplayRetainFailedProbability";
pub const REPLAY_BPF: &str = "ReplayBPF";
pub const REPLAY_SSH: &str = "ReplaySSH";
pub const REPLAY_OBFUSCATOR_PADDING: &str = "ReplayObfuscatorPadding";
pub const REPLAY_FRAGMENTOR: &str = "ReplayFragmentor";
pub const REPLAY_TLS_PROFILE: &str = "ReplayTLSProfile";
pub const REPLAY_TLS_FRAGMENT_CLIENT_HELLO: &str = "ReplayTLSFragmentClientHello";
pub const REPLAY_FRONTING: &str = "ReplayFronting";
pub const REPLAY_HOSTNAME: &str = "ReplayHostname";
pub const REPLAY_QUIC_VERSION: &str = "ReplayQUICVersion";
pub const REPLAY_OBFUSCATED_QUIC: &str = "ReplayObfuscatedQUIC";
pub const REPLAY_OBFUSCATED_QUIC_NONCE_TRANSFORMER: &str =
    "ReplayObfuscatedQUICNonceTransformer";
pub const REPLAY_CONJURE_REGISTRATION: &str = "ReplayConjureRegistration";
pub const REPLAY_CONJURE_TRANSPORT: &str = "ReplayConjureTransport";
pub const REPLAY_LIVENESS_TEST: &str = "ReplayLivenessTest";
pub const REPLAY_USER_AGENT: &str = "ReplayUserAgent";
pub const REPLAY_API_REQUEST_PADDING: &str = "ReplayAPIRequestPadding";
pub const REPLAY_HOLD_OFF_TUNNEL: &str = "ReplayHoldOffTunnel";
pub const REPLAY_RESOLVE_PARAMETERS: &str = "ReplayResolveParameters";
pub const REPLAY_HTTP_TRANSFORMER_PARAMETERS: &str = "ReplayHTTPTransformerParameters";
pub const REPLAY_OSSH_SEED_TRANSFORMER_PARAMETERS: &str =
    "ReplayOSSHSeedTransformerParameters";
pub const REPLAY_OSSH_PREFIX: &str = "ReplayOSSHPrefix";

// Network latency multiplier.
pub const NETWORK_LATENCY_MULTIPLIER: &str = "NetworkLatencyMultiplier";
pub const NETWORK_LATENCY_MULTIPLIER_MIN: &str = "NetworkLatencyMultiplierMin";
pub const NETWORK_LATENCY_MULTIPLIER_MAX: &str = "NetworkLatencyMultiplierMax";
pub const NETWORK_LATENCY_MULTIPLIER_LAMBDA: &str = "NetworkLatencyMultiplierLambda";

// Fronting restrictions.
pub const RESTRICT_FRONTING_PROVIDER_IDS: &str = "RestrictFrontingProviderIDs";
pub const RESTRICT_FRONTING_PROVIDER_IDS_CLIENT_PROBABILITY: &str =
    "RestrictFrontingProviderIDsClientProbability";

// Upstream proxy.
pub const UPSTREAM_PROXY_ALLOW_ALL_SERVER_ENTRY_SOURCES: &str =
    "UpstreamProxyAllowAllServerEntrySources";
pub const ADDITIONAL_CUSTOM_HEADERS: &str = "AdditionalCustomHeaders";

// BPF.
pub const BPF_CLIENT_TCP_PROBABILITY: &str = "BPFClientTCPProbability";
pub const BPF_CLIENT_TCP_PROGRAM: &str = "BPFClientTCPProgram";

// Host name transforms.
pub const TRANSFORM_HOST_NAME_PROBABILITY: &str = "TransformHostNameProbability";
pub const CUSTOM_HOST_NAME_PROBABILITY: &str = "CustomHostNameProbability";
pub const CUSTOM_HOST_NAME_REGEXES: &str = "CustomHostNameRegexes";
pub const CUSTOM_HOST_NAME_LIMIT_PROTOCOLS: &str = "CustomHostNameLimitProtocols";
pub const PICK_USER_AGENT_PROBABILITY: &str = "PickUserAgentProbability";

// TLS.
pub const LIMIT_TLS_PROFILES: &str = "LimitTLSProfiles";
pub const DISABLE_FRONTING_PROVIDER_TLS_PROFILES: &str =
    "DisableFrontingProviderTLSProfiles";
pub const NO_DEFAULT_TLS_SESSION_ID_PROBABILITY: &str = "NoDefaultTLSSessionIDProbability";
pub const TLS_FRAGMENT_CLIENT_HELLO_PROBABILITY: &str = "TLSFragmentClientHelloProbability";
pub const TLS_FRAGMENT_CLIENT_HELLO_LIMIT_PROTOCOLS: &str =
    "TLSFragmentClientHelloLimitProtocols";

// QUIC.
pub const LIMIT_QUIC_VERSIONS: &str = "LimitQUICVersions";
pub const DISABLE_FRONTING_PROVIDER_QUIC_VERSIONS: &str =
    "DisableFrontingProviderQUICVersions";
pub const QUIC_DISABLE_CLIENT_PATH_MTU_DISCOVERY_PROBABILITY: &str =
    "QUICDisableClientPathMTUDiscoveryProbability";
pub const OBFUSCATED_QUIC_NONCE_TRANSFORM_PROBABILITY: &str =
    "ObfuscatedQUICNonceTransformProbability";
pub const OBFUSCATED_QUIC_NONCE_TRANSFORM_SPECS: &str = "ObfuscatedQUICNonceTransformSpecs";
pub const OBFUSCATED_QUIC_NONCE_TRANSFORM_SCOPED_SPEC_NAMES: &str =
    "ObfuscatedQUICNonceTransformScopedSpecNames";

// Conjure.
pub const CONJURE_CACHED_REGISTRATION_TTL: &str = "ConjureCachedRegistrationTTL";
pub const CONJURE_API_REGISTRAR_BIDIRECTIONAL_URL: &str =
    "ConjureAPIRegistrarBidirectionalURL";
pub const CONJURE_API_REGISTRAR_FRONTING_SPECS: &str = "ConjureAPIRegistrarFrontingSpecs";
pub const CONJURE_API_REGISTRAR_MIN_DELAY: &str = "ConjureAPIRegistrarMinDelay";
pub const CONJURE_API_REGISTRAR_MAX_DELAY: &str = "ConjureAPIRegistrarMaxDelay";
pub const CONJURE_DECOY_REGISTRAR_PROBABILITY: &str = "ConjureDecoyRegistrarProbability";
pub const CONJURE_DECOY_REGISTRAR_WIDTH: &str = "ConjureDecoyRegistrarWidth";
pub const CONJURE_DECOY_REGISTRAR_MIN_DELAY: &str = "ConjureDecoyRegistrarMinDelay";
pub const CONJURE_DECOY_REGISTRAR_MAX_DELAY: &str = "ConjureDecoyRegistrarMaxDelay";
pub const CONJURE_LIMIT_TRANSPORTS: &str = "ConjureLimitTransports";
pub const CONJURE_STUN_SERVER_ADDRESSES: &str = "ConjureSTUNServerAddresses";
pub const CONJURE_DTLS_EMPTY_INITIAL_PACKET_PROBABILITY: &str =
    "ConjureDTLSEmptyInitialPacketProbability";
pub const CONJURE_ENABLE_IPV6_DIALS: &str = "ConjureEnableIPv6Dials";
pub const CONJURE_ENABLE_PORT_RANDOMIZATION: &str = "ConjureEnablePortRandomization";
pub const CONJURE_ENABLE_REGISTRATION_OVERRIDES: &str =
    "ConjureEnableRegistrationOverrides";

// Hold-off.
pub const HOLD_OFF_TUNNEL_PROBABILITY: &str = "HoldOffTunnelProbability";
pub const HOLD_OFF_TUNNEL_MIN_DURATION: &str = "HoldOffTunnelMinDuration";
pub const HOLD_OFF_TUNNEL_MAX_DURATION: &str = "HoldOffTunnelMaxDuration";
pub const HOLD_OFF_TUNNEL_PROTOCOLS: &str = "HoldOffTunnelProtocols";
pub const HOLD_OFF_TUNNEL_FRONTING_PROVIDER_IDS: &str = "HoldOffTunnelFrontingProviderIDs";

// OSSH seed transform and prefix.
pub const OSSH_OBFUSCATOR_SEED_TRANSFORM_PROBABILITY: &str =
    "OSSHObfuscatorSeedTransformProbability";
pub const OSSH_OBFUSCATOR_SEED_TRANSFORM_SPECS: &str = "OSSHObfuscatorSeedTransformSpecs";
pub const OSSH_OBFUSCATOR_SEED_TRANSFORM_SCOPED_SPEC_NAMES: &str =
    "OSSHObfuscatorSeedTransformScopedSpecNames";
pub const OSSH_PREFIX_PROBABILITY: &str = "OSSHPrefixProbability";
pub const OSSH_PREFIX_SPECS: &str = "OSSHPrefixSpecs";
pub const OSSH_PREFIX_SCOPED_SPEC_NAMES: &str = "OSSHPrefixScopedSpecNames";
pub const OSSH_PREFIX_SPLIT_MIN_DELAY: &str = "OSSHPrefixSplitMinDelay";
pub const OSSH_PREFIX_SPLIT_MAX_DELAY: &str = "OSSHPrefixSplitMaxDelay";
pub const OSSH_PREFIX_ENABLE_FRAGMENTOR: &str = "OSSHPrefixEnableFragmentor";

// HTTP protocol transforms.
pub const FRONTED_HTTP_PROTOCOL_TRANSFORM_PROBABILITY: &str =
    "FrontedHTTPProtocolTransformProbability";
pub const FRONTED_HTTP_PROTOCOL_TRANSFORM_SPECS: &str = "FrontedHTTPProtocolTransformSpecs";
pub const FRONTED_HTTP_PROTOCOL_TRANSFORM_SCOPED_SPEC_NAMES: &str =
    "FrontedHTTPProtocolTransformScopedSpecNames";
pub const DIRECT_HTTP_PROTOCOL_TRANSFORM_PROBABILITY: &str =
    "DirectHTTPProtocolTransformProbability";
pub const DIRECT_HTTP_PROTOCOL_TRANSFORM_SPECS: &str = "DirectHTTPProtocolTransformSpecs";
pub const DIRECT_HTTP_PROTOCOL_TRANSFORM_SCOPED_SPEC_NAMES: &str =
    "DirectHTTPProtocolTransformScopedSpecNames";

// Meek.
pub const MEEK_DIAL_DOMAINS_ONLY: &str = "MeekDialDomainsOnly";
pub const ADD_FRONTING_PROVIDER_FRONTING_HEADER: &str =
    "AddFrontingProviderFrontingHeader";

// Fragmentor.
pub const FRAGMENTOR_PROBABILITY: &str = "FragmentorProbability";
pub const FRAGMENTOR_LIMIT_PROTOCOLS: &str = "FragmentorLimitProtocols";
pub const FRAGMENTOR_MIN_TOTAL_BYTES: &str = "FragmentorMinTotalBytes";
pub const FRAGMENTOR_MAX_TOTAL_BYTES: &str = "FragmentorMaxTotalBytes";
pub const FRAGMENTOR_MIN_WRITE_BYTES: &str = "FragmentorMinWriteBytes";
pub const FRAGMENTOR_MAX_WRITE_BYTES: &str = "FragmentorMaxWriteBytes";
pub const FRAGMENTOR_MIN_DELAY: &str = "FragmentorMinDelay";
pub const FRAGMENTOR_MAX_DELAY: &str = "FragmentorMaxDelay";
