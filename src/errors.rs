use thiserror::Error;

/// Problems with the input files or `config.toml`. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(String),
    #[error("invalid proxy `{raw}`: {source}")]
    InvalidProxy {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid proxy `{0}`: missing host")]
    ProxyWithoutHost(String),
    #[error("wallet line {line}: invalid private key")]
    InvalidPrivateKey { line: usize },
    #[error("wallet line {line}: invalid solana private key ({reason})")]
    InvalidSecondaryKey { line: usize, reason: String },
}

/// Backend refusals and transport failures. Fatal to the current wallet only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No allocation or malformed response (status: {}): {message}", fmt_status(.status))]
    AllocationUnavailable { status: Option<u16>, message: String },
    #[error("Failed to bind solana address (status: {}): {message}", fmt_status(.status))]
    BindingFailed { status: Option<u16>, message: String },
    #[error(transparent)]
    Signer(#[from] alloy::signers::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |status| status.to_string())
}
