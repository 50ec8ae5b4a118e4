use std::fmt;

use url::Url;

use crate::errors::ConfigError;

const DEFAULT_SCHEME: &str = "http";

/// Canonical proxy URL: explicit scheme, no trailing slash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyEndpoint(String);

impl ProxyEndpoint {
    /// Accepts `host:port`, `host:port:user:pass`, or a URL with or without scheme.
    /// Returns `None` for an empty line.
    pub fn parse(raw: &str) -> Result<Option<Self>, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let (scheme, rest) = raw.split_once("://").unwrap_or((DEFAULT_SCHEME, raw));

        let authority = if rest.contains('@') {
            rest.to_string()
        } else {
            match rest.split(':').collect::<Vec<_>>().as_slice() {
                [host, port, user, pass] => format!("{user}:{pass}@{host}:{port}"),
                _ => rest.to_string(),
            }
        };

        let candidate = format!("{scheme}://{authority}");
        let url = Url::parse(&candidate).map_err(|source| ConfigError::InvalidProxy {
            raw: raw.to_string(),
            source,
        })?;

        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::ProxyWithoutHost(raw.to_string()));
        }

        Ok(Some(Self(url.as_str().trim_end_matches('/').to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_reqwest(&self) -> reqwest::Result<reqwest::Proxy> {
        reqwest::Proxy::all(self.as_str())
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
