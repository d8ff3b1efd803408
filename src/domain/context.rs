//! Handles threaded through a publish call: where content lives and who asked.

use std::path::{Path, PathBuf};

use url::{Host, Url};

use super::error::DomainError;

/// The running application's root path context. Only used to resolve logical
/// content directories into concrete filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    content_root: PathBuf,
}

impl HostEnvironment {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }
}

/// Connection info of the inbound caller. The outbound render call reuses the
/// same scheme and host the caller connected with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    scheme: String,
    host: String,
}

impl RequestContext {
    /// Build a context from a scheme and a `Host` header value (which may carry a port).
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Result<Self, DomainError> {
        let scheme = scheme.into().trim().to_ascii_lowercase();
        let host = host.into().trim().to_string();

        if scheme != "http" && scheme != "https" {
            return Err(DomainError::validation(format!(
                "unsupported request scheme `{scheme}`"
            )));
        }
        if !is_valid_authority(&host) {
            return Err(DomainError::validation(format!(
                "invalid request host `{host}`"
            )));
        }

        Ok(Self { scheme, host })
    }

    /// Derive a context from an absolute site URL, dropping any path or query.
    pub fn from_url(url: &Url) -> Result<Self, DomainError> {
        let host = url
            .host_str()
            .ok_or_else(|| DomainError::validation(format!("url `{url}` has no host")))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Self::new(url.scheme(), host)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Scheme plus host, as a base URL with an empty path.
    pub fn authority(&self) -> Result<Url, DomainError> {
        let candidate = format!("{}://{}/", self.scheme, self.host);
        Url::parse(&candidate)
            .map_err(|err| DomainError::validation(format!("invalid authority `{candidate}`: {err}")))
    }
}

/// A `Host` header value: a host name or IP literal with an optional port.
/// Userinfo, paths, queries and fragments are not allowed.
fn is_valid_authority(value: &str) -> bool {
    let (name, port) = if value.starts_with('[') {
        match value.find(']') {
            Some(end) => match &value[end + 1..] {
                "" => (&value[..=end], None),
                rest => match rest.strip_prefix(':') {
                    Some(port) => (&value[..=end], Some(port)),
                    None => return false,
                },
            },
            None => return false,
        }
    } else {
        match value.rsplit_once(':') {
            Some((name, port)) => (name, Some(port)),
            None => (value, None),
        }
    };

    if name.is_empty() || port.is_some_and(|port| port.parse::<u16>().is_err()) {
        return false;
    }
    Host::parse(name).is_ok()
}
