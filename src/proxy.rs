use reqwest::Url;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("proxy url {raw:?} is not a valid url: {reason}")]
    InvalidUrl { raw: String, reason: String },

    #[error("proxy scheme {0:?} is not supported (expected http or https)")]
    UnsupportedScheme(String),

    #[error("proxy url has no host")]
    MissingHost,
}

/// Forward proxy applied to every upstream request, plain and TLS alike.
///
/// Built once from `PROXY_URL` at startup; credentials stay inside the url
/// and are never printed (see [`ProxySettings::redacted`]).
#[derive(Clone, PartialEq, Eq)]
pub struct ProxySettings {
    url: Url,
}

impl ProxySettings {
    pub fn parse(raw: &str) -> Result<Self, ProxyError> {
        let url = Url::parse(raw.trim()).map_err(|e| ProxyError::InvalidUrl {
            raw: mask_userinfo(raw.trim()),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ProxyError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ProxyError::MissingHost);
        }

        Ok(Self { url })
    }

    pub fn has_credentials(&self) -> bool {
        !self.url.username().is_empty()
    }

    /// The proxy url with its password masked, safe for logs and status output.
    pub fn redacted(&self) -> String {
        let mut url = self.url.clone();
        if url.password().is_none() {
            return url.to_string();
        }
        match url.set_password(Some("***")) {
            Ok(()) => url.to_string(),
            Err(()) => format!("{}://***", url.scheme()),
        }
    }

    /// A reqwest proxy covering both `http://` and `https://` targets.
    pub fn to_reqwest(&self) -> reqwest::Result<reqwest::Proxy> {
        reqwest::Proxy::all(self.url.as_str())
    }
}

/// Hides everything between `scheme://` and the last `@` of a raw url that
/// failed to parse.
fn mask_userinfo(raw: &str) -> String {
    match (raw.find("://"), raw.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end + 3 => {
            format!("{}***{}", &raw[..scheme_end + 3], &raw[at..])
        }
        _ => raw.to_string(),
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("url", &self.redacted())
            .finish()
    }
}

impl fmt::Display for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
