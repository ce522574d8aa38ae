pub mod relay;
pub mod youtube;

use crate::proxy::ProxySettings;
use crate::segment::RawSegment;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub use relay::RelaySource;
pub use youtube::YoutubeSource;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no transcript in language {language:?} for {video_id} (available: {})", .available.join(", "))]
    LanguageUnavailable {
        video_id: String,
        language: String,
        available: Vec<String>,
    },

    #[error("transcripts are disabled for {0}")]
    TranscriptsDisabled(String),

    #[error("video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("upstream is rate limiting requests (captcha page)")]
    TooManyRequests,

    #[error("request asks for proxy {0} but the source was built without it")]
    ProxyNotConfigured(String),

    #[error("proxy rejected the request (407 Proxy Authentication Required)")]
    ProxyRejected,

    #[error("upstream returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SourceError {
    /// Errors no other language could fix. These stop the fallback loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SourceError::ProxyNotConfigured(_) | SourceError::ProxyRejected
        )
    }
}

/// One fetch attempt: a video, an optional language restriction, and the
/// proxy the request must be routed through (if any).
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub video_id: &'a str,
    pub language: Option<&'a str>,
    pub proxy: Option<&'a ProxySettings>,
}

/// Something that can return caption segments for a video.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetches segments for `request.video_id`. With `language: None` the
    /// source picks whatever track it considers the default.
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawSegment>, SourceError>;

    /// Short name for logs and the status endpoint.
    fn name(&self) -> &'static str;
}

/// HTTP clients shared by the network sources: one direct, and one routed
/// through the configured proxy when there is one.
#[derive(Debug, Clone)]
pub struct ClientPool {
    direct: Client,
    proxied: Option<(ProxySettings, Client)>,
}

impl ClientPool {
    pub fn new(proxy: Option<&ProxySettings>, connect_timeout: Duration) -> Result<Self, SourceError> {
        let direct = Self::builder(connect_timeout).build()?;
        let proxied = match proxy {
            Some(settings) => {
                let client = Self::builder(connect_timeout)
                    .proxy(settings.to_reqwest()?)
                    .build()?;
                Some((settings.clone(), client))
            }
            None => None,
        };
        Ok(Self { direct, proxied })
    }

    fn builder(connect_timeout: Duration) -> reqwest::ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            // Keep routing explicit: only PROXY_URL decides, never HTTP(S)_PROXY.
            .no_proxy()
    }

    /// The client matching the requested routing.
    pub fn get(&self, proxy: Option<&ProxySettings>) -> Result<&Client, SourceError> {
        match (proxy, &self.proxied) {
            (None, _) => Ok(&self.direct),
            (Some(wanted), Some((built, client))) if wanted == built => Ok(client),
            (Some(wanted), _) => Err(SourceError::ProxyNotConfigured(wanted.redacted())),
        }
    }
}

/// Maps a response status to a [`SourceError`], letting 2xx through.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
        return Err(SourceError::ProxyRejected);
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            status,
            url: response.url().to_string(),
        });
    }
    Ok(response)
}
