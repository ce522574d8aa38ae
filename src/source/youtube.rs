use super::{check_status, ClientPool, FetchRequest, SourceError, TranscriptSource};
use crate::formatter::clean_caption_text;
use crate::segment::{CaptionRecord, RawSegment};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const API_KEY_PATTERN: &str = r#""INNERTUBE_API_KEY"\s*:\s*"([a-zA-Z0-9_-]+)""#;
const CAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<Tracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated tracks, absent for uploaded ones.
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    t_start_ms: Option<u64>,
    d_duration_ms: Option<u64>,
    segs: Option<Vec<TimedTextSeg>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Captions straight from YouTube: watch page for the innertube key, the
/// player endpoint for the track list, then the track itself as json3.
pub struct YoutubeSource {
    base_url: String,
    clients: ClientPool,
}

impl YoutubeSource {
    pub fn new(clients: ClientPool) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, clients)
    }

    pub fn with_base_url(base_url: impl Into<String>, clients: ClientPool) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            clients,
        }
    }

    async fn caption_tracks(
        &self,
        client: &Client,
        video_id: &str,
    ) -> Result<Vec<CaptionTrack>, SourceError> {
        let html = check_status(
            client
                .get(format!("{}/watch", self.base_url))
                .query(&[("v", video_id)])
                .send()
                .await?,
        )?
        .text()
        .await?;

        let api_key = extract_api_key(&html, video_id)?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });
        let player: PlayerResponse = check_status(
            client
                .post(format!("{}/youtubei/v1/player", self.base_url))
                .query(&[("key", api_key)])
                .json(&body)
                .send()
                .await?,
        )?
        .json()
        .await?;

        if let Some(playability) = player.playability_status {
            if playability.status != "OK" {
                return Err(SourceError::VideoUnavailable {
                    video_id: video_id.to_string(),
                    reason: playability.reason.unwrap_or(playability.status),
                });
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.tracklist)
            .map(|t| t.caption_tracks)
            .unwrap_or_default();
        if tracks.is_empty() {
            return Err(SourceError::TranscriptsDisabled(video_id.to_string()));
        }
        Ok(tracks)
    }

    async fn fetch_track(
        &self,
        client: &Client,
        track: &CaptionTrack,
    ) -> Result<Vec<RawSegment>, SourceError> {
        let url = json3_url(&track.base_url)?;
        let timed_text: TimedText = check_status(client.get(url).send().await?)?
            .json()
            .await?;
        Ok(timed_text.events.into_iter().filter_map(event_to_segment).collect())
    }
}

#[async_trait]
impl TranscriptSource for YoutubeSource {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawSegment>, SourceError> {
        let client = self.clients.get(request.proxy)?;
        let tracks = self.caption_tracks(client, request.video_id).await?;
        let track = select_track(&tracks, request.language).ok_or_else(|| {
            SourceError::LanguageUnavailable {
                video_id: request.video_id.to_string(),
                language: request.language.unwrap_or_default().to_string(),
                available: tracks.iter().map(|t| t.language_code.clone()).collect(),
            }
        })?;
        log::debug!(
            "Using {} track '{}' for {}",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code,
            request.video_id
        );
        self.fetch_track(client, track).await
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}

/// Pulls the innertube key out of a watch page. A captcha page means the
/// caller is being rate limited, whatever else it contains.
fn extract_api_key<'a>(html: &'a str, video_id: &str) -> Result<&'a str, SourceError> {
    if html.contains(CAPTCHA_MARKER) {
        return Err(SourceError::TooManyRequests);
    }

    let re = Regex::new(API_KEY_PATTERN)
        .map_err(|e| SourceError::Malformed(format!("api key pattern: {e}")))?;
    re.captures(html)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str())
        .ok_or_else(|| {
            SourceError::Upstream(format!("no innertube api key on watch page of {video_id}"))
        })
}

/// Manual tracks win over generated ones. Without a language the first
/// manual track is used, or the first track of any kind.
fn select_track<'a>(tracks: &'a [CaptionTrack], language: Option<&str>) -> Option<&'a CaptionTrack> {
    let matches = |t: &&CaptionTrack| language.map_or(true, |lang| t.language_code == lang);
    tracks
        .iter()
        .filter(matches)
        .find(|t| !t.is_generated())
        .or_else(|| tracks.iter().find(matches))
}

fn json3_url(base_url: &str) -> Result<Url, SourceError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| SourceError::Malformed(format!("caption track url {base_url:?}: {e}")))?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");
    Ok(url)
}

fn event_to_segment(event: TimedTextEvent) -> Option<RawSegment> {
    let raw: String = event.segs?.into_iter().map(|s| s.utf8).collect();
    let text = clean_caption_text(&raw);
    if text.is_empty() {
        return None;
    }
    Some(RawSegment::Record(CaptionRecord {
        start: event.t_start_ms.unwrap_or(0) as f64 / 1000.0,
        duration: event.d_duration_ms.map(|ms| ms as f64 / 1000.0),
        text,
    }))
}
