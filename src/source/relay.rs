use super::{check_status, ClientPool, FetchRequest, SourceError, TranscriptSource};
use crate::segment::RawSegment;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

/// Forwards lookups to another captions endpoint that speaks the same
/// `GET ?video_id=&lang=` protocol and answers with `{start, duration, text}`
/// objects. Items are handed on as keyed segments untouched.
pub struct RelaySource {
    endpoint: Url,
    clients: ClientPool,
}

impl RelaySource {
    pub fn new(endpoint: Url, clients: ClientPool) -> Self {
        Self { endpoint, clients }
    }
}

#[async_trait]
impl TranscriptSource for RelaySource {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawSegment>, SourceError> {
        let client = self.clients.get(request.proxy)?;

        let mut call = client
            .get(self.endpoint.clone())
            .query(&[("video_id", request.video_id)]);
        if let Some(language) = request.language {
            call = call.query(&[("lang", language)]);
        }

        let body: Value = check_status(call.send().await?)?.json().await?;
        segments_from_json(body)
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}

fn segments_from_json(body: Value) -> Result<Vec<RawSegment>, SourceError> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(RawSegment::Keyed(map)),
                other => Err(SourceError::Malformed(format!(
                    "expected a segment object, got {other}"
                ))),
            })
            .collect(),
        Value::Object(map) => match map.get("error") {
            Some(Value::String(message)) => Err(SourceError::Upstream(message.clone())),
            Some(other) => Err(SourceError::Upstream(other.to_string())),
            None => Err(SourceError::Malformed("expected an array of segments".to_string())),
        },
        other => Err(SourceError::Malformed(format!(
            "expected an array of segments, got {other}"
        ))),
    }
}
