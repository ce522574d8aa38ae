use crate::proxy::ProxySettings;
use crate::segment::{normalize_all, NormalizedSegment};
use crate::source::{FetchRequest, SourceError, TranscriptSource};
use std::sync::Arc;

/// Languages probed after the caller's preferred one, in this order.
pub const FALLBACK_LANGUAGES: [&str; 5] = ["en", "ru", "es", "fr", "de"];

/// `[preferred, en, ru, es, fr, de]`. A preferred language that is also a
/// fallback shows up twice.
pub fn candidate_languages(preferred: &str) -> Vec<&str> {
    std::iter::once(preferred)
        .chain(FALLBACK_LANGUAGES)
        .collect()
}

/// Finds a transcript by walking the language candidates, then asking for
/// the source's default track.
pub struct TranscriptResolver {
    source: Arc<dyn TranscriptSource>,
    proxy: Option<ProxySettings>,
}

impl TranscriptResolver {
    pub fn new(source: Arc<dyn TranscriptSource>, proxy: Option<ProxySettings>) -> Self {
        Self { source, proxy }
    }

    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Returns the first non-empty transcript found, or an empty list when
    /// nothing is available at all. Only fatal source errors are returned
    /// as `Err`; every other failure moves on to the next candidate.
    pub async fn resolve(
        &self,
        video_id: &str,
        preferred_language: &str,
    ) -> Result<Vec<NormalizedSegment>, SourceError> {
        for language in candidate_languages(preferred_language) {
            log::info!("Trying transcript for {} in '{}'", video_id, language);
            if let Some(segments) = self.probe(video_id, Some(language)).await? {
                log::info!(
                    "Found transcript for {} in '{}': {} segments",
                    video_id,
                    language,
                    segments.len()
                );
                return Ok(segments);
            }
        }

        log::info!("Trying any available transcript for {}", video_id);
        if let Some(segments) = self.probe(video_id, None).await? {
            log::info!(
                "Found transcript for {} (source default): {} segments",
                video_id,
                segments.len()
            );
            return Ok(segments);
        }

        log::info!("No transcript found for {} in any language", video_id);
        Ok(Vec::new())
    }

    /// One fetch. `Ok(None)` means "nothing here, keep looking".
    async fn probe(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> Result<Option<Vec<NormalizedSegment>>, SourceError> {
        let request = FetchRequest {
            video_id,
            language,
            proxy: self.proxy.as_ref(),
        };
        let label = language.unwrap_or("<default>");

        match self.source.fetch(&request).await {
            Ok(segments) if segments.is_empty() => {
                log::warn!("Empty transcript for {} in '{}'", video_id, label);
                Ok(None)
            }
            Ok(segments) => Ok(Some(normalize_all(segments))),
            Err(e) if e.is_fatal() => {
                log::error!("Giving up on {} at '{}': {}", video_id, label, e);
                Err(e)
            }
            Err(e) => {
                log::warn!("Not found for {} in '{}': {}", video_id, label, e);
                Ok(None)
            }
        }
    }
}
