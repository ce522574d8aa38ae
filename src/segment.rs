use serde::Serialize;
use serde_json::{Map, Value};

/// A caption cue with typed fields, as produced by sources that parse their
/// upstream format themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRecord {
    pub start: f64,
    pub duration: Option<f64>,
    pub text: String,
}

/// One segment as handed over by a [`TranscriptSource`](crate::source::TranscriptSource).
#[derive(Debug, Clone, PartialEq)]
pub enum RawSegment {
    /// Named fields; `start` and `text` are always there.
    Record(CaptionRecord),
    /// Loose key/value object, e.g. JSON relayed from another captions service.
    Keyed(Map<String, Value>),
}

/// The uniform shape returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSegment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// Single entry point for turning either raw shape into a [`NormalizedSegment`].
///
/// Missing `duration` becomes 0 for both shapes. For keyed input a missing
/// (or non-numeric) `start` becomes 0 and a missing (or non-string) `text`
/// becomes the empty string.
pub fn normalize(raw: RawSegment) -> NormalizedSegment {
    match raw {
        RawSegment::Record(record) => NormalizedSegment {
            start: record.start,
            duration: record.duration.unwrap_or(0.0),
            text: record.text,
        },
        RawSegment::Keyed(mut map) => NormalizedSegment {
            start: map.get("start").and_then(Value::as_f64).unwrap_or(0.0),
            duration: map.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
            text: match map.remove("text") {
                Some(Value::String(text)) => text,
                _ => String::new(),
            },
        },
    }
}

pub fn normalize_all(raw: Vec<RawSegment>) -> Vec<NormalizedSegment> {
    raw.into_iter().map(normalize).collect()
}

impl From<NormalizedSegment> for RawSegment {
    fn from(segment: NormalizedSegment) -> Self {
        RawSegment::Record(CaptionRecord {
            start: segment.start,
            duration: Some(segment.duration),
            text: segment.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keyed(value: Value) -> RawSegment {
        match value {
            Value::Object(map) => RawSegment::Keyed(map),
            other => panic!("expected a json object, got {other}"),
        }
    }

    #[test]
    fn test_record_without_duration_defaults_to_zero() {
        let segment = normalize(RawSegment::Record(CaptionRecord {
            start: 1.5,
            duration: None,
            text: "hello".to_string(),
        }));
        assert_eq!(
            segment,
            NormalizedSegment {
                start: 1.5,
                duration: 0.0,
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_keyed_defaults() {
        let segment = normalize(keyed(json!({})));
        assert_eq!(segment.start, 0.0);
        assert_eq!(segment.duration, 0.0);
        assert_eq!(segment.text, "");

        let segment = normalize(keyed(json!({"start": 0.0, "text": "Привет"})));
        assert_eq!(segment.duration, 0.0);
        assert_eq!(segment.text, "Привет");
    }

    #[test]
    fn test_keyed_accepts_integer_numbers() {
        let segment = normalize(keyed(json!({"start": 3, "duration": 2, "text": "x"})));
        assert_eq!(segment.start, 3.0);
        assert_eq!(segment.duration, 2.0);
    }

    #[test]
    fn test_keyed_ignores_wrongly_typed_values() {
        let segment = normalize(keyed(json!({"start": "12", "duration": null, "text": 7})));
        assert_eq!(segment.start, 0.0);
        assert_eq!(segment.duration, 0.0);
        assert_eq!(segment.text, "");
    }

    #[test]
    fn test_both_shapes_serialize_identically() {
        let from_record = normalize(RawSegment::Record(CaptionRecord {
            start: 4.2,
            duration: Some(1.25),
            text: "same".to_string(),
        }));
        let from_map = normalize(keyed(json!({"start": 4.2, "duration": 1.25, "text": "same"})));

        assert_eq!(
            serde_json::to_string(&from_record).unwrap(),
            serde_json::to_string(&from_map).unwrap()
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let first = normalize_all(vec![
            keyed(json!({"start": 0.0, "text": "a"})),
            keyed(json!({"start": 1.0, "duration": 2.5, "text": "b"})),
        ]);

        let via_record = normalize_all(first.iter().cloned().map(RawSegment::from).collect());
        let via_map = normalize_all(
            first
                .iter()
                .map(|s| keyed(serde_json::to_value(s).unwrap()))
                .collect(),
        );

        assert_eq!(via_record, first);
        assert_eq!(via_map, first);
        assert_eq!(
            serde_json::to_string(&via_record).unwrap(),
            serde_json::to_string(&via_map).unwrap()
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let texts: Vec<String> = normalize_all(vec![
            keyed(json!({"start": 5.0, "text": "late"})),
            keyed(json!({"start": 1.0, "text": "early"})),
        ])
        .into_iter()
        .map(|s| s.text)
        .collect();
        assert_eq!(texts, vec!["late", "early"]);
    }
}
