use html_escape::decode_html_entities;

/// Cleans one caption cue for JSON output.
///
/// Timed text often carries HTML entities (`&amp;#39;` is double-encoded on
/// some tracks), so entities are decoded at most twice.
/// Line breaks inside a cue become single spaces.
pub fn clean_caption_text(raw: &str) -> String {
    let mut text = raw.to_string();

    for _ in 0..2 {
        let decoded = decode_html_entities(&text).into_owned();
        if decoded == text {
            break;
        }
        text = decoded;
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
