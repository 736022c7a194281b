//! Extraction of the playable media URL from a completed job payload.
//!
//! Providers behind the queue API disagree on where the video URL lives,
//! so the lookup is an ordered list of extractors and the first hit wins.

use serde_json::Value;

use crate::models::generation::GenerationResult;

pub const NO_VIDEO_WARNING: &str = "No video URL found in response";

/// A single lookup strategy over the payload.
pub type Extractor = fn(&Value) -> Option<String>;

/// Lookup order: `video.url`, `video`, `data.video.url`, `data.video`.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("video.url", video_url),
    ("video", video_string),
    ("data.video.url", data_video_url),
    ("data.video", data_video_string),
];

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn video_url(payload: &Value) -> Option<String> {
    string_at(payload, "/video/url")
}

pub fn video_string(payload: &Value) -> Option<String> {
    string_at(payload, "/video")
}

pub fn data_video_url(payload: &Value) -> Option<String> {
    string_at(payload, "/data/video/url")
}

pub fn data_video_string(payload: &Value) -> Option<String> {
    string_at(payload, "/data/video")
}

/// Find the video URL, trying each extractor in order.
pub fn extract_video_url(payload: &Value) -> Option<String> {
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let url = extract(payload)?;
        tracing::debug!(extractor = *name, "Resolved video URL");
        Some(url)
    })
}

/// Resolve a COMPLETED payload. A missing URL is not an error.
pub fn resolve(payload: Value) -> GenerationResult {
    let video_url = extract_video_url(&payload);
    if video_url.is_none() {
        tracing::warn!("{}", NO_VIDEO_WARNING);
    }
    GenerationResult { video_url, payload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_url_object() {
        let payload = json!({ "video": { "url": "https://x/y.mp4" } });
        assert_eq!(extract_video_url(&payload).as_deref(), Some("https://x/y.mp4"));
    }

    #[test]
    fn test_video_plain_string() {
        let payload = json!({ "video": "https://x/a.mp4" });
        assert_eq!(extract_video_url(&payload).as_deref(), Some("https://x/a.mp4"));
    }

    #[test]
    fn test_data_video_url_object() {
        let payload = json!({ "data": { "video": { "url": "https://x/b.mp4" } } });
        assert_eq!(extract_video_url(&payload).as_deref(), Some("https://x/b.mp4"));
    }

    #[test]
    fn test_data_video_string_fallback() {
        let payload = json!({ "data": { "video": "https://x/z.mp4" } });
        assert_eq!(extract_video_url(&payload).as_deref(), Some("https://x/z.mp4"));
    }

    #[test]
    fn test_top_level_wins_over_data() {
        let payload = json!({
            "video": { "url": "https://x/top.mp4" },
            "data": { "video": "https://x/nested.mp4" }
        });
        assert_eq!(extract_video_url(&payload).as_deref(), Some("https://x/top.mp4"));
    }

    #[test]
    fn test_video_object_without_url_falls_through() {
        let payload = json!({
            "video": { "content_type": "video/mp4" },
            "data": { "video": { "url": "https://x/c.mp4" } }
        });
        assert_eq!(extract_video_url(&payload).as_deref(), Some("https://x/c.mp4"));
    }

    #[test]
    fn test_missing_url_keeps_payload() {
        let payload = json!({ "images": [] });
        let result = resolve(payload.clone());
        assert!(result.video_url.is_none());
        assert_eq!(result.payload, payload);
    }
}
