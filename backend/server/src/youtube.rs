use std::sync::LazyLock;

use regex::Regex;

pub const PLACEHOLDER_THUMBNAIL: &str = "/placeholder-video.jpg";

static PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)"),
        Regex::new(r"youtube\.com/watch\?.*v=([^&\n?#]+)"),
    ]
    .map(|pattern| pattern.unwrap_or_else(|e| unreachable!("static pattern: {e}")))
});

/// Video id from a watch, short, or embed link.
pub fn video_id(url: &str) -> Option<&str> {
    PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str())
    })
}

pub fn thumbnail_url(video_id: Option<&str>) -> String {
    match video_id {
        Some(id) => format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg"),
        None => PLACEHOLDER_THUMBNAIL.to_string(),
    }
}
