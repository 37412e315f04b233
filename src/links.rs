use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub const FALLBACK_FILENAME: &str = "audio_file";
pub const SEARCH_PREFIX: &str = "youtube_music_search:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedText {
    Download(String),
    SearchRequest(String),
    Unsupported(String),
}

impl SharedText {
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(query) = trimmed.strip_prefix(SEARCH_PREFIX) {
            return Self::SearchRequest(query.trim().to_string());
        }
        if is_youtube_url(trimmed) {
            let url = extract_link(trimmed).unwrap_or_else(|| trimmed.to_string());
            return Self::Download(url);
        }
        Self::Unsupported(trimmed.to_string())
    }
}

pub fn is_youtube_url(text: &str) -> bool {
    text.contains("youtube.com") || text.contains("youtu.be")
}

pub fn is_youtube_watch_url(text: &str) -> bool {
    text.contains("youtube.com/watch")
}

pub fn filename_from_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return FALLBACK_FILENAME.to_string();
    };

    let path = url.path();
    if path.is_empty() || !path.contains('/') {
        return FALLBACK_FILENAME.to_string();
    }

    let last = path.rsplit('/').next().unwrap_or_default();
    if last.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        last.to_string()
    }
}

/// First http(s) token in `text` that points at YouTube.
pub fn extract_link(text: &str) -> Option<String> {
    link_pattern()
        .find_iter(text)
        .map(|found| found.as_str().trim_end_matches(['.', ',', ')', '"', '\'']))
        .find(|candidate| is_youtube_url(candidate))
        .map(str::to_string)
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s<>]+").expect("link pattern is valid"))
}
