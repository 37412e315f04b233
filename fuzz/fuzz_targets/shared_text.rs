#![no_main]

use libfuzzer_sys::fuzz_target;
use tunedrop::links::{SharedText, extract_link, filename_from_url, is_youtube_url};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let SharedText::Download(url) = SharedText::classify(&text) {
        assert!(is_youtube_url(&url));
    }
    if let Some(link) = extract_link(&text) {
        assert!(is_youtube_url(&link));
        let _ = filename_from_url(&link);
    }
});
