pub mod browser;
pub mod share_sheet;
pub mod youtube;
pub mod youtube_music;

use super::runner::Step;

pub use browser::BrowserUrlBar;
pub use share_sheet::ShareSheet;
pub use youtube::YouTubeShare;
pub use youtube_music::YouTubeMusicShare;

/// A named heuristic flow. Each one can be started and tested on its own.
pub trait Strategy {
    fn name(&self) -> &'static str;
    fn first_step(&self) -> Step;
}

/// Chooses the flow for the foreground app, or the message to show instead.
pub fn strategy_for(package: Option<&str>) -> Result<Box<dyn Strategy>, String> {
    let Some(package) = package.filter(|package| !package.is_empty()) else {
        return Err("Could not detect current app".to_string());
    };
    if browser::is_browser(package) {
        return Ok(Box::new(BrowserUrlBar::new(package)));
    }
    let lower = package.to_lowercase();
    if lower.contains("youtube") && lower.contains("music") {
        Ok(Box::new(YouTubeMusicShare))
    } else if lower.contains("youtube") {
        Ok(Box::new(YouTubeShare))
    } else {
        Err(format!("Unsupported app: {package}"))
    }
}
