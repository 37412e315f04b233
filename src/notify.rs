use notify_rust::{Notification, Timeout};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

pub const DOWNLOAD_ONGOING_ID: u32 = 101;
pub const DOWNLOAD_COMPLETED_ID: u32 = 102;
pub const DOWNLOAD_FAILED_ID: u32 = 103;
pub const OVERLAY_ID: u32 = 9999;
pub const PLAYBACK_ID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeChannel {
    Downloads,
    Overlay,
    Playback,
}

impl NoticeChannel {
    pub fn id(self) -> &'static str {
        match self {
            Self::Downloads => "download_channel",
            Self::Overlay => "floating_button_channel",
            Self::Playback => "music_channel",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Downloads => "Download Notifications",
            Self::Overlay => "Floating Button",
            Self::Playback => "Music Playback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    DownloadStarted { filename: String },
    DownloadProgress { percent: u8 },
    ConversionStarted,
    DownloadCompleted { filename: String, path: PathBuf },
    DownloadFailed { reason: String },
    OverlayActive,
    PlaybackActive { title: String },
    PlaybackCleared,
}

impl Notice {
    pub fn channel(&self) -> NoticeChannel {
        match self {
            Self::OverlayActive => NoticeChannel::Overlay,
            Self::PlaybackActive { .. } | Self::PlaybackCleared => NoticeChannel::Playback,
            _ => NoticeChannel::Downloads,
        }
    }

    /// Notices sharing an id replace each other.
    pub fn id(&self) -> u32 {
        match self {
            Self::DownloadStarted { .. } | Self::DownloadProgress { .. } | Self::ConversionStarted => {
                DOWNLOAD_ONGOING_ID
            }
            Self::DownloadCompleted { .. } => DOWNLOAD_COMPLETED_ID,
            Self::DownloadFailed { .. } => DOWNLOAD_FAILED_ID,
            Self::OverlayActive => OVERLAY_ID,
            Self::PlaybackActive { .. } | Self::PlaybackCleared => PLAYBACK_ID,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::DownloadStarted { .. } => "Download Started".to_string(),
            Self::DownloadProgress { .. } => "Downloading Audio...".to_string(),
            Self::ConversionStarted => "Conversion In Progress".to_string(),
            Self::DownloadCompleted { .. } => "Download Complete".to_string(),
            Self::DownloadFailed { .. } => "Download Failed".to_string(),
            Self::OverlayActive => "Floating Button Active".to_string(),
            Self::PlaybackActive { title } => title.clone(),
            Self::PlaybackCleared => "Playback stopped".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::DownloadStarted { filename } => format!("Downloading: {filename}"),
            Self::DownloadProgress { percent } => format!("Progress: {percent}%"),
            Self::ConversionStarted => "Optimizing audio to MP3...".to_string(),
            Self::DownloadCompleted { filename, .. } => format!("{filename} saved!"),
            Self::DownloadFailed { reason } => reason.clone(),
            Self::OverlayActive => "Press g to run share automation".to_string(),
            Self::PlaybackActive { .. } => "Now playing".to_string(),
            Self::PlaybackCleared => String::new(),
        }
    }

    pub fn is_ongoing(&self) -> bool {
        matches!(
            self,
            Self::DownloadStarted { .. }
                | Self::DownloadProgress { .. }
                | Self::ConversionStarted
                | Self::OverlayActive
                | Self::PlaybackActive { .. }
        )
    }
}

/// Sink for user-facing feedback: persistent notices and short toasts.
pub trait Notifier: Send + Sync {
    fn post(&self, notice: &Notice);
    fn toast(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    Notice(Notice),
    Toast(String),
}

pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn post(&self, notice: &Notice) {
        // Ten progress popups per download is noise on a desktop.
        if matches!(notice, Notice::DownloadProgress { .. } | Notice::PlaybackCleared) {
            return;
        }

        let timeout = if notice.is_ongoing() {
            Timeout::Milliseconds(3000)
        } else {
            Timeout::Default
        };
        if let Err(err) = Notification::new()
            .appname(&self.app_name)
            .summary(&notice.title())
            .body(&notice.body())
            .timeout(timeout)
            .show()
        {
            log::warn!("desktop notification failed: {err}");
        }
    }

    fn toast(&self, _message: &str) {}
}

/// Forwards feedback into an mpsc channel, wrapped in the receiver's event type.
pub struct ChannelNotifier<T> {
    sender: Sender<T>,
    wrap: fn(Feedback) -> T,
}

impl<T> ChannelNotifier<T> {
    pub fn new(sender: Sender<T>, wrap: fn(Feedback) -> T) -> Self {
        Self { sender, wrap }
    }
}

impl<T: Send> Notifier for ChannelNotifier<T> {
    fn post(&self, notice: &Notice) {
        let _ = self.sender.send((self.wrap)(Feedback::Notice(notice.clone())));
    }

    fn toast(&self, message: &str) {
        let _ = self.sender.send((self.wrap)(Feedback::Toast(message.to_string())));
    }
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn post(&self, notice: &Notice) {
        match notice {
            Notice::DownloadProgress { percent } => log::debug!("download progress {percent}%"),
            Notice::DownloadFailed { reason } => log::error!("download failed: {reason}"),
            other => log::info!(
                "[{}#{}] {}: {}",
                other.channel().id(),
                other.id(),
                other.title(),
                other.body()
            ),
        }
    }

    fn toast(&self, message: &str) {
        log::info!("toast: {message}");
    }
}

#[derive(Default)]
pub struct Fanout {
    targets: Vec<Arc<dyn Notifier>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Notifier for Fanout {
    fn post(&self, notice: &Notice) {
        for target in &self.targets {
            target.post(notice);
        }
    }

    fn toast(&self, message: &str) {
        for target in &self.targets {
            target.toast(message);
        }
    }
}

/// Keeps every piece of feedback in order; handy for headless runs and tests.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Feedback>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Feedback> {
        match self.seen.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(_) => Vec::new(),
        }
    }

    pub fn toasts(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|entry| match entry {
                Feedback::Toast(message) => Some(message),
                Feedback::Notice(_) => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.snapshot()
            .into_iter()
            .filter_map(|entry| match entry {
                Feedback::Notice(notice) => Some(notice),
                Feedback::Toast(_) => None,
            })
            .collect()
    }

    fn snapshot(&self) -> Vec<Feedback> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    fn push(&self, entry: Feedback) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(entry);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, notice: &Notice) {
        self.push(Feedback::Notice(notice.clone()));
    }

    fn toast(&self, message: &str) {
        self.push(Feedback::Toast(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn download_notices_share_the_ongoing_id() {
        let started = Notice::DownloadStarted {
            filename: "abc".to_string(),
        };
        assert_eq!(started.id(), DOWNLOAD_ONGOING_ID);
        assert_eq!(Notice::DownloadProgress { percent: 40 }.id(), DOWNLOAD_ONGOING_ID);
        assert_eq!(Notice::ConversionStarted.id(), DOWNLOAD_ONGOING_ID);
        assert_eq!(started.channel(), NoticeChannel::Downloads);
        assert_eq!(started.body(), "Downloading: abc");
    }

    #[test]
    fn terminal_notices_have_their_own_ids_and_text() {
        let done = Notice::DownloadCompleted {
            filename: "song.mp3".to_string(),
            path: PathBuf::from("/tmp/song.mp3"),
        };
        assert_eq!(done.id(), DOWNLOAD_COMPLETED_ID);
        assert_eq!(done.title(), "Download Complete");
        assert_eq!(done.body(), "song.mp3 saved!");
        assert!(!done.is_ongoing());

        let failed = Notice::DownloadFailed {
            reason: "FFmpeg conversion failed".to_string(),
        };
        assert_eq!(failed.id(), DOWNLOAD_FAILED_ID);
        assert_eq!(failed.body(), "FFmpeg conversion failed");
    }

    #[test]
    fn overlay_and_playback_use_separate_channels() {
        assert_eq!(Notice::OverlayActive.channel().id(), "floating_button_channel");
        assert_eq!(Notice::OverlayActive.id(), OVERLAY_ID);
        let playing = Notice::PlaybackActive {
            title: "Track".to_string(),
        };
        assert_eq!(playing.channel().id(), "music_channel");
        assert_eq!(playing.id(), PLAYBACK_ID);
        assert_eq!(playing.title(), "Track");
    }

    #[test]
    fn channel_notifier_wraps_feedback() {
        let (tx, rx) = mpsc::channel();
        let notifier = ChannelNotifier::new(tx, |feedback| feedback);
        notifier.toast("hello");
        notifier.post(&Notice::ConversionStarted);
        assert_eq!(rx.recv().expect("toast"), Feedback::Toast("hello".to_string()));
        assert_eq!(
            rx.recv().expect("notice"),
            Feedback::Notice(Notice::ConversionStarted)
        );
    }

    #[test]
    fn fanout_reaches_every_target() {
        let first = Arc::new(RecordingNotifier::new());
        let second = Arc::new(RecordingNotifier::new());
        let fanout = Fanout::new().with(first.clone()).with(second.clone());
        fanout.toast("saved");
        assert_eq!(first.toasts(), vec!["saved".to_string()]);
        assert_eq!(second.toasts(), vec!["saved".to_string()]);
    }
}
