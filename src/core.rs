use crate::automation::Outcome;
use crate::config;
use crate::library::{self, LibraryFile, PlaylistSong, PlaylistStore, PlaylistSummary};
use crate::links::{SharedText, is_youtube_url};
use crate::model::PersistedState;
use crate::notify::{Feedback, Notice, Notifier};
use crate::overlay::FloatingButton;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const RECENT_TOASTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Downloads,
    Player,
    Playlists,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Home,
        Tab::Downloads,
        Tab::Player,
        Tab::Playlists,
        Tab::Settings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Downloads => "Downloads",
            Tab::Player => "Player",
            Tab::Playlists => "Playlists",
            Tab::Settings => "Settings",
        }
    }

    fn position(self) -> usize {
        Tab::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.position() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Tab {
        Tab::ALL[(self.position() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// What the front-end shows about the download in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStatus {
    pub filename: Option<String>,
    pub percent: Option<u8>,
    pub converting: bool,
}

/// Front-end state that does not depend on the terminal or the audio device.
pub struct DropCore {
    pub tab: Tab,
    pub settings: PersistedState,
    pub download_dir: PathBuf,
    pub files: Vec<LibraryFile>,
    pub selected_file: usize,
    pub playlists: PlaylistStore,
    pub selected_playlist: usize,
    pub playlist_songs: Vec<PlaylistSong>,
    pub url_input: String,
    pub pending_url: Option<String>,
    pub download: DownloadStatus,
    pub floating: FloatingButton,
    pub recent_toasts: VecDeque<String>,
    pub dirty: bool,
    pub status: String,
}

impl DropCore {
    pub fn from_persisted(
        state: PersistedState,
        download_dir: PathBuf,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let playlists = PlaylistStore::new(state.playlists.clone(), state.next_playlist_id);
        let floating = FloatingButton::new(state.floating_button_enabled, notifier);
        let mut core = Self {
            tab: Tab::Home,
            settings: state,
            files: library::scan_downloads(&download_dir),
            download_dir,
            selected_file: 0,
            playlists,
            selected_playlist: 0,
            playlist_songs: Vec::new(),
            url_input: String::new(),
            pending_url: None,
            download: DownloadStatus::default(),
            floating,
            recent_toasts: VecDeque::new(),
            dirty: true,
            status: String::from("Ready"),
        };
        core.refresh_playlist_songs();
        core
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            playlists: self.playlists.playlists().to_vec(),
            next_playlist_id: self.playlists.next_id(),
            floating_button_enabled: self.floating.is_enabled(),
            ..self.settings.clone()
        }
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        config::save_state(&self.persisted_state())?;
        self.set_status("State saved");
        Ok(())
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        if tab == Tab::Playlists {
            self.refresh_playlist_songs();
        }
        self.dirty = true;
    }

    pub fn rescan(&mut self) {
        self.files = library::scan_downloads(&self.download_dir);
        self.selected_file = clamp_index(self.selected_file, self.files.len());
        self.refresh_playlist_songs();
        self.set_status(&format!("{} files in library", self.files.len()));
    }

    pub fn select_next(&mut self) {
        match self.tab {
            Tab::Downloads => {
                self.selected_file = clamp_index(self.selected_file + 1, self.files.len());
            }
            Tab::Playlists => {
                let count = self.playlists.playlists().len();
                self.selected_playlist = clamp_index(self.selected_playlist + 1, count);
                self.refresh_playlist_songs();
            }
            _ => return,
        }
        self.dirty = true;
    }

    pub fn select_prev(&mut self) {
        match self.tab {
            Tab::Downloads => self.selected_file = self.selected_file.saturating_sub(1),
            Tab::Playlists => {
                self.selected_playlist = self.selected_playlist.saturating_sub(1);
                self.refresh_playlist_songs();
            }
            _ => return,
        }
        self.dirty = true;
    }

    pub fn selected_file(&self) -> Option<&LibraryFile> {
        self.files.get(self.selected_file)
    }

    /// The whole library as a queue starting at the highlighted file.
    pub fn library_queue(&self) -> Option<(Vec<PathBuf>, usize)> {
        if self.files.is_empty() {
            return None;
        }
        let paths = self.files.iter().map(|file| file.path.clone()).collect();
        Some((paths, clamp_index(self.selected_file, self.files.len())))
    }

    pub fn playlist_summaries(&self) -> Vec<PlaylistSummary> {
        self.playlists.all_playlists()
    }

    pub fn selected_playlist_id(&self) -> Option<u64> {
        self.playlist_summaries()
            .get(self.selected_playlist)
            .map(|summary| summary.id)
    }

    pub fn create_playlist(&mut self, name: &str) {
        match self.playlists.create_playlist(name) {
            Ok(id) => {
                self.refresh_playlist_songs();
                self.set_status(&format!("Playlist {id} created"));
            }
            Err(err) => self.set_status(&format!("Playlist error: {err:#}")),
        }
    }

    pub fn add_selected_to_playlist(&mut self, id: u64) {
        let Some(path) = self.selected_file().map(|file| file.path.clone()) else {
            self.set_status("No file selected");
            return;
        };
        match self.playlists.add_song_to_playlist(id, &path) {
            Ok(order) => {
                self.refresh_playlist_songs();
                self.set_status(&format!("Added to playlist {id} at position {order}"));
            }
            Err(err) => self.set_status(&format!("Playlist error: {err:#}")),
        }
    }

    pub fn playlist_queue(&mut self, id: u64) -> Option<Vec<PathBuf>> {
        let songs = self.playlists.songs_in_playlist(id);
        if songs.is_empty() {
            self.set_status("Playlist is empty or missing");
            return None;
        }
        Some(songs.into_iter().map(|song| song.path).collect())
    }

    pub fn refresh_playlist_songs(&mut self) {
        let count = self.playlists.playlists().len();
        self.selected_playlist = clamp_index(self.selected_playlist, count);
        self.playlist_songs = self
            .selected_playlist_id()
            .map(|id| self.playlists.songs_in_playlist(id))
            .unwrap_or_default();
        self.dirty = true;
    }

    /// URL typed on the Home tab, if it is worth downloading.
    pub fn take_url_input(&mut self) -> Option<String> {
        let typed = std::mem::take(&mut self.url_input);
        let typed = typed.trim();
        if typed.is_empty() {
            self.set_status("Enter a URL first");
            return None;
        }
        if !is_youtube_url(typed) {
            self.set_status("Not a YouTube URL");
            return None;
        }
        self.dirty = true;
        Some(typed.to_string())
    }

    pub fn take_pending_url(&mut self) -> Option<String> {
        let url = self.pending_url.take();
        if url.is_none() {
            self.set_status("No copied link yet");
        }
        url
    }

    /// Text arriving like an Android share intent.
    pub fn accept_shared_text(&mut self, text: &str) -> Option<String> {
        match SharedText::classify(text) {
            SharedText::Download(url) => Some(url),
            SharedText::SearchRequest(query) => {
                log::info!("search request received: {query}");
                self.set_status(&format!("Search requests are not supported: {query}"));
                None
            }
            SharedText::Unsupported(text) => {
                log::debug!("shared text without a YouTube link: {text}");
                self.set_status("Shared text has no YouTube link");
                None
            }
        }
    }

    pub fn remember_url(&mut self, url: String) {
        self.pending_url = Some(url);
        self.dirty = true;
    }

    pub fn apply_feedback(&mut self, feedback: Feedback) {
        match feedback {
            Feedback::Toast(message) => {
                self.recent_toasts.push_front(message.clone());
                self.recent_toasts.truncate(RECENT_TOASTS);
                self.set_status(&message);
            }
            Feedback::Notice(notice) => self.apply_notice(notice),
        }
    }

    fn apply_notice(&mut self, notice: Notice) {
        match notice {
            Notice::DownloadStarted { filename } => {
                self.download = DownloadStatus {
                    filename: Some(filename),
                    percent: Some(0),
                    converting: false,
                };
            }
            Notice::DownloadProgress { percent } => self.download.percent = Some(percent),
            Notice::ConversionStarted => {
                self.download.percent = None;
                self.download.converting = true;
            }
            Notice::DownloadCompleted { .. } => {
                self.download = DownloadStatus::default();
                self.rescan();
            }
            Notice::DownloadFailed { .. } => self.download = DownloadStatus::default(),
            Notice::OverlayActive | Notice::PlaybackActive { .. } | Notice::PlaybackCleared => {}
        }
        self.dirty = true;
    }

    /// A captured URL goes straight to the downloader.
    pub fn apply_outcome(&mut self, outcome: Outcome) -> Option<String> {
        match outcome {
            Outcome::UrlCaptured(url) => {
                self.remember_url(url.clone());
                Some(url)
            }
            Outcome::Shared(target) => {
                self.set_status(&format!("Shared to {target}"));
                None
            }
            Outcome::Failed(reason) => {
                self.set_status(&format!("Automation stopped: {reason}"));
                None
            }
        }
    }

    pub fn set_player_modes(&mut self, shuffle: bool, repeat: bool, volume: f32) {
        self.settings.shuffle = shuffle;
        self.settings.repeat = repeat;
        self.settings.saved_volume = volume;
    }

    pub fn is_downloaded(&self, path: &Path) -> bool {
        self.files.iter().any(|file| file.path == path)
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 { 0 } else { index.min(len - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use std::fs;
    use tempfile::tempdir;

    fn core_in(dir: &Path) -> DropCore {
        DropCore::from_persisted(
            PersistedState::default(),
            dir.to_path_buf(),
            Arc::new(RecordingNotifier::new()),
        )
    }

    #[test]
    fn tabs_cycle_both_ways() {
        assert_eq!(Tab::Settings.next(), Tab::Home);
        assert_eq!(Tab::Home.prev(), Tab::Settings);
        assert_eq!(Tab::Downloads.next(), Tab::Player);
    }

    #[test]
    fn url_input_is_validated_and_cleared() {
        let dir = tempdir().expect("tempdir");
        let mut core = core_in(dir.path());
        core.url_input = "https://vimeo.com/1".to_string();
        assert_eq!(core.take_url_input(), None);
        assert_eq!(core.status, "Not a YouTube URL");
        assert!(core.url_input.is_empty());

        core.url_input = "  https://youtu.be/abc ".to_string();
        assert_eq!(core.take_url_input(), Some("https://youtu.be/abc".to_string()));
    }

    #[test]
    fn shared_text_routes() {
        let dir = tempdir().expect("tempdir");
        let mut core = core_in(dir.path());
        assert_eq!(
            core.accept_shared_text("https://youtu.be/x"),
            Some("https://youtu.be/x".to_string())
        );
        assert_eq!(core.accept_shared_text("youtube_music_search:lofi"), None);
        assert!(core.status.contains("lofi"));
        assert_eq!(core.accept_shared_text("hello"), None);
        assert_eq!(core.status, "Shared text has no YouTube link");
        assert_eq!(core.accept_shared_text("see https://vimeo.com/1 later"), None);
        assert_eq!(
            core.accept_shared_text("Listen to this https://youtu.be/y, thanks"),
            Some("https://youtu.be/y".to_string())
        );
    }

    #[test]
    fn download_notices_drive_status_and_rescan() {
        let dir = tempdir().expect("tempdir");
        let mut core = core_in(dir.path());
        core.apply_feedback(Feedback::Notice(Notice::DownloadStarted {
            filename: "abc".to_string(),
        }));
        core.apply_feedback(Feedback::Notice(Notice::DownloadProgress { percent: 40 }));
        assert_eq!(core.download.percent, Some(40));
        core.apply_feedback(Feedback::Notice(Notice::ConversionStarted));
        assert!(core.download.converting);

        let song = dir.path().join("song.mp3");
        fs::write(&song, b"x").expect("write");
        core.apply_feedback(Feedback::Notice(Notice::DownloadCompleted {
            filename: "song.mp3".to_string(),
            path: song.clone(),
        }));
        assert_eq!(core.download, DownloadStatus::default());
        assert!(core.is_downloaded(&song));

        core.apply_feedback(Feedback::Toast("Saved: song.mp3".to_string()));
        assert_eq!(core.status, "Saved: song.mp3");
        assert_eq!(core.recent_toasts.front().map(String::as_str), Some("Saved: song.mp3"));
    }

    #[test]
    fn playlists_follow_selection() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp3"), b"x").expect("write");
        let mut core = core_in(dir.path());
        core.create_playlist("Road");
        let id = core.selected_playlist_id().expect("playlist");
        core.add_selected_to_playlist(id);
        assert_eq!(core.playlist_songs.len(), 1);
        assert_eq!(core.playlist_queue(id).map(|queue| queue.len()), Some(1));
        assert_eq!(core.playlist_queue(id + 10), None);

        let saved = core.persisted_state();
        assert_eq!(saved.playlists.len(), 1);
        assert_eq!(saved.next_playlist_id, id + 1);
    }

    #[test]
    fn captured_url_is_remembered_and_returned() {
        let dir = tempdir().expect("tempdir");
        let mut core = core_in(dir.path());
        let url = "https://youtube.com/watch?v=1".to_string();
        assert_eq!(core.apply_outcome(Outcome::UrlCaptured(url.clone())), Some(url.clone()));
        assert_eq!(core.pending_url, Some(url));
        assert_eq!(core.apply_outcome(Outcome::Failed("nope".to_string())), None);
        assert_eq!(core.status, "Automation stopped: nope");
    }
}
