use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolPaths {
    #[serde(default = "default_yt_dlp")]
    pub yt_dlp: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_adb")]
    pub adb: String,
    #[serde(default)]
    pub adb_serial: Option<String>,
    /// Replaces yt-dlp with a script speaking the `ERROR::`/JSON protocol.
    #[serde(default)]
    pub helper_script: Option<PathBuf>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: default_yt_dlp(),
            ffmpeg: default_ffmpeg(),
            adb: default_adb(),
            adb_serial: None,
            helper_script: None,
        }
    }
}

fn default_yt_dlp() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_adb() -> String {
    "adb".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistMember {
    pub path: PathBuf,
    pub play_order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Playlist {
    pub id: u64,
    pub name: String,
    pub date_added: u64,
    pub date_modified: u64,
    #[serde(default)]
    pub members: Vec<PlaylistMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub tools: ToolPaths,
    #[serde(default = "default_share_target_label")]
    pub share_target_label: String,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default = "default_saved_volume")]
    pub saved_volume: f32,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    #[serde(default = "default_next_playlist_id")]
    pub next_playlist_id: u64,
    #[serde(default = "default_floating_button_enabled")]
    pub floating_button_enabled: bool,
}

fn default_share_target_label() -> String {
    "TuneDrop".to_string()
}

fn default_saved_volume() -> f32 {
    1.0
}

fn default_next_playlist_id() -> u64 {
    1
}

fn default_floating_button_enabled() -> bool {
    true
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            download_dir: None,
            tools: ToolPaths::default(),
            share_target_label: default_share_target_label(),
            shuffle: false,
            repeat: false,
            saved_volume: default_saved_volume(),
            playlists: Vec::new(),
            next_playlist_id: default_next_playlist_id(),
            floating_button_enabled: default_floating_button_enabled(),
        }
    }
}
