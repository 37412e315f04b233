use crate::model::{Playlist, PlaylistMember};
use anyhow::{Result, bail};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::probe::Probe;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "opus", "ogg", "webm", "flac", "wav"];
pub const UNKNOWN_TITLE: &str = "Unknown";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryFile {
    pub path: PathBuf,
    pub file_name: String,
    pub title: String,
    pub artist: String,
    pub extension: String,
    pub size_bytes: u64,
    pub modified: SystemTime,
    pub duration_ms: Option<u64>,
}

#[derive(Default)]
struct EmbeddedTags {
    title: Option<String>,
    artist: Option<String>,
    duration_ms: Option<u64>,
}

fn embedded_tags(path: &Path) -> EmbeddedTags {
    let Ok(probe) = Probe::open(path) else {
        return EmbeddedTags::default();
    };
    let Ok(tagged_file) = probe.read() else {
        return EmbeddedTags::default();
    };

    let duration = tagged_file.properties().duration();
    let duration_ms = (!duration.is_zero()).then(|| duration.as_millis() as u64);
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    EmbeddedTags {
        title: tag.and_then(|tag| clean(tag.title().as_deref())),
        artist: tag.and_then(|tag| clean(tag.artist().as_deref())),
        duration_ms,
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Audio files under `dir`, newest first.
pub fn scan_downloads(dir: &Path) -> Vec<LibraryFile> {
    let mut files: Vec<LibraryFile> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            let metadata = entry.metadata().ok()?;
            let tags = embedded_tags(&path);
            Some(LibraryFile {
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                title: tags
                    .title
                    .or_else(|| file_stem(&path))
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                artist: tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                extension: path
                    .extension()
                    .and_then(OsStr::to_str)
                    .unwrap_or_default()
                    .to_ascii_lowercase(),
                size_bytes: metadata.len(),
                modified: metadata.modified().unwrap_or(UNIX_EPOCH),
                duration_ms: tags.duration_ms,
                path,
            })
        })
        .collect();

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    files
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: u64,
    pub name: String,
    pub song_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSong {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub play_order: u32,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Playlists and their members; persisted through `PersistedState`.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    playlists: Vec<Playlist>,
    next_id: u64,
}

impl Default for PlaylistStore {
    fn default() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl PlaylistStore {
    pub fn new(playlists: Vec<Playlist>, next_id: u64) -> Self {
        let floor = playlists.iter().map(|playlist| playlist.id + 1).max().unwrap_or(1);
        Self {
            playlists,
            next_id: next_id.max(floor),
        }
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn create_playlist(&mut self, name: &str) -> Result<u64> {
        let name = name.trim();
        if name.is_empty() {
            bail!("playlist name is empty");
        }

        let id = self.next_id;
        self.next_id += 1;
        let now = unix_now();
        self.playlists.push(Playlist {
            id,
            name: name.to_string(),
            date_added: now,
            date_modified: now,
            members: Vec::new(),
        });
        log::info!("created playlist {id} ({name})");
        Ok(id)
    }

    /// Appends after the current last member.
    pub fn add_song_to_playlist(&mut self, id: u64, path: &Path) -> Result<u32> {
        let Some(playlist) = self.playlists.iter_mut().find(|playlist| playlist.id == id) else {
            bail!("playlist {id} does not exist");
        };
        if !path.is_file() {
            bail!("file not found: {}", path.display());
        }

        let play_order = playlist
            .members
            .iter()
            .map(|member| member.play_order)
            .max()
            .unwrap_or(0)
            + 1;
        playlist.members.push(PlaylistMember {
            path: path.to_path_buf(),
            play_order,
        });
        playlist.date_modified = unix_now();
        Ok(play_order)
    }

    pub fn all_playlists(&self) -> Vec<PlaylistSummary> {
        let mut summaries: Vec<PlaylistSummary> = self
            .playlists
            .iter()
            .map(|playlist| PlaylistSummary {
                id: playlist.id,
                name: playlist.name.clone(),
                song_count: playlist.members.len(),
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    /// Members still on disk, in play order.
    pub fn songs_in_playlist(&self, id: u64) -> Vec<PlaylistSong> {
        let Some(playlist) = self.playlists.iter().find(|playlist| playlist.id == id) else {
            return Vec::new();
        };

        let mut songs: Vec<PlaylistSong> = playlist
            .members
            .iter()
            .filter(|member| member.path.is_file())
            .map(|member| {
                let tags = embedded_tags(&member.path);
                PlaylistSong {
                    path: member.path.clone(),
                    title: tags
                        .title
                        .or_else(|| file_stem(&member.path))
                        .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                    artist: tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                    play_order: member.play_order,
                }
            })
            .collect();
        songs.sort_by_key(|song| song.play_order);
        songs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn scan_keeps_audio_newest_first() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("old.mp3"), b"x").expect("write old");
        thread::sleep(Duration::from_millis(20));
        fs::write(dir.path().join("new.m4a"), b"xyz").expect("write new");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write txt");
        fs::write(dir.path().join("new.info.json"), b"{}").expect("write json");

        let files = scan_downloads(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "new.m4a");
        assert_eq!(files[0].title, "new");
        assert_eq!(files[0].artist, UNKNOWN_ARTIST);
        assert_eq!(files[0].extension, "m4a");
        assert_eq!(files[0].size_bytes, 3);
        assert_eq!(files[1].file_name, "old.mp3");
    }

    #[test]
    fn scan_of_missing_dir_is_empty() {
        assert!(scan_downloads(Path::new("/no/such/tunedrop/dir")).is_empty());
    }

    #[test]
    fn adding_requires_existing_playlist_and_file() {
        let dir = tempdir().expect("tempdir");
        let song = dir.path().join("a.mp3");
        fs::write(&song, b"x").expect("write");

        let mut store = PlaylistStore::default();
        assert!(store.add_song_to_playlist(7, &song).is_err());

        let id = store.create_playlist("Road").expect("create");
        assert!(store.add_song_to_playlist(id, &dir.path().join("gone.mp3")).is_err());
        assert_eq!(store.add_song_to_playlist(id, &song).expect("add"), 1);
    }

    #[test]
    fn members_append_in_increasing_play_order() {
        let dir = tempdir().expect("tempdir");
        let mut store = PlaylistStore::default();
        let id = store.create_playlist("Mix").expect("create");
        for name in ["c.mp3", "a.mp3", "b.mp3"] {
            let path = dir.path().join(name);
            fs::write(&path, b"x").expect("write");
            store.add_song_to_playlist(id, &path).expect("add");
        }

        let songs = store.songs_in_playlist(id);
        let titles: Vec<&str> = songs.iter().map(|song| song.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
        assert_eq!(
            songs.iter().map(|song| song.play_order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        fs::remove_file(dir.path().join("a.mp3")).expect("remove");
        assert_eq!(store.songs_in_playlist(id).len(), 2);
    }

    #[test]
    fn empty_store_hands_out_ids_from_one() {
        let mut store = PlaylistStore::default();
        assert_eq!(store.next_id(), 1);
        assert_eq!(store.create_playlist("First").expect("create"), 1);
        assert_eq!(store.next_id(), 2);
    }

    #[test]
    fn playlists_list_by_name() {
        let mut store = PlaylistStore::default();
        store.create_playlist("zeta").expect("create");
        store.create_playlist("Alpha").expect("create");
        store.create_playlist("beta").expect("create");
        assert!(store.create_playlist("   ").is_err());

        let names: Vec<String> = store.all_playlists().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn next_id_never_reuses_existing_ids() {
        let existing = Playlist {
            id: 9,
            name: "x".to_string(),
            date_added: 0,
            date_modified: 0,
            members: Vec::new(),
        };
        let mut store = PlaylistStore::new(vec![existing], 1);
        assert_eq!(store.create_playlist("y").expect("create"), 10);
    }
}
