use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use tunedrop::audio::NullAudioEngine;
use tunedrop::core::{DropCore, Tab};
use tunedrop::model::PersistedState;
use tunedrop::notify::{Notice, RecordingNotifier};
use tunedrop::player::MediaSession;

fn write_silent_wav(path: &Path, duration_ms: u32) {
    let sample_rate: u32 = 8_000;
    let total_samples = sample_rate * duration_ms / 1_000;
    let data_size = total_samples * 2;
    let mut bytes = Vec::with_capacity((44 + data_size) as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_size).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2_u16.to_le_bytes());
    bytes.extend_from_slice(&16_u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());
    bytes.resize((44 + data_size) as usize, 0);
    fs::write(path, bytes).expect("write wav fixture");
}

fn library(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            write_silent_wav(&path, 40);
            path
        })
        .collect()
}

#[test]
fn library_queue_plays_through_and_wraps() {
    let dir = tempdir().expect("tempdir");
    library(dir.path(), &["one.wav", "two.wav"]);
    let notifier = Arc::new(RecordingNotifier::new());
    let mut core = DropCore::from_persisted(
        PersistedState::default(),
        dir.path().to_path_buf(),
        notifier.clone(),
    );
    core.set_tab(Tab::Downloads);
    core.select_next();

    let (queue, start) = core.library_queue().expect("queue");
    assert_eq!(queue.len(), 2);
    assert_eq!(start, 1);

    let mut player = MediaSession::new(NullAudioEngine::new(), notifier.clone());
    player.set_queue(&queue, start).expect("play");
    let first = player.state();
    assert_eq!(first.queue_index, Some(1));
    assert_eq!(
        first.current.as_ref().map(|entry| entry.path.clone()),
        core.selected_file().map(|file| file.path.clone())
    );

    thread::sleep(Duration::from_millis(80));
    assert!(player.tick().expect("tick"));
    assert_eq!(player.state().queue_index, Some(0));

    thread::sleep(Duration::from_millis(80));
    assert!(player.tick().expect("tick"));
    assert_eq!(player.state().queue_index, Some(1));
    assert!(player.is_playing());

    let active = notifier
        .notices()
        .into_iter()
        .filter(|notice| matches!(notice, Notice::PlaybackActive { .. }))
        .count();
    assert_eq!(active, 3);
}

#[test]
fn repeat_restarts_the_same_track() {
    let dir = tempdir().expect("tempdir");
    let queue = library(dir.path(), &["loop.wav", "other.wav"]);
    let notifier = Arc::new(RecordingNotifier::new());
    let mut player =
        MediaSession::new(NullAudioEngine::new(), notifier).with_modes(false, true);

    player.set_queue(&queue, 0).expect("play");
    thread::sleep(Duration::from_millis(80));
    assert!(player.tick().expect("tick"));
    assert_eq!(player.current_index(), Some(0));
    assert!(player.state().position_ms < 40);
}

#[test]
fn playlist_plays_in_insertion_order() {
    let dir = tempdir().expect("tempdir");
    library(dir.path(), &["a.wav", "b.wav", "c.wav"]);
    let notifier = Arc::new(RecordingNotifier::new());
    let mut core = DropCore::from_persisted(
        PersistedState::default(),
        dir.path().to_path_buf(),
        notifier.clone(),
    );

    core.create_playlist("Mix");
    let id = core.selected_playlist_id().expect("playlist id");
    core.set_tab(Tab::Downloads);
    let mut added = Vec::new();
    for _ in 0..3 {
        let path = core.selected_file().expect("file").path.clone();
        core.add_selected_to_playlist(id);
        added.push(path);
        core.select_next();
    }

    let queue = core.playlist_queue(id).expect("queue");
    assert_eq!(queue, added);

    let mut player = MediaSession::new(NullAudioEngine::new(), notifier.clone());
    player.set_queue(&queue, 0).expect("play");
    player.skip_next().expect("next");
    assert_eq!(
        player.state().current.map(|entry| entry.path),
        Some(added[1].clone())
    );

    player.stop_and_clear();
    assert!(player.queue().is_empty());
    assert!(!player.is_foreground());
    assert_eq!(notifier.notices().last(), Some(&Notice::PlaybackCleared));
}

#[test]
fn deleted_files_are_skipped_when_the_queue_is_built() {
    let dir = tempdir().expect("tempdir");
    let queue = library(dir.path(), &["keep.wav", "gone.wav"]);
    fs::remove_file(&queue[1]).expect("remove");

    let mut player = MediaSession::new(NullAudioEngine::new(), Arc::new(RecordingNotifier::new()));
    player.set_queue(&queue, 1).expect("play");
    assert_eq!(player.queue().len(), 1);
    assert_eq!(player.state().queue_len, 1);
}
