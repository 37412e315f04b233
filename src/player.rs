use crate::audio::AudioEngine;
use crate::notify::{Notice, Notifier};
use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
}

impl QueueEntry {
    pub fn from_path(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            title: path
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("Unknown")
                .to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerState {
    pub current: Option<QueueEntry>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub shuffle: bool,
    pub repeat: bool,
    pub queue_len: usize,
    pub queue_index: Option<usize>,
}

/// Sequential successor, wrapping from the last entry to the first.
pub fn next_index(current: usize, len: usize) -> Option<usize> {
    (len > 0).then(|| (current + 1) % len)
}

/// Sequential predecessor, wrapping from the first entry to the last.
pub fn previous_index(current: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(if current == 0 || current >= len {
        len - 1
    } else {
        current - 1
    })
}

/// A permutation of the queue walked in a ring, so every entry plays once per cycle.
#[derive(Debug)]
pub struct ShuffleOrder {
    order: Vec<usize>,
    cursor: usize,
    rng: SmallRng,
}

impl ShuffleOrder {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            order: Vec::new(),
            cursor: 0,
            rng,
        }
    }

    pub fn rebuild(&mut self, len: usize) {
        self.order = (0..len).collect();
        self.order.shuffle(&mut self.rng);
        self.cursor = 0;
    }

    pub fn next_after(&mut self, current: usize, len: usize) -> Option<usize> {
        self.step(current, len, 1)
    }

    pub fn previous_before(&mut self, current: usize, len: usize) -> Option<usize> {
        self.step(current, len, len.saturating_sub(1))
    }

    fn step(&mut self, current: usize, len: usize, offset: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if self.order.len() != len {
            self.rebuild(len);
        }
        if let Some(position) = self.order.iter().position(|idx| *idx == current) {
            self.cursor = position;
        }
        self.cursor = (self.cursor + offset) % len;
        self.order.get(self.cursor).copied()
    }
}

impl Default for ShuffleOrder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Queue plus transport controls over one audio engine, mirrored to a
/// playback notice while a track is active.
pub struct MediaSession<E: AudioEngine> {
    engine: E,
    notifier: Arc<dyn Notifier>,
    queue: Vec<QueueEntry>,
    index: Option<usize>,
    shuffle: bool,
    repeat: bool,
    shuffle_order: ShuffleOrder,
    foreground: bool,
}

impl<E: AudioEngine> MediaSession<E> {
    pub fn new(engine: E, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            engine,
            notifier,
            queue: Vec::new(),
            index: None,
            shuffle: false,
            repeat: false,
            shuffle_order: ShuffleOrder::new(),
            foreground: false,
        }
    }

    pub fn with_modes(mut self, shuffle: bool, repeat: bool) -> Self {
        self.shuffle = shuffle;
        self.repeat = repeat;
        self
    }

    pub fn with_shuffle_order(mut self, order: ShuffleOrder) -> Self {
        self.shuffle_order = order;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Replaces the queue with the files that still exist and starts at
    /// `start_index` (or the nearest surviving entry).
    pub fn set_queue(&mut self, paths: &[PathBuf], start_index: usize) -> Result<()> {
        let wanted = paths.get(start_index).cloned();
        let queue: Vec<QueueEntry> = paths
            .iter()
            .filter(|path| path.is_file())
            .map(|path| QueueEntry::from_path(path))
            .collect();

        if queue.is_empty() {
            self.stop_and_clear();
            bail!("no playable files in queue");
        }

        let start = wanted
            .and_then(|wanted| queue.iter().position(|entry| entry.path == wanted))
            .unwrap_or_else(|| start_index.min(queue.len() - 1));
        log::info!("queue set: {} entries, starting at {start}", queue.len());

        self.queue = queue;
        self.shuffle_order.rebuild(self.queue.len());
        self.play_index(start)
    }

    fn play_index(&mut self, index: usize) -> Result<()> {
        let Some(entry) = self.queue.get(index).cloned() else {
            bail!("queue index {index} out of range");
        };
        self.engine.play(&entry.path)?;
        self.index = Some(index);
        self.notifier.post(&Notice::PlaybackActive {
            title: entry.title.clone(),
        });
        if !self.foreground {
            self.foreground = true;
            log::info!("playback promoted to foreground");
        }
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        if self.engine.current_track().is_some() {
            self.engine.resume();
            return Ok(());
        }
        match (self.index, self.queue.is_empty()) {
            (_, true) => bail!("queue is empty"),
            (Some(index), false) => self.play_index(index),
            (None, false) => self.play_index(0),
        }
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.engine.current_track().is_some() && !self.engine.is_paused()
    }

    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.engine.seek_to(Duration::from_millis(position_ms))
    }

    pub fn skip_next(&mut self) -> Result<()> {
        match self.index {
            Some(current) => self.advance_from(current, Direction::Forward),
            None => self.play(),
        }
    }

    pub fn skip_previous(&mut self) -> Result<()> {
        match self.index {
            Some(current) => self.advance_from(current, Direction::Backward),
            None => self.play(),
        }
    }

    fn neighbour(&mut self, current: usize, direction: Direction) -> Option<usize> {
        let len = self.queue.len();
        match (self.shuffle, direction) {
            (true, Direction::Forward) => self.shuffle_order.next_after(current, len),
            (true, Direction::Backward) => self.shuffle_order.previous_before(current, len),
            (false, Direction::Forward) => next_index(current, len),
            (false, Direction::Backward) => previous_index(current, len),
        }
    }

    /// Steps through the queue until an entry plays, trying each entry at most once.
    fn advance_from(&mut self, current: usize, direction: Direction) -> Result<()> {
        let mut cursor = current;
        let mut last_error = None;
        for _ in 0..self.queue.len() {
            let Some(candidate) = self.neighbour(cursor, direction) else {
                break;
            };
            match self.play_index(candidate) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    log::warn!("skipping unplayable queue entry {candidate}: {err:#}");
                    cursor = candidate;
                    last_error = Some(err);
                }
            }
        }
        self.engine.stop();
        match last_error {
            Some(err) => Err(err.context("no playable entry left in queue")),
            None => bail!("queue is empty"),
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        if self.shuffle {
            self.shuffle_order.rebuild(self.queue.len());
        }
        self.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    pub fn stop_and_clear(&mut self) {
        self.engine.stop();
        self.queue.clear();
        self.index = None;
        if self.foreground {
            self.notifier.post(&Notice::PlaybackCleared);
        }
        self.foreground = false;
    }

    /// User swiped the playback notice away: stop and leave the foreground.
    pub fn dismiss_notification(&mut self) {
        self.engine.stop();
        self.foreground = false;
        self.notifier.post(&Notice::PlaybackCleared);
        log::info!("playback notification dismissed");
    }

    /// Advances when the current track has ended. Returns true when a new track started.
    pub fn tick(&mut self) -> Result<bool> {
        if !self.engine.is_finished() {
            return Ok(false);
        }
        let Some(current) = self.index else {
            return Ok(false);
        };
        if self.repeat {
            match self.play_index(current) {
                Ok(()) => return Ok(true),
                Err(err) => log::warn!("cannot repeat queue entry {current}: {err:#}"),
            }
        }
        self.advance_from(current, Direction::Forward)?;
        Ok(true)
    }

    pub fn state(&self) -> PlayerState {
        let current = self.index.and_then(|index| self.queue.get(index)).cloned();
        let active = self.engine.current_track().is_some();
        PlayerState {
            current: current.filter(|_| active),
            position_ms: self
                .engine
                .position()
                .map(|position| position.as_millis() as u64)
                .unwrap_or(0),
            duration_ms: self
                .engine
                .duration()
                .map(|duration| duration.as_millis() as u64)
                .unwrap_or(0),
            is_playing: self.is_playing(),
            shuffle: self.shuffle,
            repeat: self.repeat,
            queue_len: self.queue.len(),
            queue_index: self.index,
        }
    }
}
