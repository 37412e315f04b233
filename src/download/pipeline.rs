use super::error::DownloadError;
use super::fetch::{AudioFetcher, HelperScriptFetcher, YtDlpFetcher};
use super::progress::{DEFAULT_TICK, ProgressTicker};
use super::transcode::{FfmpegTranscoder, TrackTags, TranscodeRequest, Transcoder};
use crate::config;
use crate::links::filename_from_url;
use crate::model::PersistedState;
use crate::notify::{Notice, Notifier};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub output: PathBuf,
    pub tags: TrackTags,
    pub hash: Option<String>,
}

impl DownloadOutcome {
    pub fn file_name(&self) -> String {
        display_name(&self.output)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// URL in, tagged MP3 in `output_dir` out. One attempt, no retries.
pub struct DownloadPipeline {
    fetcher: Arc<dyn AudioFetcher>,
    transcoder: Arc<dyn Transcoder>,
    notifier: Arc<dyn Notifier>,
    output_dir: PathBuf,
    tick: Duration,
}

impl DownloadPipeline {
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        transcoder: Arc<dyn Transcoder>,
        notifier: Arc<dyn Notifier>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            notifier,
            output_dir,
            tick: DEFAULT_TICK,
        }
    }

    pub fn from_state(state: &PersistedState, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let fetcher: Arc<dyn AudioFetcher> = match &state.tools.helper_script {
            Some(script) => Arc::new(HelperScriptFetcher::new(script.clone())),
            None => Arc::new(YtDlpFetcher::new(state.tools.yt_dlp.clone())),
        };
        let transcoder = Arc::new(FfmpegTranscoder::new(state.tools.ffmpeg.clone()));
        Ok(Self::new(
            fetcher,
            transcoder,
            notifier,
            config::download_dir(state)?,
        ))
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn run(&self, url: &str) -> Result<DownloadOutcome, DownloadError> {
        log::info!("download requested: {url}");
        match self.attempt(url) {
            Ok(outcome) => {
                let name = outcome.file_name();
                log::info!("converted to {}", outcome.output.display());
                self.notifier.post(&Notice::DownloadCompleted {
                    filename: name.clone(),
                    path: outcome.output.clone(),
                });
                self.notifier.toast(&format!("Saved: {name}"));
                Ok(outcome)
            }
            Err(err) => {
                match err.detail() {
                    Some(detail) => log::error!("download failed: {err} ({detail})"),
                    None => log::error!("download failed: {err}"),
                }
                let reason = err.to_string();
                self.notifier.post(&Notice::DownloadFailed {
                    reason: reason.clone(),
                });
                self.notifier.toast(&reason);
                Err(err)
            }
        }
    }

    pub fn spawn(self: Arc<Self>, url: String) -> JoinHandle<Result<DownloadOutcome, DownloadError>> {
        thread::spawn(move || self.run(&url))
    }

    fn attempt(&self, url: &str) -> Result<DownloadOutcome, DownloadError> {
        fs::create_dir_all(&self.output_dir)?;
        self.notifier.post(&Notice::DownloadStarted {
            filename: filename_from_url(url),
        });

        let ticker = ProgressTicker::start(self.notifier.clone(), self.tick);
        let fetched = self.fetcher.fetch(url, &self.output_dir);
        ticker.cancel();
        let payload = fetched?;

        if !payload.audio.is_file() {
            return Err(DownloadError::MissingFile(display_name(&payload.audio)));
        }

        self.notifier.post(&Notice::ConversionStarted);
        let tags = TrackTags::from_info(&payload.info, &payload.audio);
        let stem = payload
            .audio
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let output = self.output_dir.join(format!("{stem}.mp3"));

        // ffmpeg cannot write over its own input.
        let overwrites_source = same_file(&output, &payload.audio);
        let target = if overwrites_source {
            self.output_dir.join(format!("{stem}.converting.mp3"))
        } else {
            output.clone()
        };

        let request = TranscodeRequest::new(
            payload.audio.clone(),
            payload.thumbnail.clone(),
            target.clone(),
            tags.clone(),
        );
        if let Err(err) = self.transcoder.transcode(&request) {
            let _ = fs::remove_file(&target);
            return Err(err);
        }

        if overwrites_source {
            fs::rename(&target, &output)?;
        } else if payload.audio.exists() {
            fs::remove_file(&payload.audio)?;
        }

        Ok(DownloadOutcome {
            output,
            tags,
            hash: payload.hash,
        })
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
