use super::error::DownloadError;
use super::fetch::InfoRecord;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub description: String,
}

impl TrackTags {
    pub fn from_info(info: &InfoRecord, audio: &Path) -> Self {
        let stem = audio
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = non_empty(info.fulltitle.as_deref()).unwrap_or(stem);

        let joined = info
            .artists
            .as_ref()
            .map(|artists| artists.join(", "))
            .filter(|joined| !joined.trim().is_empty());
        let artist = joined
            .or_else(|| non_empty(info.artist.as_deref()))
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Self {
            title,
            artist,
            album: info.album.clone().unwrap_or_default(),
            year: info.release_year.clone().unwrap_or_default(),
            description: info.description.clone().unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub output: PathBuf,
    pub tags: TrackTags,
}

impl TranscodeRequest {
    /// Drops the thumbnail when it is not on disk.
    pub fn new(input: PathBuf, thumbnail: Option<PathBuf>, output: PathBuf, tags: TrackTags) -> Self {
        Self {
            input,
            thumbnail: thumbnail.filter(|path| path.is_file()),
            output,
            tags,
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().into_owned(),
        ];

        match &self.thumbnail {
            Some(thumb) => args.extend([
                "-i".to_string(),
                thumb.to_string_lossy().into_owned(),
                "-map".to_string(),
                "0:a".to_string(),
                "-map".to_string(),
                "1".to_string(),
                "-c:a".to_string(),
                "libmp3lame".to_string(),
                "-c:v".to_string(),
                "mjpeg".to_string(),
                "-disposition:v".to_string(),
                "attached_pic".to_string(),
            ]),
            None => args.extend(["-vn".to_string(), "-c:a".to_string(), "libmp3lame".to_string()]),
        }

        args.extend(
            ["-ar", "44100", "-ac", "2", "-b:a", "192k"]
                .into_iter()
                .map(str::to_string),
        );

        for (key, value) in self.metadata() {
            args.push("-metadata".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Single-string rendering for logs; values quoted with `"` escaped.
    pub fn command_line(&self) -> String {
        let mut parts = vec!["-y".to_string(), "-i".to_string(), quote(&self.input.to_string_lossy())];
        match &self.thumbnail {
            Some(thumb) => {
                parts.push("-i".to_string());
                parts.push(quote(&thumb.to_string_lossy()));
                parts.push("-map 0:a -map 1 -c:a libmp3lame -c:v mjpeg -disposition:v attached_pic".to_string());
            }
            None => parts.push("-vn -c:a libmp3lame".to_string()),
        }
        parts.push("-ar 44100 -ac 2 -b:a 192k".to_string());
        for (key, value) in self.metadata() {
            parts.push(format!("-metadata {key}={}", quote(value)));
        }
        parts.push(quote(&self.output.to_string_lossy()));
        parts.join(" ")
    }

    fn metadata(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("title", self.tags.title.as_str()),
            ("artist", self.tags.artist.as_str()),
            ("album", self.tags.album.as_str()),
        ];
        if !self.tags.year.is_empty() {
            fields.push(("date", self.tags.year.as_str()));
        }
        fields.push(("comment", self.tags.description.as_str()));
        fields
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

pub trait Transcoder: Send + Sync {
    fn transcode(&self, request: &TranscodeRequest) -> Result<(), DownloadError>;
}

pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, request: &TranscodeRequest) -> Result<(), DownloadError> {
        log::info!("{} {}", self.program, request.command_line());
        let output = Command::new(&self.program)
            .args(request.args())
            .stdin(Stdio::null())
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| output.status.to_string());
        Err(DownloadError::Transcoder(detail))
    }
}
