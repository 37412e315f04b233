use std::io;
use thiserror::Error;

/// Terminal failure of one download attempt. `Display` is the text shown to
/// the user in the failure notice and toast.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0}")]
    Downloader(String),

    #[error("Downloaded file not found: {0}")]
    MissingFile(String),

    #[error("Invalid metadata returned from downloader")]
    Metadata(String),

    #[error("FFmpeg conversion failed")]
    Transcoder(String),

    #[error("Error: {0}")]
    Io(#[from] io::Error),
}

impl DownloadError {
    /// Extra detail that stays out of the user-facing text but goes to the log.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Metadata(detail) | Self::Transcoder(detail) => Some(detail),
            _ => None,
        }
    }
}
