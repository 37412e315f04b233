pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod transcode;

pub use error::DownloadError;
pub use pipeline::{DownloadOutcome, DownloadPipeline};
