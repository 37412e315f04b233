use super::error::DownloadError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const ERROR_SENTINEL: &str = "ERROR::";
const THUMBNAIL_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
const ACCEPT_LANGUAGE: &str = "Accept-Language:en-US,en;q=0.9";
const OUTPUT_TEMPLATE: &str = "%(artist,uploader)s - %(title)s.%(ext)s";

/// Subset of the downloader's info JSON that tagging and display care about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InfoRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub fulltitle: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub artists: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub album: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration_string: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub upload_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub webpage_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub release_year: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub creators: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: Option<String>,
}

// yt-dlp emits years and dates as either strings or numbers depending on the extractor.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Some(Value::String(text)) => Some(vec![text]),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchPayload {
    pub audio: PathBuf,
    pub info: InfoRecord,
    pub thumbnail: Option<PathBuf>,
    pub hash: Option<String>,
}

#[derive(Deserialize)]
struct WirePayload {
    audio: PathBuf,
    #[serde(default)]
    info_json: Option<InfoRecord>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    hash: Option<String>,
}

/// Decodes helper output: either `ERROR::<message>` or the JSON success payload.
pub fn parse_fetch_output(raw: &str) -> Result<FetchPayload, DownloadError> {
    let trimmed = raw.trim();
    if let Some(message) = trimmed.strip_prefix(ERROR_SENTINEL) {
        return Err(DownloadError::Downloader(message.trim().to_string()));
    }

    // Helpers may print progress before the payload; the payload is the last line.
    let body = trimmed
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    if let Some(message) = body.trim().strip_prefix(ERROR_SENTINEL) {
        return Err(DownloadError::Downloader(message.trim().to_string()));
    }

    let wire: WirePayload =
        serde_json::from_str(body).map_err(|err| DownloadError::Metadata(err.to_string()))?;
    Ok(FetchPayload {
        audio: wire.audio,
        info: wire.info_json.unwrap_or_default(),
        thumbnail: wire
            .thumbnail
            .filter(|path| !path.is_empty())
            .map(PathBuf::from),
        hash: wire.hash,
    })
}

pub trait AudioFetcher: Send + Sync {
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<FetchPayload, DownloadError>;
}

pub struct YtDlpFetcher {
    program: String,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(&self, url: &str, output_dir: &Path) -> Vec<String> {
        let template = output_dir.join(OUTPUT_TEMPLATE);
        vec![
            "--format".to_string(),
            "bestaudio[ext=m4a]/bestaudio/best".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--write-info-json".to_string(),
            "--write-thumbnail".to_string(),
            "--no-embed-metadata".to_string(),
            "--no-embed-thumbnail".to_string(),
            "--retries".to_string(),
            "10".to_string(),
            "--fragment-retries".to_string(),
            "10".to_string(),
            "--force-ipv4".to_string(),
            "--user-agent".to_string(),
            USER_AGENT.to_string(),
            "--add-header".to_string(),
            ACCEPT_LANGUAGE.to_string(),
            "--no-simulate".to_string(),
            "--no-progress".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            url.to_string(),
        ]
    }
}

impl AudioFetcher for YtDlpFetcher {
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<FetchPayload, DownloadError> {
        fs::create_dir_all(output_dir)?;
        let before = list_dir(output_dir)?;

        log::info!("running {} for {url}", self.program);
        let output = Command::new(&self.program)
            .args(self.args(url, output_dir))
            .stdin(Stdio::null())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let reason = last_line(&stderr)
                .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
                .unwrap_or_else(|| format!("{} exited with {}", self.program, output.status));
            return Err(DownloadError::Downloader(reason));
        }

        let printed = last_line(&stdout).map(PathBuf::from);
        let audio = match printed.filter(|path| path.is_file()) {
            Some(path) => path,
            None => new_audio_file(output_dir, &before)?
                .ok_or_else(|| DownloadError::Downloader("No new file created.".to_string()))?,
        };
        log::info!("audio downloaded: {}", audio.display());

        let info = match info_json_path(&audio).filter(|path| path.is_file()) {
            Some(path) => {
                let raw = fs::read_to_string(&path)?;
                serde_json::from_str(&raw).map_err(|err| DownloadError::Metadata(err.to_string()))?
            }
            None => InfoRecord::default(),
        };
        let hash = sha256_file(&audio)?;
        log::debug!("audio hash {}", &hash[..hash.len().min(16)]);

        Ok(FetchPayload {
            thumbnail: find_thumbnail(&audio),
            info: InfoRecord {
                hash: Some(hash.clone()),
                ..info
            },
            audio,
            hash: Some(hash),
        })
    }
}

/// Runs `<script> <url> <dir>` and reads the sentinel/JSON protocol from stdout.
pub struct HelperScriptFetcher {
    script: PathBuf,
}

impl HelperScriptFetcher {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl AudioFetcher for HelperScriptFetcher {
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<FetchPayload, DownloadError> {
        fs::create_dir_all(output_dir)?;
        let output = Command::new(&self.script)
            .arg(url)
            .arg(output_dir)
            .stdin(Stdio::null())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && !stdout.contains(ERROR_SENTINEL) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = last_line(&stderr)
                .map(str::to_string)
                .unwrap_or_else(|| format!("helper exited with {}", output.status));
            return Err(DownloadError::Downloader(reason));
        }
        parse_fetch_output(&stdout)
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

fn list_dir(dir: &Path) -> Result<HashSet<PathBuf>, DownloadError> {
    let mut entries = HashSet::new();
    for entry in fs::read_dir(dir)? {
        entries.insert(entry?.path());
    }
    Ok(entries)
}

/// First file that appeared in `dir` since `before` and is neither metadata nor artwork.
pub fn new_audio_file(
    dir: &Path,
    before: &HashSet<PathBuf>,
) -> Result<Option<PathBuf>, DownloadError> {
    let mut fresh: Vec<PathBuf> = list_dir(dir)?
        .into_iter()
        .filter(|path| !before.contains(path) && path.is_file())
        .filter(|path| !is_companion_file(path))
        .collect();
    fresh.sort();
    Ok(fresh.into_iter().next())
}

fn is_companion_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".info.json")
        || name.ends_with(".part")
        || THUMBNAIL_EXTENSIONS
            .iter()
            .any(|ext| name.ends_with(&format!(".{ext}")))
}

pub fn info_json_path(audio: &Path) -> Option<PathBuf> {
    let stem = audio.file_stem()?.to_string_lossy();
    Some(audio.with_file_name(format!("{stem}.info.json")))
}

pub fn find_thumbnail(audio: &Path) -> Option<PathBuf> {
    THUMBNAIL_EXTENSIONS
        .iter()
        .map(|ext| audio.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

pub fn sha256_file(path: &Path) -> Result<String, DownloadError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}
