use crate::links::extract_link;
use crate::notify::Notifier;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_POLL: Duration = Duration::from_millis(750);

pub trait ClipboardSource: Send {
    fn read_text(&mut self) -> Option<String>;
}

pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn open() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("clipboard unavailable")?;
        Ok(Self { inner })
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.inner.get_text().ok()
    }
}

/// Remembers the last clipboard text so each copy is reported once.
#[derive(Debug, Default)]
pub struct LinkSniffer {
    last_text: Option<String>,
}

impl LinkSniffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The YouTube link in `text` if the clipboard changed since the last call.
    pub fn observe(&mut self, text: &str) -> Option<String> {
        if self.last_text.as_deref() == Some(text) {
            return None;
        }
        self.last_text = Some(text.to_string());
        extract_link(text)
    }
}

pub struct ClipboardWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ClipboardWatcher {
    /// Polls the system clipboard and sends every newly copied YouTube link.
    pub fn spawn<T: Send + 'static>(
        interval: Duration,
        notifier: Arc<dyn Notifier>,
        sender: Sender<T>,
        wrap: fn(String) -> T,
    ) -> Result<Self> {
        let source = SystemClipboard::open()?;
        Self::spawn_with(source, interval, notifier, sender, wrap)
    }

    pub fn spawn_with<S, T>(
        mut source: S,
        interval: Duration,
        notifier: Arc<dyn Notifier>,
        sender: Sender<T>,
        wrap: fn(String) -> T,
    ) -> Result<Self>
    where
        S: ClipboardSource + 'static,
        T: Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("clipboard".to_string())
            .spawn(move || {
                let mut sniffer = LinkSniffer::new();
                // Whatever was copied before startup is not news.
                if let Some(text) = source.read_text() {
                    sniffer.observe(&text);
                }
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    let Some(text) = source.read_text() else {
                        continue;
                    };
                    let Some(link) = sniffer.observe(&text) else {
                        continue;
                    };
                    log::info!("clipboard link: {link}");
                    notifier.toast("YouTube link copied");
                    if sender.send(wrap(link)).is_err() {
                        break;
                    }
                }
            })
            .context("failed to start clipboard thread")?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ClipboardWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
