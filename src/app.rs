use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine};
use crate::automation::{
    AdbDriver, AutomationCommand, AutomationSession, AutomationWorker, Outcome,
};
use crate::clipboard::{self, ClipboardWatcher};
use crate::config;
use crate::core::{DropCore, Tab};
use crate::download::DownloadPipeline;
use crate::links::SharedText;
use crate::notify::{ChannelNotifier, DesktopNotifier, Fanout, Feedback, LogNotifier, Notifier};
use crate::player::MediaSession;
use anyhow::{Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const APP_NAME: &str = "TuneDrop";
const SEEK_STEP_MS: u64 = 5_000;
const VOLUME_STEP: f32 = 0.05;

pub type Player = MediaSession<Box<dyn AudioEngine>>;

/// Work finished off the UI thread, applied on it.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Feedback(Feedback),
    ClipboardLink(String),
    Automation(Outcome),
}

/// Side effects the key and command handlers ask the loop to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Download(String),
    Automate,
    FetchBrowserUrl,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Command,
    Url,
}

#[derive(Debug, Default)]
pub struct InputState {
    pub mode: InputMode,
    pub command: String,
}

struct Services {
    pipeline: Arc<DownloadPipeline>,
    automation: AutomationWorker,
}

impl Services {
    fn perform(&self, core: &mut DropCore, action: Action) {
        match action {
            Action::Download(url) => {
                core.set_status(&format!("Downloading {url}"));
                let _ = self.pipeline.clone().spawn(url);
            }
            Action::Automate => self.automation.trigger(),
            Action::FetchBrowserUrl => self.automation.fetch_browser_url(),
            Action::Quit => {}
        }
    }
}

fn ui_notifier(events: Sender<AppEvent>) -> Fanout {
    Fanout::new()
        .with(Arc::new(ChannelNotifier::new(events, AppEvent::Feedback)))
        .with(Arc::new(DesktopNotifier::new(APP_NAME)))
        .with(Arc::new(LogNotifier))
}

fn headless_notifier() -> Arc<dyn Notifier> {
    Arc::new(
        Fanout::new()
            .with(Arc::new(DesktopNotifier::new(APP_NAME)))
            .with(Arc::new(LogNotifier)),
    )
}

fn open_audio() -> Box<dyn AudioEngine> {
    match RodioAudioEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            log::warn!("no audio output, playback is silent: {err:#}");
            Box::new(NullAudioEngine::new())
        }
    }
}

pub fn run() -> Result<()> {
    let state = config::load_state()?;
    let (events_tx, events_rx) = mpsc::channel();
    let notifier: Arc<dyn Notifier> = Arc::new(ui_notifier(events_tx.clone()));

    let pipeline = Arc::new(DownloadPipeline::from_state(&state, notifier.clone())?);
    let mut core = DropCore::from_persisted(
        state.clone(),
        pipeline.output_dir().to_path_buf(),
        notifier.clone(),
    );
    let mut player: Player =
        MediaSession::new(open_audio(), notifier.clone()).with_modes(state.shuffle, state.repeat);
    player.engine_mut().set_volume(state.saved_volume);

    let session = AutomationSession::new(
        AdbDriver::from_tools(&state.tools),
        notifier.clone(),
        state.share_target_label.clone(),
    );
    let automation = AutomationWorker::spawn(session, events_tx.clone(), AppEvent::Automation)?;
    let services = Services {
        pipeline,
        automation,
    };

    let _clipboard = match ClipboardWatcher::spawn(
        clipboard::DEFAULT_POLL,
        notifier.clone(),
        events_tx,
        AppEvent::ClipboardLink,
    ) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            log::warn!("clipboard watcher disabled: {err:#}");
            None
        }
    };

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut input = InputState::default();
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        for action in drain_events(&mut core, &events_rx) {
            services.perform(&mut core, action);
        }
        match player.tick() {
            Ok(true) => core.dirty = true,
            Ok(false) => {}
            Err(err) => core.set_status(&format!("playback error: {err:#}")),
        }

        if core.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            let player_state = player.state();
            let volume = player.engine().volume();
            terminal.draw(|frame| {
                crate::ui::draw(frame, &core, &player_state, volume, &input)
            })?;
            core.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match handle_key(&mut core, &mut player, &mut input, key) {
            Some(Action::Quit) => break Ok(()),
            Some(action) => services.perform(&mut core, action),
            None => {}
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    core.set_player_modes(player.shuffle(), player.repeat(), player.engine().volume());
    player.stop_and_clear();
    let save_result = core.save();
    result?;
    save_result?;
    Ok(())
}

pub fn drain_events(core: &mut DropCore, events: &Receiver<AppEvent>) -> Vec<Action> {
    let mut actions = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            AppEvent::Feedback(feedback) => core.apply_feedback(feedback),
            AppEvent::ClipboardLink(url) => {
                core.set_status(&format!("Copied link ready: {url} (press p)"));
                core.remember_url(url);
            }
            AppEvent::Automation(outcome) => {
                if let Some(url) = core.apply_outcome(outcome) {
                    actions.push(Action::Download(url));
                }
            }
        }
    }
    actions
}

pub fn handle_key(
    core: &mut DropCore,
    player: &mut Player,
    input: &mut InputState,
    key: KeyEvent,
) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match input.mode {
        InputMode::Command => {
            match key.code {
                KeyCode::Esc => {
                    input.mode = InputMode::Normal;
                    input.command.clear();
                }
                KeyCode::Enter => {
                    input.mode = InputMode::Normal;
                    let raw = std::mem::take(&mut input.command);
                    return run_command(core, player, &raw);
                }
                KeyCode::Backspace => {
                    input.command.pop();
                }
                KeyCode::Char(ch) => input.command.push(ch),
                _ => {}
            }
            core.dirty = true;
            return None;
        }
        InputMode::Url => {
            match key.code {
                KeyCode::Esc => input.mode = InputMode::Normal,
                KeyCode::Enter => {
                    input.mode = InputMode::Normal;
                    return core.take_url_input().map(Action::Download);
                }
                KeyCode::Backspace => {
                    core.url_input.pop();
                }
                KeyCode::Char(ch) => core.url_input.push(ch),
                _ => {}
            }
            core.dirty = true;
            return None;
        }
        InputMode::Normal => {}
    }

    match key.code {
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Tab => core.set_tab(core.tab.next()),
        KeyCode::BackTab => core.set_tab(core.tab.prev()),
        KeyCode::Char(digit @ '1'..='5') => {
            let index = digit as usize - '1' as usize;
            core.set_tab(Tab::ALL[index]);
        }
        KeyCode::Down | KeyCode::Char('j') => core.select_next(),
        KeyCode::Up | KeyCode::Char('k') => core.select_prev(),
        KeyCode::Enter => return activate(core, player),
        KeyCode::Char('i') => {
            core.set_tab(Tab::Home);
            input.mode = InputMode::Url;
        }
        KeyCode::Char('p') => return core.take_pending_url().map(Action::Download),
        KeyCode::Char(':') => {
            input.mode = InputMode::Command;
            core.dirty = true;
        }
        KeyCode::Char(' ') => report(core, player.toggle_play_pause()),
        KeyCode::Char('n') => report(core, player.skip_next()),
        KeyCode::Char('b') => report(core, player.skip_previous()),
        KeyCode::Char('s') => {
            let on = player.toggle_shuffle();
            core.set_status(if on { "Shuffle on" } else { "Shuffle off" });
        }
        KeyCode::Char('r') => {
            let on = player.toggle_repeat();
            core.set_status(if on { "Repeat on" } else { "Repeat off" });
        }
        KeyCode::Char('x') => {
            player.stop_and_clear();
            core.set_status("Playback stopped");
        }
        KeyCode::Char('d') => {
            player.dismiss_notification();
            core.set_status("Playback notification dismissed");
        }
        KeyCode::Left => {
            let position = player.state().position_ms.saturating_sub(SEEK_STEP_MS);
            report(core, player.seek_to(position));
        }
        KeyCode::Right => {
            let position = player.state().position_ms + SEEK_STEP_MS;
            report(core, player.seek_to(position));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => change_volume(core, player, VOLUME_STEP),
        KeyCode::Char('-') => change_volume(core, player, -VOLUME_STEP),
        KeyCode::Char('g') => return automate(core),
        KeyCode::Char('u') => return Some(Action::FetchBrowserUrl),
        KeyCode::Char('R') => core.rescan(),
        KeyCode::Char('S') => {
            if let Err(err) = core.save() {
                core.set_status(&format!("save error: {err:#}"));
            }
        }
        _ => {}
    }
    None
}

fn activate(core: &mut DropCore, player: &mut Player) -> Option<Action> {
    match core.tab {
        Tab::Home => core.take_pending_url().map(Action::Download),
        Tab::Downloads => {
            if let Some((queue, start)) = core.library_queue() {
                report(core, player.set_queue(&queue, start));
            } else {
                core.set_status("No downloads yet");
            }
            None
        }
        Tab::Playlists => {
            if let Some(id) = core.selected_playlist_id() {
                play_playlist(core, player, id);
            } else {
                core.set_status("No playlists yet");
            }
            None
        }
        Tab::Player => {
            report(core, player.toggle_play_pause());
            None
        }
        Tab::Settings => None,
    }
}

fn automate(core: &mut DropCore) -> Option<Action> {
    if !core.floating.is_enabled() {
        core.set_status("Floating button is off (:floating on)");
        return None;
    }
    core.set_status("Running share automation...");
    Some(Action::Automate)
}

fn play_playlist(core: &mut DropCore, player: &mut Player, id: u64) {
    if let Some(queue) = core.playlist_queue(id) {
        report(core, player.set_queue(&queue, 0));
    }
}

fn change_volume(core: &mut DropCore, player: &mut Player, delta: f32) {
    let next = (player.engine().volume() + delta).clamp(0.0, 2.0);
    player.engine_mut().set_volume(next);
    core.set_status(&format!("Volume: {}%", (next * 100.0).round() as u16));
}

fn report(core: &mut DropCore, result: Result<()>) {
    match result {
        Ok(()) => core.dirty = true,
        Err(err) => core.set_status(&format!("playback error: {err:#}")),
    }
}

pub fn run_command(core: &mut DropCore, player: &mut Player, raw: &str) -> Option<Action> {
    let input = raw.trim();
    if input.is_empty() {
        core.set_status("No command");
        return None;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => core.set_status(
            "Commands: download <url> | share <text> | playlist <new <name>|add <id>|play <id>> | automate | browser | floating <on|off|toggle> | rescan | save",
        ),
        "download" => {
            if rest.is_empty() {
                core.set_status("Usage: download <url>");
            } else {
                core.url_input = rest.to_string();
                return core.take_url_input().map(Action::Download);
            }
        }
        "share" => return core.accept_shared_text(rest).map(Action::Download),
        "playlist" => {
            let mut playlist_split = rest.splitn(2, char::is_whitespace);
            let action = playlist_split.next().unwrap_or_default();
            let argument = playlist_split.next().unwrap_or("").trim();
            if argument.is_empty() {
                core.set_status("Usage: playlist <new|add|play> <name|id>");
                return None;
            }
            match action {
                "new" => core.create_playlist(argument),
                "add" | "play" => {
                    let Ok(id) = argument.parse::<u64>() else {
                        core.set_status("Playlist id must be a number");
                        return None;
                    };
                    if action == "add" {
                        core.add_selected_to_playlist(id);
                    } else {
                        play_playlist(core, player, id);
                    }
                }
                _ => core.set_status("Usage: playlist <new|add|play> <name|id>"),
            }
        }
        "automate" => return automate(core),
        "browser" => return Some(Action::FetchBrowserUrl),
        "floating" => {
            match rest {
                "on" => core.floating.enable(),
                "off" => core.floating.disable(),
                "toggle" | "" => {
                    core.floating.toggle();
                }
                _ => {
                    core.set_status("Usage: floating <on|off|toggle>");
                    return None;
                }
            }
            let text = core.floating.status_text();
            core.set_status(text);
        }
        "rescan" => core.rescan(),
        "save" => {
            core.set_player_modes(player.shuffle(), player.repeat(), player.engine().volume());
            if let Err(err) = core.save() {
                core.set_status(&format!("save error: {err:#}"));
            }
        }
        "quit" => return Some(Action::Quit),
        _ => core.set_status("Unknown command. Use :help"),
    }
    None
}

/// `--download <url>`: one download in the foreground, logging to stderr.
pub fn run_download(url: &str) -> Result<()> {
    let state = config::load_state()?;
    let pipeline = DownloadPipeline::from_state(&state, headless_notifier())?;
    let outcome = pipeline.run(url)?;
    println!("{}", outcome.output.display());
    Ok(())
}

/// `--share <text>`: what the app does with text shared into it.
pub fn run_share(text: &str) -> Result<()> {
    match SharedText::classify(text) {
        SharedText::Download(url) => run_download(&url),
        SharedText::SearchRequest(query) => {
            log::info!("search request received: {query}");
            println!("search requests are not supported: {query}");
            Ok(())
        }
        SharedText::Unsupported(text) => bail!("no YouTube link in shared text: {text}"),
    }
}

/// `--automate` / `--browser`: run one automation flow to completion.
pub fn run_automation(command: AutomationCommand) -> Result<()> {
    let state = config::load_state()?;
    let mut session = AutomationSession::new(
        AdbDriver::from_tools(&state.tools),
        headless_notifier(),
        state.share_target_label.clone(),
    );
    match drive_to_completion(&mut session, command) {
        Some(Outcome::UrlCaptured(url)) => run_download(&url),
        Some(Outcome::Shared(target)) => {
            println!("shared to {target}");
            Ok(())
        }
        Some(Outcome::Failed(reason)) => bail!(reason),
        None => bail!("automation ended without a result"),
    }
}

pub fn drive_to_completion<D: crate::automation::UiDriver>(
    session: &mut AutomationSession<D>,
    command: AutomationCommand,
) -> Option<Outcome> {
    if let Some(outcome) = session.handle(command, Instant::now()) {
        return Some(outcome);
    }
    while let Some(due) = session.next_due() {
        thread::sleep(due.saturating_duration_since(Instant::now()));
        if let Some(outcome) = session.tick(Instant::now()) {
            return Some(outcome);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PersistedState;
    use crate::notify::RecordingNotifier;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn fixtures(dir: &Path) -> (DropCore, Player) {
        let notifier = Arc::new(RecordingNotifier::new());
        let core = DropCore::from_persisted(PersistedState::default(), dir.to_path_buf(), notifier.clone());
        let engine: Box<dyn AudioEngine> = Box::new(NullAudioEngine::new());
        (core, MediaSession::new(engine, notifier))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn unknown_command_is_reported() {
        let dir = tempdir().expect("tempdir");
        let (mut core, mut player) = fixtures(dir.path());
        assert_eq!(run_command(&mut core, &mut player, "wat"), None);
        assert!(core.status.contains("Unknown command"));
    }

    #[test]
    fn download_and_share_commands_yield_downloads() {
        let dir = tempdir().expect("tempdir");
        let (mut core, mut player) = fixtures(dir.path());
        assert_eq!(
            run_command(&mut core, &mut player, "download https://youtu.be/a"),
            Some(Action::Download("https://youtu.be/a".to_string()))
        );
        assert_eq!(
            run_command(&mut core, &mut player, "share look https://youtu.be/b"),
            Some(Action::Download("https://youtu.be/b".to_string()))
        );
        assert_eq!(run_command(&mut core, &mut player, "download"), None);
    }

    #[test]
    fn automation_needs_the_floating_button() {
        let dir = tempdir().expect("tempdir");
        let (mut core, mut player) = fixtures(dir.path());
        assert_eq!(run_command(&mut core, &mut player, "automate"), Some(Action::Automate));
        run_command(&mut core, &mut player, "floating off");
        assert_eq!(core.status, "Floating Button: OFF");

        let mut input = InputState::default();
        assert_eq!(
            handle_key(&mut core, &mut player, &mut input, press(KeyCode::Char('g'))),
            None
        );
        assert!(core.status.contains("Floating button is off"));
    }

    #[test]
    fn playlist_commands_build_and_play() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp3"), b"x").expect("write");
        let (mut core, mut player) = fixtures(dir.path());

        run_command(&mut core, &mut player, "playlist new Road Trip");
        let id = core.selected_playlist_id().expect("playlist");
        run_command(&mut core, &mut player, &format!("playlist add {id}"));
        run_command(&mut core, &mut player, &format!("playlist play {id}"));
        assert_eq!(player.queue().len(), 1);
        assert!(player.is_playing());

        run_command(&mut core, &mut player, "playlist play nope");
        assert_eq!(core.status, "Playlist id must be a number");
    }

    #[test]
    fn url_mode_collects_typed_url() {
        let dir = tempdir().expect("tempdir");
        let (mut core, mut player) = fixtures(dir.path());
        let mut input = InputState::default();

        handle_key(&mut core, &mut player, &mut input, press(KeyCode::Char('i')));
        assert_eq!(input.mode, InputMode::Url);
        for ch in "https://youtu.be/z".chars() {
            handle_key(&mut core, &mut player, &mut input, press(KeyCode::Char(ch)));
        }
        assert_eq!(
            handle_key(&mut core, &mut player, &mut input, press(KeyCode::Enter)),
            Some(Action::Download("https://youtu.be/z".to_string()))
        );
        assert_eq!(input.mode, InputMode::Normal);
    }

    #[test]
    fn captured_urls_become_downloads() {
        let dir = tempdir().expect("tempdir");
        let (mut core, _player) = fixtures(dir.path());
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::ClipboardLink("https://youtu.be/c".to_string()))
            .expect("send");
        tx.send(AppEvent::Automation(Outcome::UrlCaptured(
            "https://youtube.com/watch?v=d".to_string(),
        )))
        .expect("send");

        let actions = drain_events(&mut core, &rx);
        assert_eq!(
            actions,
            vec![Action::Download("https://youtube.com/watch?v=d".to_string())]
        );
        assert_eq!(core.pending_url.as_deref(), Some("https://youtube.com/watch?v=d"));
    }
}
