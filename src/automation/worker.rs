use super::driver::UiDriver;
use super::runner::{FlowContext, FlowRunner, Outcome};
use super::strategies::{BrowserUrlBar, Strategy, strategy_for};
use super::tree::UiTree;
use crate::notify::Notifier;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationCommand {
    /// Floating button press: run the share flow for the foreground app.
    Trigger,
    FetchBrowserUrl,
    Shutdown,
}

/// Active-window package, remembering the last one seen.
#[derive(Debug, Default)]
pub struct ForegroundTracker {
    last_package: Option<String>,
}

impl ForegroundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_package(&self) -> Option<&str> {
        self.last_package.as_deref()
    }

    pub fn observe(&mut self, package: &str) {
        if !package.is_empty() {
            self.last_package = Some(package.to_string());
        }
    }

    pub fn resolve(&mut self, tree: &UiTree, driver: &mut dyn UiDriver) -> Option<String> {
        let focused = match tree.package() {
            Some(package) => Some(package.to_string()),
            None => driver.focused_package().unwrap_or_else(|err| {
                log::debug!("focused package lookup failed: {err:#}");
                None
            }),
        };
        if let Some(package) = &focused {
            self.observe(package);
        }
        self.last_package.clone()
    }
}

/// Driver, scheduler and foreground state for one device.
pub struct AutomationSession<D: UiDriver> {
    driver: D,
    runner: FlowRunner,
    tracker: ForegroundTracker,
    notifier: Arc<dyn Notifier>,
    target_label: String,
}

impl<D: UiDriver> AutomationSession<D> {
    pub fn new(driver: D, notifier: Arc<dyn Notifier>, target_label: impl Into<String>) -> Self {
        Self {
            driver,
            runner: FlowRunner::new(),
            tracker: ForegroundTracker::new(),
            notifier,
            target_label: target_label.into(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn is_busy(&self) -> bool {
        self.runner.is_busy()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.runner.next_due()
    }

    pub fn last_package(&self) -> Option<&str> {
        self.tracker.last_package()
    }

    pub fn handle(&mut self, command: AutomationCommand, now: Instant) -> Option<Outcome> {
        match command {
            AutomationCommand::Trigger => self.trigger(now),
            AutomationCommand::FetchBrowserUrl => self.fetch_browser_url(now),
            AutomationCommand::Shutdown => {
                self.runner.cancel();
                None
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<Outcome> {
        let mut ctx = FlowContext {
            driver: &mut self.driver,
            notifier: self.notifier.as_ref(),
            target_label: &self.target_label,
        };
        self.runner.tick(now, &mut ctx)
    }

    fn trigger(&mut self, now: Instant) -> Option<Outcome> {
        if let Some(flow) = self.runner.current_flow() {
            self.notifier.toast("Share automation already running");
            log::info!("ignoring trigger while {flow} flow is running");
            return None;
        }
        let package = match self.foreground_package() {
            Ok(package) => package,
            Err(reason) => return Some(self.reject(reason)),
        };
        match strategy_for(package.as_deref()) {
            Ok(strategy) => self.start(strategy.as_ref(), now),
            Err(reason) => Some(self.reject(reason)),
        }
    }

    fn fetch_browser_url(&mut self, now: Instant) -> Option<Outcome> {
        if self.runner.is_busy() {
            self.notifier.toast("Share automation already running");
            return None;
        }
        match self.foreground_package() {
            Ok(Some(package)) => self.start(&BrowserUrlBar::new(package), now),
            Ok(None) => Some(self.reject("Could not detect current app".to_string())),
            Err(reason) => Some(self.reject(reason)),
        }
    }

    fn start(&mut self, strategy: &dyn Strategy, now: Instant) -> Option<Outcome> {
        self.runner.start(strategy.name(), now, strategy.first_step());
        self.tick(now)
    }

    fn foreground_package(&mut self) -> Result<Option<String>, String> {
        let tree = self
            .driver
            .snapshot()
            .map_err(|err| format!("Could not read screen: {err:#}"))?;
        Ok(self.tracker.resolve(&tree, &mut self.driver))
    }

    fn reject(&self, reason: String) -> Outcome {
        log::warn!("automation: {reason}");
        self.notifier.toast(&reason);
        Outcome::Failed(reason)
    }
}

/// Background thread owning an `AutomationSession`.
pub struct AutomationWorker {
    commands: Sender<AutomationCommand>,
    handle: Option<JoinHandle<()>>,
}

impl AutomationWorker {
    pub fn spawn<D, T>(
        session: AutomationSession<D>,
        reports: Sender<T>,
        wrap: fn(Outcome) -> T,
    ) -> Result<Self>
    where
        D: UiDriver + 'static,
        T: Send + 'static,
    {
        let (commands, inbox) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("automation".to_string())
            .spawn(move || run_worker(session, inbox, reports, wrap))
            .context("failed to start automation thread")?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    pub fn trigger(&self) {
        self.send(AutomationCommand::Trigger);
    }

    pub fn fetch_browser_url(&self) {
        self.send(AutomationCommand::FetchBrowserUrl);
    }

    fn send(&self, command: AutomationCommand) {
        if self.commands.send(command).is_err() {
            log::warn!("automation thread is gone; dropped {command:?}");
        }
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(AutomationCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AutomationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<D: UiDriver, T>(
    mut session: AutomationSession<D>,
    inbox: Receiver<AutomationCommand>,
    reports: Sender<T>,
    wrap: fn(Outcome) -> T,
) {
    loop {
        let command = match session.next_due() {
            Some(due) => {
                let wait = due.saturating_duration_since(Instant::now());
                match inbox.recv_timeout(wait) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match inbox.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        let outcome = match command {
            Some(AutomationCommand::Shutdown) => break,
            Some(command) => session.handle(command, Instant::now()),
            None => session.tick(Instant::now()),
        };
        if let Some(outcome) = outcome
            && reports.send(wrap(outcome)).is_err()
        {
            break;
        }
    }
    log::debug!("automation thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::gestures::Swipe;
    use crate::automation::tree::UiNode;
    use crate::notify::RecordingNotifier;
    use std::time::Duration;

    struct StaticDriver {
        tree: UiTree,
    }

    impl UiDriver for StaticDriver {
        fn snapshot(&mut self) -> Result<UiTree> {
            Ok(self.tree.clone())
        }

        fn click(&mut self, _node: &UiNode) -> Result<bool> {
            Ok(true)
        }

        fn scroll_forward(&mut self, _node: &UiNode) -> Result<bool> {
            Ok(false)
        }

        fn swipe(&mut self, _swipe: &Swipe) -> Result<bool> {
            Ok(true)
        }

        fn focused_package(&mut self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn screen(package: &str) -> UiTree {
        let mut tree = UiTree::new();
        tree.add(None, UiNode::new("FrameLayout").package(package));
        tree
    }

    #[test]
    fn tracker_falls_back_to_last_package() {
        let mut tracker = ForegroundTracker::new();
        let mut driver = StaticDriver { tree: UiTree::new() };
        assert_eq!(tracker.resolve(&screen("com.a"), &mut driver), Some("com.a".to_string()));
        assert_eq!(tracker.resolve(&UiTree::new(), &mut driver), Some("com.a".to_string()));
    }

    #[test]
    fn unsupported_app_is_rejected_with_toast() {
        let notifier = Arc::new(RecordingNotifier::new());
        let driver = StaticDriver {
            tree: screen("com.spotify.music"),
        };
        let mut session = AutomationSession::new(driver, notifier.clone(), "TuneDrop");
        let outcome = session.handle(AutomationCommand::Trigger, Instant::now());
        assert_eq!(
            outcome,
            Some(Outcome::Failed("Unsupported app: com.spotify.music".to_string()))
        );
        assert_eq!(notifier.toasts(), vec!["Unsupported app: com.spotify.music".to_string()]);
        assert!(!session.is_busy());
    }

    #[test]
    fn worker_reports_outcomes_over_the_channel() {
        let notifier = Arc::new(RecordingNotifier::new());
        let driver = StaticDriver { tree: UiTree::new() };
        let session = AutomationSession::new(driver, notifier, "TuneDrop");
        let (tx, rx) = mpsc::channel();
        let worker = AutomationWorker::spawn(session, tx, |outcome| outcome).expect("spawn");

        worker.trigger();
        let outcome = rx.recv_timeout(Duration::from_secs(5)).expect("outcome");
        assert_eq!(outcome, Outcome::Failed("Could not detect current app".to_string()));
        worker.shutdown();
    }
}
