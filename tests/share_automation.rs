use anyhow::Result;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tunedrop::automation::gestures::{LEFT_ATTEMPTS, RIGHT_ATTEMPTS, Swipe};
use tunedrop::automation::{
    AutomationCommand, AutomationSession, AutomationWorker, Outcome, UiDriver, UiNode, UiTree,
};
use tunedrop::notify::RecordingNotifier;

const PLAYER: usize = 0;
const SHORT_CHOOSER: usize = 1;
const FULL_CHOOSER: usize = 2;
const BARE_CHOOSER: usize = 3;
const BROWSER: usize = 4;
const SCROLL_CHOOSER: usize = 5;
const MUSIC_MINI: usize = 6;
const MUSIC_NOW_PLAYING: usize = 7;
const MUSIC_SHARE_MENU: usize = 8;

const MUSIC: &str = "com.google.android.apps.youtube.music";

fn dump(package: &str, nodes: &str) -> UiTree {
    let xml = format!(
        r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node index="0" text="" resource-id="" class="android.widget.FrameLayout" package="{package}" content-desc="" clickable="false" enabled="true" scrollable="false" bounds="[0,0][1080,2400]">
    {nodes}
  </node>
</hierarchy>"#
    );
    UiTree::from_uiautomator_xml(&xml).expect("valid dump")
}

fn screens() -> Vec<UiTree> {
    vec![
        dump(
            "com.google.android.youtube",
            r#"<node index="0" text="" resource-id="" class="android.widget.Button" package="com.google.android.youtube" content-desc="Share" clickable="true" enabled="true" scrollable="false" bounds="[600,1200][760,1300]" />"#,
        ),
        dump(
            "android",
            r#"<node index="0" text="Messages" resource-id="" class="android.widget.TextView" package="android" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[40,1800][240,2000]" />
    <node index="1" text="More" resource-id="" class="android.widget.TextView" package="android" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[840,1800][1040,2000]" />"#,
        ),
        dump(
            "android",
            r#"<node index="0" text="" resource-id="android:id/resolver_item" class="android.widget.LinearLayout" package="android" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[40,1400][240,1600]">
      <node index="0" text="TuneDrop" resource-id="android:id/text1" class="android.widget.TextView" package="android" content-desc="" clickable="false" enabled="true" scrollable="false" bounds="[40,1540][240,1600]" />
    </node>"#,
        ),
        dump(
            "android",
            r#"<node index="0" text="Messages" resource-id="" class="android.widget.TextView" package="android" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[40,1800][240,2000]" />"#,
        ),
        dump(
            "com.android.chrome",
            r#"<node index="0" text="youtube.com/watch?v=abc" resource-id="com.android.chrome:id/url_bar" class="android.widget.EditText" package="com.android.chrome" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[100,50][900,150]" />"#,
        ),
        dump(
            "android",
            r#"<node index="0" text="" resource-id="android:id/resolver_list" class="androidx.recyclerview.widget.RecyclerView" package="android" content-desc="" clickable="false" enabled="true" scrollable="true" bounds="[0,1700][1080,2100]">
      <node index="0" text="Messages" resource-id="" class="android.widget.TextView" package="android" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[40,1800][240,2000]" />
    </node>"#,
        ),
        dump(
            MUSIC,
            r#"<node index="0" text="" resource-id="com.google.android.apps.youtube.music:id/mini_player" class="android.widget.FrameLayout" package="com.google.android.apps.youtube.music" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[0,2000][1080,2160]" />
    <node index="1" text="Home" resource-id="" class="android.widget.Button" package="com.google.android.apps.youtube.music" content-desc="Home" clickable="true" enabled="true" scrollable="false" bounds="[0,2200][360,2400]" />"#,
        ),
        dump(
            MUSIC,
            r#"<node index="0" text="" resource-id="com.google.android.apps.youtube.music:id/player_collapse_button" class="android.widget.ImageView" package="com.google.android.apps.youtube.music" content-desc="Minimize" clickable="true" enabled="true" scrollable="false" bounds="[20,80][140,200]" />
    <node index="1" text="" resource-id="com.google.android.apps.youtube.music:id/share_button" class="android.widget.Button" package="com.google.android.apps.youtube.music" content-desc="Share" clickable="true" enabled="true" scrollable="false" bounds="[900,1500][1040,1600]" />"#,
        ),
        dump(
            MUSIC,
            r#"<node index="0" text="" resource-id="com.google.android.apps.youtube.music:id/share_other_apps" class="android.widget.LinearLayout" package="com.google.android.apps.youtube.music" content-desc="" clickable="true" enabled="true" scrollable="false" bounds="[0,1900][1080,2000]">
      <node index="0" text="Share with other apps" resource-id="" class="android.widget.TextView" package="com.google.android.apps.youtube.music" content-desc="" clickable="false" enabled="true" scrollable="false" bounds="[120,1920][900,1980]" />
    </node>"#,
        ),
    ]
}

/// A device that moves between canned screens as the flow taps it.
struct ScriptedDevice {
    screens: Vec<UiTree>,
    current: usize,
    after_share: usize,
    reveal_after_swipes: Option<u32>,
    reveal_on_scroll: bool,
    clicks: Vec<String>,
    scrolls: u32,
    swipes: Vec<Swipe>,
}

impl ScriptedDevice {
    fn new(start: usize) -> Self {
        Self {
            screens: screens(),
            current: start,
            after_share: SHORT_CHOOSER,
            reveal_after_swipes: None,
            reveal_on_scroll: false,
            clicks: Vec::new(),
            scrolls: 0,
            swipes: Vec::new(),
        }
    }
}

impl UiDriver for ScriptedDevice {
    fn snapshot(&mut self) -> Result<UiTree> {
        Ok(self.screens[self.current].clone())
    }

    fn click(&mut self, node: &UiNode) -> Result<bool> {
        self.clicks.push(node.summary());
        if node.resource_id.ends_with(":id/mini_player") {
            self.current = MUSIC_NOW_PLAYING;
        } else if node.description == "Share" {
            self.current = self.after_share;
        } else if node.resource_id.ends_with(":id/share_other_apps") {
            self.current = SHORT_CHOOSER;
        } else if node.text == "More" {
            self.current = FULL_CHOOSER;
        }
        Ok(true)
    }

    fn scroll_forward(&mut self, _node: &UiNode) -> Result<bool> {
        self.scrolls += 1;
        if self.reveal_on_scroll {
            self.current = SHORT_CHOOSER;
        }
        Ok(self.reveal_on_scroll)
    }

    fn swipe(&mut self, swipe: &Swipe) -> Result<bool> {
        self.swipes.push(*swipe);
        if self.reveal_after_swipes == Some(self.swipes.len() as u32) {
            self.current = SHORT_CHOOSER;
        }
        Ok(true)
    }
}

/// Runs the flow to the end on a virtual clock, returning the outcome and elapsed time.
fn run_flow(
    session: &mut AutomationSession<ScriptedDevice>,
    command: AutomationCommand,
) -> (Outcome, Duration) {
    let start = Instant::now();
    if let Some(outcome) = session.handle(command, start) {
        return (outcome, Duration::ZERO);
    }
    while let Some(due) = session.next_due() {
        if let Some(outcome) = session.tick(due) {
            return (outcome, due - start);
        }
    }
    panic!("flow stopped without an outcome");
}

#[test]
fn youtube_share_expands_chooser_and_picks_target() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut session = AutomationSession::new(ScriptedDevice::new(PLAYER), notifier.clone(), "TuneDrop");

    let (outcome, elapsed) = run_flow(&mut session, AutomationCommand::Trigger);

    assert_eq!(outcome, Outcome::Shared("TuneDrop".to_string()));
    assert_eq!(elapsed, Duration::from_millis(4000));
    assert_eq!(
        notifier.toasts(),
        vec![
            "Share button clicked".to_string(),
            "More button clicked".to_string(),
            "TuneDrop app selected!".to_string(),
        ]
    );
    let clicks = &session.driver().clicks;
    assert_eq!(clicks.len(), 3);
    assert!(clicks[2].contains("android:id/resolver_item"));
    assert!(!session.is_busy());
}

#[test]
fn trigger_while_running_is_ignored() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut session = AutomationSession::new(ScriptedDevice::new(PLAYER), notifier.clone(), "TuneDrop");
    let now = Instant::now();

    assert_eq!(session.handle(AutomationCommand::Trigger, now), None);
    assert!(session.is_busy());
    assert_eq!(session.handle(AutomationCommand::Trigger, now), None);
    assert!(
        notifier
            .toasts()
            .contains(&"Share automation already running".to_string())
    );
}

#[test]
fn swipes_give_up_after_both_passes() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut device = ScriptedDevice::new(PLAYER);
    device.after_share = BARE_CHOOSER;
    let mut session = AutomationSession::new(device, notifier.clone(), "TuneDrop");

    let (outcome, _) = run_flow(&mut session, AutomationCommand::Trigger);

    let message = "Could not find More button after all swipe attempts";
    assert_eq!(outcome, Outcome::Failed(message.to_string()));
    assert_eq!(notifier.toasts().last(), Some(&message.to_string()));

    let swipes = &session.driver().swipes;
    assert_eq!(swipes.len() as u32, LEFT_ATTEMPTS + RIGHT_ATTEMPTS);
    let first = swipes[0];
    let last = swipes[swipes.len() - 1];
    assert!(first.start.x > first.end.x, "first pass swipes left");
    assert!(last.start.x < last.end.x, "second pass swipes right");
}

#[test]
fn swipe_that_reveals_more_continues_to_target() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut device = ScriptedDevice::new(PLAYER);
    device.after_share = BARE_CHOOSER;
    device.reveal_after_swipes = Some(3);
    let mut session = AutomationSession::new(device, notifier.clone(), "TuneDrop");

    let (outcome, _) = run_flow(&mut session, AutomationCommand::Trigger);

    assert_eq!(outcome, Outcome::Shared("TuneDrop".to_string()));
    assert_eq!(session.driver().swipes.len(), 3);
    assert!(
        notifier
            .toasts()
            .contains(&"Found More after full-screen left swipe".to_string())
    );
}

#[test]
fn scroll_forward_that_reveals_more_skips_the_swipes() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut device = ScriptedDevice::new(PLAYER);
    device.after_share = SCROLL_CHOOSER;
    device.reveal_on_scroll = true;
    let mut session = AutomationSession::new(device, notifier.clone(), "TuneDrop");

    let (outcome, elapsed) = run_flow(&mut session, AutomationCommand::Trigger);

    assert_eq!(outcome, Outcome::Shared("TuneDrop".to_string()));
    assert_eq!(elapsed, Duration::from_millis(6800));
    assert_eq!(
        notifier.toasts(),
        vec![
            "Share button clicked".to_string(),
            "More clicked after scroll-forward".to_string(),
            "TuneDrop app selected!".to_string(),
        ]
    );
    assert_eq!(session.driver().scrolls, 1);
    assert!(session.driver().swipes.is_empty());
}

#[test]
fn failed_scroll_falls_back_to_swipes() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut device = ScriptedDevice::new(PLAYER);
    device.after_share = SCROLL_CHOOSER;
    device.reveal_after_swipes = Some(1);
    let mut session = AutomationSession::new(device, notifier.clone(), "TuneDrop");

    let (outcome, _) = run_flow(&mut session, AutomationCommand::Trigger);

    assert_eq!(outcome, Outcome::Shared("TuneDrop".to_string()));
    assert_eq!(session.driver().scrolls, 1);
    assert_eq!(session.driver().swipes.len(), 1);
}

#[test]
fn youtube_music_opens_now_playing_and_hands_off_to_the_chooser() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut device = ScriptedDevice::new(MUSIC_MINI);
    device.after_share = MUSIC_SHARE_MENU;
    let mut session = AutomationSession::new(device, notifier.clone(), "TuneDrop");

    let (outcome, elapsed) = run_flow(&mut session, AutomationCommand::Trigger);

    assert_eq!(outcome, Outcome::Shared("TuneDrop".to_string()));
    assert_eq!(elapsed, Duration::from_millis(7000));
    assert_eq!(session.last_package(), Some(MUSIC));
    assert_eq!(
        notifier.toasts(),
        vec![
            "Mini player clicked, opening now playing...".to_string(),
            "Share button clicked".to_string(),
            "Share with other apps clicked!".to_string(),
            "More button clicked".to_string(),
            "TuneDrop app selected!".to_string(),
        ]
    );

    let clicks = &session.driver().clicks;
    assert_eq!(clicks.len(), 5);
    assert!(clicks[0].contains(":id/mini_player"));
    assert!(clicks[1].contains(":id/share_button"));
    assert!(clicks[2].contains(":id/share_other_apps"));
    assert!(clicks[3].contains("text='More'"));
    assert!(clicks[4].contains("android:id/resolver_item"));
}

#[test]
fn youtube_music_already_on_now_playing_goes_straight_to_share() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut device = ScriptedDevice::new(MUSIC_NOW_PLAYING);
    device.after_share = MUSIC_SHARE_MENU;
    let mut session = AutomationSession::new(device, notifier.clone(), "TuneDrop");

    let (outcome, elapsed) = run_flow(&mut session, AutomationCommand::Trigger);

    assert_eq!(outcome, Outcome::Shared("TuneDrop".to_string()));
    assert_eq!(elapsed, Duration::from_millis(5500));
    assert_eq!(notifier.toasts()[0], "Share button clicked");
    assert!(!session.driver().clicks[0].contains("player_collapse_button"));
}

#[test]
fn browser_url_is_captured_with_scheme() {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut session = AutomationSession::new(ScriptedDevice::new(BROWSER), notifier.clone(), "TuneDrop");

    let (outcome, elapsed) = run_flow(&mut session, AutomationCommand::FetchBrowserUrl);

    assert_eq!(
        outcome,
        Outcome::UrlCaptured("https://youtube.com/watch?v=abc".to_string())
    );
    assert_eq!(elapsed, Duration::ZERO);
    assert_eq!(notifier.toasts(), vec!["URL fetched".to_string()]);
    assert_eq!(session.last_package(), Some("com.android.chrome"));
}

#[test]
fn worker_thread_reports_outcomes() {
    let notifier = Arc::new(RecordingNotifier::new());
    let session = AutomationSession::new(ScriptedDevice::new(BROWSER), notifier, "TuneDrop");
    let (tx, rx) = mpsc::channel();
    let worker = AutomationWorker::spawn(session, tx, |outcome| outcome).expect("spawn");

    worker.fetch_browser_url();
    let outcome = rx.recv_timeout(Duration::from_secs(5)).expect("outcome");
    assert_eq!(
        outcome,
        Outcome::UrlCaptured("https://youtube.com/watch?v=abc".to_string())
    );
    worker.shutdown();
}
