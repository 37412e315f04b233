use super::driver::UiDriver;
use super::tree::{NodeId, UiNode, UiTree};
use crate::notify::Notifier;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The share target was selected in the chooser.
    Shared(String),
    UrlCaptured(String),
    Failed(String),
}

/// Everything a step may touch while it runs.
pub struct FlowContext<'a> {
    pub driver: &'a mut dyn UiDriver,
    pub notifier: &'a dyn Notifier,
    pub target_label: &'a str,
}

impl FlowContext<'_> {
    pub fn snapshot(&mut self) -> Option<UiTree> {
        match self.driver.snapshot() {
            Ok(tree) => Some(tree),
            Err(err) => {
                log::warn!("screen snapshot failed: {err:#}");
                None
            }
        }
    }

    pub fn toast(&self, message: &str) {
        log::info!("automation: {message}");
        self.notifier.toast(message);
    }

    pub fn click(&mut self, node: &UiNode) -> bool {
        match self.driver.click(node) {
            Ok(clicked) => clicked,
            Err(err) => {
                log::warn!("click failed on {}: {err:#}", node.summary());
                false
            }
        }
    }

    /// Clicks `id` or the nearest actionable ancestor within `max_depth` hops.
    pub fn click_node_or_ancestors(&mut self, tree: &UiTree, id: NodeId, max_depth: usize) -> bool {
        for (depth, candidate) in tree.ancestors(id).take(max_depth).enumerate() {
            let node = &tree[candidate];
            if node.is_actionable() && self.click(node) {
                log::debug!("clicked {} at ancestor depth {depth}", node.summary());
                return true;
            }
        }
        false
    }
}

pub type Step = Box<dyn FnOnce(&mut FlowContext<'_>) -> Next + Send>;

pub fn step<F>(f: F) -> Step
where
    F: FnOnce(&mut FlowContext<'_>) -> Next + Send + 'static,
{
    Box::new(f)
}

pub enum Next {
    After(Duration, Step),
    Done(Outcome),
}

impl Next {
    pub fn after<F>(delay: Duration, f: F) -> Self
    where
        F: FnOnce(&mut FlowContext<'_>) -> Next + Send + 'static,
    {
        Next::After(delay, step(f))
    }

    pub fn now<F>(f: F) -> Self
    where
        F: FnOnce(&mut FlowContext<'_>) -> Next + Send + 'static,
    {
        Next::After(Duration::ZERO, step(f))
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Next::Done(Outcome::Failed(reason.into()))
    }
}

struct Pending {
    flow: &'static str,
    due: Instant,
    step: Step,
}

/// Delayed-callback scheduler. Holds at most one flow.
#[derive(Default)]
pub struct FlowRunner {
    pending: Option<Pending>,
}

impl FlowRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn current_flow(&self) -> Option<&'static str> {
        self.pending.as_ref().map(|pending| pending.flow)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    /// Returns false when another flow is still in flight.
    pub fn start(&mut self, flow: &'static str, now: Instant, first: Step) -> bool {
        if self.is_busy() {
            return false;
        }
        log::info!("starting {flow} flow");
        self.pending = Some(Pending {
            flow,
            due: now,
            step: first,
        });
        true
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::info!("cancelled {} flow", pending.flow);
        }
    }

    /// Runs every step that is due at `now`.
    pub fn tick(&mut self, now: Instant, ctx: &mut FlowContext<'_>) -> Option<Outcome> {
        loop {
            if self.pending.as_ref()?.due > now {
                return None;
            }
            let Pending { flow, step, .. } = self.pending.take()?;
            match step(ctx) {
                Next::After(delay, next) => {
                    self.pending = Some(Pending {
                        flow,
                        due: now + delay,
                        step: next,
                    });
                }
                Next::Done(outcome) => {
                    log::info!("{flow} flow finished: {outcome:?}");
                    return Some(outcome);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::gestures::Swipe;
    use crate::notify::RecordingNotifier;
    use anyhow::Result;

    #[derive(Default)]
    struct CountingDriver {
        clicks: Vec<String>,
    }

    impl UiDriver for CountingDriver {
        fn snapshot(&mut self) -> Result<UiTree> {
            Ok(UiTree::new())
        }

        fn click(&mut self, node: &UiNode) -> Result<bool> {
            self.clicks.push(node.class_name.clone());
            Ok(true)
        }

        fn scroll_forward(&mut self, _node: &UiNode) -> Result<bool> {
            Ok(false)
        }

        fn swipe(&mut self, _swipe: &Swipe) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn steps_wait_for_their_delay() {
        let mut driver = CountingDriver::default();
        let notifier = RecordingNotifier::new();
        let mut ctx = FlowContext {
            driver: &mut driver,
            notifier: &notifier,
            target_label: "TuneDrop",
        };

        let start = Instant::now();
        let mut runner = FlowRunner::new();
        assert!(runner.start(
            "test",
            start,
            step(|ctx| {
                ctx.toast("first");
                Next::after(Duration::from_millis(100), |ctx| {
                    ctx.toast("second");
                    Next::now(|_| Next::Done(Outcome::Shared("x".to_string())))
                })
            }),
        ));
        assert!(!runner.start("other", start, step(|_| Next::failed("no"))));

        assert_eq!(runner.tick(start, &mut ctx), None);
        assert_eq!(runner.next_due(), Some(start + Duration::from_millis(100)));
        assert_eq!(runner.tick(start + Duration::from_millis(99), &mut ctx), None);
        assert_eq!(
            runner.tick(start + Duration::from_millis(100), &mut ctx),
            Some(Outcome::Shared("x".to_string()))
        );
        assert!(!runner.is_busy());
        assert_eq!(notifier.toasts(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn ancestor_walk_respects_depth() {
        let mut tree = UiTree::new();
        let root = tree.add(None, UiNode::new("root").clickable());
        let row = tree.add(Some(root), UiNode::new("row"));
        let label = tree.add(Some(row), UiNode::new("label"));

        let mut driver = CountingDriver::default();
        let notifier = RecordingNotifier::new();
        let mut ctx = FlowContext {
            driver: &mut driver,
            notifier: &notifier,
            target_label: "TuneDrop",
        };
        assert!(!ctx.click_node_or_ancestors(&tree, label, 2));
        assert!(ctx.click_node_or_ancestors(&tree, label, 3));
        assert_eq!(driver.clicks, vec!["root".to_string()]);
    }
}
