use super::Strategy;
use crate::automation::gestures::{RETRY_DELAY, SETTLE_DELAY, SwipePlan};
use crate::automation::runner::{FlowContext, Next, Outcome, Step, step};
use crate::automation::search::{
    find_first_label, find_scrollable_container, find_text_or_description, log_clickables,
};
use crate::automation::tree::UiTree;
use std::time::Duration;

pub const MORE_LABELS: &[&str] = &[
    "More",
    "More options",
    "See more",
    "View more",
    "Show more apps",
    "More apps",
    "Other apps",
    "Additional apps",
    "See all",
];
const CLICK_DEPTH: usize = 6;
const EXPANDED_DELAY: Duration = Duration::from_millis(2000);
const AFTER_SCROLL_EXPANDED_DELAY: Duration = Duration::from_millis(4000);

/// Picks the share target out of the system chooser, expanding it if needed.
pub struct ShareSheet;

impl Strategy for ShareSheet {
    fn name(&self) -> &'static str {
        "share-sheet"
    }

    fn first_step(&self) -> Step {
        step(handle_dialog)
    }
}

fn handle_dialog(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };

    if let Some(next) = click_target(ctx, &tree, CLICK_DEPTH) {
        return next;
    }

    if let Some((more, label)) = find_first_label(&tree, MORE_LABELS) {
        log::debug!("more button visible as '{label}'");
        if ctx.click_node_or_ancestors(&tree, more, CLICK_DEPTH) {
            ctx.toast("More button clicked");
            return Next::after(EXPANDED_DELAY, find_target);
        }
    }

    let Some(container) = find_scrollable_container(&tree) else {
        log::debug!("no scrollable share container, using full-screen swipes");
        return start_full_screen_swipes(&tree);
    };
    let node = &tree[container];
    if node.bounds.is_empty() {
        return start_full_screen_swipes(&tree);
    }

    let scrolled = match ctx.driver.scroll_forward(node) {
        Ok(scrolled) => scrolled,
        Err(err) => {
            log::warn!("scroll forward failed: {err:#}");
            false
        }
    };
    if scrolled {
        Next::after(SETTLE_DELAY, check_after_scroll)
    } else {
        start_full_screen_swipes(&tree)
    }
}

fn check_after_scroll(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };
    if let Some((more, _)) = find_first_label(&tree, MORE_LABELS)
        && ctx.click_node_or_ancestors(&tree, more, CLICK_DEPTH)
    {
        ctx.toast("More clicked after scroll-forward");
        return Next::after(AFTER_SCROLL_EXPANDED_DELAY, find_target);
    }
    if let Some(next) = click_target(ctx, &tree, CLICK_DEPTH) {
        return next;
    }
    log::debug!("nothing new after scroll-forward");
    start_full_screen_swipes(&tree)
}

#[derive(Debug, Clone, Copy)]
struct SwipeCursor {
    plans: [SwipePlan; 2],
    pass: usize,
    attempt: u32,
}

impl SwipeCursor {
    fn advance(mut self) -> Option<Self> {
        self.attempt += 1;
        if self.attempt >= self.plans[self.pass].attempts {
            self.pass += 1;
            self.attempt = 0;
        }
        (self.pass < self.plans.len()).then_some(self)
    }
}

fn start_full_screen_swipes(tree: &UiTree) -> Next {
    let cursor = SwipeCursor {
        plans: SwipePlan::full_screen(tree.screen_bounds()),
        pass: 0,
        attempt: 0,
    };
    Next::now(move |ctx| swipe_attempt(ctx, cursor))
}

fn swipe_attempt(ctx: &mut FlowContext<'_>, cursor: SwipeCursor) -> Next {
    let plan = cursor.plans[cursor.pass];
    let swipe = plan.swipe_for_attempt(cursor.attempt);
    log::debug!(
        "full-screen {} swipe {}/{}",
        plan.direction.label(),
        cursor.attempt + 1,
        plan.attempts
    );

    let dispatched = match ctx.driver.swipe(&swipe) {
        Ok(dispatched) => dispatched,
        Err(err) => {
            log::warn!("swipe dispatch failed: {err:#}");
            false
        }
    };
    if dispatched {
        return Next::after(SETTLE_DELAY, move |ctx| check_after_swipe(ctx, cursor));
    }
    match cursor.advance() {
        Some(next) => Next::after(RETRY_DELAY, move |ctx| swipe_attempt(ctx, next)),
        None => swipes_exhausted(ctx),
    }
}

fn check_after_swipe(ctx: &mut FlowContext<'_>, cursor: SwipeCursor) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };
    let direction = cursor.plans[cursor.pass].direction.label();

    if let Some((more, _)) = find_first_label(&tree, MORE_LABELS)
        && ctx.click_node_or_ancestors(&tree, more, CLICK_DEPTH)
    {
        ctx.toast(&format!("Found More after full-screen {direction} swipe"));
        return Next::after(EXPANDED_DELAY, find_target);
    }
    if let Some(next) = click_target(ctx, &tree, CLICK_DEPTH) {
        return next;
    }

    match cursor.advance() {
        Some(next) => Next::now(move |ctx| swipe_attempt(ctx, next)),
        None => {
            log_clickables(&tree, "after swipes");
            swipes_exhausted(ctx)
        }
    }
}

fn swipes_exhausted(ctx: &mut FlowContext<'_>) -> Next {
    let message = "Could not find More button after all swipe attempts";
    ctx.toast(message);
    Next::failed(message)
}

/// Looks for the share target in an expanded chooser.
pub fn find_target(ctx: &mut FlowContext<'_>) -> Next {
    find_target_within(ctx, CLICK_DEPTH)
}

pub fn find_target_within(ctx: &mut FlowContext<'_>, depth: usize) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };
    if let Some(next) = click_target(ctx, &tree, depth) {
        return next;
    }
    let message = format!("{} app not found in share dialog", ctx.target_label);
    ctx.toast(&message);
    log_clickables(&tree, "share dialog");
    Next::failed(message)
}

/// Clicks the target app if it is on screen.
fn click_target(ctx: &mut FlowContext<'_>, tree: &UiTree, depth: usize) -> Option<Next> {
    let label = ctx.target_label.to_string();
    let target = find_text_or_description(tree, &label)?;
    if !ctx.click_node_or_ancestors(tree, target, depth) {
        log::debug!("target '{label}' visible but not clickable");
        return None;
    }
    ctx.toast(&format!("{label} app selected!"));
    Some(Next::Done(Outcome::Shared(label)))
}
