use super::Strategy;
use super::share_sheet::ShareSheet;
use crate::automation::runner::{FlowContext, Next, Step, step};
use crate::automation::search::{find_node_by_description, log_clickables};
use std::time::Duration;

const SHARE_DESCRIPTION: &str = "Share";
const CLICK_DEPTH: usize = 6;
const DIALOG_DELAY: Duration = Duration::from_millis(2000);

/// Taps the player's Share button, then hands over to the chooser.
pub struct YouTubeShare;

impl Strategy for YouTubeShare {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn first_step(&self) -> Step {
        step(click_share)
    }
}

fn click_share(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };

    let clicked = find_node_by_description(&tree, SHARE_DESCRIPTION)
        .is_some_and(|share| ctx.click_node_or_ancestors(&tree, share, CLICK_DEPTH));
    if !clicked {
        ctx.toast("Share button not found");
        log_clickables(&tree, "youtube player");
        return Next::failed("Share button not found");
    }

    ctx.toast("Share button clicked");
    Next::After(DIALOG_DELAY, ShareSheet.first_step())
}
