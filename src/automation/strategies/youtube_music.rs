use super::Strategy;
use super::share_sheet::{ShareSheet, find_target_within};
use crate::automation::runner::{FlowContext, Next, Step, step};
use crate::automation::search::{clickable_nodes, find_node_with_exact_text, log_clickables};
use crate::automation::tree::{NodeId, UiTree};
use std::time::Duration;

pub const COLLAPSE_BUTTON_ID: &str = "com.google.android.apps.youtube.music:id/player_collapse_button";
const SHARE_WITH_OTHER_APPS: &str = "Share with other apps";
const DIALOG_SEARCH_TEXTS: &[&str] = &[
    "Share with other apps",
    "Other apps",
    "More apps",
    "See all",
    "More options",
    "Show all apps",
];
const MINI_PLAYER_DESCRIPTIONS: &[&str] = &["now playing", "mini player", "current song"];
const MINI_PLAYER_IDS: &[&str] = &["mini_player", "now_playing", "player_view", "bottom_player"];
const NAVIGATION_LABELS: &[&str] = &["home", "search", "library"];
const BOTTOM_CANDIDATES: usize = 5;
const SHARE_WITH_APPS_DEPTH: usize = 5;
const DIALOG_CLICK_DEPTH: usize = 8;
const NOW_PLAYING_DELAY: Duration = Duration::from_millis(1500);
const MENU_DELAY: Duration = Duration::from_millis(1500);
const SHARE_DIALOG_DELAY: Duration = Duration::from_millis(2500);
const CHOOSER_DELAY: Duration = Duration::from_millis(2000);
const EXPAND_DELAY: Duration = Duration::from_millis(4000);

/// Opens now playing, then walks the share menu down to the system chooser.
pub struct YouTubeMusicShare;

impl Strategy for YouTubeMusicShare {
    fn name(&self) -> &'static str {
        "youtube-music"
    }

    fn first_step(&self) -> Step {
        step(open_now_playing)
    }
}

fn open_now_playing(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };

    if !tree.find_by_view_id(COLLAPSE_BUTTON_ID).is_empty() {
        log::debug!("already on the full now-playing page");
        return Next::now(open_share_menu);
    }

    let clicked = find_mini_player(&tree).is_some_and(|mini| ctx.click(&tree[mini]));
    if clicked {
        ctx.toast("Mini player clicked, opening now playing...");
        Next::after(NOW_PLAYING_DELAY, open_share_menu)
    } else {
        log::debug!("mini player not found, sharing from the current page");
        Next::now(open_share_menu)
    }
}

pub fn find_mini_player(tree: &UiTree) -> Option<NodeId> {
    let clickables = clickable_nodes(tree);
    let by_identity = clickables.iter().copied().find(|id| {
        let node = &tree[*id];
        let desc = node.description.to_lowercase();
        let view_id = node.resource_id.as_str();
        MINI_PLAYER_DESCRIPTIONS.iter().any(|hint| desc.contains(hint))
            || MINI_PLAYER_IDS.iter().any(|hint| view_id.contains(hint))
            || ((desc.contains("play") || desc.contains("pause")) && view_id.contains("player"))
    });
    by_identity.or_else(|| bottom_most_clickable(tree, clickables))
}

fn bottom_most_clickable(tree: &UiTree, mut clickables: Vec<NodeId>) -> Option<NodeId> {
    clickables.sort_by_key(|id| std::cmp::Reverse(tree[*id].bounds.top));
    clickables.into_iter().take(BOTTOM_CANDIDATES).find(|id| {
        let node = &tree[*id];
        let desc = node.description.to_lowercase();
        let text = node.text.to_lowercase();
        !NAVIGATION_LABELS
            .iter()
            .any(|label| desc.contains(label) || text.contains(label))
    })
}

pub fn find_share_button(tree: &UiTree) -> Option<NodeId> {
    clickable_nodes(tree).into_iter().find(|id| {
        let node = &tree[*id];
        let desc = node.description.to_lowercase();
        let view_id = node.resource_id.as_str();
        let text = node.text.to_lowercase();
        ["share", "menu", "more"].iter().any(|hint| desc.contains(hint))
            || ["share", "menu", "overflow"]
                .iter()
                .any(|hint| view_id.contains(hint))
            || text.contains("share")
    })
}

fn open_share_menu(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };
    let Some(share) = find_share_button(&tree) else {
        ctx.toast("Share button not found");
        return Next::failed("Share button not found");
    };
    if !ctx.click(&tree[share]) {
        ctx.toast("Failed to click share button");
        return Next::failed("Failed to click share button");
    }
    ctx.toast("Share button clicked");
    Next::after(MENU_DELAY, share_with_other_apps)
}

fn share_with_other_apps(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };
    let clicked = find_node_with_exact_text(&tree, SHARE_WITH_OTHER_APPS)
        .is_some_and(|node| ctx.click_node_or_ancestors(&tree, node, SHARE_WITH_APPS_DEPTH));
    if clicked {
        ctx.toast("Share with other apps clicked!");
        return Next::After(CHOOSER_DELAY, ShareSheet.first_step());
    }
    log::debug!("'{SHARE_WITH_OTHER_APPS}' not clickable, looking for the plain share button");
    click_plain_share(ctx, &tree)
}

fn click_plain_share(ctx: &mut FlowContext<'_>, tree: &UiTree) -> Next {
    log_clickables(tree, "share menu");
    for id in clickable_nodes(tree) {
        let node = &tree[id];
        if node.description.eq_ignore_ascii_case("share") && ctx.click(node) {
            ctx.toast("Share button clicked, waiting for dialog...");
            return Next::after(SHARE_DIALOG_DELAY, search_share_dialog);
        }
    }
    ctx.toast("No share button found");
    Next::failed("No share button found")
}

fn search_share_dialog(ctx: &mut FlowContext<'_>) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };

    for text in DIALOG_SEARCH_TEXTS {
        let Some(first) = tree.find_by_text(text).first().copied() else {
            continue;
        };
        if ctx.click_node_or_ancestors(&tree, first, DIALOG_CLICK_DEPTH) {
            ctx.toast(&format!("{text} clicked!"));
            return Next::After(CHOOSER_DELAY, ShareSheet.first_step());
        }
    }

    log_clickables(&tree, "share dialog");
    for id in clickable_nodes(&tree) {
        let node = &tree[id];
        if is_expand_candidate(&node.text, &node.description, &node.resource_id) && ctx.click(node) {
            ctx.toast("Clicked expand option, waiting for full dialog...");
            return Next::after(EXPAND_DELAY, |ctx| {
                find_target_within(ctx, DIALOG_CLICK_DEPTH)
            });
        }
    }

    ctx.toast("Share with other apps not found in dialog");
    Next::failed("Share with other apps not found in dialog")
}

fn is_expand_candidate(text: &str, description: &str, view_id: &str) -> bool {
    let text = text.to_lowercase();
    let description = description.to_lowercase();
    ["other", "more", "all", "see"]
        .iter()
        .any(|hint| text.contains(hint) || description.contains(hint))
        || view_id.contains("more")
        || view_id.contains("expand")
}
