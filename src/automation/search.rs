use super::tree::{NodeId, UiTree};

const SCROLL_SEARCH_DEPTH: usize = 10;
const SCROLLABLE_CLASSES: &[&str] = &[
    "RecyclerView",
    "HorizontalScrollView",
    "ViewPager",
    "ScrollView",
];
const SHARE_CONTAINER_IDS: &[&str] = &["share", "resolver", "app", "chooser"];

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn find_node_with_text(tree: &UiTree, target: &str) -> Option<NodeId> {
    tree.preorder()
        .into_iter()
        .find(|id| contains_ignore_case(&tree[*id].text, target))
}

pub fn find_node_by_description(tree: &UiTree, target: &str) -> Option<NodeId> {
    tree.preorder()
        .into_iter()
        .find(|id| contains_ignore_case(&tree[*id].description, target))
}

pub fn find_node_with_exact_text(tree: &UiTree, target: &str) -> Option<NodeId> {
    tree.preorder()
        .into_iter()
        .find(|id| tree[*id].text.eq_ignore_ascii_case(target))
}

/// Text match first, description as the fallback.
pub fn find_text_or_description(tree: &UiTree, target: &str) -> Option<NodeId> {
    find_node_with_text(tree, target).or_else(|| find_node_by_description(tree, target))
}

/// First label in `labels` that is on screen, in the order given.
pub fn find_first_label<'a>(tree: &UiTree, labels: &[&'a str]) -> Option<(NodeId, &'a str)> {
    labels
        .iter()
        .find_map(|label| find_text_or_description(tree, label).map(|id| (id, *label)))
}

pub fn clickable_nodes(tree: &UiTree) -> Vec<NodeId> {
    tree.preorder()
        .into_iter()
        .filter(|id| tree[*id].is_actionable())
        .collect()
}

pub fn find_scrollable_container(tree: &UiTree) -> Option<NodeId> {
    let root = tree.root()?;
    find_scrollable_from(tree, root, 0)
}

fn find_scrollable_from(tree: &UiTree, id: NodeId, depth: usize) -> Option<NodeId> {
    if depth > SCROLL_SEARCH_DEPTH {
        return None;
    }
    let node = &tree[id];
    let scrolls = node.scrollable
        || SCROLLABLE_CLASSES
            .iter()
            .any(|class| node.class_name.contains(class));
    if scrolls {
        let id_lower = node.resource_id.to_lowercase();
        let share_related = SHARE_CONTAINER_IDS
            .iter()
            .any(|hint| id_lower.contains(hint));
        if share_related || node.children.len() > 3 {
            return Some(id);
        }
    }
    node.children
        .iter()
        .find_map(|child| find_scrollable_from(tree, *child, depth + 1))
}

/// Labels of the app buttons currently visible in a chooser.
pub fn visible_share_apps(tree: &UiTree) -> Vec<String> {
    tree.preorder()
        .into_iter()
        .map(|id| &tree[id])
        .filter(|node| node.class_name.contains("Button"))
        .filter_map(|node| {
            if !node.description.is_empty() {
                Some(node.description.clone())
            } else if !node.text.is_empty() {
                Some(node.text.clone())
            } else {
                None
            }
        })
        .collect()
}

pub fn log_clickables(tree: &UiTree, context: &str) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let clickables = clickable_nodes(tree);
    log::debug!("{context}: {} clickable nodes", clickables.len());
    for (index, id) in clickables.into_iter().enumerate() {
        log::debug!("  [{index}] {}", tree[id].summary());
    }
    log::debug!("{context}: visible apps {:?}", visible_share_apps(tree));
}
