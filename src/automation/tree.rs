use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::ops::Index;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Bounds::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// uiautomator form: `[left,top][right,bottom]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let numbers: Vec<i32> = raw
            .split(|c: char| c == '[' || c == ']' || c == ',')
            .filter(|part| !part.is_empty())
            .map(|part| part.trim().parse().ok())
            .collect::<Option<Vec<i32>>>()?;
        match numbers.as_slice() {
            [left, top, right, bottom] => Some(Self::new(*left, *top, *right, *bottom)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiNode {
    pub text: String,
    pub description: String,
    pub resource_id: String,
    pub class_name: String,
    pub package: String,
    pub clickable: bool,
    pub enabled: bool,
    pub scrollable: bool,
    pub bounds: Bounds,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Default for UiNode {
    fn default() -> Self {
        Self {
            text: String::new(),
            description: String::new(),
            resource_id: String::new(),
            class_name: String::new(),
            package: String::new(),
            clickable: false,
            enabled: true,
            scrollable: false,
            bounds: Bounds::default(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl UiNode {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn id(mut self, resource_id: &str) -> Self {
        self.resource_id = resource_id.to_string();
        self
    }

    pub fn package(mut self, package: &str) -> Self {
        self.package = package.to_string();
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn bounds(mut self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.bounds = Bounds::new(left, top, right, bottom);
        self
    }

    pub fn is_actionable(&self) -> bool {
        self.clickable && self.enabled
    }

    pub fn summary(&self) -> String {
        format!(
            "text='{}', desc='{}', id='{}', class='{}'",
            self.text, self.description, self.resource_id, self.class_name
        )
    }
}

/// One screen's accessibility hierarchy. Node 0 is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiTree {
    nodes: Vec<UiNode>,
}

impl UiTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, parent: Option<NodeId>, mut node: UiNode) -> NodeId {
        let id = self.nodes.len();
        node.parent = parent.filter(|parent| *parent < id);
        node.children.clear();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&UiNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Package of the active window: the first node that reports one.
    pub fn package(&self) -> Option<&str> {
        self.preorder()
            .into_iter()
            .map(|id| self.nodes[id].package.as_str())
            .find(|package| !package.is_empty())
    }

    pub fn screen_bounds(&self) -> Bounds {
        self.root()
            .map(|root| self.nodes[root].bounds)
            .unwrap_or_default()
    }

    pub fn preorder(&self) -> Vec<NodeId> {
        self.root()
            .map(|root| self.preorder_from(root))
            .unwrap_or_default()
    }

    pub fn preorder_from(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// `id` itself, then its parent, up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(id).map(|_| id), move |current| {
            self.nodes[*current].parent
        })
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count().saturating_sub(1)
    }

    pub fn find_by_view_id(&self, view_id: &str) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.nodes[*id].resource_id == view_id)
            .collect()
    }

    /// Case-insensitive substring match on text or description.
    pub fn find_by_text(&self, needle: &str) -> Vec<NodeId> {
        let needle = needle.to_lowercase();
        self.preorder()
            .into_iter()
            .filter(|id| {
                let node = &self.nodes[*id];
                node.text.to_lowercase().contains(&needle)
                    || node.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn from_uiautomator_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut tree = UiTree::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut saw_hierarchy = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref element)) => match element.name().as_ref() {
                    b"hierarchy" => {
                        saw_hierarchy = true;
                        let root = tree.add(None, UiNode::new("hierarchy"));
                        stack.push(root);
                    }
                    b"node" => {
                        let id = tree.add(stack.last().copied(), node_from_element(element));
                        tree.widen_root(id);
                        stack.push(id);
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref element)) if element.name().as_ref() == b"node" => {
                    let id = tree.add(stack.last().copied(), node_from_element(element));
                    tree.widen_root(id);
                }
                Ok(Event::End(ref element))
                    if matches!(element.name().as_ref(), b"node" | b"hierarchy") =>
                {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(err).context("malformed uiautomator dump");
                }
            }
        }

        if !saw_hierarchy {
            bail!("uiautomator dump has no <hierarchy> element");
        }
        Ok(tree)
    }

    fn widen_root(&mut self, id: NodeId) {
        if id == 0 || self.nodes[id].parent != Some(0) {
            return;
        }
        let bounds = self.nodes[id].bounds;
        self.nodes[0].bounds = self.nodes[0].bounds.union(&bounds);
    }
}

impl Index<NodeId> for UiTree {
    type Output = UiNode;

    fn index(&self, id: NodeId) -> &UiNode {
        &self.nodes[id]
    }
}

fn node_from_element(element: &BytesStart<'_>) -> UiNode {
    let mut node = UiNode::default();
    for attr in element.attributes().flatten() {
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        match attr.key.as_ref() {
            b"text" => node.text = value,
            b"content-desc" => node.description = value,
            b"resource-id" => node.resource_id = value,
            b"class" => node.class_name = value,
            b"package" => node.package = value,
            b"clickable" => node.clickable = value == "true",
            b"enabled" => node.enabled = value == "true",
            b"scrollable" => node.scrollable = value == "true",
            b"bounds" => node.bounds = Bounds::parse(&value).unwrap_or_default(),
            _ => {}
        }
    }
    node
}
