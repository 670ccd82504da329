//! The rendering-surface tree.
//!
//! A single [`Document`] arena holds both the live surface and any number of
//! detached subtrees (fetched markup lives here until mount, cached source
//! trees stay here between mounts). Nodes are addressed by [`NodeId`]; a
//! node with no parent is detached.
//!
//! The parser is deliberately permissive tag soup: unknown tags nest,
//! mismatched close tags are skipped, script/style bodies are captured as
//! raw text. Markup with no parseable content degrades to an empty
//! fragment rather than an error.

use std::collections::HashMap;

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

type TextObserver = Box<dyn FnOnce(&mut Document, NodeId) + Send>;

/// Tag used for detached batch containers, mirroring a document fragment:
/// appending one moves its children, never the container itself.
pub const FRAGMENT_TAG: &str = "#fragment";

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Node arena backing the rendering surface.
#[derive(Default)]
pub struct Document {
    nodes: Vec<Option<NodeData>>,
    text_observers: HashMap<NodeId, TextObserver>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        self.nodes[id.0].as_ref().expect("node was dropped")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.nodes[id.0].as_mut().expect("node was dropped")
    }

    // ================================================================
    // Construction
    // ================================================================

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Creates a detached batch container.
    pub fn create_fragment(&mut self) -> NodeId {
        self.create_element(FRAGMENT_TAG)
    }

    // ================================================================
    // Inspection
    // ================================================================

    /// Whether the node is still allocated in the arena.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.is_some())
    }

    /// Element tag name, or `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let NodeKind::Element { attrs, .. } = &mut self.node_mut(id).kind {
            if let Some(slot) = attrs.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = value.into();
            } else {
                attrs.push((name, value.into()));
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children.clone()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &self.node(id).children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Depth-first search for the first element with the given tag,
    /// starting below `root`.
    pub fn find_first(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        for child in &self.node(root).children {
            if self.tag(*child) == Some(tag) {
                return Some(*child);
            }
            if let Some(found) = self.find_first(*child, tag) {
                return Some(found);
            }
        }
        None
    }

    // ================================================================
    // Mutation
    // ================================================================

    pub fn rename(&mut self, id: NodeId, new_tag: impl Into<String>) {
        if let NodeKind::Element { tag, .. } = &mut self.node_mut(id).kind {
            *tag = new_tag.into();
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.insert(0, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Detaches the node from its parent; the subtree stays allocated.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|c| *c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Detaches and frees the whole subtree, including pending observers.
    pub fn drop_subtree(&mut self, id: NodeId) {
        self.detach(id);
        self.free(id);
    }

    fn free(&mut self, id: NodeId) {
        self.text_observers.remove(&id);
        if let Some(data) = self.nodes[id.0].take() {
            for child in data.children {
                self.free(child);
            }
        }
    }

    /// Replaces the node's content with a single text child. Fires a
    /// pending one-shot observer after the mutation is applied.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id) {
            self.drop_subtree(child);
        }
        let child = self.create_text(text);
        self.append_child(id, child);

        if let Some(observer) = self.text_observers.remove(&id) {
            observer(self, id);
        }
    }

    /// Registers a one-shot observer fired on the next [`set_text`] for this
    /// node. The observer is removed before it runs, so a `set_text` from
    /// inside the callback does not re-enter it.
    ///
    /// [`set_text`]: Document::set_text
    pub fn observe_text_once(
        &mut self,
        id: NodeId,
        observer: impl FnOnce(&mut Document, NodeId) + Send + 'static,
    ) {
        self.text_observers.insert(id, Box::new(observer));
    }

    /// Deep-copies a subtree into a new detached tree. Observers are not
    /// copied.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let copy = match self.node(id).kind.clone() {
            NodeKind::Element { tag, attrs } => {
                let new_id = self.create_element(tag);
                if let NodeKind::Element { attrs: slot, .. } = &mut self.node_mut(new_id).kind {
                    *slot = attrs;
                }
                new_id
            }
            NodeKind::Text(text) => self.create_text(text),
        };
        for child in self.children(id) {
            let child_copy = self.clone_subtree(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Moves every child of `fragment` under `container` in one operation
    /// and frees the emptied fragment container.
    pub fn append_fragment(&mut self, container: NodeId, fragment: NodeId) {
        for child in self.children(fragment) {
            self.append_child(container, child);
        }
        self.drop_subtree(fragment);
    }

    // ================================================================
    // Parsing / serialization
    // ================================================================

    /// Parses markup into a detached fragment and returns its container.
    pub fn parse_fragment(&mut self, html: &str) -> NodeId {
        let root = self.create_fragment();
        let mut stack = vec![root];
        let mut rest = html;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("<!--") {
                rest = match after.find("-->") {
                    Some(end) => &after[end + 3..],
                    None => "",
                };
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                rest = match rest.find('>') {
                    Some(end) => &rest[end + 1..],
                    None => "",
                };
            } else if let Some(after) = rest.strip_prefix("</") {
                let end = after.find('>').unwrap_or(after.len());
                let name = after[..end].trim().to_ascii_lowercase();
                rest = &after[(end + 1).min(after.len())..];
                if let Some(pos) = stack.iter().rposition(|id| self.tag(*id) == Some(name.as_str())) {
                    if pos > 0 {
                        stack.truncate(pos);
                    }
                }
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                rest = self.parse_tag(&rest[1..], &mut stack);
            } else {
                let end = rest[1..].find('<').map(|i| i + 1).unwrap_or(rest.len());
                let text = &rest[..end];
                if !text.trim().is_empty() {
                    let node = self.create_text(text);
                    let top = *stack.last().unwrap();
                    self.append_child(top, node);
                }
                rest = &rest[end..];
            }
        }
        root
    }

    /// Parses one open tag (name already confirmed to start with a letter,
    /// `rest` begins at the name). Returns the remaining input.
    fn parse_tag<'a>(&mut self, rest: &'a str, stack: &mut Vec<NodeId>) -> &'a str {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        let mut rest = &rest[name_end..];

        let element = self.create_element(name.clone());
        let mut self_closing = false;

        // Attributes up to the closing bracket.
        loop {
            rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix("/>") {
                self_closing = true;
                rest = after;
                break;
            }
            if let Some(after) = rest.strip_prefix('>') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                break;
            }
            let attr_end = rest
                .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len());
            if attr_end == 0 && !rest.starts_with('=') {
                // Stray slash or other junk between attributes.
                rest = &rest[1..];
                continue;
            }
            let attr_name = rest[..attr_end].to_ascii_lowercase();
            rest = rest[attr_end..].trim_start();

            let value;
            if let Some(after) = rest.strip_prefix('=') {
                let after = after.trim_start();
                if let Some(quote @ ('"' | '\'')) = after.chars().next() {
                    let quoted = &after[1..];
                    let end = quoted.find(quote).unwrap_or(quoted.len());
                    value = quoted[..end].to_string();
                    rest = &quoted[(end + 1).min(quoted.len())..];
                } else {
                    let end = after
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(after.len());
                    value = after[..end].to_string();
                    rest = &after[end..];
                }
            } else {
                value = String::new();
            }
            if !attr_name.is_empty() {
                self.set_attr(element, attr_name, value);
            }
        }

        let top = *stack.last().unwrap();
        self.append_child(top, element);

        if self_closing || VOID_TAGS.contains(&name.as_str()) {
            return rest;
        }

        if RAW_TEXT_TAGS.contains(&name.as_str()) {
            // Raw text until the matching close tag.
            let close = format!("</{name}");
            let lower = rest.to_ascii_lowercase();
            let end = lower.find(&close).unwrap_or(rest.len());
            if !rest[..end].is_empty() {
                let text = self.create_text(&rest[..end]);
                self.append_child(element, text);
            }
            rest = &rest[end..];
            if let Some(after) = rest.strip_prefix(&close) {
                rest = match after.find('>') {
                    Some(i) => &after[i + 1..],
                    None => "",
                };
            }
            return rest;
        }

        stack.push(element);
        rest
    }

    /// Serializes a subtree back to markup. Fragment containers render
    /// their children only.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render(id, &mut out);
        out
    }

    fn render(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, attrs } => {
                if tag == FRAGMENT_TAG {
                    for child in &self.node(id).children {
                        self.render(*child, out);
                    }
                    return;
                }
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    if value.is_empty() {
                        out.push_str(&format!(" {name}"));
                    } else {
                        out.push_str(&format!(" {name}=\"{value}\""));
                    }
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &self.node(id).children {
                    self.render(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}
