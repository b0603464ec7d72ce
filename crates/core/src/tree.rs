//! The concrete syntax tree.
//!
//! A [`Tree`] owns a flat arena of nodes addressed by [`NodeId`]. Child lists
//! are contiguous runs in a shared edge vector, so a node is five words and a
//! tree has no internal pointers. [`Node`] is a cheap `Copy` cursor pairing a
//! tree reference with an id.
//!
//! Hidden and auxiliary grammar symbols never get arena entries; the parser
//! splices their children into the enclosing node before calling
//! [`TreeBuilder::node`].

use crate::lexer::Span;
use crate::symbol::{Symbol, TokenKind};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    symbol: Symbol,
    span: Span,
    first_child: u32,
    child_count: u32,
    /// Built by forced completion rather than a normal reduction.
    incomplete: bool,
    /// `incomplete` here or anywhere below.
    has_error: bool,
}

/// Appends nodes bottom-up while a parse runs.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
    edges: Vec<NodeId>,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn leaf(&mut self, kind: TokenKind, span: Span) -> NodeId {
        self.push(NodeData {
            symbol: kind.symbol(),
            span,
            first_child: self.edges.len() as u32,
            child_count: 0,
            incomplete: false,
            has_error: false,
        })
    }

    /// Add an interior node over `children`, which must already be in the arena.
    pub(crate) fn node(
        &mut self,
        symbol: Symbol,
        children: &[NodeId],
        span: Span,
        incomplete: bool,
    ) -> NodeId {
        let has_error =
            incomplete || children.iter().any(|c| self.nodes[c.index()].has_error);
        let first_child = self.edges.len() as u32;
        self.edges.extend_from_slice(children);
        self.push(NodeData {
            symbol,
            span,
            first_child,
            child_count: children.len() as u32,
            incomplete,
            has_error,
        })
    }

    /// The span covering `children`, or `None` when there are none.
    pub(crate) fn span_of(&self, children: &[NodeId]) -> Option<Span> {
        let first = children.first()?;
        let last = children.last()?;
        Some(Span::new(
            self.nodes[first.index()].span.start,
            self.nodes[last.index()].span.end,
        ))
    }

    pub(crate) fn finish(self, source: String, root: NodeId) -> Tree {
        Tree {
            source,
            nodes: self.nodes,
            edges: self.edges,
            root,
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId((self.nodes.len() - 1) as u32)
    }
}

// ──────────────────────────────────────────────
// Tree
// ──────────────────────────────────────────────

/// A parsed source file. Immutable once returned from `parse`.
#[derive(Debug, Clone)]
pub struct Tree {
    source: String,
    nodes: Vec<NodeData>,
    edges: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    /// The `source_file` node.
    pub fn root(&self) -> Node<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of nodes in the arena, tokens included. Nodes orphaned by a
    /// stack collapse during recovery are counted too.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Named nodes only: `(source_file (variable_definition (identifier) (number)))`.
    pub fn to_sexp(&self) -> String {
        self.root().to_sexp()
    }

    /// Every node, with anonymous tokens quoted: `(variable_definition (identifier) "=" ...)`.
    pub fn to_sexp_all(&self) -> String {
        let mut out = String::new();
        write_sexp(self.root(), true, &mut out);
        out
    }

    /// The source tokens in order, separated by single spaces.
    pub fn minimal_text(&self) -> String {
        let mut out = String::new();
        for node in self.root().descendants().filter(|n| n.is_token()) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(node.text());
        }
        out
    }

    pub fn to_json_value(&self) -> Value {
        node_json(self.root())
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn children_of(&self, id: NodeId) -> &[NodeId] {
        let data = self.data(id);
        let start = data.first_child as usize;
        &self.edges[start..start + data.child_count as usize]
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sexp())
    }
}

// ──────────────────────────────────────────────
// Node
// ──────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> Node<'t> {
    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn symbol(self) -> Symbol {
        self.data().symbol
    }

    /// The grammar name, e.g. `"variable_definition"` or `"="`.
    pub fn kind(self) -> &'static str {
        self.symbol().name()
    }

    pub fn is_named(self) -> bool {
        self.symbol().is_named()
    }

    /// A leaf holding one source token.
    pub fn is_token(self) -> bool {
        self.symbol().is_terminal()
    }

    pub fn span(self) -> Span {
        self.data().span
    }

    pub fn start_byte(self) -> usize {
        self.span().start
    }

    pub fn end_byte(self) -> usize {
        self.span().end
    }

    pub fn text(self) -> &'t str {
        self.span().text(&self.tree.source)
    }

    /// Built by recovery when input ended early.
    pub fn is_incomplete(self) -> bool {
        self.data().incomplete
    }

    /// This node or a descendant was built by recovery.
    pub fn has_error(self) -> bool {
        self.data().has_error
    }

    pub fn child_count(self) -> usize {
        self.data().child_count as usize
    }

    pub fn named_child_count(self) -> usize {
        self.children().count()
    }

    pub fn child(self, i: usize) -> Option<Node<'t>> {
        self.tree
            .children_of(self.id)
            .get(i)
            .map(|&id| self.tree.node(id))
    }

    pub fn named_child(self, i: usize) -> Option<Node<'t>> {
        self.children().nth(i)
    }

    /// Named children, the view most tooling wants.
    pub fn children(self) -> impl Iterator<Item = Node<'t>> + 't {
        self.all_children().filter(|n| n.is_named())
    }

    /// Every child, anonymous tokens included.
    pub fn all_children(self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        tree.children_of(self.id).iter().map(move |&id| tree.node(id))
    }

    /// This node and everything below it, in pre-order.
    pub fn descendants(self) -> Descendants<'t> {
        Descendants {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    pub fn to_sexp(self) -> String {
        let mut out = String::new();
        write_sexp(self, false, &mut out);
        out
    }

    fn data(self) -> &'t NodeData {
        self.tree.data(self.id)
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind(), self.span())
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

pub struct Descendants<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children_of(id).iter().rev().copied());
        Some(self.tree.node(id))
    }
}

enum SexpStep<'t> {
    Open { node: Node<'t>, space: bool },
    Close,
}

fn write_sexp(node: Node<'_>, all: bool, out: &mut String) {
    let mut stack = vec![SexpStep::Open { node, space: false }];
    while let Some(step) = stack.pop() {
        let SexpStep::Open { node, space } = step else {
            out.push(')');
            continue;
        };
        if space {
            out.push(' ');
        }
        if !node.is_named() {
            out.push_str(&format!("{:?}", node.kind()));
            continue;
        }
        out.push('(');
        out.push_str(node.kind());
        stack.push(SexpStep::Close);
        let children: Vec<_> = node
            .all_children()
            .filter(|c| all || c.is_named())
            .collect();
        stack.extend(
            children
                .into_iter()
                .rev()
                .map(|node| SexpStep::Open { node, space: true }),
        );
    }
}

/// A node whose children are still being converted.
struct JsonFrame<'t> {
    node: Node<'t>,
    next: usize,
    children: Vec<Value>,
}

fn node_json(root: Node<'_>) -> Value {
    let mut stack = vec![JsonFrame {
        node: root,
        next: 0,
        children: Vec::new(),
    }];
    loop {
        let Some(top) = stack.last_mut() else {
            return Value::Null;
        };
        if let Some(child) = top.node.child(top.next) {
            top.next += 1;
            stack.push(JsonFrame {
                node: child,
                next: 0,
                children: Vec::new(),
            });
            continue;
        }
        let Some(done) = stack.pop() else {
            return Value::Null;
        };
        let value = node_object(done.node, done.children);
        match stack.last_mut() {
            Some(parent) => parent.children.push(value),
            None => return value,
        }
    }
}

fn node_object(node: Node<'_>, children: Vec<Value>) -> Value {
    let mut value = json!({
        "kind": node.kind(),
        "named": node.is_named(),
        "start": node.start_byte(),
        "end": node.end_byte(),
    });
    if let Value::Object(map) = &mut value {
        if node.is_token() {
            map.insert("text".to_owned(), json!(node.text()));
        } else {
            map.insert("children".to_owned(), Value::Array(children));
        }
        if node.is_incomplete() {
            map.insert("incomplete".to_owned(), json!(true));
        }
    }
    value
}
