//! # Document Arena
//!
//! The compiler walks a mutable copy of the input tree. Nodes live in one
//! `Vec` and refer to each other by [`NodeId`], so the walk can:
//!
//! 1. **Clone** control-flow tags into attribute fragments (same identity,
//!    new name, attributes copied, children not copied).
//! 2. **Splice** included files into the position of their `include` tag.
//! 3. **Walk up** from any node to its parent or to the root of a detached
//!    synthetic tree.
//!
//! Parent links and child lists are only ever changed together.

use crate::ast::{AstNode, AttrNode, Expr, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct TagData {
    pub name: String,
    pub attrs: Vec<AttrNode>,
    pub is_single: bool,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Tag(TagData),
    Text(String),
    Comment(String),
    StringLiteral(String),
    ExpressionSlot(Expr),
    ExpressionBlock(Expr),
    Script { attrs: Vec<AttrNode>, body: String },
}

#[derive(Debug, Clone)]
pub struct Node {
    /// Parser-assigned identity; shared by a tag and all of its clones.
    pub identity: u32,
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub location: SourceLocation,
}

#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    /// Highest parser identity imported so far.
    max_identity: u32,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy parsed nodes into the arena.
    ///
    /// The returned roots get `parent` as their parent link but are not added
    /// to its child list; callers either keep them as the top-level list or
    /// [`splice`](Self::splice) them in.
    pub fn import(&mut self, nodes: &[AstNode], parent: Option<NodeId>) -> Vec<NodeId> {
        self.import_shifted(nodes, parent, 0)
    }

    /// Import a separately parsed file. Its identities come from its own
    /// parser run, so they are shifted past every identity already imported.
    pub fn import_fresh(&mut self, nodes: &[AstNode], parent: Option<NodeId>) -> Vec<NodeId> {
        let offset = self.max_identity.saturating_add(1);
        self.import_shifted(nodes, parent, offset)
    }

    fn import_shifted(&mut self, nodes: &[AstNode], parent: Option<NodeId>, offset: u32) -> Vec<NodeId> {
        nodes
            .iter()
            .map(|node| self.import_node(node, parent, offset))
            .collect()
    }

    fn import_node(&mut self, node: &AstNode, parent: Option<NodeId>, offset: u32) -> NodeId {
        let (identity, data, location, children) = match node {
            AstNode::Tag(tag) => (
                tag.id,
                NodeData::Tag(TagData {
                    name: tag.name.clone(),
                    attrs: tag.attrs.clone(),
                    is_single: tag.is_single,
                }),
                tag.location.clone(),
                tag.children.as_slice(),
            ),
            AstNode::Text(text) => (
                text.id,
                NodeData::Text(text.text.clone()),
                text.location.clone(),
                &[][..],
            ),
            AstNode::Comment(comment) => (
                comment.id,
                NodeData::Comment(comment.value.clone()),
                comment.location.clone(),
                &[][..],
            ),
            AstNode::StringLiteral(string) => (
                string.id,
                NodeData::StringLiteral(string.value.clone()),
                string.location.clone(),
                &[][..],
            ),
            AstNode::ExpressionSlot(slot) => (
                slot.id,
                NodeData::ExpressionSlot(slot.expr.clone()),
                slot.location.clone(),
                &[][..],
            ),
            AstNode::ExpressionBlock(block) => (
                block.id,
                NodeData::ExpressionBlock(block.expr.clone()),
                block.location.clone(),
                &[][..],
            ),
            AstNode::Script(script) => (
                script.id,
                NodeData::Script {
                    attrs: script.attrs.clone(),
                    body: script.body.clone(),
                },
                script.location.clone(),
                &[][..],
            ),
        };

        let identity = identity.saturating_add(offset);
        self.max_identity = self.max_identity.max(identity);
        let id = self.push(Node {
            identity,
            data,
            parent,
            children: Vec::new(),
            location,
        });
        for child in children {
            let child_id = self.import_node(child, Some(id), offset);
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn tag(&self, id: NodeId) -> Option<&TagData> {
        match &self.nodes[id.0].data {
            NodeData::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.tag(id).map(|tag| tag.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Topmost ancestor (the node itself when detached).
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// New detached, childless tag.
    pub fn create_tag(&mut self, identity: u32, name: &str, location: SourceLocation) -> NodeId {
        self.push(Node {
            identity,
            data: NodeData::Tag(TagData {
                name: name.to_string(),
                attrs: Vec::new(),
                is_single: false,
            }),
            parent: None,
            children: Vec::new(),
            location,
        })
    }

    /// Detached copy of `id` renamed to `new_name`: same identity and
    /// attributes, no children.
    pub fn clone_detached(&mut self, id: NodeId, new_name: &str) -> NodeId {
        let source = &self.nodes[id.0];
        let data = match &source.data {
            NodeData::Tag(tag) => NodeData::Tag(TagData {
                name: new_name.to_string(),
                attrs: tag.attrs.clone(),
                is_single: tag.is_single,
            }),
            other => other.clone(),
        };
        let node = Node {
            identity: source.identity,
            data,
            parent: None,
            children: Vec::new(),
            location: source.location.clone(),
        };
        self.push(node)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Replace `target` in its parent's child list with `roots`.
    ///
    /// `target` is detached afterwards. A top-level target has no child list
    /// to rewrite; the roots simply become parentless.
    pub fn splice(&mut self, target: NodeId, roots: &[NodeId]) {
        let parent = self.parent(target);
        for root in roots {
            self.nodes[root.0].parent = parent;
        }
        if let Some(parent) = parent {
            let siblings = &mut self.nodes[parent.0].children;
            if let Some(pos) = siblings.iter().position(|c| *c == target) {
                siblings.splice(pos..=pos, roots.iter().copied());
            }
        }
        self.nodes[target.0].parent = None;
    }
}
