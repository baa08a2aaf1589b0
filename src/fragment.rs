//! # Attribute Fragments
//!
//! Control flow can apply to a tag's attribute list as well as to its
//! content:
//!
//! ```text
//! <div>
//!   <for-each from={[0..3]} item={$i}>
//!     <attribute name={"data-" ++ $i} value={$i} />
//!   </for-each>
//! </div>
//! ```
//!
//! Every real tag gets a synthetic `fragment` tag when it starts compiling.
//! While its children compile, each control-flow node is cloned (renamed to
//! its `apply-*` form) under the fragment's cursor, and `attribute` nodes
//! are cloned as `apply-attribute` leaves. The fragment is compiled into the
//! tag's `$attrsF` block afterwards.

use std::collections::HashMap;

use crate::document::{Document, NodeId};

pub const FRAGMENT_TAG: &str = "fragment";

#[derive(Debug)]
pub struct AttributeFragments {
    /// real tag -> its fragment
    by_tag: HashMap<NodeId, NodeId>,
    /// fragment -> insertion point
    cursors: HashMap<NodeId, NodeId>,
    next_identity: u32,
}

impl Default for AttributeFragments {
    fn default() -> Self {
        Self {
            by_tag: HashMap::new(),
            cursors: HashMap::new(),
            next_identity: 1,
        }
    }
}

impl AttributeFragments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragment for `tag`, created on first use with the cursor at its root.
    pub fn link(&mut self, doc: &mut Document, tag: NodeId) -> NodeId {
        if let Some(fragment) = self.by_tag.get(&tag) {
            return *fragment;
        }
        let identity = self.next_identity;
        self.next_identity += 1;
        let location = doc.node(tag).location.clone();
        let fragment = doc.create_tag(identity, FRAGMENT_TAG, location);
        self.by_tag.insert(tag, fragment);
        self.cursors.insert(fragment, fragment);
        fragment
    }

    pub fn get(&self, tag: NodeId) -> Option<NodeId> {
        self.by_tag.get(&tag).copied()
    }

    pub fn is_fragment(&self, id: NodeId) -> bool {
        self.cursors.contains_key(&id)
    }

    pub fn cursor(&self, fragment: NodeId) -> NodeId {
        self.cursors.get(&fragment).copied().unwrap_or(fragment)
    }

    /// Clone `node` as `applied_name` under the cursor. With `advance`, the
    /// clone becomes the new cursor so nested control flow lands inside it.
    pub fn append(
        &mut self,
        doc: &mut Document,
        fragment: NodeId,
        node: NodeId,
        applied_name: &str,
        advance: bool,
    ) -> NodeId {
        let clone = doc.clone_detached(node, applied_name);
        let cursor = self.cursor(fragment);
        doc.append_child(cursor, clone);
        if advance {
            self.cursors.insert(fragment, clone);
        }
        clone
    }

    /// Move the cursor one level up, never above the fragment itself.
    pub fn pop(&mut self, doc: &Document, fragment: NodeId) {
        let cursor = self.cursor(fragment);
        let parent = doc.parent(cursor).unwrap_or(fragment);
        self.cursors.insert(fragment, parent);
    }

    pub fn set_cursor(&mut self, fragment: NodeId, node: NodeId) {
        self.cursors.insert(fragment, node);
    }

    /// Drop the fragment once its tag has finished compiling.
    pub fn unlink(&mut self, tag: NodeId) {
        if let Some(fragment) = self.by_tag.remove(&tag) {
            self.cursors.remove(&fragment);
        }
    }
}
