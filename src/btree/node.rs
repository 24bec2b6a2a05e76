use crate::types::{RowId, SortKey};

/// Index of a node inside [`BPlusTree`](super::BPlusTree)'s arena.
pub type NodeId = usize;

/// A (key, row ids) entry stored in a leaf. Duplicate column values share
/// one pair, so `rows` keeps every row that holds this key.
#[derive(Debug, Clone)]
pub struct DictionaryPair {
    pub key: SortKey,
    pub rows: Vec<RowId>,
}

/// Routing node. `children[i]` holds keys in `[keys[i-1], keys[i])`.
#[derive(Debug, Clone)]
pub struct InternalNode {
    pub parent: Option<NodeId>,
    pub keys: Vec<SortKey>,
    pub children: Vec<NodeId>,
}

impl InternalNode {
    /// The child after every separator matching `before`. `before` must
    /// hold for a prefix of the keys and fail for the rest.
    pub fn child_where(&self, before: impl FnMut(&SortKey) -> bool) -> NodeId {
        self.children[self.keys.partition_point(before)]
    }
}

/// Leaf node. Leaves form a doubly linked list in key order through
/// `left` and `right`.
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub parent: Option<NodeId>,
    pub pairs: Vec<DictionaryPair>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl LeafNode {
    pub fn empty() -> Self {
        LeafNode {
            parent: None,
            pairs: Vec::new(),
            left: None,
            right: None,
        }
    }

    /// Number of leading pairs whose key satisfies `pred`.
    pub fn count_while(&self, mut pred: impl FnMut(&SortKey) -> bool) -> usize {
        self.pairs.partition_point(|p| pred(&p.key))
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Internal(n) => n.parent,
            Node::Leaf(n) => n.parent,
        }
    }

    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::Internal(n) => n.parent = parent,
            Node::Leaf(n) => n.parent = parent,
        }
    }
}
