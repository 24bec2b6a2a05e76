pub mod node;

use tracing::{debug, trace};

use crate::types::{Operator, RowId, SortKey};
use node::{DictionaryPair, InternalNode, LeafNode, Node, NodeId};

/// In-memory B+Tree mapping a column value to the rows that hold it.
///
/// Nodes live in an arena (`Vec<Node>`) and refer to each other by index,
/// so parent and sibling links need no shared ownership.
///
/// ```text
///                  [ 30 | 60 ]                 internal: keys + children
///                 /     |     \
///   [10 20] <-> [30 40 50] <-> [60 70]         leaves: sorted pairs, linked
/// ```
///
/// With order `m`:
///   - a leaf holds at most `m - 1` pairs
///   - an internal node holds at most `m` children
///
/// Inserting past either bound splits the node in two and pushes the
/// smallest key of the right half into the parent. A full root grows the
/// tree by one level.
///
/// Deletes never merge or rebalance. Leaves may shrink to empty; the
/// routing keys above them stay valid separators.
pub struct BPlusTree {
    nodes: Vec<Node>,
    root: NodeId,
    first_leaf: NodeId,
    order: usize,
    len: usize,
    height: usize,
}

impl BPlusTree {
    /// Create an empty tree of the given order.
    ///
    /// # Panics
    /// Panics if order < 3.
    pub fn new(order: usize) -> Self {
        assert!(order >= 3, "B+Tree order must be >= 3");
        BPlusTree {
            nodes: vec![Node::Leaf(LeafNode::empty())],
            root: 0,
            first_leaf: 0,
            order,
            len: 0,
            height: 1,
        }
    }

    /// Configured order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Levels from root to leaves (1 for a lone root leaf).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Add `row` under `key`, creating the key if it is new.
    pub fn insert(&mut self, key: &str, row: RowId) {
        let key = SortKey::new(key);
        let max_pairs = self.order - 1;
        let leaf_id = self.find_leaf(&key);
        let leaf = self.leaf_mut(leaf_id);

        match leaf.pairs.binary_search_by(|p| p.key.cmp(&key)) {
            Ok(i) => {
                leaf.pairs[i].rows.push(row);
                return;
            }
            Err(i) => leaf.pairs.insert(i, DictionaryPair { key, rows: vec![row] }),
        }
        let overflow = leaf.pairs.len() > max_pairs;
        self.len += 1;

        if overflow {
            self.split_leaf(leaf_id);
        }
    }

    /// All rows stored under exactly `key`.
    pub fn search_equal(&self, key: &str) -> Vec<RowId> {
        let key = SortKey::new(key);
        let leaf = self.leaf(self.find_leaf(&key));
        match leaf.pairs.binary_search_by(|p| p.key.cmp(&key)) {
            Ok(i) => leaf.pairs[i].rows.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// All rows whose key satisfies `stored <op> key`, in key order.
    ///
    /// `>`/`>=` descend to the boundary leaf and walk right; `<`/`<=`
    /// descend to the boundary leaf and walk left. Boundaries compare
    /// numbers by value, so `>= 25` also returns `"25.0"` and `"025"`.
    /// `!=` is exact, like `=`, and walks every leaf.
    pub fn search_range(&self, op: Operator, key: &str) -> Vec<RowId> {
        let bound = SortKey::new(key);
        match op {
            Operator::Eq => self.search_equal(key),
            Operator::Gt | Operator::Ge => {
                self.collect_right(|k| op.accepts(k.cmp_value(&bound)))
            }
            Operator::Lt | Operator::Le => {
                self.collect_left(|k| op.accepts(k.cmp_value(&bound)))
            }
            Operator::Ne => self
                .leaves()
                .flat_map(|leaf| leaf.pairs.iter())
                .filter(|p| p.key != bound)
                .flat_map(|p| p.rows.iter().copied())
                .collect(),
        }
    }

    /// Remove one `row` from under `key`. Drops the key once no rows remain.
    /// Returns whether the row was present.
    pub fn delete(&mut self, key: &str, row: RowId) -> bool {
        let key = SortKey::new(key);
        let leaf_id = self.find_leaf(&key);
        let leaf = self.leaf_mut(leaf_id);

        let Ok(i) = leaf.pairs.binary_search_by(|p| p.key.cmp(&key)) else {
            return false;
        };
        let Some(pos) = leaf.pairs[i].rows.iter().position(|&r| r == row) else {
            return false;
        };
        leaf.pairs[i].rows.remove(pos);
        if leaf.pairs[i].rows.is_empty() {
            leaf.pairs.remove(i);
            self.len -= 1;
        }
        true
    }

    /// Every key, in order, by walking the leaf list.
    pub fn keys(&self) -> Vec<String> {
        self.leaves()
            .flat_map(|leaf| leaf.pairs.iter().map(|p| p.key.as_str().to_string()))
            .collect()
    }

    /// Every row id, in key order.
    pub fn all(&self) -> Vec<RowId> {
        self.leaves()
            .flat_map(|leaf| leaf.pairs.iter().flat_map(|p| p.rows.iter().copied()))
            .collect()
    }

    /// Verify ordering, fan-out and link invariants. Returns a description of
    /// the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let min_children = self.order.div_ceil(2);
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Internal(n) => {
                    if n.children.len() != n.keys.len() + 1 {
                        return Err(format!("node {id}: {} keys, {} children", n.keys.len(), n.children.len()));
                    }
                    if n.children.len() > self.order {
                        return Err(format!("node {id}: {} children > order", n.children.len()));
                    }
                    if id != self.root && n.children.len() < min_children {
                        return Err(format!("node {id}: {} children < {min_children}", n.children.len()));
                    }
                    if n.keys.windows(2).any(|w| w[0] >= w[1]) {
                        return Err(format!("node {id}: keys out of order"));
                    }
                    for &child in &n.children {
                        if self.nodes[child].parent() != Some(id) {
                            return Err(format!("node {child}: parent link does not point at {id}"));
                        }
                    }
                }
                Node::Leaf(n) => {
                    if n.pairs.len() > self.order - 1 {
                        return Err(format!("leaf {id}: {} pairs > order - 1", n.pairs.len()));
                    }
                    if let Some(r) = n.right {
                        if self.leaf(r).left != Some(id) {
                            return Err(format!("leaf {id}: right sibling {r} does not link back"));
                        }
                    }
                }
            }
        }

        let keys: Vec<SortKey> = self.keys().into_iter().map(SortKey::new).collect();
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err("leaf walk is not strictly increasing".into());
        }
        if keys.len() != self.len {
            return Err(format!("leaf walk found {} keys, len is {}", keys.len(), self.len));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Descent and traversal
    // -------------------------------------------------------------------------

    fn find_leaf(&self, key: &SortKey) -> NodeId {
        self.descend(|k| k <= key)
    }

    /// Walk from the root to the leaf reached by skipping, at each level,
    /// every separator for which `before` holds.
    fn descend(&self, mut before: impl FnMut(&SortKey) -> bool) -> NodeId {
        let mut current = self.root;
        loop {
            match &self.nodes[current] {
                Node::Internal(n) => current = n.child_where(&mut before),
                Node::Leaf(_) => return current,
            }
        }
    }

    fn leaves(&self) -> impl Iterator<Item = &LeafNode> + '_ {
        std::iter::successors(Some(self.leaf(self.first_leaf)), |leaf| {
            leaf.right.map(|r| self.leaf(r))
        })
    }

    /// Rows of every key from the first one that satisfies `keep` to the
    /// end. `keep` must fail for a prefix of the keys and hold after it.
    fn collect_right(&self, keep: impl Fn(&SortKey) -> bool) -> Vec<RowId> {
        let mut rows = Vec::new();
        let mut current = Some(self.descend(|k| !keep(k)));
        let mut first = true;

        while let Some(id) = current {
            let leaf = self.leaf(id);
            let start = if first { leaf.count_while(|k| !keep(k)) } else { 0 };
            first = false;
            for pair in &leaf.pairs[start..] {
                rows.extend_from_slice(&pair.rows);
            }
            current = leaf.right;
        }
        rows
    }

    /// Rows of every key from the start up to the last one that satisfies
    /// `keep`. `keep` must hold for a prefix of the keys and fail after it.
    fn collect_left(&self, keep: impl Fn(&SortKey) -> bool) -> Vec<RowId> {
        let mut pairs: Vec<&DictionaryPair> = Vec::new();
        let mut current = Some(self.descend(&keep));
        let mut first = true;

        while let Some(id) = current {
            let leaf = self.leaf(id);
            let end = if first { leaf.count_while(&keep) } else { leaf.pairs.len() };
            first = false;
            pairs.extend(leaf.pairs[..end].iter().rev());
            current = leaf.left;
        }

        pairs
            .into_iter()
            .rev()
            .flat_map(|p| p.rows.iter().copied())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Splitting
    // -------------------------------------------------------------------------

    fn split_leaf(&mut self, id: NodeId) {
        let new_id = self.nodes.len();
        let leaf = self.leaf_mut(id);
        let mid = leaf.pairs.len() / 2;
        let right_pairs = leaf.pairs.split_off(mid);
        let old_right = leaf.right.replace(new_id);
        let parent = leaf.parent;

        let separator = right_pairs[0].key.clone();
        self.nodes.push(Node::Leaf(LeafNode {
            parent,
            pairs: right_pairs,
            left: Some(id),
            right: old_right,
        }));
        if let Some(r) = old_right {
            self.leaf_mut(r).left = Some(new_id);
        }

        trace!(leaf = id, new_leaf = new_id, separator = %separator, "split leaf");
        self.insert_into_parent(id, separator, new_id);
    }

    fn split_internal(&mut self, id: NodeId) {
        let new_id = self.nodes.len();
        let node = self.internal_mut(id);
        let mid = node.keys.len() / 2;
        let right_keys = node.keys.split_off(mid + 1);
        let promoted = node
            .keys
            .pop()
            .unwrap_or_else(|| panic!("internal node {id} split with no keys"));
        let right_children = node.children.split_off(mid + 1);
        let parent = node.parent;

        for &child in &right_children {
            self.nodes[child].set_parent(Some(new_id));
        }
        self.nodes.push(Node::Internal(InternalNode {
            parent,
            keys: right_keys,
            children: right_children,
        }));

        trace!(node = id, new_node = new_id, promoted = %promoted, "split internal node");
        self.insert_into_parent(id, promoted, new_id);
    }

    fn insert_into_parent(&mut self, left: NodeId, separator: SortKey, right: NodeId) {
        let Some(parent_id) = self.nodes[left].parent() else {
            let root_id = self.nodes.len();
            self.nodes.push(Node::Internal(InternalNode {
                parent: None,
                keys: vec![separator],
                children: vec![left, right],
            }));
            self.nodes[left].set_parent(Some(root_id));
            self.nodes[right].set_parent(Some(root_id));
            self.root = root_id;
            self.height += 1;
            debug!(root = root_id, height = self.height, "B+Tree root split");
            return;
        };

        self.nodes[right].set_parent(Some(parent_id));
        let order = self.order;
        let parent = self.internal_mut(parent_id);
        let pos = parent
            .children
            .iter()
            .position(|&c| c == left)
            .unwrap_or_else(|| panic!("node {left} missing from parent {parent_id}"));
        parent.keys.insert(pos, separator);
        parent.children.insert(pos + 1, right);

        if parent.children.len() > order {
            self.split_internal(parent_id);
        }
    }

    // -------------------------------------------------------------------------
    // Arena access
    // -------------------------------------------------------------------------

    fn leaf(&self, id: NodeId) -> &LeafNode {
        match &self.nodes[id] {
            Node::Leaf(n) => n,
            Node::Internal(_) => panic!("node {id} is not a leaf"),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode {
        match &mut self.nodes[id] {
            Node::Leaf(n) => n,
            Node::Internal(_) => panic!("node {id} is not a leaf"),
        }
    }

    fn internal_mut(&mut self, id: NodeId) -> &mut InternalNode {
        match &mut self.nodes[id] {
            Node::Internal(n) => n,
            Node::Leaf(_) => panic!("node {id} is not an internal node"),
        }
    }
}
