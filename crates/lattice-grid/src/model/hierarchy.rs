//! Hierarchical row model.
//!
//! `HierarchicalModel` stores a tree of items in a slotmap arena and exposes
//! the *flattened* list of visible nodes: roots, plus the descendants of every
//! expanded node, in depth-first order. The grid displays the flattened list
//! as its rows.
//!
//! Every structural mutation (expand, collapse, insert, remove, sort) emits
//! `flattened_changed` with the change list and an index map from the old
//! flattened positions to the new ones.
//!
//! # Example
//!
//! ```
//! use lattice_grid::model::HierarchicalModel;
//!
//! let model = HierarchicalModel::new();
//! let root = model.add_root("root");
//! model.add_child(root, "child");
//! assert_eq!(model.flattened_len(), 1);
//!
//! model.expand(root);
//! assert_eq!(model.flattened_items(), vec!["root", "child"]);
//! ```

use std::cmp::Ordering;

use lattice_grid_core::Signal;
use parking_lot::RwLock;
use slotmap::SlotMap;

use super::index_map::{FlattenedChange, FlattenedIndexMap, compose_changes};
use super::traits::ItemSource;

slotmap::new_key_type! {
    /// Key of a node in a [`HierarchicalModel`].
    pub struct NodeKey;
}

/// Payload of `HierarchicalModel::flattened_changed`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedChangedArgs {
    /// Structural changes in old flattened coordinates, ascending.
    pub changes: Vec<FlattenedChange>,
    /// Old → new flattened index translation.
    pub index_map: FlattenedIndexMap,
}

impl FlattenedChangedArgs {
    fn from_changes(changes: Vec<FlattenedChange>) -> Self {
        let index_map = FlattenedIndexMap::from_changes(&changes);
        Self { changes, index_map }
    }

    /// The single change equivalent to `self` followed by `next`.
    ///
    /// `old_len` and `new_len` are the flattened lengths before `self` and
    /// after `next`. Two shift maps compose change by change; once either
    /// side is explicit the result covers the whole list.
    pub fn then(&self, next: &FlattenedChangedArgs, old_len: usize, new_len: usize) -> Self {
        if self.index_map.is_explicit() || next.index_map.is_explicit() {
            return Self {
                changes: vec![FlattenedChange::new(0, old_len, new_len)],
                index_map: self.index_map.then(&next.index_map, old_len),
            };
        }
        Self::from_changes(compose_changes(&self.changes, &next.changes, old_len))
    }
}

struct Node<T> {
    item: T,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    expanded: bool,
}

struct Tree<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    roots: Vec<NodeKey>,
    flattened: Vec<NodeKey>,
}

impl<T> Tree<T> {
    fn rebuild_flattened(&mut self) {
        let mut flattened = Vec::with_capacity(self.flattened.len());
        let mut stack: Vec<NodeKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            flattened.push(key);
            if let Some(node) = self.nodes.get(key)
                && node.expanded
            {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        self.flattened = flattened;
    }

    fn flat_index(&self, key: NodeKey) -> Option<usize> {
        self.flattened.iter().position(|&k| k == key)
    }

    /// Number of flattened rows below `key`, assuming `key` itself is visible.
    fn visible_descendants(&self, key: NodeKey) -> usize {
        let Some(node) = self.nodes.get(key) else {
            return 0;
        };
        if !node.expanded {
            return 0;
        }
        node.children
            .iter()
            .map(|&child| 1 + self.visible_descendants(child))
            .sum()
    }

    fn is_visible(&self, key: NodeKey) -> bool {
        let mut current = self.nodes.get(key).and_then(|n| n.parent);
        while let Some(parent) = current {
            match self.nodes.get(parent) {
                Some(node) if node.expanded => current = node.parent,
                _ => return false,
            }
        }
        self.nodes.contains_key(key)
    }

    fn remove_subtree(&mut self, key: NodeKey) -> Option<T> {
        let node = self.nodes.remove(key)?;
        for child in node.children {
            self.remove_subtree(child);
        }
        Some(node.item)
    }

    fn sort_children(&mut self, compare: &dyn Fn(&T, &T) -> Ordering) {
        let nodes = &self.nodes;
        let by_item = |a: &NodeKey, b: &NodeKey| compare(&nodes[*a].item, &nodes[*b].item);
        let mut roots = self.roots.clone();
        roots.sort_by(by_item);
        let keys: Vec<NodeKey> = nodes.keys().collect();
        let sorted: Vec<(NodeKey, Vec<NodeKey>)> = keys
            .into_iter()
            .map(|key| {
                let mut children = nodes[key].children.clone();
                children.sort_by(by_item);
                (key, children)
            })
            .collect();
        self.roots = roots;
        for (key, children) in sorted {
            if let Some(node) = self.nodes.get_mut(key) {
                node.children = children;
            }
        }
    }
}

/// A tree of items exposed as a flattened row list.
pub struct HierarchicalModel<T> {
    tree: RwLock<Tree<T>>,
    /// Emitted after every change to the flattened list.
    pub flattened_changed: Signal<FlattenedChangedArgs>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> HierarchicalModel<T> {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree {
                nodes: SlotMap::with_key(),
                roots: Vec::new(),
                flattened: Vec::new(),
            }),
            flattened_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Append a top-level node.
    pub fn add_root(&self, item: T) -> NodeKey {
        let (key, index) = {
            let mut tree = self.tree.write();
            let key = tree.nodes.insert(Node {
                item,
                parent: None,
                children: Vec::new(),
                expanded: false,
            });
            tree.roots.push(key);
            let index = tree.flattened.len();
            tree.rebuild_flattened();
            (key, index)
        };
        self.emit(vec![FlattenedChange::inserted(index, 1)]);
        key
    }

    /// Append a child under `parent`. Returns `None` if `parent` is unknown.
    pub fn add_child(&self, parent: NodeKey, item: T) -> Option<NodeKey> {
        let (key, change) = {
            let mut tree = self.tree.write();
            if !tree.nodes.contains_key(parent) {
                return None;
            }
            let visible_at = (tree.is_visible(parent) && tree.nodes[parent].expanded)
                .then(|| tree.flat_index(parent))
                .flatten()
                .map(|p| p + 1 + tree.visible_descendants(parent));
            let key = tree.nodes.insert(Node {
                item,
                parent: Some(parent),
                children: Vec::new(),
                expanded: false,
            });
            tree.nodes[parent].children.push(key);
            tree.rebuild_flattened();
            (key, visible_at.map(|index| FlattenedChange::inserted(index, 1)))
        };
        if let Some(change) = change {
            self.emit(vec![change]);
        }
        Some(key)
    }

    /// Remove a node and its whole subtree. Returns the node's item.
    pub fn remove(&self, key: NodeKey) -> Option<T> {
        let (item, change) = {
            let mut tree = self.tree.write();
            let parent = tree.nodes.get(key)?.parent;
            let change = tree
                .flat_index(key)
                .map(|index| FlattenedChange::removed(index, 1 + tree.visible_descendants(key)));
            match parent {
                Some(p) => {
                    if let Some(node) = tree.nodes.get_mut(p) {
                        node.children.retain(|&c| c != key);
                    }
                }
                None => tree.roots.retain(|&r| r != key),
            }
            let item = tree.remove_subtree(key);
            tree.rebuild_flattened();
            (item, change)
        };
        if let Some(change) = change {
            self.emit(vec![change]);
        }
        item
    }

    /// Remove every node.
    pub fn clear(&self) {
        let old_len = {
            let mut tree = self.tree.write();
            let old_len = tree.flattened.len();
            tree.nodes.clear();
            tree.roots.clear();
            tree.flattened.clear();
            old_len
        };
        if old_len > 0 {
            self.emit(vec![FlattenedChange::removed(0, old_len)]);
        }
    }

    /// Reorder every sibling list with `compare`.
    ///
    /// Reported as a single change covering the whole list, with an explicit
    /// index map.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        let args = {
            let mut tree = self.tree.write();
            let old = tree.flattened.clone();
            tree.sort_children(&compare);
            tree.rebuild_flattened();
            let table = old.iter().map(|&key| tree.flat_index(key)).collect();
            FlattenedChangedArgs {
                changes: vec![FlattenedChange::new(0, old.len(), tree.flattened.len())],
                index_map: FlattenedIndexMap::explicit(table),
            }
        };
        if !args.changes.iter().all(|c| c.old_count == 0 && c.new_count == 0) {
            self.flattened_changed.emit(args);
        }
    }

    // =========================================================================
    // Expansion
    // =========================================================================

    /// Expand a node. Returns `true` if its state changed.
    pub fn expand(&self, key: NodeKey) -> bool {
        self.set_expanded(key, true)
    }

    /// Collapse a node. Returns `true` if its state changed.
    pub fn collapse(&self, key: NodeKey) -> bool {
        self.set_expanded(key, false)
    }

    /// Flip a node's expansion state.
    pub fn toggle(&self, key: NodeKey) -> bool {
        let expanded = self.is_expanded(key);
        self.set_expanded(key, !expanded)
    }

    /// Set a node's expansion state. Returns `true` if it changed.
    pub fn set_expanded(&self, key: NodeKey, expanded: bool) -> bool {
        let change = {
            let mut tree = self.tree.write();
            match tree.nodes.get(key) {
                Some(node) if node.expanded != expanded => {}
                _ => return false,
            }
            let position = tree.is_visible(key).then(|| tree.flat_index(key)).flatten();
            if !expanded {
                let hidden = tree.visible_descendants(key);
                tree.nodes[key].expanded = false;
                tree.rebuild_flattened();
                position
                    .filter(|_| hidden > 0)
                    .map(|p| FlattenedChange::removed(p + 1, hidden))
            } else {
                tree.nodes[key].expanded = true;
                let shown = tree.visible_descendants(key);
                tree.rebuild_flattened();
                position
                    .filter(|_| shown > 0)
                    .map(|p| FlattenedChange::inserted(p + 1, shown))
            }
        };
        if let Some(change) = change {
            self.emit(vec![change]);
        }
        true
    }

    /// Returns `true` if `key` is expanded.
    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.tree.read().nodes.get(key).is_some_and(|n| n.expanded)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of visible (flattened) rows.
    pub fn flattened_len(&self) -> usize {
        self.tree.read().flattened.len()
    }

    /// Node at a flattened position.
    pub fn node_at(&self, index: usize) -> Option<NodeKey> {
        self.tree.read().flattened.get(index).copied()
    }

    /// Flattened position of a node, if visible.
    pub fn index_of_node(&self, key: NodeKey) -> Option<usize> {
        self.tree.read().flat_index(key)
    }

    /// Items of all visible rows in order.
    pub fn flattened_items(&self) -> Vec<T> {
        let tree = self.tree.read();
        tree.flattened
            .iter()
            .map(|&key| tree.nodes[key].item.clone())
            .collect()
    }

    /// Find a node by item, including hidden ones.
    pub fn find_node(&self, item: &T) -> Option<NodeKey> {
        let tree = self.tree.read();
        tree.nodes
            .iter()
            .find(|(_, node)| node.item == *item)
            .map(|(key, _)| key)
    }

    /// Clone of a node's item.
    pub fn item(&self, key: NodeKey) -> Option<T> {
        self.tree.read().nodes.get(key).map(|n| n.item.clone())
    }

    /// Parent of a node.
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.tree.read().nodes.get(key).and_then(|n| n.parent)
    }

    /// Children of a node.
    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.tree
            .read()
            .nodes
            .get(key)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if a node has children.
    pub fn has_children(&self, key: NodeKey) -> bool {
        self.tree
            .read()
            .nodes
            .get(key)
            .is_some_and(|n| !n.children.is_empty())
    }

    /// Depth of a node; roots are level 0.
    pub fn level(&self, key: NodeKey) -> usize {
        let tree = self.tree.read();
        let mut level = 0;
        let mut current = tree.nodes.get(key).and_then(|n| n.parent);
        while let Some(parent) = current {
            level += 1;
            current = tree.nodes.get(parent).and_then(|n| n.parent);
        }
        level
    }

    fn emit(&self, changes: Vec<FlattenedChange>) {
        tracing::trace!(
            target: lattice_grid_core::logging::targets::DATA,
            changes = changes.len(),
            "flattened list changed"
        );
        self.flattened_changed
            .emit(FlattenedChangedArgs::from_changes(changes));
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ItemSource<T> for HierarchicalModel<T> {
    fn len(&self) -> usize {
        self.flattened_len()
    }

    fn item(&self, index: usize) -> Option<T> {
        let tree = self.tree.read();
        tree.flattened
            .get(index)
            .map(|&key| tree.nodes[key].item.clone())
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        let tree = self.tree.read();
        tree.flattened
            .iter()
            .position(|&key| tree.nodes[key].item == *item)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for HierarchicalModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(HierarchicalModel<String>: Send, Sync);
