//! Folder tree over the flat entry list of an archive.
//!
//! Nodes live in one arena and refer to their children by [`NodeId`]. Children are kept
//! in insertion order while building and sorted once at the end: folders before files,
//! then by name using plain byte order.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::entry::{split_path, Entry, PATH_SEPARATOR};

/// Index of a node inside an [`ArchiveTree`]
pub type NodeId = usize;

/// One path segment of the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveNode {
    /// Last path segment; the archive file name for the root
    pub name: String,
    /// Full path from the archive root; empty for the root
    pub path: String,
    /// Index into the archive's entry list, `None` for folders
    pub entry: Option<usize>,
    children: IndexMap<String, NodeId>,
}

impl ArchiveNode {
    fn new(name: String, path: String, entry: Option<usize>) -> Self {
        Self {
            name,
            path,
            entry,
            children: IndexMap::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.entry.is_none()
    }

    pub fn is_file(&self) -> bool {
        self.entry.is_some()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Read only tree built from an archive's entries
#[derive(Debug, Clone)]
pub struct ArchiveTree {
    nodes: Vec<ArchiveNode>,
    entries: Arc<[Entry]>,
}

impl ArchiveTree {
    /// Id of the root node
    pub const ROOT: NodeId = 0;

    /// Build and sort the tree for `entries`; the root is named `name`.
    pub fn build(name: impl Into<String>, entries: Arc<[Entry]>) -> Self {
        let mut tree = Self {
            nodes: vec![ArchiveNode::new(name.into(), String::new(), None)],
            entries,
        };

        for index in 0..tree.entries.len() {
            tree.insert(index);
        }
        tree.sort();

        tree
    }

    fn insert(&mut self, index: usize) {
        let entries = Arc::clone(&self.entries);
        let path = entries[index].full_path();
        if path.is_empty() {
            debug!(index, "entry has no path, leaving it out of the tree");
            return;
        }

        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let Some((leaf, folders)) = segments.split_last() else {
            return;
        };

        let mut current = Self::ROOT;
        for segment in folders {
            current = match self.nodes[current].children.get(*segment) {
                Some(&child) if self.nodes[child].is_folder() => child,
                Some(_) => {
                    warn!(path, segment, "path descends through a file, skipping entry");
                    return;
                }
                None => self.add_child(current, segment, None),
            };
        }

        if self.nodes[current].children.contains_key(*leaf) {
            warn!(path, "duplicate path, skipping entry");
            return;
        }
        self.add_child(current, leaf, Some(index));
    }

    fn add_child(&mut self, parent: NodeId, name: &str, entry: Option<usize>) -> NodeId {
        let path = if parent == Self::ROOT {
            name.to_owned()
        } else {
            format!("{}{}{}", self.nodes[parent].path, PATH_SEPARATOR, name)
        };

        let id = self.nodes.len();
        self.nodes
            .push(ArchiveNode::new(name.to_owned(), path, entry));
        self.nodes[parent].children.insert(name.to_owned(), id);
        id
    }

    /// Order every node's children: folders first, then by name.
    ///
    /// Sorting an already sorted tree leaves it unchanged.
    pub fn sort(&mut self) {
        let folders: Vec<bool> = self.nodes.iter().map(ArchiveNode::is_folder).collect();

        for node in self.nodes.iter_mut() {
            node.children.sort_by(|a_name, a, b_name, b| {
                folders[*b]
                    .cmp(&folders[*a])
                    .then_with(|| a_name.as_bytes().cmp(b_name.as_bytes()))
            });
        }
    }

    pub fn root(&self) -> &ArchiveNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&ArchiveNode> {
        self.nodes.get(id)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Direct children of `id` in sorted order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ArchiveNode)> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.children.values())
            .map(|&child| (child, &self.nodes[child]))
    }

    pub fn folders(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ArchiveNode)> + '_ {
        self.children(id).filter(|(_, node)| node.is_folder())
    }

    pub fn files(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ArchiveNode)> + '_ {
        self.children(id).filter(|(_, node)| node.is_file())
    }

    /// Child of `id` at `position` in sorted order
    pub fn child_at(&self, id: NodeId, position: usize) -> Option<NodeId> {
        self.nodes
            .get(id)?
            .children
            .get_index(position)
            .map(|(_, &child)| child)
    }

    /// Child of `id` named `name`
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(id)?.children.get(name).copied()
    }

    /// Node at `path`, relative to the root. An empty path is the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(Self::ROOT);
        }

        path.split(PATH_SEPARATOR)
            .try_fold(Self::ROOT, |current, segment| self.child(current, segment))
    }

    /// Every node below the root, depth first in sorted order
    pub fn walk(&self) -> Walk<'_> {
        let mut stack: Vec<NodeId> = self.root().children.values().copied().collect();
        stack.reverse();
        Walk { tree: self, stack }
    }

    /// Entry attached to `id`, `None` for folders
    pub fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.nodes
            .get(id)?
            .entry
            .and_then(|index| self.entries.get(index))
    }

    /// Decompressed size of a file if known, its stored size otherwise.
    /// For folders this is the number of direct children, not a byte count.
    pub fn size(&self, id: NodeId) -> u64 {
        match (self.node(id), self.entry(id)) {
            (_, Some(entry)) => entry.display_size(),
            (Some(node), None) => node.child_count() as u64,
            (None, None) => 0,
        }
    }

    pub fn compressed_size(&self, id: NodeId) -> u64 {
        self.entry(id)
            .map_or(0, |entry| u64::from(entry.file().compressed_size))
    }

    pub fn offset(&self, id: NodeId) -> u64 {
        self.entry(id).map_or(0, |entry| entry.file().offset)
    }

    /// Path of the folder containing `id`
    pub fn dir_path(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |node| split_path(&node.path).0)
    }
}

/// Depth first iterator returned by [`ArchiveTree::walk`]
pub struct Walk<'a> {
    tree: &'a ArchiveTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a ArchiveNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id];
        self.stack.extend(node.children.values().rev().copied());
        Some((id, node))
    }
}
