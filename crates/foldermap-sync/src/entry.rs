//! Entries held by a container.

use foldermap_core::{FileBinding, Value};
use serde::Serialize;

use crate::container::Container;
use crate::leaf::Leaf;

/// One value in a container: a child node or a plain scalar.
///
/// Serialises as the plain nested data it holds.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Entry {
    /// A file-bound child.
    Leaf(Leaf),
    /// A directory-bound child.
    Container(Container),
    /// A value with no file of its own.
    Value(Value),
}

impl Entry {
    /// Check if this entry is a node (leaf or container).
    pub fn is_node(&self) -> bool {
        !matches!(self, Entry::Value(_))
    }

    /// Short label of the entry kind.
    pub fn label(&self) -> &'static str {
        match self {
            Entry::Leaf(_) => "leaf",
            Entry::Container(_) => "container",
            Entry::Value(_) => "value",
        }
    }

    /// Binding of a node entry.
    pub fn binding(&self) -> Option<&FileBinding> {
        match self {
            Entry::Leaf(leaf) => leaf.binding(),
            Entry::Container(container) => container.binding(),
            Entry::Value(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Entry::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Entry::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Entry::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Entry::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Name of this entry's file or directory when stored under `key`.
    pub fn file_name(&self, key: &str) -> String {
        match self {
            Entry::Leaf(leaf) => leaf.file_name(key),
            _ => key.to_string(),
        }
    }

    /// Check if this node can stand for a listed directory entry: it must be
    /// of the matching kind and either unbound or bound to that entry.
    pub(crate) fn accepts(&self, child: &FileBinding, is_dir: bool) -> bool {
        let kind_matches = match self {
            Entry::Leaf(_) => !is_dir,
            Entry::Container(_) => is_dir,
            Entry::Value(_) => false,
        };
        kind_matches && self.binding().is_none_or(|binding| binding == child)
    }

    /// Bind a node to its on-disk entry if it has no binding yet.
    pub(crate) fn attach(&mut self, binding: FileBinding) {
        match self {
            Entry::Leaf(leaf) if !leaf.is_bound() => leaf.bind(binding),
            Entry::Container(container) if container.binding().is_none() => {
                container.bind(binding)
            }
            _ => {}
        }
    }

    /// Derive this node's binding from its parent's.
    ///
    /// Without `overwrite` an existing binding is kept. With it, the binding
    /// is replaced and a container re-derives its whole subtree.
    pub(crate) fn derive_binding(&mut self, parent: &FileBinding, key: &str, overwrite: bool) {
        if !overwrite {
            if self.is_node() && self.binding().is_none() {
                let binding = parent.child(&self.file_name(key));
                self.attach(binding);
            }
            return;
        }

        let binding = parent.child(&self.file_name(key));
        match self {
            Entry::Leaf(leaf) => leaf.bind(binding),
            Entry::Container(container) => {
                container.bind(binding);
                container.set_files();
            }
            Entry::Value(_) => {}
        }
    }
}

impl From<Leaf> for Entry {
    fn from(leaf: Leaf) -> Self {
        Entry::Leaf(leaf)
    }
}

impl From<Container> for Entry {
    fn from(container: Container) -> Self {
        Entry::Container(container)
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Entry::Value(value)
    }
}
