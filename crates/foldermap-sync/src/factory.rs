//! Fabrication of nodes for unmapped directory entries.

use std::sync::Arc;

use foldermap_core::{ConfigTable, ContainerConfig, ContainerKind, FileBinding};
use tracing::trace;

use crate::container::Container;
use crate::entry::Entry;
use crate::leaf::Leaf;

/// Creates nodes for directory entries a container has no node for.
///
/// The factory is cheap to clone; every container fabricated through it
/// shares the same configuration table.
#[derive(Debug, Clone, Default)]
pub struct ContainerFactory {
    config: Arc<ConfigTable>,
}

impl ContainerFactory {
    /// Create a factory over a configuration table.
    pub fn new(config: ConfigTable) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConfigTable {
        &self.config
    }

    /// Effective configuration of a container kind.
    pub fn resolve(&self, kind: &ContainerKind) -> ContainerConfig {
        self.config.resolve(kind)
    }

    /// Fabricate the node for an entry found under a container of `parent_kind`.
    ///
    /// Directories become containers of the parent's default container kind;
    /// files become leaves whose codec follows the parent's leaf policy.
    pub fn fabricate(&self, parent_kind: &ContainerKind, binding: FileBinding) -> Entry {
        let config = self.resolve(parent_kind);

        if binding.is_dir() {
            trace!(path = %binding.path().display(), kind = %config.container, "Fabricating container");
            let container = Container::with_kind(config.container, self.clone()).bound(binding);
            Entry::Container(container)
        } else {
            let codec = config.leaf.codec_for(binding.extension());
            trace!(path = %binding.path().display(), %codec, "Fabricating leaf");
            Entry::Leaf(Leaf::bound(binding, codec))
        }
    }
}
