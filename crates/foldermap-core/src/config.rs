//! Container configuration and the extension table.

use std::collections::{HashMap, HashSet};
use std::fmt;

use compact_str::CompactString;
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::SyncError;

/// Text codecs a leaf can be read and written with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// INI-like `key=value` documents with `[section]` headers.
    Ini,
    /// JSON objects.
    Json,
}

impl CodecKind {
    /// Codec used for unknown or missing extensions.
    pub const FALLBACK: CodecKind = CodecKind::Json;

    /// Select the codec for a file extension.
    pub fn for_extension(extension: Option<&str>) -> CodecKind {
        extension
            .and_then(|ext| ext.parse().ok())
            .unwrap_or(Self::FALLBACK)
    }

    /// Canonical file extension of this codec.
    pub fn extension(self) -> &'static str {
        match self {
            CodecKind::Ini => "ini",
            CodecKind::Json => "json",
        }
    }
}

/// How a container picks the codec of a leaf it fabricates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafPolicy {
    /// Look the file extension up in the extension table.
    #[default]
    ByExtension,
    /// Always use one codec.
    Codec(CodecKind),
}

impl LeafPolicy {
    /// Codec for a file with the given extension.
    pub fn codec_for(self, extension: Option<&str>) -> CodecKind {
        match self {
            LeafPolicy::ByExtension => CodecKind::for_extension(extension),
            LeafPolicy::Codec(codec) => codec,
        }
    }
}

/// Name of a container type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerKind(CompactString);

impl ContainerKind {
    /// Name of the generic container type.
    pub const GENERIC_NAME: &'static str = "generic";

    /// Create a kind from a name.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self(name.into())
    }

    /// The generic container type.
    pub fn generic() -> Self {
        Self(CompactString::new(Self::GENERIC_NAME))
    }

    /// Get the kind name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContainerKind {
    fn default() -> Self {
        Self::generic()
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Resolved configuration of a container type.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct ContainerConfig {
    /// Policy for fabricated leaves.
    #[builder(default)]
    #[serde(default)]
    pub leaf: LeafPolicy,

    /// Kind of fabricated child containers.
    #[builder(default)]
    #[serde(default)]
    pub container: ContainerKind,
}

impl ContainerConfig {
    /// Create a new config builder.
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::default()
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            leaf: LeafPolicy::ByExtension,
            container: ContainerKind::generic(),
        }
    }
}

/// What one container type declares. Unset fields are inherited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDecl {
    /// Less specific type to inherit undeclared fields from.
    #[serde(default)]
    pub extends: Option<ContainerKind>,

    /// Leaf policy, if declared.
    #[serde(default)]
    pub leaf: Option<LeafPolicy>,

    /// Child container kind, if declared.
    #[serde(default)]
    pub container: Option<ContainerKind>,
}

impl ContainerDecl {
    /// Declare a type inheriting from another.
    pub fn extending(parent: impl Into<ContainerKind>) -> Self {
        Self {
            extends: Some(parent.into()),
            ..Self::default()
        }
    }

    /// Declare the leaf policy.
    pub fn with_leaf(mut self, leaf: LeafPolicy) -> Self {
        self.leaf = Some(leaf);
        self
    }

    /// Declare the child container kind.
    pub fn with_container(mut self, container: impl Into<ContainerKind>) -> Self {
        self.container = Some(container.into());
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    kinds: IndexMap<String, ContainerDecl>,
}

/// Type-keyed configuration lookup.
///
/// `resolve` honours the most specific declaration along the `extends`
/// chain and falls back to [`ContainerConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct ConfigTable {
    decls: HashMap<ContainerKind, ContainerDecl>,
}

impl ConfigTable {
    /// Create an empty table; every kind resolves to the generic defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a container type.
    pub fn declare(
        &mut self,
        kind: impl Into<ContainerKind>,
        decl: ContainerDecl,
    ) -> Result<(), SyncError> {
        let kind = kind.into();
        let previous = self.decls.insert(kind.clone(), decl);

        if let Err(err) = self.check_chain(&kind) {
            match previous {
                Some(previous) => self.decls.insert(kind, previous),
                None => self.decls.remove(&kind),
            };
            return Err(err);
        }
        Ok(())
    }

    /// Builder-style [`declare`](Self::declare).
    pub fn with(
        mut self,
        kind: impl Into<ContainerKind>,
        decl: ContainerDecl,
    ) -> Result<Self, SyncError> {
        self.declare(kind, decl)?;
        Ok(self)
    }

    /// Load declarations from TOML.
    ///
    /// ```toml
    /// [kinds.settings]
    /// leaf = { codec = "ini" }
    ///
    /// [kinds.profile]
    /// extends = "settings"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, SyncError> {
        let file: ConfigFile = toml::from_str(source).map_err(|e| SyncError::InvalidConfig {
            message: e.to_string(),
        })?;

        let mut table = Self::new();
        for (kind, decl) in file.kinds {
            table.decls.insert(ContainerKind::new(kind), decl);
        }
        let kinds: Vec<ContainerKind> = table.decls.keys().cloned().collect();
        for kind in &kinds {
            table.check_chain(kind)?;
        }
        Ok(table)
    }

    /// Declaration of a kind, if any.
    pub fn get(&self, kind: &ContainerKind) -> Option<&ContainerDecl> {
        self.decls.get(kind)
    }

    /// Resolve the effective configuration of a kind.
    pub fn resolve(&self, kind: &ContainerKind) -> ContainerConfig {
        let mut leaf = None;
        let mut container = None;
        let mut seen = HashSet::new();
        let mut current = Some(kind);

        while let Some(kind) = current {
            if !seen.insert(kind) {
                break;
            }
            let Some(decl) = self.decls.get(kind) else {
                break;
            };
            leaf = leaf.or(decl.leaf);
            if container.is_none() {
                container = decl.container.clone();
            }
            if leaf.is_some() && container.is_some() {
                break;
            }
            current = decl.extends.as_ref();
        }

        let defaults = ContainerConfig::default();
        ContainerConfig {
            leaf: leaf.unwrap_or(defaults.leaf),
            container: container.unwrap_or(defaults.container),
        }
    }

    fn check_chain(&self, start: &ContainerKind) -> Result<(), SyncError> {
        let mut seen = HashSet::new();
        let mut current = Some(start);

        while let Some(kind) = current {
            if !seen.insert(kind) {
                return Err(SyncError::InvalidConfig {
                    message: format!("Inheritance cycle through container kind '{kind}'"),
                });
            }
            current = self.decls.get(kind).and_then(|d| d.extends.as_ref());
        }
        Ok(())
    }
}
