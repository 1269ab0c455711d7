//! Directory-bound nested maps.
//!
//! A [`Container`] mirrors one directory: every subdirectory is a child
//! container, every file a [`Leaf`]. Loading fabricates nodes for entries the
//! container does not know yet; saving recreates the directory and saves every
//! child, collecting one outcome per child.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use foldermap_core::{
    ContainerConfig, ContainerKind, FileBinding, SyncError, SyncIssue, SyncSignal,
};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::entry::Entry;
use crate::factory::ContainerFactory;
use crate::leaf::Leaf;
use crate::report::{ChildOutcome, Outcome, SaveReport};

/// A node bound to a directory.
#[derive(Debug, Clone, Default)]
pub struct Container {
    binding: Option<FileBinding>,
    kind: ContainerKind,
    factory: ContainerFactory,
    entries: IndexMap<String, Entry>,
}

impl Container {
    /// Create an unbound generic container with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unbound container of a configured kind.
    pub fn with_kind(kind: impl Into<ContainerKind>, factory: ContainerFactory) -> Self {
        Self {
            binding: None,
            kind: kind.into(),
            factory,
            entries: IndexMap::new(),
        }
    }

    /// Bind to a directory, builder style.
    pub fn bound(mut self, binding: impl Into<FileBinding>) -> Self {
        self.bind(binding.into());
        self
    }

    /// Attach to a directory. Child bindings are left as they are.
    pub fn bind(&mut self, binding: FileBinding) {
        self.binding = Some(binding);
    }

    pub fn binding(&self) -> Option<&FileBinding> {
        self.binding.as_ref()
    }

    pub fn kind(&self) -> &ContainerKind {
        &self.kind
    }

    pub fn factory(&self) -> &ContainerFactory {
        &self.factory
    }

    /// Effective configuration of this container's kind.
    pub fn config(&self) -> ContainerConfig {
        self.factory.resolve(&self.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Mutable access to a child.
    ///
    /// An unbound child node gets its binding derived from this container's
    /// binding on first access.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        let entry = self.entries.get_mut(key)?;
        if let Some(parent) = &self.binding {
            entry.derive_binding(parent, key, false);
        }
        Some(entry)
    }

    pub fn leaf(&self, key: &str) -> Option<&Leaf> {
        self.get(key).and_then(Entry::as_leaf)
    }

    pub fn leaf_mut(&mut self, key: &str) -> Option<&mut Leaf> {
        self.get_mut(key).and_then(Entry::as_leaf_mut)
    }

    pub fn container(&self, key: &str) -> Option<&Container> {
        self.get(key).and_then(Entry::as_container)
    }

    pub fn container_mut(&mut self, key: &str) -> Option<&mut Container> {
        self.get_mut(key).and_then(Entry::as_container_mut)
    }

    /// Insert a child, returning the entry it replaced.
    ///
    /// An unbound node is bound lazily below this container; an explicit
    /// binding is kept.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Option<Entry> {
        let key = key.into();
        let mut entry = entry.into();
        if let Some(parent) = &self.binding {
            entry.derive_binding(parent, &key, false);
        }
        self.entries.insert(key, entry)
    }

    /// Remove a child from memory. The disk is not touched.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.shift_remove(key)
    }

    /// Map every entry of the bound directory to a node.
    ///
    /// A node already bound to a listed entry keeps its key, so reloading
    /// never maps one file twice. Otherwise a node of the right kind that is
    /// unbound or bound to that entry is kept under the derived key; anything
    /// else there (a scalar, a leaf where a directory now is, a node bound
    /// elsewhere) is replaced by a fabricated node. Entries not on disk are
    /// left alone. Stops after the current child once the signal is canceled.
    ///
    /// Structural failures are recorded on the signal and returned without
    /// touching the entries.
    pub fn load(&mut self, signal: &SyncSignal) -> Result<(), SyncError> {
        let result = self.read_children(signal);
        if let Err(err) = &result {
            signal.record(err);
        }
        result
    }

    /// [`load`](Self::load), then load every child node recursively.
    ///
    /// Child failures are recorded on the signal and do not stop siblings.
    pub fn load_all(&mut self, signal: &SyncSignal) -> Result<(), SyncError> {
        self.load(signal)?;
        if signal.is_canceled() {
            return Ok(());
        }

        let Some(binding) = self.binding.clone() else {
            return Err(SyncError::Unbound);
        };
        // Progress runs over every entry, scalars included.
        let max = self.entries.len() as u64;
        signal.set_max_progress(max);
        signal.restart(Some(binding.path()));
        if !signal.bind() {
            return Ok(());
        }

        let mut failed = 0;
        for (done, (key, entry)) in self.entries.iter_mut().enumerate() {
            entry.derive_binding(&binding, key, false);
            let result = match entry {
                Entry::Container(child) => Some(child.load_all(signal)),
                Entry::Leaf(leaf) => Some(leaf.load(signal)),
                Entry::Value(_) => None,
            };
            if matches!(result, Some(Err(_))) {
                failed += 1;
            }

            signal.begin(Some(binding.path()), max);
            signal.set_progress(done as u64 + 1);
            if !signal.bind() {
                debug!(path = %binding.path().display(), "Load canceled");
                break;
            }
        }

        debug!(path = %binding.path().display(), entries = max, failed, "Loaded container tree");
        Ok(())
    }

    /// Create the bound directory and save every child.
    ///
    /// Every child is attempted even after a sibling failed. Once the signal
    /// is canceled the remaining children are reported as skipped. Scalar
    /// entries have no file and do not appear in the report.
    pub fn save(&mut self, signal: &SyncSignal) -> SaveReport {
        let Some(binding) = self.binding.clone() else {
            let err = SyncError::Unbound;
            signal.record(&err);
            return SaveReport::failed("", SyncIssue::from(&err));
        };
        let path = binding.path();

        if let Err(err) = self.ensure_dir(&binding) {
            signal.record(&err);
            return SaveReport::failed(path, SyncIssue::from(&err));
        }

        let max = self.entries.len() as u64;
        let mut report = SaveReport::new(path);
        signal.begin(Some(path), max);
        let mut canceled = !signal.bind();

        for (done, (key, entry)) in self.entries.iter_mut().enumerate() {
            if canceled {
                if entry.is_node() {
                    report
                        .children
                        .push(ChildOutcome::new(key.as_str(), Outcome::Skipped));
                }
                continue;
            }

            entry.derive_binding(&binding, key, false);
            let child = match entry {
                Entry::Leaf(leaf) => Some(match leaf.save(signal) {
                    Ok(()) => ChildOutcome::new(key.as_str(), Outcome::Saved),
                    Err(err) => {
                        ChildOutcome::new(key.as_str(), Outcome::Failed(SyncIssue::from(&err)))
                    }
                }),
                Entry::Container(container) => {
                    let nested = container.save(signal);
                    signal.begin(Some(path), max);
                    Some(ChildOutcome::container(key.as_str(), nested))
                }
                Entry::Value(_) => None,
            };
            report.children.extend(child);

            signal.set_progress(done as u64 + 1);
            canceled = !signal.bind();
        }

        debug!(path = %path.display(), summary = %report.summary(), "Saved container");
        report
    }

    /// Re-derive the binding of every descendant from this container's.
    ///
    /// Existing child bindings are overwritten.
    pub fn set_files(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };
        for (key, entry) in self.entries.iter_mut() {
            entry.derive_binding(binding, key, true);
        }
    }

    /// Move the directory into another one, then re-derive descendants.
    pub fn move_to(&mut self, new_parent: &Path) -> Result<(), SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::Unbound)?;
        let moved = binding.move_to(new_parent)?;
        debug!(from = %binding.path().display(), to = %moved.path().display(), "Moved container");
        self.binding = Some(moved);
        self.set_files();
        Ok(())
    }

    /// Rename the directory, then re-derive descendants.
    pub fn rename(&mut self, new_name: &str) -> Result<(), SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::Unbound)?;
        let renamed = binding.rename(new_name)?;
        debug!(from = %binding.path().display(), to = %renamed.path().display(), "Renamed container");
        self.binding = Some(renamed);
        self.set_files();
        Ok(())
    }

    /// Re-key a child, renaming its file or directory to match.
    ///
    /// The child keeps its position. A child whose file does not exist yet
    /// is only re-keyed and rebound.
    pub fn rename_child(&mut self, old_key: &str, new_key: &str) -> Result<(), SyncError> {
        if self.entries.contains_key(new_key) {
            return Err(SyncError::KeyExists {
                key: new_key.to_string(),
            });
        }
        let index = self
            .entries
            .get_index_of(old_key)
            .ok_or_else(|| SyncError::KeyNotFound {
                key: old_key.to_string(),
            })?;

        let parent = self.binding.clone();
        let Some((_, entry)) = self.entries.get_index_mut(index) else {
            return Err(SyncError::KeyNotFound {
                key: old_key.to_string(),
            });
        };

        if let Some(parent) = &parent {
            entry.derive_binding(parent, old_key, false);
        }
        let new_name = entry.file_name(new_key);
        let on_disk = entry.binding().is_some_and(FileBinding::exists);

        match entry {
            Entry::Leaf(leaf) if on_disk => leaf.rename(&new_name)?,
            Entry::Container(container) if on_disk => container.rename(&new_name)?,
            Entry::Value(_) => {}
            _ => {
                if let Some(parent) = &parent {
                    entry.derive_binding(parent, new_key, true);
                }
            }
        }

        if let Some((_, entry)) = self.entries.shift_remove_index(index) {
            self.entries.shift_insert(index, new_key.to_string(), entry);
        }
        trace!(old_key, new_key, "Renamed child");
        Ok(())
    }

    fn ensure_dir(&self, binding: &FileBinding) -> Result<(), SyncError> {
        if binding.is_dir() {
            return Ok(());
        }
        if binding.exists() {
            return Err(SyncError::NotADirectory {
                path: binding.path().to_path_buf(),
            });
        }
        binding.mkdirs()
    }

    fn read_children(&mut self, signal: &SyncSignal) -> Result<(), SyncError> {
        let binding = self.binding.clone().ok_or(SyncError::Unbound)?;
        let path = binding.path();

        if !binding.exists() {
            return Err(SyncError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !binding.is_dir() {
            return Err(SyncError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let listed = child_keys(&binding, binding.list_children()?);
        signal.begin(Some(path), listed.len() as u64);
        if !signal.bind() {
            return Ok(());
        }

        let keys = self.claim_keys(&listed);

        let mut fabricated = 0;
        for (key, child) in keys.into_iter().zip(listed) {
            let compatible = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.accepts(&child.binding, child.is_dir));

            if compatible {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.attach(child.binding);
                }
            } else {
                let entry = self.factory.fabricate(&self.kind, child.binding);
                trace!(key = %key, kind = entry.label(), "Fabricated entry");
                self.entries.insert(key, entry);
                fabricated += 1;
            }

            signal.advance();
            if !signal.bind() {
                debug!(path = %path.display(), "Load canceled");
                break;
            }
        }

        debug!(path = %path.display(), entries = self.entries.len(), fabricated, "Loaded container");
        Ok(())
    }

    /// Pick the key of every listed child, in listing order.
    ///
    /// A node bound to a listed path keeps its key, unless that key is the
    /// full name of another listed entry; it then moves to its own full name.
    /// Other children take their derived key, or their full name when a kept
    /// node holds it.
    fn claim_keys(&mut self, listed: &[Listed]) -> Vec<String> {
        let names: HashSet<&str> = listed.iter().map(|child| child.name.as_str()).collect();
        let owners: HashMap<PathBuf, String> = self
            .entries
            .iter()
            .filter_map(|(key, entry)| Some((entry.binding()?.path().to_path_buf(), key.clone())))
            .collect();

        let mut moves = Vec::new();
        let kept: Vec<Option<String>> = listed
            .iter()
            .map(|child| {
                let owned = owners.get(child.binding.path())?;
                if *owned != child.name && names.contains(owned.as_str()) {
                    moves.push((owned.clone(), child.name.clone()));
                    Some(child.name.clone())
                } else {
                    Some(owned.clone())
                }
            })
            .collect();
        let taken: HashSet<&String> = kept.iter().flatten().collect();

        let keys = kept
            .iter()
            .zip(listed)
            .map(|(kept, child)| match kept {
                Some(key) => key.clone(),
                None if taken.contains(&child.key) => child.name.clone(),
                None => child.key.clone(),
            })
            .collect();

        let moved: Vec<(String, Entry)> = moves
            .into_iter()
            .filter_map(|(from, to)| Some((to, self.entries.shift_remove(&from)?)))
            .collect();
        for (key, entry) in moved {
            trace!(key = %key, "Re-keyed entry to its file name");
            self.entries.insert(key, entry);
        }

        keys
    }
}

impl Serialize for Container {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// One entry of a directory listing.
#[derive(Debug)]
struct Listed {
    name: String,
    key: String,
    binding: FileBinding,
    is_dir: bool,
}

/// Pair every listed name with its derived key, binding and directory flag.
///
/// Directories are keyed by their name, files by their stem. A file falls
/// back to its full name when its stem is shared with another stem or with
/// another entry's name, so each entry gets a distinct key regardless of
/// listing order.
fn child_keys(parent: &FileBinding, names: Vec<String>) -> Vec<Listed> {
    let children: Vec<(String, FileBinding, bool)> = names
        .into_iter()
        .map(|name| {
            let child = parent.child(&name);
            let is_dir = child.is_dir();
            (name, child, is_dir)
        })
        .collect();

    let stem_of = |child: &FileBinding, is_dir: bool| {
        if is_dir || child.extension().is_none() {
            None
        } else {
            child.stem().map(str::to_string)
        }
    };

    let names: HashSet<&str> = children.iter().map(|(name, _, _)| name.as_str()).collect();
    let stem_counts = children
        .iter()
        .filter_map(|(_, child, is_dir)| stem_of(child, *is_dir))
        .counts();

    children
        .iter()
        .map(|(name, child, is_dir)| {
            let key = match stem_of(child, *is_dir) {
                Some(stem) if stem_counts.get(&stem) == Some(&1) && !names.contains(stem.as_str()) => {
                    stem
                }
                _ => name.clone(),
            };
            Listed {
                name: name.clone(),
                key,
                binding: child.clone(),
                is_dir: *is_dir,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldermap_core::{CodecKind, Value};
    use std::fs;
    use tempfile::TempDir;

    fn keys(container: &Container) -> Vec<String> {
        container.keys().cloned().sorted().collect()
    }

    #[test]
    fn test_child_keys_use_stems() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ini"), "").unwrap();
        fs::write(temp.path().join("README"), "").unwrap();
        fs::create_dir(temp.path().join("sub.d")).unwrap();

        let parent = FileBinding::new(temp.path());
        let mut pairs: Vec<(String, String)> = child_keys(
            &parent,
            vec!["a.ini".into(), "README".into(), "sub.d".into()],
        )
        .into_iter()
        .map(|child| (child.key, child.name))
        .collect();
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("README".to_string(), "README".to_string()),
                ("a".to_string(), "a.ini".to_string()),
                ("sub.d".to_string(), "sub.d".to_string()),
            ]
        );
    }

    #[test]
    fn test_child_keys_collisions_keep_full_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ini"), "").unwrap();
        fs::write(temp.path().join("a.json"), "").unwrap();
        fs::write(temp.path().join("b.ini"), "").unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();

        let parent = FileBinding::new(temp.path());
        for order in [
            vec!["a.ini", "a.json", "b.ini", "b"],
            vec!["b", "b.ini", "a.json", "a.ini"],
        ] {
            let names = order.into_iter().map(String::from).collect();
            let keys: Vec<String> = child_keys(&parent, names)
                .into_iter()
                .map(|child| child.key)
                .sorted()
                .collect();
            assert_eq!(keys, ["a.ini", "a.json", "b", "b.ini"]);
        }
    }

    #[test]
    fn test_insert_binds_lazily() {
        let mut container = Container::new().bound("/data/cfg");
        container.insert("a", Leaf::new(CodecKind::Ini));
        container.insert("sub", Container::new());
        container.insert(
            "fixed",
            Leaf::bound(FileBinding::new("/elsewhere/x.json"), CodecKind::Json),
        );

        assert_eq!(
            container.leaf("a").and_then(Leaf::binding),
            Some(&FileBinding::new("/data/cfg/a.ini"))
        );
        assert_eq!(
            container.container("sub").and_then(Container::binding),
            Some(&FileBinding::new("/data/cfg/sub"))
        );
        assert_eq!(
            container.leaf("fixed").and_then(Leaf::binding),
            Some(&FileBinding::new("/elsewhere/x.json"))
        );
    }

    #[test]
    fn test_get_mut_derives_binding() {
        let mut container = Container::new();
        container.insert("a", Leaf::new(CodecKind::Ini));
        assert!(container.leaf("a").unwrap().binding().is_none());

        container.bind(FileBinding::new("/data/cfg"));
        assert!(container.leaf("a").unwrap().binding().is_none());
        let leaf = container.leaf_mut("a").unwrap();
        assert_eq!(leaf.binding(), Some(&FileBinding::new("/data/cfg/a.ini")));
    }

    #[test]
    fn test_set_files_overwrites_descendants() {
        let mut inner = Container::new();
        inner.insert("deep", Leaf::new(CodecKind::Json));

        let mut container = Container::new();
        container.insert("sub", inner);
        container.insert("x", Value::Int(1));
        container.bind(FileBinding::new("/new/root"));
        container.set_files();

        let sub = container.container("sub").unwrap();
        assert_eq!(sub.binding(), Some(&FileBinding::new("/new/root/sub")));
        assert_eq!(
            sub.leaf("deep").and_then(Leaf::binding),
            Some(&FileBinding::new("/new/root/sub/deep.json"))
        );
    }

    #[test]
    fn test_load_keeps_compatible_nodes() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ini"), "x=1").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let mut container = Container::new().bound(temp.path());
        let mut existing = Leaf::new(CodecKind::Ini);
        existing.insert("kept", true);
        container.insert("a", existing);
        // A leaf where a directory now is gets replaced.
        container.insert("sub", Leaf::new(CodecKind::Ini));

        container.load(&SyncSignal::new()).unwrap();
        assert_eq!(keys(&container), ["a", "sub"]);
        assert_eq!(
            container.leaf("a").unwrap().get("kept"),
            Some(&Value::Bool(true))
        );
        assert!(container.container("sub").is_some());
    }

    #[test]
    fn test_save_skips_scalars() {
        let temp = TempDir::new().unwrap();
        let mut container = Container::new().bound(temp.path().join("out"));
        container.insert("x", Value::Int(1));
        let mut leaf = Leaf::new(CodecKind::Ini);
        leaf.insert("k", "v");
        container.insert("a", leaf);

        let report = container.save(&SyncSignal::new());
        assert!(report.is_success());
        assert_eq!(report.children.len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("out/a.ini")).unwrap(),
            "k=v\n"
        );
    }

    #[test]
    fn test_serialize_as_nested_data() {
        let mut leaf = Leaf::new(CodecKind::Ini);
        leaf.insert("x", 1);
        let mut sub = Container::new();
        sub.insert("a", leaf);
        let mut container = Container::new();
        container.insert("sub", sub);
        container.insert("flag", Value::Bool(true));

        let json = serde_json::to_string(&container).unwrap();
        assert_eq!(json, r#"{"sub":{"a":{"x":1}},"flag":true}"#);
    }

    #[test]
    fn test_rename_child() {
        let temp = TempDir::new().unwrap();
        let mut container = Container::new().bound(temp.path());
        container.insert("first", Value::Int(0));
        container.insert("a", Leaf::new(CodecKind::Ini));
        container.insert("last", Value::Int(2));
        assert!(container.save(&SyncSignal::new()).is_success());

        container.rename_child("a", "b").unwrap();
        assert_eq!(
            container.keys().collect::<Vec<_>>(),
            ["first", "b", "last"]
        );
        assert!(temp.path().join("b.ini").exists());
        assert!(!temp.path().join("a.ini").exists());
        assert_eq!(
            container.leaf("b").and_then(Leaf::binding),
            Some(&FileBinding::new(temp.path().join("b.ini")))
        );

        assert!(matches!(
            container.rename_child("missing", "c"),
            Err(SyncError::KeyNotFound { .. })
        ));
        assert!(matches!(
            container.rename_child("b", "last"),
            Err(SyncError::KeyExists { .. })
        ));
    }
}
