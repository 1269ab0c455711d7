//! File-bound flat maps.

use std::path::Path;

use foldermap_codec::codec_for;
use foldermap_core::{CodecKind, FileBinding, SyncError, SyncSignal, Value, ValueMap};
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

/// A node bound to one file, holding the values its codec decodes from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    binding: Option<FileBinding>,
    extension: Option<String>,
    codec: CodecKind,
    values: ValueMap,
}

impl Leaf {
    /// Create an unbound leaf. Its file will use the codec's own extension.
    pub fn new(codec: CodecKind) -> Self {
        Self {
            binding: None,
            extension: Some(codec.extension().to_string()),
            codec,
            values: ValueMap::new(),
        }
    }

    /// Create a leaf bound to a file, read and written with `codec`.
    pub fn bound(binding: FileBinding, codec: CodecKind) -> Self {
        Self {
            extension: binding.extension().map(str::to_string),
            binding: Some(binding),
            codec,
            values: ValueMap::new(),
        }
    }

    /// Create a leaf for a file, picking the codec from its extension.
    pub fn for_file(binding: FileBinding) -> Self {
        let codec = CodecKind::for_extension(binding.extension());
        Self::bound(binding, codec)
    }

    pub fn binding(&self) -> Option<&FileBinding> {
        self.binding.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Attach to a file. The on-disk extension follows the new binding.
    pub fn bind(&mut self, binding: FileBinding) {
        self.extension = binding.extension().map(str::to_string);
        self.binding = Some(binding);
    }

    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Name of this leaf's file when stored under `key`.
    ///
    /// A key that already carries the extension is used as is.
    pub fn file_name(&self, key: &str) -> String {
        match &self.extension {
            Some(ext) if !key.ends_with(&format!(".{ext}")) => format!("{key}.{ext}"),
            _ => key.to_string(),
        }
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueMap {
        &mut self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace the values with the decoded contents of the bound file.
    ///
    /// Failures are recorded on the signal and returned.
    pub fn load(&mut self, signal: &SyncSignal) -> Result<(), SyncError> {
        let result = self.read();
        if let Err(err) = &result {
            signal.record(err);
        }
        result
    }

    /// Write the encoded values to the bound file.
    ///
    /// The file is left untouched when it already holds the same text.
    /// Failures are recorded on the signal and returned.
    pub fn save(&self, signal: &SyncSignal) -> Result<(), SyncError> {
        let result = self.write();
        if let Err(err) = &result {
            signal.record(err);
        }
        result
    }

    /// Move the file into another directory.
    pub fn move_to(&mut self, new_parent: &Path) -> Result<(), SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::Unbound)?;
        let moved = binding.move_to(new_parent)?;
        self.bind(moved);
        Ok(())
    }

    /// Rename the file within its directory.
    pub fn rename(&mut self, new_name: &str) -> Result<(), SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::Unbound)?;
        let renamed = binding.rename(new_name)?;
        self.bind(renamed);
        Ok(())
    }

    fn read(&mut self) -> Result<(), SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::Unbound)?;
        let path = binding.path();

        if !binding.exists() {
            return Err(SyncError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if binding.is_dir() {
            return Err(SyncError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let text = binding.read_to_string()?;
        self.values = codec_for(self.codec)
            .decode_document(&text)
            .map_err(|e| SyncError::codec(path, e))?;

        debug!(path = %path.display(), codec = %self.codec, values = self.values.len(), "Loaded leaf");
        Ok(())
    }

    fn write(&self) -> Result<(), SyncError> {
        let binding = self.binding.as_ref().ok_or(SyncError::Unbound)?;
        let path = binding.path();

        if binding.is_dir() {
            return Err(SyncError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let mut text = codec_for(self.codec)
            .encode_document(&self.values)
            .map_err(|e| SyncError::codec(path, e))?;
        if !text.is_empty() {
            text.push('\n');
        }

        if binding.exists() && binding.read_to_string().is_ok_and(|current| current == text) {
            trace!(path = %path.display(), "Leaf unchanged");
            return Ok(());
        }

        binding.write_str(&text)?;
        debug!(path = %path.display(), codec = %self.codec, values = self.values.len(), "Saved leaf");
        Ok(())
    }
}

impl Serialize for Leaf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}
