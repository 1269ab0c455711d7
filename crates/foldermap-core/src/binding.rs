//! Filesystem bindings for nodes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::SyncError;

/// Handle to one filesystem entry.
///
/// A binding is only a path; every query goes to the filesystem, so the
/// answers reflect the disk at call time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileBinding {
    path: PathBuf,
}

impl FileBinding {
    /// Create a binding for a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The bound path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the entry exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Check if the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    /// Names of the direct children, in the order the OS returns them.
    ///
    /// Names that are not valid UTF-8 cannot be used as keys and are skipped.
    pub fn list_children(&self) -> Result<Vec<String>, SyncError> {
        let entries = fs::read_dir(&self.path).map_err(|e| SyncError::io(&self.path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::io(&self.path, e))?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    warn!(parent = %self.path.display(), name = ?raw, "Skipping non UTF-8 entry")
                }
            }
        }
        Ok(names)
    }

    /// Binding for a direct child.
    pub fn child(&self, name: &str) -> FileBinding {
        FileBinding::new(self.path.join(name))
    }

    /// File name of the entry.
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Extension of the entry, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// File name without its extension.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// Create the directory and any missing parents.
    pub fn mkdirs(&self) -> Result<(), SyncError> {
        fs::create_dir_all(&self.path).map_err(|e| SyncError::io(&self.path, e))
    }

    /// Read the whole file as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String, SyncError> {
        fs::read_to_string(&self.path).map_err(|e| SyncError::io(&self.path, e))
    }

    /// Replace the file contents, creating missing parent directories.
    pub fn write_str(&self, contents: &str) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
            }
        }
        fs::write(&self.path, contents).map_err(|e| SyncError::io(&self.path, e))
    }

    /// Move the entry into another directory, keeping its name.
    ///
    /// Returns the binding of the moved entry.
    pub fn move_to(&self, new_parent: &Path) -> Result<FileBinding, SyncError> {
        let name = self
            .path
            .file_name()
            .ok_or_else(|| SyncError::PathNotFound {
                path: self.path.clone(),
            })?;
        let target = new_parent.join(name);

        if !new_parent.exists() {
            fs::create_dir_all(new_parent).map_err(|e| SyncError::io(new_parent, e))?;
        }
        fs::rename(&self.path, &target).map_err(|e| SyncError::io(&self.path, e))?;
        Ok(FileBinding::new(target))
    }

    /// Rename the entry within its directory.
    ///
    /// Returns the binding of the renamed entry.
    pub fn rename(&self, new_name: &str) -> Result<FileBinding, SyncError> {
        validate_name(new_name).map_err(|reason| SyncError::InvalidName {
            name: new_name.to_string(),
            reason,
        })?;

        let parent = self.path.parent().unwrap_or(Path::new(""));
        let target = parent.join(new_name);

        if target.exists() && target != self.path {
            return Err(SyncError::Io {
                path: target,
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("'{new_name}' already exists"),
                ),
            });
        }

        fs::rename(&self.path, &target).map_err(|e| SyncError::io(&self.path, e))?;
        Ok(FileBinding::new(target))
    }
}

impl From<PathBuf> for FileBinding {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for FileBinding {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for FileBinding {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Validate an entry name for rename targets.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 characters)".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{c}'"));
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_list_children_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"bad\xff.ini")), "").unwrap();
        fs::write(temp.path().join("good.ini"), "").unwrap();

        let children = FileBinding::new(temp.path()).list_children().unwrap();
        assert_eq!(children, ["good.ini"]);
    }

    #[test]
    fn test_child_and_extension() {
        let root = FileBinding::new("/data/cfg");
        let child = root.child("a.ini");
        assert_eq!(child.path(), Path::new("/data/cfg/a.ini"));
        assert_eq!(child.extension(), Some("ini"));
        assert_eq!(child.stem(), Some("a"));
        assert_eq!(root.child("sub").extension(), None);
    }

    #[test]
    fn test_list_children() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ini"), "x=1").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let mut names = FileBinding::new(temp.path()).list_children().unwrap();
        names.sort();
        assert_eq!(names, vec!["a.ini".to_string(), "sub".to_string()]);
    }

    #[test]
    fn test_list_children_missing() {
        let temp = TempDir::new().unwrap();
        let missing = FileBinding::new(temp.path().join("missing"));
        assert!(matches!(
            missing.list_children(),
            Err(SyncError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let binding = FileBinding::new(temp.path().join("a/b/c.ini"));
        binding.write_str("x=1").unwrap();
        assert_eq!(binding.read_to_string().unwrap(), "x=1");
    }

    #[test]
    fn test_rename_and_move() {
        let temp = TempDir::new().unwrap();
        let binding = FileBinding::new(temp.path().join("old.ini"));
        binding.write_str("x=1").unwrap();

        let renamed = binding.rename("new.ini").unwrap();
        assert!(!binding.exists());
        assert!(renamed.exists());

        let moved = renamed.move_to(&temp.path().join("dest")).unwrap();
        assert_eq!(moved.path(), temp.path().join("dest/new.ini"));
        assert!(moved.exists());
    }

    #[test]
    fn test_rename_rejects_existing_target() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "").unwrap();
        fs::write(temp.path().join("b"), "").unwrap();
        let binding = FileBinding::new(temp.path().join("a"));
        assert!(binding.rename("b").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("test.ini").is_ok());
        assert!(validate_name(".hidden").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }
}
