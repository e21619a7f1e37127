// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symlink handling.
//!
//! Thin wrappers over platform symlink calls. Windows distinguishes file
//! symlinks from directory symlinks, both when creating and when removing
//! them, while unix does not care.
//!
//! # Hidden Symlinks
//!
//! Components can ask for their symlinks to be hidden, so they do not clutter
//! directories like the home directory in file explorers. On Windows links are
//! marked with the hidden and system attributes through `attrib`. On macOS
//! links get the `hidden` flag through `chflags`. Other platforms have no such
//! attributes, and hiding is a no-op there.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::debug;

/// Kind of file system entry found at a path, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Missing,
    Symlink,
    Directory,
    File,
}

/// Inspect entry at path without following a final symlink.
///
/// # Errors
///
/// - Return [`LinkError::Inspect`] if metadata cannot be read for any reason
///   other than the path not existing.
pub fn inspect(path: impl AsRef<Path>) -> Result<EntryKind> {
    let path = path.as_ref();
    match path.symlink_metadata() {
        Ok(metadata) if metadata.file_type().is_symlink() => Ok(EntryKind::Symlink),
        Ok(metadata) if metadata.is_dir() => Ok(EntryKind::Directory),
        Ok(_) => Ok(EntryKind::File),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(EntryKind::Missing),
        Err(err) => Err(LinkError::Inspect {
            source: err,
            path: path.to_path_buf(),
        }),
    }
}

/// Create symlink at `link` pointing to `original`.
///
/// # Errors
///
/// - Return [`LinkError::Create`] if symlink cannot be created.
pub fn create_symlink(original: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<()> {
    let (original, link) = (original.as_ref(), link.as_ref());
    debug!("symlink {:?} -> {:?}", link.display(), original.display());
    platform_symlink(original, link).map_err(|err| LinkError::Create {
        source: err,
        original: original.to_path_buf(),
        link: link.to_path_buf(),
    })
}

/// Check if an entry could be created at `path`.
///
/// The closest existing ancestor of `path` must be a directory. Missing
/// ancestors in between are fine, they get created on demand.
pub fn has_usable_parent(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .ancestors()
        .skip(1)
        .find(|ancestor| ancestor.symlink_metadata().is_ok())
        .is_some_and(|ancestor| ancestor.is_dir())
}

/// Create directory at `path` along with any missing parents.
///
/// # Errors
///
/// - Return [`LinkError::CreateDir`] if directory cannot be created.
pub fn create_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    debug!("create directory {:?}", path.display());
    mkdirp::mkdirp(path)
        .map(|_| ())
        .map_err(|err| LinkError::CreateDir {
            source: err,
            path: path.to_path_buf(),
        })
}

/// Create missing parents of `path`.
///
/// # Errors
///
/// - Return [`LinkError::CreateDir`] if a parent cannot be created.
pub fn create_parents(path: impl AsRef<Path>) -> Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.exists() => create_dir(parent),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn platform_symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn platform_symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    }
}

/// Fully resolve symlink at `link`, following every layer of indirection.
///
/// # Errors
///
/// - Return [`LinkError::Resolve`] if symlink is dangling, or any layer
///   cannot be read.
pub fn resolve(link: impl AsRef<Path>) -> Result<PathBuf> {
    let link = link.as_ref();
    fs::canonicalize(link).map_err(|err| LinkError::Resolve {
        source: err,
        path: link.to_path_buf(),
    })
}

/// Check if symlink at `link` ultimately points to `expected`.
///
/// Both sides are canonicalized before comparison. A dangling symlink never
/// points to anything.
pub fn points_to(link: impl AsRef<Path>, expected: impl AsRef<Path>) -> bool {
    match (resolve(link), fs::canonicalize(expected.as_ref())) {
        (Ok(target), Ok(expected)) => target == expected,
        _ => false,
    }
}

/// Remove symlink at `link` without touching what it points to.
///
/// # Errors
///
/// - Return [`LinkError::Remove`] if symlink cannot be removed.
pub fn remove_symlink(link: impl AsRef<Path>) -> Result<()> {
    let link = link.as_ref();
    debug!("unlink {:?}", link.display());
    platform_unlink(link).map_err(|err| LinkError::Remove {
        source: err,
        path: link.to_path_buf(),
    })
}

#[cfg(unix)]
fn platform_unlink(link: &Path) -> std::io::Result<()> {
    fs::remove_file(link)
}

// INVARIANT: Directory symlinks on Windows must go through remove_dir, which
// removes the link itself and never recurses into the target.
#[cfg(windows)]
fn platform_unlink(link: &Path) -> std::io::Result<()> {
    if link.is_dir() {
        fs::remove_dir(link)
    } else {
        fs::remove_file(link)
    }
}

/// Mark symlink as hidden system file where the platform supports it.
///
/// # Errors
///
/// - Return [`LinkError::Attribute`] if attribute tool fails.
pub fn hide(link: impl AsRef<Path>) -> Result<()> {
    let link = link.as_ref();
    let (tool, args) = if cfg!(windows) {
        ("attrib", vec![OsStr::new("+H"), OsStr::new("+S"), OsStr::new("/L")])
    } else if cfg!(target_os = "macos") {
        ("chflags", vec![OsStr::new("-h"), OsStr::new("hidden")])
    } else {
        debug!("platform has no hidden attribute for {:?}", link.display());
        return Ok(());
    };

    set_attributes(tool, args, link).map_err(|err| LinkError::Attribute {
        source: err,
        path: link.to_path_buf(),
    })
}

/// Run attribute tool on `link` without any user interaction.
fn set_attributes<'a>(tool: &str, mut args: Vec<&'a OsStr>, link: &'a Path) -> std::io::Result<()> {
    args.push(link.as_os_str());
    let output = Command::new(tool).args(&args).output()?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(output.stderr.as_slice());
    let code = output
        .status
        .code()
        .map_or_else(|| "a signal".to_string(), |code| format!("code {code}"));
    Err(std::io::Error::other(format!(
        "{tool} could not mark {:?} hidden, exited with {code}: {}",
        link.display(),
        stderr.trim_end()
    )))
}

/// Symlink handling error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to create symlink {:?} -> {:?}", link.display(), original.display())]
    Create {
        #[source]
        source: std::io::Error,
        original: PathBuf,
        link: PathBuf,
    },

    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to resolve symlink {:?}", path.display())]
    Resolve {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to remove symlink {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to set hidden attributes on {:?}", path.display())]
    Attribute {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inspect_entry_kinds() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let file = root.path().join("file");
        let dir = root.path().join("dir");
        let link = root.path().join("link");
        fs::write(&file, "data")?;
        fs::create_dir(&dir)?;
        create_symlink(&dir, &link)?;

        assert_eq!(inspect(&file)?, EntryKind::File);
        assert_eq!(inspect(&dir)?, EntryKind::Directory);
        assert_eq!(inspect(&link)?, EntryKind::Symlink);
        assert_eq!(inspect(root.path().join("nope"))?, EntryKind::Missing);

        Ok(())
    }

    #[test]
    fn points_to_follows_layers() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let source = root.path().join("source");
        let first = root.path().join("first");
        let second = root.path().join("second");
        fs::write(&source, "data")?;
        create_symlink(&source, &first)?;
        create_symlink(&first, &second)?;

        assert!(points_to(&second, &source));
        assert!(!points_to(&second, root.path()));

        fs::remove_file(&source)?;
        assert!(!points_to(&second, &source));

        Ok(())
    }

    #[test]
    fn usable_parent_is_closest_existing_directory() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join("file"), "data")?;

        assert!(has_usable_parent(root.path().join("entry")));
        assert!(has_usable_parent(root.path().join("missing/deeper/entry")));
        assert!(!has_usable_parent(root.path().join("file/entry")));
        assert!(!has_usable_parent(root.path().join("file/missing/entry")));

        create_parents(root.path().join("missing/deeper/entry"))?;
        assert_eq!(inspect(root.path().join("missing/deeper"))?, EntryKind::Directory);
        assert_eq!(inspect(root.path().join("missing/deeper/entry"))?, EntryKind::Missing);

        Ok(())
    }

    #[test]
    fn failed_attribute_tool_names_link_and_exit_code() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let link = root.path().join("link");

        let err = set_attributes("false", Vec::new(), &link).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("false could not mark"));
        assert!(message.contains(&format!("{:?}", link.display())));
        assert!(message.contains("exited with code 1"));

        Ok(())
    }

    #[test]
    fn remove_directory_symlink_keeps_target_contents() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let dir = root.path().join("dir");
        let link = root.path().join("link");
        fs::create_dir(&dir)?;
        fs::write(dir.join("keep.me"), "data")?;
        create_symlink(&dir, &link)?;

        remove_symlink(&link)?;
        assert_eq!(inspect(&link)?, EntryKind::Missing);
        assert!(dir.join("keep.me").is_file());

        Ok(())
    }
}
