// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the dotfiles directory, and for
//! the install destinations that component metadata can refer to.
//!
//! # Special Folders
//!
//! Component metadata anchors relative install paths to a __special folder__,
//! i.e., a well-known per-user directory like the home directory or the
//! configuration directory. Special folders are named by a token in the
//! metadata file, and resolved through the platform conventions known to the
//! [`dirs`] crate. Not every platform provides every special folder, e.g.,
//! there is no `preference` directory outside of macOS that differs from
//! `config`, and there is no `executable` directory on Windows.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Component, Path, PathBuf},
    str::FromStr,
};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Determine default absolute path to dotfiles directory.
///
/// Uses `$HOME/dotfiles` as the default dotfiles directory. Does not check if
/// the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn default_dotfiles_dir() -> Result<PathBuf> {
    home_dir().map(|path| path.join("dotfiles"))
}

/// Determine default absolute path to global metadata directory.
///
/// Global metadata is kept in a hidden `.metadata` directory at the top-level
/// of the dotfiles directory, so it is never mistaken for a component.
pub fn default_metadata_dir(dotfiles: impl AsRef<Path>) -> PathBuf {
    dotfiles.as_ref().join(".metadata")
}

/// Well-known per-user directory that install paths can be anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialFolder {
    Home,
    Config,
    ConfigLocal,
    Data,
    DataLocal,
    Cache,
    Desktop,
    Documents,
    Downloads,
    Pictures,
    Music,
    Videos,
    Executable,
    Preference,
    State,
    Template,
    Font,
    Public,
}

impl SpecialFolder {
    /// Resolve special folder to an absolute path.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::UnsupportedFolder`] if current platform does not
    ///   provide the special folder.
    pub fn resolve(self) -> Result<PathBuf> {
        let path = match self {
            Self::Home => dirs::home_dir(),
            Self::Config => dirs::config_dir(),
            Self::ConfigLocal => dirs::config_local_dir(),
            Self::Data => dirs::data_dir(),
            Self::DataLocal => dirs::data_local_dir(),
            Self::Cache => dirs::cache_dir(),
            Self::Desktop => dirs::desktop_dir(),
            Self::Documents => dirs::document_dir(),
            Self::Downloads => dirs::download_dir(),
            Self::Pictures => dirs::picture_dir(),
            Self::Music => dirs::audio_dir(),
            Self::Videos => dirs::video_dir(),
            Self::Executable => dirs::executable_dir(),
            Self::Preference => dirs::preference_dir(),
            Self::State => dirs::state_dir(),
            Self::Template => dirs::template_dir(),
            Self::Font => dirs::font_dir(),
            Self::Public => dirs::public_dir(),
        };

        path.ok_or(PathError::UnsupportedFolder(self))
    }

    fn token(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Config => "config",
            Self::ConfigLocal => "config_local",
            Self::Data => "data",
            Self::DataLocal => "data_local",
            Self::Cache => "cache",
            Self::Desktop => "desktop",
            Self::Documents => "documents",
            Self::Downloads => "downloads",
            Self::Pictures => "pictures",
            Self::Music => "music",
            Self::Videos => "videos",
            Self::Executable => "executable",
            Self::Preference => "preference",
            Self::State => "state",
            Self::Template => "template",
            Self::Font => "font",
            Self::Public => "public",
        }
    }
}

impl FromStr for SpecialFolder {
    type Err = PathError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let folder = match token.to_ascii_lowercase().as_str() {
            "home" => Self::Home,
            "config" => Self::Config,
            "config_local" => Self::ConfigLocal,
            "data" => Self::Data,
            "data_local" => Self::DataLocal,
            "cache" => Self::Cache,
            "desktop" => Self::Desktop,
            "documents" => Self::Documents,
            "downloads" => Self::Downloads,
            "pictures" => Self::Pictures,
            "music" => Self::Music,
            "videos" => Self::Videos,
            "executable" => Self::Executable,
            "preference" => Self::Preference,
            "state" => Self::State,
            "template" => Self::Template,
            "font" => Self::Font,
            "public" => Self::Public,
            _ => return Err(PathError::UnknownFolder(token.into())),
        };

        Ok(folder)
    }
}

impl Display for SpecialFolder {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.token())
    }
}

/// Check that a path is syntactically well-formed.
///
/// Does not check whether the path exists. A path is malformed when it is
/// empty, contains a NUL byte, or (on Windows) uses a character that the
/// file system forbids in a path component.
///
/// # Errors
///
/// - Return [`PathError::Malformed`] if path is not well-formed.
pub fn validate(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let malformed = |reason: &str| PathError::Malformed {
        path: path.to_path_buf(),
        reason: reason.into(),
    };

    if path.as_os_str().is_empty() {
        return Err(malformed("path is empty"));
    }

    let lossy = path.to_string_lossy();
    if lossy.contains('\0') {
        return Err(malformed("path contains a NUL byte"));
    }

    for component in path.components() {
        if let Component::Normal(part) = component {
            let part = part.to_string_lossy();
            if cfg!(windows) && part.contains(['<', '>', '"', '|', '?', '*', ':']) {
                return Err(malformed("path component contains a reserved character"));
            }
        }
    }

    Ok(())
}

/// Path resolution error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's home directory.
    ///
    /// # See Also
    ///
    /// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Special folder token is not recognized.
    #[error("unknown special folder {0:?}")]
    UnknownFolder(String),

    /// Special folder does not exist on this platform.
    #[error("special folder {0:?} is not available on this platform")]
    UnsupportedFolder(SpecialFolder),

    /// Path is not syntactically valid.
    #[error("malformed path {:?}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
