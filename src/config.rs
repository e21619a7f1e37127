// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for component metadata files that dotlink uses to
//! simplify the process of serialization and deserialization. File I/O is left
//! to the caller to figure out.
//!
//! # Metadata Layers
//!
//! A component can be described by two metadata documents: a __global__
//! document kept in the metadata directory, and a __custom__ document kept
//! inside the component's own source directory. Both documents share the same
//! layout. The custom document overrides the global one field by field through
//! [`ComponentSettings::overlay`], so a custom document that only sets
//! `hide_symlinks` keeps every other setting of the global document intact.
//!
//! # General Layout
//!
//! ```toml
//! [component]
//! friendly_name = "Neovim"
//! hide_symlinks = false
//! ignore = ["README.md"]
//!
//! [component.detection]
//! method = "find_installed_program"
//! pattern = "*neovim*"
//!
//! [component.install]
//! special_folder = "config"
//! path = "nvim"
//! ```

use crate::{
    component::Availability,
    path::{PathError, SpecialFolder},
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Component metadata document.
///
/// Every metadata document must contain a top-level `[component]` table. A
/// document without one is not considered to be component metadata at all.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ComponentDocument {
    pub component: Option<ComponentSettings>,
}

impl ComponentDocument {
    /// Take component settings out of document.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingComponent`] if document lacks a
    ///   top-level `[component]` table.
    pub fn into_settings(self) -> Result<ComponentSettings> {
        self.component.ok_or(ConfigError::MissingComponent)
    }
}

impl FromStr for ComponentDocument {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut document: ComponentDocument =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(settings) = document.component.as_mut() {
            if let Some(path) = settings.install.as_mut().and_then(|i| i.path.as_mut()) {
                *path = expand(path)?;
            }
            if let Some(path) = settings.detection.as_mut().and_then(|d| d.path.as_mut()) {
                *path = expand(path)?;
            }
        }

        Ok(document)
    }
}

impl Display for ComponentDocument {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand(path: &str) -> Result<String> {
    Ok(shellexpand::full(path)
        .map_err(ConfigError::ShellExpansion)?
        .into_owned())
}

/// Component configuration settings.
///
/// All fields are optional so that a custom document can override any subset
/// of a global document.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ComponentSettings {
    /// Display label of the component.
    pub friendly_name: Option<String>,

    /// Mark created symlinks as hidden system files where supported.
    pub hide_symlinks: Option<bool>,

    /// Source-relative paths that must never be linked.
    pub ignore: Option<Vec<String>>,

    /// How to detect the component's application.
    pub detection: Option<DetectionSettings>,

    /// Where to link the component's files to.
    pub install: Option<InstallSettings>,
}

impl ComponentSettings {
    /// Overlay custom settings on top of these settings.
    ///
    /// Any field set in `custom` wins, any field missing from `custom` keeps
    /// the value from `self`. Nested detection and install tables are merged
    /// the same way.
    pub fn overlay(self, custom: ComponentSettings) -> ComponentSettings {
        ComponentSettings {
            friendly_name: custom.friendly_name.or(self.friendly_name),
            hide_symlinks: custom.hide_symlinks.or(self.hide_symlinks),
            ignore: custom.ignore.or(self.ignore),
            detection: match (self.detection, custom.detection) {
                (Some(global), Some(custom)) => Some(global.overlay(custom)),
                (global, custom) => custom.or(global),
            },
            install: match (self.install, custom.install) {
                (Some(global), Some(custom)) => Some(global.overlay(custom)),
                (global, custom) => custom.or(global),
            },
        }
    }

    /// Determine detection strategy for named component.
    ///
    /// A missing `[component.detection]` table, or a missing `method`, falls
    /// back to fuzzy matching with default parameters.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::UnknownMethod`] if detection method is not
    ///   recognized.
    /// - Return [`ConfigError::MissingPath`] if path-exists strategy has no
    ///   absolute path to check.
    /// - Return [`ConfigError::MissingAvailability`] or
    ///   [`ConfigError::InvalidAvailability`] if static strategy lacks a valid
    ///   availability value.
    pub fn strategy(&self, name: &str) -> Result<Strategy> {
        let detection = self.detection.clone().unwrap_or_default();
        let method = detection
            .method
            .as_deref()
            .unwrap_or("find_installed_program");

        let strategy = match method {
            "find_installed_program" => Strategy::FuzzyMatch {
                pattern: detection.pattern.unwrap_or_else(|| format!("*{name}*")),
                case_sensitive: detection.case_sensitive.unwrap_or(false),
                regex: detection.regex.unwrap_or(false),
            },
            "find_in_path" => Strategy::PathSearch {
                binary: detection.binary.unwrap_or_else(|| name.to_string()),
            },
            "path_exists" => {
                let path = detection.path.map(PathBuf::from).ok_or(ConfigError::MissingPath)?;
                if !path.is_absolute() {
                    return Err(ConfigError::RelativePath(path));
                }
                Strategy::PathExists { path }
            }
            "static" => {
                let value = detection.availability.ok_or(ConfigError::MissingAvailability)?;
                let availability = value
                    .parse::<Availability>()
                    .ok()
                    .filter(|a| *a != Availability::DetectionFailure)
                    .ok_or(ConfigError::InvalidAvailability(value))?;
                Strategy::Static(availability)
            }
            unknown => return Err(ConfigError::UnknownMethod(unknown.into())),
        };

        Ok(strategy)
    }

    /// Determine install destination.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Path`] if special folder token is unknown.
    /// - Return [`ConfigError::UnanchoredPath`] if a relative path is given
    ///   without a special folder.
    /// - Return [`ConfigError::ContradictoryDestination`] if an absolute path
    ///   is given together with a special folder.
    pub fn destination(&self) -> Result<InstallDestination> {
        let install = self.install.clone().unwrap_or_default();
        let folder = install
            .special_folder
            .as_deref()
            .map(str::parse::<SpecialFolder>)
            .transpose()?;
        let path = install.path.map(PathBuf::from);

        let destination = match (folder, path) {
            (None, None) => InstallDestination::Home,
            (Some(folder), None) => InstallDestination::Folder(folder),
            (None, Some(path)) if path.is_absolute() => InstallDestination::Absolute(path),
            (None, Some(path)) => return Err(ConfigError::UnanchoredPath(path)),
            (Some(folder), Some(path)) if path.is_absolute() => {
                return Err(ConfigError::ContradictoryDestination { folder, path })
            }
            (Some(folder), Some(path)) => InstallDestination::Joined(folder, path),
        };

        Ok(destination)
    }

    /// Ignore paths listed by settings.
    pub fn ignore_paths(&self) -> &[String] {
        self.ignore.as_deref().unwrap_or_default()
    }
}

/// Detection settings of component.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DetectionSettings {
    /// Detection strategy tag.
    pub method: Option<String>,

    /// Pattern to match installed program display names with.
    pub pattern: Option<String>,

    /// Match pattern case-sensitively.
    pub case_sensitive: Option<bool>,

    /// Treat pattern as regular expression instead of glob.
    pub regex: Option<bool>,

    /// Binary to search for in executable search path.
    pub binary: Option<String>,

    /// Absolute path whose existence determines availability.
    pub path: Option<String>,

    /// Fixed availability value.
    pub availability: Option<String>,
}

impl DetectionSettings {
    fn overlay(self, custom: DetectionSettings) -> DetectionSettings {
        DetectionSettings {
            method: custom.method.or(self.method),
            pattern: custom.pattern.or(self.pattern),
            case_sensitive: custom.case_sensitive.or(self.case_sensitive),
            regex: custom.regex.or(self.regex),
            binary: custom.binary.or(self.binary),
            path: custom.path.or(self.path),
            availability: custom.availability.or(self.availability),
        }
    }
}

/// Install settings of component.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct InstallSettings {
    /// Special folder token to anchor install path to.
    pub special_folder: Option<String>,

    /// Install path, absolute or relative to special folder.
    pub path: Option<String>,
}

impl InstallSettings {
    fn overlay(self, custom: InstallSettings) -> InstallSettings {
        InstallSettings {
            special_folder: custom.special_folder.or(self.special_folder),
            path: custom.path.or(self.path),
        }
    }
}

/// Detection strategy.
///
/// Each strategy only carries the parameters it actually uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Match installed program display names against a pattern.
    FuzzyMatch {
        pattern: String,
        case_sensitive: bool,
        regex: bool,
    },

    /// Search executable search path for a binary.
    PathSearch { binary: String },

    /// Check that an absolute path exists.
    PathExists { path: PathBuf },

    /// Use fixed availability.
    Static(Availability),
}

/// Where component files get linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallDestination {
    /// User's home directory.
    Home,

    /// Special folder by itself.
    Folder(SpecialFolder),

    /// Absolute path.
    Absolute(PathBuf),

    /// Relative path anchored to special folder.
    Joined(SpecialFolder, PathBuf),
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read metadata document.
    #[error("failed to read metadata document at {:?}", path.display())]
    ReadDocument {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Document lacks a top-level `[component]` table.
    #[error("metadata document has no [component] table")]
    MissingComponent,

    /// Detection method tag is not recognized.
    #[error("unknown detection method {0:?}")]
    UnknownMethod(String),

    /// Path-exists detection lacks a path.
    #[error("path_exists detection requires a path")]
    MissingPath,

    /// Path-exists detection was given a relative path.
    #[error("path_exists detection requires an absolute path, got {:?}", .0.display())]
    RelativePath(PathBuf),

    /// Static detection lacks an availability value.
    #[error("static detection requires an availability value")]
    MissingAvailability,

    /// Static detection availability value is not recognized.
    #[error("invalid static availability {0:?}")]
    InvalidAvailability(String),

    /// Relative install path without special folder.
    #[error("install path {:?} must be absolute or anchored to a special folder", .0.display())]
    UnanchoredPath(PathBuf),

    /// Absolute install path with special folder.
    #[error("install path {:?} is absolute but special folder {folder} was also given", path.display())]
    ContradictoryDestination {
        folder: SpecialFolder,
        path: PathBuf,
    },

    /// Special folder cannot be understood.
    #[error(transparent)]
    Path(#[from] PathError),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
