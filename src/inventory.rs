// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Installed software inventory.
//!
//! Fuzzy-match detection needs to know what programs are installed on the
//! host. That knowledge comes from an [`InventoryProvider`], e.g., something
//! that reads the uninstall registry on Windows, or a plain listing file. The
//! provider is queried at most once per resolution run. Its records are cached
//! in an [`Inventory`] for the rest of the run, and never refreshed.
//!
//! # Listed Programs
//!
//! Package registries list a lot of things that are not really programs a user
//! would recognize: system components, updates, hotfixes, or entries that only
//! exist as children of another entry. Providers run raw records through
//! [`retain_listed`] so that only user-visible programs ever reach detection.

use glob::{MatchOptions, Pattern};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::{
    cell::OnceCell,
    fmt::Debug,
    fs::read_to_string,
    path::PathBuf,
};
use tracing::{debug, instrument};

/// Installed program that detection can match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRecord {
    /// Name of program as displayed to the user.
    pub display_name: String,

    /// Opaque identifier of program in its package registry.
    pub uninstall_key: String,
}

impl ProgramRecord {
    /// Construct new program record.
    pub fn new(display_name: impl Into<String>, uninstall_key: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            uninstall_key: uninstall_key.into(),
        }
    }
}

/// Raw package registry entry, before filtering.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawProgramRecord {
    pub display_name: Option<String>,
    pub uninstall_key: String,
    #[serde(default)]
    pub system_component: bool,
    pub parent_key_name: Option<String>,
    pub release_type: Option<String>,
    pub uninstall_string: Option<String>,
    #[serde(default)]
    pub no_remove: bool,
}

/// Keep only records of programs that a user would recognize as installed.
///
/// Drops records that lack a display name, are flagged as system components,
/// are linked to a parent entry, are sub-entries like updates, or can neither
/// be uninstalled nor are flagged as non-removable.
pub fn retain_listed(records: impl IntoIterator<Item = RawProgramRecord>) -> Vec<ProgramRecord> {
    records
        .into_iter()
        .filter(|record| !record.system_component)
        .filter(|record| record.parent_key_name.is_none())
        .filter(|record| record.release_type.is_none())
        .filter(|record| record.uninstall_string.is_some() || record.no_remove)
        .filter_map(|record| match record.display_name {
            Some(name) if !name.trim().is_empty() => {
                Some(ProgramRecord::new(name, record.uninstall_key))
            }
            _ => None,
        })
        .collect()
}

/// Source of installed program records.
pub trait InventoryProvider: Debug {
    /// List installed programs.
    fn installed_programs(&self) -> Result<Vec<ProgramRecord>>;
}

/// Inventory held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticInventory {
    records: Vec<ProgramRecord>,
}

impl StaticInventory {
    /// Construct new in-memory inventory.
    pub fn new(records: impl IntoIterator<Item = ProgramRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl InventoryProvider for StaticInventory {
    fn installed_programs(&self) -> Result<Vec<ProgramRecord>> {
        Ok(self.records.clone())
    }
}

/// Inventory listing file.
///
/// Reads raw registry entries from `[[program]]` tables of a TOML file, and
/// filters them through [`retain_listed`].
#[derive(Debug, Clone)]
pub struct TomlInventory {
    path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryListing {
    #[serde(default)]
    program: Vec<RawProgramRecord>,
}

impl TomlInventory {
    /// Construct new inventory that reads listing file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InventoryProvider for TomlInventory {
    fn installed_programs(&self) -> Result<Vec<ProgramRecord>> {
        let data = read_to_string(&self.path).map_err(|err| InventoryError::ReadListing {
            source: err,
            path: self.path.clone(),
        })?;
        let listing: InventoryListing =
            toml::de::from_str(&data).map_err(|err| InventoryError::ParseListing {
                source: err,
                path: self.path.clone(),
            })?;

        Ok(retain_listed(listing.program))
    }
}

/// How to match a pattern against display names.
///
/// Two independent flags select one of four modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchMode {
    pub case_sensitive: bool,
    pub regex: bool,
}

/// Cached snapshot of installed programs.
///
/// The provider is only queried when a lookup is first made.
#[derive(Debug)]
pub struct Inventory {
    provider: Box<dyn InventoryProvider>,
    snapshot: OnceCell<Vec<ProgramRecord>>,
}

impl Inventory {
    /// Construct new inventory backed by a provider.
    pub fn new(provider: impl InventoryProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            snapshot: OnceCell::new(),
        }
    }

    /// Construct inventory that lists no programs.
    pub fn empty() -> Self {
        Self::new(StaticInventory::default())
    }

    /// Get cached list of installed programs, querying provider if needed.
    ///
    /// # Errors
    ///
    /// - Return [`InventoryError`] if provider fails on first query. A failed
    ///   query is not cached, so the next call asks the provider again.
    pub fn programs(&self) -> Result<&[ProgramRecord]> {
        if let Some(records) = self.snapshot.get() {
            return Ok(records.as_slice());
        }

        let records = self.provider.installed_programs()?;
        debug!("cached {} installed program records", records.len());
        Ok(self.snapshot.get_or_init(|| records).as_slice())
    }

    /// Find installed programs whose display name matches pattern.
    ///
    /// Glob patterns must match the entire display name. Regular expressions
    /// may match anywhere in the display name.
    ///
    /// # Errors
    ///
    /// - Return [`InventoryError::Glob`] or [`InventoryError::Regex`] if
    ///   pattern is invalid.
    /// - Return [`InventoryError`] if provider fails.
    #[instrument(skip(self), level = "debug")]
    pub fn find(&self, pattern: &str, mode: MatchMode) -> Result<Vec<&ProgramRecord>> {
        let programs = self.programs()?;
        let matches = if mode.regex {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(!mode.case_sensitive)
                .build()?;
            programs
                .iter()
                .filter(|record| regex.is_match(&record.display_name))
                .collect()
        } else {
            let glob = Pattern::new(pattern)?;
            let options = MatchOptions {
                case_sensitive: mode.case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            };
            programs
                .iter()
                .filter(|record| glob.matches_with(&record.display_name, options))
                .collect()
        };

        Ok(matches)
    }
}

/// Inventory error types.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Listing file cannot be read.
    #[error("failed to read inventory listing at {:?}", path.display())]
    ReadListing {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Listing file cannot be parsed.
    #[error("failed to parse inventory listing at {:?}", path.display())]
    ParseListing {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    /// Glob pattern is invalid.
    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    /// Regular expression is invalid.
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// Provider specific failure.
    #[error("inventory provider failed: {0}")]
    Provider(String),
}

/// Friendly result alias :3
pub type Result<T, E = InventoryError> = std::result::Result<T, E>;
