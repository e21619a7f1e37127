// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Component detection.
//!
//! Detection decides whether the application behind a component is present on
//! this machine. How that decision is made depends on the detection strategy
//! given by component metadata:
//!
//! - __Fuzzy match__: match a pattern against the display names of installed
//!   programs. Exactly one match means the application is available. More
//!   than one match is ambiguous, and is never resolved by picking one.
//! - __Path search__: look for a binary in the executable search path.
//! - __Path exists__: check that an absolute path exists.
//! - __Static__: metadata states the availability outright.
//!
//! A component without any metadata is either fuzzy matched by its name when
//! autodetection is enabled, or left with [`Availability::NoLogic`] otherwise.
//!
//! Installable components also get their install path resolved here.

use crate::{
    component::{Availability, Component, ComponentError},
    config::{ComponentSettings, ConfigError, InstallDestination, Strategy},
    inventory::{Inventory, InventoryError, MatchMode},
    path::{self, PathError},
};

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument};

/// Name of component-local metadata file inside a component's source
/// directory.
pub const CUSTOM_METADATA_FILE: &str = "component.toml";

/// Component detection context.
///
/// Holds everything detection needs for one resolution run. The inventory is
/// only queried once, the first time a component needs fuzzy matching.
#[derive(Debug)]
pub struct Detector {
    inventory: Inventory,
    autodetect: bool,
    search_path: Option<OsString>,
}

impl Detector {
    /// Construct new detector over inventory of installed programs.
    ///
    /// Autodetection starts disabled, and binaries are searched for in the
    /// `PATH` of the current process.
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            autodetect: false,
            search_path: env::var_os("PATH"),
        }
    }

    /// Fuzzy match components that have no metadata at all.
    pub fn with_autodetect(mut self, autodetect: bool) -> Self {
        self.autodetect = autodetect;
        self
    }

    /// Search for binaries in given search path instead of `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Resolve named component in dotfiles directory.
    ///
    /// Detection problems never fail resolution. They leave the component
    /// with [`Availability::DetectionFailure`], and keep the error around in
    /// [`Component::detection_error`]. Install path problems keep the
    /// detected availability, but leave the component without an install
    /// path.
    ///
    /// # Errors
    ///
    /// - Return [`ComponentError::MissingSource`] if component has no source
    ///   directory.
    #[instrument(skip(self, dotfiles, metadata), level = "debug")]
    pub fn resolve(
        &self,
        name: &str,
        dotfiles: impl AsRef<Path>,
        metadata: Result<Option<ComponentSettings>, ConfigError>,
    ) -> Result<Component, ComponentError> {
        let mut component = Component::new(name, dotfiles)?;
        component
            .ignore_paths
            .insert(PathBuf::from(CUSTOM_METADATA_FILE));

        if let Err(err) = self.detect(&mut component, metadata) {
            error!("cannot detect component {name:?}: {err}");
            if !matches!(err, DetectError::InstallPath { .. }) {
                component.availability = Availability::DetectionFailure;
            }
            component.detection_error = Some(err);
        }

        debug!(
            "component {name:?} is {} with install path {:?}",
            component.availability, component.install_path
        );

        Ok(component)
    }

    fn detect(
        &self,
        component: &mut Component,
        metadata: Result<Option<ComponentSettings>, ConfigError>,
    ) -> Result<()> {
        let settings = match metadata? {
            Some(settings) => settings,
            None if self.autodetect => ComponentSettings::default(),
            None => {
                component.availability = Availability::NoLogic;
                return Ok(());
            }
        };

        component.friendly_name = settings.friendly_name.clone();
        component.hide_symlinks = settings.hide_symlinks.unwrap_or(false);
        component
            .ignore_paths
            .extend(settings.ignore_paths().iter().map(PathBuf::from));

        let availability = match settings.strategy(&component.name)? {
            Strategy::FuzzyMatch {
                pattern,
                case_sensitive,
                regex,
            } => self.fuzzy_match(
                component,
                &pattern,
                MatchMode {
                    case_sensitive,
                    regex,
                },
            )?,
            Strategy::PathSearch { binary } => self.path_search(&binary),
            Strategy::PathExists { path } => available_if(path.exists()),
            Strategy::Static(availability) => availability,
        };
        component.availability = availability;

        // INVARIANT: Only installable components get an install path.
        if availability.is_installable() {
            let install_path = settings
                .destination()
                .map_err(DetectError::from)
                .and_then(|destination| resolve_install_path(&destination))
                .map_err(|err| DetectError::InstallPath {
                    name: component.name.clone(),
                    source: Box::new(err),
                })?;
            component.install_path = Some(install_path);
        }

        Ok(())
    }

    fn fuzzy_match(
        &self,
        component: &mut Component,
        pattern: &str,
        mode: MatchMode,
    ) -> Result<Availability> {
        let matches = self.inventory.find(pattern, mode)?;
        match matches.as_slice() {
            [] => Ok(Availability::Unavailable),
            [record] => {
                info!(
                    "component {:?} matched installed program {:?}",
                    component.name, record.display_name
                );
                component.uninstall_key = Some(record.uninstall_key.clone());
                if component.friendly_name.is_none() {
                    component.friendly_name = Some(record.display_name.clone());
                }
                Ok(Availability::Available)
            }
            records => Err(DetectError::Ambiguous {
                name: component.name.clone(),
                pattern: pattern.into(),
                matches: records.iter().map(|r| r.display_name.clone()).collect(),
            }),
        }
    }

    fn path_search(&self, binary: &str) -> Availability {
        match which::which_in(binary, self.search_path.as_ref(), Path::new(".")) {
            Ok(found) => {
                debug!("found {binary:?} at {:?}", found.display());
                Availability::Available
            }
            Err(err) => {
                debug!("cannot find {binary:?} in search path: {err}");
                Availability::Unavailable
            }
        }
    }
}

fn available_if(present: bool) -> Availability {
    if present {
        Availability::Available
    } else {
        Availability::Unavailable
    }
}

/// Resolve install destination to an absolute path.
///
/// # Errors
///
/// - Return [`DetectError::Path`] if special folder cannot be resolved, or if
///   resulting path is malformed.
pub fn resolve_install_path(destination: &InstallDestination) -> Result<PathBuf> {
    let install_path = match destination {
        InstallDestination::Home => path::home_dir()?,
        InstallDestination::Folder(folder) => folder.resolve()?,
        InstallDestination::Absolute(path) => path.clone(),
        InstallDestination::Joined(folder, path) => folder.resolve()?.join(path),
    };
    path::validate(&install_path)?;

    Ok(install_path)
}

/// Detection error types.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// Component metadata is malformed or contradictory.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Inventory cannot be queried.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Fuzzy match found more than one installed program.
    #[error("pattern {pattern:?} of component {name:?} matches several programs: {matches:?}")]
    Ambiguous {
        name: String,
        pattern: String,
        matches: Vec<String>,
    },

    /// Install path cannot be resolved.
    #[error("cannot resolve install path of component {name:?}")]
    InstallPath {
        name: String,
        #[source]
        source: Box<DetectError>,
    },

    /// Path cannot be resolved or is malformed.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Friendly result alias :3
type Result<T, E = DetectError> = std::result::Result<T, E>;
