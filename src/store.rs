// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfiles store management.
//!
//! dotlink groups components together into one place called the __dotfiles
//! store__. The dotfiles store houses every component that the user manages.
//!
//! # Dotfiles Store Layout
//!
//! The dotfiles store can generally be placed anywhere on the user's file
//! system. However, the default location is `$HOME/dotfiles`. Each component
//! is a top-level directory of the store, and the name of that directory is
//! the name of the component. So, `$HOME/dotfiles/nvim` means that the store
//! contains a component named "nvim".
//!
//! ```text
//! dotfiles/
//! ├── .metadata/          global metadata, one document per component
//! │   └── nvim.toml
//! ├── nvim/               component "nvim"
//! │   ├── component.toml  custom metadata, never linked
//! │   └── init.lua
//! └── git/                component "git"
//!     └── .gitconfig
//! ```
//!
//! Only the top-level of the store is evaluated, and top-level directories
//! whose name starts with a dot are never components.

use crate::{
    component::{
        detect::{Detector, CUSTOM_METADATA_FILE},
        reconcile::{ReconcileError, ReconcileOptions},
        validate_name, Component, ComponentError, InstallState,
    },
    config::{ComponentDocument, ComponentSettings, ConfigError},
    path::default_metadata_dir,
};

use std::{
    fs::{self, read_to_string},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Directory of components.
#[derive(Debug, Clone)]
pub struct DotfilesStore {
    root: PathBuf,
    metadata_dir: PathBuf,
}

impl DotfilesStore {
    /// Open existing dotfiles store.
    ///
    /// Global metadata is looked up in the default metadata directory of the
    /// store unless [`DotfilesStore::with_metadata_dir`] says otherwise.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotFound`] if store is not an existing
    ///   directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = fs::canonicalize(path)
            .ok()
            .filter(|root| root.is_dir())
            .ok_or_else(|| StoreError::NotFound {
                root: path.to_path_buf(),
            })?;
        let metadata_dir = default_metadata_dir(&root);

        Ok(Self { root, metadata_dir })
    }

    /// Look up global metadata in another directory.
    pub fn with_metadata_dir(mut self, metadata_dir: impl Into<PathBuf>) -> Self {
        self.metadata_dir = metadata_dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// List names of all components in store, sorted.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ReadRoot`] if store cannot be read.
    pub fn component_names(&self) -> Result<Vec<String>> {
        let read_root = |err| StoreError::ReadRoot {
            source: err,
            root: self.root.clone(),
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(read_root)? {
            let entry = entry.map_err(read_root)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(names)
    }

    /// Load merged metadata of named component.
    ///
    /// Reads global metadata from `<metadata_dir>/<name>.toml`, and custom
    /// metadata from `<store>/<name>/component.toml`. Custom metadata is
    /// overlaid on global metadata field by field. Returns `None` if neither
    /// document exists.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError`] if either document cannot be read, parsed, or
    ///   lacks a `[component]` table.
    pub fn load_metadata(&self, name: &str) -> Result<Option<ComponentSettings>, ConfigError> {
        let global = read_settings(self.metadata_dir.join(format!("{name}.toml")))?;
        let custom = read_settings(self.root.join(name).join(CUSTOM_METADATA_FILE))?;

        Ok(match (global, custom) {
            (Some(global), Some(custom)) => Some(global.overlay(custom)),
            (global, custom) => custom.or(global),
        })
    }

    /// Resolve named component.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Component`] if name is invalid, or component
    ///   has no source directory.
    pub fn resolve(&self, detector: &Detector, name: &str) -> Result<Component> {
        validate_name(name)?;
        let metadata = self.load_metadata(name);
        Ok(detector.resolve(name, &self.root, metadata)?)
    }

    /// Resolve every component in store, and probe current install state of
    /// each installable one.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError`] if store cannot be read, or any component
    ///   cannot be constructed.
    #[instrument(skip(self, detector), level = "debug")]
    pub fn discover(&self, detector: &Detector) -> Result<Vec<Component>> {
        let mut components = Vec::new();
        for name in self.component_names()? {
            let mut component = self.resolve(detector, &name)?;
            if component.availability().is_installable() && component.install_path().is_some() {
                let state = component.probe()?;
                debug!("component {name:?} probed as {state}");
            }
            components.push(component);
        }

        Ok(components)
    }

    /// Install component if it is installable.
    ///
    /// Components that are not installable are skipped, and keep their
    /// current install state.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Reconcile`] if installable component has no
    ///   install path.
    pub fn install(&self, component: &mut Component, options: ReconcileOptions) -> Result<InstallState> {
        if !component.availability().is_installable() {
            info!("skip {component}, it is {}", component.availability());
            return Ok(component.state());
        }

        let state = component.install(options)?;
        info!("{component} is {state}");

        Ok(state)
    }

    /// Remove component if it is installable.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Reconcile`] if installable component has no
    ///   install path.
    pub fn remove(&self, component: &mut Component, options: ReconcileOptions) -> Result<InstallState> {
        if !component.availability().is_installable() {
            info!("skip {component}, it is {}", component.availability());
            return Ok(component.state());
        }

        let state = component.remove(options)?;
        info!("{component} is {state}");

        Ok(state)
    }
}

fn read_settings(path: impl AsRef<Path>) -> Result<Option<ComponentSettings>, ConfigError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(None);
    }

    debug!("read metadata {:?}", path.display());
    let data = read_to_string(path).map_err(|err| ConfigError::ReadDocument {
        source: err,
        path: path.to_path_buf(),
    })?;
    let document: ComponentDocument = data.parse()?;

    document.into_settings().map(Some)
}

/// All possible error types for dotfiles store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store directory does not exist.
    #[error("dotfiles store not found at {:?}", root.display())]
    NotFound { root: PathBuf },

    /// Store directory cannot be read.
    #[error("failed to read dotfiles store at {:?}", root.display())]
    ReadRoot {
        #[source]
        source: std::io::Error,
        root: PathBuf,
    },

    /// Component cannot be constructed.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Component cannot be reconciled.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn open_missing_store() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            DotfilesStore::open(root.path().join("nope")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn component_names_skip_hidden_and_files() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        for dir in ["zsh", ".metadata", "git", ".git"] {
            fs::create_dir(root.path().join(dir))?;
        }
        fs::write(root.path().join("README.md"), "# dotfiles")?;

        let store = DotfilesStore::open(root.path())?;
        assert_eq!(store.component_names()?, vec!["git".to_string(), "zsh".to_string()]);

        Ok(())
    }

    #[test]
    fn load_metadata_overlays_custom_on_global() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join(".metadata"))?;
        fs::create_dir_all(root.path().join("nvim"))?;
        fs::write(
            root.path().join(".metadata/nvim.toml"),
            indoc! {r#"
                [component]
                friendly_name = "Neovim"
                ignore = ["README.md"]

                [component.detection]
                method = "find_in_path"
                binary = "nvim"

                [component.install]
                special_folder = "config"
                path = "nvim"
            "#},
        )?;
        fs::write(
            root.path().join("nvim/component.toml"),
            indoc! {r#"
                [component]
                hide_symlinks = true

                [component.install]
                path = "nvim-custom"
            "#},
        )?;

        let store = DotfilesStore::open(root.path())?;
        let settings = store.load_metadata("nvim")?.expect("metadata exists");
        assert_eq!(settings.friendly_name.as_deref(), Some("Neovim"));
        assert_eq!(settings.hide_symlinks, Some(true));
        assert_eq!(settings.ignore_paths(), &["README.md".to_string()]);
        let install = settings.install.expect("install table exists");
        assert_eq!(install.special_folder.as_deref(), Some("config"));
        assert_eq!(install.path.as_deref(), Some("nvim-custom"));
        let detection = settings.detection.expect("detection table exists");
        assert_eq!(detection.binary.as_deref(), Some("nvim"));

        assert_eq!(store.load_metadata("git")?, None);

        Ok(())
    }

    #[test]
    fn resolve_rejects_names_escaping_store() -> anyhow::Result<()> {
        let parent = tempfile::tempdir()?;
        let root = parent.path().join("dotfiles");
        fs::create_dir_all(root.join(".metadata"))?;
        fs::create_dir_all(root.join("nvim/lua"))?;

        let store = DotfilesStore::open(&root)?;
        let detector = Detector::new(crate::inventory::Inventory::empty());
        for name in ["..", ".metadata", "nvim/lua", "../dotfiles"] {
            assert!(matches!(
                store.resolve(&detector, name),
                Err(StoreError::Component(ComponentError::InvalidName(_)))
            ));
        }
        assert_eq!(store.resolve(&detector, "nvim")?.name(), "nvim");

        Ok(())
    }

    #[test]
    fn load_metadata_rejects_document_without_component_table() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join("tmux"))?;
        fs::write(
            root.path().join("tmux/component.toml"),
            indoc! {r#"
                [settings]
                description = "wrong layout"
            "#},
        )?;

        let store = DotfilesStore::open(root.path())?;
        assert!(matches!(
            store.load_metadata("tmux"),
            Err(ConfigError::MissingComponent)
        ));

        Ok(())
    }
}
