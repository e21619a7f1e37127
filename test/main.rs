// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

#[cfg(unix)]
mod integration;

use dotlink::{component::detect::Detector, inventory::Inventory, store::DotfilesStore};

use anyhow::Result;
use indoc::formatdoc;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Dotfiles directory paired with a scratch home directory.
pub(crate) struct StoreFixture {
    dotfiles: TempDir,
    home: TempDir,
}

impl StoreFixture {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            dotfiles: tempfile::tempdir()?,
            home: tempfile::tempdir()?,
        })
    }

    pub(crate) fn dotfiles(&self) -> &Path {
        self.dotfiles.path()
    }

    pub(crate) fn home(&self) -> PathBuf {
        // INVARIANT: Compare against canonical paths, temp dirs may sit behind a symlink.
        fs::canonicalize(self.home.path()).unwrap_or_else(|_| self.home.path().to_path_buf())
    }

    /// Write file into component source tree, creating parents along the way.
    pub(crate) fn source_file(
        &self,
        component: &str,
        relative: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let path = self.dotfiles().join(component).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents.as_ref())?;

        Ok(())
    }

    /// Write global metadata document of component.
    pub(crate) fn global_metadata(&self, component: &str, contents: impl AsRef<str>) -> Result<()> {
        let dir = self.dotfiles().join(".metadata");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{component}.toml")), contents.as_ref())?;

        Ok(())
    }

    /// Write custom metadata document of component.
    pub(crate) fn custom_metadata(&self, component: &str, contents: impl AsRef<str>) -> Result<()> {
        self.source_file(component, "component.toml", contents)
    }

    /// Metadata that always installs component into `install_path`.
    pub(crate) fn always_install(&self, install_path: &Path) -> String {
        formatdoc! {r#"
            [component.detection]
            method = "static"
            availability = "always_install"

            [component.install]
            path = "{}"
        "#, install_path.display()}
    }

    pub(crate) fn store(&self) -> Result<DotfilesStore> {
        Ok(DotfilesStore::open(self.dotfiles())?)
    }
}

pub(crate) fn detector(inventory: Inventory) -> Detector {
    Detector::new(inventory).with_search_path("")
}
