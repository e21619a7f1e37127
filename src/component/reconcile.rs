// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Component tree reconciliation.
//!
//! Reconciliation walks a component's source tree alongside its install path,
//! and makes the install path refer to the source tree through symlinks.
//!
//! # Merge Points
//!
//! Every source directory maps to the equivalent relative path under the
//! install path, with the source root mapping onto the install path itself.
//! A source directory whose target does not exist yet is linked as a whole
//! unit. A source directory whose target already exists as a real directory
//! is treated as a __merge point__ instead: the directory is left alone, and
//! reconciliation descends into it to link the source directory's files and
//! subdirectories one by one. This is what lets a component share a directory
//! like `~/.config` with everything else on the system.
//!
//! A missing target is never linked as a unit when an ignored entry exists
//! somewhere below its source directory. A real directory is created in its
//! place instead, and reconciliation descends into it like any other merge
//! point. Missing parents of the install path are created on demand.
//!
//! # Outcomes
//!
//! Each leaf visited, i.e., each entry that got linked, verified, removed, or
//! found to be in conflict, adds one boolean to the [`Outcome`] of the pass.
//! Merge points and ignored paths add nothing. Conflicts are never resolved
//! automatically: an existing entry that is not the expected symlink is
//! reported and left untouched.
//!
//! # Simulation
//!
//! In [`Mode::Simulate`] the exact same decisions are made, and the exact same
//! outcome is produced, but the file system is never modified. A simulated
//! pass that runs silently doubles as a probe of the current install state.

use crate::component::{
    link::{self, EntryKind},
    Availability, Component, Outcome,
};

use std::{
    fmt::Display,
    fs::read_dir,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

/// Whether reconciliation may touch the file system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create and remove symlinks for real.
    #[default]
    Apply,

    /// Decide everything, change nothing.
    Simulate,
}

/// Reconciliation options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub mode: Mode,

    /// Demote user-facing diagnostics to debug logs.
    pub silent: bool,
}

impl ReconcileOptions {
    /// Options for a real pass.
    pub fn apply() -> Self {
        Self {
            mode: Mode::Apply,
            silent: false,
        }
    }

    /// Options for a dry run.
    pub fn simulate() -> Self {
        Self {
            mode: Mode::Simulate,
            silent: false,
        }
    }

    /// Options for a silent dry run that only computes current state.
    pub fn probe() -> Self {
        Self {
            mode: Mode::Simulate,
            silent: true,
        }
    }
}

/// Reconcile a component's source tree against its install path.
pub struct TreeReconciler<'a> {
    component: &'a Component,
    install_path: &'a Path,
    options: ReconcileOptions,
    hider: fn(&Path) -> link::Result<()>,
}

impl<'a> TreeReconciler<'a> {
    /// Construct new reconciler for component.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError::NotInstallable`] if component is not
    ///   available or always installed.
    /// - Return [`ReconcileError::NoInstallPath`] if component is installable
    ///   but its install path could not be resolved.
    pub fn new(component: &'a Component, options: ReconcileOptions) -> Result<Self> {
        if !component.availability().is_installable() {
            return Err(ReconcileError::NotInstallable {
                name: component.name().into(),
                availability: component.availability(),
            });
        }

        let install_path = component
            .install_path()
            .ok_or_else(|| ReconcileError::NoInstallPath {
                name: component.name().into(),
            })?;

        Ok(Self {
            component,
            install_path,
            options,
            hider: |path: &Path| link::hide(path),
        })
    }

    #[cfg(test)]
    fn with_hider(mut self, hider: fn(&Path) -> link::Result<()>) -> Self {
        self.hider = hider;
        self
    }

    /// Link entire source tree of component.
    pub fn install(&self) -> Outcome {
        self.install_dirs([self.component.source_path()])
    }

    /// Link given source directories of component.
    #[instrument(skip(self, dirs), fields(component = self.component.name()), level = "debug")]
    pub fn install_dirs(&self, dirs: impl IntoIterator<Item = impl AsRef<Path>>) -> Outcome {
        let mut outcome = Outcome::new();
        for dir in dirs {
            self.install_dir(dir.as_ref(), &mut outcome);
        }

        outcome
    }

    /// Unlink entire source tree of component.
    pub fn remove(&self) -> Outcome {
        self.remove_dirs([self.component.source_path()])
    }

    /// Unlink given source directories of component.
    #[instrument(skip(self, dirs), fields(component = self.component.name()), level = "debug")]
    pub fn remove_dirs(&self, dirs: impl IntoIterator<Item = impl AsRef<Path>>) -> Outcome {
        let mut outcome = Outcome::new();
        for dir in dirs {
            self.remove_dir(dir.as_ref(), &mut outcome);
        }

        outcome
    }

    fn install_dir(&self, source: &Path, outcome: &mut Outcome) {
        let Some(target) = self.target_of(source, outcome) else {
            return;
        };

        match link::inspect(&target) {
            Ok(EntryKind::Missing) if self.shelters_ignored(source) => {
                self.create_merge_point(source, &target, outcome)
            }
            Ok(EntryKind::Missing) => outcome.push(self.link(source, &target)),
            Ok(EntryKind::Symlink) => outcome.push(self.verify(source, &target)),
            Ok(EntryKind::File) => {
                self.conflict(format_args!(
                    "expected a directory but found a file at {:?} for {:?}",
                    target.display(),
                    source.display()
                ));
                outcome.push(false);
            }
            Ok(EntryKind::Directory) => {
                debug!("descend into merge point {:?}", target.display());
                self.descend(source, outcome, Self::install_file, Self::install_dir);
            }
            Err(err) => {
                self.conflict(format_args!("{err}"));
                outcome.push(false);
            }
        }
    }

    fn install_file(&self, source: &Path, outcome: &mut Outcome) {
        let Some(target) = self.target_of(source, outcome) else {
            return;
        };

        match link::inspect(&target) {
            Ok(EntryKind::Missing) => outcome.push(self.link(source, &target)),
            Ok(EntryKind::Symlink) => outcome.push(self.verify(source, &target)),
            Ok(EntryKind::Directory) => {
                self.conflict(format_args!(
                    "expected a file but found a directory at {:?} for {:?}",
                    target.display(),
                    source.display()
                ));
                outcome.push(false);
            }
            Ok(EntryKind::File) => {
                self.conflict(format_args!(
                    "expected a symlink but found a file at {:?} for {:?}",
                    target.display(),
                    source.display()
                ));
                outcome.push(false);
            }
            Err(err) => {
                self.conflict(format_args!("{err}"));
                outcome.push(false);
            }
        }
    }

    fn remove_dir(&self, source: &Path, outcome: &mut Outcome) {
        let Some(target) = self.target_of(source, outcome) else {
            return;
        };

        match link::inspect(&target) {
            Ok(EntryKind::Missing) => self.absent(&target),
            Ok(EntryKind::Symlink) => outcome.push(self.unlink(source, &target)),
            Ok(EntryKind::File) => {
                self.caution(format_args!(
                    "leaving file {:?} where directory {:?} was expected",
                    target.display(),
                    source.display()
                ));
                outcome.push(false);
            }
            Ok(EntryKind::Directory) => {
                debug!("descend into merge point {:?}", target.display());
                self.descend(source, outcome, Self::remove_file, Self::remove_dir);
            }
            Err(err) => {
                self.conflict(format_args!("{err}"));
                outcome.push(false);
            }
        }
    }

    fn remove_file(&self, source: &Path, outcome: &mut Outcome) {
        let Some(target) = self.target_of(source, outcome) else {
            return;
        };

        match link::inspect(&target) {
            Ok(EntryKind::Missing) => self.absent(&target),
            Ok(EntryKind::Symlink) => outcome.push(self.unlink(source, &target)),
            Ok(EntryKind::Directory | EntryKind::File) => {
                self.caution(format_args!(
                    "leaving {:?} untouched, it is not a symlink to {:?}",
                    target.display(),
                    source.display()
                ));
                outcome.push(false);
            }
            Err(err) => {
                self.conflict(format_args!("{err}"));
                outcome.push(false);
            }
        }
    }

    /// Visit immediate files, then immediate subdirectories, of a source
    /// directory in name order.
    fn descend(
        &self,
        source: &Path,
        outcome: &mut Outcome,
        on_file: fn(&Self, &Path, &mut Outcome),
        on_dir: fn(&Self, &Path, &mut Outcome),
    ) {
        let entries = match read_dir(source) {
            Ok(entries) => entries,
            Err(err) => {
                self.conflict(format_args!(
                    "failed to read source directory {:?}: {err}",
                    source.display()
                ));
                outcome.push(false);
                return;
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(err) => {
                    self.conflict(format_args!(
                        "failed to read entry of {:?}: {err}",
                        source.display()
                    ));
                    outcome.push(false);
                }
            }
        }
        paths.sort();

        let (dirs, files): (Vec<_>, Vec<_>) = paths.into_iter().partition(|path| path.is_dir());
        for file in files {
            on_file(self, &file, outcome);
        }
        for dir in dirs {
            on_dir(self, &dir, outcome);
        }
    }

    /// Map source entry onto its target under the install path.
    ///
    /// Returns `None` when the entry must be skipped, either because it is
    /// ignored, or because it lies outside of the component's source tree (in
    /// which case a failure is recorded).
    fn target_of(&self, source: &Path, outcome: &mut Outcome) -> Option<PathBuf> {
        let relative = match source.strip_prefix(self.component.source_path()) {
            Ok(relative) => relative,
            Err(_) => {
                self.conflict(format_args!(
                    "{:?} is not inside source directory {:?}",
                    source.display(),
                    self.component.source_path().display()
                ));
                outcome.push(false);
                return None;
            }
        };

        if self.component.is_ignored(relative) {
            debug!("ignore {:?}", relative.display());
            return None;
        }

        // INVARIANT: Source root maps onto install path itself.
        if relative.as_os_str().is_empty() {
            Some(self.install_path.to_path_buf())
        } else {
            Some(self.install_path.join(relative))
        }
    }

    /// Check if an existing ignored entry lies somewhere below source
    /// directory, so linking the directory as a unit would expose it.
    fn shelters_ignored(&self, source: &Path) -> bool {
        let root = self.component.source_path();
        let Ok(relative) = source.strip_prefix(root) else {
            return false;
        };

        self.component.ignore_paths().any(|ignored| {
            ignored != relative
                && ignored.starts_with(relative)
                && !matches!(link::inspect(root.join(ignored)), Ok(EntryKind::Missing))
        })
    }

    /// Create real directory at missing target, and descend into it as if it
    /// were a merge point.
    fn create_merge_point(&self, source: &Path, target: &Path, outcome: &mut Outcome) {
        if !link::has_usable_parent(target) {
            self.conflict(format_args!(
                "cannot create directory {:?}, its parent is not a directory",
                target.display()
            ));
            outcome.push(false);
            return;
        }

        if self.options.mode == Mode::Simulate {
            self.notice(format_args!("would create directory {:?}", target.display()));
        } else {
            if let Err(err) = link::create_dir(target) {
                self.conflict(format_args!("{err}"));
                outcome.push(false);
                return;
            }
            self.notice(format_args!("created directory {:?}", target.display()));
        }

        self.descend(source, outcome, Self::install_file, Self::install_dir);
    }

    fn link(&self, source: &Path, target: &Path) -> bool {
        // INVARIANT: Simulation and real runs must fail on the same targets.
        if !link::has_usable_parent(target) {
            self.conflict(format_args!(
                "cannot link {:?}, its parent is not a directory",
                target.display()
            ));
            return false;
        }

        if self.options.mode == Mode::Simulate {
            self.notice(format_args!(
                "would link {:?} -> {:?}",
                target.display(),
                source.display()
            ));
            return true;
        }

        if let Err(err) =
            link::create_parents(target).and_then(|_| link::create_symlink(source, target))
        {
            self.conflict(format_args!("{err}"));
            return false;
        }
        self.notice(format_args!(
            "linked {:?} -> {:?}",
            target.display(),
            source.display()
        ));

        // INVARIANT: Failing to hide a symlink does not make it any less linked.
        if self.component.hide_symlinks() {
            if let Err(err) = (self.hider)(target) {
                self.conflict(format_args!("{err}"));
            }
        }

        true
    }

    fn verify(&self, source: &Path, target: &Path) -> bool {
        if link::points_to(target, source) {
            debug!("already linked {:?}", target.display());
            return true;
        }

        let resolved = link::resolve(target)
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| "nothing".into());
        self.conflict(format_args!(
            "conflicting symlink {:?} points to {resolved:?} instead of {:?}",
            target.display(),
            source.display()
        ));

        false
    }

    fn unlink(&self, source: &Path, target: &Path) -> bool {
        if !link::points_to(target, source) {
            self.caution(format_args!(
                "leaving symlink {:?}, it does not point to {:?}",
                target.display(),
                source.display()
            ));
            return false;
        }

        if self.options.mode == Mode::Simulate {
            self.notice(format_args!("would unlink {:?}", target.display()));
            return true;
        }

        if let Err(err) = link::remove_symlink(target) {
            self.conflict(format_args!("{err}"));
            return false;
        }
        self.notice(format_args!("unlinked {:?}", target.display()));

        true
    }

    fn absent(&self, target: &Path) {
        self.notice(format_args!("{:?} is already absent", target.display()));
    }

    fn notice(&self, message: impl Display) {
        if self.options.silent {
            debug!("{message}");
        } else {
            info!("{message}");
        }
    }

    fn caution(&self, message: impl Display) {
        if self.options.silent {
            debug!("{message}");
        } else {
            warn!("{message}");
        }
    }

    fn conflict(&self, message: impl Display) {
        if self.options.silent {
            debug!("{message}");
        } else {
            error!("{message}");
        }
    }
}

/// Reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Component is not meant to be installed.
    #[error("component {name:?} is {availability}, and cannot be reconciled")]
    NotInstallable {
        name: String,
        availability: Availability,
    },

    /// Component is installable but has nowhere to be installed to.
    #[error("component {name:?} has no install path")]
    NoInstallPath { name: String },
}

/// Friendly result alias :3
type Result<T, E = ReconcileError> = std::result::Result<T, E>;
