// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Component domain representation.
//!
//! A __component__ is the configuration bundle of one managed application. It
//! is rooted at one subdirectory of the dotfiles directory, and the name of
//! that subdirectory is the name of the component.
//!
//! # Component Lifecycle
//!
//! A component goes through three stages in one run:
//!
//! 1. __Detection__: the [`Detector`](detect::Detector) figures out whether
//!    the application behind the component is available on this machine, and
//!    where the component's files should be linked to. The resulting
//!    [`Availability`] is set once, and never recomputed during the run.
//! 2. __Reconciliation__: the [`TreeReconciler`](reconcile::TreeReconciler)
//!    walks the component's source tree against its install path, creating,
//!    validating, or removing symlinks. It produces an [`Outcome`], i.e., one
//!    boolean per leaf that it visited.
//! 3. __Aggregation__: the outcome is folded into an [`InstallState`] that
//!    summarizes the component for the user.
//!
//! Only components that are [`Available`](Availability::Available) or
//! [`AlwaysInstall`](Availability::AlwaysInstall) ever get an install path,
//! and thus only those components can ever be reconciled.
//!
//! # See Also
//!
//! 1. [`ComponentSettings`](crate::config::ComponentSettings)
//! 2. [`reconcile`]

pub mod detect;
pub mod link;
pub mod reconcile;
pub mod status;

pub use status::Outcome;

use crate::component::{
    detect::DetectError,
    reconcile::{ReconcileError, ReconcileOptions, TreeReconciler},
};

use std::{
    collections::HashSet,
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Component as PathComponent, Path, PathBuf},
    str::FromStr,
};

/// Whether a component's application is present or applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    Available,
    Unavailable,
    Ignored,
    AlwaysInstall,
    NeverInstall,
    DetectionFailure,
    NoLogic,
}

impl Availability {
    /// Component files may be linked.
    pub fn is_installable(self) -> bool {
        matches!(self, Self::Available | Self::AlwaysInstall)
    }

    fn token(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Ignored => "ignored",
            Self::AlwaysInstall => "always_install",
            Self::NeverInstall => "never_install",
            Self::DetectionFailure => "detection_failure",
            Self::NoLogic => "no_logic",
        }
    }
}

impl FromStr for Availability {
    type Err = ComponentError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let availability = match token {
            "available" => Self::Available,
            "unavailable" => Self::Unavailable,
            "ignored" => Self::Ignored,
            "always_install" => Self::AlwaysInstall,
            "never_install" => Self::NeverInstall,
            "detection_failure" => Self::DetectionFailure,
            "no_logic" => Self::NoLogic,
            _ => return Err(ComponentError::UnknownAvailability(token.into())),
        };

        Ok(availability)
    }
}

impl Display for Availability {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.token())
    }
}

/// Observed linking status of a component.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    Installed,
    NotInstalled,
    PartialInstall,
    Unknown,
    #[default]
    NotEvaluated,
}

impl Display for InstallState {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Installed => "installed",
            Self::NotInstalled => "not installed",
            Self::PartialInstall => "partially installed",
            Self::Unknown => "unknown",
            Self::NotEvaluated => "not evaluated",
        })
    }
}

/// One managed application.
///
/// Identity, paths, and detection results are fixed once detection finishes.
/// Only the install state changes afterwards.
#[derive(Debug)]
pub struct Component {
    name: String,
    friendly_name: Option<String>,
    availability: Availability,
    source_path: PathBuf,
    install_path: Option<PathBuf>,
    ignore_paths: HashSet<PathBuf>,
    hide_symlinks: bool,
    uninstall_key: Option<String>,
    detection_error: Option<DetectError>,
    state: InstallState,
}

impl Component {
    /// Construct new undetected component.
    ///
    /// Resolves canonical source path of component against dotfiles
    /// directory. The component starts out as a detection failure until
    /// detection says otherwise.
    ///
    /// # Errors
    ///
    /// - Return [`ComponentError::InvalidName`] if name is not a single,
    ///   non-hidden directory name.
    /// - Return [`ComponentError::MissingSource`] if source path is not an
    ///   existing directory.
    pub(crate) fn new(name: impl Into<String>, dotfiles: impl AsRef<Path>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        let source_path = dotfiles.as_ref().join(&name);
        if !source_path.is_dir() {
            return Err(ComponentError::MissingSource { name, source_path });
        }

        // INVARIANT: Symlinks always point at absolute, canonical source paths.
        let source_path = match fs::canonicalize(&source_path) {
            Ok(path) => path,
            Err(_) => return Err(ComponentError::MissingSource { name, source_path }),
        };

        Ok(Self {
            name,
            friendly_name: None,
            availability: Availability::DetectionFailure,
            source_path,
            install_path: None,
            ignore_paths: HashSet::new(),
            hide_symlinks: false,
            uninstall_key: None,
            detection_error: None,
            state: InstallState::NotEvaluated,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Root that component files get linked into.
    ///
    /// Only ever set for installable components.
    pub fn install_path(&self) -> Option<&Path> {
        self.install_path.as_deref()
    }

    pub fn hide_symlinks(&self) -> bool {
        self.hide_symlinks
    }

    pub fn uninstall_key(&self) -> Option<&str> {
        self.uninstall_key.as_deref()
    }

    /// Reason detection failed, or install path could not be resolved.
    pub fn detection_error(&self) -> Option<&DetectError> {
        self.detection_error.as_ref()
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Check if source-relative path must not be linked.
    pub fn is_ignored(&self, relative: impl AsRef<Path>) -> bool {
        self.ignore_paths.contains(relative.as_ref())
    }

    /// Source-relative paths excluded from linking.
    pub fn ignore_paths(&self) -> impl Iterator<Item = &Path> {
        self.ignore_paths.iter().map(PathBuf::as_path)
    }

    /// Record state from reconciliation outcome.
    pub fn apply_outcome(&mut self, outcome: &Outcome, is_removal: bool) -> InstallState {
        self.state = outcome.aggregate(is_removal);
        self.state
    }

    /// Compute current install state without touching the file system.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError`] if component cannot be reconciled.
    pub fn probe(&mut self) -> Result<InstallState, ReconcileError> {
        let outcome = TreeReconciler::new(self, ReconcileOptions::probe())?.install();
        Ok(self.apply_outcome(&outcome, false))
    }

    /// Link component files into install path.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError`] if component cannot be reconciled.
    pub fn install(&mut self, options: ReconcileOptions) -> Result<InstallState, ReconcileError> {
        let outcome = TreeReconciler::new(self, options)?.install();
        Ok(self.apply_outcome(&outcome, false))
    }

    /// Unlink component files from install path.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError`] if component cannot be reconciled.
    pub fn remove(&mut self, options: ReconcileOptions) -> Result<InstallState, ReconcileError> {
        let outcome = TreeReconciler::new(self, options)?.remove();
        Ok(self.apply_outcome(&outcome, true))
    }
}

/// Check that component name names exactly one top-level entry of the
/// dotfiles directory.
///
/// # Errors
///
/// - Return [`ComponentError::InvalidName`] if name is empty, hidden, spans
///   several path components, or is anything but a plain name like `..`.
pub fn validate_name(name: &str) -> Result<()> {
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(PathComponent::Normal(part)), None)
            if part == OsStr::new(name) && !name.starts_with('.') =>
        {
            Ok(())
        }
        _ => Err(ComponentError::InvalidName(name.into())),
    }
}

impl Display for Component {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match &self.friendly_name {
            Some(friendly_name) => write!(fmt, "{} ({friendly_name})", self.name),
            None => fmt.write_str(&self.name),
        }
    }
}

/// Component construction error types.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// Name does not refer to a single top-level directory.
    #[error("invalid component name {0:?}")]
    InvalidName(String),

    /// Source directory of component does not exist.
    #[error("source directory of component {name:?} not found at {:?}", source_path.display())]
    MissingSource { name: String, source_path: PathBuf },

    /// Availability token is not recognized.
    #[error("unknown availability {0:?}")]
    UnknownAvailability(String),
}

/// Friendly result alias :3
type Result<T, E = ComponentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(Availability::Available, true; "available")]
    #[test_case(Availability::AlwaysInstall, true; "always install")]
    #[test_case(Availability::Unavailable, false; "unavailable")]
    #[test_case(Availability::Ignored, false; "ignored")]
    #[test_case(Availability::NeverInstall, false; "never install")]
    #[test_case(Availability::DetectionFailure, false; "detection failure")]
    #[test_case(Availability::NoLogic, false; "no logic")]
    #[test]
    fn installable_availability(availability: Availability, expect: bool) {
        assert_eq!(availability.is_installable(), expect);
    }

    #[test]
    fn availability_tokens_round_trip() {
        for availability in [
            Availability::Available,
            Availability::Unavailable,
            Availability::Ignored,
            Availability::AlwaysInstall,
            Availability::NeverInstall,
            Availability::DetectionFailure,
            Availability::NoLogic,
        ] {
            let parsed = availability.to_string().parse::<Availability>().ok();
            assert_eq!(parsed, Some(availability));
        }
    }

    #[test_case(".."; "parent directory")]
    #[test_case("."; "current directory")]
    #[test_case(""; "empty")]
    #[test_case(".metadata"; "hidden")]
    #[test_case("nvim/lua"; "nested")]
    #[test_case("nvim/"; "trailing separator")]
    #[test_case("/etc"; "absolute")]
    #[test]
    fn reject_names_outside_dotfiles_top_level(name: &str) {
        let dotfiles = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dotfiles.path().join(".metadata")).unwrap();
        std::fs::create_dir_all(dotfiles.path().join("nvim/lua")).unwrap();

        assert!(matches!(
            Component::new(name, dotfiles.path()),
            Err(ComponentError::InvalidName(_))
        ));
    }

    #[test]
    fn new_component_requires_source_directory() -> anyhow::Result<()> {
        let dotfiles = tempfile::tempdir()?;
        std::fs::create_dir(dotfiles.path().join("vim"))?;
        std::fs::write(dotfiles.path().join("notes.txt"), "not a component")?;

        let component = Component::new("vim", dotfiles.path())?;
        assert_eq!(component.name(), "vim");
        assert_eq!(
            component.source_path(),
            std::fs::canonicalize(dotfiles.path().join("vim"))?
        );
        assert_eq!(component.availability(), Availability::DetectionFailure);
        assert_eq!(component.state(), InstallState::NotEvaluated);
        assert_eq!(component.install_path(), None);

        assert!(matches!(
            Component::new("emacs", dotfiles.path()),
            Err(ComponentError::MissingSource { .. })
        ));
        assert!(matches!(
            Component::new("notes.txt", dotfiles.path()),
            Err(ComponentError::MissingSource { .. })
        ));

        Ok(())
    }
}
