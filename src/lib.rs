// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Detect installed applications and symlink their dotfiles into place.
//!
//! A dotfiles directory is split into __components__, one subdirectory per
//! managed application. dotlink figures out whether each application is
//! present on the machine, resolves where its files belong, and mirrors the
//! component's source tree into that location with symbolic links.
//!
//! # See Also
//!
//! 1. [`store::DotfilesStore`]
//! 2. [`component::detect::Detector`]
//! 3. [`component::reconcile::TreeReconciler`]

pub mod component;
pub mod config;
pub mod inventory;
pub mod path;
pub mod store;

pub use component::{Availability, Component, InstallState, Outcome};
pub use store::DotfilesStore;
