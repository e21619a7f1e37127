// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Reconciliation outcome aggregation.
//!
//! Every leaf that a reconciliation pass visits contributes one boolean to an
//! [`Outcome`]: `true` if the leaf ended up the way the pass wanted it to, and
//! `false` if it ran into a conflict or failure. The outcome as a whole is
//! then folded into one [`InstallState`].
//!
//! Removal passes flip polarity. Removing every leaf successfully means the
//! component is not installed anymore, while failing to remove any leaf means
//! the component is still installed.

use crate::component::InstallState;

/// Flat sequence of per-leaf reconciliation results.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outcome {
    leaves: Vec<bool>,
}

impl Outcome {
    /// Construct new empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record result of one leaf.
    pub fn push(&mut self, success: bool) {
        self.leaves.push(success);
    }

    /// Append results of another pass.
    pub fn append(&mut self, other: Outcome) {
        self.leaves.extend(other.leaves);
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Fold outcome into install state.
    pub fn aggregate(&self, is_removal: bool) -> InstallState {
        aggregate(&self.leaves, is_removal)
    }
}

impl From<Vec<bool>> for Outcome {
    fn from(leaves: Vec<bool>) -> Self {
        Self { leaves }
    }
}

impl FromIterator<bool> for Outcome {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            leaves: iter.into_iter().collect(),
        }
    }
}

/// Fold per-leaf results into install state.
///
/// An empty sequence says nothing about the component, so it is
/// [`InstallState::Unknown`]. A mix of successes and failures is always
/// [`InstallState::PartialInstall`], no matter the polarity.
pub fn aggregate(leaves: &[bool], is_removal: bool) -> InstallState {
    if leaves.is_empty() {
        return InstallState::Unknown;
    }

    let all_true = leaves.iter().all(|leaf| *leaf);
    let all_false = leaves.iter().all(|leaf| !*leaf);

    match (all_true, all_false, is_removal) {
        (true, _, false) => InstallState::Installed,
        (true, _, true) => InstallState::NotInstalled,
        (_, true, false) => InstallState::NotInstalled,
        (_, true, true) => InstallState::Installed,
        _ => InstallState::PartialInstall,
    }
}
