// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{detector, StoreFixture};

use anyhow::Result;
use dotlink::{
    component::reconcile::{ReconcileError, ReconcileOptions},
    inventory::{Inventory, TomlInventory},
    store::StoreError,
    Availability, InstallState,
};
use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn install_then_remove_component() -> Result<()> {
    let fixture = StoreFixture::new()?;
    fixture.source_file("git", ".gitconfig", "[user]\n  name = John Doe\n")?;
    fixture.source_file("git", ".config/git/ignore", "*.swp\n")?;
    fixture.global_metadata("git", fixture.always_install(&fixture.home()))?;
    fixture.custom_metadata("git", "[component]\nfriendly_name = \"Git\"\n")?;
    fs::create_dir_all(fixture.home().join(".config"))?;

    let store = fixture.store()?;
    let detector = detector(Inventory::empty());
    let mut git = store.resolve(&detector, "git")?;
    assert_eq!(git.friendly_name(), Some("Git"));
    assert_eq!(git.availability(), Availability::AlwaysInstall);

    let state = store.install(&mut git, ReconcileOptions::apply())?;
    assert_eq!(state, InstallState::Installed);
    assert_eq!(
        fs::read_link(fixture.home().join(".gitconfig"))?,
        store.root().join("git/.gitconfig")
    );
    assert_eq!(
        fs::read_link(fixture.home().join(".config/git"))?,
        store.root().join("git/.config/git")
    );
    assert!(fs::symlink_metadata(fixture.home().join("component.toml")).is_err());

    // Idempotent.
    let state = store.install(&mut git, ReconcileOptions::apply())?;
    assert_eq!(state, InstallState::Installed);

    let state = store.remove(&mut git, ReconcileOptions::apply())?;
    assert_eq!(state, InstallState::NotInstalled);
    assert!(fs::symlink_metadata(fixture.home().join(".gitconfig")).is_err());
    assert!(fs::symlink_metadata(fixture.home().join(".config/git")).is_err());
    assert!(fixture.home().join(".config").is_dir());

    Ok(())
}

#[test]
fn dry_run_leaves_file_system_alone() -> Result<()> {
    let fixture = StoreFixture::new()?;
    fixture.source_file("zsh", ".zshrc", "export EDITOR=nvim\n")?;
    fixture.source_file("zsh", ".zshenv", "export PATH\n")?;
    fixture.global_metadata("zsh", fixture.always_install(&fixture.home()))?;

    let store = fixture.store()?;
    let detector = detector(Inventory::empty());
    let mut zsh = store.resolve(&detector, "zsh")?;

    let state = store.install(&mut zsh, ReconcileOptions::simulate())?;
    assert_eq!(state, InstallState::Installed);
    assert!(fs::symlink_metadata(fixture.home().join(".zshrc")).is_err());
    assert!(fs::symlink_metadata(fixture.home().join(".zshenv")).is_err());

    Ok(())
}

#[test]
fn discover_resolves_and_probes_every_component() -> Result<()> {
    let fixture = StoreFixture::new()?;
    fixture.source_file("git", ".gitconfig", "[core]\n")?;
    fixture.global_metadata("git", fixture.always_install(&fixture.home()))?;

    fixture.source_file("zsh", ".zshrc", "setopt autocd\n")?;
    fixture.source_file("zsh", ".zshenv", "export PATH\n")?;
    fixture.global_metadata("zsh", fixture.always_install(&fixture.home()))?;
    fs::write(fixture.home().join(".zshrc"), "# hand written\n")?;

    fixture.source_file("tmux", ".tmux.conf", "set -g mouse on\n")?;

    fixture.source_file("vim", ".vimrc", "set nocompatible\n")?;
    fixture.global_metadata(
        "vim",
        indoc! {r#"
            [component.detection]
            method = "static"
            availability = "never_install"
        "#},
    )?;

    fixture.source_file("broken", "file", "data")?;
    fixture.custom_metadata("broken", "[component\nfriendly_name = ")?;

    let store = fixture.store()?;
    let detector = detector(Inventory::empty());
    let components = store.discover(&detector)?;

    let summary = components
        .iter()
        .map(|c| (c.name(), c.availability(), c.state()))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("broken", Availability::DetectionFailure, InstallState::NotEvaluated),
            ("git", Availability::AlwaysInstall, InstallState::Installed),
            ("tmux", Availability::NoLogic, InstallState::NotEvaluated),
            ("vim", Availability::NeverInstall, InstallState::NotEvaluated),
            ("zsh", Availability::AlwaysInstall, InstallState::PartialInstall),
        ]
    );
    assert!(components[0].detection_error().is_some());

    // Probing never touches the file system.
    assert!(fs::symlink_metadata(fixture.home().join(".gitconfig")).is_err());
    assert!(fs::symlink_metadata(fixture.home().join(".zshenv")).is_err());
    assert_eq!(fs::read_to_string(fixture.home().join(".zshrc"))?, "# hand written\n");

    Ok(())
}

#[test]
fn installed_program_listing_drives_detection() -> Result<()> {
    let fixture = StoreFixture::new()?;
    let listing = fixture.dotfiles().join(".programs.toml");
    fs::write(
        &listing,
        indoc! {r#"
            [[program]]
            display_name = "Neovim 0.10"
            uninstall_key = "neovim"
            uninstall_string = "/usr/libexec/uninstall-neovim"

            [[program]]
            display_name = "Neovim Runtime Update"
            uninstall_key = "neovim-runtime"
            uninstall_string = "/usr/libexec/uninstall-neovim"
            parent_key_name = "neovim"
        "#},
    )?;

    fixture.source_file("nvim", "init.lua", "vim.o.number = true\n")?;
    fixture.global_metadata(
        "nvim",
        formatdoc! {r#"
            [component.detection]
            pattern = "*neovim*"

            [component.install]
            path = "{}"
        "#, fixture.home().join("nvim").display()},
    )?;
    fixture.source_file("emacs", "init.el", "(setq inhibit-startup-screen t)\n")?;
    fixture.global_metadata("emacs", "[component]\n")?;

    let store = fixture.store()?;
    let detector = detector(Inventory::new(TomlInventory::new(listing)));

    let mut nvim = store.resolve(&detector, "nvim")?;
    assert_eq!(nvim.availability(), Availability::Available);
    assert_eq!(nvim.uninstall_key(), Some("neovim"));
    assert_eq!(nvim.friendly_name(), Some("Neovim 0.10"));
    assert_eq!(nvim.install_path(), Some(fixture.home().join("nvim").as_path()));

    let emacs = store.resolve(&detector, "emacs")?;
    assert_eq!(emacs.availability(), Availability::Unavailable);
    assert_eq!(emacs.install_path(), None);

    // Missing install path gets linked as a whole.
    let state = store.install(&mut nvim, ReconcileOptions::apply())?;
    assert_eq!(state, InstallState::Installed);
    assert_eq!(fs::read_link(fixture.home().join("nvim"))?, store.root().join("nvim"));
    assert!(fixture.home().join("nvim/init.lua").is_file());

    let state = store.remove(&mut nvim, ReconcileOptions::apply())?;
    assert_eq!(state, InstallState::NotInstalled);
    assert!(fs::symlink_metadata(fixture.home().join("nvim")).is_err());

    Ok(())
}

#[test]
fn fresh_machine_gets_parents_and_keeps_custom_metadata_private() -> Result<()> {
    let fixture = StoreFixture::new()?;
    let install_path = fixture.home().join(".config/nvim");
    fixture.source_file("nvim", "init.lua", "vim.o.number = true\n")?;
    fixture.custom_metadata("nvim", fixture.always_install(&install_path))?;

    let store = fixture.store()?;
    let detector = detector(Inventory::empty());
    let mut nvim = store.resolve(&detector, "nvim")?;

    let simulated = store.install(&mut nvim, ReconcileOptions::simulate())?;
    assert!(fs::symlink_metadata(fixture.home().join(".config")).is_err());
    let applied = store.install(&mut nvim, ReconcileOptions::apply())?;
    assert_eq!(simulated, applied);
    assert_eq!(applied, InstallState::Installed);

    assert!(fs::symlink_metadata(&install_path)?.is_dir());
    assert_eq!(
        fs::read_link(install_path.join("init.lua"))?,
        store.root().join("nvim/init.lua")
    );
    assert!(fs::symlink_metadata(install_path.join("component.toml")).is_err());

    Ok(())
}

#[test]
fn non_installable_components_are_never_reconciled() -> Result<()> {
    let fixture = StoreFixture::new()?;
    fixture.source_file("vim", ".vimrc", "set nocompatible\n")?;
    fixture.global_metadata(
        "vim",
        formatdoc! {r#"
            [component.detection]
            method = "path_exists"
            path = "{}"

            [component.install]
            path = "{}"
        "#,
            fixture.home().join("missing/vim").display(),
            fixture.home().display(),
        },
    )?;

    let store = fixture.store()?;
    let detector = detector(Inventory::empty());
    let mut vim = store.resolve(&detector, "vim")?;
    assert_eq!(vim.availability(), Availability::Unavailable);

    assert_eq!(
        store.install(&mut vim, ReconcileOptions::apply())?,
        InstallState::NotEvaluated
    );
    assert_eq!(
        store.remove(&mut vim, ReconcileOptions::apply())?,
        InstallState::NotEvaluated
    );
    assert!(fs::symlink_metadata(fixture.home().join(".vimrc")).is_err());

    Ok(())
}

#[test]
fn unresolvable_install_path_blocks_reconciliation() -> Result<()> {
    let fixture = StoreFixture::new()?;
    fixture.source_file("git", ".gitconfig", "[core]\n")?;
    fixture.global_metadata(
        "git",
        indoc! {r#"
            [component.detection]
            method = "static"
            availability = "always_install"

            [component.install]
            path = "relative/without/folder"
        "#},
    )?;

    let store = fixture.store()?;
    let detector = detector(Inventory::empty());
    let mut git = store.resolve(&detector, "git")?;
    assert_eq!(git.availability(), Availability::AlwaysInstall);
    assert_eq!(git.install_path(), None);
    assert!(git.detection_error().is_some());

    let result = store.install(&mut git, ReconcileOptions::apply());
    assert!(matches!(
        result,
        Err(StoreError::Reconcile(ReconcileError::NoInstallPath { .. }))
    ));

    Ok(())
}
