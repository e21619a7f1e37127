// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotlink::{
    component::{detect::Detector, reconcile::ReconcileOptions},
    config::ComponentDocument,
    inventory::{Inventory, TomlInventory},
    path::default_dotfiles_dir,
    store::DotfilesStore,
    Component,
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use inquire::Confirm;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dotlink [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub store: StoreOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let (store, detector) = self.store.open()?;
        match self.command {
            Command::Discover => run_discover(&store, &detector),
            Command::Install(opts) => run_install(&store, &detector, opts),
            Command::Remove(opts) => run_remove(&store, &detector, opts),
            Command::Config(opts) => run_config(&store, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Detect every component and show its current install state.
    #[command(override_usage = "dotlink discover [options]")]
    Discover,

    /// Link component files into their install paths.
    #[command(override_usage = "dotlink install [options] [<component>]...")]
    Install(ReconcileArgs),

    /// Unlink component files from their install paths.
    #[command(override_usage = "dotlink remove [options] [<component>]...")]
    Remove(ReconcileArgs),

    /// Show effective metadata of component.
    #[command(override_usage = "dotlink config [options] <component>")]
    Config(ConfigOptions),
}

#[derive(Args, Clone, Debug)]
struct StoreOptions {
    /// Path to dotfiles directory.
    #[arg(short, long, global = true, value_name = "path")]
    pub dotfiles: Option<PathBuf>,

    /// Path to global metadata directory.
    #[arg(short, long, global = true, value_name = "path")]
    pub metadata: Option<PathBuf>,

    /// Path to TOML listing of installed programs.
    #[arg(short, long, global = true, value_name = "path")]
    pub inventory: Option<PathBuf>,

    /// Detect components that have no metadata at all.
    #[arg(short, long, global = true)]
    pub autodetect: bool,
}

impl StoreOptions {
    fn open(&self) -> Result<(DotfilesStore, Detector)> {
        let root = match &self.dotfiles {
            Some(path) => path.clone(),
            None => default_dotfiles_dir()?,
        };
        let mut store = DotfilesStore::open(root)?;
        if let Some(metadata) = &self.metadata {
            store = store.with_metadata_dir(metadata);
        }

        let inventory = match &self.inventory {
            Some(path) => Inventory::new(TomlInventory::new(path)),
            None => Inventory::empty(),
        };
        let detector = Detector::new(inventory).with_autodetect(self.autodetect);

        Ok((store, detector))
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ReconcileArgs {
    /// Components to reconcile, all of them if none are given.
    #[arg(value_name = "component")]
    pub components: Vec<String>,

    /// Report what would change without touching the file system.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

impl ReconcileArgs {
    fn options(&self) -> ReconcileOptions {
        if self.dry_run {
            ReconcileOptions::simulate()
        } else {
            ReconcileOptions::apply()
        }
    }

    fn confirm(&self, action: &str, components: &[Component]) -> Result<bool> {
        if self.yes || self.dry_run {
            return Ok(true);
        }

        let names = components
            .iter()
            .filter(|component| component.availability().is_installable())
            .map(Component::name)
            .collect::<Vec<_>>();
        if names.is_empty() {
            return Ok(true);
        }

        let answer = Confirm::new(&format!("{action} {}?", names.join(", ")))
            .with_default(false)
            .prompt()?;

        Ok(answer)
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ConfigOptions {
    /// Name of component to show metadata of.
    #[arg(required = true, value_name = "component")]
    pub component: String,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_discover(store: &DotfilesStore, detector: &Detector) -> Result<()> {
    let components = store.discover(detector)?;
    print_table(&components);

    Ok(())
}

fn run_install(store: &DotfilesStore, detector: &Detector, opts: ReconcileArgs) -> Result<()> {
    let mut components = select(store, detector, &opts.components)?;
    if !opts.confirm("Install", &components)? {
        info!("install cancelled");
        return Ok(());
    }

    for component in components.iter_mut() {
        store.install(component, opts.options())?;
    }
    print_table(&components);

    Ok(())
}

fn run_remove(store: &DotfilesStore, detector: &Detector, opts: ReconcileArgs) -> Result<()> {
    let mut components = select(store, detector, &opts.components)?;
    if !opts.confirm("Remove", &components)? {
        info!("remove cancelled");
        return Ok(());
    }

    for component in components.iter_mut() {
        store.remove(component, opts.options())?;
    }
    print_table(&components);

    Ok(())
}

fn run_config(store: &DotfilesStore, opts: ConfigOptions) -> Result<()> {
    match store.load_metadata(&opts.component)? {
        Some(settings) => {
            let document = ComponentDocument {
                component: Some(settings),
            };
            print!("{document}");
        }
        None => info!("component {:?} has no metadata", opts.component),
    }

    Ok(())
}

fn select(store: &DotfilesStore, detector: &Detector, names: &[String]) -> Result<Vec<Component>> {
    let names = if names.is_empty() {
        store.component_names()?
    } else {
        names.to_vec()
    };

    let mut components = Vec::with_capacity(names.len());
    for name in names {
        components.push(store.resolve(detector, &name)?);
    }

    Ok(components)
}

fn print_table(components: &[Component]) {
    let width = components
        .iter()
        .map(|component| component.to_string().len())
        .max()
        .unwrap_or_default()
        .max("component".len());

    println!("{:<width$}  {:<17}  state", "component", "availability");
    for component in components {
        println!(
            "{:<width$}  {:<17}  {}",
            component.to_string(),
            component.availability().to_string(),
            component.state()
        );
    }
}
