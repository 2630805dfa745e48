use anyhow::{anyhow, Result};
use stagehand_core::{
    BatchObserver, OperationKind, OperationResult, PackageCatalog, QueueDriver, UninstallCatalog,
    WorkItem,
};
use stagehand_executor::BatchExecutor;
use stagehand_inventory::{
    enumerate_uninstall_entries, registry_reports_installed, InstalledInventory,
};
use stagehand_resolver::InstallerLibrary;
use tracing::info;

use crate::catalogs::{load_package_catalog, load_uninstall_catalog};
use crate::config::Config;
use crate::render::{render_section_header, render_status_line, OutputStyle, TerminalProgress};

/// Turns queue callbacks into terminal output: one status line per finished
/// item, a progress advance, and a single aggregate line at the end.
pub struct BatchReporter {
    style: OutputStyle,
    progress: TerminalProgress,
    pub failed: Vec<String>,
}

impl BatchReporter {
    pub fn new(style: OutputStyle, label: &str, total: u64) -> Self {
        Self {
            style,
            progress: TerminalProgress::start(style, label, total),
            failed: Vec::new(),
        }
    }
}

impl BatchObserver for BatchReporter {
    fn item_completed(&mut self, result: &OperationResult) {
        self.progress.advance();
        if result.success {
            self.progress.println(&render_status_line(
                self.style,
                "ok",
                &format!("{}: done", result.identifier),
            ));
        } else {
            let detail = result.detail.as_deref().unwrap_or("failed");
            self.progress.println(&render_status_line(
                self.style,
                "err",
                &format!("{}: {detail}", result.identifier),
            ));
            self.failed.push(result.identifier.clone());
        }
    }

    fn batch_completed(&mut self, all_succeeded: bool) {
        self.progress.finish();
        let line = if all_succeeded {
            render_status_line(self.style, "ok", "all operations completed")
        } else {
            render_status_line(self.style, "err", "some operations failed")
        };
        println!("{line}");
    }
}

pub fn select_install_items(
    names: &[String],
    all: bool,
    category: Option<&str>,
    managed: bool,
    library: &InstallerLibrary,
    packages: &PackageCatalog,
) -> Result<Vec<WorkItem>> {
    if managed {
        let identifiers: Vec<String> = if !names.is_empty() {
            names.to_vec()
        } else if let Some(category) = category {
            packages
                .in_category(category)
                .into_iter()
                .map(|(identifier, _)| identifier.clone())
                .collect()
        } else if all {
            packages.identifiers().cloned().collect()
        } else {
            return Err(anyhow!(
                "select packages by name, --category <cat>, or --all"
            ));
        };
        return Ok(identifiers
            .into_iter()
            .map(|identifier| {
                let item = WorkItem::new(identifier.clone(), OperationKind::Install);
                item.with_package_ref(identifier)
            })
            .collect());
    }

    let programs: Vec<String> = if !names.is_empty() {
        names.to_vec()
    } else if let Some(category) = category {
        library.programs_in(category)?
    } else if all {
        library
            .programs()?
            .into_iter()
            .map(|(_, program)| program)
            .collect()
    } else {
        return Err(anyhow!(
            "select programs by name, --category <cat>, or --all"
        ));
    };
    Ok(programs
        .into_iter()
        .map(|program| WorkItem::new(program, OperationKind::Install))
        .collect())
}

pub fn select_uninstall_items(
    names: &[String],
    all: bool,
    uninstalls: &UninstallCatalog,
) -> Result<Vec<WorkItem>> {
    let selected: Vec<String> = if !names.is_empty() {
        names.to_vec()
    } else if all {
        uninstalls
            .entries()
            .map(|entry| entry.name.clone())
            .collect()
    } else {
        return Err(anyhow!("select entries by name or pass --all"));
    };
    Ok(selected
        .into_iter()
        .map(|name| WorkItem::new(name, OperationKind::Uninstall))
        .collect())
}

pub fn select_update_items(
    names: &[String],
    all: bool,
    packages: &PackageCatalog,
) -> Result<Vec<WorkItem>> {
    let selected: Vec<String> = if !names.is_empty() {
        names.to_vec()
    } else if all {
        packages.identifiers().cloned().collect()
    } else {
        return Err(anyhow!("select packages by name or pass --all"));
    };
    Ok(selected
        .into_iter()
        .map(|name| WorkItem::new(name, OperationKind::Update))
        .collect())
}

pub fn run_install(
    config: &Config,
    style: OutputStyle,
    names: &[String],
    all: bool,
    category: Option<&str>,
    managed: bool,
) -> Result<bool> {
    let packages = load_package_catalog(&config.catalog_path)?;
    let uninstalls = load_uninstall_catalog(&config.uninstall_catalog_path)?;
    let library = InstallerLibrary::new(&config.library_root);
    let items = select_install_items(names, all, category, managed, &library, &packages)?;
    run_queue(library, packages, uninstalls, items, style, "install")
}

pub fn run_uninstall(
    config: &Config,
    style: OutputStyle,
    names: &[String],
    all: bool,
) -> Result<bool> {
    let packages = load_package_catalog(&config.catalog_path)?;
    let uninstalls = load_uninstall_catalog(&config.uninstall_catalog_path)?;
    let library = InstallerLibrary::new(&config.library_root);
    let items = select_uninstall_items(names, all, &uninstalls)?;
    run_queue(library, packages, uninstalls, items, style, "uninstall")
}

pub fn run_update(config: &Config, style: OutputStyle, names: &[String], all: bool) -> Result<bool> {
    let packages = load_package_catalog(&config.catalog_path)?;
    let uninstalls = load_uninstall_catalog(&config.uninstall_catalog_path)?;
    let library = InstallerLibrary::new(&config.library_root);
    let items = select_update_items(names, all, &packages)?;
    run_queue(library, packages, uninstalls, items, style, "update")
}

fn run_queue(
    library: InstallerLibrary,
    packages: PackageCatalog,
    uninstalls: UninstallCatalog,
    items: Vec<WorkItem>,
    style: OutputStyle,
    label: &str,
) -> Result<bool> {
    let mut driver = QueueDriver::new();
    driver.enqueue(items)?;
    let total = driver.pending() as u64;
    info!(total, label, "starting batch");

    if let Some(header) = render_section_header(style, label) {
        println!("{header}");
    }
    let executor = BatchExecutor::new(library, packages, uninstalls);
    let mut reporter = BatchReporter::new(style, label, total);
    let summary = driver.run(executor, &mut reporter)?;
    Ok(summary.all_succeeded)
}

pub fn run_list(config: &Config, style: OutputStyle, category: Option<&str>) -> Result<()> {
    let packages = load_package_catalog(&config.catalog_path)?;
    let inventory = InstalledInventory::from_package_manager();

    let categories = match category {
        Some(category) => vec![category.to_string()],
        None => packages.categories(),
    };
    for category in categories {
        let entries = packages.in_category(&category);
        if entries.is_empty() {
            println!(
                "{}",
                render_status_line(style, "warn", &format!("{category}: no catalog entries"))
            );
            continue;
        }
        println!("{category}:");
        for (identifier, entry) in entries {
            let marker = if inventory.is_installed(&entry.name) {
                "[x]"
            } else {
                "[ ]"
            };
            println!("  {marker} {identifier} ({})", entry.winget);
        }
    }
    Ok(())
}

pub fn run_status(style: OutputStyle, name: &str) -> Result<()> {
    let inventory = InstalledInventory::from_package_manager();
    let entries = enumerate_uninstall_entries();

    let listed = inventory.is_installed(name);
    let registered = registry_reports_installed(&entries, name);
    println!(
        "{}",
        render_status_line(
            style,
            if listed { "ok" } else { "step" },
            &format!(
                "manager listing: {}",
                if listed { "present" } else { "absent" }
            )
        )
    );
    println!(
        "{}",
        render_status_line(
            style,
            if registered { "ok" } else { "step" },
            &format!(
                "registry uninstall keys: {}",
                if registered { "present" } else { "absent" }
            )
        )
    );
    Ok(())
}

pub fn run_doctor(config: &Config, style: OutputStyle) -> Result<()> {
    println!(
        "{}",
        render_status_line(
            style,
            "step",
            &format!("library root: {}", config.library_root.display())
        )
    );
    let library = InstallerLibrary::new(&config.library_root);
    match library.categories() {
        Ok(categories) => println!(
            "{}",
            render_status_line(
                style,
                "ok",
                &format!("library categories: {}", categories.len())
            )
        ),
        Err(err) => println!(
            "{}",
            render_status_line(style, "err", &format!("library unreadable: {err:#}"))
        ),
    }

    match load_package_catalog(&config.catalog_path) {
        Ok(packages) => println!(
            "{}",
            render_status_line(
                style,
                "ok",
                &format!(
                    "package catalog: {} ({} entries)",
                    config.catalog_path.display(),
                    packages.len()
                )
            )
        ),
        Err(err) => println!(
            "{}",
            render_status_line(style, "err", &format!("package catalog: {err:#}"))
        ),
    }

    match load_uninstall_catalog(&config.uninstall_catalog_path) {
        Ok(uninstalls) => println!(
            "{}",
            render_status_line(
                style,
                "ok",
                &format!(
                    "uninstall catalog: {} ({} entries)",
                    config.uninstall_catalog_path.display(),
                    uninstalls.len()
                )
            )
        ),
        Err(err) => println!(
            "{}",
            render_status_line(style, "err", &format!("uninstall catalog: {err:#}"))
        ),
    }

    let inventory = InstalledInventory::from_package_manager();
    let status = if inventory.has_listing() {
        ("ok", "package manager listing: available")
    } else {
        ("warn", "package manager listing: unavailable or empty")
    };
    println!("{}", render_status_line(style, status.0, status.1));
    Ok(())
}
