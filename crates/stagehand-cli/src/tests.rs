use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use stagehand_core::{BatchObserver, OperationKind, OperationResult, PackageCatalog};
use stagehand_resolver::InstallerLibrary;

use crate::config::{Config, CATALOG_ENV, LIBRARY_ENV};
use crate::flows::{
    select_install_items, select_uninstall_items, select_update_items, BatchReporter,
};
use crate::render::{
    current_output_style, render_section_header, render_status_line, OutputStyle,
};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_library_root() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "stagehand-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}

fn test_packages() -> PackageCatalog {
    PackageCatalog::from_json_str(
        r#"{
          "7-Zip": { "name": "7-Zip", "category": "Utilities", "winget": "7zip.7zip" },
          "Firefox": { "name": "Firefox", "category": "Browsers", "winget": "Mozilla.Firefox" },
          "VLC": { "name": "VLC", "category": "Media", "winget": "VideoLAN.VLC" }
        }"#,
    )
    .expect("must parse package catalog")
}

fn test_uninstalls() -> stagehand_core::UninstallCatalog {
    stagehand_core::UninstallCatalog::from_json_str(
        r#"[
          { "name": "OneDrive", "managed": true },
          { "name": "notepadpp", "display_name": "Notepad++" }
        ]"#,
    )
    .expect("must parse uninstall catalog")
}

#[test]
fn config_flag_wins_over_env_and_default() {
    let config = Config::resolve_with_env(
        Some(PathBuf::from("/flags/library")),
        None,
        None,
        |name| {
            if name == LIBRARY_ENV || name == CATALOG_ENV {
                Some(PathBuf::from("/env/value"))
            } else {
                None
            }
        },
    );
    assert_eq!(config.library_root, PathBuf::from("/flags/library"));
    assert_eq!(config.catalog_path, PathBuf::from("/env/value"));
    assert_eq!(config.uninstall_catalog_path, PathBuf::from("uninstall.json"));
}

#[test]
fn config_defaults_apply_without_flags_or_env() {
    let config = Config::resolve_with_env(None, None, None, |_| None);
    assert_eq!(config.library_root, PathBuf::from("Programs"));
    assert_eq!(config.catalog_path, PathBuf::from("packages.json"));
    assert_eq!(config.uninstall_catalog_path, PathBuf::from("uninstall.json"));
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "7-Zip: done"),
        "7-Zip: done"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "7-Zip: done"),
        "[OK] 7-Zip: done"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "err", "some operations failed"),
        "[ERR] some operations failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "listing unavailable"),
        "[WARN] listing unavailable"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "library root: Programs"),
        "[..] library root: Programs"
    );
}

#[test]
fn plain_flag_forces_plain_style() {
    assert_eq!(current_output_style(true), OutputStyle::Plain);
}

#[test]
fn section_header_is_rich_only() {
    assert_eq!(render_section_header(OutputStyle::Plain, "install"), None);
    let header = render_section_header(OutputStyle::Rich, "install").expect("must render");
    assert!(header.contains("== install =="));
}

#[test]
fn managed_install_selection_carries_package_refs() {
    let packages = test_packages();
    let library = InstallerLibrary::new(test_library_root());

    let items = select_install_items(
        &["Firefox".to_string()],
        false,
        None,
        true,
        &library,
        &packages,
    )
    .expect("must select");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].identifier, "Firefox");
    assert_eq!(items[0].kind, OperationKind::Install);
    assert_eq!(items[0].package_ref.as_deref(), Some("Firefox"));
}

#[test]
fn managed_install_selection_all_covers_the_catalog() {
    let packages = test_packages();
    let library = InstallerLibrary::new(test_library_root());

    let items = select_install_items(&[], true, None, true, &library, &packages)
        .expect("must select");
    let identifiers: Vec<&str> = items.iter().map(|item| item.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["7-Zip", "Firefox", "VLC"]);
}

#[test]
fn managed_install_selection_by_category_filters() {
    let packages = test_packages();
    let library = InstallerLibrary::new(test_library_root());

    let items = select_install_items(&[], false, Some("Browsers"), true, &library, &packages)
        .expect("must select");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].identifier, "Firefox");
}

#[test]
fn install_selection_requires_a_choice() {
    let packages = test_packages();
    let library = InstallerLibrary::new(test_library_root());

    let err = select_install_items(&[], false, None, false, &library, &packages)
        .expect_err("must reject empty selection");
    assert!(err.to_string().contains("--all"));
}

#[test]
fn local_install_selection_by_category_reads_the_library() {
    let root = test_library_root();
    for program in ["firefox", "chromium"] {
        fs::create_dir_all(root.join("Browsers").join(program))
            .expect("must create program dir");
    }
    let packages = test_packages();
    let library = InstallerLibrary::new(&root);

    let items = select_install_items(&[], false, Some("Browsers"), false, &library, &packages)
        .expect("must select");
    let identifiers: Vec<&str> = items.iter().map(|item| item.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["chromium", "firefox"]);
    assert!(items.iter().all(|item| item.package_ref.is_none()));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn uninstall_selection_all_covers_the_catalog() {
    let uninstalls = test_uninstalls();
    let items = select_uninstall_items(&[], true, &uninstalls).expect("must select");
    let identifiers: Vec<&str> = items.iter().map(|item| item.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["OneDrive", "notepadpp"]);
    assert!(items
        .iter()
        .all(|item| item.kind == OperationKind::Uninstall));
}

#[test]
fn update_selection_by_name_sets_update_kind() {
    let packages = test_packages();
    let items = select_update_items(&["VLC".to_string()], false, &packages)
        .expect("must select");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, OperationKind::Update);
}

#[test]
fn batch_reporter_records_failed_identifiers() {
    let mut reporter = BatchReporter::new(OutputStyle::Plain, "install", 3);
    reporter.item_completed(&OperationResult {
        identifier: "7-Zip".to_string(),
        success: true,
        detail: None,
    });
    reporter.item_completed(&OperationResult {
        identifier: "Firefox".to_string(),
        success: false,
        detail: Some("process reported exit status: 2".to_string()),
    });
    reporter.item_completed(&OperationResult {
        identifier: "VLC".to_string(),
        success: true,
        detail: None,
    });
    reporter.batch_completed(false);

    assert_eq!(reporter.failed, vec!["Firefox".to_string()]);
}
