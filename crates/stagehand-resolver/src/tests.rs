use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use stagehand_core::{OperationKind, PackageCatalog, UninstallCatalog, WorkItem};

use crate::resolve::find_preferred_installer;
use crate::{resolve, InstallerLibrary, ResolveError, ResolvedAction};

static TEST_LIBRARY_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_library_root() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_LIBRARY_COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "stagehand-resolver-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}

fn seed_program(root: &PathBuf, category: &str, program: &str, files: &[&str]) {
    let dir = root.join(category).join(program);
    fs::create_dir_all(&dir).expect("must create program dir");
    for file in files {
        fs::write(dir.join(file), b"installer payload").expect("must write installer file");
    }
}

fn test_catalogs() -> (PackageCatalog, UninstallCatalog) {
    let packages = PackageCatalog::from_json_str(
        r#"{
          "Firefox": { "name": "Firefox", "category": "Browsers", "winget": "Mozilla.Firefox" },
          "OneDrive": { "name": "OneDrive", "category": "Cloud", "winget": "Microsoft.OneDrive" }
        }"#,
    )
    .expect("must parse package catalog");
    let uninstalls = UninstallCatalog::from_json_str(
        r#"[
          { "name": "OneDrive", "managed": true },
          { "name": "Xbox", "display_name": "Xbox Game Bar", "managed": true },
          { "name": "notepadpp", "display_name": "Notepad++" }
        ]"#,
    )
    .expect("must parse uninstall catalog");
    (packages, uninstalls)
}

#[test]
fn library_lists_categories_and_programs_sorted() {
    let root = test_library_root();
    seed_program(&root, "Utilities", "zap", &["setup.exe"]);
    seed_program(&root, "Browsers", "firefox", &["setup.exe"]);
    seed_program(&root, "Browsers", "chromium", &["setup.exe"]);

    let library = InstallerLibrary::new(&root);
    assert_eq!(
        library.categories().expect("must list"),
        vec!["Browsers", "Utilities"]
    );
    assert_eq!(
        library.programs_in("Browsers").expect("must list"),
        vec!["chromium", "firefox"]
    );
    assert_eq!(
        library.programs().expect("must list"),
        vec![
            ("Browsers".to_string(), "chromium".to_string()),
            ("Browsers".to_string(), "firefox".to_string()),
            ("Utilities".to_string(), "zap".to_string()),
        ]
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_root_reads_as_empty_library() {
    let library = InstallerLibrary::new(test_library_root());
    assert!(library.categories().expect("must list").is_empty());
    assert!(library.programs().expect("must list").is_empty());
    assert_eq!(library.category_of("anything").expect("must scan"), None);
}

#[test]
fn category_of_scans_the_tree() {
    let root = test_library_root();
    seed_program(&root, "Utilities", "zap", &["setup.exe"]);
    seed_program(&root, "Browsers", "firefox", &["setup.exe"]);

    let library = InstallerLibrary::new(&root);
    assert_eq!(
        library.category_of("zap").expect("must scan").as_deref(),
        Some("Utilities")
    );
    assert_eq!(library.category_of("missing").expect("must scan"), None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn exe_is_preferred_over_msi_and_msix() {
    let root = test_library_root();
    seed_program(
        &root,
        "Utilities",
        "zap",
        &["setup.msix", "setup.msi", "setup.exe"],
    );
    let (packages, uninstalls) = test_catalogs();

    let library = InstallerLibrary::new(&root);
    let item = WorkItem::new("zap", OperationKind::Install);
    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::RunInstaller(root.join("Utilities").join("zap").join("setup.exe"))
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn msi_is_used_when_no_exe_exists() {
    let root = test_library_root();
    seed_program(&root, "Utilities", "zap", &["setup.msix", "setup.msi"]);
    let (packages, uninstalls) = test_catalogs();

    let library = InstallerLibrary::new(&root);
    let item = WorkItem::new("zap", OperationKind::Install);
    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::RunInstaller(root.join("Utilities").join("zap").join("setup.msi"))
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn extension_matching_ignores_case() {
    let root = test_library_root();
    seed_program(&root, "Utilities", "zap", &["Setup.EXE"]);
    let (packages, uninstalls) = test_catalogs();

    let library = InstallerLibrary::new(&root);
    let item = WorkItem::new("zap", OperationKind::Install);
    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::RunInstaller(root.join("Utilities").join("zap").join("Setup.EXE"))
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn sibling_installers_resolve_to_first_sorted_name() {
    let root = test_library_root();
    seed_program(&root, "Utilities", "zap", &["b-installer.exe", "a-installer.exe"]);
    let (packages, uninstalls) = test_catalogs();

    let library = InstallerLibrary::new(&root);
    let item = WorkItem::new("zap", OperationKind::Install);
    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::RunInstaller(
            root.join("Utilities").join("zap").join("a-installer.exe")
        )
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn install_without_installer_file_is_not_found() {
    let root = test_library_root();
    seed_program(&root, "Utilities", "zap", &["readme.txt"]);
    let (packages, uninstalls) = test_catalogs();

    let library = InstallerLibrary::new(&root);
    let item = WorkItem::new("zap", OperationKind::Install);
    let err = resolve(&item, &library, &packages, &uninstalls).expect_err("must fail");
    assert_eq!(
        err,
        ResolveError::NotFound {
            identifier: "zap".to_string()
        }
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn unreadable_program_folder_degrades_to_no_installer() {
    let root = test_library_root();
    fs::create_dir_all(&root).expect("must create root");
    // A regular file where a folder is expected makes the directory read
    // fail; the scan must degrade instead of panicking or misclassifying.
    let not_a_dir = root.join("zap");
    fs::write(&not_a_dir, b"not a directory").expect("must write file");

    assert_eq!(find_preferred_installer(&not_a_dir), None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn install_of_unknown_program_is_not_found() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("ghost", OperationKind::Install);
    let err = resolve(&item, &library, &packages, &uninstalls).expect_err("must fail");
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn pre_resolved_path_is_honored() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let mut item = WorkItem::new("zap", OperationKind::Install);
    item.resolved_path = Some(PathBuf::from("/payloads/zap/setup.exe"));

    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::RunInstaller(PathBuf::from("/payloads/zap/setup.exe"))
    );
}

#[test]
fn managed_install_resolves_through_the_catalog() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("Firefox", OperationKind::Install).with_package_ref("Firefox");

    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::ManagerInstall {
            package_ref: "Mozilla.Firefox".to_string()
        }
    );
}

#[test]
fn managed_install_of_uncataloged_package_fails() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("Ghost", OperationKind::Install).with_package_ref("Ghost");

    let err = resolve(&item, &library, &packages, &uninstalls).expect_err("must fail");
    assert_eq!(
        err,
        ResolveError::UnknownPackage {
            identifier: "Ghost".to_string()
        }
    );
}

#[test]
fn update_resolves_through_the_catalog() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("Firefox", OperationKind::Update);

    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::ManagerUpdate {
            package_ref: "Mozilla.Firefox".to_string()
        }
    );
}

#[test]
fn update_of_uncataloged_package_fails() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("Ghost", OperationKind::Update);
    let err = resolve(&item, &library, &packages, &uninstalls).expect_err("must fail");
    assert!(matches!(err, ResolveError::UnknownPackage { .. }));
}

#[test]
fn managed_uninstall_prefers_catalog_ref() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("OneDrive", OperationKind::Uninstall);

    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::ManagerUninstall {
            package_ref: "Microsoft.OneDrive".to_string()
        }
    );
}

#[test]
fn managed_uninstall_falls_back_to_display_label() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("Xbox", OperationKind::Uninstall);

    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::ManagerUninstall {
            package_ref: "Xbox Game Bar".to_string()
        }
    );
}

#[test]
fn registry_uninstall_uses_display_label() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("notepadpp", OperationKind::Uninstall);

    let action = resolve(&item, &library, &packages, &uninstalls).expect("must resolve");
    assert_eq!(
        action,
        ResolvedAction::RegistryUninstall {
            display_name: "Notepad++".to_string()
        }
    );
}

#[test]
fn uninstall_of_uncataloged_entry_fails() {
    let (packages, uninstalls) = test_catalogs();
    let library = InstallerLibrary::new(test_library_root());
    let item = WorkItem::new("Ghost", OperationKind::Uninstall);
    let err = resolve(&item, &library, &packages, &uninstalls).expect_err("must fail");
    assert!(matches!(err, ResolveError::UnknownPackage { .. }));
}
