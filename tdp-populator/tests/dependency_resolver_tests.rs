//! Dependency Resolution Tests
//! Test File: dependency_resolver_tests.rs

mod helpers;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tdp_populator::error::PopulateError;
use tdp_populator::services::dependency_resolver::{
    DependencyManifest, DependencyResolver, DynamicLibraryLoader, FileStatus, LibraryLoader,
    LoadStatus, OUTSIDE_IN_THRESHOLD,
};

/// Loader that records paths and fails for names in `reject`
#[derive(Default)]
struct RecordingLoader {
    loaded: Mutex<Vec<PathBuf>>,
    reject: Vec<&'static str>,
}

impl LibraryLoader for RecordingLoader {
    fn load(&self, path: &Path, image: &[u8]) -> io::Result<()> {
        assert!(!image.is_empty());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        if self.reject.contains(&name.as_str()) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad image"));
        }
        self.loaded.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn resolver(loader: Arc<RecordingLoader>) -> DependencyResolver {
    DependencyResolver::new(OUTSIDE_IN_THRESHOLD, loader)
}

fn small_manifest() -> DependencyManifest {
    DependencyManifest {
        core_files: vec!["A.dll".to_string(), "B.dll".to_string()],
        auxiliary_files: vec!["C.dll".to_string(), "D.dll".to_string(), "E.dll".to_string()],
    }
}

/// TC-DEP-001: Every absent file is listed
#[test]
fn tc_dep_001_missing_files_listed_exactly() {
    // Given: Folder holding C, D, E of a five-file manifest
    let dir = tempfile::tempdir().unwrap();
    helpers::create_files(dir.path(), ["C.dll", "D.dll", "E.dll"]);

    // When: Validating
    let err = resolver(Arc::default())
        .validate(dir.path(), &small_manifest())
        .unwrap_err();

    // Then: Exactly A and B are reported
    match err {
        PopulateError::MissingDependency { folder, files } => {
            assert_eq!(folder, dir.path());
            assert_eq!(files, vec!["A.dll".to_string(), "B.dll".to_string()]);
        }
        other => panic!("Expected MissingDependency, got {other:?}"),
    }
}

/// TC-DEP-002: Nonexistent folder is a configuration error
#[test]
fn tc_dep_002_nonexistent_folder() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolver(Arc::default())
        .validate(&dir.path().join("nope"), &small_manifest())
        .unwrap_err();
    assert!(matches!(err, PopulateError::Configuration(_)));
}

/// TC-DEP-003: Staging copies every file, including subdirectories
#[tokio::test]
async fn tc_dep_003_stage_full_manifest() {
    // Given: Library folder with the complete threshold manifest
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let resolver = resolver(Arc::default());
    let manifest = resolver.manifest();
    helpers::create_files(source.path(), manifest.all_files());

    // When: Staging
    resolver.validate(source.path(), &manifest).unwrap();
    let report = resolver.stage(source.path(), dest.path(), &manifest).await.unwrap();

    // Then: Every file copied, oi/ subdirectory created
    assert_eq!(report.files.len(), manifest.len());
    assert!(report.files.iter().all(|(_, s)| *s == FileStatus::Copied));
    assert!(dest.path().join("oi").join("oilink.jar").is_file());

    // And: Restaging identical content skips every file
    let again = resolver.stage(source.path(), dest.path(), &manifest).await.unwrap();
    assert_eq!(again.count(|s| *s == FileStatus::SkippedAlreadyPresent), manifest.len());
}

/// TC-DEP-004: Changed source content is copied over the staged file
#[tokio::test]
async fn tc_dep_004_stage_overwrites_changed_files() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    helpers::create_files(source.path(), small_manifest().all_files());
    std::fs::write(dest.path().join("A.dll"), b"stale").unwrap();

    let report = resolver(Arc::default())
        .stage(source.path(), dest.path(), &small_manifest())
        .await
        .unwrap();

    assert_eq!(report.files[0], ("A.dll".to_string(), FileStatus::Copied));
    assert_eq!(
        std::fs::read_to_string(dest.path().join("A.dll")).unwrap(),
        "contents of A.dll"
    );
}

/// TC-DEP-005: A file that cannot be staged fails staging after all files are attempted
#[tokio::test]
async fn tc_dep_005_failed_copy_without_prior_copy() {
    // Given: B.dll vanished from the source after validation
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    helpers::create_files(source.path(), ["A.dll", "C.dll", "D.dll", "E.dll"]);

    // When: Staging
    let err = resolver(Arc::default())
        .stage(source.path(), dest.path(), &small_manifest())
        .await
        .unwrap_err();

    // Then: Only B is reported and the files after it were still staged
    match err {
        PopulateError::Staging { files, .. } => assert_eq!(files, vec!["B.dll".to_string()]),
        other => panic!("Expected Staging, got {other:?}"),
    }
    assert!(dest.path().join("E.dll").is_file());
}

/// TC-DEP-006: Failed copy with an earlier staged copy is skipped
#[tokio::test]
async fn tc_dep_006_failed_copy_with_prior_copy() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    helpers::create_files(source.path(), ["A.dll", "C.dll", "D.dll", "E.dll"]);
    helpers::create_files(dest.path(), ["B.dll"]);

    let report = resolver(Arc::default())
        .stage(source.path(), dest.path(), &small_manifest())
        .await
        .unwrap();

    assert_eq!(report.files[1], ("B.dll".to_string(), FileStatus::SkippedAlreadyPresent));
}

/// TC-DEP-007: Load failures are reported per file without aborting
#[tokio::test]
async fn tc_dep_007_load_continues_after_failure() {
    // Given: A.dll is rejected by the loader, B.dll is fine
    let dest = tempfile::tempdir().unwrap();
    helpers::create_files(dest.path(), ["A.dll", "B.dll"]);
    let loader = Arc::new(RecordingLoader {
        reject: vec!["A.dll"],
        ..RecordingLoader::default()
    });

    // When: Loading the core files
    let report = resolver(loader.clone())
        .load(dest.path(), &small_manifest().core_files)
        .await;

    // Then: A failed, B loaded
    assert!(matches!(report.files[0].1, LoadStatus::Failed { .. }));
    assert_eq!(report.files[1].1, LoadStatus::Loaded);
    assert_eq!(report.failed_files(), vec!["A.dll".to_string()]);
    assert_eq!(*loader.loaded.lock().unwrap(), vec![dest.path().join("B.dll")]);
}

/// TC-DEP-008: Prepare runs validation, staging and loading in order
#[tokio::test]
async fn tc_dep_008_prepare_end_to_end() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let loader = Arc::new(RecordingLoader::default());
    let resolver = resolver(loader.clone());
    helpers::create_files(source.path(), resolver.manifest().all_files());

    let prepared = resolver.prepare(source.path(), dest.path()).await.unwrap();

    assert!(prepared.loading.all_loaded());
    assert_eq!(prepared.staging.files.len(), prepared.manifest.len());
    assert_eq!(loader.loaded.lock().unwrap().len(), 2);
}

/// TC-DEP-009: Prepare stops at validation when files are missing
#[tokio::test]
async fn tc_dep_009_prepare_missing_files_stages_nothing() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    helpers::create_files(source.path(), ["kCura.Relativity.ImportAPI.dll"]);

    let err = resolver(Arc::default())
        .prepare(source.path(), dest.path())
        .await
        .unwrap_err();

    assert!(matches!(err, PopulateError::MissingDependency { .. }));
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

/// TC-DEP-010: Empty or unreadable staged files fail before reaching the linker
#[tokio::test]
async fn tc_dep_010_load_checks_staged_content() {
    // Given: A.dll staged but empty, B.dll never staged
    let dest = tempfile::tempdir().unwrap();
    std::fs::write(dest.path().join("A.dll"), b"").unwrap();
    let loader = Arc::new(DynamicLibraryLoader::new());

    // When: Loading the core files through the dynamic linker
    let report = DependencyResolver::new(OUTSIDE_IN_THRESHOLD, loader.clone())
        .load(dest.path(), &small_manifest().core_files)
        .await;

    // Then: Both are reported failed and nothing was opened
    match &report.files[0].1 {
        LoadStatus::Failed { reason } => assert!(reason.contains("empty library image"), "{reason}"),
        other => panic!("Expected Failed, got {other:?}"),
    }
    assert!(matches!(report.files[1].1, LoadStatus::Failed { .. }));
    assert_eq!(report.failed_files(), vec!["A.dll".to_string(), "B.dll".to_string()]);
    assert_eq!(loader.loaded_count(), 0);
}
