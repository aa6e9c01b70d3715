//! Integration tests for configuration loading and deployment

use camino::{Utf8Path, Utf8PathBuf};
use flatdeploy_core::config::{CONFIG_FILE_NAME, Config};
use flatdeploy_core::deploy::{
    DeployManager, DeployPolicy, DeployReport, FileOwner, MANIFEST_FILE_NAME,
};
use flatdeploy_core::{Error, Result};
use std::fs;
use tempfile::TempDir;

/// A scratch directory holding install roots, a config file and the output
struct TestWorkspace {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
}

impl TestWorkspace {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path())
            .expect("temp dir should be valid UTF-8")
            .canonicalize_utf8()
            .expect("temp dir should canonicalize");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Create `pkgs/<name>` with the given files
    fn install(&self, name: &str, files: &[(&str, &str)]) -> Utf8PathBuf {
        let install_root = self.root.join("pkgs").join(name);
        fs::create_dir_all(&install_root).unwrap();
        for (path, content) in files {
            let path = install_root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        install_root
    }

    fn write_config(&self, content: &str) -> Utf8PathBuf {
        let path = self.root.join(CONFIG_FILE_NAME);
        fs::write(&path, content).unwrap();
        path
    }

    fn out(&self) -> Utf8PathBuf {
        self.root.join("out")
    }
}

/// Run a deployment the way the CLI does: load the config, build the policy, deploy
fn deploy_from_config(config_path: &Utf8Path) -> Result<DeployReport> {
    let config = Config::load(config_path)?;
    let package = config.root_package();
    let graph = config.graph();
    let policy = DeployPolicy::for_profile(
        config.deploy.profile,
        &config.deploy.output_dir,
        &package,
        config.deploy.persistent_prefix.as_deref(),
    )?;

    DeployManager::new(&graph)
        .with_cycle_policy(config.deploy.on_cycle)
        .deploy(&package.requires, &policy, &config.deploy.output_dir)
}

const SIMPLE_GRAPH: &str = r#"
[package]
name = "app"
requires = ["x"]

[dependencies.x]
root = "pkgs/x"
public_deps = ["y"]

[dependencies.y]
root = "pkgs/y"

[deploy]
output_dir = "out"
"#;

#[test]
fn test_dependency_files_precede_dependent_files_in_manifest() {
    let ws = TestWorkspace::new();
    ws.install("x", &[("bin/x", "x")]);
    ws.install("y", &[("lib/libY.so", "y")]);
    let config_path = ws.write_config(SIMPLE_GRAPH);

    let report = deploy_from_config(&config_path).expect("deployment should succeed");

    let out = ws.out();
    let expected = format!("{out}/app/lib/libY.so\n{out}/app/bin/x\n");
    assert_eq!(
        fs::read_to_string(out.join(MANIFEST_FILE_NAME)).unwrap(),
        expected
    );
    assert_eq!(report.manifest.render(), expected);
    assert_eq!(fs::read_to_string(out.join("app/bin/x")).unwrap(), "x");
    assert_eq!(fs::read_to_string(out.join("app/lib/libY.so")).unwrap(), "y");
}

#[test]
fn test_isolated_deploy_is_repeatable() {
    let ws = TestWorkspace::new();
    ws.install("x", &[("bin/x", "x"), ("share/x/data", "d")]);
    ws.install("y", &[("lib/libY.so", "y"), ("include/y.h", "h")]);
    let config_path = ws.write_config(SIMPLE_GRAPH);

    let first = deploy_from_config(&config_path).unwrap();
    let first_manifest = fs::read_to_string(&first.manifest_path).unwrap();

    let second = deploy_from_config(&config_path).unwrap();
    let second_manifest = fs::read_to_string(&second.manifest_path).unwrap();

    assert_eq!(first_manifest, second_manifest);
    // Clearing the target root first means the second run sees no conflicts
    assert!(second.conflicts.is_empty());
}

#[test]
fn test_dependent_shadows_its_dependency() {
    let ws = TestWorkspace::new();
    ws.install("a", &[("include/config.h", "from a")]);
    ws.install("b", &[("include/config.h", "from b")]);
    let config_path = ws.write_config(
        r#"
[package]
name = "app"
version = "0.1"
requires = ["a"]

[dependencies.a]
root = "pkgs/a"
public_deps = ["b"]

[dependencies.b]
root = "pkgs/b"

[deploy]
output_dir = "out"
"#,
    );

    let report = deploy_from_config(&config_path).unwrap();

    let header = ws.out().join("app-0.1/include/config.h");
    assert_eq!(fs::read_to_string(&header).unwrap(), "from a");
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].dependency, "a");
    assert_eq!(
        report.conflicts[0].previous,
        FileOwner::Dependency("b".to_string())
    );
    assert_eq!(report.manifest.files(), &[header]);
}

#[test]
fn test_reserved_metadata_never_deployed() {
    let ws = TestWorkspace::new();
    ws.install(
        "x",
        &[
            ("conaninfo.txt", "[settings]"),
            ("conanmanifest.txt", "123"),
            ("conan_package.tgz", "tgz"),
            ("bin/x", "x"),
        ],
    );
    ws.install("y", &[("conaninfo.txt", "[settings]"), ("lib/libY.so", "y")]);
    let config_path = ws.write_config(SIMPLE_GRAPH);

    let report = deploy_from_config(&config_path).unwrap();

    let manifest = fs::read_to_string(&report.manifest_path).unwrap();
    for reserved in ["conaninfo.txt", "conanmanifest.txt", "conan_package.tgz"] {
        assert!(!manifest.contains(reserved));
        assert!(!report.target_root.join(reserved).exists());
    }
    assert_eq!(report.manifest.files().len(), 2);
}

#[test]
fn test_diamond_dependency_merged_once() {
    let ws = TestWorkspace::new();
    ws.install("left", &[("lib/libleft.so", "l")]);
    ws.install("right", &[("lib/libright.so", "r")]);
    ws.install("base", &[("lib/libbase.so", "b")]);
    let config_path = ws.write_config(
        r#"
[package]
name = "app"
requires = ["left", "right"]

[dependencies.left]
root = "pkgs/left"
public_deps = ["base"]

[dependencies.right]
root = "pkgs/right"
public_deps = ["base"]

[dependencies.base]
root = "pkgs/base"

[deploy]
output_dir = "out"
"#,
    );

    let report = deploy_from_config(&config_path).unwrap();

    assert_eq!(report.merge_order, vec!["base", "left", "right"]);
    // A second merge of base would have reported its file as a conflict
    assert!(report.conflicts.is_empty());
    assert_eq!(report.manifest.files().len(), 3);
}

#[test]
fn test_persistent_deploy_accumulates_across_runs() {
    let ws = TestWorkspace::new();
    ws.install("first", &[("lib/libfirst.so", "1"), ("share/common.txt", "first")]);
    ws.install("second", &[("lib/libsecond.so", "2"), ("share/common.txt", "second")]);

    let config_for = |requirement: &str| {
        format!(
            r#"
[package]
name = "app"
requires = ["{requirement}"]

[dependencies.first]
root = "pkgs/first"

[dependencies.second]
root = "pkgs/second"

[deploy]
output_dir = "out"
profile = "persistent"
persistent_prefix = "home/.local"
"#
        )
    };

    let config_path = ws.write_config(&config_for("first"));
    let first = deploy_from_config(&config_path).unwrap();

    let config_path = ws.write_config(&config_for("second"));
    let second = deploy_from_config(&config_path).unwrap();

    let prefix = ws.root.join("home/.local");
    assert_eq!(first.target_root, prefix);
    assert_eq!(second.target_root, prefix);
    assert_eq!(fs::read_to_string(prefix.join("lib/libfirst.so")).unwrap(), "1");
    assert_eq!(fs::read_to_string(prefix.join("lib/libsecond.so")).unwrap(), "2");
    assert_eq!(
        fs::read_to_string(prefix.join("share/common.txt")).unwrap(),
        "second"
    );

    // The overwrite is a conflict with a file this run did not write
    assert_eq!(second.conflicts.len(), 1);
    assert_eq!(second.conflicts[0].previous, FileOwner::PreExisting);

    // The manifest only describes the latest run
    let manifest = fs::read_to_string(&second.manifest_path).unwrap();
    assert!(!manifest.contains("libfirst.so"));
    assert!(manifest.contains("libsecond.so"));
}

#[test]
fn test_copy_failure_rolls_back_isolated_deploy() {
    let ws = TestWorkspace::new();
    // y installs a plain file where x needs a directory
    ws.install("x", &[("lib/libx.so", "x")]);
    ws.install("y", &[("lib", "not a directory")]);
    let config_path = ws.write_config(SIMPLE_GRAPH);

    let result = deploy_from_config(&config_path);

    match result {
        Err(Error::Copy { dependency, path, .. }) => {
            assert_eq!(dependency, "x");
            assert_eq!(path, ws.out().join("app/lib"));
        }
        other => panic!("expected copy error, got {:?}", other),
    }
    assert!(!ws.out().join("app").exists());
    assert!(!ws.out().join(MANIFEST_FILE_NAME).exists());
}

#[test]
fn test_directory_symlink_conflict_does_not_abort() {
    let ws = TestWorkspace::new();
    ws.install("x", &[("lib/libx.so", "x")]);
    std::os::unix::fs::symlink("lib", ws.root.join("pkgs/x/lib64")).unwrap();
    ws.install("y", &[("lib64/libY.so", "y")]);
    let config_path = ws.write_config(SIMPLE_GRAPH);

    let report = deploy_from_config(&config_path).expect("conflicts never abort a deployment");

    let lib64 = report.target_root.join("lib64");
    assert!(lib64.symlink_metadata().unwrap().is_dir());
    assert_eq!(fs::read_to_string(lib64.join("libY.so")).unwrap(), "y");
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].dependency, "x");
    assert_eq!(
        report.manifest.files(),
        &[lib64.join("libY.so"), report.target_root.join("lib/libx.so")]
    );
}

#[test]
fn test_missing_dependency_declaration_fails() {
    let ws = TestWorkspace::new();
    ws.install("x", &[("bin/x", "x")]);
    let config_path = ws.write_config(
        r#"
[package]
name = "app"
requires = ["x"]

[dependencies.x]
root = "pkgs/x"
public_deps = ["undeclared"]

[deploy]
output_dir = "out"
"#,
    );

    let result = deploy_from_config(&config_path);

    assert!(matches!(result, Err(Error::Resolution { .. })));
    assert!(!ws.out().join("app").exists());
}

#[test]
fn test_cycle_rejected_when_configured() {
    let ws = TestWorkspace::new();
    ws.install("a", &[("lib/liba.so", "a")]);
    ws.install("b", &[("lib/libb.so", "b")]);
    let config_path = ws.write_config(
        r#"
[package]
name = "app"
requires = ["a"]

[dependencies.a]
root = "pkgs/a"
public_deps = ["b"]

[dependencies.b]
root = "pkgs/b"
public_deps = ["a"]

[deploy]
output_dir = "out"
on_cycle = "error"
"#,
    );

    let result = deploy_from_config(&config_path);

    match result {
        Err(Error::CircularDependency { packages }) => {
            assert_eq!(packages, vec!["a", "b", "a"]);
        }
        other => panic!("expected circular dependency error, got {:?}", other),
    }
}
