use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Config pointing every external tool at a program that does not exist.
fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let config = dir.path().join("svntex.yaml");
    let yaml = format!(
        "repository_url: https://svn.example.org/onspot/trunk/\nroot_path: {}\npublish_dir: {}\ntools:\n  svn: svntex-missing-svn\n  svnlook: svntex-missing-svnlook\n  latexmk: svntex-missing-latexmk\n",
        dir.path().join("root").display(),
        dir.path().join("public").display(),
    );
    fs::write(&config, yaml).expect("Writing temp config failed");
    config
}

fn svntex() -> Command {
    let mut cmd = Command::cargo_bin("svntex").expect("Binary exists");
    cmd.env_remove("SVNTEX_REPOSITORY_URL")
        .env_remove("SVNTEX_ROOT_PATH")
        .env_remove("SVNTEX_PUBLISH_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn run_with_missing_tools_records_error_and_exits_cleanly() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);

    svntex()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("processing revision HEAD"))
        .stdout(predicate::str::contains("ERROR: svntex-missing-svn could not be started"))
        .stdout(predicate::str::contains("report-HEAD.pdf"));

    let log = fs::read_to_string(dir.path().join("root").join("entries_db.yaml")).unwrap();
    assert!(log.starts_with("---\n- revision: HEAD\n"));
    assert!(log.contains("author: unknown"));
    assert!(!dir.path().join("root").join("temp").exists());
}

#[test]
fn run_with_local_path_and_number_uses_svnlook() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);

    svntex()
        .args(["run", "/srv/svn/onspot", "42", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("using svnlook"))
        .stdout(predicate::str::contains("ERROR: svntex-missing-svnlook could not be started"));
}

#[test]
fn render_prints_history_with_custom_template() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);
    let root = dir.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join("entries_db.yaml"),
        "---\n- revision: 41\n  author: dawuss\n  message: First draft\n  status: ok\n  file: report-41.pdf\n- revision: 42\n  author: dawuss\n  message: Typo\n  status: 'ERROR: Build failed.'\n  file: report-42.pdf\n",
    )
    .unwrap();
    fs::write(
        root.join("template.html"),
        "<ol>$for(records)$<li>$it.revision$ $it.status$</li>$endfor$</ol>",
    )
    .unwrap();

    svntex()
        .arg("render")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<ol><li>41 ok</li><li>42 ERROR: Build failed.</li></ol>",
        ));
}

#[test]
fn render_without_log_uses_default_template() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir);

    svntex()
        .arg("render")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 builds recorded."));
}

#[test]
fn missing_config_file_fails() {
    svntex()
        .arg("render")
        .arg("--config")
        .arg(Path::new("/nonexistent/svntex.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}
