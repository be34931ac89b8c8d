use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_verbena")
}

fn write_cluster(dir: &Path) -> std::path::PathBuf {
    let config = format!(
        "base-url = \"http://cdn.example.net\"\n\n[[targets]]\nindex = \"{0}/host0/indexes/web.idx\"\ndocroot = \"{0}/host0/docroot\"\n",
        dir.display()
    );
    let path = dir.join("verbena.toml");
    fs::write(&path, config).unwrap();
    path
}

fn seed_published_cluster(dir: &Path, cluster: &Path) {
    let source = dir.join("assets");
    fs::create_dir_all(source.join("img")).unwrap();
    fs::write(source.join("img/logo.gif"), b"gif-bytes").unwrap();
    fs::write(source.join("robots.txt"), b"User-agent: *\n").unwrap();

    let output = Command::new(bin())
        .current_dir(dir)
        .args([
            "publish",
            source.to_str().unwrap(),
            "--cluster",
            cluster.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "seed publish failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn remove(dir: &Path, cluster: &Path, paths: &[&str]) -> std::process::Output {
    let mut args = vec!["remove-entry"];
    args.extend_from_slice(paths);
    args.extend_from_slice(&["--cluster", cluster.to_str().unwrap()]);
    Command::new(bin())
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn remove_entry_retracts_from_index_and_all_index() {
    let dir = tempdir().unwrap();
    let cluster = write_cluster(dir.path());
    seed_published_cluster(dir.path(), &cluster);

    let output = remove(dir.path(), &cluster, &["img/logo.gif"]);
    assert!(
        output.status.success(),
        "remove-entry failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("retracted 1 of 1"), "stdout: {stdout}");

    let index = fs::read_to_string(dir.path().join("host0/indexes/web.idx")).unwrap();
    assert!(!index.contains("img/logo.gif"));
    assert!(index.contains("robots.txt"));

    let all = fs::read_to_string(dir.path().join("host0/indexes/all.idx")).unwrap();
    assert!(!all.contains("logo.gif"));
    assert_eq!(all.lines().count(), 1);
}

#[test]
fn remove_unknown_entry_retracts_nothing() {
    let dir = tempdir().unwrap();
    let cluster = write_cluster(dir.path());
    seed_published_cluster(dir.path(), &cluster);
    let index_before = fs::read(dir.path().join("host0/indexes/web.idx")).unwrap();

    let output = remove(dir.path(), &cluster, &["img/unknown.gif"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("retracted 0 of 1"), "stdout: {stdout}");
    assert_eq!(
        fs::read(dir.path().join("host0/indexes/web.idx")).unwrap(),
        index_before
    );
}

#[test]
fn remove_entry_keeps_content_addressed_files() {
    let dir = tempdir().unwrap();
    let cluster = write_cluster(dir.path());
    seed_published_cluster(dir.path(), &cluster);

    let index = fs::read_to_string(dir.path().join("host0/indexes/web.idx")).unwrap();
    let line = index.lines().find(|l| l.starts_with("img/logo.gif=")).unwrap();
    let (lavendelized, _) = line
        .strip_prefix("img/logo.gif=")
        .unwrap()
        .rsplit_once("\\:")
        .unwrap();
    let published = dir.path().join("host0/docroot").join(lavendelized);
    assert!(published.exists());

    assert!(remove(dir.path(), &cluster, &["img/logo.gif"]).status.success());

    // retraction only edits manifests; the reaper deletes files later
    assert!(published.exists());
}

#[test]
fn remove_entry_requires_at_least_one_path() {
    let dir = tempdir().unwrap();
    let cluster = write_cluster(dir.path());

    let output = remove(dir.path(), &cluster, &[]);
    assert!(!output.status.success());
}
