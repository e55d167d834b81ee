use assert_cmd::cargo::cargo_bin_cmd;

fn help_text(args: &[&str]) -> String {
    let mut cmd = cargo_bin_cmd!("reelmatch");
    let output = cmd
        .args(args)
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8_lossy(&output).into_owned()
}

#[test]
fn top_level_help_lists_commands() {
    let text = help_text(&[]);
    for command in ["enrich", "failures", "demote", "show"] {
        assert!(text.contains(command), "help missing '{command}'");
    }
}

#[test]
fn enrich_help_mentions_batch_flags() {
    let text = help_text(&["enrich"]);
    assert!(text.contains("--limit"), "enrich help missing --limit");
    assert!(
        text.contains("--only-unmatched"),
        "enrich help missing --only-unmatched"
    );
    assert!(
        text.contains("--force-retry-failed"),
        "enrich help missing --force-retry-failed"
    );
}

#[test]
fn failures_subcommands_present() {
    let text = help_text(&["failures"]);
    assert!(text.contains("list"), "failures help missing list");
    assert!(text.contains("clear"), "failures help missing clear");
}

#[test]
fn show_reports_missing_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("reelmatch");
    cmd.current_dir(dir.path())
        .env("REELMATCH_DATA_DIR", dir.path())
        .env_remove("REELMATCH_CONFIG")
        .env_remove("REELMATCH_STORE_PATH")
        .args(["show", "tt0133093"])
        .assert()
        .failure();
}

#[test]
fn clearing_an_empty_ledger_reports_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("reelmatch");
    let output = cmd
        .current_dir(dir.path())
        .env("REELMATCH_DATA_DIR", dir.path())
        .env_remove("REELMATCH_CONFIG")
        .env_remove("REELMATCH_STORE_PATH")
        .env_remove("REELMATCH_LEDGER_PATH")
        .args(["failures", "clear"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("Cleared 0 failure(s)"), "{text}");
}

#[test]
fn demote_of_unknown_key_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("reelmatch");
    cmd.current_dir(dir.path())
        .env("REELMATCH_DATA_DIR", dir.path())
        .env_remove("REELMATCH_CONFIG")
        .env_remove("REELMATCH_STORE_PATH")
        .args(["demote", "tt0133093"])
        .assert()
        .failure();
}
