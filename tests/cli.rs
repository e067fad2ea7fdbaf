use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quill() -> Command {
    Command::cargo_bin("quill").expect("binary")
}

#[test]
fn test_admin_init_creates_admin_and_token() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().to_str().unwrap();

    quill()
        .args([
            "admin",
            "init",
            "--data-dir",
            data_dir,
            "--email",
            "root@example.com",
            "--fullname",
            "Root",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("quill_"));

    let token_file = temp.path().join(".admin_token");
    let saved = std::fs::read_to_string(&token_file).expect("token file");
    assert!(saved.trim().starts_with("quill_"));

    // A second init must refuse rather than mint another admin.
    quill()
        .args([
            "admin",
            "init",
            "--data-dir",
            data_dir,
            "--email",
            "other@example.com",
            "--fullname",
            "Other",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_admin_user_and_token_flow() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().to_str().unwrap();

    quill()
        .args([
            "admin",
            "init",
            "--data-dir",
            data_dir,
            "--email",
            "root@example.com",
            "--fullname",
            "Root",
        ])
        .assert()
        .success();

    quill()
        .args([
            "admin",
            "user",
            "new",
            "--data-dir",
            data_dir,
            "--email",
            "alice@example.com",
            "--fullname",
            "Alice",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice@example.com"));

    // Duplicate email is refused.
    quill()
        .args([
            "admin",
            "user",
            "new",
            "--data-dir",
            data_dir,
            "--email",
            "alice@example.com",
            "--fullname",
            "Alice Again",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    quill()
        .args([
            "admin",
            "token",
            "new",
            "--data-dir",
            data_dir,
            "--email",
            "alice@example.com",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("quill_"));

    // Tokens require an existing user.
    quill()
        .args([
            "admin",
            "token",
            "new",
            "--data-dir",
            data_dir,
            "--email",
            "nobody@example.com",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user"));
}

#[test]
fn test_help_lists_subcommands() {
    quill()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("admin"));
}
