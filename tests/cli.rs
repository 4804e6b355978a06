//! End-to-end tests for the `logload` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const GOOD: &str = r#"192.168.1.1 - - [05/Jan/2024:08:00:00 +0000] "GET /a HTTP/1.1" 404 512 "-" "curl/7.68.0""#;
const UNCLOSED: &str = r#"192.168.1.1 - - [05/Jan/2024:08:00:00 +0000] "GET /a HTTP/1.1" 404 512 "-" "curl/7.68.0"#;

#[allow(deprecated)]
fn logload(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("logload").unwrap();
    // Keep a stray ./logload.toml out of the picture.
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn csv_default_output_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("public.log"), format!("{GOOD}\n{GOOD}\n")).unwrap();

    logload(dir.path())
        .args(["csv", "public.log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows imported"));

    let csv = fs::read_to_string(dir.path().join("public.log.csv")).unwrap();
    assert_eq!(
        csv,
        "date,remote_addr,remote_user,time_local,request,status,body_bytes_sent,http_referer,http_user_agent\n\
         2024-01-05,192.168.1.1,-,2024-01-05 08:00:00,GET /a HTTP/1.1,404,512,-,curl/7.68.0\n\
         2024-01-05,192.168.1.1,-,2024-01-05 08:00:00,GET /a HTTP/1.1,404,512,-,curl/7.68.0\n"
    );
}

#[test]
fn csv_malformed_line_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("public.log"), format!("{GOOD}\n{UNCLOSED}\n")).unwrap();

    logload(dir.path())
        .args(["csv", "public.log", "-o", "out.csv"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("http_user_agent"));

    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn csv_skip_invalid() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("public.log"), format!("{GOOD}\n{UNCLOSED}\n")).unwrap();

    logload(dir.path())
        .args(["csv", "public.log", "--skip-invalid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rows imported, 1 invalid lines skipped"));

    let csv = fs::read_to_string(dir.path().join("public.log.csv")).unwrap();
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn config_file_supplies_format() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("logload.toml"),
        "format = '$remote_addr $remote_user [$time_local] \"$request\" $status $body_bytes_sent \"$http_referer\" \"$http_user_agent\"'\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("short.log"),
        "10.0.0.1 - [05/Jan/2024:08:00:00 +0000] \"GET / HTTP/1.1\" 200 1 \"-\" \"x\"\n",
    )
    .unwrap();

    logload(dir.path())
        .args(["csv", "short.log"])
        .assert()
        .success();

    let csv = fs::read_to_string(dir.path().join("short.log.csv")).unwrap();
    assert!(csv.contains("2024-01-05,10.0.0.1,-,2024-01-05 08:00:00,GET / HTTP/1.1,200,1,-,x"));
}

#[test]
fn clean_strips_prefixes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("public.log"),
        format!("Jan  5 08:00:00 web-1 nginx: {GOOD}\n"),
    )
    .unwrap();

    logload(dir.path())
        .args(["clean", "public.log"])
        .assert()
        .success();

    let cleaned = fs::read_to_string(dir.path().join("public.log.clean")).unwrap();
    assert_eq!(cleaned, format!("{GOOD}\n"));
}

#[test]
fn missing_input_reports_path() {
    let dir = tempfile::tempdir().unwrap();

    logload(dir.path())
        .args(["csv", "nope.log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open nope.log"));
}

#[test]
fn load_unreachable_server_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("public.log"), format!("{GOOD}\n")).unwrap();

    logload(dir.path())
        .args(["load", "public.log", "--url", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot prepare ClickHouse"));
}
