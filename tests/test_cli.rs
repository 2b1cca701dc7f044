
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn it_writes_csv_and_jsonl_outputs() {
    let d = tempdir().unwrap();
    let csv = d.as_ref().join("out.csv");
    let jsonl = d.as_ref().join("out.jsonl");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--csv",
        &csv.to_string_lossy(),
        "--jsonl",
        &jsonl.to_string_lossy(),
        sample_archive().to_str().unwrap(),
    ]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    assert!(
        output.stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let csv_text = fs::read_to_string(&csv).unwrap();
    let mut lines = csv_text.lines();
    assert_eq!(
        lines.next(),
        Some("AppPath,EventTime,SHA1,AppName,NsAppName,OriginalFilename,EventType,FriendlyEventName,ReportType")
    );
    assert_eq!(
        lines.next(),
        Some("C:\\Windows\\System32\\notepad.exe,2023-02-16T12:17:36.789123Z,f2ab4e4a8e1d3cdbb4ab8f5b1e4cb1e5e8e5b0a1,Notepad,notepad.exe,NOTEPAD.EXE,APPCRASH,Stopped working,2")
    );
    assert_eq!(lines.count(), 2);

    let jsonl_text = fs::read_to_string(&jsonl).unwrap();
    assert_eq!(jsonl_text.lines().count(), 3);
    for line in jsonl_text.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.get("EventType").is_some());
    }
}

#[test]
fn it_writes_jsonl_to_stdout_for_a_single_report() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--no-csv",
        "--jsonl",
        "-",
        app_hang_report().to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(
            r#"{"Version":"1","EventType":"AppHangB1","EventTime":"2022-02-22T10:40:00Z""#,
        ))
        .stdout(predicate::str::contains(
            r#""Sig":{"ApplicationName":"Calculator.exe","HangSignature":"1b2e"}"#,
        ));
}

#[test]
fn it_writes_nothing_for_a_report_without_fields() {
    let d = tempdir().unwrap();
    let report = write_report(d.path(), "AppCrash_empty", "");
    let jsonl = d.as_ref().join("out.jsonl");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--no-csv",
        "--jsonl",
        &jsonl.to_string_lossy(),
        report.to_str().unwrap(),
    ]);

    cmd.assert().success().stdout(predicate::str::is_empty());
    assert!(!jsonl.exists());
}

#[test]
fn it_respects_custom_columns() {
    let d = tempdir().unwrap();
    let csv = d.as_ref().join("out.csv");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--no-jsonl",
        "--csv",
        &csv.to_string_lossy(),
        "--columns",
        "EventType,SHA1",
        app_crash_report().to_str().unwrap(),
    ]);
    cmd.assert().success();

    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "EventType,SHA1\nAPPCRASH,f2ab4e4a8e1d3cdbb4ab8f5b1e4cb1e5e8e5b0a1\n"
    );
}

#[test]
fn it_writes_nothing_when_no_reports_are_found() {
    let d = tempdir().unwrap();
    let empty_archive = d.as_ref().join("archive");
    fs::create_dir_all(&empty_archive).unwrap();
    let csv = d.as_ref().join("out.csv");
    let jsonl = d.as_ref().join("out.jsonl");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--csv",
        &csv.to_string_lossy(),
        "--jsonl",
        &jsonl.to_string_lossy(),
        &empty_archive.to_string_lossy(),
    ]);
    cmd.assert().success();

    assert!(!csv.exists());
    assert!(!jsonl.exists());
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--no-jsonl",
        "--csv",
        &d.path().to_string_lossy(),
        sample_archive().to_str().unwrap(),
    ]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_it_overwrites_file_anyways_if_passed_flag() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");

    let mut file = File::create(&f).unwrap();
    file.write_all(b"I'm a file!").unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--no-csv",
        "--jsonl",
        &f.to_string_lossy(),
        "--no-confirm-overwrite",
        sample_archive().to_str().unwrap(),
    ]);

    cmd.assert().success();

    let mut expected = String::new();

    File::open(&f).unwrap().read_to_string(&mut expected).unwrap();
    assert!(
        expected.starts_with("{\"Version\":\"1\""),
        "Expected output to be printed to file"
    )
}

#[test]
fn it_creates_missing_parent_directories() {
    let d = tempdir().unwrap();
    let jsonl = d.as_ref().join("nested").join("dir").join("out.jsonl");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args([
        "--no-csv",
        "--jsonl",
        &jsonl.to_string_lossy(),
        app_crash_report().to_str().unwrap(),
    ]);
    cmd.assert().success();

    assert_eq!(fs::read_to_string(&jsonl).unwrap().lines().count(), 1);
}

#[test]
fn it_expands_glob_inputs() {
    let d = tempdir().unwrap();
    write_report(d.as_ref(), "one", "AppName=one.exe\r\n");
    write_report(d.as_ref(), "two", "AppName=two.exe\r\n");
    let pattern = format!("{}/*/Report.wer", d.as_ref().display());

    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args(["--no-csv", "--jsonl", "-", "--glob", &pattern]);

    cmd.assert()
        .success()
        .stdout("{\"AppName\":\"one.exe\"}\n{\"AppName\":\"two.exe\"}\n");
}

#[test]
fn it_rejects_both_outputs_on_stdout() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("wer_dump"));
    cmd.args(["--csv", "-", "--jsonl", "-", sample_archive().to_str().unwrap()]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot both be written to stdout"));
}
