//! Basic CLI integration tests: argument surface, exit codes, and a
//! small end-to-end recovery driven through the binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use libvicar::record::{ascii_to_ebcdic, LOGICAL_RECORD_SIZE};
use predicates::prelude::*;

fn vlrec() -> Command {
    Command::cargo_bin("vlrec").expect("binary should build")
}

/// A minimal well-formed 64×64 survey band, EBCDIC encoded
fn survey_band(label: &str, value: u8) -> Vec<u8> {
    fn record(text: &str, sentinel: u8, tape_marker: bool) -> [u8; LOGICAL_RECORD_SIZE] {
        let mut ascii = [b' '; LOGICAL_RECORD_SIZE];
        let start = usize::from(tape_marker) * 2;
        ascii[start..start + text.len()].copy_from_slice(text.as_bytes());
        ascii[LOGICAL_RECORD_SIZE - 1] = sentinel;
        let mut encoded = ascii.map(ascii_to_ebcdic);
        if tape_marker {
            encoded[0] = 0x00;
            encoded[1] = 0x00;
        }
        encoded
    }

    let mut file = Vec::new();
    file.extend_from_slice(&record("1   1  64  64 I 1", b'C', true));
    file.extend_from_slice(&record("VIKING LANDER 2 CAMERA EVENT", b'C', false));
    file.extend_from_slice(&record(&format!("CE LABEL {label}"), b'C', false));
    file.extend_from_slice(&record("AZIMUTH 240.00 ELEVATION 12.00", b'C', false));
    file.extend_from_slice(&record("SURVEY DIODE", b'L', false));
    file.extend_from_slice(&vec![value; 64 * 64]);
    file
}

#[test]
fn help_describes_the_tool() {
    vlrec()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Viking Lander"))
        .stdout(predicate::str::contains("--directorize-band-class"))
        .stdout(predicate::str::contains("--no-reconstruct"));
}

#[test]
fn version_uses_the_lowercase_short_flag() {
    vlrec()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("vlrec"));
    vlrec()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vlrec"));
}

#[test]
fn missing_input_is_a_usage_error() {
    vlrec().assert().failure();
}

#[test]
fn unknown_diode_class_is_rejected() {
    vlrec()
        .args(["--filter-diode=sepia", "."])
        .assert()
        .failure();
}

#[test]
fn empty_inputs_report_no_prospective_files() {
    let dir = mktemp::Temp::new_dir().expect("temp dir");
    vlrec()
        .arg("--summarize-only")
        .arg(dir.to_path_buf())
        .assert()
        .success()
        .stdout(predicate::str::contains("no prospective files found"));
}

#[test]
fn recovers_a_survey_band_end_to_end() {
    let dir = mktemp::Temp::new_dir().expect("temp dir");
    let root = dir.to_path_buf();
    let out = root.join("out");
    fs::write(root.join("vl_2044.001"), survey_band("12C001/0530", 77)).expect("fixture");

    vlrec()
        .arg("--summarize-only")
        .arg(&root)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "successfully reconstructed 1/1 camera events",
        ));
    assert!(out.join("12C001.png").exists());
}

#[test]
fn dry_run_reports_success_but_writes_nothing() {
    let dir = mktemp::Temp::new_dir().expect("temp dir");
    let root = dir.to_path_buf();
    let out = root.join("out");
    fs::write(root.join("vl_2044.001"), survey_band("12C001/0530", 8)).expect("fixture");

    vlrec()
        .args(["--summarize-only", "--dry-run"])
        .arg(&root)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("successfully reconstructed 1/1"));
    assert!(!Path::new(&out).exists());
}

#[test]
fn no_reconstruct_dumps_components() {
    let dir = mktemp::Temp::new_dir().expect("temp dir");
    let root = dir.to_path_buf();
    let out = root.join("out");
    fs::write(root.join("vl_2044.001"), survey_band("12C001/0530", 8)).expect("fixture");

    vlrec()
        .args(["--summarize-only", "--no-reconstruct"])
        .arg(&root)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "dumped 1 image components without reconstruction",
        ));
    assert!(out
        .join("Unreconstructable")
        .join("12C001")
        .join("survey_0.png")
        .exists());
}

#[test]
fn jobs_flag_is_accepted_but_ignored() {
    let dir = mktemp::Temp::new_dir().expect("temp dir");
    vlrec()
        .args(["--summarize-only", "-j=4"])
        .arg(dir.to_path_buf())
        .assert()
        .success();
    vlrec()
        .args(["--summarize-only", "--jobs"])
        .arg(dir.to_path_buf())
        .assert()
        .success();
}
