//! CLI tests for `sweeper compile` and `sweeper run`.
//!
//! Spawns the sweeper binary inside a temp directory and checks stdout and
//! exit codes.

use std::process::Command;

use sweeper::exit_codes;
use sweeper::test_support::{temp_dir, write_sweep_file};

const SWEEP: &str = r#"
["@global"]
"@program" = "echo"
"@format" = "flag"
"@log_path" = "stdout"

[["@jobs"]]
"@sweep.x" = [1, 2]
msg = "val=@x"
"#;

fn sweeper() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sweeper"))
}

#[test]
fn compile_prints_one_command_per_job() {
    let temp = temp_dir();
    write_sweep_file(temp.path(), "sweep.toml", SWEEP);

    let output = sweeper()
        .current_dir(temp.path())
        .args(["compile", "sweep.toml"])
        .output()
        .expect("sweeper compile");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "echo --x 1 --msg val=1\necho --x 2 --msg val=2\n"
    );
}

#[test]
fn compile_applies_overrides() {
    let temp = temp_dir();
    write_sweep_file(temp.path(), "sweep.toml", SWEEP);

    let output = sweeper()
        .current_dir(temp.path())
        .args(["compile", "sweep.toml", "--set", "@sweep.x=[7]"])
        .output()
        .expect("sweeper compile");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "echo --x 7 --msg val=7\n"
    );
}

#[test]
fn compile_json_lists_descriptors() {
    let temp = temp_dir();
    write_sweep_file(temp.path(), "sweep.toml", SWEEP);

    let output = sweeper()
        .current_dir(temp.path())
        .args(["compile", "sweep.toml", "--json"])
        .output()
        .expect("sweeper compile --json");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let jobs: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let jobs = jobs.as_array().expect("array");
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[1]["label"], "jobs[0]#1");
    assert_eq!(jobs[1]["resolved_config"]["msg"], "val=2");
}

#[test]
fn missing_program_exits_invalid() {
    let temp = temp_dir();
    write_sweep_file(temp.path(), "sweep.toml", "[[\"@jobs\"]]\nx = 1\n");

    let output = sweeper()
        .current_dir(temp.path())
        .args(["compile", "sweep.toml"])
        .output()
        .expect("sweeper compile");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("@program"));
    assert!(output.stdout.is_empty());
}

#[test]
fn invalid_settings_exit_invalid() {
    let temp = temp_dir();
    write_sweep_file(temp.path(), "sweep.toml", SWEEP);
    write_sweep_file(temp.path(), "sweeper.toml", "shell = \"\"\n");

    let status = sweeper()
        .current_dir(temp.path())
        .args(["run", "sweep.toml", "--dry-run"])
        .status()
        .expect("sweeper run");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn dry_run_exits_ok_without_running() {
    let temp = temp_dir();
    write_sweep_file(
        temp.path(),
        "sweep.toml",
        "[\"@global\"]\n\"@program\" = \"touch ran\"\n\n[[\"@jobs\"]]\n",
    );

    let output = sweeper()
        .current_dir(temp.path())
        .args(["run", "sweep.toml", "--dry-run"])
        .output()
        .expect("sweeper run --dry-run");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("dry-run: jobs[0]#0"));
    assert!(!temp.path().join("ran").exists());
}

#[cfg(unix)]
#[test]
fn failed_job_exits_with_job_failed() {
    let temp = temp_dir();
    write_sweep_file(
        temp.path(),
        "sweep.toml",
        "[\"@global\"]\n\"@log_path\" = \"stdout\"\n\n[[\"@jobs\"]]\n\"@program\" = \"true\"\n\n[[\"@jobs\"]]\n\"@program\" = \"false\"\n",
    );

    for extra in [&[][..], &["--keep-going"][..], &["--concurrent"][..]] {
        let status = sweeper()
            .current_dir(temp.path())
            .args(["run", "sweep.toml"])
            .args(extra)
            .status()
            .expect("sweeper run");
        assert_eq!(status.code(), Some(exit_codes::JOB_FAILED), "{extra:?}");
    }
}
