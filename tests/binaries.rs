use std::{fs, process::Command};

use tempfile::tempdir;

fn combined_output(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned() + &String::from_utf8_lossy(&out.stderr)
}

#[test]
fn failure_is_reported_once_with_failing_status() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.json");
    let out = Command::new(env!("CARGO_BIN_EXE_multi_threaded"))
        .arg(dir.path().join("absent.log"))
        .arg(&output)
        .output()
        .unwrap();

    assert!(!out.status.success());
    let text = combined_output(&out);
    assert_eq!(text.matches("cannot split").count(), 1, "{text}");
    assert!(!text.contains("Error: "), "{text}");
    assert!(!output.exists());
}

#[test]
fn both_binaries_write_the_same_document() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("access.log");
    let mut contents = String::new();
    for i in 0..120 {
        contents += &format!(
            "https://stitcher.io/post/{},2024-07-{:02}T01:02:03+00:00\n",
            i % 9,
            1 + i % 30
        );
    }
    fs::write(&input, contents).unwrap();

    let mut documents = Vec::new();
    for exe in [
        env!("CARGO_BIN_EXE_single_threaded"),
        env!("CARGO_BIN_EXE_multi_threaded"),
    ] {
        let output = dir.path().join("out.json");
        let out = Command::new(exe)
            .arg(&input)
            .arg(&output)
            .args(["--log-level", "warn"])
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", combined_output(&out));
        documents.push(fs::read_to_string(&output).unwrap());
    }
    assert_eq!(documents[0], documents[1]);
}
