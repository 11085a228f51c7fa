use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("syncednotes")?;
    cmd.args(["--workspace", workspace.to_str().unwrap()]);
    Ok(cmd)
}

fn seed(workspace: &Path) -> Result<(), Box<dyn Error>> {
    cli(workspace)?
        .args(["add-folder", "Notes", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added folder Notes/A"));
    cli(workspace)?
        .args(["add-note", "Notes/A", "x", "--text", "hello world"])
        .assert()
        .success();
    cli(workspace)?
        .args(["add-folder", "Notes/A", "B"])
        .assert()
        .success();
    Ok(())
}

#[test]
fn add_and_show_notes() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    seed(workspace.path())?;

    cli(workspace.path())?
        .args(["show", "Notes/A/x"])
        .assert()
        .success()
        .stdout("hello world\n");
    cli(workspace.path())?
        .args(["show", "Notes/A/x", "--truncate", "5"])
        .assert()
        .success()
        .stdout("hello...\n");

    let stored = fs::read_to_string(workspace.path().join(".syncednotes").join("notes.json"))?;
    assert!(stored.contains("aGVsbG8gd29ybGQ="));
    assert!(!stored.contains("hello world"));
    Ok(())
}

#[test]
fn list_respects_filters() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    seed(workspace.path())?;

    cli(workspace.path())?
        .arg("list")
        .assert()
        .success()
        .stdout("Notes/\n  A/\n    x\n    B/\n");
    cli(workspace.path())?
        .args(["list", "--hide-empty"])
        .assert()
        .success()
        .stdout("Notes/\n  A/\n    x\n");
    cli(workspace.path())?
        .args(["list", "--folders-only"])
        .assert()
        .success()
        .stdout("Notes/\n  A/\n    B/\n");
    cli(workspace.path())?
        .args(["list", "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("x  hello world..."));
    Ok(())
}

#[test]
fn export_json_projection() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    seed(workspace.path())?;

    cli(workspace.path())?
        .arg("export-json")
        .assert()
        .success()
        .stdout("{\"Notes\":[{\"A\":[{\"x\" : \"aGVsbG8gd29ybGQ=\"},{\"B\":[]}]}]}\n");
    cli(workspace.path())?
        .args(["export-json", "--pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"B\": []"));
    Ok(())
}

#[test]
fn duplicate_labels_and_bad_parents_fail() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    seed(workspace.path())?;

    cli(workspace.path())?
        .args(["add-note", "Notes/A", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to add note Notes/A/x"));
    cli(workspace.path())?
        .args(["add-note", "Notes/A/x", "y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a folder"));
    cli(workspace.path())?
        .args(["show", "Notes/nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no note at Notes/nowhere"));
    Ok(())
}

#[test]
fn custom_store_path_is_used() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["--store", "elsewhere.json", "add-note", "Notes", "n", "--text", "t"])
        .assert()
        .success();
    assert!(workspace.path().join("elsewhere.json").exists());
    Ok(())
}

#[test]
fn edit_requires_an_editor() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    seed(workspace.path())?;
    cli(workspace.path())?
        .env_remove("VISUAL")
        .env_remove("EDITOR")
        .args(["edit", "Notes/A/x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no editor configured"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn edit_round_trips_through_external_editor() -> Result<(), Box<dyn Error>> {
    use std::os::unix::fs::PermissionsExt;

    let workspace = tempdir()?;
    seed(workspace.path())?;

    let script = workspace.path().join("fake-editor.sh");
    fs::write(&script, "#!/bin/sh\nprintf 'rewritten by editor' > \"$1\"\n")?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

    let scratch = workspace.path().join("scratch");
    fs::create_dir_all(workspace.path().join(".syncednotes"))?;
    fs::write(
        workspace.path().join(".syncednotes").join("preferences.json"),
        format!(
            r#"{{ "editing": {{ "temp_dir": {} }} }}"#,
            json_quote(scratch.to_str().unwrap())
        ),
    )?;

    cli(workspace.path())?
        .args(["edit", "Notes/A/x", "--editor", script.to_str().unwrap()])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved Notes/A/x (1)"))
        .stdout(predicate::str::contains("Closed Notes/A/x"));

    cli(workspace.path())?
        .args(["show", "Notes/A/x"])
        .assert()
        .success()
        .stdout("rewritten by editor\n");
    assert!(!scratch.join("Notes_A_x.md").exists());
    Ok(())
}

#[cfg(unix)]
fn json_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
