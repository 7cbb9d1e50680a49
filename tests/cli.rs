// tests/cli.rs
use anyhow::Result;
use ironmill::testing::TestDir;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn ironmill(args: &[&str], stdin: &str) -> Result<Output> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ironmill"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut input) = child.stdin.take() {
        input.write_all(stdin.as_bytes())?;
    }
    Ok(child.wait_with_output()?)
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn reads_stdin_and_chains_verbs() -> Result<()> {
    let out = ironmill(&["head", "-n", "2", "then", "cat", "-n"], "a=1\na=2\na=3\n")?;
    assert!(out.status.success());
    assert_eq!(stdout(&out), "n=1,a=1\nn=2,a=2\n");
    Ok(())
}

#[test]
fn seqgen_needs_no_input() -> Result<()> {
    let out = ironmill(&["seqgen", "--stop", "1000000000", "then", "head", "-n", "3"], "")?;
    assert!(out.status.success());
    assert_eq!(stdout(&out), "i=1\ni=2\ni=3\n");
    Ok(())
}

#[test]
fn join_from_the_command_line() -> Result<()> {
    let dir = TestDir::new()?;
    let left = dir.write_text("left.csv", "id,name\n1,a\n2,b\n")?;
    let left = left.display().to_string();
    let out = ironmill(
        &["--ojsonl", "join", "-i", "csv", "-j", "id", "--ur", "-f", &left],
        "id=1,val=10\nid=3,val=30\n",
    )?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        stdout(&out),
        "{\"id\":1,\"name\":\"a\",\"val\":10}\n{\"id\":3,\"val\":30}\n"
    );
    Ok(())
}

#[test]
fn usage_errors_exit_one_with_usage() -> Result<()> {
    for args in [
        vec!["join", "-j", "id", "--np", "-f", "x"],
        vec!["join", "-l", "a,b", "-r", "c", "-f", "x"],
        vec!["frobnicate"],
        vec!["cat", "then"],
        vec!["--icsv"],
    ] {
        let out = ironmill(&args, "")?;
        assert_eq!(out.status.code(), Some(1), "{args:?}");
        let err = String::from_utf8_lossy(&out.stderr);
        assert!(err.contains("Usage"), "{args:?}: {err}");
        assert!(out.stdout.is_empty());
    }
    Ok(())
}

#[test]
fn runtime_errors_name_the_file() -> Result<()> {
    let out = ironmill(&["join", "-j", "id", "-f", "/nonexistent/ironmill/left"], "id=1\n")?;
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.starts_with("ironmill: "), "{err}");
    assert!(err.contains("/nonexistent/ironmill/left"), "{err}");
    Ok(())
}

#[test]
fn help_lists_verbs() -> Result<()> {
    let out = ironmill(&["--help"], "")?;
    assert!(out.status.success());
    let text = stdout(&out);
    for verb in ["cat", "join", "seqgen", "tee"] {
        assert!(text.contains(verb), "{verb}");
    }
    Ok(())
}
